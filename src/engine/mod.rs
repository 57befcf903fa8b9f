// Engine module - particle morphing core plus the window-side helpers
// (camera, input, HUD) the binary drives it with.

pub mod camera;
pub mod hud;
pub mod image_sampler;
pub mod input;
pub mod mode;
pub mod morph;
pub mod pinch;
pub mod resources;
pub mod shapes;
pub mod systems;
pub mod upload;

// Re-export commonly used items
pub use mode::{GestureLabel, GestureSample, Mode};
pub use morph::MorphEngine;
pub use shapes::{PointSet, ShapeLibrary, PARTICLE_COUNT};
pub use systems::{Simulation, SimulationParams};
