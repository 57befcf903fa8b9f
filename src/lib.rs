//! # particle_morph
//!
//! A 15 000-particle cloud that morphs between a spiral tree, an exploded
//! shell and the silhouette of an uploaded image, steered by hand gestures.
//!
//! ## Gesture → Mode mapping
//!
//! | Input | Mode |
//! |---|---|
//! | Pinch (thumb + index tips touching), image uploaded | IMAGE |
//! | Open palm | EXPLODE |
//! | Closed fist | TREE |
//! | Pinch released while on IMAGE | TREE |
//! | Anything else | unchanged |
//!
//! Uploading an image shows IMAGE for 1.5 s, then returns to TREE unless a
//! pinch is held.
//!
//! The classifier and video source are external; [`vision`] defines the
//! seams and ships a keyboard-driven simulation of both.

pub mod config;
pub mod engine;
pub mod vision;
