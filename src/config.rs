// Runtime settings, loaded from an optional TOML file.
// Every field has a default; a missing file means all defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::engine::image_sampler::SamplerSettings;
use crate::engine::systems::SimulationParams;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub morph: MorphSettings,
    pub gesture: GestureSettings,
    pub image: SamplerSettings,
    pub window: WindowSettings,
    pub sim: SimSettings,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MorphSettings {
    /// Fraction of the remaining distance covered per frame.
    pub rate: f32,
    /// Ambient spin, radians per frame.
    pub rotation_per_tick: f32,
}

impl Default for MorphSettings {
    fn default() -> Self {
        Self { rate: 0.08, rotation_per_tick: 0.001 }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    /// Thumb/index distance (normalized frame units) below which a pinch is reported.
    pub pinch_threshold: f32,
    /// How long an upload forces IMAGE mode.
    pub upload_preview_secs: f32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self { pinch_threshold: 0.05, upload_preview_secs: 1.5 }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub camera_distance: f32,
    pub fov_degrees: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            camera_distance: 25.0,
            fov_degrees: 50.0,
            min_distance: 10.0,
            max_distance: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Frame rate of the simulated camera.
    pub video_fps: u32,
    /// Sleep between gesture sampling passes, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self { video_fps: 30, poll_interval_ms: 5 }
    }
}

impl SimSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => Self::default(),
        };
        settings.sanitize();
        Ok(settings)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut settings: Self = toml::from_str(contents)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Clamp values into ranges the engine can work with.
    pub fn sanitize(&mut self) {
        let defaults = Self::default();

        self.morph.rate = finite_or(self.morph.rate, defaults.morph.rate).clamp(0.001, 1.0);
        self.morph.rotation_per_tick =
            finite_or(self.morph.rotation_per_tick, defaults.morph.rotation_per_tick).clamp(-0.1, 0.1);

        self.gesture.pinch_threshold =
            finite_or(self.gesture.pinch_threshold, defaults.gesture.pinch_threshold).clamp(0.0, 1.0);
        self.gesture.upload_preview_secs =
            finite_or(self.gesture.upload_preview_secs, defaults.gesture.upload_preview_secs).clamp(0.0, 60.0);

        self.image.sanitize();

        self.window.width = self.window.width.clamp(320, 7680);
        self.window.height = self.window.height.clamp(240, 4320);
        self.window.fov_degrees = finite_or(self.window.fov_degrees, 50.0).clamp(10.0, 120.0);
        self.window.min_distance = finite_or(self.window.min_distance, 10.0).max(1.0);
        self.window.max_distance =
            finite_or(self.window.max_distance, 50.0).max(self.window.min_distance);
        self.window.camera_distance = finite_or(self.window.camera_distance, 25.0)
            .clamp(self.window.min_distance, self.window.max_distance);

        self.sim.video_fps = self.sim.video_fps.clamp(1, 240);
        self.sim.poll_interval_ms = self.sim.poll_interval_ms.clamp(1, 1000);
    }

    pub fn simulation_params(&self) -> SimulationParams {
        SimulationParams {
            morph_rate: self.morph.rate,
            rotation_per_tick: self.morph.rotation_per_tick,
            pinch_threshold: self.gesture.pinch_threshold,
            upload_preview: Duration::from_secs_f32(self.gesture.upload_preview_secs),
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.morph.rate, 0.08);
        assert_eq!(settings.gesture.pinch_threshold, 0.05);
        assert_eq!(settings.image, SamplerSettings::default());
        assert_eq!(settings.window.camera_distance, 25.0);
        let params = settings.simulation_params();
        assert_eq!(params.upload_preview, Duration::from_millis(1500));
    }

    #[test]
    fn test_partial_sections() {
        let settings = Settings::from_toml(
            r#"
            [morph]
            rate = 0.2

            [image]
            raster_size = 100
            brightness_min = 60
            "#,
        )
        .unwrap();
        assert_eq!(settings.morph.rate, 0.2);
        assert_eq!(settings.morph.rotation_per_tick, 0.001);
        assert_eq!(settings.image.raster_size, 100);
        assert_eq!(settings.image.brightness_min, 60);
        assert_eq!(settings.image.alpha_min, 128);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let settings = Settings::from_toml(
            r#"
            [morph]
            rate = 4.0
            [window]
            min_distance = 30.0
            max_distance = 20.0
            camera_distance = 5.0
            [sim]
            video_fps = 0
            poll_interval_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(settings.morph.rate, 1.0);
        assert_eq!(settings.window.max_distance, 30.0);
        assert_eq!(settings.window.camera_distance, 30.0);
        assert_eq!(settings.sim.video_fps, 1);
        assert_eq!(settings.sim.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_sampling_interval_from_sim_section() {
        let settings = Settings::from_toml("[sim]\npoll_interval_ms = 20").unwrap();
        assert_eq!(settings.sim.video_fps, 30);
        assert_eq!(settings.sim.poll_interval(), Duration::from_millis(20));
        assert_eq!(Settings::default().sim.poll_interval(), Duration::from_millis(5));
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        assert!(Settings::from_toml("[morph]\nrate = \"fast\"").is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/particle_morph.toml"))).is_err());
        assert!(Settings::load(None).is_ok());
    }
}
