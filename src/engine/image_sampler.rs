// Reference-image silhouette sampling.
//
// The image is squashed onto a small square raster, visible pixels are kept,
// and their raster coordinates become particle positions in a centred square
// of world space. Decoding and sampling run off the frame loop; see `ImageJobs`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::{Context, Result};
use image::DynamicImage;
use image::imageops::FilterType;
use log::{debug, info, warn};
use rand::Rng;
use serde::Deserialize;

use super::shapes::{PointSet, PARTICLE_COUNT};

// ============================================================================
// SETTINGS
// ============================================================================

/// Thresholds and world mapping for silhouette sampling.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// Side of the square raster the image is resized to.
    pub raster_size: u32,
    /// Pixels with alpha at or below this are treated as transparent.
    pub alpha_min: u8,
    /// Pixels with mean RGB at or below this are treated as background.
    pub brightness_min: u8,
    /// Side of the world-space square the raster maps onto.
    pub extent: f32,
    /// Total width of the random depth offset (centred on z = 0).
    pub depth_jitter: f32,
    /// Side of the random cube used when no pixel survives.
    pub fallback_cube: f32,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            raster_size: 200,
            alpha_min: 128,
            brightness_min: 30,
            extent: 14.0,
            depth_jitter: 1.0,
            fallback_cube: 10.0,
        }
    }
}

impl SamplerSettings {
    pub fn sanitize(&mut self) {
        self.raster_size = self.raster_size.clamp(8, 1024);
        if !(self.extent.is_finite() && self.extent > 0.0) {
            self.extent = 14.0;
        }
        if !(self.depth_jitter.is_finite() && self.depth_jitter >= 0.0) {
            self.depth_jitter = 1.0;
        }
        if !(self.fallback_cube.is_finite() && self.fallback_cube > 0.0) {
            self.fallback_cube = 10.0;
        }
    }
}

// ============================================================================
// SAMPLING
// ============================================================================

/// World-space (x, y) of every visible pixel, in raster scan order.
pub fn silhouette_pixels(image: &DynamicImage, settings: &SamplerSettings) -> Vec<[f32; 2]> {
    let size = settings.raster_size;
    let raster = image.resize_exact(size, size, FilterType::Triangle).to_rgba8();
    let scale = settings.extent / size as f32;
    let half = settings.extent / 2.0;

    let mut pixels = Vec::new();
    for (x, y, px) in raster.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let brightness = (r as f32 + g as f32 + b as f32) / 3.0;
        if a > settings.alpha_min && brightness > settings.brightness_min as f32 {
            // Raster y grows downward, world y grows upward.
            pixels.push([x as f32 * scale - half, -(y as f32 * scale - half)]);
        }
    }
    pixels
}

/// Particle positions following the visible content of `image`.
///
/// Pixels are reused round-robin when there are fewer of them than particles.
/// A blank image yields a random cube instead of an empty or NaN target.
pub fn derive_image_points<R: Rng + ?Sized>(
    image: &DynamicImage,
    settings: &SamplerSettings,
    rng: &mut R,
) -> PointSet {
    let pixels = silhouette_pixels(image, settings);
    if pixels.is_empty() {
        debug!("no visible pixels in reference image, using fallback cube");
        return fallback_cube(settings.fallback_cube, rng);
    }

    let jitter = settings.depth_jitter;
    PointSet::from_fn(|i| {
        let [x, y] = pixels[i % pixels.len()];
        let z = (rng.r#gen::<f32>() - 0.5) * jitter;
        [x, y, z]
    })
}

fn fallback_cube<R: Rng + ?Sized>(side: f32, rng: &mut R) -> PointSet {
    PointSet::from_fn(|_| {
        [
            (rng.r#gen::<f32>() - 0.5) * side,
            (rng.r#gen::<f32>() - 0.5) * side,
            (rng.r#gen::<f32>() - 0.5) * side,
        ]
    })
}

pub fn decode_file(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("failed to decode image {}", path.display()))
}

pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).context("failed to decode image bytes")
}

// ============================================================================
// BACKGROUND JOBS
// ============================================================================

/// Where an uploaded image comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    File(PathBuf),
    Bytes(Arc<[u8]>),
    Decoded(Arc<DynamicImage>),
}

impl ImageSource {
    fn decode(&self) -> Result<DynamicImage> {
        match self {
            Self::File(path) => decode_file(path),
            Self::Bytes(bytes) => decode_bytes(bytes),
            Self::Decoded(image) => Ok(image.as_ref().clone()),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            Self::Decoded(image) => format!("<{}x{} image>", image.width(), image.height()),
        }
    }
}

/// Outcome of the newest finished upload.
#[derive(Debug)]
pub enum ImageEvent {
    Ready(Arc<PointSet>),
    Failed(anyhow::Error),
}

struct JobResult {
    generation: u64,
    outcome: Result<PointSet>,
}

/// Runs decode + sampling on worker threads and hands back finished point sets.
///
/// Each submit bumps a generation counter; results from older submissions are
/// dropped on arrival. Dropping `ImageJobs` closes the channel, so a worker
/// that finishes afterwards just discards its result.
pub struct ImageJobs {
    settings: SamplerSettings,
    generation: u64,
    tx: Sender<JobResult>,
    rx: Receiver<JobResult>,
}

impl ImageJobs {
    pub fn new(settings: SamplerSettings) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { settings, generation: 0, tx, rx }
    }

    /// Start deriving points for `source`. Supersedes any job still running.
    pub fn submit(&mut self, source: ImageSource) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        let settings = self.settings;
        let tx = self.tx.clone();
        info!("deriving particle target from {} (upload #{generation})", source.describe());

        thread::spawn(move || {
            let outcome = source.decode().map(|image| {
                let mut rng = rand::thread_rng();
                derive_image_points(&image, &settings, &mut rng)
            });
            // Receiver gone means the app stopped; nothing to report.
            let _ = tx.send(JobResult { generation, outcome });
        });
        generation
    }

    /// Non-blocking. Returns the newest current-generation result, if any.
    pub fn poll(&mut self) -> Option<ImageEvent> {
        let mut latest = None;
        for result in self.rx.try_iter() {
            if result.generation != self.generation {
                warn!("discarding stale image job #{}", result.generation);
                continue;
            }
            latest = Some(match result.outcome {
                Ok(points) => ImageEvent::Ready(Arc::new(points)),
                Err(err) => ImageEvent::Failed(err),
            });
        }
        latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::time::{Duration, Instant};

    fn settings() -> SamplerSettings {
        SamplerSettings::default()
    }

    /// 200x200 transparent image with an opaque white square at [x0, x1) x [y0, y1).
    fn square_image(x0: u32, x1: u32, y0: u32, y1: u32) -> DynamicImage {
        let mut img = RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 0]));
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_filters_transparent_and_dark_pixels() {
        let mut img = RgbaImage::from_pixel(200, 200, Rgba([255, 255, 255, 100]));
        img.put_pixel(10, 10, Rgba([10, 10, 10, 255]));
        img.put_pixel(20, 20, Rgba([200, 100, 50, 255]));
        let pixels = silhouette_pixels(&DynamicImage::ImageRgba8(img), &settings());
        assert_eq!(pixels.len(), 1);
        // x' = 20/200*14 - 7, y' = -(20/200*14 - 7)
        let [x, y] = pixels[0];
        assert!((x - -5.6).abs() < 1e-4);
        assert!((y - 5.6).abs() < 1e-4);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let mut img = RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 0]));
        img.put_pixel(0, 0, Rgba([255, 255, 255, 128]));
        img.put_pixel(1, 0, Rgba([30, 30, 30, 255]));
        img.put_pixel(2, 0, Rgba([31, 31, 31, 129]));
        let pixels = silhouette_pixels(&DynamicImage::ImageRgba8(img), &settings());
        assert_eq!(pixels.len(), 1);
    }

    #[test]
    fn test_points_follow_silhouette_with_wraparound() {
        // Top-left quadrant: raster x, y in [0, 100).
        let img = square_image(0, 100, 0, 100);
        let mut rng = StdRng::seed_from_u64(5);
        let points = derive_image_points(&img, &settings(), &mut rng);
        assert_eq!(points.len(), PARTICLE_COUNT * 3);
        assert!(points.all_finite());
        for [x, y, z] in points.points() {
            assert!((-7.0..0.0).contains(&x), "x = {x}");
            assert!(y > 0.0 && y <= 7.0, "y = {y}");
            assert!(z.abs() <= 0.5);
        }
        // 10_000 visible pixels, 15_000 particles: particle 10_000 reuses pixel 0.
        assert_eq!(points.point(10_000)[..2], points.point(0)[..2]);
    }

    #[test]
    fn test_blank_image_falls_back_to_cube() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 255])));
        let mut rng = StdRng::seed_from_u64(8);
        let points = derive_image_points(&img, &settings(), &mut rng);
        assert_eq!(points.len(), PARTICLE_COUNT * 3);
        assert!(points.as_slice().iter().all(|v| v.abs() <= 5.0));
        // Not a flat sheet.
        assert!(points.points().any(|[_, _, z]| z.abs() > 1.0));
    }

    #[test]
    fn test_rederivation_is_stable() {
        let img = square_image(50, 150, 20, 180);
        let mut rng = StdRng::seed_from_u64(1);
        let a = derive_image_points(&img, &settings(), &mut rng);
        let b = derive_image_points(&img, &settings(), &mut rng);
        assert_eq!(a.len(), b.len());
        // Same pixel assignment, only the depth jitter differs.
        for (pa, pb) in a.points().zip(b.points()) {
            assert_eq!(pa[..2], pb[..2]);
        }
        let mean_z = |p: &PointSet| p.points().map(|[_, _, z]| z).sum::<f32>() / PARTICLE_COUNT as f32;
        assert!((mean_z(&a) - mean_z(&b)).abs() < 0.05);
        assert!(a != b);
    }

    #[test]
    fn test_any_source_size_is_resampled() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(37, 512, Rgba([255, 0, 0, 255])));
        let pixels = silhouette_pixels(&img, &settings());
        assert_eq!(pixels.len(), 200 * 200);
    }

    #[test]
    fn test_jobs_keep_only_latest_upload() {
        let mut jobs = ImageJobs::new(settings());
        let first = jobs.submit(ImageSource::Decoded(Arc::new(square_image(0, 10, 0, 10))));
        let second = jobs.submit(ImageSource::Decoded(Arc::new(square_image(190, 200, 190, 200))));
        assert!(second > first);

        let deadline = Instant::now() + Duration::from_secs(10);
        let points = loop {
            match jobs.poll() {
                Some(ImageEvent::Ready(points)) => break points,
                Some(ImageEvent::Failed(err)) => panic!("job failed: {err:#}"),
                None if Instant::now() > deadline => panic!("image job timed out"),
                None => thread::sleep(Duration::from_millis(5)),
            }
        };
        // Bottom-right square wins.
        assert!(points.points().all(|[x, y, _]| x > 0.0 && y < 0.0));
    }

    #[test]
    fn test_jobs_report_decode_failure() {
        let mut jobs = ImageJobs::new(settings());
        jobs.submit(ImageSource::Bytes(Arc::from(&b"not an image"[..])));
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match jobs.poll() {
                Some(ImageEvent::Failed(_)) => break,
                Some(ImageEvent::Ready(_)) => panic!("garbage decoded"),
                None if Instant::now() > deadline => panic!("image job timed out"),
                None => thread::sleep(Duration::from_millis(5)),
            }
        }
    }
}
