// Gesture sampling loop.
//
// `Sampler` does one poll: skip if the video frame has not advanced, otherwise
// classify and build a sample. `VisionService` runs it on its own thread and
// delivers samples over an mpsc channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::{GestureClassifier, VideoSource};
use crate::engine::mode::GestureSample;

// ============================================================================
// FrameGate
// ============================================================================

/// Admits each distinct frame time once.
#[derive(Debug, Default)]
pub struct FrameGate {
    last_time: Option<f64>,
}

impl FrameGate {
    pub fn admit(&mut self, time: f64) -> bool {
        if self.last_time == Some(time) {
            return false;
        }
        self.last_time = Some(time);
        true
    }
}

// ============================================================================
// Sampler
// ============================================================================

pub struct Sampler {
    video: Box<dyn VideoSource>,
    classifier: Box<dyn GestureClassifier>,
    gate: FrameGate,
    started: Instant,
    failures: u64,
}

impl Sampler {
    pub fn new(video: Box<dyn VideoSource>, classifier: Box<dyn GestureClassifier>) -> Self {
        Self {
            video,
            classifier,
            gate: FrameGate::default(),
            started: Instant::now(),
            failures: 0,
        }
    }

    /// Classify the current frame if it is new.
    ///
    /// Returns `None` for a missing or repeated frame and for a failed
    /// classification; the caller keeps its previous state in all three cases.
    pub fn poll(&mut self) -> Option<GestureSample> {
        let frame = self.video.current_frame()?;
        if !self.gate.admit(frame.time) {
            return None;
        }
        let timestamp_ms = self.started.elapsed().as_millis() as u64;
        match self.classifier.classify(&frame, timestamp_ms) {
            Ok(recognition) => Some(recognition.to_sample()),
            Err(err) => {
                self.failures += 1;
                warn!("prediction error at {timestamp_ms} ms: {err:#}");
                None
            }
        }
    }

    /// Classification errors so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }
}

// ============================================================================
// VisionService
// ============================================================================

/// Owns the sampling thread. Stopping (or dropping) cancels the loop before
/// its next classification and joins the thread, which drops the video source
/// and classifier with it.
pub struct VisionService {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl VisionService {
    /// Spawn the loop. `poll_interval` is the sleep between polls.
    pub fn start(mut sampler: Sampler, poll_interval: Duration) -> (Self, Receiver<GestureSample>) {
        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();

        let handle = thread::Builder::new()
            .name("gesture-sampler".into())
            .spawn(move || {
                info!("gesture sampling started");
                while !flag.load(Ordering::Acquire) {
                    if let Some(sample) = sampler.poll() {
                        debug!("gesture {} ({} landmarks)", sample.label,
                            sample.landmarks.as_ref().map_or(0, Vec::len));
                        if tx.send(sample).is_err() {
                            break;
                        }
                    }
                    thread::sleep(poll_interval);
                }
                info!("gesture sampling stopped after {} failed predictions", sampler.failures());
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!("could not spawn gesture sampler: {err}");
                None
            }
        };
        (Self { cancel, handle }, rx)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("gesture sampler thread panicked");
            }
        }
    }
}

impl Drop for VisionService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mode::GestureLabel;
    use crate::vision::{Category, Recognition, VideoFrame};
    use anyhow::{anyhow, Result};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Plays back a fixed list of frame times, then repeats the last one.
    struct ScriptedVideo {
        times: VecDeque<Option<f64>>,
        last: Option<f64>,
    }

    impl ScriptedVideo {
        fn new(times: &[Option<f64>]) -> Self {
            Self { times: times.iter().copied().collect(), last: None }
        }
    }

    impl VideoSource for ScriptedVideo {
        fn current_frame(&mut self) -> Option<VideoFrame> {
            if let Some(next) = self.times.pop_front() {
                self.last = next;
            }
            self.last.map(|time| VideoFrame { time, image: None })
        }
    }

    /// Returns labels in order; "!" means fail.
    struct ScriptedClassifier {
        labels: VecDeque<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl GestureClassifier for ScriptedClassifier {
        fn classify(&mut self, _frame: &VideoFrame, _ts: u64) -> Result<Recognition> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.labels.pop_front() {
                Some("!") => Err(anyhow!("model hiccup")),
                Some(label) => Ok(Recognition {
                    gestures: vec![vec![Category::new(label, 0.9)]],
                    landmarks: vec![],
                }),
                None => Ok(Recognition::default()),
            }
        }
    }

    fn classifier(labels: &[&'static str]) -> (ScriptedClassifier, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = ScriptedClassifier { labels: labels.iter().copied().collect(), calls: calls.clone() };
        (c, calls)
    }

    #[test]
    fn test_frame_gate_dedups() {
        let mut gate = FrameGate::default();
        assert!(gate.admit(0.0));
        assert!(!gate.admit(0.0));
        assert!(gate.admit(0.033));
        assert!(!gate.admit(0.033));
        assert!(gate.admit(0.0));
    }

    #[test]
    fn test_repeated_and_missing_frames_are_skipped() {
        let video = ScriptedVideo::new(&[None, Some(0.0), Some(0.0), Some(0.1), Some(0.1)]);
        let (classifier, calls) = classifier(&["Open_Palm", "Closed_Fist"]);
        let mut sampler = Sampler::new(Box::new(video), Box::new(classifier));

        assert_eq!(sampler.poll(), None);
        assert_eq!(sampler.poll().map(|s| s.label), Some(GestureLabel::OpenPalm));
        assert_eq!(sampler.poll(), None);
        assert_eq!(sampler.poll().map(|s| s.label), Some(GestureLabel::ClosedFist));
        assert_eq!(sampler.poll(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_prediction_is_skipped() {
        let video = ScriptedVideo::new(&[Some(0.0), Some(0.1), Some(0.2)]);
        let (classifier, _) = classifier(&["Open_Palm", "!", "Victory"]);
        let mut sampler = Sampler::new(Box::new(video), Box::new(classifier));

        assert!(sampler.poll().is_some());
        assert_eq!(sampler.poll(), None);
        assert_eq!(sampler.failures(), 1);
        assert_eq!(sampler.poll().map(|s| s.label), Some(GestureLabel::Victory));
    }

    /// A new frame on every call.
    struct EndlessVideo(f64);

    impl VideoSource for EndlessVideo {
        fn current_frame(&mut self) -> Option<VideoFrame> {
            self.0 += 1.0;
            Some(VideoFrame { time: self.0, image: None })
        }
    }

    #[test]
    fn test_service_delivers_and_stops() {
        let (classifier, calls) = classifier(&["Closed_Fist"]);
        let sampler = Sampler::new(Box::new(EndlessVideo(0.0)), Box::new(classifier));
        let (mut service, rx) = VisionService::start(sampler, Duration::from_millis(1));

        let first = rx.recv_timeout(Duration::from_secs(5)).expect("no sample");
        assert_eq!(first.label, GestureLabel::ClosedFist);
        assert!(service.is_running());

        service.stop();
        assert!(!service.is_running());
        let after_stop = calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
        // Sender dropped with the thread.
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(10)).is_err());
    }
}
