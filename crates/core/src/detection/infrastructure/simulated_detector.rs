use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use ndarray::{Array2, Axis};

use crate::detection::domain::detector::{CapabilityError, Detector, ImageListener};
use crate::detection::domain::face::{
    Emotions, Expressions, Face, FacePoint, Measurements, Orientation,
};
use crate::detection::domain::image_results::ImageResults;
use crate::shared::config::DetectorSettings;
use crate::shared::frame::{ColorFormat, Frame};

/// Mean luma (0-255) below which a frame is treated as empty.
pub const DEFAULT_DARK_THRESHOLD: f64 = 40.0;
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(30);

enum Job {
    Frame(Frame, f64),
    Reset,
}

/// Brightness-driven stand-in for a face/emotion engine.
///
/// Frames are analysed on the detector's own thread after an artificial
/// latency, and results are reported from that thread, so callers see the
/// same asynchronous behaviour as a vendor SDK. A frame brighter than the
/// dark threshold yields one face whose scores follow its brightness and
/// whose landmarks follow its brightest area.
pub struct SimulatedDetector {
    settings: DetectorSettings,
    latency: Duration,
    dark_threshold: f64,
    listener: Arc<Mutex<Option<ImageListener>>>,
    jobs: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self {
            settings,
            latency: DEFAULT_LATENCY,
            dark_threshold: DEFAULT_DARK_THRESHOLD,
            listener: Arc::new(Mutex::new(None)),
            jobs: None,
            handle: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_dark_threshold(mut self, threshold: f64) -> Self {
        self.dark_threshold = threshold;
        self
    }
}

impl Detector for SimulatedDetector {
    fn start(&mut self) -> Result<(), CapabilityError> {
        if self.jobs.is_some() {
            return Err(CapabilityError::Start("already running".into()));
        }
        if let Some(path) = &self.settings.license_path {
            if !path.exists() {
                return Err(CapabilityError::License(path.clone()));
            }
        }

        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let mut analyser = Analyser {
            settings: self.settings.clone(),
            dark_threshold: self.dark_threshold,
            tracker: FaceTracker::default(),
        };
        let latency = self.latency;
        let listener = self.listener.clone();

        let handle = thread::Builder::new()
            .name("simulated-detector".into())
            .spawn(move || {
                for job in rx {
                    match job {
                        Job::Frame(frame, timestamp) => {
                            thread::sleep(latency);
                            let faces = analyser.analyse(&frame);
                            let results = ImageResults::new(faces, frame, timestamp);
                            if let Ok(guard) = listener.lock() {
                                if let Some(listener) = guard.as_ref() {
                                    listener(results);
                                }
                            }
                        }
                        Job::Reset => analyser.tracker.reset(),
                    }
                }
            })
            .map_err(|e| CapabilityError::Start(e.to_string()))?;

        self.jobs = Some(tx);
        self.handle = Some(handle);
        log::info!(
            "Simulated detector started (latency {}ms, dark threshold {})",
            self.latency.as_millis(),
            self.dark_threshold
        );
        Ok(())
    }

    /// Finishes queued frames, then joins the processing thread.
    fn stop(&mut self) -> Result<(), CapabilityError> {
        self.jobs = None;
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| CapabilityError::Stop("processing thread panicked".into()))?;
            log::info!("Simulated detector stopped");
        }
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(jobs) = &self.jobs {
            let _ = jobs.send(Job::Reset);
        }
    }

    fn process(&mut self, frame: Frame, timestamp: f64) {
        match &self.jobs {
            Some(jobs) => {
                let _ = jobs.send(Job::Frame(frame, timestamp));
            }
            None => log::debug!("Simulated detector not running; ignoring frame"),
        }
    }

    fn is_running(&self) -> bool {
        self.jobs.is_some()
    }

    fn set_image_listener(&mut self, listener: Option<ImageListener>) {
        if let Ok(mut guard) = self.listener.lock() {
            *guard = listener;
        }
    }
}

impl Drop for SimulatedDetector {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Assigns a stable id while a face stays in view.
#[derive(Default)]
struct FaceTracker {
    next_id: u32,
    current: Option<u32>,
}

impl FaceTracker {
    fn observe(&mut self, present: bool) -> Option<u32> {
        if !present {
            self.current = None;
            return None;
        }
        let id = *self.current.get_or_insert_with(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        });
        Some(id)
    }

    fn reset(&mut self) {
        self.current = None;
    }
}

struct Analyser {
    settings: DetectorSettings,
    dark_threshold: f64,
    tracker: FaceTracker,
}

impl Analyser {
    fn analyse(&mut self, frame: &Frame) -> Vec<Face> {
        let Some(luma) = luma(frame) else {
            return Vec::new();
        };
        let mean = luma.mean().unwrap_or(0.0);
        let Some(id) = self.tracker.observe(mean >= self.dark_threshold) else {
            return Vec::new();
        };

        let brightness = (mean / 255.0).clamp(0.0, 1.0) as f32;
        let contrast = (luma.std(0.0) / 128.0).clamp(0.0, 1.0) as f32;
        let (cx, cy) = bright_centroid(&luma, mean);
        let (w, h) = (luma.ncols() as f32, luma.nrows() as f32);

        let emotions = if self.settings.detect_all_emotions {
            Emotions {
                joy: 100.0 * brightness,
                sadness: 100.0 * (1.0 - brightness),
                surprise: 100.0 * contrast,
                engagement: 100.0 * (brightness + contrast) / 2.0,
                valence: 200.0 * brightness - 100.0,
                ..Default::default()
            }
        } else {
            Emotions::default()
        };
        let expressions = if self.settings.detect_all_expressions {
            Expressions {
                attention: 100.0 * (1.0 - 2.0 * (cx / w - 0.5).abs()),
                smile: 90.0 * brightness,
                mouth_open: 100.0 * contrast,
                eye_closure: 50.0 * (1.0 - brightness),
                brow_raise: 80.0 * contrast,
                ..Default::default()
            }
        } else {
            Expressions::default()
        };

        let eye_offset = w * 0.1;
        vec![Face {
            id,
            emotions,
            expressions,
            measurements: Measurements {
                orientation: Orientation {
                    yaw: (cx / w - 0.5) * 60.0,
                    pitch: (cy / h - 0.5) * 40.0,
                    roll: 0.0,
                },
                interocular_distance: 2.0 * eye_offset,
            },
            points: vec![
                FacePoint { x: cx - eye_offset, y: cy },
                FacePoint { x: cx + eye_offset, y: cy },
                FacePoint { x: cx, y: cy + eye_offset },
            ],
        }]
    }
}

/// Luminance of a frame as an `(h, w)` array, Rec. 601 weights for colour.
fn luma(frame: &Frame) -> Option<Array2<f64>> {
    if let Some(plane) = frame.luma_plane() {
        return Some(plane.mapv(f64::from));
    }
    let view = frame.as_ndarray()?;
    let channel = |i: usize| view.index_axis(Axis(2), i).mapv(f64::from);
    let weighted = |r: usize, g: usize, b: usize| {
        channel(r) * 0.299 + channel(g) * 0.587 + channel(b) * 0.114
    };
    match frame.format() {
        ColorFormat::Gray => Some(channel(0)),
        ColorFormat::Rgb | ColorFormat::Rgba => Some(weighted(0, 1, 2)),
        ColorFormat::Bgr => Some(weighted(2, 1, 0)),
        ColorFormat::YuvNv21 => None,
    }
}

/// Centre of the pixels brighter than `mean`, or the frame centre for a flat
/// image.
fn bright_centroid(luma: &Array2<f64>, mean: f64) -> (f32, f32) {
    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0.0);
    for ((y, x), &v) in luma.indexed_iter() {
        if v > mean {
            sx += x as f64;
            sy += y as f64;
            n += 1.0;
        }
    }
    if n == 0.0 {
        return (luma.ncols() as f32 / 2.0, luma.nrows() as f32 / 2.0);
    }
    ((sx / n) as f32, (sy / n) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crossbeam_channel::Receiver;
    use rstest::rstest;
    use std::path::PathBuf;

    fn gray(value: u8, width: u32, height: u32) -> Frame {
        Frame::new(vec![value; (width * height) as usize], width, height, ColorFormat::Gray)
    }

    fn started(settings: DetectorSettings) -> (SimulatedDetector, Receiver<ImageResults>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut detector = SimulatedDetector::new(settings).with_latency(Duration::ZERO);
        detector.set_image_listener(Some(Box::new(move |r| {
            let _ = tx.send(r);
        })));
        detector.start().unwrap();
        (detector, rx)
    }

    fn next(rx: &Receiver<ImageResults>) -> ImageResults {
        rx.recv_timeout(Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_bright_frame_yields_one_face() {
        let (mut detector, rx) = started(DetectorSettings::default());
        detector.process(gray(200, 8, 8), 1.0);

        let results = next(&rx);
        assert_eq!(results.timestamp, 1.0);
        assert_eq!(results.faces.len(), 1);
        assert_relative_eq!(results.faces[0].emotions.joy, 100.0 * 200.0 / 255.0, epsilon = 1e-3);
        detector.stop().unwrap();
    }

    #[test]
    fn test_dark_frame_yields_no_face() {
        let (mut detector, rx) = started(DetectorSettings::default());
        detector.process(gray(10, 8, 8), 1.0);

        let results = next(&rx);
        assert!(!results.has_face());
        assert_eq!(results.frame.width(), 8);
        detector.stop().unwrap();
    }

    #[test]
    fn test_results_reported_from_detector_thread() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut detector = SimulatedDetector::new(DetectorSettings::default())
            .with_latency(Duration::ZERO);
        detector.set_image_listener(Some(Box::new(move |_| {
            let _ = tx.send(thread::current().name().map(str::to_string));
        })));
        detector.start().unwrap();
        detector.process(gray(200, 4, 4), 1.0);

        let name = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(name.as_deref(), Some("simulated-detector"));
        detector.stop().unwrap();
    }

    #[test]
    fn test_results_keep_submission_order() {
        let (mut detector, rx) = started(DetectorSettings::default());
        for i in 0..5 {
            detector.process(gray(200, 4, 4), i as f64);
        }
        detector.stop().unwrap();

        let timestamps: Vec<f64> = rx.try_iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, [0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_face_id_stable_until_face_lost_or_reset() {
        let (mut detector, rx) = started(DetectorSettings::default());
        detector.process(gray(200, 4, 4), 1.0);
        detector.process(gray(200, 4, 4), 2.0);
        detector.process(gray(0, 4, 4), 3.0);
        detector.process(gray(200, 4, 4), 4.0);
        detector.reset();
        detector.process(gray(200, 4, 4), 5.0);
        detector.stop().unwrap();

        let ids: Vec<Option<u32>> = rx
            .try_iter()
            .map(|r| r.primary_face().map(|f| f.id))
            .collect();
        assert_eq!(ids, [Some(0), Some(0), None, Some(1), Some(2)]);
    }

    #[test]
    fn test_disabled_metrics_stay_zero() {
        let settings = DetectorSettings {
            detect_all_emotions: false,
            detect_all_expressions: false,
            license_path: None,
        };
        let (mut detector, rx) = started(settings);
        detector.process(gray(220, 4, 4), 1.0);

        let face = next(&rx).faces.remove(0);
        assert_eq!(face.emotions, Emotions::default());
        assert_eq!(face.expressions, Expressions::default());
        assert!(face.measurements.interocular_distance > 0.0);
        detector.stop().unwrap();
    }

    #[test]
    fn test_start_twice_fails() {
        let (mut detector, _rx) = started(DetectorSettings::default());
        assert!(matches!(detector.start(), Err(CapabilityError::Start(_))));
        detector.stop().unwrap();
    }

    #[test]
    fn test_missing_license_fails_start() {
        let path = PathBuf::from("/nonexistent/framedetect.license");
        let mut detector = SimulatedDetector::new(DetectorSettings {
            license_path: Some(path.clone()),
            ..Default::default()
        });

        let err = detector.start().unwrap_err();

        assert!(matches!(err, CapabilityError::License(p) if p == path));
        assert!(!detector.is_running());
    }

    #[test]
    fn test_existing_license_allows_start() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut detector = SimulatedDetector::new(DetectorSettings {
            license_path: Some(file.path().to_path_buf()),
            ..Default::default()
        });

        detector.start().unwrap();
        assert!(detector.is_running());
        detector.stop().unwrap();
        assert!(!detector.is_running());
    }

    #[test]
    fn test_process_while_stopped_is_ignored() {
        let (tx, rx) = crossbeam_channel::unbounded::<ImageResults>();
        let mut detector = SimulatedDetector::new(DetectorSettings::default());
        detector.set_image_listener(Some(Box::new(move |r| {
            let _ = tx.send(r);
        })));

        detector.process(gray(200, 4, 4), 1.0);

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_detached_listener_receives_nothing() {
        let (mut detector, rx) = started(DetectorSettings::default());
        detector.set_image_listener(None);
        detector.process(gray(200, 4, 4), 1.0);
        detector.stop().unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_when_never_started_is_ok() {
        let mut detector = SimulatedDetector::new(DetectorSettings::default());
        assert!(detector.stop().is_ok());
    }

    #[rstest]
    #[case(ColorFormat::Rgb, vec![255, 0, 0], 0.299 * 255.0)]
    #[case(ColorFormat::Bgr, vec![255, 0, 0], 0.114 * 255.0)]
    #[case(ColorFormat::Rgba, vec![0, 255, 0, 9], 0.587 * 255.0)]
    #[case(ColorFormat::Gray, vec![77], 77.0)]
    fn test_luma_of_single_pixel(
        #[case] format: ColorFormat,
        #[case] data: Vec<u8>,
        #[case] expected: f64,
    ) {
        let frame = Frame::new(data, 1, 1, format);
        let l = luma(&frame).unwrap();
        assert_relative_eq!(l[[0, 0]], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_luma_of_nv21_uses_y_plane() {
        let mut data = vec![100u8; 4 * 2];
        data.extend_from_slice(&[255u8; 4]);
        let frame = Frame::new(data, 4, 2, ColorFormat::YuvNv21);

        let l = luma(&frame).unwrap();

        assert_eq!(l.dim(), (2, 4));
        assert_relative_eq!(l.mean().unwrap(), 100.0);
    }

    #[test]
    fn test_centroid_follows_bright_patch() {
        let mut l = Array2::<f64>::zeros((10, 10));
        l[[8, 2]] = 255.0;
        l[[8, 3]] = 255.0;

        let (cx, cy) = bright_centroid(&l, l.mean().unwrap());

        assert_relative_eq!(cx, 2.5);
        assert_relative_eq!(cy, 8.0);
    }

    #[test]
    fn test_centroid_of_flat_frame_is_centre() {
        let l = Array2::<f64>::from_elem((4, 6), 50.0);
        assert_eq!(bright_centroid(&l, 50.0), (3.0, 2.0));
    }
}
