use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::dispatch::async_dispatcher::{AsyncDispatcher, DispatchStats};
use crate::dispatch::detector_worker::WorkerReport;
use crate::shared::frame_rate::FrameRateMeter;
use crate::shared::timestamp::TimestampGate;

pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Outcome of one [`LiveDetectionUseCase::execute`] run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSummary {
    pub frames_read: u64,
    /// Frames rejected by the timestamp gate before reaching the dispatcher.
    pub frames_gated: u64,
    pub dispatch: DispatchStats,
    /// `None` when the worker could not be joined.
    pub worker: Option<WorkerReport>,
    pub camera_fps: f64,
}

/// Feeds a frame source through an [`AsyncDispatcher`], the way a live
/// camera preview would.
///
/// Frames are offered as soon as they arrive and dropped by the dispatcher
/// when the detector is busy. With `pace_to_detector` the session instead
/// waits for a free slot before each frame, so every admitted frame is
/// analysed (used for still images).
pub struct LiveDetectionUseCase {
    source: Box<dyn FrameSource>,
    dispatcher: AsyncDispatcher,
    gate: TimestampGate,
    drain_timeout: Duration,
    pace_to_detector: bool,
    on_progress: Option<Box<dyn Fn(u64) -> bool + Send>>,
}

impl LiveDetectionUseCase {
    pub fn new(source: Box<dyn FrameSource>, dispatcher: AsyncDispatcher, epsilon: f64) -> Self {
        Self {
            source,
            dispatcher,
            gate: TimestampGate::new(epsilon),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            pace_to_detector: false,
            on_progress: None,
        }
    }

    pub fn with_pace_to_detector(mut self, pace: bool) -> Self {
        self.pace_to_detector = pace;
        self
    }

    /// How long to wait for outstanding results once the source is exhausted.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Called with the number of frames read; returning `false` cancels.
    pub fn with_progress(mut self, on_progress: Box<dyn Fn(u64) -> bool + Send>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn dispatcher(&self) -> &AsyncDispatcher {
        &self.dispatcher
    }

    pub fn execute(&mut self) -> Result<SessionSummary, Box<dyn std::error::Error>> {
        self.dispatcher.start()?;
        self.gate.reset();

        let mut summary = SessionSummary::default();
        let mut camera = FrameRateMeter::new();
        let fed = match self.feed(&mut summary, &mut camera) {
            Ok(()) => drain(&mut self.dispatcher, self.drain_timeout),
            Err(e) => Err(e),
        };

        summary.camera_fps = camera.fps();
        summary.dispatch = self.dispatcher.stats();
        summary.worker = match self.dispatcher.stop()?.join() {
            Ok(report) => Some(report),
            Err(e) => {
                log::error!("{e}");
                None
            }
        };
        self.source.close();
        self.dispatcher.logger().summary();

        fed?;
        Ok(summary)
    }

    fn feed(
        &mut self,
        summary: &mut SessionSummary,
        camera: &mut FrameRateMeter,
    ) -> Result<(), Box<dyn std::error::Error>> {
        for unit in self.source.frames() {
            let unit = unit?;
            summary.frames_read += 1;
            camera.tick();

            if !self.gate.admit(unit.timestamp) {
                log::debug!("Timestamp {:.3}s too close to previous; skipping", unit.timestamp);
                summary.frames_gated += 1;
                continue;
            }

            if self.pace_to_detector {
                wait_for_slot(&mut self.dispatcher, self.drain_timeout)?;
            }
            self.dispatcher.process(unit.frame, unit.timestamp);
            self.dispatcher.dispatch_events()?;

            if let Some(ref callback) = self.on_progress {
                if !callback(summary.frames_read) {
                    return Err("Cancelled".into());
                }
            }
        }
        Ok(())
    }
}

fn wait_for_slot(
    dispatcher: &mut AsyncDispatcher,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    while dispatcher.in_flight() >= dispatcher.max_frames_waiting() {
        if dispatcher.wait_events(timeout)? == 0 {
            log::warn!("No result within {}ms; offering frame anyway", timeout.as_millis());
            break;
        }
    }
    Ok(())
}

/// Delivers results still owed for accepted frames.
fn drain(
    dispatcher: &mut AsyncDispatcher,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    dispatcher.dispatch_events()?;
    while dispatcher.in_flight() > 0 {
        if dispatcher.wait_events(timeout)? == 0 {
            log::warn!("{} frame(s) still in flight at stop", dispatcher.in_flight());
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::infrastructure::synthetic_camera::SyntheticCamera;
    use crate::detection::domain::detector::{Detector, DetectorFactory};
    use crate::detection::domain::image_results::ImageResults;
    use crate::detection::infrastructure::simulated_detector::SimulatedDetector;
    use crate::dispatch::async_dispatcher::DetectorEventListener;
    use crate::shared::config::{DetectorSettings, DispatcherConfig};
    use crate::shared::frame::{ColorFormat, Frame, FrameUnit};
    use std::sync::{Arc, Mutex};

    struct VecSource {
        units: Vec<Result<FrameUnit, String>>,
        closed: bool,
    }

    impl FrameSource for VecSource {
        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<FrameUnit, Box<dyn std::error::Error>>> + '_> {
            Box::new(
                self.units
                    .drain(..)
                    .map(|u| u.map_err(Box::<dyn std::error::Error>::from)),
            )
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    #[derive(Default)]
    struct Collected {
        started: usize,
        timestamps: Vec<f64>,
        faces: usize,
    }

    struct Collector(Arc<Mutex<Collected>>);

    impl DetectorEventListener for Collector {
        fn on_detector_started(&mut self) {
            self.0.lock().unwrap().started += 1;
        }

        fn on_image_results(&mut self, results: ImageResults) {
            let mut c = self.0.lock().unwrap();
            c.timestamps.push(results.timestamp);
            c.faces += results.faces.len();
        }
    }

    fn simulated(latency_ms: u64) -> DetectorFactory {
        Arc::new(move |settings: &DetectorSettings| {
            Box::new(
                SimulatedDetector::new(settings.clone())
                    .with_latency(Duration::from_millis(latency_ms)),
            ) as Box<dyn Detector>
        })
    }

    fn dispatcher(latency_ms: u64) -> (AsyncDispatcher, Arc<Mutex<Collected>>) {
        let mut d = AsyncDispatcher::new(simulated(latency_ms), DispatcherConfig::default());
        let collected = Arc::new(Mutex::new(Collected::default()));
        d.set_listener(Box::new(Collector(collected.clone())));
        (d, collected)
    }

    fn bright(timestamp: f64) -> Result<FrameUnit, String> {
        Ok(FrameUnit::new(
            Frame::new(vec![200u8; 16], 4, 4, ColorFormat::Gray),
            timestamp,
        ))
    }

    #[test]
    fn test_paced_session_analyses_every_frame() {
        let (d, collected) = dispatcher(1);
        let camera = SyntheticCamera::new(12).with_size(32, 24);
        let mut use_case = LiveDetectionUseCase::new(Box::new(camera), d, 0.01)
            .with_pace_to_detector(true);

        let summary = use_case.execute().unwrap();

        assert_eq!(summary.frames_read, 12);
        assert_eq!(summary.frames_gated, 0);
        assert_eq!(summary.dispatch.frames_accepted, 12);
        assert_eq!(summary.dispatch.results_delivered, 12);
        let c = collected.lock().unwrap();
        assert_eq!(c.started, 1);
        assert_eq!(c.timestamps.len(), 12);
        assert!(c.timestamps.windows(2).all(|w| w[0] < w[1]));
        assert!(!use_case.dispatcher().is_running());
    }

    #[test]
    fn test_unpaced_session_drops_while_busy() {
        let (d, collected) = dispatcher(20);
        let camera = SyntheticCamera::new(10).with_size(16, 16);
        let mut use_case = LiveDetectionUseCase::new(Box::new(camera), d, 0.01);

        let summary = use_case.execute().unwrap();

        assert_eq!(summary.dispatch.frames_submitted, 10);
        assert!(summary.dispatch.frames_dropped > 0);
        assert_eq!(
            summary.dispatch.frames_accepted + summary.dispatch.frames_dropped,
            10
        );
        let c = collected.lock().unwrap();
        assert!(c.timestamps.windows(2).all(|w| w[0] <= w[1]));
        let report = summary.worker.unwrap();
        assert!(report.stopped);
    }

    #[test]
    fn test_gate_skips_close_timestamps() {
        let (d, collected) = dispatcher(0);
        let source = VecSource {
            units: vec![bright(1.0), bright(1.005), bright(1.0), bright(1.5)],
            closed: false,
        };
        let mut use_case =
            LiveDetectionUseCase::new(Box::new(source), d, 0.01).with_pace_to_detector(true);

        let summary = use_case.execute().unwrap();

        assert_eq!(summary.frames_read, 4);
        assert_eq!(summary.frames_gated, 2);
        let c = collected.lock().unwrap();
        assert_eq!(c.timestamps, [1.0, 1.5]);
        assert_eq!(c.faces, 2);
    }

    #[test]
    fn test_source_error_stops_dispatcher_and_propagates() {
        let (d, _) = dispatcher(0);
        let source = VecSource {
            units: vec![bright(1.0), Err("camera unplugged".into()), bright(2.0)],
            closed: false,
        };
        let mut use_case = LiveDetectionUseCase::new(Box::new(source), d, 0.01);

        let err = use_case.execute().unwrap_err();

        assert_eq!(err.to_string(), "camera unplugged");
        assert!(!use_case.dispatcher().is_running());
    }

    #[test]
    fn test_progress_can_cancel() {
        let (d, _) = dispatcher(0);
        let camera = SyntheticCamera::new(50).with_size(8, 8);
        let mut use_case = LiveDetectionUseCase::new(Box::new(camera), d, 0.01)
            .with_progress(Box::new(|read| read < 3));

        let err = use_case.execute().unwrap_err();

        assert_eq!(err.to_string(), "Cancelled");
        assert!(!use_case.dispatcher().is_running());
    }

    #[test]
    fn test_session_can_run_twice() {
        let (d, collected) = dispatcher(0);
        let source = VecSource {
            units: vec![bright(5.0)],
            closed: false,
        };
        let mut use_case =
            LiveDetectionUseCase::new(Box::new(source), d, 0.01).with_pace_to_detector(true);

        use_case.execute().unwrap();
        let second = use_case.execute().unwrap();

        assert_eq!(second.frames_read, 0);
        assert!(second.worker.unwrap().stopped);
        assert_eq!(collected.lock().unwrap().timestamps, [5.0]);
    }
}
