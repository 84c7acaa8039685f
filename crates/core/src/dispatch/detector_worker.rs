use std::thread::{self, JoinHandle};

use crate::detection::domain::detector::{Detector, DetectorFactory};
use crate::dispatch::command::Command;
use crate::dispatch::command_queue::{self, CommandReceiver, CommandSender};
use crate::dispatch::dispatch_error::DispatchError;
use crate::dispatch::result_relay::ResultRelay;
use crate::shared::config::DetectorSettings;
use crate::shared::frame::FrameUnit;

/// What a worker did over its lifetime, returned when it is joined.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub frames_forwarded: u64,
    pub frames_discarded: u64,
    pub resets: u64,
    pub purged: u64,
    /// An explicit `Stop` was processed (as opposed to the queue closing).
    pub stopped: bool,
}

/// Ownership of a running or finished worker thread.
///
/// Dropping the handle detaches the thread; it still shuts itself down once
/// it processes `Stop`.
pub struct WorkerHandle {
    handle: JoinHandle<WorkerReport>,
}

impl WorkerHandle {
    pub fn join(self) -> Result<WorkerReport, DispatchError> {
        self.handle.join().map_err(|_| DispatchError::WorkerPanicked)
    }
}

/// Spawns a worker thread and waits until it is ready to take commands.
///
/// The thread creates its own command queue and hands the sending half back,
/// so the caller blocks only for thread start-up, not for the detector to
/// open.
pub fn spawn(
    factory: DetectorFactory,
    settings: DetectorSettings,
    relay: ResultRelay,
    thread_name: &str,
) -> Result<(CommandSender, WorkerHandle), DispatchError> {
    let (ready_tx, ready_rx) = crossbeam_channel::bounded::<CommandSender>(1);

    let handle = thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || {
            let (sender, receiver) = command_queue::channel();
            if ready_tx.send(sender).is_err() {
                return WorkerReport::default();
            }
            DetectorWorker::new(factory, settings, relay).run(receiver)
        })
        .map_err(DispatchError::Spawn)?;

    let sender = ready_rx
        .recv()
        .map_err(|_| DispatchError::WorkerUnavailable)?;
    Ok((sender, WorkerHandle { handle }))
}

/// Owns the detector for one start/stop session and drives it sequentially.
struct DetectorWorker {
    factory: DetectorFactory,
    settings: DetectorSettings,
    relay: ResultRelay,
    detector: Option<Box<dyn Detector>>,
    report: WorkerReport,
}

impl DetectorWorker {
    fn new(factory: DetectorFactory, settings: DetectorSettings, relay: ResultRelay) -> Self {
        Self {
            factory,
            settings,
            relay,
            detector: None,
            report: WorkerReport::default(),
        }
    }

    fn run(mut self, mut commands: CommandReceiver) -> WorkerReport {
        while let Some(command) = commands.recv() {
            match command {
                Command::Start => self.start_detector(),
                Command::ProcessFrame(unit) => self.process_frame(unit),
                Command::Reset => self.reset_detector(),
                Command::Stop => {
                    self.report.stopped = true;
                    break;
                }
            }
        }

        // Also reached when the dispatcher vanished without sending Stop.
        self.stop_detector();
        self.report.purged = commands.purged();
        log::debug!("Detector worker exiting");
        self.report
    }

    /// Opening is best-effort: a failed start is logged and `DetectorStarted`
    /// is still reported, after which frames are discarded because the
    /// detector is not running.
    fn start_detector(&mut self) {
        if self.detector.is_some() {
            log::warn!("Ignoring start: detector already open");
            return;
        }

        let mut detector = (self.factory)(&self.settings);
        detector.set_image_listener(Some(self.relay.image_listener()));
        if let Err(e) = detector.start() {
            log::error!("{e}");
        }
        self.detector = Some(detector);
        self.relay.detector_started();
    }

    fn process_frame(&mut self, unit: FrameUnit) {
        match self.detector.as_mut() {
            Some(detector) if detector.is_running() => {
                detector.process(unit.frame, unit.timestamp);
                self.report.frames_forwarded += 1;
            }
            _ => {
                log::debug!(
                    "Detector not running; discarding frame at {:.3}s",
                    unit.timestamp
                );
                self.report.frames_discarded += 1;
                self.relay.frame_discarded();
            }
        }
    }

    fn reset_detector(&mut self) {
        if let Some(detector) = self.detector.as_mut() {
            if detector.is_running() {
                detector.reset();
                self.report.resets += 1;
            }
        }
        log::info!("Detector reset");
    }

    fn stop_detector(&mut self) {
        if let Some(mut detector) = self.detector.take() {
            detector.set_image_listener(None);
            if let Err(e) = detector.stop() {
                log::error!("{e}");
            }
        }
    }
}
