use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::detection::domain::detector::DetectorFactory;
use crate::detection::domain::image_results::ImageResults;
use crate::dispatch::command::Command;
use crate::dispatch::command_queue::CommandSender;
use crate::dispatch::detector_worker::{self, WorkerHandle};
use crate::dispatch::dispatch_error::DispatchError;
use crate::dispatch::dispatch_logger::{DispatchLogger, NullDispatchLogger};
use crate::dispatch::result_relay::{self, DetectorEvent};
use crate::shared::config::DispatcherConfig;
use crate::shared::frame::{Frame, FrameUnit};
use crate::shared::timestamp::ResultOrderGuard;

/// Receives detector events on the thread that drains the dispatcher.
pub trait DetectorEventListener: Send {
    fn on_detector_started(&mut self);
    fn on_image_results(&mut self, results: ImageResults);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub frames_submitted: u64,
    pub frames_accepted: u64,
    pub frames_dropped: u64,
    pub results_delivered: u64,
}

/// Channels to the worker of the current start/stop session.
struct Session {
    commands: CommandSender,
    events: Receiver<DetectorEvent>,
    worker: WorkerHandle,
}

/// Runs a detector on a dedicated worker thread and feeds it frames without
/// ever blocking the caller.
///
/// At most `max_frames_waiting` frames may be between acceptance and result;
/// extra frames are dropped rather than queued. Results come back through
/// [`dispatch_events`](Self::dispatch_events) on the caller's own thread, in
/// the order the detector produced them.
///
/// The in-flight count is touched only from the caller's side, so it needs
/// no synchronisation.
pub struct AsyncDispatcher {
    factory: DetectorFactory,
    config: DispatcherConfig,
    listener: Option<Box<dyn DetectorEventListener>>,
    logger: Box<dyn DispatchLogger>,
    session: Option<Session>,
    in_flight: usize,
    accepted_at: VecDeque<(f64, Instant)>,
    order_guard: ResultOrderGuard,
    stats: DispatchStats,
}

impl AsyncDispatcher {
    /// A `max_frames_waiting` of 0 would refuse every frame, so it is raised
    /// to 1.
    pub fn new(factory: DetectorFactory, mut config: DispatcherConfig) -> Self {
        if config.max_frames_waiting == 0 {
            log::warn!("max_frames_waiting of 0 admits no frames; using 1");
            config.max_frames_waiting = 1;
        }
        Self {
            factory,
            config,
            listener: None,
            logger: Box::new(NullDispatchLogger),
            session: None,
            in_flight: 0,
            accepted_at: VecDeque::new(),
            order_guard: ResultOrderGuard::new(),
            stats: DispatchStats::default(),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn DispatchLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn set_listener(&mut self, listener: Box<dyn DetectorEventListener>) {
        self.listener = Some(listener);
    }

    /// Starts a worker and asks it to open the detector.
    ///
    /// Returns once the worker can take commands; `on_detector_started`
    /// fires later, after the detector has been opened.
    pub fn start(&mut self) -> Result<(), DispatchError> {
        if self.session.is_some() {
            return Err(DispatchError::AlreadyRunning);
        }

        let (relay, events) = result_relay::channel();
        let (commands, worker) = detector_worker::spawn(
            self.factory.clone(),
            self.config.detector.clone(),
            relay,
            &self.config.worker_thread_name,
        )?;
        commands.send(Command::Start)?;

        self.clear_in_flight();
        self.order_guard.reset();
        self.session = Some(Session {
            commands,
            events,
            worker,
        });
        self.logger.info("Detector worker started");
        Ok(())
    }

    /// Drops queued frames and resets, tells the worker to stop, and detaches
    /// from it.
    ///
    /// Results still in the pipeline are discarded. The returned handle can
    /// be joined to wait for the worker to release the detector; dropping it
    /// lets the worker finish on its own.
    pub fn stop(&mut self) -> Result<WorkerHandle, DispatchError> {
        let session = self.session.take().ok_or(DispatchError::NotRunning)?;

        session.commands.purge();
        if let Err(e) = session.commands.send(Command::Stop) {
            log::warn!("Stop not delivered: {e}");
        }

        self.clear_in_flight();
        self.logger.info("Detector worker stopping");
        Ok(session.worker)
    }

    /// Offers a frame to the detector. Returns whether it was accepted.
    ///
    /// Does nothing when not running. When the in-flight cap is reached the
    /// frame is dropped and counted.
    pub fn process(&mut self, frame: Frame, timestamp: f64) -> bool {
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        self.stats.frames_submitted += 1;

        if self.in_flight >= self.config.max_frames_waiting {
            self.stats.frames_dropped += 1;
            self.logger.frame_submitted(false);
            return false;
        }

        let command = Command::ProcessFrame(FrameUnit::new(frame, timestamp));
        if let Err(e) = session.commands.send(command) {
            log::warn!("Dropping frame at {timestamp:.3}s: {e}");
            self.stats.frames_dropped += 1;
            self.logger.frame_submitted(false);
            return false;
        }

        self.in_flight += 1;
        self.accepted_at.push_back((timestamp, Instant::now()));
        self.stats.frames_accepted += 1;
        self.logger.frame_submitted(true);
        log::debug!("Frames in flight: {}", self.in_flight);
        true
    }

    /// Drops queued frames and resets, then asks the detector to reset.
    /// Does nothing when not running.
    pub fn reset(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        session.commands.purge();
        if let Err(e) = session.commands.send(Command::Reset) {
            log::warn!("Reset not delivered: {e}");
        }
        self.clear_in_flight();
    }

    /// Delivers every event already relayed from the worker to the listener.
    /// Never blocks. Returns how many events were handled.
    pub fn dispatch_events(&mut self) -> Result<usize, DispatchError> {
        let mut handled = 0;
        while let Some(event) = self.try_next_event() {
            self.handle_event(event)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Waits up to `timeout` for an event, then delivers it and anything
    /// queued behind it.
    pub fn wait_events(&mut self, timeout: Duration) -> Result<usize, DispatchError> {
        let first = match self.session.as_ref() {
            Some(session) => session.events.recv_timeout(timeout).ok(),
            None => None,
        };
        let Some(event) = first else {
            return Ok(0);
        };
        self.handle_event(event)?;
        Ok(1 + self.dispatch_events()?)
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn max_frames_waiting(&self) -> usize {
        self.config.max_frames_waiting
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn logger(&self) -> &dyn DispatchLogger {
        self.logger.as_ref()
    }

    fn try_next_event(&self) -> Option<DetectorEvent> {
        self.session.as_ref()?.events.try_recv().ok()
    }

    fn handle_event(&mut self, event: DetectorEvent) -> Result<(), DispatchError> {
        match event {
            DetectorEvent::DetectorStarted => {
                log::info!("Detector started");
                if let Some(listener) = self.listener.as_mut() {
                    listener.on_detector_started();
                }
            }
            DetectorEvent::ImageResults(results) => {
                self.release_slot();
                self.order_guard.check(results.timestamp)?;

                let latency_ms = self.take_latency(results.timestamp);
                self.stats.results_delivered += 1;
                self.logger.result(latency_ms, results.faces.len());
                log::debug!("Frames in flight: {}", self.in_flight);

                if let Some(listener) = self.listener.as_mut() {
                    listener.on_image_results(results);
                }
            }
            DetectorEvent::FrameDiscarded => {
                self.release_slot();
                self.accepted_at.pop_front();
            }
        }
        Ok(())
    }

    fn release_slot(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    fn clear_in_flight(&mut self) {
        self.in_flight = 0;
        self.accepted_at.clear();
    }

    /// Pops acceptance records up to `timestamp` and returns the latency of
    /// the matching one.
    fn take_latency(&mut self, timestamp: f64) -> Option<f64> {
        let mut matched = None;
        while let Some(&(accepted_ts, accepted_at)) = self.accepted_at.front() {
            if accepted_ts > timestamp {
                break;
            }
            self.accepted_at.pop_front();
            if accepted_ts == timestamp {
                matched = Some(accepted_at.elapsed().as_secs_f64() * 1000.0);
            }
        }
        matched
    }
}

impl Drop for AsyncDispatcher {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.commands.purge();
            let _ = session.commands.send(Command::Stop);
        }
    }
}
