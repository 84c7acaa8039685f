//! Scripted detector used by the worker and dispatcher tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::detection::domain::detector::{
    CapabilityError, Detector, DetectorFactory, ImageListener,
};
use crate::detection::domain::face::Face;
use crate::detection::domain::image_results::ImageResults;
use crate::shared::config::DetectorSettings;
use crate::shared::frame::{ColorFormat, Frame};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Start,
    Stop,
    Reset,
    Process(f64),
    ListenerSet(bool),
    Dropped,
}

#[derive(Clone, Default)]
pub struct FakeOptions {
    /// Answer each frame from inside `process`.
    pub auto_complete: bool,
    pub fail_start: bool,
    pub fail_stop: bool,
    /// `process` blocks until a unit arrives here.
    pub gate: Option<Receiver<()>>,
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<Call>,
    pending: VecDeque<(Frame, f64)>,
    listener: Option<ImageListener>,
    threads: Vec<Option<String>>,
    instances: usize,
}

/// Test-side view of every fake detector built by one factory.
#[derive(Clone, Default)]
pub struct FakeRecorder {
    state: Arc<Mutex<RecorderState>>,
}

impl FakeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn processed(&self) -> Vec<f64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Process(ts) => Some(ts),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn instances(&self) -> usize {
        self.state.lock().unwrap().instances
    }

    /// Names of the threads every detector call was made on.
    pub fn threads(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().threads.clone()
    }

    /// Answers the oldest pending frame from the calling thread.
    pub fn complete_next(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some((frame, timestamp)) = state.pending.pop_front() else {
            return false;
        };
        if let Some(listener) = state.listener.as_ref() {
            listener(ImageResults::new(vec![Face::default()], frame, timestamp));
        }
        true
    }

    pub fn wait_until(&self, condition: impl Fn(&FakeRecorder) -> bool) -> bool {
        wait_until(|| condition(self))
    }

    fn record(&self, call: Call) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.threads.push(thread::current().name().map(str::to_string));
    }
}

pub struct FakeDetector {
    recorder: FakeRecorder,
    options: FakeOptions,
    running: bool,
}

impl FakeDetector {
    pub fn new(recorder: FakeRecorder, options: FakeOptions) -> Self {
        recorder.state.lock().unwrap().instances += 1;
        Self {
            recorder,
            options,
            running: false,
        }
    }
}

impl Detector for FakeDetector {
    fn start(&mut self) -> Result<(), CapabilityError> {
        self.recorder.record(Call::Start);
        if self.options.fail_start {
            return Err(CapabilityError::Start("no camera license".into()));
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CapabilityError> {
        self.recorder.record(Call::Stop);
        self.running = false;
        if self.options.fail_stop {
            return Err(CapabilityError::Stop("engine wedged".into()));
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.recorder.record(Call::Reset);
    }

    fn process(&mut self, frame: Frame, timestamp: f64) {
        self.recorder.record(Call::Process(timestamp));
        if let Some(gate) = &self.options.gate {
            let _ = gate.recv();
        }
        self.recorder
            .state
            .lock()
            .unwrap()
            .pending
            .push_back((frame, timestamp));
        if self.options.auto_complete {
            self.recorder.complete_next();
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn set_image_listener(&mut self, listener: Option<ImageListener>) {
        self.recorder.record(Call::ListenerSet(listener.is_some()));
        self.recorder.state.lock().unwrap().listener = listener;
    }
}

impl Drop for FakeDetector {
    fn drop(&mut self) {
        self.recorder.record(Call::Dropped);
    }
}

pub fn fake_factory(recorder: &FakeRecorder, options: FakeOptions) -> DetectorFactory {
    let recorder = recorder.clone();
    Arc::new(move |_settings: &DetectorSettings| {
        Box::new(FakeDetector::new(recorder.clone(), options.clone())) as Box<dyn Detector>
    })
}

pub fn gray_frame() -> Frame {
    Frame::new(vec![0u8; 16], 4, 4, ColorFormat::Gray)
}

/// Polls `condition` for up to two seconds.
pub fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}
