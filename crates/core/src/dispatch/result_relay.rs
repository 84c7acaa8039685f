use crossbeam_channel::{Receiver, Sender};

use crate::detection::domain::detector::ImageListener;
use crate::detection::domain::image_results::ImageResults;

/// Events marshalled from the worker back to the dispatcher's thread.
#[derive(Debug)]
pub enum DetectorEvent {
    DetectorStarted,
    ImageResults(ImageResults),
    /// A frame reached the worker while the detector was not running.
    /// Releases an in-flight slot; never shown to the listener.
    FrameDiscarded,
}

/// Creates a relay and the receiving end the dispatcher drains.
pub fn channel() -> (ResultRelay, Receiver<DetectorEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ResultRelay { tx }, rx)
}

/// Worker-side handle for posting events to the caller.
///
/// The relay does not keep the caller alive: once the receiving end is
/// dropped (the dispatcher stopped or went away) every post is silently
/// discarded.
#[derive(Clone)]
pub struct ResultRelay {
    tx: Sender<DetectorEvent>,
}

impl ResultRelay {
    pub fn detector_started(&self) -> bool {
        self.post(DetectorEvent::DetectorStarted)
    }

    pub fn image_results(&self, results: ImageResults) -> bool {
        self.post(DetectorEvent::ImageResults(results))
    }

    pub fn frame_discarded(&self) -> bool {
        self.post(DetectorEvent::FrameDiscarded)
    }

    /// Listener to register on a detector; forwards every result here.
    pub fn image_listener(&self) -> ImageListener {
        let relay = self.clone();
        Box::new(move |results| {
            relay.image_results(results);
        })
    }

    fn post(&self, event: DetectorEvent) -> bool {
        if self.tx.send(event).is_err() {
            log::debug!("Result relay target is gone; dropping event");
            return false;
        }
        true
    }
}
