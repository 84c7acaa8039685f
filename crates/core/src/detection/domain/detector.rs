use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::detection::domain::image_results::ImageResults;
use crate::shared::config::DetectorSettings;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("detector failed to start: {0}")]
    Start(String),
    #[error("detector failed to stop: {0}")]
    Stop(String),
    #[error("license file not found: {}", .0.display())]
    License(PathBuf),
}

/// Callback a detector invokes, possibly from its own thread, once a frame
/// has been analysed.
pub type ImageListener = Box<dyn Fn(ImageResults) + Send + Sync>;

/// Domain interface for the face/emotion detection engine.
///
/// The engine is opaque: it accepts frames through `process` and reports
/// results asynchronously through the registered [`ImageListener`]. All calls
/// come from a single thread, never concurrently.
pub trait Detector: Send {
    fn start(&mut self) -> Result<(), CapabilityError>;

    fn stop(&mut self) -> Result<(), CapabilityError>;

    /// Clears any per-session state (face tracking, smoothing).
    fn reset(&mut self);

    /// Timestamps must be strictly increasing within a session.
    fn process(&mut self, frame: Frame, timestamp: f64);

    fn is_running(&self) -> bool;

    /// Replaces the result listener; `None` detaches it.
    fn set_image_listener(&mut self, listener: Option<ImageListener>);
}

/// Builds a fresh detector each time a worker session starts.
pub type DetectorFactory = Arc<dyn Fn(&DetectorSettings) -> Box<dyn Detector> + Send + Sync>;
