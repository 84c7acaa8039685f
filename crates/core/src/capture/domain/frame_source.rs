use crate::shared::frame::FrameUnit;

/// Produces timestamped frames for a detection session.
///
/// Implementations own their I/O (camera, files, generators); the session
/// only sees [`FrameUnit`]s. Timestamps are seconds since the source opened
/// and are not required to be spaced for the detector; the session gates them.
pub trait FrameSource: Send {
    /// Returns an iterator over frames in capture order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<FrameUnit, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the source.
    fn close(&mut self);
}
