use crate::shared::frame::FrameUnit;

/// Instructions the dispatcher sends to its detector worker.
#[derive(Debug)]
pub enum Command {
    Start,
    ProcessFrame(FrameUnit),
    Reset,
    Stop,
}

impl Command {
    /// Frames and resets go stale once a reset or stop is requested behind
    /// them; start and stop must always run.
    pub fn is_purgeable(&self) -> bool {
        matches!(self, Command::ProcessFrame(_) | Command::Reset)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::ProcessFrame(_) => "process_frame",
            Command::Reset => "reset",
            Command::Stop => "stop",
        }
    }
}
