use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::{ColorFormat, Frame, FrameUnit};

/// Spacing between still images when none is given, wide enough to clear the
/// default timestamp gate.
pub const DEFAULT_IMAGE_INTERVAL: Duration = Duration::from_millis(100);

/// Presents a list of still images as a frame source.
///
/// Each file is decoded with the `image` crate into an RGB frame when it is
/// reached, and stamped `index * interval` seconds.
pub struct ImageFileSource {
    paths: Vec<PathBuf>,
    interval: Duration,
}

impl ImageFileSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            interval: DEFAULT_IMAGE_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn load_rgb(path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)
        .map_err(|e| format!("failed to open {}: {e}", path.display()))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, ColorFormat::Rgb))
}

impl FrameSource for ImageFileSource {
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<FrameUnit, Box<dyn std::error::Error>>> + '_> {
        let interval = self.interval.as_secs_f64();
        Box::new(self.paths.iter().enumerate().map(
            move |(i, path)| -> Result<FrameUnit, Box<dyn std::error::Error>> {
                let frame = load_rgb(path)?;
                Ok(FrameUnit::new(frame, i as f64 * interval))
            },
        ))
    }

    fn close(&mut self) {
        self.paths.clear();
    }
}
