use std::f64::consts::TAU;
use std::thread;
use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::{ColorFormat, Frame, FrameUnit, Rotation};

pub const DEFAULT_WIDTH: u32 = 320;
pub const DEFAULT_HEIGHT: u32 = 240;
pub const DEFAULT_FPS: f64 = 30.0;

/// Seconds for one full dark-to-lit-to-dark brightness cycle.
const BRIGHTNESS_PERIOD_S: f64 = 4.0;
const PATCH_FRACTION: f64 = 0.25;

/// Generates NV21 preview frames in place of a real camera.
///
/// Each frame has a uniform background whose brightness follows a slow sine
/// wave (so a detector sees both empty and populated stretches) and a bright
/// square patch moving left to right. With `realtime` the iterator sleeps to
/// deliver frames at the configured rate; otherwise frames come as fast as
/// they are pulled, stamped as if captured at that rate.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    fps: f64,
    frame_count: usize,
    realtime: bool,
    rotation: Rotation,
    closed: bool,
}

impl SyntheticCamera {
    pub fn new(frame_count: usize) -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
            frame_count,
            realtime: false,
            rotation: Rotation::default(),
            closed: false,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(2);
        self.height = height.max(2);
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        if fps.is_finite() && fps > 0.0 {
            self.fps = fps;
        }
        self
    }

    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Rotation the consumer should apply, as a mounted sensor would report.
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    fn render(&self, index: usize) -> Frame {
        let (w, h) = (self.width as usize, self.height as usize);
        let t = index as f64 / self.fps;

        let background = background_luma(t);
        let mut data = vec![background; ColorFormat::YuvNv21.buffer_len(self.width, self.height)];

        let patch = ((w.min(h) as f64) * PATCH_FRACTION).max(1.0) as usize;
        let travel = w.saturating_sub(patch).max(1);
        let x0 = (index * 4) % travel;
        let y0 = (h - patch.min(h)) / 2;
        for y in y0..(y0 + patch).min(h) {
            let row = y * w;
            data[row + x0..row + (x0 + patch).min(w)].fill(255);
        }

        // Neutral chroma.
        data[w * h..].fill(128);

        Frame::new(data, self.width, self.height, ColorFormat::YuvNv21).with_rotation(self.rotation)
    }
}

/// Background luma at `t` seconds, swinging between 0 and 180.
fn background_luma(t: f64) -> u8 {
    let phase = (TAU * t / BRIGHTNESS_PERIOD_S).sin();
    (90.0 + 90.0 * phase).round().clamp(0.0, 255.0) as u8
}

impl FrameSource for SyntheticCamera {
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<FrameUnit, Box<dyn std::error::Error>>> + '_> {
        let count = if self.closed { 0 } else { self.frame_count };
        let period = Duration::from_secs_f64(1.0 / self.fps);
        let opened = Instant::now();

        Box::new((0..count).map(move |i| {
            let timestamp = i as f64 / self.fps;
            if self.realtime {
                let due = opened + period * i as u32;
                if let Some(wait) = due.checked_duration_since(Instant::now()) {
                    thread::sleep(wait);
                }
            }
            Ok(FrameUnit::new(self.render(i), timestamp))
        }))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
