use std::time::Instant;

/// Counts frames since the last reset and reports the average rate.
///
/// The live session keeps one for frames leaving the camera and one for
/// results coming back from the detector, which makes the effect of
/// backpressure visible as the gap between the two.
#[derive(Clone, Debug)]
pub struct FrameRateMeter {
    count: u64,
    since: Instant,
}

impl FrameRateMeter {
    pub fn new() -> Self {
        Self {
            count: 0,
            since: Instant::now(),
        }
    }

    pub fn tick(&mut self) {
        self.count += 1;
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.since = Instant::now();
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn fps(&self) -> f64 {
        self.fps_at(Instant::now())
    }

    pub fn fps_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.since).as_secs_f64();
        if elapsed > 0.0 {
            self.count as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl Default for FrameRateMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    #[test]
    fn test_fps_over_known_interval() {
        let mut meter = FrameRateMeter::new();
        for _ in 0..30 {
            meter.tick();
        }
        let fps = meter.fps_at(meter.since + Duration::from_secs(2));
        assert_relative_eq!(fps, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_elapsed_reports_zero() {
        let mut meter = FrameRateMeter::new();
        meter.tick();
        assert_eq!(meter.fps_at(meter.since), 0.0);
    }

    #[test]
    fn test_reset_clears_count() {
        let mut meter = FrameRateMeter::new();
        meter.tick();
        meter.tick();
        meter.reset();
        assert_eq!(meter.count(), 0);
    }
}
