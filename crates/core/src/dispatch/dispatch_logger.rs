use std::time::Instant;

/// Observer for dispatcher activity: admissions, drops, and result latency.
///
/// Backpressure drops are not errors, so this is the only place they become
/// visible.
pub trait DispatchLogger: Send {
    /// A frame was offered while running; `accepted` is false when the
    /// in-flight cap dropped it.
    fn frame_submitted(&mut self, accepted: bool);

    /// A result reached the listener. `latency_ms` is the time since the
    /// matching frame was accepted, when known.
    fn result(&mut self, latency_ms: Option<f64>, faces: usize);

    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used when the caller has no interest in stats.
pub struct NullDispatchLogger;

impl DispatchLogger for NullDispatchLogger {
    fn frame_submitted(&mut self, _accepted: bool) {}
    fn result(&mut self, _latency_ms: Option<f64>, _faces: usize) {}
    fn info(&mut self, _message: &str) {}
}

/// Accumulates counts and latency totals and reports them through `log`.
///
/// Only running totals are kept, so a session of any length uses constant
/// memory. Progress lines are throttled to one every `throttle_results`
/// results.
pub struct StdoutDispatchLogger {
    throttle_results: usize,
    accepted: u64,
    dropped: u64,
    results: u64,
    results_with_faces: u64,
    latency_count: u64,
    latency_sum_ms: f64,
    latency_max_ms: f64,
    start_time: Instant,
}

impl StdoutDispatchLogger {
    pub fn new(throttle_results: usize) -> Self {
        Self {
            throttle_results: throttle_results.max(1),
            accepted: 0,
            dropped: 0,
            results: 0,
            results_with_faces: 0,
            latency_count: 0,
            latency_sum_ms: 0.0,
            latency_max_ms: 0.0,
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        let submitted = self.accepted + self.dropped;
        if submitted == 0 && self.results == 0 {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = Vec::new();

        lines.push(format!(
            "Dispatch summary ({} results, {elapsed_s:.1}s total):",
            self.results
        ));

        let drop_pct = if submitted > 0 {
            self.dropped as f64 / submitted as f64 * 100.0
        } else {
            0.0
        };
        lines.push(format!(
            "  Frames: {submitted} submitted, {} accepted, {} dropped ({drop_pct:.1}%)",
            self.accepted, self.dropped
        ));
        lines.push(format!(
            "  Faces found in {}/{} results",
            self.results_with_faces, self.results
        ));

        if let Some(avg) = self.average_latency_ms() {
            lines.push(format!(
                "  Latency: avg {avg:.1}ms  max {:.1}ms",
                self.latency_max_ms
            ));
        }

        if self.results > 0 && elapsed_s > 0.0 {
            let rate = self.results as f64 / elapsed_s;
            lines.push(format!("  Throughput: {rate:.1} results/s"));
        }

        Some(lines.join("\n"))
    }

    fn average_latency_ms(&self) -> Option<f64> {
        (self.latency_count > 0).then(|| self.latency_sum_ms / self.latency_count as f64)
    }
}

impl Default for StdoutDispatchLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl DispatchLogger for StdoutDispatchLogger {
    fn frame_submitted(&mut self, accepted: bool) {
        if accepted {
            self.accepted += 1;
        } else {
            self.dropped += 1;
        }
    }

    fn result(&mut self, latency_ms: Option<f64>, faces: usize) {
        self.results += 1;
        if faces > 0 {
            self.results_with_faces += 1;
        }
        if let Some(ms) = latency_ms {
            self.latency_count += 1;
            self.latency_sum_ms += ms;
            self.latency_max_ms = self.latency_max_ms.max(ms);
        }
        if self.results % self.throttle_results as u64 == 0 {
            log::info!(
                "Processed {} results ({} frames dropped)",
                self.results,
                self.dropped
            );
        }
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
