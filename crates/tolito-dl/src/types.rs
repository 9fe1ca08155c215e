use std::time::{Duration, Instant};

/// Minimum spacing between two progress samples of one transfer.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// Progress of a single transfer. `speed` is in bytes per second over the last sample window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Starting { total: u64 },
    Chunk { current: u64, total: u64, speed: u64 },
    Complete { total: u64 },
}

/// Samples transfer speed at most once per [`SAMPLE_INTERVAL`].
#[derive(Debug, Clone)]
pub struct TransferMeter {
    started: Instant,
    last_at: Instant,
    last_bytes: u64,
    speed: u64,
}

impl TransferMeter {
    pub fn new(now: Instant) -> Self {
        Self {
            started: now,
            last_at: now,
            last_bytes: 0,
            speed: 0,
        }
    }

    /// Records `current` bytes at `now`. Returns the window speed when a sample is due.
    pub fn sample(&mut self, current: u64, now: Instant) -> Option<u64> {
        let elapsed = now.saturating_duration_since(self.last_at);
        if elapsed < SAMPLE_INTERVAL {
            return None;
        }

        let delta = current.saturating_sub(self.last_bytes);
        self.speed = (delta as f64 / elapsed.as_secs_f64()) as u64;
        self.last_at = now;
        self.last_bytes = current;
        Some(self.speed)
    }

    pub fn speed(&self) -> u64 {
        self.speed
    }

    /// Mean speed since the transfer started.
    pub fn average_speed(&self, current: u64, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        if elapsed <= 0.0 {
            return 0;
        }
        (current as f64 / elapsed) as u64
    }
}

/// Completion percentage, or `None` when the size is unknown.
pub fn percent(current: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| (current.min(total) as f64 / total as f64) * 100.0)
}

/// Remaining time at `speed`, or `None` when it cannot be estimated.
pub fn eta(current: u64, total: u64, speed: u64) -> Option<Duration> {
    if total == 0 || speed == 0 {
        return None;
    }
    let remaining = total.saturating_sub(current);
    Some(Duration::from_secs(remaining.div_ceil(speed)))
}
