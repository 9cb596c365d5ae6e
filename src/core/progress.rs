//! Progress tracking and speed statistics
//!
//! Computes percent, instantaneous and smoothed speed, and ETA from the
//! byte counts reported by the download engine. Speed smoothing uses an
//! exponential moving average so the ETA does not jump around with every
//! chunk.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Snapshot of one task's progress at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    /// Percent completed (0.0 - 100.0), 0.0 when the total is unknown
    pub percent: f64,
    /// Instantaneous speed in bytes per second
    pub speed: f64,
    /// EMA-smoothed speed in bytes per second
    pub smoothed_speed: f64,
    /// Average speed over the whole download
    pub average_speed: f64,
    pub eta_seconds: Option<u64>,
    /// Seconds elapsed since the download started
    pub elapsed: f64,
}

/// Progress tracker for a single download
#[derive(Debug)]
pub struct TaskProgress {
    total_bytes: Option<u64>,
    start: Instant,
    last_measurement: Instant,
    last_bytes: u64,
    smoothed_speed: f64,
    ema_alpha: f64,
}

impl TaskProgress {
    pub fn new(total_bytes: Option<u64>) -> Self {
        let now = Instant::now();
        Self {
            total_bytes,
            start: now,
            last_measurement: now,
            last_bytes: 0,
            smoothed_speed: 0.0,
            ema_alpha: 0.2, // 20% weight for new measurements
        }
    }

    /// Record a new byte count and produce a snapshot
    pub fn update(&mut self, downloaded_bytes: u64) -> ProgressSnapshot {
        let now = Instant::now();
        let interval = now.duration_since(self.last_measurement).as_secs_f64();

        let speed = if interval > 0.0 {
            downloaded_bytes.saturating_sub(self.last_bytes) as f64 / interval
        } else {
            0.0
        };

        if speed > 0.0 {
            if self.smoothed_speed == 0.0 {
                self.smoothed_speed = speed;
            } else {
                self.smoothed_speed =
                    self.ema_alpha * speed + (1.0 - self.ema_alpha) * self.smoothed_speed;
            }
        }

        let elapsed = now.duration_since(self.start).as_secs_f64();
        let average_speed = if elapsed > 0.0 {
            downloaded_bytes as f64 / elapsed
        } else {
            0.0
        };

        let percent = match self.total_bytes {
            Some(total) if total > 0 => {
                (downloaded_bytes as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
            }
            _ => 0.0,
        };

        let eta_seconds = match self.total_bytes {
            Some(total) if self.smoothed_speed > 0.0 && downloaded_bytes < total => {
                Some(((total - downloaded_bytes) as f64 / self.smoothed_speed) as u64)
            }
            _ => None,
        };

        self.last_measurement = now;
        self.last_bytes = downloaded_bytes;

        ProgressSnapshot {
            downloaded_bytes,
            total_bytes: self.total_bytes,
            percent,
            speed,
            smoothed_speed: self.smoothed_speed,
            average_speed,
            eta_seconds,
            elapsed,
        }
    }
}
