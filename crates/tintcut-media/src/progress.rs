//! Export progress from encoder log lines.
//!
//! ffmpeg reports `time=HH:MM:SS.ms` as it encodes. Overall progress is
//! `(trim_start + elapsed) / trim_end * 100`, rounded to two decimals,
//! clamped to `[0, 100]` and never allowed to go backwards.

use tintcut_core::{parse_timestamp, TrimWindow};
use tracing::debug;

const TIME_MARKER: &str = "time=";
const TIME_WIDTH: usize = 11;

/// Pull the encoded timestamp out of a log line, in seconds.
///
/// Returns `None` for lines without a usable, positive timestamp.
pub fn extract_time(line: &str) -> Option<f64> {
    let at = line.find(TIME_MARKER)? + TIME_MARKER.len();
    let raw: String = line[at..].chars().take(TIME_WIDTH).collect();
    if !(raw.contains(':') && raw.contains('.')) {
        return None;
    }
    parse_timestamp(&raw).filter(|s| *s > 0.0)
}

fn round2(v: f64) -> f64 {
    ((v * 100.0) + f64::EPSILON).round() / 100.0
}

/// Monotonic progress for one export.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressTracker {
    start: f64,
    end: f64,
    elapsed: f64,
    percent: f64,
}

impl ProgressTracker {
    pub fn new(trim: TrimWindow) -> Self {
        Self {
            start: trim.start,
            end: trim.end,
            elapsed: 0.0,
            percent: 0.0,
        }
    }

    /// Current percentage in `[0, 100]`.
    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Seconds encoded so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.percent = 0.0;
    }

    /// Feed one log line. Returns the new percentage when it went up.
    pub fn observe_line(&mut self, line: &str) -> Option<f64> {
        match extract_time(line) {
            Some(seconds) => self.observe_elapsed(seconds),
            None => {
                if line.contains(TIME_MARKER) {
                    debug!(line, "Ignoring malformed progress line");
                }
                None
            }
        }
    }

    /// Feed an elapsed-seconds reading directly.
    pub fn observe_elapsed(&mut self, seconds: f64) -> Option<f64> {
        if !(seconds.is_finite() && seconds > 0.0) || self.end <= 0.0 {
            return None;
        }
        self.elapsed = seconds;
        let pct = round2((self.start + seconds) / self.end * 100.0);
        let next = if pct >= 100.0 {
            100.0
        } else if pct > 0.0 {
            pct
        } else {
            return None;
        };
        if next > self.percent {
            self.percent = next;
            Some(next)
        } else {
            None
        }
    }
}
