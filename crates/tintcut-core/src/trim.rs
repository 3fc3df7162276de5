//! Trim windows over a clip's duration.

use crate::error::{Result, TintcutError};
use serde::{Deserialize, Serialize};

/// A `[start, end]` sub-range of a clip, in seconds.
///
/// A validated window always satisfies `0 <= start < end <= duration`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    pub start: f64,
    pub end: f64,
}

impl TrimWindow {
    /// The whole clip.
    pub fn full(duration: f64) -> Self {
        Self {
            start: 0.0,
            end: duration.max(0.0),
        }
    }

    /// Clamp `start` and `end` into `[0, duration]` and validate.
    pub fn clamped(start: f64, end: f64, duration: f64) -> Result<Self> {
        let invalid = || TintcutError::InvalidTrim {
            start,
            end,
            duration,
        };
        if !(start.is_finite() && end.is_finite() && duration.is_finite()) || duration <= 0.0 {
            return Err(invalid());
        }
        let window = Self {
            start: start.clamp(0.0, duration),
            end: end.clamp(0.0, duration),
        };
        if window.start < window.end {
            Ok(window)
        } else {
            Err(invalid())
        }
    }

    /// Length in seconds.
    #[inline]
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// True when `t` lies within `[start, end]`.
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }

    /// True when `t` lies within `(start, end)`.
    #[inline]
    pub fn contains_strictly(&self, t: f64) -> bool {
        t > self.start && t < self.end
    }
}
