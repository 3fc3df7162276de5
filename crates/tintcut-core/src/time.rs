//! Clock-style timestamps.
//!
//! The encoder reports progress as `HH:MM:SS.ms`, and trim handles are
//! labelled the same way.

/// Parse `HH:MM:SS.ms` into seconds.
///
/// Returns `None` unless there are exactly three finite, non-negative fields.
pub fn parse_timestamp(ts: &str) -> Option<f64> {
    let mut parts = ts.trim().split(':');
    let h: f64 = parts.next()?.trim().parse().ok()?;
    let m: f64 = parts.next()?.trim().parse().ok()?;
    let s: f64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let total = h * 3600.0 + m * 60.0 + s;
    (total.is_finite() && h >= 0.0 && m >= 0.0 && s >= 0.0).then_some(total)
}

/// Format seconds as `HH:MM:SS`, or `HH:MM:SS.mmm` when `with_millis`.
///
/// Non-finite input renders as `00:00:00`. Hours wrap at 24, like a wall clock.
pub fn format_clock(seconds: f64, with_millis: bool) -> String {
    if !seconds.is_finite() {
        return "00:00:00".to_string();
    }
    let total_ms = (seconds.max(0.0) * 1000.0).trunc() as u64;
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    let (h, m, s) = ((total_s / 3600) % 24, (total_s / 60) % 60, total_s % 60);
    if with_millis {
        format!("{h:02}:{m:02}:{s:02}.{ms:03}")
    } else {
        format!("{h:02}:{m:02}:{s:02}")
    }
}
