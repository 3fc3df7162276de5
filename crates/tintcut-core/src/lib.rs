//! Tintcut Core - Foundation types for the media editor
//!
//! This crate provides the fundamental types used throughout Tintcut:
//! - Error type shared by every crate
//! - RGBA frame buffers
//! - Background colours and hex parsing
//! - Encoder timestamp parsing and label formatting
//! - Trim windows

pub mod color;
pub mod error;
pub mod frame;
pub mod time;
pub mod trim;

pub use color::Rgb8;
pub use error::{Result, TintcutError};
pub use frame::FrameBuffer;
pub use time::{format_clock, parse_timestamp};
pub use trim::TrimWindow;

/// Human-readable byte count, e.g. `1.50 MB`.
///
/// Zero bytes reports `Unknown`, matching the media tables.
pub fn human_file_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
    if size == 0 {
        return "Unknown".to_string();
    }
    let exp = ((size as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    format!("{:.2} {}", size as f64 / 1024f64.powi(exp as i32), UNITS[exp])
}
