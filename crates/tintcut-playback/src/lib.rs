//! Tintcut Playback - playback supervision and rendering
//!
//! Architecture:
//! - `MediaElement`: the playing element; owns playback, we only supervise
//! - `HeadlessElement`: an element without a decoder, for exports without a player
//! - `TrimController`: pending/committed trim window, seek rules, progress
//! - `FrameRenderLoop`: scheduler-driven per-frame transform for video
//! - `StillPreview`: transform-on-change for images

pub mod controller;
pub mod element;
pub mod render;

pub use controller::{TransportState, TrimController};
pub use element::{HeadlessElement, MediaElement, MediaEvent, PlaybackState};
pub use render::{
    DisplaySurface, FrameCallback, FrameRenderLoop, FrameScheduler, FrameSource, ManualScheduler,
    RenderSubscription, StillPreview,
};
