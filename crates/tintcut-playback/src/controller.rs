//! Playback and trim supervision.
//!
//! The controller keeps a committed trim window and forces the element back
//! to its start whenever playback wanders outside it. Dragging the trim
//! handles only moves the pending window; releasing commits it.

use crate::element::{MediaElement, MediaEvent, PlaybackState};
use serde::{Deserialize, Serialize};
use tintcut_core::{format_clock, Result, TrimWindow};
use tracing::{debug, info, warn};

/// Transport state as the user sees it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Supervises one media element against a trim window.
pub struct TrimController<M: MediaElement> {
    media: M,
    duration: f64,
    committed: TrimWindow,
    pending: TrimWindow,
    transport: TransportState,
    progress_percent: f64,
    buffer_percent: f64,
}

impl<M: MediaElement> TrimController<M> {
    /// Supervise `media`, trimming to the whole clip.
    ///
    /// Fails with `InvalidTrim` when `duration` is not a positive length.
    pub fn new(media: M, duration: f64) -> Result<Self> {
        let window = TrimWindow::clamped(0.0, duration, duration)?;
        debug!(duration, "Trim controller created");
        Ok(Self {
            media,
            duration,
            committed: window,
            pending: window,
            transport: TransportState::Stopped,
            progress_percent: 0.0,
            buffer_percent: 0.0,
        })
    }

    /// Re-seed for a (new) clip length: the window becomes `[0, duration]`.
    ///
    /// An unusable length is rejected and nothing changes.
    pub fn reset_for(&mut self, duration: f64) -> Result<()> {
        let window = TrimWindow::clamped(0.0, duration, duration)?;
        self.duration = duration;
        self.committed = window;
        self.pending = window;
        self.transport = TransportState::Stopped;
        self.progress_percent = 0.0;
        self.buffer_percent = 0.0;
        debug!(duration, "Trim window reset");
        Ok(())
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn committed(&self) -> TrimWindow {
        self.committed
    }

    pub fn pending(&self) -> TrimWindow {
        self.pending
    }

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    pub fn buffer_percent(&self) -> f64 {
        self.buffer_percent
    }

    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState::read(&self.media)
    }

    // ── Trim ────────────────────────────────────────────────────

    /// Live drag. Unconstrained; only the labels follow it.
    pub fn set_pending(&mut self, start: f64, end: f64) {
        self.pending = TrimWindow { start, end };
    }

    /// Release: clamp the pending window into the clip and commit it, then
    /// re-apply the out-of-window rule straight away.
    ///
    /// A window that is empty after clamping is rejected; the previous one
    /// stays in force and the pending window snaps back to it.
    pub fn commit(&mut self) -> Result<TrimWindow> {
        match TrimWindow::clamped(self.pending.start, self.pending.end, self.duration) {
            Ok(window) => {
                self.committed = window;
                self.pending = window;
                info!(start = window.start, end = window.end, "Trim committed");
                self.enforce_window();
                Ok(window)
            }
            Err(e) => {
                warn!(error = %e, "Rejected trim window");
                self.pending = self.committed;
                Err(e)
            }
        }
    }

    /// `Start: HH:MM:SS.mmm` and `End: HH:MM:SS.mmm` for the pending window.
    pub fn labels(&self) -> (String, String) {
        (
            format!("Start: {}", format_clock(self.pending.start, true)),
            format!("End: {}", format_clock(self.pending.end, true)),
        )
    }

    fn enforce_window(&mut self) -> bool {
        let t = self.media.current_time();
        if self.committed.contains(t) {
            return false;
        }
        debug!(position = t, start = self.committed.start, "Outside trim, seeking to start");
        self.media.seek(self.committed.start);
        true
    }

    // ── Element events ──────────────────────────────────────────

    /// Position moved. Returns whether the controller had to seek.
    ///
    /// When the element cannot report a usable duration the tick is skipped
    /// entirely: no progress update and no seek.
    pub fn on_time_update(&mut self) -> bool {
        match self.media.duration() {
            Ok(d) if d.is_finite() && d > 0.0 => {
                self.progress_percent = self.media.current_time() / d * 100.0;
            }
            Ok(d) => {
                debug!(duration = d, "No usable duration this tick");
                return false;
            }
            Err(e) => {
                debug!(error = %e, "Duration unavailable this tick");
                return false;
            }
        }
        self.enforce_window()
    }

    /// More data buffered. A failed buffered query counts as nothing buffered.
    pub fn on_buffer_progress(&mut self) {
        let duration = match self.media.duration() {
            Ok(d) if d.is_finite() && d > 0.0 => d,
            Ok(_) => return,
            Err(e) => {
                debug!(error = %e, "Duration unavailable this tick");
                return;
            }
        };
        self.buffer_percent = match self.media.buffered_end() {
            Ok(end) => (end / duration * 100.0).clamp(0.0, 100.0),
            Err(e) => {
                debug!(error = %e, "Nothing buffered yet");
                0.0
            }
        };
    }

    /// Dispatch an element event.
    pub fn handle_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Play => self.transport = TransportState::Playing,
            MediaEvent::Pause => self.transport = TransportState::Paused,
            MediaEvent::Ended => self.transport = TransportState::Stopped,
            MediaEvent::TimeUpdate => {
                self.on_time_update();
            }
            MediaEvent::Progress => self.on_buffer_progress(),
        }
    }

    // ── User actions ────────────────────────────────────────────

    /// Click on the progress bar at `x` of `surface_width` pixels.
    ///
    /// Only seeks strictly inside the committed window take effect.
    pub fn seek_from_click(&mut self, x: f64, surface_width: f64) -> bool {
        if !(surface_width > 0.0 && x.is_finite()) {
            return false;
        }
        let seek_time = x / surface_width * self.duration;
        if self.committed.contains_strictly(seek_time) {
            self.media.seek(seek_time);
            true
        } else {
            debug!(seek_time, "Ignoring seek outside trim window");
            false
        }
    }

    pub fn play(&mut self) -> Result<()> {
        self.media.play()?;
        self.transport = TransportState::Playing;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.media.pause();
        self.transport = TransportState::Paused;
    }

    pub fn toggle_play(&mut self) -> Result<()> {
        if self.media.is_paused() || self.media.is_ended() {
            self.play()
        } else {
            self.pause();
            Ok(())
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.media.set_muted(muted);
    }

    pub fn toggle_mute(&mut self) {
        let muted = self.media.is_muted();
        self.media.set_muted(!muted);
    }
}
