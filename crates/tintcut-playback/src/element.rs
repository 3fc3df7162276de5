//! The playing media element, as seen by the controller.
//!
//! The element owns playback. The controller only reads its state and issues
//! seeks, play and pause.

use serde::{Deserialize, Serialize};
use tintcut_core::{Result, TintcutError};

/// A playable media element (a video, usually).
///
/// `duration` and `buffered_end` may fail while metadata or data is still
/// loading.
pub trait MediaElement: Send {
    fn current_time(&self) -> f64;
    fn seek(&mut self, seconds: f64);
    fn duration(&self) -> Result<f64>;
    /// End of the buffered range, in seconds.
    fn buffered_end(&self) -> Result<f64>;
    fn is_paused(&self) -> bool;
    fn is_ended(&self) -> bool;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn is_muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
}

/// Events an element raises on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaEvent {
    Play,
    Pause,
    Ended,
    /// Playback position moved.
    TimeUpdate,
    /// More data was buffered.
    Progress,
}

/// Mirror of the element's state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub current_time: f64,
    pub buffered_end: f64,
    pub is_paused: bool,
    pub is_muted: bool,
}

impl PlaybackState {
    /// Read the element. A failing buffered query reads as nothing buffered.
    pub fn read(media: &dyn MediaElement) -> Self {
        Self {
            current_time: media.current_time(),
            buffered_end: media.buffered_end().unwrap_or(0.0),
            is_paused: media.is_paused(),
            is_muted: media.is_muted(),
        }
    }
}

impl<M: MediaElement + ?Sized> MediaElement for Box<M> {
    fn current_time(&self) -> f64 {
        (**self).current_time()
    }
    fn seek(&mut self, seconds: f64) {
        (**self).seek(seconds)
    }
    fn duration(&self) -> Result<f64> {
        (**self).duration()
    }
    fn buffered_end(&self) -> Result<f64> {
        (**self).buffered_end()
    }
    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }
    fn is_ended(&self) -> bool {
        (**self).is_ended()
    }
    fn play(&mut self) -> Result<()> {
        (**self).play()
    }
    fn pause(&mut self) {
        (**self).pause()
    }
    fn is_muted(&self) -> bool {
        (**self).is_muted()
    }
    fn set_muted(&mut self, muted: bool) {
        (**self).set_muted(muted)
    }
}

/// An element with no decoder behind it: a position, a length and flags.
///
/// Stands in for the player when there is nothing to show, e.g. when
/// exporting from the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessElement {
    position: f64,
    duration: Option<f64>,
    paused: bool,
    muted: bool,
}

impl HeadlessElement {
    /// `None` behaves like metadata that never loaded.
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            position: 0.0,
            duration,
            paused: true,
            muted: false,
        }
    }
}

impl MediaElement for HeadlessElement {
    fn current_time(&self) -> f64 {
        self.position
    }

    fn seek(&mut self, seconds: f64) {
        let end = self.duration.unwrap_or(0.0);
        self.position = if seconds.is_finite() { seconds.clamp(0.0, end) } else { 0.0 };
    }

    fn duration(&self) -> Result<f64> {
        self.duration
            .ok_or_else(|| TintcutError::Playback("duration unknown".into()))
    }

    fn buffered_end(&self) -> Result<f64> {
        // Nothing streams; everything known is available.
        self.duration()
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn is_ended(&self) -> bool {
        matches!(self.duration, Some(d) if self.position >= d)
    }

    fn play(&mut self) -> Result<()> {
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_seek_clamps() {
        let mut element = HeadlessElement::new(Some(10.0));
        element.seek(25.0);
        assert_eq!(element.current_time(), 10.0);
        assert!(element.is_ended());
        element.seek(f64::NAN);
        assert_eq!(element.current_time(), 0.0);
    }

    #[test]
    fn test_boxed_element_reads_through() {
        let mut boxed: Box<dyn MediaElement> = Box::new(HeadlessElement::new(Some(4.0)));
        boxed.set_muted(true);
        let state = PlaybackState::read(&boxed);
        assert!(state.is_muted);
        assert_eq!(state.buffered_end, 4.0);
        assert!(HeadlessElement::new(None).duration().is_err());
    }
}
