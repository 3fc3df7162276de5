//! Selection, adjustments, preview and trimming across crates.

use crate::support::{session, touch};
use parking_lot::Mutex;
use std::sync::Arc;
use tintcut_core::{FrameBuffer, Result, TrimWindow};
use tintcut_effects::{AdjustmentField, AdjustmentParameters};
use tintcut_media::MediaFile;
use tintcut_playback::{DisplaySurface, FrameSource, ManualScheduler, MediaElement, StillPreview};
use tintcut_project::Selection;

// ── Helpers ────────────────────────────────────────────────────

struct GreyVideo {
    playing: bool,
}

impl FrameSource for GreyVideo {
    fn is_paused(&self) -> bool {
        !self.playing
    }
    fn is_ended(&self) -> bool {
        false
    }
    fn native_size(&self) -> (u32, u32) {
        (16, 9)
    }
    fn capture_frame(&mut self, into: &mut FrameBuffer) -> Result<()> {
        *into = FrameBuffer::solid(16, 9, [100, 100, 100, 255]);
        Ok(())
    }
}

#[derive(Default)]
struct Presented {
    frames: Vec<FrameBuffer>,
}

impl Presented {
    fn last_pixel(&self) -> Option<[u8; 4]> {
        self.frames.last().and_then(|f| f.pixel(0, 0))
    }
}

impl DisplaySurface for Presented {
    fn present(&mut self, frame: &FrameBuffer) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

// ── Stills ─────────────────────────────────────────────────────

#[tokio::test]
async fn still_brightness_preview() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let still = session.import(touch(dir.path(), "photo.png")).await.unwrap();
    assert_eq!(still.dimensions(), Some((800, 600)));
    session.select(Selection::Image(still.id)).unwrap();

    session.adjust(|a| {
        a.set(AdjustmentField::Brightness, 150.0);
        a.set(AdjustmentField::RedScale, 100.0);
        a.set(AdjustmentField::GreenScale, 100.0);
        a.set(AdjustmentField::BlueScale, 100.0);
        a.set(AdjustmentField::Opacity, 100.0);
        a.set_greyscale(false);
    });

    let mut preview = StillPreview::new(FrameBuffer::solid(800, 600, [100, 100, 100, 255]));
    assert!(preview.update(&session.params()));
    assert_eq!(preview.frame().pixel(0, 0), Some([150, 150, 150, 255]));
    assert_eq!(preview.frame().pixel(799, 599), Some([150, 150, 150, 255]));

    // Same parameters, no second pass.
    assert!(!preview.update(&session.params()));
    assert_eq!(preview.render_count(), 1);
}

#[tokio::test]
async fn reset_restores_defaults_repeatedly() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let still = session.import(touch(dir.path(), "photo.png")).await.unwrap();
    session.select(Selection::Image(still.id)).unwrap();

    session.adjust(|a| {
        for field in AdjustmentField::ALL {
            a.set(field, 7.0);
        }
        a.set_invert(true);
    });
    for _ in 0..3 {
        session.reset_all();
        for field in AdjustmentField::ALL {
            assert_eq!(session.adjustments().get(field), field.descriptor().default);
        }
        assert_eq!(session.store().get_adjustments(), AdjustmentParameters::default());
    }
}

#[tokio::test]
async fn selection_change_resets_adjustments() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let a = session.import(touch(dir.path(), "a.png")).await.unwrap();
    let b = session.import(touch(dir.path(), "b.mp4")).await.unwrap();

    session.select(Selection::Image(a.id)).unwrap();
    session.adjust(|s| s.set(AdjustmentField::Hue, 90.0));
    session.select(Selection::Video(b.id)).unwrap();

    assert_eq!(session.params(), AdjustmentParameters::default());
    assert_eq!(session.selection(), Selection::Video(b.id));
}

// ── Video ──────────────────────────────────────────────────────

#[tokio::test]
async fn trim_commit_and_rejected_seek() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let clip = session.import(touch(dir.path(), "clip.mp4")).await.unwrap();
    session.select(Selection::Video(clip.id)).unwrap();
    assert_eq!(session.trim(), Some(TrimWindow { start: 0.0, end: 30.0 }));

    let player = session.player_mut().unwrap();
    player.set_pending(5.0, 12.0);
    player.commit().unwrap();
    assert_eq!(player.committed(), TrimWindow { start: 5.0, end: 12.0 });

    let before = player.media().current_time();
    // 3s on a 300px bar of a 30s clip.
    assert!(!player.seek_from_click(30.0, 300.0));
    assert_eq!(player.media().current_time(), before);
}

#[tokio::test]
async fn playback_snaps_back_into_window() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let clip = session.import(touch(dir.path(), "clip.mp4")).await.unwrap();
    session.select(Selection::Video(clip.id)).unwrap();

    let player = session.player_mut().unwrap();
    player.set_pending(10.0, 20.0);
    player.commit().unwrap();

    player.media_mut().seek(25.0);
    assert!(player.on_time_update());
    assert_eq!(player.media().current_time(), 10.0);

    assert!(!player.seek_from_click(50.0, 300.0));
    assert!(!player.seek_from_click(250.0, 300.0));
    assert_eq!(player.media().current_time(), 10.0);
}

#[tokio::test]
async fn committed_window_stays_valid() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let clip = session.import(touch(dir.path(), "clip.mp4")).await.unwrap();
    session.select(Selection::Video(clip.id)).unwrap();

    let attempts = [(-5.0, 40.0), (29.0, 2.0), (12.0, 12.0), (f64::NAN, 3.0), (1.5, 29.5)];
    for (start, end) in attempts {
        let player = session.player_mut().unwrap();
        player.set_pending(start, end);
        let _ = player.commit();
        let w = player.committed();
        assert!(0.0 <= w.start && w.start < w.end && w.end <= 30.0, "{w:?}");
    }

    session.select(Selection::Video(clip.id)).unwrap();
    let w = session.trim().unwrap();
    assert!(0.0 <= w.start && w.start < w.end && w.end <= 30.0);
}

#[tokio::test]
async fn preview_loop_follows_adjustments_and_selection() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let clip = session.import(touch(dir.path(), "clip.mp4")).await.unwrap();
    let still = session.import(touch(dir.path(), "photo.png")).await.unwrap();
    session.select(Selection::Video(clip.id)).unwrap();

    let scheduler = Arc::new(ManualScheduler::new());
    let video = Arc::new(Mutex::new(GreyVideo { playing: true }));
    let surface = Arc::new(Mutex::new(Presented::default()));
    let frames = video.clone();
    session.attach_preview(
        scheduler.clone(),
        surface.clone(),
        Box::new(move |_: &MediaFile| -> Arc<Mutex<dyn FrameSource>> { frames.clone() }),
    );
    assert!(session.preview_loop().is_some_and(|l| l.is_active()));
    scheduler.tick();
    assert_eq!(surface.lock().last_pixel(), Some([100, 100, 100, 255]));

    // The old loop's queued tick is stale; only the new one draws.
    session.adjust(|a| a.set(AdjustmentField::Brightness, 200.0));
    assert_eq!(scheduler.pending(), 2);
    scheduler.tick();
    assert_eq!(surface.lock().frames.len(), 2);
    assert_eq!(surface.lock().last_pixel(), Some([200, 200, 200, 255]));
    assert_eq!(session.preview_loop().map(|l| l.frames_rendered()), Some(1));

    // An unchanged value is not a restart.
    session.adjust(|a| a.set(AdjustmentField::Brightness, 200.0));
    assert_eq!(scheduler.pending(), 1);

    // Stills have no loop.
    session.select(Selection::Image(still.id)).unwrap();
    assert!(session.preview_loop().is_none());
    scheduler.tick();
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(surface.lock().frames.len(), 2);

    // Back on the video the loop restarts with reset parameters.
    session.select(Selection::Video(clip.id)).unwrap();
    scheduler.tick();
    assert_eq!(surface.lock().last_pixel(), Some([100, 100, 100, 255]));

    // Removing the selection drops the loop for good.
    session.remove_media(clip.id).unwrap();
    assert!(session.preview_loop().is_none());
    let before = surface.lock().frames.len();
    scheduler.tick();
    assert_eq!(surface.lock().frames.len(), before);
    assert_eq!(scheduler.pending(), 0);
}

#[tokio::test]
async fn preview_loop_ends_on_pause_and_resumes_on_play() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let clip = session.import(touch(dir.path(), "clip.mp4")).await.unwrap();
    session.select(Selection::Video(clip.id)).unwrap();

    let scheduler = Arc::new(ManualScheduler::new());
    let video = Arc::new(Mutex::new(GreyVideo { playing: false }));
    let surface = Arc::new(Mutex::new(Presented::default()));
    let frames = video.clone();
    session.attach_preview(
        scheduler.clone(),
        surface.clone(),
        Box::new(move |_: &MediaFile| -> Arc<Mutex<dyn FrameSource>> { frames.clone() }),
    );

    // Paused: the first tick ends the loop without drawing.
    scheduler.tick();
    assert_eq!(scheduler.pending(), 0);
    assert!(surface.lock().frames.is_empty());

    video.lock().playing = true;
    session.play().unwrap();
    scheduler.tick();
    assert_eq!(surface.lock().frames.len(), 1);

    // A new surface takes over; the old one sees nothing more.
    let other = Arc::new(Mutex::new(Presented::default()));
    session.set_preview_surface(other.clone());
    scheduler.tick();
    assert_eq!(surface.lock().frames.len(), 1);
    assert_eq!(other.lock().frames.len(), 1);

    session.detach_preview();
    assert!(session.preview_loop().is_none());
    scheduler.tick();
    assert_eq!(other.lock().frames.len(), 1);
}
