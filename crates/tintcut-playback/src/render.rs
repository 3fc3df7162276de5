//! Per-frame rendering for video, and transform-on-change for stills.
//!
//! The loop never sleeps or spins. Each tick asks a [`FrameScheduler`] for the
//! next one, so a display's paint cycle drives it in the app and a
//! [`ManualScheduler`] drives it in tests.
//!
//! Every [`FrameRenderLoop::start`] bumps a generation counter. Ticks from an
//! older generation exit without touching the surface, so a restart fully
//! detaches the previous loop before the new one draws.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tintcut_core::{FrameBuffer, Result};
use tintcut_effects::{pixel, strategy_for, AdjustmentParameters, PixelAdjustments, SurfaceKind};
use tracing::{debug, trace, warn};

/// One deferred tick.
pub type FrameCallback = Box<dyn FnOnce() + Send>;

/// Source of display refresh ticks.
pub trait FrameScheduler: Send + Sync {
    /// Run `callback` on the next refresh.
    fn request_next_frame(&self, callback: FrameCallback);
}

/// A scheduler that only ticks when told to.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<VecDeque<FrameCallback>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks waiting for a tick.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run one queued callback. Returns `false` if none was queued.
    pub fn run_next(&self) -> bool {
        // Pop first; the callback usually schedules its successor.
        let next = self.queue.lock().pop_front();
        match next {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Run one refresh: every callback queued right now, but not the ones
    /// they queue. Returns how many ran.
    pub fn tick(&self) -> usize {
        let batch: Vec<_> = self.queue.lock().drain(..).collect();
        let n = batch.len();
        for callback in batch {
            callback();
        }
        n
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_next_frame(&self, callback: FrameCallback) {
        self.queue.lock().push_back(callback);
    }
}

/// Decoded video frames.
pub trait FrameSource: Send {
    fn is_paused(&self) -> bool;
    fn is_ended(&self) -> bool;
    /// Native decoded size.
    fn native_size(&self) -> (u32, u32);
    /// Copy the current frame into `into`, already sized to `native_size`.
    fn capture_frame(&mut self, into: &mut FrameBuffer) -> Result<()>;
}

/// Where rendered frames end up.
pub trait DisplaySurface: Send {
    fn present(&mut self, frame: &FrameBuffer) -> Result<()>;
}

/// Keeps a render loop alive. Dropping or detaching it stops the loop.
#[derive(Debug)]
pub struct RenderSubscription {
    generation: Arc<AtomicU64>,
    own: u64,
    frames: Arc<AtomicU64>,
}

impl RenderSubscription {
    /// Stop this loop if it is still the current one.
    pub fn detach(&self) {
        if self
            .generation
            .compare_exchange(self.own, self.own + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!(generation = self.own, "Render loop detached");
        }
    }

    pub fn is_active(&self) -> bool {
        self.generation.load(Ordering::Acquire) == self.own
    }

    /// Frames this loop has presented.
    pub fn frames_rendered(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl Drop for RenderSubscription {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Restartable video render loop.
pub struct FrameRenderLoop {
    scheduler: Arc<dyn FrameScheduler>,
    generation: Arc<AtomicU64>,
}

struct LoopState {
    own: u64,
    generation: Arc<AtomicU64>,
    frames: Arc<AtomicU64>,
    scheduler: Arc<dyn FrameScheduler>,
    source: Arc<Mutex<dyn FrameSource>>,
    surface: Arc<Mutex<dyn DisplaySurface>>,
    kernel: PixelAdjustments,
    /// Off-screen buffer, owned by this loop alone.
    buffer: FrameBuffer,
}

impl FrameRenderLoop {
    pub fn new(scheduler: Arc<dyn FrameScheduler>) -> Self {
        Self {
            scheduler,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start (or restart) the loop with new inputs. Any previous loop is
    /// detached first.
    pub fn start(
        &self,
        source: Arc<Mutex<dyn FrameSource>>,
        surface: Arc<Mutex<dyn DisplaySurface>>,
        params: &AdjustmentParameters,
    ) -> RenderSubscription {
        let own = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let frames = Arc::new(AtomicU64::new(0));
        debug!(generation = own, "Render loop started");

        let state = LoopState {
            own,
            generation: Arc::clone(&self.generation),
            frames: Arc::clone(&frames),
            scheduler: Arc::clone(&self.scheduler),
            source,
            surface,
            kernel: PixelAdjustments::new(params),
            buffer: FrameBuffer::new(0, 0),
        };
        schedule(state);

        RenderSubscription {
            generation: Arc::clone(&self.generation),
            own,
            frames,
        }
    }

    /// Detach whatever loop is running.
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

fn schedule(state: LoopState) {
    let scheduler = Arc::clone(&state.scheduler);
    scheduler.request_next_frame(Box::new(move || tick(state)));
}

fn tick(mut state: LoopState) {
    if state.generation.load(Ordering::Acquire) != state.own {
        trace!(generation = state.own, "Stale render tick");
        return;
    }

    {
        let mut source = state.source.lock();
        if source.is_paused() || source.is_ended() {
            debug!(generation = state.own, "Media stopped, render loop ends");
            return;
        }
        let (w, h) = source.native_size();
        state.buffer.ensure_size(w, h);
        if let Err(e) = source.capture_frame(&mut state.buffer) {
            warn!(error = %e, "Frame capture failed, skipping tick");
            drop(source);
            schedule(state);
            return;
        }
    }

    pixel::transform(&mut state.buffer, &state.kernel);

    match state.surface.lock().present(&state.buffer) {
        Ok(()) => {
            state.frames.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => warn!(error = %e, "Present failed"),
    }

    schedule(state);
}

/// Still-image preview: transformed once per parameter change.
#[derive(Debug, Clone)]
pub struct StillPreview {
    source: FrameBuffer,
    rendered: FrameBuffer,
    params: Option<AdjustmentParameters>,
    renders: u64,
}

impl StillPreview {
    pub fn new(source: FrameBuffer) -> Self {
        Self {
            rendered: source.clone(),
            source,
            params: None,
            renders: 0,
        }
    }

    /// Re-render if `params` differ from the last render. Returns whether it
    /// rendered.
    pub fn update(&mut self, params: &AdjustmentParameters) -> bool {
        if self.params.as_ref() == Some(params) {
            return false;
        }
        self.rendered = strategy_for(SurfaceKind::PixelCanvas)
            .apply(&self.source, params)
            .into_frame();
        self.params = Some(*params);
        self.renders += 1;
        true
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.rendered
    }

    pub fn source(&self) -> &FrameBuffer {
        &self.source
    }

    pub fn render_count(&self) -> u64 {
        self.renders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeVideo, RecordingSurface};

    fn brightened() -> AdjustmentParameters {
        AdjustmentParameters {
            brightness: 150.0,
            ..Default::default()
        }
    }

    fn setup() -> (
        Arc<ManualScheduler>,
        FrameRenderLoop,
        Arc<Mutex<FakeVideo>>,
        Arc<Mutex<RecordingSurface>>,
    ) {
        let scheduler = Arc::new(ManualScheduler::new());
        let render = FrameRenderLoop::new(scheduler.clone());
        let mut video = FakeVideo::new(30.0);
        video.paused = false;
        (
            scheduler,
            render,
            Arc::new(Mutex::new(video)),
            Arc::new(Mutex::new(RecordingSurface::default())),
        )
    }

    #[test]
    fn test_loop_presents_transformed_frames() {
        let (scheduler, render, video, surface) = setup();
        let sub = render.start(video.clone(), surface.clone(), &brightened());

        assert_eq!(scheduler.tick(), 1);
        assert_eq!(scheduler.tick(), 1);
        assert_eq!(sub.frames_rendered(), 2);

        let surface = surface.lock();
        assert_eq!(surface.presented.len(), 2);
        assert_eq!(surface.presented[0].pixel(0, 0), Some([150, 150, 150, 255]));
        assert_eq!((surface.presented[0].width, surface.presented[0].height), (4, 2));
    }

    #[test]
    fn test_loop_ends_when_paused() {
        let (scheduler, render, video, surface) = setup();
        let _sub = render.start(video.clone(), surface.clone(), &brightened());
        scheduler.tick();
        video.lock().paused = true;
        scheduler.tick();
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(surface.lock().presented.len(), 1);
    }

    #[test]
    fn test_restart_detaches_previous_loop() {
        let (scheduler, render, video, surface) = setup();
        let first = render.start(video.clone(), surface.clone(), &AdjustmentParameters::default());
        let second = render.start(video.clone(), surface.clone(), &brightened());
        assert!(!first.is_active());
        assert!(second.is_active());

        // Both ticks are queued, only the current loop draws.
        assert_eq!(scheduler.tick(), 2);
        assert_eq!(first.frames_rendered(), 0);
        assert_eq!(second.frames_rendered(), 1);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(surface.lock().presented.len(), 1);
    }

    #[test]
    fn test_dropping_subscription_stops_loop() {
        let (scheduler, render, video, surface) = setup();
        let sub = render.start(video, surface.clone(), &brightened());
        drop(sub);
        scheduler.tick();
        assert_eq!(scheduler.pending(), 0);
        assert!(surface.lock().presented.is_empty());
    }

    #[test]
    fn test_stale_drop_does_not_stop_new_loop() {
        let (scheduler, render, video, surface) = setup();
        let first = render.start(video.clone(), surface.clone(), &brightened());
        let second = render.start(video, surface, &brightened());
        drop(first);
        assert!(second.is_active());
        scheduler.tick();
        assert_eq!(second.frames_rendered(), 1);
    }

    #[test]
    fn test_capture_failure_skips_frame() {
        let (scheduler, render, video, surface) = setup();
        video.lock().fail_capture = true;
        let sub = render.start(video.clone(), surface.clone(), &brightened());
        scheduler.tick();
        assert_eq!(sub.frames_rendered(), 0);
        assert_eq!(scheduler.pending(), 1);
        video.lock().fail_capture = false;
        scheduler.tick();
        assert_eq!(sub.frames_rendered(), 1);
    }

    #[test]
    fn test_still_preview_renders_on_change_only() {
        let mut preview = StillPreview::new(FrameBuffer::solid(800, 600, [100, 100, 100, 255]));
        assert!(preview.update(&brightened()));
        assert!(!preview.update(&brightened()));
        assert_eq!(preview.render_count(), 1);
        assert_eq!(preview.frame().pixel(0, 0), Some([150, 150, 150, 255]));
        assert_eq!(preview.source().pixel(0, 0), Some([100, 100, 100, 255]));

        assert!(preview.update(&AdjustmentParameters::default()));
        assert_eq!(preview.frame().pixel(0, 0), Some([100, 100, 100, 255]));
    }
}
