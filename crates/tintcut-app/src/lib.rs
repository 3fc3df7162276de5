//! Tintcut App - the editor session
//!
//! [`EditorSession`] is what a front end talks to. It ties the project store
//! to the per-selection state: adjustments, the trim controller, the video
//! preview loop and export options are re-seeded every time the selection
//! changes.

pub mod config;

pub use config::EditorConfig;

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tintcut_core::{Result, Rgb8, TintcutError, TrimWindow};
use tintcut_effects::{AdjustmentParameters, AdjustmentState, FilterGraph};
use tintcut_media::{
    build_export_job, build_image_export_job, import_file, AudioSource, EncodeCommand, Encoder,
    ExportArtifact, ExportEvent, ExportOptions, ExportSession, ExportSnapshot, MediaFile,
    MediaKind, MetadataProbe,
};
use tintcut_playback::{
    DisplaySurface, FrameRenderLoop, FrameScheduler, FrameSource, HeadlessElement, MediaElement,
    RenderSubscription, TrimController,
};
use tintcut_project::{ProjectStore, Selection};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Boxed element driving the trim controller.
pub type Player = TrimController<Box<dyn MediaElement>>;

/// Makes the element that plays a selected video.
pub type ElementFactory = Box<dyn Fn(&MediaFile) -> Box<dyn MediaElement> + Send + Sync>;

/// Hands out the decoded frames of a selected video.
pub type FrameSourceFactory = Box<dyn Fn(&MediaFile) -> Arc<Mutex<dyn FrameSource>> + Send + Sync>;

/// The render loop of an attached display surface.
///
/// At most one loop runs per preview. Every restart detaches the previous
/// subscription before the next one starts.
struct VideoPreview {
    render: FrameRenderLoop,
    surface: Arc<Mutex<dyn DisplaySurface>>,
    sources: FrameSourceFactory,
    source: Option<Arc<Mutex<dyn FrameSource>>>,
    subscription: Option<RenderSubscription>,
}

impl VideoPreview {
    fn select(&mut self, media: Option<&MediaFile>) {
        self.source = media.filter(|m| m.is_video()).map(|m| (self.sources)(m));
    }

    fn restart(&mut self, params: &AdjustmentParameters) {
        self.stop();
        if let Some(source) = &self.source {
            self.subscription = Some(self.render.start(
                Arc::clone(source),
                Arc::clone(&self.surface),
                params,
            ));
        }
    }

    fn stop(&mut self) {
        if let Some(old) = self.subscription.take() {
            old.detach();
        }
    }
}

/// Everything the UI layer needs for one open project.
pub struct EditorSession<E: Encoder + 'static> {
    config: EditorConfig,
    store: ProjectStore,
    probe: Arc<dyn MetadataProbe>,
    export: Arc<ExportSession<E>>,
    elements: ElementFactory,
    adjustments: AdjustmentState,
    player: Option<Player>,
    preview: Option<VideoPreview>,
    export_options: Option<ExportOptions>,
}

impl<E: Encoder + 'static> EditorSession<E> {
    pub fn new(
        config: EditorConfig,
        store: ProjectStore,
        probe: Arc<dyn MetadataProbe>,
        export: ExportSession<E>,
    ) -> Self {
        let background = config.background_color().unwrap_or_else(|e| {
            warn!(error = %e, "Bad configured background, using default");
            Rgb8::DEFAULT_BACKGROUND
        });
        let mut session = Self {
            config,
            store,
            probe,
            export: Arc::new(export),
            elements: Box::new(|media: &MediaFile| -> Box<dyn MediaElement> {
                Box::new(HeadlessElement::new(media.duration_seconds))
            }),
            adjustments: AdjustmentState::with_background(background),
            player: None,
            preview: None,
            export_options: None,
        };
        session.on_selection_changed();
        session
    }

    /// Use `factory` for the element behind each selected video.
    pub fn with_element_factory(mut self, factory: ElementFactory) -> Self {
        self.elements = factory;
        self.on_selection_changed();
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Background the adjustments start from and reset to.
    pub fn canvas_background(&self) -> Rgb8 {
        self.adjustments.defaults().background
    }

    // ── Media ───────────────────────────────────────────────────

    /// Import a file into the project. Nothing is added on failure.
    pub async fn import(&self, path: impl Into<PathBuf>) -> Result<MediaFile> {
        let media = import_file(
            path,
            Arc::clone(&self.probe),
            self.store.handles(),
            self.config.metadata_timeout(),
        )
        .await?;
        if let Err(e) = self.store.add_media(media.clone()) {
            self.store.handles().revoke(media.source);
            return Err(e);
        }
        Ok(media)
    }

    /// Remove a file, clearing the selection and export audio that used it.
    pub fn remove_media(&mut self, id: Uuid) -> Result<MediaFile> {
        let was_selected = self.store.get_selection().id() == Some(id);
        let removed = self.store.remove_media(id)?;
        if was_selected {
            self.on_selection_changed();
        } else if let Some(options) = self.export_options.as_mut() {
            options.validate_audio(&self.store.snapshot().audio_ids());
        }
        Ok(removed)
    }

    pub fn selection(&self) -> Selection {
        self.store.get_selection()
    }

    pub fn selected_media(&self) -> Option<MediaFile> {
        self.store.selected_media()
    }

    /// Change the selection and re-seed everything that depends on it.
    pub fn select(&mut self, selection: Selection) -> Result<()> {
        self.store.set_selection(selection)?;
        self.on_selection_changed();
        Ok(())
    }

    fn on_selection_changed(&mut self) {
        self.adjustments.reset();
        self.store.set_adjustments(*self.adjustments.params());

        let media = self.store.selected_media();
        self.player = media.as_ref().filter(|m| m.is_video()).and_then(|m| {
            let duration = m.duration_seconds.unwrap_or(0.0);
            TrimController::new((self.elements)(m), duration)
                .map_err(|e| warn!(media = %m.name, error = %e, "No playable duration"))
                .ok()
        });
        self.export_options = media.as_ref().map(ExportOptions::for_media);
        if let Some(preview) = self.preview.as_mut() {
            preview.select(media.as_ref());
            preview.restart(self.adjustments.params());
        }

        match &media {
            Some(m) => info!(media = %m.name, kind = ?m.kind, "Selected"),
            None => debug!("Selection cleared"),
        }
    }

    // ── Adjustments ─────────────────────────────────────────────

    pub fn adjustments(&self) -> &AdjustmentState {
        &self.adjustments
    }

    pub fn params(&self) -> AdjustmentParameters {
        *self.adjustments.params()
    }

    /// Edit the adjustments and publish the result to the store. A change
    /// restarts the video preview with the new parameters.
    pub fn adjust<R>(&mut self, edit: impl FnOnce(&mut AdjustmentState) -> R) -> R {
        let before = *self.adjustments.params();
        let out = edit(&mut self.adjustments);
        let after = *self.adjustments.params();
        if after != before {
            self.store.set_adjustments(after);
            if let Some(preview) = self.preview.as_mut() {
                preview.restart(&after);
            }
        }
        out
    }

    /// Reset every adjustment and re-seed the trim window to the whole clip.
    pub fn reset_all(&mut self) {
        self.adjust(AdjustmentState::reset);
        if let Some(player) = self.player.as_mut() {
            let duration = player.duration();
            if let Err(e) = player.reset_for(duration) {
                warn!(error = %e, "Trim window kept");
            }
        }
        info!("Adjustments and trim reset");
    }

    /// Filter value for a filter-styled display surface.
    pub fn preview_filter(&self) -> String {
        FilterGraph::from_params(self.adjustments.params()).to_css()
    }

    // ── Playback ────────────────────────────────────────────────

    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    pub fn player_mut(&mut self) -> Option<&mut Player> {
        self.player.as_mut()
    }

    /// Committed trim window of the selected video.
    pub fn trim(&self) -> Option<TrimWindow> {
        self.player.as_ref().map(|p| p.committed())
    }

    /// Start playing the selected video and its preview loop.
    pub fn play(&mut self) -> Result<()> {
        let player = self
            .player
            .as_mut()
            .ok_or_else(|| TintcutError::Playback("no video is selected".into()))?;
        player.play()?;
        if let Some(preview) = self.preview.as_mut() {
            preview.restart(self.adjustments.params());
        }
        Ok(())
    }

    /// Pause the selected video. The preview loop ends on its next tick.
    pub fn pause(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
    }

    // ── Preview ─────────────────────────────────────────────────

    /// Draw the selected video onto `surface`, one frame per `scheduler`
    /// tick. Replaces any surface attached before.
    pub fn attach_preview(
        &mut self,
        scheduler: Arc<dyn FrameScheduler>,
        surface: Arc<Mutex<dyn DisplaySurface>>,
        sources: FrameSourceFactory,
    ) {
        self.detach_preview();
        let mut preview = VideoPreview {
            render: FrameRenderLoop::new(scheduler),
            surface,
            sources,
            source: None,
            subscription: None,
        };
        preview.select(self.store.selected_media().as_ref());
        preview.restart(self.adjustments.params());
        debug!(active = preview.subscription.is_some(), "Preview attached");
        self.preview = Some(preview);
    }

    /// Point the preview at another surface.
    pub fn set_preview_surface(&mut self, surface: Arc<Mutex<dyn DisplaySurface>>) {
        if let Some(preview) = self.preview.as_mut() {
            preview.surface = surface;
            preview.restart(self.adjustments.params());
        }
    }

    pub fn detach_preview(&mut self) {
        if let Some(mut preview) = self.preview.take() {
            preview.stop();
            debug!("Preview detached");
        }
    }

    /// The current preview loop, if a video is selected on an attached surface.
    pub fn preview_loop(&self) -> Option<&RenderSubscription> {
        self.preview.as_ref().and_then(|p| p.subscription.as_ref())
    }

    // ── Export ──────────────────────────────────────────────────

    pub fn export_options(&self) -> Option<&ExportOptions> {
        self.export_options.as_ref()
    }

    pub fn export_options_mut(&mut self) -> Option<&mut ExportOptions> {
        self.export_options.as_mut()
    }

    pub fn export_snapshot(&self) -> ExportSnapshot {
        self.export.snapshot()
    }

    pub fn subscribe_export(&self) -> crossbeam_channel::Receiver<ExportEvent> {
        self.export.subscribe()
    }

    /// Why exporting is unavailable here, if it is.
    pub fn export_disabled_reason(&self) -> Option<String> {
        self.export.disabled_reason()
    }

    /// The encoder job for the current selection and settings.
    pub fn export_command(&self) -> Result<EncodeCommand> {
        let project = self.store.snapshot();
        let media = project
            .selected_media()
            .ok_or_else(|| TintcutError::InvalidParameter("nothing is selected".into()))?;
        let mut options = self
            .export_options
            .clone()
            .unwrap_or_else(|| ExportOptions::for_media(media));
        options.validate_audio(&project.audio_ids());

        match media.kind {
            MediaKind::Video => {
                let trim = match self.trim() {
                    Some(trim) => trim,
                    None => {
                        let duration = media.duration_seconds.unwrap_or(0.0);
                        TrimWindow::clamped(0.0, duration, duration)?
                    }
                };
                let replacement = match options.audio {
                    AudioSource::Default => None,
                    AudioSource::Replacement(id) => project.find(id),
                };
                build_export_job(media, self.adjustments.params(), trim, &options, replacement)
            }
            MediaKind::Image => build_image_export_job(media, self.adjustments.params(), &options),
            MediaKind::Audio => Err(TintcutError::InvalidParameter(format!(
                "{} is audio and cannot be exported",
                media.name
            ))),
        }
    }

    /// Run the export on a blocking thread and wait for the artifact.
    pub async fn export(&self) -> Result<ExportArtifact> {
        let command = self.export_command()?;
        let export = Arc::clone(&self.export);
        let handles = self.store.handles().clone();
        tokio::task::spawn_blocking(move || export.start_export(&command, &handles))
            .await
            .map_err(|e| {
                warn!(error = %e, "Export task failed");
                TintcutError::Internal(format!("export task failed: {e}"))
            })?
    }
}
