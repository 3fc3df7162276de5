//! The project store: one source of truth, many readers.
//!
//! Readers take an `Arc<Project>` snapshot and keep it as long as they like.
//! Every setter builds the next snapshot from a copy and swaps it in, so a
//! snapshot never changes under its reader.

use crate::project::{Project, Selection};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tintcut_core::{Result, TintcutError};
use tintcut_effects::AdjustmentParameters;
use tintcut_media::{HandleRegistry, MediaFile, MediaKind};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Owned copies of the three media lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaLists {
    pub audio: Vec<MediaFile>,
    pub images: Vec<MediaFile>,
    pub videos: Vec<MediaFile>,
}

/// Shared project state. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    current: RwLock<Arc<Project>>,
    handles: HandleRegistry,
    revision: AtomicU64,
}

impl ProjectStore {
    pub fn new(project: Project, handles: HandleRegistry) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                current: RwLock::new(Arc::new(project)),
                handles,
                revision: AtomicU64::new(0),
            }),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Project> {
        Arc::clone(&self.inner.current.read())
    }

    /// Bumped by every setter.
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::Acquire)
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.inner.handles
    }

    fn update<R>(&self, f: impl FnOnce(&mut Project) -> Result<R>) -> Result<R> {
        let mut current = self.inner.current.write();
        let mut next = Project::clone(&current);
        let out = f(&mut next)?;
        *current = Arc::new(next);
        self.inner.revision.fetch_add(1, Ordering::AcqRel);
        Ok(out)
    }

    // ── Selection ───────────────────────────────────────────────

    pub fn get_selection(&self) -> Selection {
        self.snapshot().selection
    }

    /// Select an image, a video or nothing. Selecting one clears the other.
    ///
    /// The id must name media of the matching kind in the store.
    pub fn set_selection(&self, selection: Selection) -> Result<()> {
        self.update(|project| {
            let known = match selection {
                Selection::None => true,
                Selection::Image(id) => project.images.iter().any(|m| m.id == id),
                Selection::Video(id) => project.videos.iter().any(|m| m.id == id),
            };
            if !known {
                return Err(TintcutError::NotFound(format!("selection {:?}", selection)));
            }
            project.selection = selection;
            debug!(?selection, "Selection changed");
            Ok(())
        })
    }

    pub fn selected_media(&self) -> Option<MediaFile> {
        self.snapshot().selected_media().cloned()
    }

    // ── Adjustments ─────────────────────────────────────────────

    pub fn get_adjustments(&self) -> AdjustmentParameters {
        self.snapshot().adjustments
    }

    pub fn set_adjustments(&self, adjustments: AdjustmentParameters) {
        // Infallible closure.
        let _ = self.update(|project| {
            project.adjustments = adjustments;
            Ok(())
        });
    }

    // ── Media ───────────────────────────────────────────────────

    pub fn get_media_lists(&self) -> MediaLists {
        let project = self.snapshot();
        MediaLists {
            audio: project.audio.clone(),
            images: project.images.clone(),
            videos: project.videos.clone(),
        }
    }

    pub fn find_media(&self, id: Uuid) -> Option<MediaFile> {
        self.snapshot().find(id).cloned()
    }

    /// Append an imported file to the list for its kind.
    pub fn add_media(&self, media: MediaFile) -> Result<()> {
        self.update(|project| {
            if project.find(media.id).is_some() {
                return Err(TintcutError::InvalidParameter(format!(
                    "media {} is already in the project",
                    media.id
                )));
            }
            info!(media = %media.name, kind = ?media.kind, "Media added");
            project.list_mut(media.kind).push(media);
            Ok(())
        })
    }

    /// Remove a file. Clears the selection if it pointed at it, and revokes
    /// the file's source handle.
    pub fn remove_media(&self, id: Uuid) -> Result<MediaFile> {
        let removed = self.update(|project| {
            let kind = project
                .find(id)
                .map(|m| m.kind)
                .ok_or_else(|| TintcutError::NotFound(format!("media {}", id)))?;
            let list = project.list_mut(kind);
            let index = list
                .iter()
                .position(|m| m.id == id)
                .ok_or_else(|| TintcutError::NotFound(format!("media {}", id)))?;
            let removed = list.remove(index);
            if project.selection.id() == Some(id) {
                debug!(media = %removed.name, "Removed media was selected, clearing selection");
                project.selection = Selection::None;
            }
            Ok(removed)
        })?;

        if !self.inner.handles.revoke(removed.source) {
            warn!(media = %removed.name, handle = %removed.source, "Handle was already released");
        }
        info!(media = %removed.name, "Media removed");
        Ok(removed)
    }

    // ── Project ─────────────────────────────────────────────────

    pub fn name(&self) -> String {
        self.snapshot().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        let _ = self.update(|project| {
            project.name = name;
            Ok(())
        });
    }

    pub fn show_media_tables(&self) -> bool {
        self.snapshot().show_media_tables
    }

    pub fn set_show_media_tables(&self, show: bool) {
        let _ = self.update(|project| {
            project.show_media_tables = show;
            Ok(())
        });
    }

    /// Swap in another project, releasing every handle the old one held.
    pub fn replace_project(&self, project: Project) {
        let old = {
            let mut current = self.inner.current.write();
            let old = std::mem::replace(&mut *current, Arc::new(project));
            self.inner.revision.fetch_add(1, Ordering::AcqRel);
            old
        };
        for media in old.all_media() {
            self.inner.handles.revoke(media.source);
        }
        info!(project = %self.name(), "Project replaced");
    }

    /// Count of media of one kind.
    pub fn count(&self, kind: MediaKind) -> usize {
        self.snapshot().list(kind).len()
    }
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new(Project::default(), HandleRegistry::new())
    }
}
