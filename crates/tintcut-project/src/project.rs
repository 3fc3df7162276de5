//! Project and selection types.

use serde::{Deserialize, Serialize};
use tintcut_effects::AdjustmentParameters;
use tintcut_media::{MediaFile, MediaKind};
use uuid::Uuid;

/// What the editor is working on. At most one image or one video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Selection {
    #[default]
    None,
    Image(Uuid),
    Video(Uuid),
}

impl Selection {
    pub fn id(self) -> Option<Uuid> {
        match self {
            Self::None => None,
            Self::Image(id) | Self::Video(id) => Some(id),
        }
    }

    pub fn is_none(self) -> bool {
        matches!(self, Self::None)
    }

    pub fn is_video(self) -> bool {
        matches!(self, Self::Video(_))
    }
}

/// A project: imported media, the active selection and the working adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,
    /// Project name, unique within a library
    pub name: String,
    pub audio: Vec<MediaFile>,
    pub images: Vec<MediaFile>,
    pub videos: Vec<MediaFile>,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub show_media_tables: bool,
    /// Working values only; never written to disk.
    #[serde(skip)]
    pub adjustments: AdjustmentParameters,
}

impl Project {
    /// Create a new empty project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            audio: Vec::new(),
            images: Vec::new(),
            videos: Vec::new(),
            selection: Selection::None,
            show_media_tables: false,
            adjustments: AdjustmentParameters::default(),
        }
    }

    pub fn list(&self, kind: MediaKind) -> &[MediaFile] {
        match kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Image => &self.images,
            MediaKind::Video => &self.videos,
        }
    }

    pub(crate) fn list_mut(&mut self, kind: MediaKind) -> &mut Vec<MediaFile> {
        match kind {
            MediaKind::Audio => &mut self.audio,
            MediaKind::Image => &mut self.images,
            MediaKind::Video => &mut self.videos,
        }
    }

    /// Every media file, audio first.
    pub fn all_media(&self) -> impl Iterator<Item = &MediaFile> {
        self.audio.iter().chain(&self.images).chain(&self.videos)
    }

    pub fn find(&self, id: Uuid) -> Option<&MediaFile> {
        self.all_media().find(|m| m.id == id)
    }

    /// The selected image or video, if it still exists.
    pub fn selected_media(&self) -> Option<&MediaFile> {
        match self.selection {
            Selection::None => None,
            Selection::Image(id) => self.images.iter().find(|m| m.id == id),
            Selection::Video(id) => self.videos.iter().find(|m| m.id == id),
        }
    }

    pub fn audio_ids(&self) -> Vec<Uuid> {
        self.audio.iter().map(|m| m.id).collect()
    }

    pub fn media_count(&self) -> usize {
        self.audio.len() + self.images.len() + self.videos.len()
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new("Untitled Project")
    }
}
