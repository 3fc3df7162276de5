//! Tintcut Media - FFmpeg integration for import and export
//!
//! This crate handles:
//! - Imported media files and their source handles
//! - Metadata probing with a bounded wait
//! - The encoder interface and its ffmpeg sidecar backend
//! - Export command construction, progress and sessions

pub mod encoder;
pub mod export;
pub mod handle;
pub mod import;
pub mod media;
pub mod probe;
pub mod progress;
pub mod session;

pub use encoder::{Encoder, RuntimeSupport, SidecarEncoder};
pub use export::{
    build_export_job, build_image_export_job, AudioSource, Axis, EncodeCommand, ExportOptions,
    FileType,
};
pub use handle::{HandleRegistry, SourceHandle};
pub use import::{import_file, DEFAULT_METADATA_TIMEOUT};
pub use media::{MediaFile, MediaKind};
pub use probe::{FfprobeProbe, MediaMetadata, MetadataProbe};
pub use progress::ProgressTracker;
pub use session::{ExportArtifact, ExportEvent, ExportSession, ExportSnapshot, ExportStatus};
