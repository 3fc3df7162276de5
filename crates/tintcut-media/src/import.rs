//! File import with a bounded metadata wait.

use crate::handle::HandleRegistry;
use crate::media::{mime_for_path, MediaFile, MediaKind};
use crate::probe::MetadataProbe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tintcut_core::{Result, TintcutError};
use tracing::{info, warn};
use uuid::Uuid;

/// How long import waits for metadata before giving up.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_millis(3000);

/// Import one file.
///
/// Resolves the MIME type, waits at most `timeout` for metadata, and only then
/// registers a source handle. On failure nothing is registered, so there is
/// no partial [`MediaFile`] to clean up. A probe that outlives the timeout is
/// left to finish on its blocking thread and its result is dropped.
pub async fn import_file(
    path: impl Into<PathBuf>,
    probe: Arc<dyn MetadataProbe>,
    handles: &HandleRegistry,
    timeout: Duration,
) -> Result<MediaFile> {
    let path = path.into();
    let name = file_name(&path)?;
    let mime_type = mime_for_path(&path)
        .ok_or_else(|| TintcutError::Import(format!("unsupported file type: {name}")))?;
    let kind = MediaKind::from_mime(mime_type)
        .ok_or_else(|| TintcutError::Import(format!("unsupported file type: {name}")))?;

    let probe_path = path.clone();
    let task = tokio::task::spawn_blocking(move || {
        let size = std::fs::metadata(&probe_path)?.len();
        let metadata = probe.probe(&probe_path, kind)?;
        metadata.validate_for(kind)?;
        Ok::<_, TintcutError>((size, metadata))
    });

    let (size, metadata) = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join)) => return Err(TintcutError::Internal(format!("probe task failed: {join}"))),
        Err(_) => {
            warn!(media = %name, timeout_ms = timeout.as_millis() as u64, "Metadata did not load in time");
            return Err(TintcutError::MetadataTimeout {
                name,
                millis: timeout.as_millis() as u64,
            });
        }
    };

    let source = handles.create_for_path(&path);
    info!(media = %name, ?kind, size, "Imported media");
    Ok(MediaFile {
        id: Uuid::new_v4(),
        kind,
        name,
        size,
        mime_type: mime_type.to_string(),
        source,
        width: metadata.width,
        height: metadata.height,
        duration_seconds: metadata.duration_seconds,
    })
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| TintcutError::Import(format!("not a file: {}", path.display())))
}
