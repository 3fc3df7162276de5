//! Media metadata probing.

use crate::media::MediaKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tintcut_core::{Result, TintcutError};
use tracing::{debug, warn};

/// What import needs to know about a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_seconds: Option<f64>,
}

impl MediaMetadata {
    /// Check that the fields the given kind relies on are present.
    pub fn validate_for(&self, kind: MediaKind) -> Result<()> {
        let has_dims = matches!((self.width, self.height), (Some(w), Some(h)) if w > 0 && h > 0);
        let has_duration = self
            .duration_seconds
            .is_some_and(|d| d.is_finite() && d > 0.0);
        let ok = match kind {
            MediaKind::Audio => has_duration,
            MediaKind::Image => has_dims,
            MediaKind::Video => has_dims && has_duration,
        };
        if ok {
            Ok(())
        } else {
            Err(TintcutError::Import(format!(
                "incomplete {kind:?} metadata: {self:?}"
            )))
        }
    }
}

/// Reads metadata without decoding the whole file. May block.
pub trait MetadataProbe: Send + Sync {
    fn probe(&self, path: &Path, kind: MediaKind) -> Result<MediaMetadata>;
}

/// Probe via the `ffprobe` binary and its JSON output.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: PathBuf,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new(Self::find_binary())
    }
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Search PATH, then next to the sidecar ffmpeg binary.
    pub fn find_binary() -> PathBuf {
        let name = if cfg!(windows) { "ffprobe.exe" } else { "ffprobe" };
        if let Ok(found) = which::which(name) {
            return found;
        }
        ffmpeg_sidecar::paths::ffmpeg_path().with_file_name(name)
    }

    pub fn is_available(&self) -> bool {
        self.binary.exists() || which::which(&self.binary).is_ok()
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Turn `ffprobe -print_format json` output into metadata.
pub fn parse_ffprobe_json(json: &str) -> Result<MediaMetadata> {
    let output: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| TintcutError::Import(format!("Failed to parse ffprobe JSON: {e}")))?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let parse_duration = |d: &Option<String>| d.as_deref().and_then(|d| d.parse::<f64>().ok());
    let duration_seconds = output
        .format
        .as_ref()
        .and_then(|f| parse_duration(&f.duration))
        .or_else(|| output.streams.iter().find_map(|s| parse_duration(&s.duration)));

    Ok(MediaMetadata {
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        duration_seconds,
    })
}

impl MetadataProbe for FfprobeProbe {
    fn probe(&self, path: &Path, kind: MediaKind) -> Result<MediaMetadata> {
        if !path.exists() {
            return Err(TintcutError::NotFound(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let output = Command::new(&self.binary)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| {
                TintcutError::Import(format!(
                    "Failed to run ffprobe ({}): {e}",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(stderr = %stderr, "ffprobe failed");
            return Err(TintcutError::Import(format!(
                "ffprobe exited with status {}: {}",
                output.status,
                stderr.chars().take(500).collect::<String>()
            )));
        }

        let mut metadata = parse_ffprobe_json(&String::from_utf8_lossy(&output.stdout))?;
        // Stills report a nominal duration that nothing should rely on.
        if kind == MediaKind::Image {
            metadata.duration_seconds = None;
        }
        debug!(path = %path.display(), ?metadata, "Probed media");
        Ok(metadata)
    }
}
