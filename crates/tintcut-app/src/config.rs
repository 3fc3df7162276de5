//! Editor configuration, read from `<config dir>/tintcut/config.json`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tintcut_core::{Result, Rgb8, TintcutError};
use tintcut_media::DEFAULT_METADATA_TIMEOUT;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Upper bound on the metadata wait during import.
    pub metadata_timeout_ms: u64,
    /// Encoder staging directory.
    pub work_dir: PathBuf,
    /// Explicit ffmpeg binary; otherwise PATH and the sidecar download dir.
    pub ffmpeg_path: Option<PathBuf>,
    /// Saved projects.
    pub library_dir: PathBuf,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Canvas background, `#rrggbb`.
    pub background: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let cache = dirs::cache_dir().unwrap_or_else(std::env::temp_dir).join("tintcut");
        let data = dirs::data_dir().unwrap_or_else(std::env::temp_dir).join("tintcut");
        Self {
            metadata_timeout_ms: DEFAULT_METADATA_TIMEOUT.as_millis() as u64,
            work_dir: cache.join("work"),
            ffmpeg_path: None,
            library_dir: data.join("projects"),
            log_filter: "info".to_string(),
            background: Rgb8::DEFAULT_BACKGROUND.to_hex(),
        }
    }
}

impl EditorConfig {
    /// `<config dir>/tintcut/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tintcut").join("config.json"))
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`. A missing file gives the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Self = serde_json::from_slice(&data).map_err(|e| {
            TintcutError::Serialization(format!("invalid config {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| TintcutError::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn background_color(&self) -> Result<Rgb8> {
        Rgb8::from_hex(&self.background)
    }
}
