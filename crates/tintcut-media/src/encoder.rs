//! External encoder interface and the ffmpeg sidecar backend.
//!
//! The encoder is a black box with a small file system: stage inputs with
//! [`Encoder::write_file`], run command tokens, read the output back, then
//! unlink everything. One job at a time; implementations are not reentrant.

use ffmpeg_sidecar::command::{ffmpeg_is_installed, FfmpegCommand};
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::path::{Path, PathBuf};
use tintcut_core::{Result, TintcutError};
use tracing::{debug, info, warn};

/// A command-line style transcoder with a private working area.
pub trait Encoder: Send {
    fn is_loaded(&self) -> bool;

    /// Prepare the encoder. Called once before the first job.
    fn load(&mut self) -> Result<()>;

    /// Stage bytes under `name`.
    fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Run one job. Every raw log line goes to `logger`.
    fn run(&mut self, args: &[String], logger: &mut dyn FnMut(&str)) -> Result<()>;

    fn read_file(&mut self, name: &str) -> Result<Vec<u8>>;

    /// Release a staged or produced file.
    fn unlink(&mut self, name: &str) -> Result<()>;
}

/// Whether exports can run here at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeSupport {
    Supported,
    Unsupported { reason: String },
}

impl RuntimeSupport {
    /// Look for an ffmpeg binary the sidecar can drive.
    pub fn detect() -> Self {
        if ffmpeg_is_installed() || which::which("ffmpeg").is_ok() {
            Self::Supported
        } else {
            Self::Unsupported {
                reason: "ffmpeg was not found. Install it or set ffmpeg_path in the config."
                    .to_string(),
            }
        }
    }

    /// Support for an explicitly configured binary.
    pub fn for_binary(path: &Path) -> Self {
        if path.is_file() {
            Self::Supported
        } else {
            Self::Unsupported {
                reason: format!("configured ffmpeg binary {} does not exist", path.display()),
            }
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Supported => None,
            Self::Unsupported { reason } => Some(reason),
        }
    }
}

/// Runs ffmpeg through `ffmpeg-sidecar`, with a directory as its file system.
#[derive(Debug)]
pub struct SidecarEncoder {
    work_dir: PathBuf,
    ffmpeg: Option<PathBuf>,
    loaded: bool,
}

impl SidecarEncoder {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ffmpeg: None,
            loaded: false,
        }
    }

    /// Use a specific ffmpeg binary instead of the sidecar default.
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg = Some(path.into());
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Staged names are plain file names; anything path-like is refused.
    fn staged_path(&self, name: &str) -> Result<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if plain {
            Ok(self.work_dir.join(name))
        } else {
            Err(TintcutError::InvalidParameter(format!(
                "invalid encoder file name {name:?}"
            )))
        }
    }

    fn command(&self) -> FfmpegCommand {
        match &self.ffmpeg {
            Some(path) => FfmpegCommand::new_with_path(path),
            None => FfmpegCommand::new(),
        }
    }
}

impl Encoder for SidecarEncoder {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn load(&mut self) -> Result<()> {
        let support = match &self.ffmpeg {
            Some(path) => RuntimeSupport::for_binary(path),
            None => RuntimeSupport::detect(),
        };
        if let RuntimeSupport::Unsupported { reason } = support {
            return Err(TintcutError::UnsupportedRuntime(reason));
        }
        std::fs::create_dir_all(&self.work_dir)?;
        self.loaded = true;
        info!(work_dir = %self.work_dir.display(), "Encoder loaded");
        Ok(())
    }

    fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.staged_path(name)?;
        std::fs::write(&path, bytes)?;
        debug!(file = name, bytes = bytes.len(), "Staged encoder input");
        Ok(())
    }

    fn run(&mut self, args: &[String], logger: &mut dyn FnMut(&str)) -> Result<()> {
        if !self.loaded {
            return Err(TintcutError::Encoder("encoder is not loaded".into()));
        }
        let mut command = self.command();
        command.arg("-y").args(args);
        command.as_inner_mut().current_dir(&self.work_dir);

        let mut child = command
            .spawn()
            .map_err(|e| TintcutError::Encoder(format!("Failed to spawn ffmpeg: {e}")))?;
        let events = child
            .iter()
            .map_err(|e| TintcutError::Encoder(format!("Failed to read ffmpeg output: {e}")))?;

        let mut last_error = None;
        for event in events {
            match event {
                FfmpegEvent::Log(level, line) => {
                    if matches!(level, LogLevel::Error | LogLevel::Fatal) {
                        last_error = Some(line.clone());
                    }
                    logger(&line);
                }
                FfmpegEvent::Progress(progress) => {
                    logger(&format!("frame={} time={}", progress.frame, progress.time));
                }
                FfmpegEvent::Error(message) => {
                    warn!(error = %message, "ffmpeg reported an error");
                    last_error = Some(message);
                }
                _ => {}
            }
        }

        let status = child
            .wait()
            .map_err(|e| TintcutError::Encoder(format!("Failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            return Err(TintcutError::Encoder(match last_error {
                Some(line) => format!("ffmpeg exited with status {status}: {line}"),
                None => format!("ffmpeg exited with status {status}"),
            }));
        }
        Ok(())
    }

    fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let path = self.staged_path(name)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                TintcutError::NotFound(format!("encoder output {name}"))
            }
            _ => TintcutError::Io(e),
        })
    }

    fn unlink(&mut self, name: &str) -> Result<()> {
        let path = self.staged_path(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TintcutError::NotFound(format!("encoder file {name}")))
            }
            Err(e) => Err(e.into()),
        }
    }
}
