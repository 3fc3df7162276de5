//! One-at-a-time export sessions.
//!
//! The session owns the encoder and a status flag. While the status is
//! anything but `Finished`, new exports are refused. Staged inputs and the
//! produced output are unlinked whether the job succeeds or fails.

use crate::encoder::{Encoder, RuntimeSupport};
use crate::export::EncodeCommand;
use crate::handle::HandleRegistry;
use crate::progress::ProgressTracker;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use tintcut_core::{Result, TintcutError, TrimWindow};
use tracing::{debug, info, warn};

/// Where an export is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ExportStatus {
    /// Idle; exports may start.
    #[default]
    Finished,
    Preparing,
    WritingFiles,
    Rendering,
}

impl ExportStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Finished => "Finished",
            Self::Preparing => "Preparing...",
            Self::WritingFiles => "Writing file to memory...",
            Self::Rendering => "Rendering...",
        }
    }

    pub fn is_busy(self) -> bool {
        self != Self::Finished
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Observable export state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ExportSnapshot {
    pub status: ExportStatus,
    pub progress_percent: f64,
}

/// Notifications sent to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    Status(ExportStatus),
    Progress(f64),
    Completed { file_name: String, bytes: usize },
    Failed(String),
}

/// The finished, downloadable result.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub file_name: String,
}

/// Runs exports through one encoder. Share it behind an `Arc`.
pub struct ExportSession<E: Encoder> {
    encoder: Mutex<E>,
    support: RuntimeSupport,
    state: Mutex<ExportSnapshot>,
    subscribers: Mutex<Vec<Sender<ExportEvent>>>,
}

impl<E: Encoder> ExportSession<E> {
    /// Create a session, detecting runtime support.
    pub fn new(encoder: E) -> Self {
        Self::with_support(encoder, RuntimeSupport::detect())
    }

    pub fn with_support(encoder: E, support: RuntimeSupport) -> Self {
        if let Some(reason) = support.reason() {
            warn!(reason, "Export is disabled");
        }
        Self {
            encoder: Mutex::new(encoder),
            support,
            state: Mutex::new(ExportSnapshot::default()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> ExportSnapshot {
        *self.state.lock()
    }

    pub fn runtime_support(&self) -> &RuntimeSupport {
        &self.support
    }

    /// Why the export action is disabled, if it is.
    pub fn disabled_reason(&self) -> Option<String> {
        if let Some(reason) = self.support.reason() {
            return Some(reason.to_string());
        }
        self.snapshot()
            .status
            .is_busy()
            .then(|| TintcutError::ExportInProgress.to_string())
    }

    /// Receive status and progress events from now on.
    pub fn subscribe(&self) -> Receiver<ExportEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    fn emit(&self, event: ExportEvent) {
        // Drop subscribers whose receiver is gone.
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn set_status(&self, status: ExportStatus) {
        self.state.lock().status = status;
        debug!(%status, "Export status");
        self.emit(ExportEvent::Status(status));
    }

    fn set_progress(&self, percent: f64) {
        self.state.lock().progress_percent = percent;
        self.emit(ExportEvent::Progress(percent));
    }

    /// Claim the session, or refuse if unsupported or busy.
    fn begin(&self) -> Result<()> {
        if let Some(reason) = self.support.reason() {
            return Err(TintcutError::UnsupportedRuntime(reason.to_string()));
        }
        {
            let mut state = self.state.lock();
            if state.status.is_busy() {
                return Err(TintcutError::ExportInProgress);
            }
            *state = ExportSnapshot {
                status: ExportStatus::Preparing,
                progress_percent: 0.0,
            };
        }
        self.emit(ExportEvent::Status(ExportStatus::Preparing));
        self.emit(ExportEvent::Progress(0.0));
        Ok(())
    }

    /// Run one export to completion.
    ///
    /// Blocks the calling thread for the whole encode. On failure the session
    /// returns to `Finished` so the user can retry.
    pub fn start_export(
        &self,
        command: &EncodeCommand,
        sources: &HandleRegistry,
    ) -> Result<ExportArtifact> {
        self.begin()?;
        info!(output = %command.download_name, "Starting export");

        let mut encoder = self.encoder.lock();
        let mut staged = Vec::with_capacity(command.inputs.len() + 1);
        let result = self.run_job(&mut *encoder, command, sources, &mut staged);

        staged.push(command.output_name.clone());
        for name in &staged {
            match encoder.unlink(name) {
                Ok(()) => debug!(file = %name, "Released encoder file"),
                Err(TintcutError::NotFound(_)) => {}
                Err(e) => warn!(file = %name, error = %e, "Failed to release encoder file"),
            }
        }
        drop(encoder);

        self.set_status(ExportStatus::Finished);
        match &result {
            Ok(artifact) => {
                info!(output = %artifact.file_name, bytes = artifact.bytes.len(), "Export finished");
                self.emit(ExportEvent::Completed {
                    file_name: artifact.file_name.clone(),
                    bytes: artifact.bytes.len(),
                });
            }
            Err(e) => {
                warn!(error = %e, "Export failed");
                self.emit(ExportEvent::Failed(e.to_string()));
            }
        }
        result
    }

    fn run_job(
        &self,
        encoder: &mut E,
        command: &EncodeCommand,
        sources: &HandleRegistry,
        staged: &mut Vec<String>,
    ) -> Result<ExportArtifact> {
        if !encoder.is_loaded() {
            encoder.load()?;
        }

        self.set_status(ExportStatus::WritingFiles);
        for input in &command.inputs {
            let bytes = sources.read(input.source)?;
            staged.push(input.name.clone());
            encoder.write_file(&input.name, &bytes)?;
        }

        self.set_status(ExportStatus::Rendering);
        // Stills have no trim; any positive timestamp completes them.
        let mut tracker = ProgressTracker::new(command.trim.unwrap_or(TrimWindow {
            start: 0.0,
            end: f64::MIN_POSITIVE,
        }));
        encoder.run(&command.args, &mut |line: &str| {
            if let Some(percent) = tracker.observe_line(line) {
                self.set_progress(percent);
            }
        })?;

        let bytes = encoder.read_file(&command.output_name)?;
        Ok(ExportArtifact {
            bytes,
            mime_type: command.mime_type,
            file_name: command.download_name.clone(),
        })
    }
}
