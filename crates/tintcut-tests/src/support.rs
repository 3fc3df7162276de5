//! Fakes shared by the integration tests.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tintcut_app::{EditorConfig, EditorSession};
use tintcut_core::{Result, TintcutError};
use tintcut_media::{
    Encoder, ExportSession, HandleRegistry, MediaKind, MediaMetadata, MetadataProbe,
    RuntimeSupport,
};
use tintcut_project::{Project, ProjectStore};

/// Fixed metadata per kind: 30 s 1280×720 video, 800×600 still, 12 s audio.
pub struct FixedProbe;

impl MetadataProbe for FixedProbe {
    fn probe(&self, _path: &Path, kind: MediaKind) -> Result<MediaMetadata> {
        Ok(match kind {
            MediaKind::Video => MediaMetadata {
                width: Some(1280),
                height: Some(720),
                duration_seconds: Some(30.0),
            },
            MediaKind::Image => MediaMetadata {
                width: Some(800),
                height: Some(600),
                duration_seconds: None,
            },
            MediaKind::Audio => MediaMetadata {
                width: None,
                height: None,
                duration_seconds: Some(12.0),
            },
        })
    }
}

/// What the in-memory encoder saw.
#[derive(Debug, Default)]
pub struct EncoderLog {
    pub runs: Vec<Vec<String>>,
    pub written: Vec<String>,
    pub unlinked: Vec<String>,
}

/// Encoder that keeps files in memory and replays scripted log lines.
pub struct MemoryEncoder {
    loaded: bool,
    files: HashMap<String, Vec<u8>>,
    script: Vec<String>,
    fail: bool,
    pub log: Arc<Mutex<EncoderLog>>,
}

impl MemoryEncoder {
    pub fn new(script: &[&str]) -> Self {
        Self {
            loaded: false,
            files: HashMap::new(),
            script: script.iter().map(|s| s.to_string()).collect(),
            fail: false,
            log: Arc::new(Mutex::new(EncoderLog::default())),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Encoder for MemoryEncoder {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn load(&mut self) -> Result<()> {
        self.loaded = true;
        Ok(())
    }

    fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.files.insert(name.to_string(), bytes.to_vec());
        self.log.lock().written.push(name.to_string());
        Ok(())
    }

    fn run(&mut self, args: &[String], logger: &mut dyn FnMut(&str)) -> Result<()> {
        self.log.lock().runs.push(args.to_vec());
        for line in &self.script {
            logger(line);
        }
        if self.fail {
            return Err(TintcutError::Encoder("conversion failed".into()));
        }
        let output = args
            .last()
            .ok_or_else(|| TintcutError::Encoder("no output".into()))?;
        self.files.insert(output.clone(), b"encoded".to_vec());
        Ok(())
    }

    fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| TintcutError::NotFound(name.to_string()))
    }

    fn unlink(&mut self, name: &str) -> Result<()> {
        self.log.lock().unlinked.push(name.to_string());
        self.files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| TintcutError::NotFound(name.to_string()))
    }
}

pub fn session_with(dir: &Path, encoder: MemoryEncoder) -> EditorSession<MemoryEncoder> {
    let config = EditorConfig {
        work_dir: dir.join("work"),
        library_dir: dir.join("projects"),
        ..Default::default()
    };
    EditorSession::new(
        config,
        ProjectStore::new(Project::new("integration"), HandleRegistry::new()),
        Arc::new(FixedProbe),
        ExportSession::with_support(encoder, RuntimeSupport::Supported),
    )
}

pub fn session(dir: &Path) -> EditorSession<MemoryEncoder> {
    session_with(dir, MemoryEncoder::new(&[]))
}

/// Create a small file to import.
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, name.as_bytes()).unwrap();
    path
}
