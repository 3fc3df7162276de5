//! Source handles: opaque references to imported bytes.
//!
//! Every imported file gets one handle. The handle must be revoked exactly
//! once when the file leaves the store, otherwise its backing stays alive for
//! the rest of the session.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tintcut_core::{Result, TintcutError};
use tracing::{debug, warn};

/// Opaque reference to a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceHandle(u64);

impl SourceHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:tintcut/{}", self.0)
    }
}

#[derive(Debug, Clone)]
enum Backing {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

#[derive(Debug, Default)]
struct Inner {
    next: u64,
    live: HashMap<u64, Backing>,
    revoked: u64,
}

/// Registry of live handles. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, backing: Backing) -> SourceHandle {
        let mut inner = self.inner.lock();
        inner.next += 1;
        let id = inner.next;
        inner.live.insert(id, backing);
        SourceHandle(id)
    }

    /// Create a handle backed by a file on disk.
    pub fn create_for_path(&self, path: impl Into<PathBuf>) -> SourceHandle {
        let path = path.into();
        let handle = self.insert(Backing::File(path.clone()));
        debug!(%handle, path = %path.display(), "Created source handle");
        handle
    }

    /// Create a handle backed by in-memory bytes.
    pub fn create_for_bytes(&self, bytes: impl Into<Arc<[u8]>>) -> SourceHandle {
        let handle = self.insert(Backing::Memory(bytes.into()));
        debug!(%handle, "Created in-memory source handle");
        handle
    }

    /// Release a handle. Returns `false` if it was already revoked or unknown.
    pub fn revoke(&self, handle: SourceHandle) -> bool {
        let mut inner = self.inner.lock();
        if inner.live.remove(&handle.0).is_some() {
            inner.revoked += 1;
            debug!(%handle, "Revoked source handle");
            true
        } else {
            warn!(%handle, "Revoke of unknown or already revoked handle");
            false
        }
    }

    pub fn is_live(&self, handle: SourceHandle) -> bool {
        self.inner.lock().live.contains_key(&handle.0)
    }

    /// Number of handles currently alive.
    pub fn live_count(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// Number of successful revocations so far.
    pub fn revoked_count(&self) -> u64 {
        self.inner.lock().revoked
    }

    /// Read the bytes behind a handle.
    pub fn read(&self, handle: SourceHandle) -> Result<Vec<u8>> {
        // Clone the backing so file I/O happens outside the lock.
        let backing = self
            .inner
            .lock()
            .live
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| TintcutError::NotFound(format!("source handle {handle}")))?;
        match backing {
            Backing::File(path) => Ok(std::fs::read(path)?),
            Backing::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revoke_exactly_once() {
        let registry = HandleRegistry::new();
        let handle = registry.create_for_bytes(vec![1u8, 2, 3]);
        assert!(registry.is_live(handle));
        assert!(registry.revoke(handle));
        assert!(!registry.revoke(handle));
        assert_eq!(registry.revoked_count(), 1);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_read_memory_and_file() {
        let registry = HandleRegistry::new();
        let mem = registry.create_for_bytes(vec![9u8; 4]);
        assert_eq!(registry.read(mem).unwrap(), vec![9u8; 4]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.bin");
        std::fs::write(&path, b"abc").unwrap();
        let file = registry.create_for_path(&path);
        assert_eq!(registry.read(file).unwrap(), b"abc");
    }

    #[test]
    fn test_read_after_revoke_fails() {
        let registry = HandleRegistry::new();
        let handle = registry.create_for_bytes(vec![0u8]);
        registry.revoke(handle);
        assert!(matches!(registry.read(handle), Err(TintcutError::NotFound(_))));
    }

    #[test]
    fn test_clones_share_state() {
        let registry = HandleRegistry::new();
        let other = registry.clone();
        let handle = registry.create_for_bytes(vec![0u8]);
        assert!(other.revoke(handle));
        assert!(!registry.is_live(handle));
    }

    #[test]
    fn test_display() {
        assert_eq!(SourceHandle::from_raw(7).to_string(), "blob:tintcut/7");
    }
}
