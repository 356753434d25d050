//! Persistent storage of the key store document

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Non-volatile storage for the lock's key store
///
/// The document is opaque bytes (JSON in practice). `save` must replace the
/// previous document as a whole or fail without touching it.
pub trait Storage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The saved document, or `None` on first boot
    fn load(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    fn save(&mut self, document: &[u8]) -> Result<(), Self::Error>;

    /// Remove the document (factory reset)
    fn clear(&mut self) -> Result<(), Self::Error>;
}

/// Document stored in a single file, replaced atomically through a rename
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    type Error = io::Error;

    fn load(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&mut self, document: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, document)?;
        fs::rename(&tmp, &self.path)
    }

    fn clear(&mut self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("storage is read-only")]
pub struct ReadOnly;

/// In-memory storage; clones share the same document
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    document: Option<Vec<u8>>,
    read_only: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current document, for inspection
    pub fn document(&self) -> Option<Vec<u8>> {
        self.lock().document.clone()
    }

    /// Make every following `save` and `clear` fail
    pub fn set_read_only(&self, read_only: bool) {
        self.lock().read_only = read_only;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Storage for MemoryStorage {
    type Error = ReadOnly;

    fn load(&self) -> Result<Option<Vec<u8>>, ReadOnly> {
        Ok(self.document())
    }

    fn save(&mut self, document: &[u8]) -> Result<(), ReadOnly> {
        let mut inner = self.lock();
        if inner.read_only {
            return Err(ReadOnly);
        }
        inner.document = Some(document.to_vec());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ReadOnly> {
        let mut inner = self.lock();
        if inner.read_only {
            return Err(ReadOnly);
        }
        inner.document = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("data").join("store.json"));

        assert_eq!(storage.load().unwrap(), None);
        storage.save(b"{\"keys\":[]}").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some(&b"{\"keys\":[]}"[..]));
        storage.save(b"{}").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some(&b"{}"[..]));
        assert!(!storage.path().with_extension("tmp").exists());

        storage.clear().unwrap();
        assert_eq!(storage.load().unwrap(), None);
        // clearing twice is fine
        storage.clear().unwrap();
    }

    #[test]
    fn memory_storage_clones_share_state() {
        let mut storage = MemoryStorage::new();
        let view = storage.clone();
        storage.save(b"abc").unwrap();
        assert_eq!(view.document().as_deref(), Some(&b"abc"[..]));

        view.set_read_only(true);
        assert!(storage.save(b"def").is_err());
        assert!(storage.clear().is_err());
        assert_eq!(storage.load().unwrap().as_deref(), Some(&b"abc"[..]));
    }
}
