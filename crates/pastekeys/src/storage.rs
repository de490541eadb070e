//! Durable record behind the snippet store.
//!
//! The store only deals in whole collections: read everything, write
//! everything. [`JsonFile`] is the real backend; [`MemoryFile`] keeps the
//! encoded bytes in memory and counts writes, which is what the tests use.

use crate::snippet::Snippet;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Name of the snippet record inside the application data directory.
pub const SNIPPET_FILE_NAME: &str = "metinler.json";

/// Application directory name under the per-user data directory.
pub const APP_DIR_NAME: &str = "pastekeys";

/// Whole-collection persistence for snippets.
pub trait SnippetFile: Send {
    /// Read the persisted collection. `Ok(None)` means nothing has been
    /// persisted yet.
    fn read(&self) -> Result<Option<Vec<Snippet>>>;

    /// Replace the persisted collection.
    fn write(&self, snippets: &[Snippet]) -> Result<()>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// A JSON array of snippets on disk.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/pastekeys/metinler.json`
    pub fn default_location() -> Result<Self> {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))?;
        Ok(Self::new(base.join(APP_DIR_NAME).join(SNIPPET_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnippetFile for JsonFile {
    fn read(&self) -> Result<Option<Vec<Snippet>>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    fn write(&self, snippets: &[Snippet]) -> Result<()> {
        let data = serde_json::to_vec_pretty(snippets)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write a sibling then rename, so an interrupted save never leaves a
        // torn record behind.
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory record. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    data: Option<Vec<u8>>,
    writes: usize,
    fail_writes: bool,
}

impl MemoryFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with raw bytes, which need not be valid JSON.
    pub fn with_bytes(data: impl Into<Vec<u8>>) -> Self {
        let file = Self::default();
        file.lock().data = Some(data.into());
        file
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Make every following write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.lock().data.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-write; the bytes are still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnippetFile for MemoryFile {
    fn read(&self) -> Result<Option<Vec<Snippet>>> {
        match &self.lock().data {
            Some(data) => Ok(Some(serde_json::from_slice(data)?)),
            None => Ok(None),
        }
    }

    fn write(&self, snippets: &[Snippet]) -> Result<()> {
        let data = serde_json::to_vec(snippets)?;
        let mut state = self.lock();
        if state.fail_writes {
            return Err(Error::Io(std::io::Error::other("write refused")));
        }
        state.data = Some(data);
        state.writes += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}
