//! The ordered snippet collection and its persistence.

use crate::snippet::{PLACEHOLDER_TEXT, Snippet, default_snippets};
use crate::storage::SnippetFile;
use crate::{Error, Result};
use std::collections::HashSet;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Owns the snippet collection, kept sorted by shortcut index.
///
/// Every replacement of the collection and every change in its size is
/// published on a watch channel carrying the current snippet count; see
/// [`SnippetStore::subscribe`]. Persistence failures never abort a mutation:
/// they are logged and kept as [`SnippetStore::last_error`].
pub struct SnippetStore {
    file: Box<dyn SnippetFile>,
    snippets: Vec<Snippet>,
    changes: watch::Sender<usize>,
    last_error: Option<String>,
}

impl SnippetStore {
    /// An empty store backed by `file`. Nothing is read.
    pub fn new(file: impl SnippetFile + 'static) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            file: Box::new(file),
            snippets: Vec::new(),
            changes,
            last_error: None,
        }
    }

    /// Load the persisted collection, seeding the default snippets if it is
    /// empty or absent.
    pub fn open(file: impl SnippetFile + 'static) -> Self {
        let mut store = Self::new(file);
        if let Err(e) = store.load() {
            warn!("Could not load snippets from {}: {}", store.file.describe(), e);
        }
        if store.snippets.is_empty() {
            info!("No snippets found, seeding defaults");
            store.snippets = default_snippets();
            store.publish();
            store.persist();
        }
        store
    }

    /// Replace the in-memory collection with the persisted one.
    ///
    /// On failure the collection is left untouched. Returns the number of
    /// snippets loaded; an absent record loads as zero snippets.
    pub fn load(&mut self) -> Result<usize> {
        let mut loaded = self.file.read()?.unwrap_or_default();

        let mut seen = HashSet::new();
        loaded.retain(|s| {
            if s.shortcut_index == 0 {
                warn!("Dropping snippet {} with shortcut index 0", s.id);
                return false;
            }
            let fresh = seen.insert(s.id);
            if !fresh {
                warn!("Dropping duplicate snippet id {}", s.id);
            }
            fresh
        });
        loaded.sort_by_key(|s| s.shortcut_index);

        debug!("Loaded {} snippets from {}", loaded.len(), self.file.describe());
        self.snippets = loaded;
        self.publish();
        Ok(self.snippets.len())
    }

    /// Sort and write the collection, overwriting the previous record.
    pub fn save(&mut self) -> Result<()> {
        self.sort();
        match self.file.write(&self.snippets) {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Append a placeholder snippet at the next free index and persist.
    ///
    /// Fails without touching the collection when the highest index in use
    /// is `u32::MAX`.
    pub fn add(&mut self) -> Result<Uuid> {
        let snippet = Snippet::new(self.next_index()?, PLACEHOLDER_TEXT);
        let id = snippet.id;
        debug!("Adding snippet {} at index {}", id, snippet.shortcut_index);
        self.snippets.push(snippet);
        self.sort();
        self.publish();
        self.persist();
        Ok(id)
    }

    /// Remove the snippet with `id` and persist. Returns false if no such
    /// snippet exists; the record is still rewritten.
    pub fn delete(&mut self, id: Uuid) -> bool {
        let before = self.snippets.len();
        self.snippets.retain(|s| s.id != id);
        let removed = self.snippets.len() != before;
        if removed {
            debug!("Deleted snippet {}", id);
            self.publish();
        }
        self.persist();
        removed
    }

    /// Change a snippet's text in place. The caller decides when to save.
    pub fn update_text(&mut self, id: Uuid, text: impl Into<String>) -> bool {
        match self.snippets.iter_mut().find(|s| s.id == id) {
            Some(snippet) => {
                snippet.text = text.into();
                true
            }
            None => false,
        }
    }

    /// Move a snippet to another shortcut index, then re-sort and persist.
    pub fn reassign(&mut self, id: Uuid, shortcut_index: u32) -> Result<bool> {
        if shortcut_index == 0 {
            return Err(Error::InvalidKey(
                "Shortcut index must be positive".to_string(),
            ));
        }
        let Some(snippet) = self.snippets.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };
        snippet.shortcut_index = shortcut_index;
        self.persist();
        Ok(true)
    }

    /// All snippets, sorted by shortcut index.
    pub fn snippets(&self) -> &[Snippet] {
        &self.snippets
    }

    pub fn get(&self, id: Uuid) -> Option<&Snippet> {
        self.snippets.iter().find(|s| s.id == id)
    }

    /// The first snippet bound to `shortcut_index`, if any.
    pub fn find_by_index(&self, shortcut_index: u32) -> Option<&Snippet> {
        self.snippets
            .iter()
            .find(|s| s.shortcut_index == shortcut_index)
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Receive the snippet count whenever the collection is replaced or
    /// resized.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.changes.subscribe()
    }

    /// The error from the most recent failed save, cleared by the next
    /// successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Where the collection is persisted.
    pub fn location(&self) -> String {
        self.file.describe()
    }

    fn next_index(&self) -> Result<u32> {
        let max = self
            .snippets
            .iter()
            .map(|s| s.shortcut_index)
            .max()
            .unwrap_or(0);
        max.checked_add(1).ok_or(Error::IndexExhausted(max))
    }

    fn sort(&mut self) {
        self.snippets.sort_by_key(|s| s.shortcut_index);
    }

    fn publish(&self) {
        self.changes.send_replace(self.snippets.len());
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            warn!("Could not save snippets to {}: {}", self.file.describe(), e);
        }
    }
}
