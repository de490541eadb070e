use crate::Result;
use crate::activator::{Activation, PasteActivator};
use crate::dispatcher::{Dispatcher, HotkeyBackend};
use crate::snippet::Snippet;
use crate::store::SnippetStore;
use global_hotkey::{GlobalHotKeyManager, HotKeyState};
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

/// Wires the store, the dispatcher and the activator together.
///
/// Hotkey presses are routed to the activator, and every change the store
/// publishes re-registers the dispatcher with the new snippet count. The
/// editing methods here are what a presentation layer calls.
pub struct Coordinator<B: HotkeyBackend = GlobalHotKeyManager> {
    store: SnippetStore,
    dispatcher: Dispatcher<B>,
    activator: PasteActivator,
    changes: watch::Receiver<usize>,
}

impl<B: HotkeyBackend> Coordinator<B> {
    /// Take ownership of the components and register hotkeys for the
    /// current snippet count.
    pub fn new(store: SnippetStore, dispatcher: Dispatcher<B>, activator: PasteActivator) -> Self {
        let changes = store.subscribe();
        let mut coordinator = Self {
            store,
            dispatcher,
            activator,
            changes,
        };
        let count = coordinator.store.len();
        coordinator.dispatcher.register_hotkeys(count);
        coordinator
    }

    /// Re-register hotkeys if the store has published since the last sync.
    /// Returns whether a re-registration happened.
    pub fn sync(&mut self) -> bool {
        match self.changes.has_changed() {
            Ok(true) => {
                let count = *self.changes.borrow_and_update();
                debug!("Snippet count is now {}, rebinding", count);
                self.dispatcher.register_hotkeys(count);
                true
            }
            _ => false,
        }
    }

    /// Route a platform hotkey event to the activator.
    pub fn handle_hotkey(&mut self, id: u32, state: HotKeyState) -> Option<Activation> {
        self.sync();
        let mut pressed = None;
        self.dispatcher.dispatch(id, state, |index| pressed = Some(index));
        pressed.map(|index| self.activator.activate(&self.store, index))
    }

    /// Paste the snippet at `shortcut_index` as if its hotkey were pressed.
    pub fn activate(&mut self, shortcut_index: u32) -> Activation {
        self.activator.activate(&self.store, shortcut_index)
    }

    pub fn add(&mut self) -> Result<Uuid> {
        let id = self.store.add()?;
        self.sync();
        Ok(id)
    }

    pub fn delete(&mut self, id: Uuid) -> bool {
        let removed = self.store.delete(id);
        self.sync();
        removed
    }

    /// Edit a snippet's text and persist it right away.
    pub fn update_text(&mut self, id: Uuid, text: impl Into<String>) -> bool {
        if !self.store.update_text(id, text) {
            return false;
        }
        if let Err(e) = self.store.save() {
            warn!("Could not save snippets: {}", e);
        }
        true
    }

    pub fn reassign(&mut self, id: Uuid, shortcut_index: u32) -> Result<bool> {
        self.store.reassign(id, shortcut_index)
    }

    /// Re-read the persisted collection. On failure the current snippets and
    /// bindings stay as they are.
    pub fn reload(&mut self) -> Result<usize> {
        let loaded = self.store.load();
        self.sync();
        loaded
    }

    /// All snippets, sorted by shortcut index.
    pub fn snippets(&self) -> &[Snippet] {
        self.store.snippets()
    }

    /// Receive the snippet count whenever the collection changes.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &SnippetStore {
        &self.store
    }

    /// Direct store access. Size changes made through it are picked up by
    /// the next [`Coordinator::sync`].
    pub fn store_mut(&mut self) -> &mut SnippetStore {
        &mut self.store
    }

    pub fn dispatcher(&self) -> &Dispatcher<B> {
        &self.dispatcher
    }

    /// Release every hotkey binding.
    pub fn shutdown(&mut self) {
        self.dispatcher.unbind_all();
    }
}
