use crate::key::{Chord, PALETTE};
use crate::{Error, Result};
use global_hotkey::hotkey::{HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyManager, HotKeyState};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// The platform's global hotkey registration API.
pub trait HotkeyBackend {
    fn register(&self, hotkey: HotKey) -> Result<()>;
    fn unregister(&self, hotkey: HotKey) -> Result<()>;
}

impl HotkeyBackend for GlobalHotKeyManager {
    fn register(&self, hotkey: HotKey) -> Result<()> {
        GlobalHotKeyManager::register(self, hotkey).map_err(Error::from)
    }

    fn unregister(&self, hotkey: HotKey) -> Result<()> {
        GlobalHotKeyManager::unregister(self, hotkey).map_err(Error::from)
    }
}

/// A live binding from a palette key to a shortcut index
struct Binding {
    /// 1-based logical index delivered to the callback
    index: u32,
    chord: Chord,
    hotkey: HotKey,
}

/// Binds the number-row palette to shortcut indices and routes presses.
///
/// There is one dispatcher per process; it owns every registration it makes
/// and releases them when dropped. Calls are expected from a single thread.
pub struct Dispatcher<B: HotkeyBackend = GlobalHotKeyManager> {
    backend: B,
    modifiers: Modifiers,
    /// Keyed by the platform hotkey id carried in press events
    bindings: HashMap<u32, Binding>,
}

impl Dispatcher<GlobalHotKeyManager> {
    /// Create a dispatcher on the platform hotkey manager.
    ///
    /// On macOS this must be called on the main thread, before the event
    /// loop starts running.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying global hotkey manager fails to initialize.
    pub fn new(modifiers: Modifiers) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().map_err(|e| {
            Error::HotkeyOperation(format!("Failed to create hotkey manager: {e}"))
        })?;
        Ok(Self::with_backend(manager, modifiers))
    }
}

impl<B: HotkeyBackend> Dispatcher<B> {
    pub fn with_backend(backend: B, modifiers: Modifiers) -> Self {
        Self {
            backend,
            modifiers,
            bindings: HashMap::new(),
        }
    }

    /// The modifier every palette key is bound with.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Rebind the palette for `count` snippets.
    ///
    /// All existing bindings are released first, then palette keys are bound
    /// in order to indices `1..=min(count, 9)`. A key the platform refuses is
    /// skipped and the rest still proceed. Returns the number of keys bound.
    pub fn register_hotkeys(&mut self, count: usize) -> usize {
        self.unbind_all();

        let wanted = count.min(PALETTE.len());
        for slot in 0..wanted {
            let Some(chord) = Chord::for_slot(self.modifiers, slot) else {
                break;
            };
            let hotkey = chord.to_hotkey();
            match self.backend.register(hotkey) {
                Ok(()) => {
                    let index = slot as u32 + 1;
                    debug!("Bound {} to shortcut {}", chord, index);
                    self.bindings.insert(
                        hotkey.id(),
                        Binding {
                            index,
                            chord,
                            hotkey,
                        },
                    );
                }
                Err(e) => warn!("Skipping {}: {}", chord, e),
            }
        }

        if count > PALETTE.len() {
            info!(
                "{} snippets but only {} hotkeys; the rest are unreachable by keyboard",
                count,
                PALETTE.len()
            );
        }
        info!("Registered {} of {} hotkeys", self.bindings.len(), wanted);
        self.bindings.len()
    }

    /// Release every binding.
    ///
    /// A binding the platform fails to release is still dropped from the table.
    pub fn unbind_all(&mut self) {
        for (_, binding) in self.bindings.drain() {
            if let Err(e) = self.backend.unregister(binding.hotkey) {
                warn!("Failed to unregister {}: {}", binding.chord, e);
            }
        }
    }

    /// Route a platform hotkey event.
    ///
    /// `on_press` is called with the logical index when `id` belongs to a
    /// bound key and the key went down. Everything else is ignored. Returns
    /// whether the callback fired.
    pub fn dispatch<F>(&self, id: u32, state: HotKeyState, on_press: F) -> bool
    where
        F: FnOnce(u32),
    {
        if state != HotKeyState::Pressed {
            return false;
        }
        match self.bindings.get(&id) {
            Some(binding) => {
                debug!("Hotkey {} pressed", binding.chord);
                on_press(binding.index);
                true
            }
            None => {
                debug!("Ignoring unbound hotkey id {}", id);
                false
            }
        }
    }

    /// The binding table as (index, chord) pairs, ordered by index.
    pub fn bindings(&self) -> Vec<(u32, Chord)> {
        let mut table: Vec<(u32, Chord)> = self
            .bindings
            .values()
            .map(|b| (b.index, b.chord))
            .collect();
        table.sort_by_key(|(index, _)| *index);
        table
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: HotkeyBackend> Drop for Dispatcher<B> {
    fn drop(&mut self) {
        self.unbind_all();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use global_hotkey::hotkey::Code;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    /// Records registrations; refuses any code listed in `refuse`.
    #[derive(Default, Clone)]
    pub(crate) struct FakeBackend {
        pub registered: Rc<RefCell<HashSet<u32>>>,
        pub refuse: Rc<RefCell<Vec<Code>>>,
        pub unregister_calls: Rc<RefCell<usize>>,
    }

    impl HotkeyBackend for FakeBackend {
        fn register(&self, hotkey: HotKey) -> Result<()> {
            if self.refuse.borrow().contains(&hotkey.key) {
                return Err(Error::HotkeyOperation("already claimed".to_string()));
            }
            if !self.registered.borrow_mut().insert(hotkey.id()) {
                return Err(Error::HotkeyOperation("registered twice".to_string()));
            }
            Ok(())
        }

        fn unregister(&self, hotkey: HotKey) -> Result<()> {
            *self.unregister_calls.borrow_mut() += 1;
            self.registered.borrow_mut().remove(&hotkey.id());
            Ok(())
        }
    }

    fn dispatcher() -> (Dispatcher<FakeBackend>, FakeBackend) {
        let backend = FakeBackend::default();
        (
            Dispatcher::with_backend(backend.clone(), Modifiers::ALT),
            backend,
        )
    }

    fn id_of(modifiers: Modifiers, code: Code) -> u32 {
        Chord::new(modifiers, code).to_hotkey().id()
    }

    #[test]
    fn test_binds_in_palette_order() {
        let (mut dispatcher, backend) = dispatcher();
        assert_eq!(dispatcher.register_hotkeys(3), 3);
        let table: Vec<(u32, String)> = dispatcher
            .bindings()
            .into_iter()
            .map(|(i, c)| (i, c.to_string()))
            .collect();
        assert_eq!(
            table,
            vec![
                (1, "alt+1".to_string()),
                (2, "alt+2".to_string()),
                (3, "alt+3".to_string()),
            ]
        );
        assert_eq!(backend.registered.borrow().len(), 3);
    }

    #[test]
    fn test_register_is_idempotent() {
        let (mut dispatcher, backend) = dispatcher();
        dispatcher.register_hotkeys(4);
        let first = dispatcher.bindings();
        dispatcher.register_hotkeys(4);
        assert_eq!(dispatcher.bindings(), first);
        assert_eq!(backend.registered.borrow().len(), 4);
    }

    #[test]
    fn test_caps_at_nine() {
        let (mut dispatcher, _) = dispatcher();
        assert_eq!(dispatcher.register_hotkeys(14), 9);
        let indices: Vec<u32> = dispatcher.bindings().iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn test_shrinking_clears_stale_bindings() {
        let (mut dispatcher, backend) = dispatcher();
        dispatcher.register_hotkeys(5);
        dispatcher.register_hotkeys(2);
        assert_eq!(dispatcher.bindings().len(), 2);
        assert_eq!(backend.registered.borrow().len(), 2);
        let stale = id_of(Modifiers::ALT, Code::Digit5);
        assert!(!dispatcher.dispatch(stale, HotKeyState::Pressed, |_| {}));

        dispatcher.register_hotkeys(0);
        assert!(dispatcher.bindings().is_empty());
        assert!(backend.registered.borrow().is_empty());
    }

    #[test]
    fn test_refused_slot_is_skipped() {
        let (mut dispatcher, backend) = dispatcher();
        backend.refuse.borrow_mut().push(Code::Digit2);
        assert_eq!(dispatcher.register_hotkeys(3), 2);
        let indices: Vec<u32> = dispatcher.bindings().iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn test_dispatch_routes_presses_only() {
        let (mut dispatcher, _) = dispatcher();
        dispatcher.register_hotkeys(3);

        let events = [
            (Modifiers::ALT, Code::Digit3, HotKeyState::Pressed),
            (Modifiers::ALT, Code::Digit3, HotKeyState::Released),
            (Modifiers::ALT, Code::Digit4, HotKeyState::Pressed),
            (Modifiers::empty(), Code::Digit3, HotKeyState::Pressed),
            (Modifiers::ALT, Code::Digit1, HotKeyState::Pressed),
        ];
        let mut pressed = Vec::new();
        for (modifiers, code, state) in events {
            dispatcher.dispatch(id_of(modifiers, code), state, |i| pressed.push(i));
        }
        assert_eq!(pressed, vec![3, 1]);
    }

    #[test]
    fn test_drop_releases_bindings() {
        let (mut dispatcher, backend) = dispatcher();
        dispatcher.register_hotkeys(6);
        drop(dispatcher);
        assert!(backend.registered.borrow().is_empty());
        assert_eq!(*backend.unregister_calls.borrow(), 6);
    }
}
