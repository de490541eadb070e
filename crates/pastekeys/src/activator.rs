//! Clipboard write plus delayed synthetic paste.
//!
//! The clipboard is written synchronously on the caller's thread. Each paste
//! is queued on a single tokio task that waits out the delay and then hands
//! it back to the thread that owns the keyboard, so other processes see the
//! new clipboard content before the focused application receives the paste.
//! Queued pastes come due in the order they were scheduled and are never
//! cancelled.

use crate::store::SnippetStore;
use crate::{Error, Result};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Delay between the clipboard write and the synthetic paste.
pub const DEFAULT_PASTE_DELAY: Duration = Duration::from_millis(50);

/// The shared system clipboard, as far as we need it.
pub trait ClipboardWriter {
    /// Replace the clipboard content with `text`.
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// Emits the platform paste chord into whichever window has focus.
///
/// Implementations may touch keyboard-layout APIs that macOS only allows on
/// the main thread, so this is called from the event loop, never from the
/// paste queue's worker.
pub trait PasteKeystroke {
    fn paste(&self) -> Result<()>;
}

/// The system clipboard through `arboard`.
///
/// The handle is opened on first use and kept, since on X11 the clipboard
/// content only lives as long as its owner.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardWriter for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        if self.inner.is_none() {
            self.inner = Some(arboard::Clipboard::new()?);
        }
        if let Some(clipboard) = self.inner.as_mut() {
            clipboard.set_text(text)?;
        }
        Ok(())
    }
}

/// Synthetic paste through `enigo`: Cmd+V on macOS, Ctrl+V elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnigoKeystroke;

impl EnigoKeystroke {
    #[cfg(target_os = "macos")]
    const MODIFIER: enigo::Key = enigo::Key::Meta;
    #[cfg(not(target_os = "macos"))]
    const MODIFIER: enigo::Key = enigo::Key::Control;
}

impl PasteKeystroke for EnigoKeystroke {
    fn paste(&self) -> Result<()> {
        use enigo::{Direction, Enigo, Key, Keyboard, Settings};

        let input = |e: enigo::InputError| Error::Input(e.to_string());
        let mut enigo =
            Enigo::new(&Settings::default()).map_err(|e| Error::Input(e.to_string()))?;

        // Chord down
        enigo.key(Self::MODIFIER, Direction::Press).map_err(input)?;
        enigo.key(Key::Unicode('v'), Direction::Press).map_err(input)?;
        // Chord up
        enigo.key(Key::Unicode('v'), Direction::Release).map_err(input)?;
        enigo.key(Self::MODIFIER, Direction::Release).map_err(input)?;

        debug!("Emitted paste chord");
        Ok(())
    }
}

/// Serial queue of pending pastes.
///
/// The worker only keeps time. When a paste comes due it calls `on_due`,
/// which forwards it to the thread that emits the keystroke.
#[derive(Debug, Clone)]
pub struct PasteQueue {
    tx: mpsc::UnboundedSender<Instant>,
}

impl PasteQueue {
    /// Start the queue's worker task on `handle`.
    pub fn spawn<F>(handle: &Handle, mut on_due: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Instant>();
        handle.spawn(async move {
            while let Some(due) = rx.recv().await {
                sleep_until(due).await;
                trace!("Paste due");
                on_due();
            }
            debug!("Paste queue closed");
        });
        Self { tx }
    }

    /// Queue one paste `delay` from now. Returns false if the worker is gone.
    pub fn schedule(&self, delay: Duration) -> bool {
        self.tx.send(Instant::now() + delay).is_ok()
    }
}

/// Outcome of [`PasteActivator::activate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// No snippet carries the requested index.
    NoSnippet,
    /// The clipboard holds the snippet text and a paste is queued.
    Scheduled { id: Uuid },
    /// The clipboard write failed; nothing was queued.
    ClipboardFailed(String),
    /// The clipboard was written but the paste queue has shut down.
    QueueClosed { id: Uuid },
}

/// Resolves shortcut indices to text and pastes it.
pub struct PasteActivator {
    clipboard: Box<dyn ClipboardWriter>,
    queue: PasteQueue,
    delay: Duration,
}

impl PasteActivator {
    pub fn new(clipboard: impl ClipboardWriter + 'static, queue: PasteQueue) -> Self {
        Self {
            clipboard: Box::new(clipboard),
            queue,
            delay: DEFAULT_PASTE_DELAY,
        }
    }

    /// Set the delay between the clipboard write and the paste
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Paste the snippet bound to `shortcut_index`.
    ///
    /// An index with no snippet is expected (stale or out-of-range presses)
    /// and does nothing.
    pub fn activate(&mut self, store: &SnippetStore, shortcut_index: u32) -> Activation {
        let Some(snippet) = store.find_by_index(shortcut_index) else {
            debug!("No snippet at shortcut {}", shortcut_index);
            return Activation::NoSnippet;
        };

        if let Err(e) = self.clipboard.write_text(&snippet.text) {
            warn!("Clipboard write for shortcut {} failed: {}", shortcut_index, e);
            return Activation::ClipboardFailed(e.to_string());
        }

        if !self.queue.schedule(self.delay) {
            warn!("Paste queue is closed, shortcut {} not pasted", shortcut_index);
            return Activation::QueueClosed { id: snippet.id };
        }

        info!("Pasting snippet at shortcut {}", shortcut_index);
        Activation::Scheduled { id: snippet.id }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::snippet::Snippet;
    use crate::storage::{MemoryFile, SnippetFile};
    use std::sync::{Arc, Mutex, mpsc as std_mpsc};
    use std::thread::{self, ThreadId};

    #[derive(Default, Clone)]
    pub(crate) struct FakeClipboard {
        pub writes: Arc<Mutex<Vec<String>>>,
        pub broken: bool,
    }

    impl ClipboardWriter for FakeClipboard {
        fn write_text(&mut self, text: &str) -> Result<()> {
            if self.broken {
                return Err(Error::Clipboard("no clipboard".to_string()));
            }
            self.writes.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    /// Records the (paused) clock time and thread of every paste.
    #[derive(Default, Clone)]
    pub(crate) struct FakeKeystroke {
        pub pastes: Arc<Mutex<Vec<Instant>>>,
        pub threads: Arc<Mutex<Vec<ThreadId>>>,
    }

    impl PasteKeystroke for FakeKeystroke {
        fn paste(&self) -> Result<()> {
            self.pastes.lock().unwrap().push(Instant::now());
            self.threads.lock().unwrap().push(thread::current().id());
            Ok(())
        }
    }

    /// A queue that pastes as soon as each entry comes due.
    pub(crate) fn pasting_queue(keystroke: FakeKeystroke) -> PasteQueue {
        PasteQueue::spawn(&Handle::current(), move || {
            keystroke.paste().unwrap();
        })
    }

    fn store() -> SnippetStore {
        let file = MemoryFile::new();
        file.write(&[Snippet::new(1, "Hello"), Snippet::new(3, "Bye")])
            .unwrap();
        let mut store = SnippetStore::new(file);
        store.load().unwrap();
        store
    }

    fn activator(clipboard: FakeClipboard, keystroke: FakeKeystroke) -> PasteActivator {
        PasteActivator::new(clipboard, pasting_queue(keystroke))
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_index_is_noop() {
        let clipboard = FakeClipboard::default();
        let keystroke = FakeKeystroke::default();
        let mut activator = activator(clipboard.clone(), keystroke.clone());
        let store = store();

        assert_eq!(activator.activate(&store, 2), Activation::NoSnippet);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(clipboard.writes.lock().unwrap().is_empty());
        assert!(keystroke.pastes.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paste_follows_clipboard_after_delay() {
        let clipboard = FakeClipboard::default();
        let keystroke = FakeKeystroke::default();
        let mut activator = activator(clipboard.clone(), keystroke.clone());
        let store = store();
        let start = Instant::now();

        let outcome = activator.activate(&store, 3);
        assert_eq!(
            outcome,
            Activation::Scheduled {
                id: store.find_by_index(3).unwrap().id
            }
        );
        // The clipboard is written before activate returns.
        assert_eq!(*clipboard.writes.lock().unwrap(), vec!["Bye".to_string()]);

        tokio::time::sleep(Duration::from_millis(49)).await;
        assert!(keystroke.pastes.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(10)).await;
        let pastes = keystroke.pastes.lock().unwrap().clone();
        assert_eq!(pastes.len(), 1);
        assert!(pastes[0] - start >= DEFAULT_PASTE_DELAY);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(keystroke.pastes.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_activations_both_paste() {
        let clipboard = FakeClipboard::default();
        let keystroke = FakeKeystroke::default();
        let mut activator = activator(clipboard.clone(), keystroke.clone());
        let store = store();

        activator.activate(&store, 1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        activator.activate(&store, 3);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(
            *clipboard.writes.lock().unwrap(),
            vec!["Hello".to_string(), "Bye".to_string()]
        );
        let pastes = keystroke.pastes.lock().unwrap().clone();
        assert_eq!(pastes.len(), 2);
        assert!(pastes[0] < pastes[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_delay() {
        let keystroke = FakeKeystroke::default();
        let mut activator = activator(FakeClipboard::default(), keystroke.clone())
            .with_delay(Duration::from_millis(300));
        let store = store();
        let start = Instant::now();

        activator.activate(&store, 1);
        tokio::time::sleep(Duration::from_millis(400)).await;
        let pastes = keystroke.pastes.lock().unwrap().clone();
        assert_eq!(pastes.len(), 1);
        assert!(pastes[0] - start >= Duration::from_millis(300));
        assert!(pastes[0] - start < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clipboard_failure_skips_paste() {
        let clipboard = FakeClipboard {
            broken: true,
            ..Default::default()
        };
        let keystroke = FakeKeystroke::default();
        let mut activator = activator(clipboard, keystroke.clone());
        let store = store();

        let outcome = activator.activate(&store, 1);
        assert!(matches!(outcome, Activation::ClipboardFailed(_)));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(keystroke.pastes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_due_pastes_are_emitted_by_the_receiving_thread() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .unwrap();
        let (due_tx, due_rx) = std_mpsc::channel();
        let queue = PasteQueue::spawn(runtime.handle(), move || {
            due_tx.send(thread::current().id()).unwrap();
        });
        let keystroke = FakeKeystroke::default();

        assert!(queue.schedule(Duration::from_millis(5)));
        assert!(queue.schedule(Duration::from_millis(5)));
        for _ in 0..2 {
            let worker = due_rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_ne!(worker, thread::current().id());
            keystroke.paste().unwrap();
        }

        let threads = keystroke.threads.lock().unwrap().clone();
        assert_eq!(threads, vec![thread::current().id(); 2]);
    }
}
