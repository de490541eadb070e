//! Global hotkeys that paste stored text snippets.
//!
//! Snippets live in a JSON file and each carries a shortcut index. The first
//! nine indices are bound to modifier+1 through modifier+9; pressing one puts
//! the snippet on the clipboard and, a moment later, pastes it into the
//! focused application.

// Re-export commonly used types
pub use global_hotkey::hotkey::{Code, Modifiers};

pub mod activator;
pub mod command;
pub mod coordinator;
pub mod dispatcher;
mod error;
pub mod key;
pub mod runner;
pub mod snippet;
pub mod storage;
pub mod store;

pub use activator::{
    Activation, ClipboardWriter, EnigoKeystroke, PasteActivator, PasteKeystroke, PasteQueue,
    SystemClipboard,
};
pub use command::{Command, Response};
pub use coordinator::Coordinator;
pub use dispatcher::{Dispatcher, HotkeyBackend};
pub use error::{Error, Result};
pub use key::Chord;
pub use runner::{Runner, RunnerConfig};
pub use snippet::Snippet;
pub use storage::{JsonFile, MemoryFile, SnippetFile};
pub use store::SnippetStore;
