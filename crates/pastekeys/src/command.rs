//! Line-oriented edit commands for a running daemon.
//!
//! A presentation layer drives the daemon by writing one JSON object per
//! line to its stdin and reading one JSON response per line from stdout:
//!
//! ```json
//! {"type": "list"}
//! {"type": "add"}
//! {"type": "setText", "id": "5b0c…", "text": "Thanks!"}
//! {"type": "reassign", "id": "5b0c…", "shortcutIndex": 4}
//! {"type": "delete", "id": "5b0c…"}
//! {"type": "activate", "shortcutIndex": 2}
//! {"type": "reload"}
//! {"type": "quit"}
//! ```

use crate::Result;
use crate::activator::Activation;
use crate::coordinator::Coordinator;
use crate::dispatcher::HotkeyBackend;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Every snippet, sorted by shortcut index
    List,
    /// Append a placeholder snippet
    Add,
    Delete {
        id: Uuid,
    },
    SetText {
        id: Uuid,
        text: String,
    },
    Reassign {
        id: Uuid,
        #[serde(rename = "shortcutIndex")]
        shortcut_index: u32,
    },
    /// Re-read the snippet file
    Reload,
    /// Paste a snippet as if its hotkey were pressed
    Activate {
        #[serde(rename = "shortcutIndex")]
        shortcut_index: u32,
    },
    /// Stop the daemon
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// A reply to a [`Command`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Success {
        message: String,
        data: Option<serde_json::Value>,
    },
    Error {
        message: String,
    },
}

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Response::Success {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(message: impl Into<String>, data: serde_json::Value) -> Self {
        Response::Success {
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }

    pub fn to_line(&self) -> String {
        // Both variants hold only strings and JSON values.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!("{{\"Error\":{{\"message\":\"unencodable response: {e}\"}}}}")
        })
    }
}

impl<B: HotkeyBackend> Coordinator<B> {
    /// Carry out one command. `Quit` only acknowledges; stopping is up to
    /// the caller.
    pub fn apply(&mut self, command: Command) -> Response {
        let mutating = matches!(
            command,
            Command::Add
                | Command::Delete { .. }
                | Command::SetText { .. }
                | Command::Reassign { .. }
        );
        let response = match command {
            Command::List => {
                let snippets = self.snippets();
                Response::with_data(
                    format!("{} snippets", snippets.len()),
                    serde_json::json!(snippets),
                )
            }
            Command::Add => match self.add() {
                Ok(id) => {
                    let data = self.store().get(id).map(|s| serde_json::json!(s));
                    Response::Success {
                        message: format!("Added {id}"),
                        data,
                    }
                }
                Err(e) => Response::error(e.to_string()),
            },
            Command::Delete { id } => {
                if self.delete(id) {
                    Response::success(format!("Deleted {id}"))
                } else {
                    Response::error(format!("No snippet {id}"))
                }
            }
            Command::SetText { id, text } => {
                if self.update_text(id, text) {
                    Response::success(format!("Updated {id}"))
                } else {
                    Response::error(format!("No snippet {id}"))
                }
            }
            Command::Reassign { id, shortcut_index } => match self.reassign(id, shortcut_index) {
                Ok(true) => Response::success(format!("Moved {id} to {shortcut_index}")),
                Ok(false) => Response::error(format!("No snippet {id}")),
                Err(e) => Response::error(e.to_string()),
            },
            Command::Reload => match self.reload() {
                Ok(count) => Response::success(format!("Loaded {count} snippets")),
                Err(e) => Response::error(format!("Reload failed: {e}")),
            },
            Command::Activate { shortcut_index } => match self.activate(shortcut_index) {
                Activation::Scheduled { id } => Response::success(format!("Pasting {id}")),
                Activation::NoSnippet => {
                    Response::success(format!("No snippet at {shortcut_index}"))
                }
                Activation::ClipboardFailed(message) => Response::error(message),
                Activation::QueueClosed { .. } => Response::error("Paste queue closed"),
            },
            Command::Quit => Response::success("Shutting down"),
        };
        if mutating {
            response.with_status(self.store().last_error())
        } else {
            response
        }
    }
}

impl Response {
    /// Downgrade a success to an error when the last save failed, so the
    /// presentation layer can surface it.
    fn with_status(self, save_error: Option<&str>) -> Self {
        match (self, save_error) {
            (Response::Success { message, .. }, Some(err)) => {
                Response::error(format!("{message}, but saving failed: {err}"))
            }
            (response, _) => response,
        }
    }
}
