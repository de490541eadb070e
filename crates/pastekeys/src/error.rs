use thiserror::Error;

/// The main error type for pastekeys operations
#[derive(Error, Debug)]
pub enum Error {
    /// Error parsing or validating a key chord
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Every shortcut index above the current maximum is taken
    #[error("No shortcut index left after {0}")]
    IndexExhausted(u32),

    /// Error registering or unregistering a global hotkey
    #[error("Hotkey error: {0}")]
    HotkeyOperation(String),

    /// The system clipboard refused a write
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// Synthetic keyboard input could not be delivered
    #[error("Input error: {0}")]
    Input(String),

    /// Settings or path resolution problems
    #[error("Config error: {0}")]
    Config(String),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<global_hotkey::Error> for Error {
    fn from(err: global_hotkey::Error) -> Self {
        Error::HotkeyOperation(err.to_string())
    }
}

impl From<arboard::Error> for Error {
    fn from(err: arboard::Error) -> Self {
        Error::Clipboard(err.to_string())
    }
}
