use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text given to snippets created with [`crate::SnippetStore::add`].
pub const PLACEHOLDER_TEXT: &str = "Yeni metin...";

/// Example snippets written the first time the store finds nothing on disk.
pub const DEFAULT_SNIPPETS: [&str; 5] = [
    "Selamlar, teklifimizi değerlendirdiniz mi?",
    "Merhaba, siparişiniz kargoya verilmiştir.",
    "Teşekkürler, iyi günler dileriz.",
    "Detaylı bilgi için bizimle iletişime geçebilirsiniz.",
    "Fiyat teklifimiz ektedir.",
];

/// A stored piece of text bound to a shortcut slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    /// Generated at creation, never reused.
    pub id: Uuid,
    /// 1-based hotkey slot. Not required to be contiguous across a collection.
    pub shortcut_index: u32,
    pub text: String,
}

impl Snippet {
    pub fn new(shortcut_index: u32, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            shortcut_index,
            text: text.into(),
        }
    }
}

/// The seed collection, indices 1..=5.
pub fn default_snippets() -> Vec<Snippet> {
    DEFAULT_SNIPPETS
        .iter()
        .zip(1..)
        .map(|(text, index)| Snippet::new(index, *text))
        .collect()
}
