use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use pastekeys::{JsonFile, Modifiers, key};
use serde::{Deserialize, Serialize};

/// User settings, read from a RON file. Every field is optional:
///
/// ```ron
/// (
///     modifier: "ctrl+shift",
///     paste_delay_ms: 80,
///     data_file: Some("/home/me/snippets.json"),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Modifier chord held with the number keys
    pub modifier: String,
    pub paste_delay_ms: u64,
    /// Snippet file; the platform data directory when unset
    pub data_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            modifier: "alt".to_string(),
            paste_delay_ms: 50,
            data_file: None,
        }
    }
}

impl Settings {
    /// `<config dir>/pastekeys/settings.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pastekeys").join("settings.ron"))
    }

    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| anyhow!("Failed to parse settings: {e}"))
    }

    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                Self::from_ron(&text).with_context(|| format!("Invalid settings file {path:?}"))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read settings file {path:?}")),
        }
    }

    pub fn modifiers(&self) -> Result<Modifiers> {
        key::parse_modifiers(&self.modifier)
            .with_context(|| format!("Invalid modifier {:?}", self.modifier))
    }

    pub fn paste_delay(&self) -> Duration {
        Duration::from_millis(self.paste_delay_ms)
    }

    pub fn snippet_file(&self) -> Result<JsonFile> {
        match &self.data_file {
            Some(path) => Ok(JsonFile::new(path)),
            None => Ok(JsonFile::default_location()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings = Settings::from_ron("(paste_delay_ms: 120)").unwrap();
        assert_eq!(settings.paste_delay(), Duration::from_millis(120));
        assert_eq!(settings.modifier, "alt");
        assert_eq!(settings.modifiers().unwrap(), Modifiers::ALT);
        assert_eq!(settings.data_file, None);
    }

    #[test]
    fn test_full_settings() {
        let settings = Settings::from_ron(
            r#"(modifier: "ctrl+shift", paste_delay_ms: 0, data_file: Some("/tmp/s.json"))"#,
        )
        .unwrap();
        assert_eq!(
            settings.modifiers().unwrap(),
            Modifiers::CONTROL | Modifiers::SHIFT
        );
        assert_eq!(
            settings.snippet_file().unwrap().path(),
            Path::new("/tmp/s.json")
        );
    }

    #[test]
    fn test_bad_modifier() {
        let settings = Settings {
            modifier: "hyper".to_string(),
            ..Default::default()
        };
        assert!(settings.modifiers().is_err());
    }

    #[test]
    fn test_load_missing_and_broken() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.ron");
        assert_eq!(Settings::load(&path).unwrap(), Settings::default());

        std::fs::write(&path, "(modifier: ").unwrap();
        assert!(Settings::load(&path).is_err());

        std::fs::write(&path, r#"(modifier: "cmd")"#).unwrap();
        assert_eq!(Settings::load(&path).unwrap().modifiers().unwrap(), Modifiers::SUPER);
    }
}
