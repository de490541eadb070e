use crate::error::{Error, Result};
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use std::fmt;

/// Number-row keys eligible for binding, in the order they are assigned to
/// shortcut indices 1..9.
pub const PALETTE: [Code; 9] = [
    Code::Digit1,
    Code::Digit2,
    Code::Digit3,
    Code::Digit4,
    Code::Digit5,
    Code::Digit6,
    Code::Digit7,
    Code::Digit8,
    Code::Digit9,
];

const DIGITS: [Code; 10] = [
    Code::Digit0,
    Code::Digit1,
    Code::Digit2,
    Code::Digit3,
    Code::Digit4,
    Code::Digit5,
    Code::Digit6,
    Code::Digit7,
    Code::Digit8,
    Code::Digit9,
];

/// A modifier set and a key code: the unit a global hotkey is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chord {
    pub modifiers: Modifiers,
    pub code: Code,
}

impl Chord {
    pub fn new(modifiers: Modifiers, code: Code) -> Self {
        Chord { modifiers, code }
    }

    /// The chord that activates palette slot `slot` (0-based) under `modifiers`.
    pub fn for_slot(modifiers: Modifiers, slot: usize) -> Option<Self> {
        PALETTE.get(slot).map(|code| Chord::new(modifiers, *code))
    }

    pub fn to_hotkey(&self) -> HotKey {
        let mods = if self.modifiers.is_empty() {
            None
        } else {
            Some(self.modifiers)
        };
        HotKey::new(mods, self.code)
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = modifier_names(self.modifiers);
        parts.push(format_code(self.code));
        write!(f, "{}", parts.join("+"))
    }
}

/// Parse a '+'-separated modifier list such as "alt" or "ctrl+shift".
pub fn parse_modifiers(s: &str) -> Result<Modifiers> {
    let mut mods = Modifiers::empty();
    for part in s.split('+').map(str::trim) {
        match part.to_lowercase().as_str() {
            "ctrl" | "control" => mods |= Modifiers::CONTROL,
            "alt" | "option" => mods |= Modifiers::ALT,
            "shift" => mods |= Modifiers::SHIFT,
            "cmd" | "command" | "super" | "win" | "windows" | "meta" => mods |= Modifiers::SUPER,
            _ => return Err(Error::InvalidKey(format!("Unknown modifier: {part:?}"))),
        }
    }
    if mods.is_empty() {
        return Err(Error::InvalidKey("Empty modifier".to_string()));
    }
    Ok(mods)
}

fn modifier_names(mods: Modifiers) -> Vec<&'static str> {
    let mut parts = Vec::new();
    if mods.contains(Modifiers::CONTROL) {
        parts.push("ctrl");
    }
    if mods.contains(Modifiers::ALT) {
        parts.push("alt");
    }
    if mods.contains(Modifiers::SHIFT) {
        parts.push("shift");
    }
    if mods.contains(Modifiers::SUPER) {
        parts.push("cmd");
    }
    parts
}

fn format_code(code: Code) -> &'static str {
    const DIGIT_NAMES: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
    match DIGITS.iter().position(|c| *c == code) {
        Some(i) => DIGIT_NAMES[i],
        None => "unknown",
    }
}
