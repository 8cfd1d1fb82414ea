//! Key token translation
//!
//! Maps symbolic key names and numeric codes to virtual-key identifiers and
//! classifies which keys need the extended-key flag when injected.

use crate::AutomationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A virtual-key identifier (1..=254)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(pub u8);

impl KeyId {
    pub const BACK: KeyId = KeyId(0x08);
    pub const TAB: KeyId = KeyId(0x09);
    pub const RETURN: KeyId = KeyId(0x0D);
    pub const SHIFT: KeyId = KeyId(0x10);
    pub const CONTROL: KeyId = KeyId(0x11);
    pub const MENU: KeyId = KeyId(0x12);
    pub const PAUSE: KeyId = KeyId(0x13);
    pub const CAPITAL: KeyId = KeyId(0x14);
    pub const ESCAPE: KeyId = KeyId(0x1B);
    pub const SPACE: KeyId = KeyId(0x20);
    pub const PRIOR: KeyId = KeyId(0x21);
    pub const NEXT: KeyId = KeyId(0x22);
    pub const END: KeyId = KeyId(0x23);
    pub const HOME: KeyId = KeyId(0x24);
    pub const LEFT: KeyId = KeyId(0x25);
    pub const UP: KeyId = KeyId(0x26);
    pub const RIGHT: KeyId = KeyId(0x27);
    pub const DOWN: KeyId = KeyId(0x28);
    pub const SNAPSHOT: KeyId = KeyId(0x2C);
    pub const INSERT: KeyId = KeyId(0x2D);
    pub const DELETE: KeyId = KeyId(0x2E);
    pub const LWIN: KeyId = KeyId(0x5B);
    pub const RWIN: KeyId = KeyId(0x5C);
    pub const APPS: KeyId = KeyId(0x5D);
    pub const F1: KeyId = KeyId(0x70);
    pub const NUMLOCK: KeyId = KeyId(0x90);
    pub const SCROLL: KeyId = KeyId(0x91);
    pub const LSHIFT: KeyId = KeyId(0xA0);
    pub const RSHIFT: KeyId = KeyId(0xA1);
    pub const LCONTROL: KeyId = KeyId(0xA2);
    pub const RCONTROL: KeyId = KeyId(0xA3);
    pub const LMENU: KeyId = KeyId(0xA4);
    pub const RMENU: KeyId = KeyId(0xA5);

    pub fn code(self) -> u8 {
        self.0
    }

    /// Whether this key sits on the extended cluster and must carry the
    /// extended-key flag on both transitions.
    pub fn is_extended(self) -> bool {
        EXTENDED_KEYS.contains(&self)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

const EXTENDED_KEYS: &[KeyId] = &[
    KeyId::PRIOR,
    KeyId::NEXT,
    KeyId::END,
    KeyId::HOME,
    KeyId::LEFT,
    KeyId::UP,
    KeyId::RIGHT,
    KeyId::DOWN,
    KeyId::INSERT,
    KeyId::DELETE,
    KeyId::RCONTROL,
    KeyId::RMENU,
    KeyId::LWIN,
    KeyId::RWIN,
    KeyId::APPS,
];

const NAMED_KEYS: &[(&str, KeyId)] = &[
    // Modifiers
    ("ctrl", KeyId::CONTROL),
    ("control", KeyId::CONTROL),
    ("lctrl", KeyId::LCONTROL),
    ("leftctrl", KeyId::LCONTROL),
    ("rctrl", KeyId::RCONTROL),
    ("rightctrl", KeyId::RCONTROL),
    ("shift", KeyId::SHIFT),
    ("lshift", KeyId::LSHIFT),
    ("leftshift", KeyId::LSHIFT),
    ("rshift", KeyId::RSHIFT),
    ("rightshift", KeyId::RSHIFT),
    ("alt", KeyId::MENU),
    ("lalt", KeyId::LMENU),
    ("leftalt", KeyId::LMENU),
    ("ralt", KeyId::RMENU),
    ("rightalt", KeyId::RMENU),
    ("altgr", KeyId::RMENU),
    ("win", KeyId::LWIN),
    ("windows", KeyId::LWIN),
    ("meta", KeyId::LWIN),
    ("super", KeyId::LWIN),
    ("lwin", KeyId::LWIN),
    ("rwin", KeyId::RWIN),
    // Navigation
    ("home", KeyId::HOME),
    ("end", KeyId::END),
    ("pageup", KeyId::PRIOR),
    ("pgup", KeyId::PRIOR),
    ("pagedown", KeyId::NEXT),
    ("pgdn", KeyId::NEXT),
    ("pgdown", KeyId::NEXT),
    ("up", KeyId::UP),
    ("arrowup", KeyId::UP),
    ("down", KeyId::DOWN),
    ("arrowdown", KeyId::DOWN),
    ("left", KeyId::LEFT),
    ("arrowleft", KeyId::LEFT),
    ("right", KeyId::RIGHT),
    ("arrowright", KeyId::RIGHT),
    // Editing
    ("backspace", KeyId::BACK),
    ("back", KeyId::BACK),
    ("delete", KeyId::DELETE),
    ("del", KeyId::DELETE),
    ("insert", KeyId::INSERT),
    ("ins", KeyId::INSERT),
    // Common
    ("enter", KeyId::RETURN),
    ("return", KeyId::RETURN),
    ("tab", KeyId::TAB),
    ("escape", KeyId::ESCAPE),
    ("esc", KeyId::ESCAPE),
    ("space", KeyId::SPACE),
    ("spacebar", KeyId::SPACE),
    ("apps", KeyId::APPS),
    ("menu", KeyId::APPS),
    ("contextmenu", KeyId::APPS),
    ("capslock", KeyId::CAPITAL),
    ("numlock", KeyId::NUMLOCK),
    ("scrolllock", KeyId::SCROLL),
    ("printscreen", KeyId::SNAPSHOT),
    ("prtsc", KeyId::SNAPSHOT),
    ("pause", KeyId::PAUSE),
];

/// Parse a key token into a virtual-key id.
///
/// Resolution order, first match wins: hex code (`0x41`), decimal code
/// (`65`), a single alphanumeric character (letters upper-cased), `F1`-`F24`,
/// then the symbolic name table. Never falls back to a default key.
pub fn parse_key(token: &str) -> Result<KeyId, AutomationError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(AutomationError::InvalidKeyToken(
            "empty key token".to_string(),
        ));
    }

    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        let code = u32::from_str_radix(hex, 16).map_err(|_| {
            AutomationError::InvalidKeyToken(format!("'{trimmed}' is not a valid hex key code"))
        })?;
        return key_from_code(code, trimmed);
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        let code: u32 = trimmed.parse().map_err(|_| {
            AutomationError::InvalidKeyToken(format!("'{trimmed}' is not a valid key code"))
        })?;
        return key_from_code(code, trimmed);
    }

    let mut chars = trimmed.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() {
            return Ok(KeyId(c.to_ascii_uppercase() as u8));
        }
    }

    let lower = trimmed.to_lowercase();
    if let Some(num) = lower.strip_prefix('f') {
        if !num.is_empty() && num.chars().all(|c| c.is_ascii_digit()) {
            return match num.parse::<u8>() {
                Ok(n @ 1..=24) => Ok(KeyId(KeyId::F1.0 + n - 1)),
                _ => Err(AutomationError::InvalidKeyToken(format!(
                    "Invalid function key '{trimmed}'. Use F1-F24."
                ))),
            };
        }
    }

    NAMED_KEYS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, key)| *key)
        .ok_or_else(|| {
            AutomationError::InvalidKeyToken(format!(
                "Unknown key '{trimmed}'. Valid: hex/decimal codes, a single letter or digit, \
                 F1-F24, enter, tab, escape, space, backspace, delete, insert, home, end, \
                 pageup, pagedown, up/down/left/right, apps, or modifiers (ctrl, shift, alt, \
                 win and their l/r variants)."
            ))
        })
}

/// Parse a `+`-separated chord such as `ctrl+shift+p`.
/// Any bad token rejects the whole chord.
pub fn parse_chord(chord: &str) -> Result<Vec<KeyId>, AutomationError> {
    let tokens: Vec<&str> = chord.split('+').collect();
    parse_keys(&tokens)
}

/// Parse every token up front so that an unknown key aborts before any input.
pub fn parse_keys<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<KeyId>, AutomationError> {
    if tokens.is_empty() {
        return Err(AutomationError::InvalidKeyToken(
            "no keys given".to_string(),
        ));
    }
    tokens.iter().map(|t| parse_key(t.as_ref())).collect()
}

fn key_from_code(code: u32, token: &str) -> Result<KeyId, AutomationError> {
    match u8::try_from(code) {
        Ok(c @ 1..=254) => Ok(KeyId(c)),
        _ => Err(AutomationError::InvalidKeyToken(format!(
            "Key code '{token}' is out of range (1-254)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_codes() {
        assert_eq!(parse_key("0x41").unwrap(), KeyId(0x41));
        assert_eq!(parse_key("0X1b").unwrap(), KeyId::ESCAPE);
        assert_eq!(parse_key("65").unwrap(), KeyId(65));
        assert!(parse_key("0x100").is_err());
        assert!(parse_key("0").is_err());
        assert!(parse_key("0xZZ").is_err());
    }

    #[test]
    fn test_decimal_code_wins_over_single_digit() {
        assert_eq!(parse_key("5").unwrap(), KeyId(5));
    }

    #[test]
    fn test_parse_single_character() {
        assert_eq!(parse_key("a").unwrap(), KeyId(0x41));
        assert_eq!(parse_key("Z").unwrap(), KeyId(0x5A));
        assert!(parse_key("?").is_err());
    }

    #[test]
    fn test_parse_function_keys() {
        assert_eq!(parse_key("F5").unwrap(), KeyId(0x74));
        assert_eq!(parse_key("f1").unwrap(), KeyId(0x70));
        assert_eq!(parse_key("F24").unwrap(), KeyId(0x87));
        assert!(matches!(
            parse_key("F25"),
            Err(AutomationError::InvalidKeyToken(_))
        ));
    }

    #[test]
    fn test_parse_named_keys() {
        assert_eq!(parse_key("Esc").unwrap(), KeyId::ESCAPE);
        assert_eq!(parse_key("ENTER").unwrap(), KeyId::RETURN);
        assert_eq!(parse_key("rctrl").unwrap(), KeyId::RCONTROL);
        assert_eq!(parse_key("apps").unwrap(), KeyId::APPS);
        assert_eq!(parse_key(" pagedown ").unwrap(), KeyId::NEXT);
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        let err = parse_key("Foo").unwrap_err();
        assert!(matches!(err, AutomationError::InvalidKeyToken(_)));
        assert!(err.to_string().contains("Foo"));
    }

    #[test]
    fn test_extended_classification() {
        for key in [
            KeyId::HOME,
            KeyId::DELETE,
            KeyId::INSERT,
            KeyId::RCONTROL,
            KeyId::RMENU,
            KeyId::LWIN,
            KeyId::APPS,
            KeyId::UP,
        ] {
            assert!(key.is_extended(), "{key} should be extended");
        }
        for key in [KeyId::CONTROL, KeyId::LCONTROL, KeyId::RETURN, KeyId(0x41)] {
            assert!(!key.is_extended(), "{key} should not be extended");
        }
    }

    #[test]
    fn test_parse_chord_rejects_whole_chord() {
        assert_eq!(
            parse_chord("ctrl+shift+p").unwrap(),
            vec![KeyId::CONTROL, KeyId::SHIFT, KeyId(0x50)]
        );
        assert!(parse_chord("ctrl+bogus+p").is_err());
    }
}
