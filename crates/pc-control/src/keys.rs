//! Logical key names and key combinations
//!
//! `Key` is the closed set of keys the tool surface accepts. Wire names match the
//! names clients already send (`"control"`, `"left"`, `"numpad5"`, `"7"`, ...).
//! Translation to a physical key happens in the input backend through an
//! exhaustive match, so adding a variant here fails to compile until every
//! backend maps it.

use crate::errors::AutomationError;
use crate::types::Platform;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of keys in one shortcut
pub const MAX_COMBINATION_KEYS: usize = 5;

macro_rules! define_keys {
    ($($variant:ident => $name:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
        pub enum Key {
            $(
                #[serde(rename = $name)]
                $variant,
            )*
        }

        impl Key {
            pub const ALL: &'static [Key] = &[$(Key::$variant,)*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Key::$variant => $name,)*
                }
            }
        }

        impl FromStr for Key {
            type Err = AutomationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Key::$variant),)*
                    other => Err(AutomationError::InvalidKey(other.to_string())),
                }
            }
        }
    };
}

define_keys! {
    Backspace => "backspace",
    Tab => "tab",
    Enter => "enter",
    Shift => "shift",
    Control => "control",
    Alt => "alt",
    Pause => "pause",
    CapsLock => "capslock",
    Escape => "escape",
    Space => "space",
    PageUp => "pageup",
    PageDown => "pagedown",
    End => "end",
    Home => "home",
    LeftArrow => "left",
    UpArrow => "up",
    RightArrow => "right",
    DownArrow => "down",
    Insert => "insert",
    Delete => "delete",
    Num0 => "0",
    Num1 => "1",
    Num2 => "2",
    Num3 => "3",
    Num4 => "4",
    Num5 => "5",
    Num6 => "6",
    Num7 => "7",
    Num8 => "8",
    Num9 => "9",
    A => "a",
    B => "b",
    C => "c",
    D => "d",
    E => "e",
    F => "f",
    G => "g",
    H => "h",
    I => "i",
    J => "j",
    K => "k",
    L => "l",
    M => "m",
    N => "n",
    O => "o",
    P => "p",
    Q => "q",
    R => "r",
    S => "s",
    T => "t",
    U => "u",
    V => "v",
    W => "w",
    X => "x",
    Y => "y",
    Z => "z",
    F1 => "f1",
    F2 => "f2",
    F3 => "f3",
    F4 => "f4",
    F5 => "f5",
    F6 => "f6",
    F7 => "f7",
    F8 => "f8",
    F9 => "f9",
    F10 => "f10",
    F11 => "f11",
    F12 => "f12",
    Numpad0 => "numpad0",
    Numpad1 => "numpad1",
    Numpad2 => "numpad2",
    Numpad3 => "numpad3",
    Numpad4 => "numpad4",
    Numpad5 => "numpad5",
    Numpad6 => "numpad6",
    Numpad7 => "numpad7",
    Numpad8 => "numpad8",
    Numpad9 => "numpad9",
    NumpadMultiply => "numpadmultiply",
    NumpadAdd => "numpadadd",
    NumpadSubtract => "numpadsubtract",
    NumpadDecimal => "numpaddecimal",
    NumpadDivide => "numpaddivide",
    Command => "command",
    Windows => "windows",
    PrintScreen => "printscreen",
}

impl Key {
    /// The character this key types, for letter and digit keys.
    pub fn character(&self) -> Option<char> {
        let name = self.as_str();
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered keys pressed first-to-last and released last-to-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombination {
    keys: Vec<Key>,
}

impl KeyCombination {
    pub fn new(keys: Vec<Key>) -> Result<Self, AutomationError> {
        if keys.is_empty() || keys.len() > MAX_COMBINATION_KEYS {
            return Err(AutomationError::InvalidKey(format!(
                "a shortcut needs between 1 and {MAX_COMBINATION_KEYS} keys, got {}",
                keys.len()
            )));
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn press_order(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys.iter().copied()
    }

    pub fn release_order(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys.iter().rev().copied()
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.keys.iter().map(Key::as_str).collect();
        f.write_str(&names.join(" + "))
    }
}

fn platform_modifier(platform: Platform) -> Key {
    match platform {
        Platform::MacOs => Key::Command,
        Platform::Other => Key::Control,
    }
}

/// Cmd+C on macOS, Ctrl+C elsewhere.
pub fn copy_shortcut(platform: Platform) -> KeyCombination {
    KeyCombination {
        keys: vec![platform_modifier(platform), Key::C],
    }
}

/// Cmd+V on macOS, Ctrl+V elsewhere.
pub fn paste_shortcut(platform: Platform) -> KeyCombination {
    KeyCombination {
        keys: vec![platform_modifier(platform), Key::V],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_wire_names_are_unique_and_round_trip() {
        let mut seen = HashSet::new();
        for key in Key::ALL {
            assert!(seen.insert(key.as_str()), "duplicate name {}", key);
            assert_eq!(Key::from_str(key.as_str()).unwrap(), *key);
            let json = serde_json::to_string(key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
        assert_eq!(Key::ALL.len(), 86);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = Key::from_str("hyper").unwrap_err();
        assert!(matches!(err, AutomationError::InvalidKey(ref k) if k == "hyper"));
        assert!(serde_json::from_str::<Key>("\"CONTROL\"").is_err());
    }

    #[test]
    fn test_character_keys() {
        assert_eq!(Key::A.character(), Some('a'));
        assert_eq!(Key::Num7.character(), Some('7'));
        assert_eq!(Key::F1.character(), None);
        assert_eq!(Key::LeftArrow.character(), None);
    }

    #[test]
    fn test_combination_length_limits() {
        assert!(KeyCombination::new(vec![]).is_err());
        assert!(KeyCombination::new(vec![Key::A; 6]).is_err());
        assert!(KeyCombination::new(vec![Key::A; 5]).is_ok());
    }

    #[test]
    fn test_release_order_mirrors_press_order() {
        let combos = [
            vec![Key::Shift],
            vec![Key::Control, Key::C],
            vec![Key::Control, Key::Alt, Key::Delete],
            vec![Key::Control, Key::Shift, Key::Alt, Key::Windows, Key::F4],
        ];
        for keys in combos {
            let combo = KeyCombination::new(keys).unwrap();
            let mut presses: Vec<Key> = combo.press_order().collect();
            presses.reverse();
            let releases: Vec<Key> = combo.release_order().collect();
            assert_eq!(presses, releases);
        }
    }

    #[test]
    fn test_platform_shortcuts() {
        assert_eq!(copy_shortcut(Platform::MacOs).keys(), &[Key::Command, Key::C]);
        assert_eq!(copy_shortcut(Platform::Other).keys(), &[Key::Control, Key::C]);
        assert_eq!(paste_shortcut(Platform::Other).keys(), &[Key::Control, Key::V]);
        assert_eq!(
            paste_shortcut(Platform::MacOs).to_string(),
            "command + v".to_string()
        );
    }
}
