// SPDX-License-Identifier: MIT
//
// Key events and their string tokens.
//
// Token grammar:
//
//   token     = [modifier "+"]* base
//   modifier  = "ctrl" | "alt" | "shift" | "super" | "meta"
//   base      = single character | named key
//
// Named keys: enter, tab, backspace, esc, delete, insert, up, down, left,
// right, home, end, pageup, pagedown, space, f1..f35.
//
// Normalization: `shift` on an alphabetic character is folded into the
// character itself (`shift+a` == `A`). When printing, an uppercase letter
// that carries other modifiers prints its shift explicitly
// (`ctrl+shift+i`), so tokens round-trip through parse → display.
//
// The trailing `+` case is handled specially: `ctrl++` is Ctrl with the
// plus key, and a bare `+` is just the plus character.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use thiserror::Error;

// ─── Key Types ──────────────────────────────────────────────────────────────

/// Identity of a key.
///
/// Named keys have dedicated variants; printable characters use
/// [`Char`](KeyCode::Char). Function keys F1 to F35 use [`F`](KeyCode::F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A Unicode character.
    Char(char),
    // ── Named keys ──────────────────────────────────────────────
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    Insert,
    // ── Navigation ──────────────────────────────────────────────
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    // ── Function keys ───────────────────────────────────────────
    /// F1 through F35.
    F(u8),
}

bitflags! {
    /// Keyboard modifier flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
        const SUPER = 0b0000_1000;
        const META  = 0b0010_0000;
    }
}

/// Modifiers that turn a character key into a chord (never inserted as text).
const CHORD: Modifiers = Modifiers::CTRL
    .union(Modifiers::ALT)
    .union(Modifiers::SUPER)
    .union(Modifiers::META);

/// A keyboard event: key identity plus active modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Which key was pressed.
    pub code: KeyCode,
    /// Active modifier keys.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A key with the given modifiers, normalized (see module docs).
    #[must_use]
    pub fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        match code {
            KeyCode::Char(ch) if modifiers.contains(Modifiers::SHIFT) && ch.is_alphabetic() => {
                let upper = ch.to_uppercase().next().unwrap_or(ch);
                Self {
                    code: KeyCode::Char(upper),
                    modifiers: modifiers - Modifiers::SHIFT,
                }
            }
            _ => Self { code, modifiers },
        }
    }

    /// A key with no modifiers.
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// A bare character key.
    #[must_use]
    pub const fn char(ch: char) -> Self {
        Self::plain(KeyCode::Char(ch))
    }

    /// `ctrl+<ch>`.
    #[must_use]
    pub fn ctrl(ch: char) -> Self {
        Self::new(KeyCode::Char(ch), Modifiers::CTRL)
    }

    /// The character this key types, if it is a plain printable character.
    ///
    /// Chords (`ctrl+x`, `alt+x`) and control characters return `None`.
    #[must_use]
    pub fn printable(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch) if !self.modifiers.intersects(CHORD) && !ch.is_control() => {
                Some(ch)
            }
            _ => None,
        }
    }

    /// The decimal digit this key types, if it is a bare digit.
    #[must_use]
    pub fn digit(&self) -> Option<u32> {
        self.printable().and_then(|ch| ch.to_digit(10))
    }

    /// True for the Escape key with no modifiers.
    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.code == KeyCode::Escape && self.modifiers.is_empty()
    }
}

// ─── Parsing ────────────────────────────────────────────────────────────────

/// Error produced when a key token is malformed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("empty key token")]
    Empty,

    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),

    #[error("unknown key `{0}`")]
    UnknownKey(String),
}

fn parse_modifier(name: &str) -> Result<Modifiers, KeyParseError> {
    match name {
        "ctrl" | "control" => Ok(Modifiers::CTRL),
        "alt" | "option" => Ok(Modifiers::ALT),
        "shift" => Ok(Modifiers::SHIFT),
        "super" | "cmd" => Ok(Modifiers::SUPER),
        "meta" => Ok(Modifiers::META),
        other => Err(KeyParseError::UnknownModifier(other.to_string())),
    }
}

fn parse_base(name: &str) -> Result<KeyCode, KeyParseError> {
    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return Ok(KeyCode::Char(ch));
    }

    let code = match name {
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "esc" | "escape" => KeyCode::Escape,
        "delete" | "del" => KeyCode::Delete,
        "insert" => KeyCode::Insert,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "space" => KeyCode::Char(' '),
        _ => {
            let n = name
                .strip_prefix('f')
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| (1..=35).contains(n));
            match n {
                Some(n) => KeyCode::F(n),
                None => return Err(KeyParseError::UnknownKey(name.to_string())),
            }
        }
    };
    Ok(code)
}

impl FromStr for KeyEvent {
    type Err = KeyParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if token.is_empty() {
            return Err(KeyParseError::Empty);
        }
        if token.chars().count() == 1 {
            return Ok(Self::new(parse_base(token)?, Modifiers::empty()));
        }

        let (prefix, base) = if let Some(prefix) = token.strip_suffix("++") {
            (prefix, "+")
        } else {
            match token.rsplit_once('+') {
                Some((prefix, base)) => (prefix, base),
                None => ("", token),
            }
        };

        let mut modifiers = Modifiers::empty();
        if !prefix.is_empty() {
            for part in prefix.split('+') {
                modifiers |= parse_modifier(part)?;
            }
        }

        Ok(Self::new(parse_base(base)?, modifiers))
    }
}

/// Parse a whitespace-separated key script (`"d w esc ctrl+r"`).
///
/// # Errors
///
/// Returns the first token that fails to parse.
pub fn parse_keys(script: &str) -> Result<Vec<KeyEvent>, KeyParseError> {
    script.split_whitespace().map(str::parse).collect()
}

// ─── Display ────────────────────────────────────────────────────────────────

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(' ') => f.write_str("space"),
            Self::Char(ch) => write!(f, "{ch}"),
            Self::Enter => f.write_str("enter"),
            Self::Tab => f.write_str("tab"),
            Self::Backspace => f.write_str("backspace"),
            Self::Escape => f.write_str("esc"),
            Self::Delete => f.write_str("delete"),
            Self::Insert => f.write_str("insert"),
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
            Self::Home => f.write_str("home"),
            Self::End => f.write_str("end"),
            Self::PageUp => f.write_str("pageup"),
            Self::PageDown => f.write_str("pagedown"),
            Self::F(n) => write!(f, "f{n}"),
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        if m.contains(Modifiers::CTRL) {
            f.write_str("ctrl+")?;
        }
        if m.contains(Modifiers::ALT) {
            f.write_str("alt+")?;
        }

        // Folded shift is printed back out when the letter is part of a chord.
        let folded_shift = match self.code {
            KeyCode::Char(ch) => ch.is_uppercase() && !m.is_empty(),
            _ => false,
        };
        if m.contains(Modifiers::SHIFT) || folded_shift {
            f.write_str("shift+")?;
        }
        if m.contains(Modifiers::SUPER) {
            f.write_str("super+")?;
        }
        if m.contains(Modifiers::META) {
            f.write_str("meta+")?;
        }

        match self.code {
            KeyCode::Char(ch) if folded_shift => {
                for lower in ch.to_lowercase() {
                    write!(f, "{lower}")?;
                }
                Ok(())
            }
            code => write!(f, "{code}"),
        }
    }
}

// ─── Serde (as token strings) ───────────────────────────────────────────────

impl serde::Serialize for KeyEvent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for KeyEvent {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
