//! Modes and their metadata.
//!
//! The session is always in exactly one [`Mode`]. What a mode *does* is
//! described by a static [`ModeMetadata`] record instead of ad hoc checks
//! scattered through the dispatcher:
//!
//! | Mode | Insert-like | Enter | Exit | Key transforms |
//! |------|-------------|-------|------|----------------|
//! | NORMAL | no | | | count digits |
//! | INSERT | yes | pick up style | step left | shift+enter, printable chars |
//! | VISUAL | no | set anchor | clear anchor | count digits |
//! | VISUAL_LINE | no | set anchor | clear anchor | count digits |
//! | SEARCH | yes | clear input | clear input | printable chars |
//! | SETTINGS | yes | clear input | clear input | printable chars |
//!
//! Key transforms run in order before binding lookup. Each one either
//! passes the key on (possibly rewritten) or consumes it.

use std::fmt;

use n_keys::{KeyCode, KeyEvent, Modifiers};

use crate::cursor::max_col;
use crate::error::Result;
use crate::line::Cell;
use crate::mutation::Mutation;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// The current input mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Visual,
    VisualLine,
    Search,
    Settings,
}

impl Mode {
    pub const ALL: [Self; 6] = [
        Self::Normal,
        Self::Insert,
        Self::Visual,
        Self::VisualLine,
        Self::Search,
        Self::Settings,
    ];

    /// Name used in hotkey settings and the status line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Insert => "INSERT",
            Self::Visual => "VISUAL",
            Self::VisualLine => "VISUAL_LINE",
            Self::Search => "SEARCH",
            Self::Settings => "SETTINGS",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Raw character keys insert text instead of being commands.
    #[inline]
    #[must_use]
    pub fn is_insert_like(self) -> bool {
        self.metadata().insert_like
    }

    /// The cursor may rest one past the last character.
    #[inline]
    #[must_use]
    pub const fn cursor_past_end(self) -> bool {
        matches!(self, Self::Insert)
    }

    #[inline]
    #[must_use]
    pub const fn is_visual(self) -> bool {
        matches!(self, Self::Visual | Self::VisualLine)
    }

    /// This mode's hooks and transforms.
    #[must_use]
    pub fn metadata(self) -> &'static ModeMetadata {
        match self {
            Self::Normal => &NORMAL,
            Self::Insert => &INSERT,
            Self::Visual => &VISUAL,
            Self::VisualLine => &VISUAL_LINE,
            Self::Search => &SEARCH,
            Self::Settings => &SETTINGS,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// A hook run on mode change or after every key.
pub type Hook = fn(&mut Session) -> Result<()>;

/// A key transform: `Some(key)` passes the key on, `None` consumes it.
pub type KeyTransform = fn(&mut Session, KeyEvent) -> Result<Option<KeyEvent>>;

/// What a mode does besides its key bindings.
pub struct ModeMetadata {
    pub mode: Mode,
    pub insert_like: bool,
    pub enter: Option<Hook>,
    pub exit: Option<Hook>,
    /// Runs after every key handled in this mode.
    pub every: Option<Hook>,
    pub key_transforms: &'static [KeyTransform],
}

impl fmt::Debug for ModeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeMetadata")
            .field("mode", &self.mode)
            .field("insert_like", &self.insert_like)
            .field("transforms", &self.key_transforms.len())
            .finish_non_exhaustive()
    }
}

static NORMAL: ModeMetadata = ModeMetadata {
    mode: Mode::Normal,
    insert_like: false,
    enter: None,
    exit: None,
    every: Some(clamp_to_line),
    key_transforms: &[count_digits],
};

static INSERT: ModeMetadata = ModeMetadata {
    mode: Mode::Insert,
    insert_like: true,
    enter: Some(pick_up_style),
    exit: Some(step_left),
    every: None,
    key_transforms: &[literal_newline, insert_printable],
};

static VISUAL: ModeMetadata = ModeMetadata {
    mode: Mode::Visual,
    insert_like: false,
    enter: Some(set_anchor),
    exit: Some(clear_anchor),
    every: Some(clamp_to_line),
    key_transforms: &[count_digits],
};

static VISUAL_LINE: ModeMetadata = ModeMetadata {
    mode: Mode::VisualLine,
    insert_like: false,
    enter: Some(set_anchor),
    exit: Some(clear_anchor),
    every: Some(clamp_to_line),
    key_transforms: &[count_digits],
};

static SEARCH: ModeMetadata = ModeMetadata {
    mode: Mode::Search,
    insert_like: true,
    enter: Some(clear_input),
    exit: Some(clear_input),
    every: None,
    key_transforms: &[type_into_input],
};

static SETTINGS: ModeMetadata = ModeMetadata {
    mode: Mode::Settings,
    insert_like: true,
    enter: Some(clear_input),
    exit: Some(clear_input),
    every: None,
    key_transforms: &[type_into_input],
};

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

fn clamp_to_line(session: &mut Session) -> Result<()> {
    let len = session.doc.line_len(session.cursor.row())?;
    session.cursor.clamp(len, false);
    Ok(())
}

fn pick_up_style(session: &mut Session) -> Result<()> {
    let line = session.doc.get_line(session.cursor.row())?;
    session.cursor.refresh_style(&line);
    Ok(())
}

fn step_left(session: &mut Session) -> Result<()> {
    let len = session.doc.line_len(session.cursor.row())?;
    let col = session.cursor.col.saturating_sub(1).min(max_col(len, false));
    session.cursor.set_col(col);
    Ok(())
}

fn set_anchor(session: &mut Session) -> Result<()> {
    session.anchor = Some(session.cursor.clone());
    Ok(())
}

fn clear_anchor(session: &mut Session) -> Result<()> {
    session.anchor = None;
    Ok(())
}

fn clear_input(session: &mut Session) -> Result<()> {
    session.input.clear();
    Ok(())
}

// ---------------------------------------------------------------------------
// Key transforms
// ---------------------------------------------------------------------------

/// Fold digits into the repeat count. `0` with no count pending is the
/// line-start motion, and a digit typed where a character argument is
/// expected (`f 3`, `r 0`) is that argument.
#[allow(clippy::unnecessary_wraps)]
fn count_digits(session: &mut Session, key: KeyEvent) -> Result<Option<KeyEvent>> {
    if session.keys.awaiting_char() {
        return Ok(Some(key));
    }
    match key.digit() {
        Some(0) if !session.keys.has_digits() => Ok(Some(key)),
        Some(d) => {
            session.keys.push_digit(d);
            Ok(None)
        }
        None => Ok(Some(key)),
    }
}

/// `shift+enter` types a newline cell instead of splitting the row.
fn literal_newline(session: &mut Session, key: KeyEvent) -> Result<Option<KeyEvent>> {
    if key.code == KeyCode::Enter && key.modifiers == Modifiers::SHIFT {
        session.type_char('\n')?;
        return Ok(None);
    }
    Ok(Some(key))
}

fn insert_printable(session: &mut Session, key: KeyEvent) -> Result<Option<KeyEvent>> {
    match key.printable() {
        Some(ch) => {
            session.type_char(ch)?;
            Ok(None)
        }
        None => Ok(Some(key)),
    }
}

#[allow(clippy::unnecessary_wraps)]
fn type_into_input(session: &mut Session, key: KeyEvent) -> Result<Option<KeyEvent>> {
    match key.printable() {
        Some(ch) => {
            session.input.push(ch);
            Ok(None)
        }
        None => Ok(Some(key)),
    }
}

impl Session {
    /// Insert one character at the cursor with the cursor's style.
    pub(crate) fn type_char(&mut self, ch: char) -> Result<bool> {
        let row = self.cursor.row();
        let cell = Cell::styled(ch, self.cursor.style);
        if !self.apply(Mutation::add_chars(row, self.cursor.col, vec![cell]))? {
            return Ok(false);
        }
        self.cursor.set_col(self.cursor.col + 1);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(Mode::from_name(mode.name()), Some(mode));
            assert_eq!(mode.metadata().mode, mode);
        }
        assert_eq!(Mode::from_name("REPLACE"), None);
        assert_eq!(Mode::VisualLine.to_string(), "VISUAL_LINE");
    }

    #[test]
    fn insert_like_modes() {
        assert!(Mode::Insert.is_insert_like());
        assert!(Mode::Search.is_insert_like());
        assert!(Mode::Settings.is_insert_like());
        assert!(!Mode::Normal.is_insert_like());
        assert!(!Mode::VisualLine.is_insert_like());
        assert!(Mode::Insert.cursor_past_end());
        assert!(!Mode::Search.cursor_past_end());
    }
}
