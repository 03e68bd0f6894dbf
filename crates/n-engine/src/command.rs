//! Named commands.
//!
//! A [`Command`] is what a key sequence resolves to once it stops being a
//! motion. The enum is the closed set of things the outliner can do; the
//! [`keymap`](crate::keymap) decides which keys reach which command in which
//! mode, and [`dispatch`](crate::dispatch) runs them against a session.
//!
//! The same command can mean slightly different things per mode: `delete`
//! is an operator waiting for a motion in NORMAL, and deletes the selection
//! in VISUAL.

/// Every bindable command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // Entering insert mode
    Insert,
    InsertAfter,
    InsertLineStart,
    InsertLineEnd,
    NewRowBelow,
    NewRowAbove,

    // Visual modes
    Visual,
    VisualLine,
    SwapAnchor,

    // Deleting and changing
    DeleteChar,
    DeleteCharBefore,
    Delete,
    DeleteRows,
    DeleteToEnd,
    Change,
    ChangeRow,
    ChangeToEnd,
    Substitute,
    ReplaceChar,
    SwapCase,
    JoinRows,

    // Registers
    Yank,
    YankRows,
    YankClone,
    PasteAfter,
    PasteBefore,

    // History, repeat and macros
    Undo,
    Redo,
    Repeat,
    RecordMacro,
    PlayMacro,

    // Structure
    Indent,
    Unindent,
    SwapDown,
    SwapUp,
    ToggleCollapse,

    // View
    ZoomIn,
    ZoomOut,
    ZoomCursor,
    ZoomRoot,
    JumpBack,
    JumpForward,

    // Formatting
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    ToggleStrikethrough,

    // Input lines
    Search,
    Settings,

    // Insert-like editing
    SplitRow,
    Backspace,
    DeleteForward,
    DeleteWordBack,

    Confirm,
    Exit,
}

impl Command {
    pub const ALL: [Self; 54] = [
        Self::Insert,
        Self::InsertAfter,
        Self::InsertLineStart,
        Self::InsertLineEnd,
        Self::NewRowBelow,
        Self::NewRowAbove,
        Self::Visual,
        Self::VisualLine,
        Self::SwapAnchor,
        Self::DeleteChar,
        Self::DeleteCharBefore,
        Self::Delete,
        Self::DeleteRows,
        Self::DeleteToEnd,
        Self::Change,
        Self::ChangeRow,
        Self::ChangeToEnd,
        Self::Substitute,
        Self::ReplaceChar,
        Self::SwapCase,
        Self::JoinRows,
        Self::Yank,
        Self::YankRows,
        Self::YankClone,
        Self::PasteAfter,
        Self::PasteBefore,
        Self::Undo,
        Self::Redo,
        Self::Repeat,
        Self::RecordMacro,
        Self::PlayMacro,
        Self::Indent,
        Self::Unindent,
        Self::SwapDown,
        Self::SwapUp,
        Self::ToggleCollapse,
        Self::ZoomIn,
        Self::ZoomOut,
        Self::ZoomCursor,
        Self::ZoomRoot,
        Self::JumpBack,
        Self::JumpForward,
        Self::ToggleBold,
        Self::ToggleItalic,
        Self::ToggleUnderline,
        Self::ToggleStrikethrough,
        Self::Search,
        Self::Settings,
        Self::SplitRow,
        Self::Backspace,
        Self::DeleteForward,
        Self::DeleteWordBack,
        Self::Confirm,
        Self::Exit,
    ];

    /// Name used in hotkey settings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::InsertAfter => "insert-after",
            Self::InsertLineStart => "insert-line-start",
            Self::InsertLineEnd => "insert-line-end",
            Self::NewRowBelow => "new-row-below",
            Self::NewRowAbove => "new-row-above",
            Self::Visual => "visual",
            Self::VisualLine => "visual-line",
            Self::SwapAnchor => "swap-anchor",
            Self::DeleteChar => "delete-char",
            Self::DeleteCharBefore => "delete-char-before",
            Self::Delete => "delete",
            Self::DeleteRows => "delete-rows",
            Self::DeleteToEnd => "delete-to-end",
            Self::Change => "change",
            Self::ChangeRow => "change-row",
            Self::ChangeToEnd => "change-to-end",
            Self::Substitute => "substitute",
            Self::ReplaceChar => "replace-char",
            Self::SwapCase => "swap-case",
            Self::JoinRows => "join-rows",
            Self::Yank => "yank",
            Self::YankRows => "yank-rows",
            Self::YankClone => "yank-clone",
            Self::PasteAfter => "paste-after",
            Self::PasteBefore => "paste-before",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Repeat => "repeat",
            Self::RecordMacro => "record-macro",
            Self::PlayMacro => "play-macro",
            Self::Indent => "indent",
            Self::Unindent => "unindent",
            Self::SwapDown => "swap-down",
            Self::SwapUp => "swap-up",
            Self::ToggleCollapse => "toggle-collapse",
            Self::ZoomIn => "zoom-in",
            Self::ZoomOut => "zoom-out",
            Self::ZoomCursor => "zoom-cursor",
            Self::ZoomRoot => "zoom-root",
            Self::JumpBack => "jump-back",
            Self::JumpForward => "jump-forward",
            Self::ToggleBold => "toggle-bold",
            Self::ToggleItalic => "toggle-italic",
            Self::ToggleUnderline => "toggle-underline",
            Self::ToggleStrikethrough => "toggle-strikethrough",
            Self::Search => "search",
            Self::Settings => "settings",
            Self::SplitRow => "split-row",
            Self::Backspace => "backspace",
            Self::DeleteForward => "delete-forward",
            Self::DeleteWordBack => "delete-word-back",
            Self::Confirm => "confirm",
            Self::Exit => "exit",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Human-readable description for help tables.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Insert => "Insert at character",
            Self::InsertAfter => "Insert after character",
            Self::InsertLineStart => "Insert at beginning of line",
            Self::InsertLineEnd => "Insert at end of line",
            Self::NewRowBelow => "Insert on new line after current line",
            Self::NewRowAbove => "Insert on new line before current line",
            Self::Visual => "Enter visual mode",
            Self::VisualLine => "Enter visual line mode",
            Self::SwapAnchor => "Swap cursor to other end of selection",
            Self::DeleteChar => "Delete character at the cursor",
            Self::DeleteCharBefore => "Delete character before the cursor",
            Self::Delete => "Delete (operator)",
            Self::DeleteRows => "Delete rows",
            Self::DeleteToEnd => "Delete to the end of the line",
            Self::Change => "Change (operator)",
            Self::ChangeRow => "Replace the whole line",
            Self::ChangeToEnd => "Change to the end of the line",
            Self::Substitute => "Delete character and enter insert mode",
            Self::ReplaceChar => "Replace character",
            Self::SwapCase => "Swap case",
            Self::JoinRows => "Join lines",
            Self::Yank => "Yank (operator)",
            Self::YankRows => "Yank rows",
            Self::YankClone => "Yank rows as clones",
            Self::PasteAfter => "Paste after cursor",
            Self::PasteBefore => "Paste before cursor",
            Self::Undo => "Undo",
            Self::Redo => "Redo",
            Self::Repeat => "Repeat last command",
            Self::RecordMacro => "Begin/stop recording a macro",
            Self::PlayMacro => "Play a macro",
            Self::Indent => "Indent row right",
            Self::Unindent => "Unindent row",
            Self::SwapDown => "Move row down",
            Self::SwapUp => "Move row up",
            Self::ToggleCollapse => "Toggle whether a block is collapsed",
            Self::ZoomIn => "Zoom in by one level",
            Self::ZoomOut => "Zoom out by one level",
            Self::ZoomCursor => "Zoom in onto cursor",
            Self::ZoomRoot => "Zoom out to home",
            Self::JumpBack => "Jump to previous location",
            Self::JumpForward => "Jump to next location",
            Self::ToggleBold => "Toggle bold",
            Self::ToggleItalic => "Toggle italic",
            Self::ToggleUnderline => "Toggle underline",
            Self::ToggleStrikethrough => "Toggle strikethrough",
            Self::Search => "Search",
            Self::Settings => "Edit settings",
            Self::SplitRow => "Split line",
            Self::Backspace => "Delete previous character",
            Self::DeleteForward => "Delete character under cursor",
            Self::DeleteWordBack => "Delete word before cursor",
            Self::Confirm => "Confirm input",
            Self::Exit => "Exit back to normal mode",
        }
    }

    /// Needs a character argument (`r x`, `q a`, `@ a`).
    #[must_use]
    pub const fn takes_char(self) -> bool {
        matches!(self, Self::ReplaceChar | Self::RecordMacro | Self::PlayMacro)
    }

    /// Waits for a motion in NORMAL mode.
    #[must_use]
    pub const fn is_operator(self) -> bool {
        matches!(self, Self::Delete | Self::Change | Self::Yank)
    }

    /// Recorded for `.` when run from NORMAL mode.
    #[must_use]
    pub const fn is_repeatable(self) -> bool {
        matches!(
            self,
            Self::Insert
                | Self::InsertAfter
                | Self::InsertLineStart
                | Self::InsertLineEnd
                | Self::NewRowBelow
                | Self::NewRowAbove
                | Self::DeleteChar
                | Self::DeleteCharBefore
                | Self::Delete
                | Self::DeleteRows
                | Self::DeleteToEnd
                | Self::Change
                | Self::ChangeRow
                | Self::ChangeToEnd
                | Self::Substitute
                | Self::ReplaceChar
                | Self::SwapCase
                | Self::JoinRows
                | Self::PasteAfter
                | Self::PasteBefore
                | Self::Indent
                | Self::Unindent
                | Self::SwapDown
                | Self::SwapUp
                | Self::ToggleCollapse
                | Self::ToggleBold
                | Self::ToggleItalic
                | Self::ToggleUnderline
                | Self::ToggleStrikethrough
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_and_round_trip() {
        let mut seen = HashSet::new();
        for cmd in Command::ALL {
            assert_eq!(Command::from_name(cmd.name()), Some(cmd));
            seen.insert(cmd.name());
        }
        assert_eq!(seen.len(), 54);
        assert_eq!(Command::from_name("fly"), None);
    }

    #[test]
    fn operators_and_args() {
        assert!(Command::Delete.is_operator());
        assert!(!Command::DeleteRows.is_operator());
        assert!(Command::ReplaceChar.takes_char());
        assert!(Command::PlayMacro.takes_char());
        assert!(!Command::Undo.is_repeatable());
        assert!(!Command::Repeat.is_repeatable());
        assert!(Command::PasteAfter.is_repeatable());
    }
}
