//! Register: storage for yanked and deleted content.
//!
//! Every yank and delete replaces the register. What it holds decides how
//! paste behaves:
//!
//! - **Chars**: styled cells, pasted inline after (`p`) or at (`P`) the
//!   cursor.
//! - **Cloned rows**: existing row ids. Paste attaches the *same* rows at a
//!   new position, creating clones. Produced by `dd` (the rows stay in the
//!   store, detached) and by `yc`.
//! - **Serialized rows**: a deep copy. Paste always creates brand-new rows.
//!   Produced by `yy`/`Y` and by visual-line yank.
//!
//! The serialized form, `{"type": "CHARS", "saved": [...]}`, is stable and
//! is what tests assert against.

use serde::{Deserialize, Serialize};

use crate::Row;
use crate::line::{self, Cell};
use crate::serialize::SerializedRow;

/// Register payload, tagged by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "saved", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegisterContent {
    #[default]
    None,
    Chars(Vec<Cell>),
    ClonedRows(Vec<Row>),
    SerializedRows(Vec<SerializedRow>),
}

/// The single unnamed register of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Register {
    content: RegisterContent,
}

impl Register {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            content: RegisterContent::None,
        }
    }

    pub fn save_chars(&mut self, cells: Vec<Cell>) {
        self.content = RegisterContent::Chars(cells);
    }

    pub fn save_cloned_rows(&mut self, rows: Vec<Row>) {
        self.content = RegisterContent::ClonedRows(rows);
    }

    pub fn save_serialized_rows(&mut self, rows: Vec<SerializedRow>) {
        self.content = RegisterContent::SerializedRows(rows);
    }

    #[must_use]
    pub const fn content(&self) -> &RegisterContent {
        &self.content
    }

    /// True if paste would do nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.content {
            RegisterContent::None => true,
            RegisterContent::Chars(cells) => cells.is_empty(),
            RegisterContent::ClonedRows(rows) => rows.is_empty(),
            RegisterContent::SerializedRows(rows) => rows.is_empty(),
        }
    }

    /// Plain text of a chars register, for status messages.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match &self.content {
            RegisterContent::Chars(cells) => Some(line::text(cells)),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.content = RegisterContent::None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
