//! The cursor: a position (path, column) inside the outline.
//!
//! The cursor points at one concrete position of a row, so moving onto a
//! clone keeps track of *which* occurrence the user is on. Columns are char
//! indices into the row's line.
//!
//! # Sticky column
//!
//! Moving vertically keeps the column the user last chose horizontally, the
//! way Vim's `curswant` does. The two end markers follow the line end instead
//! of a fixed index:
//!
//! | Marker | Meaning |
//! |--------|---------|
//! | [`StickyCol::Col`] | a concrete column |
//! | [`StickyCol::End`] | last character (`$` in normal mode, the `-1` marker) |
//! | [`StickyCol::PastEnd`] | one past the last character (insert mode, the `-2` marker) |
//!
//! # Style
//!
//! In insert-like modes the cursor carries the [`Style`] newly typed
//! characters receive. It is refreshed from the character to the left after
//! movement and toggled by the formatting keys.

use crate::Row;
use crate::line::{Cell, Style};
use crate::path::Path;

/// Remembered column for vertical movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickyCol {
    Col(usize),
    End,
    PastEnd,
}

impl StickyCol {
    /// Numeric form used when persisting positions: `-1` and `-2` for the
    /// end markers.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Col(c) => i64::try_from(c).unwrap_or(i64::MAX),
            Self::End => -1,
            Self::PastEnd => -2,
        }
    }

    #[must_use]
    pub fn from_i64(n: i64) -> Self {
        match n {
            -1 => Self::End,
            n if n < 0 => Self::PastEnd,
            n => Self::Col(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }
}

/// Largest valid column for a line of `len` cells.
#[inline]
#[must_use]
pub const fn max_col(len: usize, past_end: bool) -> usize {
    if past_end { len } else { len.saturating_sub(1) }
}

/// The editing cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub path: Path,
    pub col: usize,
    pub sticky: StickyCol,
    pub style: Style,
}

impl Cursor {
    #[must_use]
    pub const fn new(path: Path, col: usize) -> Self {
        Self {
            path,
            col,
            sticky: StickyCol::Col(col),
            style: Style::empty(),
        }
    }

    /// The row under the cursor.
    #[inline]
    #[must_use]
    pub fn row(&self) -> Row {
        self.path.row()
    }

    /// Move to `col` and remember it for vertical movement.
    pub const fn set_col(&mut self, col: usize) {
        self.col = col;
        self.sticky = StickyCol::Col(col);
    }

    /// Move to the line end and keep following it.
    pub const fn set_end(&mut self, len: usize, past_end: bool) {
        self.col = max_col(len, past_end);
        self.sticky = if past_end {
            StickyCol::PastEnd
        } else {
            StickyCol::End
        };
    }

    /// Move to another position, re-deriving the column from the sticky
    /// column against the new line length.
    pub fn set_path_sticky(&mut self, path: Path, len: usize, past_end: bool) {
        self.path = path;
        self.col = match self.sticky {
            StickyCol::Col(c) => c.min(max_col(len, past_end)),
            StickyCol::End | StickyCol::PastEnd => max_col(len, past_end),
        };
    }

    /// Move to another position at an explicit column.
    pub fn set_path(&mut self, path: Path, col: usize) {
        self.path = path;
        self.set_col(col);
    }

    /// Keep the column inside a line of `len` cells.
    pub fn clamp(&mut self, len: usize, past_end: bool) {
        self.col = self.col.min(max_col(len, past_end));
    }

    /// Pick up the style of the character left of the cursor.
    pub fn refresh_style(&mut self, line: &[Cell]) {
        self.style = self
            .col
            .checked_sub(1)
            .and_then(|i| line.get(i))
            .map_or(Style::empty(), |c| c.style);
    }

    /// Flip one style flag for subsequently typed characters.
    pub fn toggle_style(&mut self, style: Style) {
        self.style.toggle(style);
    }

    /// Rewrite row ids in the path.
    pub fn remap(&mut self, map: impl Fn(Row) -> Row) {
        self.path.remap(map);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line;

    fn at(col: usize) -> Cursor {
        Cursor::new(Path::from_rows([1]), col)
    }

    #[test]
    fn max_col_modes() {
        assert_eq!(max_col(5, false), 4);
        assert_eq!(max_col(5, true), 5);
        assert_eq!(max_col(0, false), 0);
    }

    #[test]
    fn sticky_column_follows_vertical_moves() {
        let mut c = at(8);
        c.set_path_sticky(Path::from_rows([2]), 3, false);
        assert_eq!(c.col, 2);
        c.set_path_sticky(Path::from_rows([3]), 20, false);
        assert_eq!(c.col, 8);
    }

    #[test]
    fn end_marker_tracks_line_end() {
        let mut c = at(0);
        c.set_end(4, false);
        assert_eq!(c.col, 3);
        assert_eq!(c.sticky, StickyCol::End);
        c.set_path_sticky(Path::from_rows([2]), 10, false);
        assert_eq!(c.col, 9);
        c.set_end(4, true);
        c.set_path_sticky(Path::from_rows([3]), 6, true);
        assert_eq!(c.col, 6);
    }

    #[test]
    fn sticky_numeric_markers() {
        assert_eq!(StickyCol::End.as_i64(), -1);
        assert_eq!(StickyCol::PastEnd.as_i64(), -2);
        assert_eq!(StickyCol::from_i64(-2), StickyCol::PastEnd);
        assert_eq!(StickyCol::from_i64(3), StickyCol::Col(3));
    }

    #[test]
    fn style_from_left_neighbor() {
        let mut l = line::from_text("ab");
        l[0].style = Style::BOLD;
        let mut c = at(1);
        c.refresh_style(&l);
        assert_eq!(c.style, Style::BOLD);
        c.set_col(0);
        c.refresh_style(&l);
        assert_eq!(c.style, Style::empty());
        c.toggle_style(Style::ITALIC);
        assert_eq!(c.style, Style::ITALIC);
    }

    #[test]
    fn clamp_col() {
        let mut c = at(9);
        c.clamp(3, false);
        assert_eq!(c.col, 2);
    }
}
