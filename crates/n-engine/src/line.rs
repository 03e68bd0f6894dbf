//! Styled lines, the text content of a row.
//!
//! A [`Line`] is a vector of [`Cell`]s, one per character, each carrying its
//! own [`Style`] flags. Lines are stored and serialized in a compact form: the
//! plain text plus one mask string per style, where `.` marks a styled cell
//! and a space marks an unstyled one.
//!
//! ```text
//! text:  "hello world"
//! bold:  "..... "        (trailing unstyled cells may be omitted)
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-character formatting.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Style: u8 {
        const BOLD          = 0b0001;
        const ITALIC        = 0b0010;
        const UNDERLINE     = 0b0100;
        const STRIKETHROUGH = 0b1000;
    }
}

impl Style {
    /// Every style with its serialized name, in canonical order.
    pub const NAMED: [(Self, &'static str); 4] = [
        (Self::BOLD, "bold"),
        (Self::ITALIC, "italic"),
        (Self::UNDERLINE, "underline"),
        (Self::STRIKETHROUGH, "strikethrough"),
    ];
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// One character of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "CellRecord", into = "CellRecord")]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Cell {
    /// An unstyled cell.
    #[must_use]
    pub const fn plain(ch: char) -> Self {
        Self {
            ch,
            style: Style::empty(),
        }
    }

    #[must_use]
    pub const fn styled(ch: char, style: Style) -> Self {
        Self { ch, style }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Wire form of a cell inside register contents.
#[derive(Serialize, Deserialize)]
struct CellRecord {
    char: char,
    #[serde(default, skip_serializing_if = "is_false")]
    bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    strikethrough: bool,
}

impl From<CellRecord> for Cell {
    fn from(r: CellRecord) -> Self {
        let mut style = Style::empty();
        style.set(Style::BOLD, r.bold);
        style.set(Style::ITALIC, r.italic);
        style.set(Style::UNDERLINE, r.underline);
        style.set(Style::STRIKETHROUGH, r.strikethrough);
        Self { ch: r.char, style }
    }
}

impl From<Cell> for CellRecord {
    fn from(c: Cell) -> Self {
        Self {
            char: c.ch,
            bold: c.style.contains(Style::BOLD),
            italic: c.style.contains(Style::ITALIC),
            underline: c.style.contains(Style::UNDERLINE),
            strikethrough: c.style.contains(Style::STRIKETHROUGH),
        }
    }
}

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

/// A row's content.
pub type Line = Vec<Cell>;

/// Build an unstyled line from text.
#[must_use]
pub fn from_text(text: &str) -> Line {
    text.chars().map(Cell::plain).collect()
}

/// The plain text of a line.
#[must_use]
pub fn text(line: &[Cell]) -> String {
    line.iter().map(|c| c.ch).collect()
}

/// Set or clear `style` on every cell in `cells`.
pub fn apply_style(cells: &mut [Cell], style: Style, on: bool) {
    for cell in cells {
        cell.style.set(style, on);
    }
}

/// True if every cell has `style` (false for an empty slice).
#[must_use]
pub fn all_have(cells: &[Cell], style: Style) -> bool {
    !cells.is_empty() && cells.iter().all(|c| c.style.contains(style))
}

// ---------------------------------------------------------------------------
// Style masks
// ---------------------------------------------------------------------------

/// Per-style mask strings. `None` means no cell carries the style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleMasks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<String>,
}

impl StyleMasks {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bold.is_none()
            && self.italic.is_none()
            && self.underline.is_none()
            && self.strikethrough.is_none()
    }

    const fn get(&self, style: Style) -> Option<&String> {
        if style.contains(Style::BOLD) {
            self.bold.as_ref()
        } else if style.contains(Style::ITALIC) {
            self.italic.as_ref()
        } else if style.contains(Style::UNDERLINE) {
            self.underline.as_ref()
        } else {
            self.strikethrough.as_ref()
        }
    }

    fn set(&mut self, style: Style, mask: Option<String>) {
        if style.contains(Style::BOLD) {
            self.bold = mask;
        } else if style.contains(Style::ITALIC) {
            self.italic = mask;
        } else if style.contains(Style::UNDERLINE) {
            self.underline = mask;
        } else {
            self.strikethrough = mask;
        }
    }
}

/// Split a line into text plus style masks.
#[must_use]
pub fn to_masks(line: &[Cell]) -> (String, StyleMasks) {
    let mut masks = StyleMasks::default();
    for (style, _) in Style::NAMED {
        if line.iter().any(|c| c.style.contains(style)) {
            let mask: String = line
                .iter()
                .map(|c| if c.style.contains(style) { '.' } else { ' ' })
                .collect();
            masks.set(style, Some(mask.trim_end().to_string()));
        }
    }
    (text(line), masks)
}

/// Rebuild a line from text plus style masks. Masks shorter than the text
/// leave the remaining cells unstyled; extra mask characters are ignored.
#[must_use]
pub fn from_masks(text: &str, masks: &StyleMasks) -> Line {
    let mut line = from_text(text);
    for (style, _) in Style::NAMED {
        if let Some(mask) = masks.get(style) {
            for (cell, m) in line.iter_mut().zip(mask.chars()) {
                if m == '.' {
                    cell.style.insert(style);
                }
            }
        }
    }
    line
}

/// Storage record for a line under `<row>:line`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LineRecord {
    pub text: String,
    #[serde(flatten)]
    pub masks: StyleMasks,
}

impl LineRecord {
    pub fn from_line(line: &[Cell]) -> Self {
        let (text, masks) = to_masks(line);
        Self { text, masks }
    }

    pub fn into_line(self) -> Line {
        from_masks(&self.text, &self.masks)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn text_round_trip() {
        let line = from_text("héllo");
        assert_eq!(line.len(), 5);
        assert_eq!(text(&line), "héllo");
    }

    #[test]
    fn masks_mark_styled_cells() {
        let mut line = from_text("abcd");
        apply_style(&mut line[1..3], Style::BOLD, true);
        line[0].style.insert(Style::ITALIC);
        let (t, masks) = to_masks(&line);
        assert_eq!(t, "abcd");
        assert_eq!(masks.bold.as_deref(), Some(" .."));
        assert_eq!(masks.italic.as_deref(), Some("."));
        assert_eq!(masks.underline, None);
        assert_eq!(from_masks(&t, &masks), line);
    }

    #[test]
    fn unstyled_line_has_no_masks() {
        let (_, masks) = to_masks(&from_text("plain"));
        assert!(masks.is_empty());
    }

    #[test]
    fn short_and_long_masks() {
        let masks = StyleMasks {
            underline: Some(".       extra".into()),
            ..StyleMasks::default()
        };
        let line = from_masks("ab", &masks);
        assert_eq!(line[0].style, Style::UNDERLINE);
        assert_eq!(line[1].style, Style::empty());
    }

    #[test]
    fn all_have_style() {
        let mut line = from_text("xy");
        assert!(!all_have(&line, Style::BOLD));
        apply_style(&mut line, Style::BOLD, true);
        assert!(all_have(&line, Style::BOLD));
        assert!(!all_have(&[], Style::BOLD));
    }

    #[test]
    fn cell_wire_form() {
        let cell = Cell::styled('q', Style::BOLD | Style::STRIKETHROUGH);
        let json = serde_json::to_value(cell).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"char": "q", "bold": true, "strikethrough": true})
        );
        let back: Cell = serde_json::from_value(json).unwrap();
        assert_eq!(back, cell);
    }

    #[test]
    fn line_record_flattens_masks() {
        let mut line = from_text("hi");
        line[1].style = Style::ITALIC;
        let json = serde_json::to_value(LineRecord::from_line(&line)).unwrap();
        assert_eq!(json, serde_json::json!({"text": "hi", "italic": " ."}));
    }
}
