//! Word boundaries within one row.
//!
//! | Function | Keys | Lands on |
//! |----------|------|----------|
//! | [`next_start`] | `w` / `W` | first char of the next word |
//! | [`prev_start`] | `b` / `B` | first char of the current or previous word |
//! | [`next_end`] | `e` / `E` | last char of the current or next word |
//!
//! A **word** is a run of word characters (letters, digits, underscore) or a
//! run of other non-blank characters. A **WORD** is any run of non-blanks.
//! Every function returns `None` when the row holds no such target; the
//! caller decides whether that means "move to the next row" or "clamp".

/// Character class for word boundary detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharClass {
    Word,
    Punctuation,
    Blank,
}

/// Classify for `w`/`b`/`e`.
pub(crate) fn classify(ch: char) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Blank
    } else if ch.is_alphanumeric() || ch == '_' {
        CharClass::Word
    } else {
        CharClass::Punctuation
    }
}

/// Classify for `W`/`B`/`E`: only blank vs non-blank.
pub(crate) fn classify_big(ch: char) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Blank
    } else {
        CharClass::Word
    }
}

const fn classifier(big: bool) -> fn(char) -> CharClass {
    if big { classify_big } else { classify }
}

/// Start of the next word after `col`.
#[must_use]
pub fn next_start(chars: &[char], col: usize, big: bool) -> Option<usize> {
    let class = classifier(big);
    let len = chars.len();
    if col >= len {
        return None;
    }
    let mut i = col;
    let start = class(chars[i]);
    if start != CharClass::Blank {
        while i < len && class(chars[i]) == start {
            i += 1;
        }
    }
    while i < len && class(chars[i]) == CharClass::Blank {
        i += 1;
    }
    (i < len).then_some(i)
}

/// Start of the word containing `col`, or of the previous word if `col` is
/// already at a word start.
#[must_use]
pub fn prev_start(chars: &[char], col: usize, big: bool) -> Option<usize> {
    let class = classifier(big);
    let mut i = col.min(chars.len());
    while i > 0 && class(chars[i - 1]) == CharClass::Blank {
        i -= 1;
    }
    if i == 0 {
        return None;
    }
    let target = class(chars[i - 1]);
    while i > 0 && class(chars[i - 1]) == target {
        i -= 1;
    }
    Some(i)
}

/// End of the word containing `col`, or of the next word if `col` is
/// already at a word end.
#[must_use]
pub fn next_end(chars: &[char], col: usize, big: bool) -> Option<usize> {
    let class = classifier(big);
    let len = chars.len();
    let mut i = col + 1;
    while i < len && class(chars[i]) == CharClass::Blank {
        i += 1;
    }
    if i >= len {
        return None;
    }
    let target = class(chars[i]);
    while i + 1 < len && class(chars[i + 1]) == target {
        i += 1;
    }
    Some(i)
}

/// First non-blank column (0 for an all-blank row).
#[must_use]
pub fn first_non_blank(chars: &[char]) -> usize {
    chars.iter().position(|c| !c.is_whitespace()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
