//! Motions: where a movement key takes the cursor.
//!
//! A motion is resolved against the document without changing anything:
//! [`resolve`] returns the new cursor (or `None` when the motion cannot
//! move), and the caller either moves there or, under an operator (`d`,
//! `c`, `y`), turns the span into a character range with [`char_range`].
//!
//! Character motions stay inside the current row. Word motions cross into
//! the next or previous visible row when the row runs out of words, except
//! under an operator, where they clamp to the row end instead. Row motions
//! (`j`, `k`, `gg`, `G`, `gp`, `gc`) move between rows.

use crate::cursor::{Cursor, max_col};
use crate::document::Document;
use crate::error::Result;
use crate::path::Path;
use crate::word;

/// A cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    LineStart,
    FirstNonBlank,
    LineEnd,
    WordForward,
    WordBackward,
    WordEnd,
    BigWordForward,
    BigWordBackward,
    BigWordEnd,
    DocumentStart,
    DocumentEnd,
    FindForward,
    FindBackward,
    TillForward,
    TillBackward,
    RepeatFind,
    RepeatFindReverse,
    Parent,
    NextClone,
}

impl Motion {
    pub const ALL: [Self; 23] = [
        Self::Left,
        Self::Right,
        Self::Up,
        Self::Down,
        Self::LineStart,
        Self::FirstNonBlank,
        Self::LineEnd,
        Self::WordForward,
        Self::WordBackward,
        Self::WordEnd,
        Self::BigWordForward,
        Self::BigWordBackward,
        Self::BigWordEnd,
        Self::DocumentStart,
        Self::DocumentEnd,
        Self::FindForward,
        Self::FindBackward,
        Self::TillForward,
        Self::TillBackward,
        Self::RepeatFind,
        Self::RepeatFindReverse,
        Self::Parent,
        Self::NextClone,
    ];

    /// Name used in hotkey settings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
            Self::LineStart => "line-start",
            Self::FirstNonBlank => "first-non-blank",
            Self::LineEnd => "line-end",
            Self::WordForward => "word-forward",
            Self::WordBackward => "word-backward",
            Self::WordEnd => "word-end",
            Self::BigWordForward => "big-word-forward",
            Self::BigWordBackward => "big-word-backward",
            Self::BigWordEnd => "big-word-end",
            Self::DocumentStart => "document-start",
            Self::DocumentEnd => "document-end",
            Self::FindForward => "find-forward",
            Self::FindBackward => "find-backward",
            Self::TillForward => "till-forward",
            Self::TillBackward => "till-backward",
            Self::RepeatFind => "repeat-find",
            Self::RepeatFindReverse => "repeat-find-reverse",
            Self::Parent => "parent",
            Self::NextClone => "next-clone",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Human-readable description for help tables.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Left => "Move cursor left",
            Self::Right => "Move cursor right",
            Self::Up => "Move cursor up",
            Self::Down => "Move cursor down",
            Self::LineStart => "Move cursor to the beginning of the line",
            Self::FirstNonBlank => "Move cursor to the first non-blank character",
            Self::LineEnd => "Move cursor to the end of the line",
            Self::WordForward => "Move cursor to the beginning of the next word",
            Self::WordBackward => "Move cursor to the beginning of the previous word",
            Self::WordEnd => "Move cursor to the end of the word",
            Self::BigWordForward => "Move cursor to the beginning of the next WORD",
            Self::BigWordBackward => "Move cursor to the beginning of the previous WORD",
            Self::BigWordEnd => "Move cursor to the end of the WORD",
            Self::DocumentStart => "Go to the first visible row",
            Self::DocumentEnd => "Go to the last visible row",
            Self::FindForward => "Move to next occurrence of a character",
            Self::FindBackward => "Move to previous occurrence of a character",
            Self::TillForward => "Move to just before the next occurrence of a character",
            Self::TillBackward => "Move to just after the previous occurrence of a character",
            Self::RepeatFind => "Repeat the last character search",
            Self::RepeatFindReverse => "Repeat the last character search backwards",
            Self::Parent => "Go to the parent row",
            Self::NextClone => "Go to the next position of this cloned row",
        }
    }

    /// Needs a character argument (`f x`).
    #[must_use]
    pub const fn takes_char(self) -> bool {
        matches!(
            self,
            Self::FindForward | Self::FindBackward | Self::TillForward | Self::TillBackward
        )
    }

    /// Moves between rows rather than along one.
    #[must_use]
    pub const fn is_row_motion(self) -> bool {
        matches!(
            self,
            Self::Up | Self::Down | Self::DocumentStart | Self::DocumentEnd | Self::Parent | Self::NextClone
        )
    }

    /// Under an operator, the character at the target is included.
    #[must_use]
    pub const fn is_inclusive(self) -> bool {
        matches!(
            self,
            Self::LineEnd
                | Self::WordEnd
                | Self::BigWordEnd
                | Self::FindForward
                | Self::TillForward
                | Self::RepeatFind
                | Self::RepeatFindReverse
        )
    }

    /// The same search in the other direction (for `,`).
    const fn reversed(self) -> Self {
        match self {
            Self::FindForward => Self::FindBackward,
            Self::FindBackward => Self::FindForward,
            Self::TillForward => Self::TillBackward,
            Self::TillBackward => Self::TillForward,
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// What a motion is resolved against.
pub struct MotionEnv<'a> {
    pub doc: &'a mut Document,
    pub view_root: &'a Path,
    /// The cursor may rest one past the last character (insert-like modes).
    pub past_end: bool,
    /// Resolving the target of an operator.
    pub for_operator: bool,
    /// The last `f`/`F`/`t`/`T` search, for `;` and `,`.
    pub last_find: Option<(Motion, char)>,
}

/// Resolve `motion` from `cursor`, `count` times.
///
/// # Errors
///
/// Store failure.
pub fn resolve(
    env: &mut MotionEnv<'_>,
    cursor: &Cursor,
    motion: Motion,
    arg: Option<char>,
    count: usize,
) -> Result<Option<Cursor>> {
    let count = count.max(1);
    let mut out = cursor.clone();
    let chars: Vec<char> = env
        .doc
        .get_line(cursor.row())?
        .iter()
        .map(|c| c.ch)
        .collect();
    let len = chars.len();
    let max = max_col(len, env.past_end);

    match motion {
        Motion::Left => {
            if cursor.col == 0 {
                return Ok(None);
            }
            out.set_col(cursor.col.saturating_sub(count));
        }
        Motion::Right => {
            let limit = if env.for_operator { len } else { max };
            if cursor.col >= limit {
                return Ok(None);
            }
            out.set_col((cursor.col + count).min(limit));
        }
        Motion::LineStart => out.set_col(0),
        Motion::FirstNonBlank => out.set_col(word::first_non_blank(&chars)),
        Motion::LineEnd => out.set_end(len, env.past_end),
        Motion::Up | Motion::Down => {
            let mut path = cursor.path.clone();
            let mut moved = false;
            for _ in 0..count {
                let next = if motion == Motion::Down {
                    env.doc.next_visible(&path, env.view_root)?
                } else {
                    env.doc.prev_visible(&path, env.view_root)?
                };
                match next {
                    Some(p) => {
                        path = p;
                        moved = true;
                    }
                    None => break,
                }
            }
            if !moved {
                return Ok(None);
            }
            let len = env.doc.line_len(path.row())?;
            out.set_path_sticky(path, len, env.past_end);
        }
        Motion::WordForward | Motion::BigWordForward => {
            let big = motion == Motion::BigWordForward;
            for _ in 0..count {
                match word_forward(env, &out, big)? {
                    Some(next) => out = next,
                    None if out == *cursor => return Ok(None),
                    None => break,
                }
            }
        }
        Motion::WordBackward | Motion::BigWordBackward => {
            let big = motion == Motion::BigWordBackward;
            for _ in 0..count {
                match word_backward(env, &out, big)? {
                    Some(next) => out = next,
                    None if out == *cursor => return Ok(None),
                    None => break,
                }
            }
        }
        Motion::WordEnd | Motion::BigWordEnd => {
            let big = motion == Motion::BigWordEnd;
            for _ in 0..count {
                match word_end(env, &out, big)? {
                    Some(next) => out = next,
                    None if out == *cursor => return Ok(None),
                    None => break,
                }
            }
        }
        Motion::DocumentStart | Motion::DocumentEnd => {
            let target = if motion == Motion::DocumentStart {
                env.doc.first_visible(env.view_root)?
            } else {
                env.doc.last_visible(env.view_root)?
            };
            let Some(path) = target else {
                return Ok(None);
            };
            out.set_path(path, 0);
        }
        Motion::FindForward | Motion::FindBackward | Motion::TillForward | Motion::TillBackward => {
            let Some(ch) = arg else {
                return Ok(None);
            };
            let Some(col) = find_in_line(&chars, cursor.col, motion, ch, count, false) else {
                return Ok(None);
            };
            out.set_col(col);
        }
        Motion::RepeatFind | Motion::RepeatFindReverse => {
            let Some((last, ch)) = env.last_find else {
                return Ok(None);
            };
            let search = if motion == Motion::RepeatFind {
                last
            } else {
                last.reversed()
            };
            let Some(col) = find_in_line(&chars, cursor.col, search, ch, count, true) else {
                return Ok(None);
            };
            out.set_col(col);
        }
        Motion::Parent => {
            let Some(parent) = cursor.path.parent() else {
                return Ok(None);
            };
            if !parent.is_descendant_of(env.view_root) {
                return Ok(None);
            }
            out.set_path(parent, 0);
        }
        Motion::NextClone => {
            let paths = env.doc.all_paths(cursor.row())?;
            if paths.len() < 2 {
                return Ok(None);
            }
            let index = paths.iter().position(|p| *p == cursor.path).unwrap_or(0);
            let next = paths[(index + 1) % paths.len()].clone();
            out.set_path(next, 0);
        }
    }
    Ok(Some(out))
}

fn row_chars(doc: &mut Document, path: &Path) -> Result<Vec<char>> {
    Ok(doc.get_line(path.row())?.iter().map(|c| c.ch).collect())
}

fn word_forward(env: &mut MotionEnv<'_>, from: &Cursor, big: bool) -> Result<Option<Cursor>> {
    let chars = row_chars(env.doc, &from.path)?;
    if let Some(col) = word::next_start(&chars, from.col, big) {
        let mut c = from.clone();
        c.set_col(col);
        return Ok(Some(c));
    }
    if env.for_operator {
        if from.col >= chars.len() {
            return Ok(None);
        }
        let mut c = from.clone();
        c.set_col(chars.len());
        return Ok(Some(c));
    }
    let Some(next) = env.doc.next_visible(&from.path, env.view_root)? else {
        return Ok(None);
    };
    let chars = row_chars(env.doc, &next)?;
    let mut c = from.clone();
    c.set_path(next, word::first_non_blank(&chars));
    Ok(Some(c))
}

fn word_backward(env: &mut MotionEnv<'_>, from: &Cursor, big: bool) -> Result<Option<Cursor>> {
    let chars = row_chars(env.doc, &from.path)?;
    if let Some(col) = word::prev_start(&chars, from.col, big) {
        let mut c = from.clone();
        c.set_col(col);
        return Ok(Some(c));
    }
    if env.for_operator {
        if from.col == 0 {
            return Ok(None);
        }
        let mut c = from.clone();
        c.set_col(0);
        return Ok(Some(c));
    }
    let Some(prev) = env.doc.prev_visible(&from.path, env.view_root)? else {
        return Ok(None);
    };
    let chars = row_chars(env.doc, &prev)?;
    let col = word::prev_start(&chars, chars.len(), big).unwrap_or(0);
    let mut c = from.clone();
    c.set_path(prev, col);
    Ok(Some(c))
}

fn word_end(env: &mut MotionEnv<'_>, from: &Cursor, big: bool) -> Result<Option<Cursor>> {
    let chars = row_chars(env.doc, &from.path)?;
    if let Some(col) = word::next_end(&chars, from.col, big) {
        let mut c = from.clone();
        c.set_col(col);
        return Ok(Some(c));
    }
    if env.for_operator {
        return Ok(None);
    }
    let mut path = from.path.clone();
    while let Some(next) = env.doc.next_visible(&path, env.view_root)? {
        let chars = row_chars(env.doc, &next)?;
        let start = word::first_non_blank(&chars);
        if chars.get(start).is_some_and(|c| !c.is_whitespace()) {
            let col = if start + 1 < chars.len() {
                word::next_end(&chars, start, big)
                    .filter(|&e| same_token(&chars, start, e, big))
                    .unwrap_or(start)
            } else {
                start
            };
            let mut c = from.clone();
            c.set_path(next, col);
            return Ok(Some(c));
        }
        path = next;
    }
    Ok(None)
}

/// `start..=end` is one token (no class change in between).
fn same_token(chars: &[char], start: usize, end: usize, big: bool) -> bool {
    let class = if big { word::classify_big } else { word::classify };
    let first = class(chars[start]);
    chars[start..=end].iter().all(|&c| class(c) == first)
}

/// Column of the `count`th occurrence of `ch` for a find motion.
///
/// `repeat` is set for `;`/`,`: a till motion then skips an occurrence that
/// is directly adjacent, so repeating `t` makes progress.
fn find_in_line(
    chars: &[char],
    col: usize,
    motion: Motion,
    ch: char,
    count: usize,
    repeat: bool,
) -> Option<usize> {
    let forward = matches!(motion, Motion::FindForward | Motion::TillForward);
    let till = matches!(motion, Motion::TillForward | Motion::TillBackward);
    let skip = usize::from(till && repeat);
    let mut found = None;
    let mut remaining = count;
    if forward {
        for (i, &c) in chars.iter().enumerate().skip(col + 1 + skip) {
            if c == ch {
                remaining -= 1;
                if remaining == 0 {
                    found = Some(i);
                    break;
                }
            }
        }
        found.map(|i| if till { i - 1 } else { i })
    } else {
        let end = col.saturating_sub(skip);
        for i in (0..end).rev() {
            if chars[i] == ch {
                remaining -= 1;
                if remaining == 0 {
                    found = Some(i);
                    break;
                }
            }
        }
        found.map(|i| if till { i + 1 } else { i })
    }
}

/// The cells an operator covers when moving from `from` to `to` within one
/// row: `(start, end)` with `end` exclusive. `None` if the span is empty or
/// crosses rows.
#[must_use]
pub fn char_range(from: &Cursor, to: &Cursor, motion: Motion, len: usize) -> Option<(usize, usize)> {
    if from.path != to.path {
        return None;
    }
    let (lo, hi) = if to.col < from.col {
        (to.col, from.col)
    } else {
        (from.col, to.col)
    };
    let hi = if motion.is_inclusive() && to.col >= from.col {
        hi + 1
    } else {
        hi
    };
    let hi = hi.min(len);
    (lo < hi).then_some((lo, hi))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ROOT;
    use crate::serialize::SerializedRow;
    use n_store::MemoryStore;
    use serde_json::json;

    /// one(1) [uno(2)], two(3), three words here(4)
    fn doc() -> Document {
        let mut d = Document::open(Box::new(MemoryStore::new())).unwrap();
        let rows: Vec<SerializedRow> = serde_json::from_value(json!([
            {"text": "one", "children": ["uno"]},
            "two",
            "three words here"
        ]))
        .unwrap();
        d.load_rows(ROOT, 0, &rows).unwrap();
        d
    }

    fn run(d: &mut Document, cur: &Cursor, m: Motion, arg: Option<char>, count: usize) -> Option<Cursor> {
        let root = Path::root();
        let mut env = MotionEnv {
            doc: d,
            view_root: &root,
            past_end: false,
            for_operator: false,
            last_find: None,
        };
        resolve(&mut env, cur, m, arg, count).unwrap()
    }

    fn at(rows: &[u64], col: usize) -> Cursor {
        Cursor::new(Path::from_rows(rows.iter().copied()), col)
    }

    #[test]
    fn names_round_trip() {
        for m in Motion::ALL {
            assert_eq!(Motion::from_name(m.name()), Some(m));
        }
    }

    #[test]
    fn left_right_clamp() {
        let mut d = doc();
        let c = at(&[4], 0);
        assert_eq!(run(&mut d, &c, Motion::Left, None, 1), None);
        let r = run(&mut d, &c, Motion::Right, None, 100).unwrap();
        assert_eq!(r.col, 15);
        assert_eq!(run(&mut d, &r, Motion::Right, None, 1), None);
    }

    #[test]
    fn vertical_uses_visible_order_and_sticky_col() {
        let mut d = doc();
        let mut c = at(&[4], 10);
        c = run(&mut d, &c, Motion::Up, None, 1).unwrap();
        assert_eq!(c.path, Path::from_rows([3]));
        assert_eq!(c.col, 2);
        c = run(&mut d, &c, Motion::Up, None, 1).unwrap();
        assert_eq!(c.path, Path::from_rows([1, 2]));
        c = run(&mut d, &c, Motion::Down, None, 2).unwrap();
        assert_eq!(c.path, Path::from_rows([4]));
        assert_eq!(c.col, 10);
        assert_eq!(run(&mut d, &c, Motion::Down, None, 1), None);
    }

    #[test]
    fn word_motions_cross_rows() {
        let mut d = doc();
        let c = at(&[3], 0);
        let w = run(&mut d, &c, Motion::WordForward, None, 1).unwrap();
        assert_eq!((w.path.clone(), w.col), (Path::from_rows([4]), 0));
        let w = run(&mut d, &w, Motion::WordForward, None, 2).unwrap();
        assert_eq!(w.col, 12);
        let b = run(&mut d, &at(&[4], 0), Motion::WordBackward, None, 1).unwrap();
        assert_eq!((b.path, b.col), (Path::from_rows([3]), 0));
        let e = run(&mut d, &at(&[3], 2), Motion::WordEnd, None, 1).unwrap();
        assert_eq!((e.path, e.col), (Path::from_rows([4]), 4));
    }

    #[test]
    fn operator_word_clamps_to_row_end() {
        let mut d = doc();
        let root = Path::root();
        let mut env = MotionEnv {
            doc: &mut d,
            view_root: &root,
            past_end: false,
            for_operator: true,
            last_find: None,
        };
        let c = at(&[4], 12);
        let w = resolve(&mut env, &c, Motion::WordForward, None, 1).unwrap().unwrap();
        assert_eq!(w.path, c.path);
        assert_eq!(w.col, 16);
        assert_eq!(char_range(&c, &w, Motion::WordForward, 16), Some((12, 16)));
    }

    #[test]
    fn find_and_till() {
        let mut d = doc();
        let c = at(&[4], 0);
        assert_eq!(run(&mut d, &c, Motion::FindForward, Some('e'), 1).unwrap().col, 3);
        assert_eq!(run(&mut d, &c, Motion::FindForward, Some('e'), 2).unwrap().col, 4);
        assert_eq!(run(&mut d, &c, Motion::TillForward, Some('w'), 1).unwrap().col, 5);
        assert_eq!(run(&mut d, &c, Motion::FindForward, Some('z'), 1), None);
        let end = at(&[4], 15);
        assert_eq!(run(&mut d, &end, Motion::FindBackward, Some('h'), 1).unwrap().col, 12);
        assert_eq!(run(&mut d, &end, Motion::TillBackward, Some('h'), 1).unwrap().col, 13);
    }

    #[test]
    fn repeat_find_uses_last_search() {
        let mut d = doc();
        let root = Path::root();
        let mut env = MotionEnv {
            doc: &mut d,
            view_root: &root,
            past_end: false,
            for_operator: false,
            last_find: Some((Motion::FindForward, 'e')),
        };
        let c = at(&[4], 3);
        let next = resolve(&mut env, &c, Motion::RepeatFind, None, 1).unwrap().unwrap();
        assert_eq!(next.col, 4);
        let back = resolve(&mut env, &next, Motion::RepeatFindReverse, None, 1).unwrap().unwrap();
        assert_eq!(back.col, 3);
    }

    #[test]
    fn document_start_end_and_parent() {
        let mut d = doc();
        let c = at(&[1, 2], 1);
        assert_eq!(run(&mut d, &c, Motion::DocumentEnd, None, 1).unwrap().path, Path::from_rows([4]));
        assert_eq!(run(&mut d, &c, Motion::DocumentStart, None, 1).unwrap().path, Path::from_rows([1]));
        assert_eq!(run(&mut d, &c, Motion::Parent, None, 1).unwrap().path, Path::from_rows([1]));
        assert_eq!(run(&mut d, &at(&[1], 0), Motion::Parent, None, 1), None);
    }

    #[test]
    fn next_clone_cycles_positions() {
        let mut d = doc();
        d.clone_row(2, 3, 0).unwrap();
        let c = at(&[1, 2], 0);
        let n = run(&mut d, &c, Motion::NextClone, None, 1).unwrap();
        assert_eq!(n.path, Path::from_rows([3, 2]));
        let back = run(&mut d, &n, Motion::NextClone, None, 1).unwrap();
        assert_eq!(back.path, c.path);
        assert_eq!(run(&mut d, &at(&[4], 0), Motion::NextClone, None, 1), None);
    }

    #[test]
    fn char_range_inclusive_and_backward() {
        let a = at(&[4], 2);
        let mut b = a.clone();
        b.set_col(5);
        assert_eq!(char_range(&a, &b, Motion::WordForward, 16), Some((2, 5)));
        assert_eq!(char_range(&a, &b, Motion::WordEnd, 16), Some((2, 6)));
        assert_eq!(char_range(&b, &a, Motion::WordBackward, 16), Some((2, 5)));
        assert_eq!(char_range(&a, &a, Motion::WordForward, 16), None);
    }
}
