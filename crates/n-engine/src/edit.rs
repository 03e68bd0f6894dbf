//! Character-level editing within rows, plus the row splits and joins that
//! typing causes.

use tracing::debug;

use crate::error::Result;
use crate::line::{self, Cell, Line, Style};
use crate::mode::Mode;
use crate::mutation::Mutation;
use crate::path::Path;
use crate::serialize::{SerializedBlock, SerializedRow};
use crate::session::Session;
use crate::word;

/// Where `i`, `a`, `I` and `A` put the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertAt {
    Cursor,
    After,
    LineStart,
    LineEnd,
}

pub(crate) fn enter_insert(s: &mut Session, at: InsertAt) -> Result<bool> {
    let len = s.cursor_len()?;
    match at {
        InsertAt::Cursor => {}
        InsertAt::After => s.cursor.set_col((s.cursor.col + 1).min(len)),
        InsertAt::LineStart => s.cursor.set_col(0),
        InsertAt::LineEnd => s.cursor.set_end(len, true),
    }
    s.set_mode(Mode::Insert)?;
    Ok(true)
}

/// A row holding `cells`, in serialized form.
pub(crate) fn serialized_line(cells: &[Cell]) -> SerializedRow {
    let (text, styles) = line::to_masks(cells);
    if styles.is_empty() {
        SerializedRow::Text(text)
    } else {
        SerializedRow::Block(Box::new(SerializedBlock {
            text,
            styles,
            ..SerializedBlock::default()
        }))
    }
}

fn refresh_style(s: &mut Session) -> Result<()> {
    let line = s.doc.get_line(s.cursor.row())?;
    s.cursor.refresh_style(&line);
    Ok(())
}

// ---------------------------------------------------------------------------
// Deleting
// ---------------------------------------------------------------------------

/// Delete cells `start..end` of the cursor row into the register.
pub(crate) fn delete_cells(s: &mut Session, start: usize, end: usize) -> Result<bool> {
    let row = s.cursor.row();
    let line = s.doc.get_line(row)?;
    let end = end.min(line.len());
    if start >= end {
        return Ok(false);
    }
    let cells = line[start..end].to_vec();
    if !s.apply(Mutation::del_chars(row, start, end - start))? {
        return Ok(false);
    }
    s.register.save_chars(cells);
    Ok(true)
}

/// `x`
pub(crate) fn delete_chars(s: &mut Session, n: usize) -> Result<bool> {
    let col = s.cursor.col;
    delete_cells(s, col, col.saturating_add(n))
}

/// `X`
pub(crate) fn delete_chars_before(s: &mut Session, n: usize) -> Result<bool> {
    let col = s.cursor.col;
    let n = n.min(col);
    if n == 0 {
        return Ok(false);
    }
    if !delete_cells(s, col - n, col)? {
        return Ok(false);
    }
    s.cursor.set_col(col - n);
    Ok(true)
}

/// `D`, or `C` with `change`.
pub(crate) fn delete_to_end(s: &mut Session, change: bool) -> Result<bool> {
    let col = s.cursor.col;
    let len = s.cursor_len()?;
    let deleted = delete_cells(s, col, len)?;
    if change {
        s.cursor.set_col(col);
        s.set_mode(Mode::Insert)?;
        return Ok(true);
    }
    Ok(deleted)
}

/// `cc`, `S`
pub(crate) fn change_row(s: &mut Session) -> Result<bool> {
    let len = s.cursor_len()?;
    delete_cells(s, 0, len)?;
    s.cursor.set_col(0);
    s.set_mode(Mode::Insert)?;
    Ok(true)
}

/// `s`
pub(crate) fn substitute(s: &mut Session, n: usize) -> Result<bool> {
    let col = s.cursor.col;
    delete_cells(s, col, col.saturating_add(n))?;
    s.set_mode(Mode::Insert)?;
    Ok(true)
}

/// INSERT `delete`: no register, no count.
pub(crate) fn delete_forward(s: &mut Session) -> Result<bool> {
    let (row, col) = (s.cursor.row(), s.cursor.col);
    if col >= s.cursor_len()? {
        return Ok(false);
    }
    s.apply(Mutation::del_chars(row, col, 1))
}

/// INSERT `ctrl+w`
pub(crate) fn delete_word_back(s: &mut Session) -> Result<bool> {
    let (row, col) = (s.cursor.row(), s.cursor.col);
    let chars: Vec<char> = s.doc.get_line(row)?.iter().map(|c| c.ch).collect();
    let start = word::prev_start(&chars, col, false).unwrap_or(0);
    if start >= col {
        return Ok(false);
    }
    if !s.apply(Mutation::del_chars(row, start, col - start))? {
        return Ok(false);
    }
    s.cursor.set_col(start);
    refresh_style(s)?;
    Ok(true)
}

/// INSERT `backspace`. At the start of a row, joins the row onto the one
/// above.
pub(crate) fn backspace(s: &mut Session) -> Result<bool> {
    let col = s.cursor.col;
    if col > 0 {
        let row = s.cursor.row();
        if !s.apply(Mutation::del_chars(row, col - 1, 1))? {
            return Ok(false);
        }
        s.cursor.set_col(col - 1);
        refresh_style(s)?;
        return Ok(true);
    }

    let path = s.cursor.path.clone();
    let Some(prev) = s.doc.prev_visible(&path, &s.view_root)? else {
        return Ok(false);
    };
    let Some(join_col) = join(s, &prev, &path, false)? else {
        return Ok(false);
    };
    s.cursor.set_path(prev, join_col);
    refresh_style(s)?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Changing in place
// ---------------------------------------------------------------------------

/// `r`
pub(crate) fn replace_chars(s: &mut Session, arg: Option<char>, n: usize) -> Result<bool> {
    let Some(ch) = arg else {
        return Ok(false);
    };
    let (row, col) = (s.cursor.row(), s.cursor.col);
    let line = s.doc.get_line(row)?;
    if col.saturating_add(n) > line.len() {
        return Ok(false);
    }
    let cells: Line = line[col..col + n]
        .iter()
        .map(|c| Cell::styled(ch, c.style))
        .collect();
    if !s.apply(Mutation::change_chars(row, col, cells))? {
        return Ok(false);
    }
    s.cursor.set_col(col + n - 1);
    Ok(true)
}

fn swapped_case(cell: Cell) -> Cell {
    let swapped: String = if cell.ch.is_lowercase() {
        cell.ch.to_uppercase().collect()
    } else {
        cell.ch.to_lowercase().collect()
    };
    let mut chars = swapped.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Cell::styled(ch, cell.style),
        _ => cell,
    }
}

/// `~`
pub(crate) fn swap_case(s: &mut Session, n: usize) -> Result<bool> {
    let (row, col) = (s.cursor.row(), s.cursor.col);
    let line = s.doc.get_line(row)?;
    let end = col.saturating_add(n).min(line.len());
    if col >= end {
        return Ok(false);
    }
    let cells: Line = line[col..end].iter().copied().map(swapped_case).collect();
    if !s.apply(Mutation::change_chars(row, col, cells))? {
        return Ok(false);
    }
    s.cursor.set_col(end);
    Ok(true)
}

/// Toggle `style` on the cell under the cursor.
pub(crate) fn toggle_style_at_cursor(s: &mut Session, style: Style) -> Result<bool> {
    let (row, col) = (s.cursor.row(), s.cursor.col);
    let line = s.doc.get_line(row)?;
    let Some(&cell) = line.get(col) else {
        return Ok(false);
    };
    let mut cells = vec![cell];
    line::apply_style(&mut cells, style, !cell.style.contains(style));
    s.apply(Mutation::change_chars(row, col, cells))
}

// ---------------------------------------------------------------------------
// Splitting and joining rows
// ---------------------------------------------------------------------------

/// INSERT `enter`: the text after the cursor becomes a new row.
///
/// At column 0 of a non-empty row an empty row is inserted above instead,
/// so the row keeps its identity (and its clones and children).
pub(crate) fn split_row(s: &mut Session) -> Result<bool> {
    let path = s.cursor.path.clone();
    let Some(parent_path) = path.parent() else {
        return Ok(false);
    };
    let Some(index) = s.doc.index_in_parent(&path)? else {
        return Ok(false);
    };
    let (row, col) = (path.row(), s.cursor.col);
    let line = s.doc.get_line(row)?;

    if col == 0 && !line.is_empty() {
        let added = s.add_blocks(parent_path.row(), index, vec![SerializedRow::text("")])?;
        return Ok(added.is_some());
    }

    let tail = line[col.min(line.len())..].to_vec();
    if !tail.is_empty() && !s.apply(Mutation::del_chars(row, col, tail.len()))? {
        return Ok(false);
    }
    let (dest, dest_index) = if s.doc.has_children(row)? && !s.doc.collapsed(row)? {
        (path, 0)
    } else {
        (parent_path, index + 1)
    };
    let Some(added) = s.add_blocks(dest.row(), dest_index, vec![serialized_line(&tail)])? else {
        return Ok(false);
    };
    let Some(&new_row) = added.first() else {
        return Ok(false);
    };
    s.cursor.set_path(dest.child(new_row), 0);
    refresh_style(s)?;
    Ok(true)
}

/// `J`, `count - 1` times (at least once).
pub(crate) fn join_rows(s: &mut Session, n: usize) -> Result<bool> {
    let mut joined = false;
    for _ in 0..n.saturating_sub(1).max(1) {
        let path = s.cursor.path.clone();
        let Some(next) = s.doc.next_visible(&path, &s.view_root)? else {
            break;
        };
        let Some(col) = join(s, &path, &next, true)? else {
            break;
        };
        s.cursor.set_col(col);
        joined = true;
    }
    Ok(joined)
}

/// Append row `b` onto row `a`, adopt `b`'s children and detach `b`.
/// Returns the column where `b`'s text starts, or `None` (with nothing
/// changed) if the join is impossible.
///
/// With `separator`, leading blanks of `b` are dropped and one space is put
/// between the two texts, like vim's `J`.
fn join(s: &mut Session, a: &Path, b: &Path, separator: bool) -> Result<Option<usize>> {
    let (a_row, b_row) = (a.row(), b.row());
    if a_row == b_row || s.doc.is_clone(b_row)? {
        debug!(row = b_row, "row cannot be joined");
        return Ok(None);
    }
    let mark = s.history.pending_len();
    match join_steps(s, a, b, separator)? {
        Some(col) => Ok(Some(col)),
        None => {
            s.history.rewind_to(&mut s.doc, mark)?;
            Ok(None)
        }
    }
}

fn join_steps(s: &mut Session, a: &Path, b: &Path, separator: bool) -> Result<Option<usize>> {
    let (a_row, b_row) = (a.row(), b.row());
    let b_parent = b.parent_row();
    let a_line = s.doc.get_line(a_row)?;
    let b_line = s.doc.get_line(b_row)?;

    let mut cells: Line = Vec::new();
    let b_cells: Line = if separator {
        b_line.iter().copied().skip_while(|c| c.ch == ' ').collect()
    } else {
        b_line
    };
    let join_col = a_line.len();
    if separator && !b_cells.is_empty() && a_line.last().is_some_and(|c| c.ch != ' ') {
        cells.push(Cell::plain(' '));
    }
    cells.extend(b_cells);
    if !cells.is_empty() && !s.apply(Mutation::add_chars(a_row, join_col, cells))? {
        return Ok(None);
    }

    // Children of `b` take `b`'s place if `b` sat directly under `a`,
    // otherwise they go after `a`'s own children.
    let children = s.doc.child_rows(b_row)?;
    let dest_index = if b_parent == a_row {
        s.doc.index_in_parent(b)?.unwrap_or(0)
    } else {
        s.doc.child_rows(a_row)?.len()
    };
    for (i, child) in children.into_iter().enumerate() {
        if !s.move_block(child, b_row, a_row, dest_index + i)? {
            return Ok(None);
        }
    }

    let Some(b_index) = s.doc.child_rows(b_parent)?.iter().position(|&r| r == b_row) else {
        return Ok(None);
    };
    if s.detach_blocks(b_parent, b_index, 1)?.is_none() {
        return Ok(None);
    }
    Ok(Some(join_col))
}

// ---------------------------------------------------------------------------
// VISUAL
// ---------------------------------------------------------------------------

/// The selected cells `(start, end)`, end exclusive.
fn visual_span(s: &mut Session) -> Result<Option<(usize, usize)>> {
    let Some(anchor) = &s.anchor else {
        return Ok(None);
    };
    if anchor.path != s.cursor.path {
        return Ok(None);
    }
    let lo = anchor.col.min(s.cursor.col);
    let hi = anchor.col.max(s.cursor.col) + 1;
    let len = s.cursor_len()?;
    Ok((lo < hi.min(len)).then_some((lo, hi.min(len))))
}

pub(crate) fn visual_delete(s: &mut Session, change: bool) -> Result<bool> {
    let span = visual_span(s)?;
    let deleted = match span {
        Some((lo, hi)) => {
            let deleted = delete_cells(s, lo, hi)?;
            s.cursor.set_col(lo);
            deleted
        }
        None => false,
    };
    if change {
        s.set_mode(Mode::Insert)?;
        return Ok(true);
    }
    s.set_mode(Mode::Normal)?;
    Ok(deleted)
}

pub(crate) fn visual_yank(s: &mut Session) -> Result<bool> {
    let span = visual_span(s)?;
    if let Some((lo, hi)) = span {
        let line = s.doc.get_line(s.cursor.row())?;
        s.register.save_chars(line[lo..hi].to_vec());
        s.cursor.set_col(lo);
    }
    s.set_mode(Mode::Normal)?;
    Ok(span.is_some())
}

pub(crate) fn visual_swap_case(s: &mut Session) -> Result<bool> {
    let span = visual_span(s)?;
    let mut changed = false;
    if let Some((lo, hi)) = span {
        let row = s.cursor.row();
        let line = s.doc.get_line(row)?;
        let cells: Line = line[lo..hi].iter().copied().map(swapped_case).collect();
        changed = s.apply(Mutation::change_chars(row, lo, cells))?;
        s.cursor.set_col(lo);
    }
    s.set_mode(Mode::Normal)?;
    Ok(changed)
}

/// Turn `style` on across the selection, or off if every cell has it.
pub(crate) fn visual_toggle_style(s: &mut Session, style: Style) -> Result<bool> {
    let span = visual_span(s)?;
    let mut changed = false;
    if let Some((lo, hi)) = span {
        let row = s.cursor.row();
        let mut cells = s.doc.get_line(row)?[lo..hi].to_vec();
        let on = !line::all_have(&cells, style);
        line::apply_style(&mut cells, style, on);
        changed = s.apply(Mutation::change_chars(row, lo, cells))?;
    }
    s.set_mode(Mode::Normal)?;
    Ok(changed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::mode::Mode;
    use crate::testing::TestCase;
    use serde_json::json;

    #[test]
    fn insert_variants() {
        let mut t = TestCase::new(json!(["bc"]));
        t.send_keys("a x esc").expect(json!(["bxc"]));
        t.send_keys("I a esc").expect(json!(["abxc"]));
        t.send_keys("A d esc").expect(json!(["abxcd"])).expect_cursor("abxcd", 4);
    }

    #[test]
    fn insert_after_on_empty_row() {
        let mut t = TestCase::new(json!([""]));
        t.send_keys("a h i esc").expect(json!(["hi"]));
    }

    #[test]
    fn delete_chars_clamps_cursor() {
        let mut t = TestCase::new(json!(["abc"]));
        t.send_keys("$ x").expect(json!(["ab"])).expect_cursor("ab", 1);
        t.send_keys("5 x").expect(json!(["a"]));
        t.send_keys("x x").expect(json!([""]));
        assert_eq!(t.session.history().undo_count(), 3);
    }

    #[test]
    fn delete_before() {
        let mut t = TestCase::new(json!(["abcd"]));
        t.send_keys("X").expect(json!(["abcd"]));
        t.send_keys("$ 2 X").expect(json!(["ad"])).expect_cursor("ad", 1);
        t.expect_register("bc");
    }

    #[test]
    fn change_to_end_and_row() {
        let mut t = TestCase::new(json!(["hello world"]));
        t.send_keys("w C t h e r e esc").expect(json!(["hello there"]));
        t.send_keys("c c b y e esc").expect(json!(["bye"]));
        t.send_keys("S esc").expect(json!([""]));
    }

    #[test]
    fn substitute() {
        let mut t = TestCase::new(json!(["abcd"]));
        t.send_keys("2 s X esc").expect(json!(["Xcd"]));
    }

    #[test]
    fn replace_with_count() {
        let mut t = TestCase::new(json!(["abcd"]));
        t.send_keys("3 r z").expect(json!(["zzzd"])).expect_cursor("zzzd", 2);
        t.send_keys("5 r q").expect(json!(["zzzd"]));
    }

    #[test]
    fn swap_case_moves_right() {
        let mut t = TestCase::new(json!(["aBc"]));
        t.send_keys("~ ~").expect(json!(["Abc"])).expect_cursor("Abc", 2);
        t.send_keys("0 5 ~").expect(json!(["aBC"]));
    }

    #[test]
    fn swap_case_beyond_ascii() {
        let mut t = TestCase::new(json!(["éß ö"]));
        // `ß` uppercases to two letters and is left alone.
        t.send_keys("3 ~").expect(json!(["Éß ö"]));
        t.send_keys("~").expect(json!(["Éß Ö"])).expect_cursor("Éß Ö", 3);
    }

    #[test]
    fn typing_and_backspace() {
        let mut t = TestCase::new(json!(["ac"]));
        t.send_keys("l i b b backspace esc").expect(json!(["abc"]));
        assert_eq!(t.session.history().undo_count(), 1);
    }

    #[test]
    fn ctrl_w_deletes_word() {
        let mut t = TestCase::new(json!(["one two"]));
        t.send_keys("A ctrl+w esc").expect(json!(["one "]));
    }

    #[test]
    fn delete_forward_in_insert() {
        let mut t = TestCase::new(json!(["abc"]));
        t.send_keys("i delete delete esc").expect(json!(["c"]));
    }

    #[test]
    fn enter_splits_row() {
        let mut t = TestCase::new(json!(["hello world"]));
        t.send_keys("f w i enter esc").expect(json!(["hello ", "world"]));
        t.expect_cursor("world", 0);
    }

    #[test]
    fn enter_at_row_start_inserts_above() {
        let mut t = TestCase::new(json!([{"text": "a", "children": ["b"]}]));
        t.send_keys("i enter x esc")
            .expect(json!(["", {"text": "xa", "children": ["b"]}]));
    }

    #[test]
    fn enter_on_parent_makes_first_child() {
        let mut t = TestCase::new(json!([{"text": "ab", "children": ["c"]}]));
        t.send_keys("A enter d esc")
            .expect(json!([{"text": "ab", "children": ["d", "c"]}]));
    }

    #[test]
    fn enter_keeps_styles() {
        let mut t = TestCase::new(json!([{"text": "abcd", "bold": "  .."}]));
        t.send_keys("l l i enter esc")
            .expect(json!(["ab", {"text": "cd", "bold": ".."}]));
    }

    #[test]
    fn shift_enter_types_newline() {
        let mut t = TestCase::new(json!(["ab"]));
        t.send_keys("a shift+enter esc").expect(json!(["a\nb"]));
    }

    #[test]
    fn join_with_space_and_children() {
        let mut t = TestCase::new(json!([
            "one",
            {"text": "  two", "children": ["kid"]},
            "three"
        ]));
        t.send_keys("J")
            .expect(json!([{"text": "one two", "children": ["kid"]}, "three"]))
            .expect_cursor("one two", 3);
    }

    #[test]
    fn join_child_into_parent() {
        let mut t = TestCase::new(json!([{"text": "a", "children": [
            {"text": "b", "children": ["c"]},
            "d"
        ]}]));
        t.send_keys("J")
            .expect(json!([{"text": "a b", "children": ["c", "d"]}]));
    }

    #[test]
    fn join_count() {
        let mut t = TestCase::new(json!(["a", "b", "c", "d"]));
        t.send_keys("3 J").expect(json!(["a b c", "d"]));
        t.send_keys("u").expect(json!(["a", "b", "c", "d"]));
    }

    #[test]
    fn join_at_last_row_does_nothing() {
        let mut t = TestCase::new(json!(["a"]));
        t.send_keys("J").expect(json!(["a"]));
        assert!(!t.session.history().can_undo());
    }

    #[test]
    fn backspace_joins_rows() {
        let mut t = TestCase::new(json!(["ab", {"text": "cd", "children": ["e"]}]));
        t.send_keys("j i backspace x esc")
            .expect(json!([{"text": "abxcd", "children": ["e"]}]));
    }

    #[test]
    fn backspace_at_document_start_does_nothing() {
        let mut t = TestCase::new(json!(["ab"]));
        t.send_keys("i backspace esc").expect(json!(["ab"]));
        assert!(!t.session.history().can_undo());
    }

    #[test]
    fn toggle_bold_in_normal_and_insert() {
        let mut t = TestCase::new(json!(["ab"]));
        t.send_keys("ctrl+b").expect(json!([{"text": "ab", "bold": "."}]));
        t.send_keys("ctrl+b").expect(json!(["ab"]));
        t.send_keys("A ctrl+b c d esc")
            .expect(json!([{"text": "abcd", "bold": "  .."}]));
    }

    #[test]
    fn typing_after_styled_text_continues_style() {
        let mut t = TestCase::new(json!([{"text": "ab", "italic": " ."}]));
        t.send_keys("A c esc").expect(json!([{"text": "abc", "italic": " .."}]));
    }

    #[test]
    fn visual_delete_change_yank() {
        let mut t = TestCase::new(json!(["abcdef"]));
        t.send_keys("l v l l d").expect(json!(["aef"])).expect_register("bcd");
        t.expect_mode(Mode::Normal);
        t.send_keys("v l c X esc").expect(json!(["aX"]));
        t.send_keys("0 v $ y").expect_register("aX").expect_cursor("aX", 0);
    }

    #[test]
    fn visual_toggle_style() {
        let mut t = TestCase::new(json!(["abcd"]));
        t.send_keys("l v l ctrl+u").expect(json!([{"text": "abcd", "underline": " .."}]));
        t.send_keys("v l ctrl+u").expect(json!([{"text": "abcd", "underline": " ..."}]));
        t.send_keys("0 v $ ctrl+u").expect(json!([{"text": "abcd", "underline": "...."}]));
        t.send_keys("0 v $ ctrl+u").expect(json!(["abcd"]));
    }

    #[test]
    fn visual_swap_anchor_and_case() {
        let mut t = TestCase::new(json!(["abcd"]));
        t.send_keys("l v l o h ~").expect(json!(["ABCd"])).expect_cursor("ABCd", 0);
    }
}
