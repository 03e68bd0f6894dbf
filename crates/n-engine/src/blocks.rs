//! Commands that work on whole rows: creating, deleting, yanking, pasting
//! and moving them around the tree.

use tracing::debug;

use crate::error::Result;
use crate::mode::Mode;
use crate::mutation::Mutation;
use crate::path::Path;
use crate::register::RegisterContent;
use crate::serialize::SerializedRow;
use crate::session::Session;
use crate::Row;

/// The cursor's parent path and its index under it.
fn position(s: &mut Session) -> Result<Option<(Path, usize)>> {
    let Some(parent) = s.cursor.path.parent() else {
        return Ok(None);
    };
    Ok(s.doc.index_in_parent(&s.cursor.path)?.map(|i| (parent, i)))
}

/// Where a new row goes relative to `path`: first child if `path` is
/// expanded with children, otherwise the next sibling.
fn below(s: &mut Session, path: &Path) -> Result<Option<(Path, usize)>> {
    let row = path.row();
    if s.doc.has_children(row)? && !s.doc.collapsed(row)? {
        return Ok(Some((path.clone(), 0)));
    }
    let Some(parent) = path.parent() else {
        return Ok(None);
    };
    Ok(s.doc.index_in_parent(path)?.map(|i| (parent, i + 1)))
}

/// `o`, `O`
pub(crate) fn new_row(s: &mut Session, after: bool) -> Result<bool> {
    let path = s.cursor.path.clone();
    let target = if after {
        below(s, &path)?
    } else {
        position(s)?
    };
    let Some((parent, index)) = target else {
        return Ok(false);
    };
    let Some(added) = s.add_blocks(parent.row(), index, vec![SerializedRow::text("")])? else {
        return Ok(false);
    };
    let Some(&row) = added.first() else {
        return Ok(false);
    };
    s.cursor.set_path(parent.child(row), 0);
    s.set_mode(Mode::Insert)?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Delete and yank
// ---------------------------------------------------------------------------

/// `dd`
pub(crate) fn delete_rows(s: &mut Session, n: usize) -> Result<bool> {
    let Some((_, index)) = position(s)? else {
        return Ok(false);
    };
    delete_rows_at(s, index, n)
}

/// Detach `n` of the cursor's siblings from `start` into the register.
/// The rows stay alive, so pasting them back keeps their identity.
pub(crate) fn delete_rows_at(s: &mut Session, start: usize, n: usize) -> Result<bool> {
    let Some(parent) = s.cursor.path.parent() else {
        return Ok(false);
    };
    let siblings = s.doc.child_rows(parent.row())?.len();
    if start >= siblings || n == 0 {
        return Ok(false);
    }
    let n = n.min(siblings - start);
    let Some(rows) = s.detach_blocks(parent.row(), start, n)? else {
        return Ok(false);
    };
    debug!(count = rows.len(), "rows deleted");
    s.register.save_cloned_rows(rows);
    place_after_delete(s, &parent, start)?;
    Ok(true)
}

fn place_after_delete(s: &mut Session, parent: &Path, index: usize) -> Result<()> {
    let view_root = s.view_root.clone();
    if !s.doc.has_children(view_root.row())? {
        if let Some(added) = s.add_blocks(view_root.row(), 0, vec![SerializedRow::text("")])? {
            if let Some(&row) = added.first() {
                s.cursor.set_path(view_root.child(row), 0);
            }
        }
        return Ok(());
    }

    let mut target = s.doc.get_child(parent, index)?;
    if target.is_none() {
        if let Some(prev) = index.checked_sub(1) {
            target = s.doc.get_child(parent, prev)?;
        }
    }
    if target.is_none() && *parent != view_root {
        target = Some(parent.clone());
    }
    if target.is_none() {
        target = s.doc.first_visible(&view_root)?;
    }
    if let Some(path) = target {
        s.move_cursor(path, 0)?;
    }
    Ok(())
}

/// `yy`, or `yc` with `clone`.
pub(crate) fn yank_rows(s: &mut Session, n: usize, clone: bool) -> Result<bool> {
    let Some((_, index)) = position(s)? else {
        return Ok(false);
    };
    yank_rows_at(s, index, n, clone)
}

/// Yank `n` of the cursor's siblings from `start`. A plain yank copies the
/// subtrees; a clone yank remembers the rows themselves.
pub(crate) fn yank_rows_at(s: &mut Session, start: usize, n: usize, clone: bool) -> Result<bool> {
    let Some(parent) = s.cursor.path.parent() else {
        return Ok(false);
    };
    let siblings = s.doc.child_rows(parent.row())?;
    let end = start.saturating_add(n).min(siblings.len());
    if start >= end {
        return Ok(false);
    }
    let rows: Vec<Row> = siblings[start..end].to_vec();
    if clone {
        s.register.save_cloned_rows(rows);
    } else {
        let serialized = s.doc.serialize_rows(&rows)?;
        s.register.save_serialized_rows(serialized);
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Paste
// ---------------------------------------------------------------------------

/// `p`, `P`
pub(crate) fn paste(s: &mut Session, after: bool, n: usize) -> Result<bool> {
    match s.register.content().clone() {
        RegisterContent::None => Ok(false),
        RegisterContent::Chars(cells) => {
            if cells.is_empty() {
                return Ok(false);
            }
            let row = s.cursor.row();
            let len = s.cursor_len()?;
            let col = if after && len > 0 {
                s.cursor.col + 1
            } else {
                s.cursor.col
            }
            .min(len);
            let chars = cells.repeat(n);
            let total = chars.len();
            if !s.apply(Mutation::add_chars(row, col, chars))? {
                return Ok(false);
            }
            s.cursor.set_col(col + total - 1);
            Ok(true)
        }
        RegisterContent::ClonedRows(rows) => {
            let Some((parent, index)) = paste_position(s, after)? else {
                return Ok(false);
            };
            let Some(&first) = rows.first() else {
                return Ok(false);
            };
            if !s.apply(Mutation::attach_blocks(parent.row(), rows, index))? {
                s.status = Some("Cannot paste a row inside itself or next to its clone".into());
                return Ok(false);
            }
            s.move_cursor(parent.child(first), 0)?;
            Ok(true)
        }
        RegisterContent::SerializedRows(rows) => {
            let Some((parent, mut index)) = paste_position(s, after)? else {
                return Ok(false);
            };
            let mut first = None;
            for _ in 0..n {
                let Some(added) = s.add_blocks(parent.row(), index, rows.clone())? else {
                    return Ok(false);
                };
                index += added.len();
                first = first.or_else(|| added.first().copied());
            }
            let Some(first) = first else {
                return Ok(false);
            };
            s.move_cursor(parent.child(first), 0)?;
            Ok(true)
        }
    }
}

fn paste_position(s: &mut Session, after: bool) -> Result<Option<(Path, usize)>> {
    if after {
        let path = s.cursor.path.clone();
        below(s, &path)
    } else {
        position(s)
    }
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

/// `>`: the cursor row and `n - 1` following siblings become the last
/// children of the previous sibling.
pub(crate) fn indent(s: &mut Session, n: usize) -> Result<bool> {
    let Some((parent, index)) = position(s)? else {
        return Ok(false);
    };
    indent_rows(s, &parent, index, n)
}

/// `<`: the cursor row and `n - 1` following siblings move out to follow
/// their parent.
pub(crate) fn unindent(s: &mut Session, n: usize) -> Result<bool> {
    let Some((parent, index)) = position(s)? else {
        return Ok(false);
    };
    unindent_rows(s, &parent, index, n)
}

fn range(s: &mut Session, parent: &Path, start: usize, n: usize) -> Result<Vec<Row>> {
    let siblings = s.doc.child_rows(parent.row())?;
    let end = start.saturating_add(n).min(siblings.len());
    Ok(siblings.get(start..end).map(<[Row]>::to_vec).unwrap_or_default())
}

/// Re-point the cursor and anchor at `rows` that moved under `new_parent`.
fn follow(s: &mut Session, rows: &[Row], old_parent: &Path, new_parent: &Path) {
    for cursor in std::iter::once(&mut s.cursor).chain(s.anchor.as_mut()) {
        if cursor.path.parent().as_ref() == Some(old_parent) && rows.contains(&cursor.row()) {
            cursor.path = new_parent.child(cursor.row());
        }
    }
}

fn indent_rows(s: &mut Session, parent: &Path, start: usize, n: usize) -> Result<bool> {
    let Some(prev) = start.checked_sub(1) else {
        return Ok(false);
    };
    let rows = range(s, parent, start, n)?;
    let Some(&new_parent) = s.doc.child_rows(parent.row())?.get(prev) else {
        return Ok(false);
    };
    if rows.is_empty() {
        return Ok(false);
    }
    if s.doc.collapsed(new_parent)? && !s.apply(Mutation::set_collapsed(new_parent, false))? {
        return Ok(false);
    }
    let base = s.doc.child_rows(new_parent)?.len();
    for (i, &row) in rows.iter().enumerate() {
        if !s.move_block(row, parent.row(), new_parent, base + i)? {
            return Ok(false);
        }
    }
    follow(s, &rows, parent, &parent.child(new_parent));
    Ok(true)
}

fn unindent_rows(s: &mut Session, parent: &Path, start: usize, n: usize) -> Result<bool> {
    if *parent == s.view_root {
        return Ok(false);
    }
    let Some(grandparent) = parent.parent() else {
        return Ok(false);
    };
    let Some(parent_index) = s.doc.index_in_parent(parent)? else {
        return Ok(false);
    };
    let rows = range(s, parent, start, n)?;
    if rows.is_empty() {
        return Ok(false);
    }
    for (i, &row) in rows.iter().enumerate() {
        if !s.move_block(row, parent.row(), grandparent.row(), parent_index + 1 + i)? {
            return Ok(false);
        }
    }
    follow(s, &rows, parent, &grandparent);
    Ok(true)
}

/// `ctrl+j` (`down`) and `ctrl+k`: swap the cursor row with a sibling.
pub(crate) fn swap(s: &mut Session, down: bool) -> Result<bool> {
    let Some((parent, index)) = position(s)? else {
        return Ok(false);
    };
    let siblings = s.doc.child_rows(parent.row())?.len();
    let target = if down {
        index + 1
    } else {
        let Some(target) = index.checked_sub(1) else {
            return Ok(false);
        };
        target
    };
    if target >= siblings {
        return Ok(false);
    }
    let row = s.cursor.row();
    s.move_block(row, parent.row(), parent.row(), target)
}

/// `z`
pub(crate) fn toggle_collapse(s: &mut Session) -> Result<bool> {
    let row = s.cursor.row();
    if !s.doc.has_children(row)? {
        return Ok(false);
    }
    let collapsed = s.doc.collapsed(row)?;
    s.apply(Mutation::set_collapsed(row, !collapsed))
}

// ---------------------------------------------------------------------------
// VISUAL_LINE
// ---------------------------------------------------------------------------

/// Parent path, first index and length of the selected sibling range.
fn selection(s: &mut Session) -> Result<Option<(Path, usize, usize)>> {
    let Some(anchor) = s.anchor.clone() else {
        return Ok(None);
    };
    let Some(parent) = s.cursor.path.parent() else {
        return Ok(None);
    };
    if anchor.path.parent().as_ref() != Some(&parent) {
        return Ok(None);
    }
    let (Some(a), Some(c)) = (
        s.doc.index_in_parent(&anchor.path)?,
        s.doc.index_in_parent(&s.cursor.path)?,
    ) else {
        return Ok(None);
    };
    Ok(Some((parent, a.min(c), a.abs_diff(c) + 1)))
}

pub(crate) fn visual_line_delete(s: &mut Session) -> Result<bool> {
    let selected = selection(s)?;
    s.set_mode(Mode::Normal)?;
    let Some((_, start, n)) = selected else {
        return Ok(false);
    };
    delete_rows_at(s, start, n)
}

pub(crate) fn visual_line_yank(s: &mut Session, clone: bool) -> Result<bool> {
    let selected = selection(s)?;
    s.set_mode(Mode::Normal)?;
    let Some((parent, start, n)) = selected else {
        return Ok(false);
    };
    if !yank_rows_at(s, start, n, clone)? {
        return Ok(false);
    }
    if let Some(first) = s.doc.get_child(&parent, start)? {
        s.move_cursor(first, 0)?;
    }
    Ok(true)
}

pub(crate) fn visual_line_indent(s: &mut Session, indent: bool) -> Result<bool> {
    let Some((parent, start, n)) = selection(s)? else {
        s.set_mode(Mode::Normal)?;
        return Ok(false);
    };
    let moved = if indent {
        indent_rows(s, &parent, start, n)?
    } else {
        unindent_rows(s, &parent, start, n)?
    };
    s.set_mode(Mode::Normal)?;
    Ok(moved)
}

pub(crate) fn visual_line_collapse(s: &mut Session) -> Result<bool> {
    let selected = selection(s)?;
    s.set_mode(Mode::Normal)?;
    let Some((parent, start, n)) = selected else {
        return Ok(false);
    };
    let mut changed = false;
    for row in range(s, &parent, start, n)? {
        if s.doc.has_children(row)? {
            let collapsed = s.doc.collapsed(row)?;
            changed |= s.apply(Mutation::set_collapsed(row, !collapsed))?;
        }
    }
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
    fn new_rows() {
        let mut t = TestCase::new(json!(["a", "c"]));
        t.send_keys("o b esc").expect(json!(["a", "b", "c"]));
        t.send_keys("g g O z esc").expect(json!(["z", "a", "b", "c"]));
        t.expect_cursor("z", 0);
    }

    #[test]
    fn new_row_below_parent_is_first_child() {
        let mut t = TestCase::new(json!([{"text": "a", "children": ["b"]}]));
        t.send_keys("o x esc")
            .expect(json!([{"text": "a", "children": ["x", "b"]}]));
    }

    #[test]
    fn new_row_below_collapsed_parent_is_sibling() {
        let mut t = TestCase::new(json!([{"text": "a", "collapsed": true, "children": ["b"]}]));
        t.send_keys("o x esc").expect(json!([
            {"text": "a", "collapsed": true, "children": ["b"]},
            "x"
        ]));
    }

    #[test]
    fn delete_rows_and_paste_back() {
        let mut t = TestCase::new(json!(["a", {"text": "b", "children": ["c"]}, "d"]));
        t.send_keys("j d d")
            .expect(json!(["a", "d"]))
            .expect_cursor("d", 0);
        t.send_keys("p")
            .expect(json!(["a", "d", {"text": "b", "children": ["c"]}]))
            .expect_cursor("b", 0);
    }

    #[test]
    fn delete_rows_count_and_cursor_fallback() {
        let mut t = TestCase::new(json!(["a", "b", "c"]));
        t.send_keys("j 5 d d").expect(json!(["a"])).expect_cursor("a", 0);
    }

    #[test]
    fn delete_last_child_moves_to_parent() {
        let mut t = TestCase::new(json!([{"text": "a", "children": ["b"]}]));
        t.send_keys("j d d").expect(json!(["a"])).expect_cursor("a", 0);
    }

    #[test]
    fn deleting_everything_leaves_an_empty_row() {
        let mut t = TestCase::new(json!(["a", "b"]));
        t.send_keys("2 d d").expect(json!([""]));
        t.send_keys("u").expect(json!(["a", "b"]));
    }

    #[test]
    fn yank_copies_paste_is_fresh() {
        let mut t = TestCase::new(json!([{"text": "a", "children": ["b"]}]));
        t.send_keys("y y j p").expect(json!([
            {"text": "a", "children": ["b", {"text": "a", "children": ["b"]}]}
        ]));
        t.send_keys("x").expect(json!([
            {"text": "a", "children": ["b", {"text": "", "children": ["b"]}]}
        ]));
    }

    #[test]
    fn paste_serialized_count() {
        let mut t = TestCase::new(json!(["a"]));
        t.send_keys("Y 3 p").expect(json!(["a", "a", "a", "a"]));
        t.send_keys("u").expect(json!(["a"]));
    }

    #[test]
    fn paste_before() {
        let mut t = TestCase::new(json!(["a", "b"]));
        t.send_keys("j y y k P").expect(json!(["b", "a", "b"])).expect_cursor("b", 0);
    }

    #[test]
    fn paste_chars() {
        let mut t = TestCase::new(json!(["abc"]));
        t.send_keys("x p").expect(json!(["bac"])).expect_cursor("bac", 1);
        t.send_keys("2 P").expect(json!(["baaac"])).expect_cursor("baaac", 2);
    }

    #[test]
    fn paste_empty_register_does_nothing() {
        let mut t = TestCase::new(json!(["abc"]));
        t.send_keys("p").expect(json!(["abc"]));
        assert!(!t.session.history().can_undo());
    }

    #[test]
    fn clones_share_text_and_children() {
        let mut t = TestCase::new(json!([
            {"text": "one", "children": ["uno"]},
            {"text": "two", "children": ["dos"]}
        ]));
        t.send_keys("y c j j j p").expect(json!([
            {"text": "one", "id": 1, "children": ["uno"]},
            {"text": "two", "children": ["dos", {"clone": 1}]}
        ]));
        t.expect_cursor("one", 0);
        t.send_keys("x").expect(json!([
            {"text": "ne", "id": 1, "children": ["uno"]},
            {"text": "two", "children": ["dos", {"clone": 1}]}
        ]));
        t.send_keys("g g d d").expect(json!([
            {"text": "two", "children": ["dos", {"text": "ne", "children": ["uno"]}]}
        ]));
    }

    #[test]
    fn clone_under_same_parent_is_refused() {
        let mut t = TestCase::new(json!(["a", "b"]));
        t.send_keys("y c p").expect(json!(["a", "b"]));
        assert!(!t.session.history().can_undo());
        assert!(t.session.status().is_some());
    }

    #[test]
    fn clone_into_own_subtree_is_refused() {
        let mut t = TestCase::new(json!([{"text": "a", "children": ["b"]}]));
        t.send_keys("y c j p").expect(json!([{"text": "a", "children": ["b"]}]));
    }

    #[test]
    fn indent_and_unindent() {
        let mut t = TestCase::new(json!(["a", "b", "c"]));
        t.send_keys("j 2 >")
            .expect(json!([{"text": "a", "children": ["b", "c"]}]))
            .expect_cursor("b", 0);
        t.send_keys("<").expect(json!([{"text": "a", "children": ["c"]}, "b"]));
        t.expect_cursor("b", 0);
    }

    #[test]
    fn indent_into_collapsed_expands_it() {
        let mut t = TestCase::new(json!([{"text": "a", "collapsed": true, "children": ["b"]}, "c"]));
        t.send_keys("j >")
            .expect(json!([{"text": "a", "children": ["b", "c"]}]))
            .expect_cursor("c", 0);
    }

    #[test]
    fn indent_in_insert_mode() {
        let mut t = TestCase::new(json!(["a", "b"]));
        t.send_keys("j A tab x esc")
            .expect(json!([{"text": "a", "children": ["bx"]}]));
        t.send_keys("u").expect(json!(["a", "b"]));
    }

    #[test]
    fn swap_rows() {
        let mut t = TestCase::new(json!(["a", "b", "c"]));
        t.send_keys("ctrl+j").expect(json!(["b", "a", "c"])).expect_cursor("a", 0);
        t.send_keys("ctrl+j ctrl+j").expect(json!(["b", "c", "a"]));
        t.send_keys("ctrl+k").expect(json!(["b", "a", "c"]));
    }

    #[test]
    fn toggle_collapse_hides_children() {
        let mut t = TestCase::new(json!([{"text": "a", "children": ["b"]}, "c"]));
        t.send_keys("z").expect(json!([{"text": "a", "collapsed": true, "children": ["b"]}, "c"]));
        t.send_keys("j").expect_cursor("c", 0);
        t.send_keys("z").expect(json!([{"text": "a", "collapsed": true, "children": ["b"]}, "c"]));
    }

    #[test]
    fn visual_line_operations() {
        let mut t = TestCase::new(json!(["a", "b", "c", "d"]));
        t.send_keys("j V j >")
            .expect(json!([{"text": "a", "children": ["b", "c"]}, "d"]))
            .expect_mode(Mode::Normal);
        t.send_keys("k V j <").expect(json!(["a", "b", "c", "d"]));
        // `y` waits for a possible `y c`; the next key completes the yank.
        t.send_keys("k V j y").expect_cursor("c", 0).expect_mode(Mode::VisualLine);
        t.send_keys("esc").expect_cursor("b", 0).expect_mode(Mode::Normal);
        t.send_keys("G p").expect(json!(["a", "b", "c", "d", "b", "c"]));
        t.send_keys("g g V j j d").expect(json!(["d", "b", "c"]));
    }

    #[test]
    fn visual_line_stays_among_siblings() {
        let mut t = TestCase::new(json!([{"text": "a", "children": ["b"]}, "c"]));
        t.send_keys("V j j d").expect(json!([""]));
    }

    #[test]
    fn visual_line_collapse() {
        let mut t = TestCase::new(json!([
            {"text": "a", "children": ["x"]},
            "b",
            {"text": "c", "children": ["y"]}
        ]));
        t.send_keys("V j j z").expect(json!([
            {"text": "a", "collapsed": true, "children": ["x"]},
            "b",
            {"text": "c", "collapsed": true, "children": ["y"]}
        ]));
    }
}
