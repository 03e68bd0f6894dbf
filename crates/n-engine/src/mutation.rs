//! Mutations: the only way the document changes.
//!
//! Every edit a command makes is a [`Mutation`]: a small, named, invertible
//! operation that records whatever it needs to be undone (deleted cells are
//! stored inline, not recomputed). The lifecycle is:
//!
//! 1. [`validate`](Mutation::validate): can it apply to the current state?
//!    An invalid mutation is a constraint violation. Nothing is written and
//!    the command turns into a no-op.
//! 2. [`mutate`](Mutation::mutate): apply it, capturing undo state.
//! 3. [`rewind`](Mutation::rewind): undo it.
//! 4. [`remutate`](Mutation::remutate): redo it. Rows the mutation created
//!    are created *again* with fresh ids, and the old → new mapping is
//!    recorded so that later mutations (and cursors) can be rewritten with
//!    [`remap`](Mutation::remap).

use std::collections::HashMap;

use tracing::debug;

use crate::document::Document;
use crate::error::Result;
use crate::line::Cell;
use crate::serialize::SerializedRow;
use crate::Row;

/// Old → new row ids produced while redoing an entry.
pub type IdMap = HashMap<Row, Row>;

fn mapped(map: &IdMap, row: Row) -> Row {
    map.get(&row).copied().unwrap_or(row)
}

/// One invertible document change.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert `chars` at `col`.
    AddChars { row: Row, col: usize, chars: Vec<Cell> },

    /// Delete `count` cells from `col`. `deleted` is filled on apply.
    DelChars {
        row: Row,
        col: usize,
        count: usize,
        deleted: Vec<Cell>,
    },

    /// Overwrite cells from `col` with `new`. `old` is filled on apply.
    ChangeChars {
        row: Row,
        col: usize,
        new: Vec<Cell>,
        old: Vec<Cell>,
    },

    /// Set the collapse flag. `old` is filled on apply.
    SetCollapsed { row: Row, collapsed: bool, old: bool },

    /// Move `row` from `old_parent` to `new_parent`. `new_index` counts
    /// positions after the row has left its old parent.
    MoveBlock {
        row: Row,
        old_parent: Row,
        old_index: usize,
        new_parent: Row,
        new_index: usize,
    },

    /// Attach existing rows under `parent` starting at `index`.
    AttachBlocks {
        parent: Row,
        rows: Vec<Row>,
        index: usize,
    },

    /// Detach `count` children of `parent` starting at `index`. `detached`
    /// is filled on apply.
    DetachBlocks {
        parent: Row,
        index: usize,
        count: usize,
        detached: Vec<Row>,
    },

    /// Create rows from `serialized` under `parent` at `index`. `added`
    /// (top-level) and `created` (every row, in creation order) are filled
    /// on apply.
    AddBlocks {
        parent: Row,
        index: usize,
        serialized: Vec<SerializedRow>,
        added: Vec<Row>,
        created: Vec<Row>,
    },
}

impl Mutation {
    // -- Constructors -------------------------------------------------------

    #[must_use]
    pub const fn add_chars(row: Row, col: usize, chars: Vec<Cell>) -> Self {
        Self::AddChars { row, col, chars }
    }

    #[must_use]
    pub const fn del_chars(row: Row, col: usize, count: usize) -> Self {
        Self::DelChars {
            row,
            col,
            count,
            deleted: Vec::new(),
        }
    }

    #[must_use]
    pub const fn change_chars(row: Row, col: usize, new: Vec<Cell>) -> Self {
        Self::ChangeChars {
            row,
            col,
            new,
            old: Vec::new(),
        }
    }

    #[must_use]
    pub const fn set_collapsed(row: Row, collapsed: bool) -> Self {
        Self::SetCollapsed {
            row,
            collapsed,
            old: false,
        }
    }

    #[must_use]
    pub const fn move_block(
        row: Row,
        old_parent: Row,
        old_index: usize,
        new_parent: Row,
        new_index: usize,
    ) -> Self {
        Self::MoveBlock {
            row,
            old_parent,
            old_index,
            new_parent,
            new_index,
        }
    }

    #[must_use]
    pub const fn attach_blocks(parent: Row, rows: Vec<Row>, index: usize) -> Self {
        Self::AttachBlocks {
            parent,
            rows,
            index,
        }
    }

    #[must_use]
    pub const fn detach_blocks(parent: Row, index: usize, count: usize) -> Self {
        Self::DetachBlocks {
            parent,
            index,
            count,
            detached: Vec::new(),
        }
    }

    #[must_use]
    pub const fn add_blocks(parent: Row, index: usize, serialized: Vec<SerializedRow>) -> Self {
        Self::AddBlocks {
            parent,
            index,
            serialized,
            added: Vec::new(),
            created: Vec::new(),
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddChars { .. } => "add-chars",
            Self::DelChars { .. } => "del-chars",
            Self::ChangeChars { .. } => "change-chars",
            Self::SetCollapsed { .. } => "set-collapsed",
            Self::MoveBlock { .. } => "move-block",
            Self::AttachBlocks { .. } => "attach-blocks",
            Self::DetachBlocks { .. } => "detach-blocks",
            Self::AddBlocks { .. } => "add-blocks",
        }
    }

    /// Rows created by the last apply of an `AddBlocks` (top-level only).
    #[must_use]
    pub fn added_rows(&self) -> &[Row] {
        match self {
            Self::AddBlocks { added, .. } => added,
            _ => &[],
        }
    }

    /// Rows removed by the last apply of a `DetachBlocks`.
    #[must_use]
    pub fn detached_rows(&self) -> &[Row] {
        match self {
            Self::DetachBlocks { detached, .. } => detached,
            _ => &[],
        }
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Whether the mutation can apply to the current document.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn validate(&self, doc: &mut Document) -> Result<bool> {
        Ok(match self {
            Self::AddChars { row, col, chars } => {
                !chars.is_empty() && *col <= doc.line_len(*row)?
            }
            Self::DelChars { row, col, count, .. } => {
                *count > 0 && col + count <= doc.line_len(*row)?
            }
            Self::ChangeChars { row, col, new, .. } => {
                !new.is_empty() && col + new.len() <= doc.line_len(*row)?
            }
            Self::SetCollapsed { row, collapsed, .. } => doc.collapsed(*row)? != *collapsed,
            Self::MoveBlock {
                row,
                old_parent,
                new_parent,
                ..
            } => {
                if !doc.child_rows(*old_parent)?.contains(row) {
                    false
                } else if old_parent == new_parent {
                    true
                } else {
                    doc.attach_error(*new_parent, *row)?.is_none()
                }
            }
            Self::AttachBlocks { parent, rows, .. } => {
                let mut ok = !rows.is_empty();
                for (i, row) in rows.iter().enumerate() {
                    if !ok {
                        break;
                    }
                    ok = !rows[..i].contains(row) && doc.attach_error(*parent, *row)?.is_none();
                }
                ok
            }
            Self::DetachBlocks {
                parent,
                index,
                count,
                ..
            } => *count > 0 && index + count <= doc.child_rows(*parent)?.len(),
            Self::AddBlocks { serialized, .. } => !serialized.is_empty(),
        })
    }

    /// Apply the mutation.
    ///
    /// # Errors
    ///
    /// Store failure, or a structural error if validation was skipped.
    pub fn mutate(&mut self, doc: &mut Document) -> Result<()> {
        debug!(mutation = self.name(), "mutate");
        match self {
            Self::AddChars { row, col, chars } => {
                let mut line = doc.get_line(*row)?;
                line.splice(*col..*col, chars.iter().copied());
                doc.set_line(*row, &line)?;
            }
            Self::DelChars {
                row,
                col,
                count,
                deleted,
            } => {
                let mut line = doc.get_line(*row)?;
                let end = (*col + *count).min(line.len());
                *deleted = line.drain(*col..end).collect();
                doc.set_line(*row, &line)?;
            }
            Self::ChangeChars { row, col, new, old } => {
                let mut line = doc.get_line(*row)?;
                let end = (*col + new.len()).min(line.len());
                *old = line.splice(*col..end, new.iter().copied()).collect();
                doc.set_line(*row, &line)?;
            }
            Self::SetCollapsed { row, collapsed, old } => {
                *old = doc.collapsed(*row)?;
                doc.set_collapsed(*row, *collapsed)?;
            }
            Self::MoveBlock {
                row,
                old_parent,
                old_index,
                new_parent,
                new_index,
            } => {
                if let Some(index) = doc.detach_child(*old_parent, *row)? {
                    *old_index = index;
                }
                doc.attach_child(*new_parent, *row, *new_index)?;
            }
            Self::AttachBlocks {
                parent,
                rows,
                index,
            } => {
                for (offset, row) in rows.iter().enumerate() {
                    doc.attach_child(*parent, *row, *index + offset)?;
                }
            }
            Self::DetachBlocks {
                parent,
                index,
                count,
                detached,
            } => {
                let children = doc.child_rows(*parent)?;
                let end = (*index + *count).min(children.len());
                *detached = children[*index..end].to_vec();
                for row in detached.iter() {
                    doc.detach_child(*parent, *row)?;
                }
            }
            Self::AddBlocks {
                parent,
                index,
                serialized,
                added,
                created,
            } => {
                created.clear();
                *added = doc.load_detached(serialized, created)?;
                for (offset, row) in added.iter().enumerate() {
                    doc.attach_child(*parent, *row, *index + offset)?;
                }
            }
        }
        Ok(())
    }

    /// Undo the mutation.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn rewind(&self, doc: &mut Document) -> Result<()> {
        debug!(mutation = self.name(), "rewind");
        match self {
            Self::AddChars { row, col, chars } => {
                let mut line = doc.get_line(*row)?;
                let end = (*col + chars.len()).min(line.len());
                line.drain(*col..end);
                doc.set_line(*row, &line)?;
            }
            Self::DelChars {
                row, col, deleted, ..
            } => {
                let mut line = doc.get_line(*row)?;
                let col = (*col).min(line.len());
                line.splice(col..col, deleted.iter().copied());
                doc.set_line(*row, &line)?;
            }
            Self::ChangeChars { row, col, new, old } => {
                let mut line = doc.get_line(*row)?;
                let end = (*col + new.len()).min(line.len());
                line.splice(*col..end, old.iter().copied());
                doc.set_line(*row, &line)?;
            }
            Self::SetCollapsed { row, old, .. } => doc.set_collapsed(*row, *old)?,
            Self::MoveBlock {
                row,
                old_parent,
                old_index,
                new_parent,
                ..
            } => {
                doc.detach_child(*new_parent, *row)?;
                doc.attach_child(*old_parent, *row, *old_index)?;
            }
            Self::AttachBlocks { parent, rows, .. } => {
                for row in rows.iter().rev() {
                    doc.detach_child(*parent, *row)?;
                }
            }
            Self::DetachBlocks {
                parent,
                index,
                detached,
                ..
            } => {
                for (offset, row) in detached.iter().enumerate() {
                    doc.attach_child(*parent, *row, *index + offset)?;
                }
            }
            Self::AddBlocks { parent, added, .. } => {
                for row in added.iter().rev() {
                    doc.detach_child(*parent, *row)?;
                }
            }
        }
        Ok(())
    }

    /// Redo the mutation, regenerating any rows it creates. New ids are
    /// added to `map`; ids already in `map` are applied first.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn remutate(&mut self, doc: &mut Document, map: &mut IdMap) -> Result<()> {
        self.remap(map);
        let previous: Vec<Row> = match self {
            Self::AddBlocks { created, .. } => created.clone(),
            _ => Vec::new(),
        };
        self.mutate(doc)?;
        if let Self::AddBlocks { created, .. } = self {
            for (old, new) in previous.into_iter().zip(created.iter().copied()) {
                if old != new {
                    map.insert(old, new);
                }
            }
        }
        Ok(())
    }

    /// Rewrite row ids through `map`.
    pub fn remap(&mut self, map: &IdMap) {
        if map.is_empty() {
            return;
        }
        match self {
            Self::AddChars { row, .. }
            | Self::DelChars { row, .. }
            | Self::ChangeChars { row, .. }
            | Self::SetCollapsed { row, .. } => *row = mapped(map, *row),
            Self::MoveBlock {
                row,
                old_parent,
                new_parent,
                ..
            } => {
                *row = mapped(map, *row);
                *old_parent = mapped(map, *old_parent);
                *new_parent = mapped(map, *new_parent);
            }
            Self::AttachBlocks { parent, rows, .. } => {
                *parent = mapped(map, *parent);
                for row in rows {
                    *row = mapped(map, *row);
                }
            }
            Self::DetachBlocks {
                parent, detached, ..
            } => {
                *parent = mapped(map, *parent);
                for row in detached {
                    *row = mapped(map, *row);
                }
            }
            Self::AddBlocks { parent, .. } => *parent = mapped(map, *parent),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ROOT;
    use crate::line;
    use n_store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn doc(value: Value) -> Document {
        let mut d = Document::open(Box::new(MemoryStore::new())).unwrap();
        let rows: Vec<SerializedRow> = serde_json::from_value(value).unwrap();
        d.load_rows(ROOT, 0, &rows).unwrap();
        d
    }

    fn dump(d: &mut Document) -> Value {
        serde_json::to_value(d.serialize_document().unwrap()).unwrap()
    }

    /// Apply, check, rewind, check the original comes back.
    fn round_trip(d: &mut Document, mut m: Mutation, expected: &Value) -> Mutation {
        let before = dump(d);
        assert!(m.validate(d).unwrap(), "{} should validate", m.name());
        m.mutate(d).unwrap();
        assert_eq!(&dump(d), expected);
        m.rewind(d).unwrap();
        assert_eq!(dump(d), before);
        m
    }

    #[test]
    fn char_mutations() {
        let mut d = doc(json!(["hello"]));
        round_trip(&mut d, Mutation::add_chars(1, 5, line::from_text("!!")), &json!(["hello!!"]));
        let m = round_trip(&mut d, Mutation::del_chars(1, 1, 3), &json!(["ho"]));
        if let Mutation::DelChars { deleted, .. } = m {
            assert_eq!(line::text(&deleted), "ell");
        }
        round_trip(&mut d, Mutation::change_chars(1, 0, line::from_text("J")), &json!(["Jello"]));
    }

    #[test]
    fn char_validation() {
        let mut d = doc(json!(["abc"]));
        assert!(!Mutation::add_chars(1, 4, line::from_text("x")).validate(&mut d).unwrap());
        assert!(!Mutation::del_chars(1, 2, 2).validate(&mut d).unwrap());
        assert!(!Mutation::del_chars(1, 0, 0).validate(&mut d).unwrap());
        assert!(!Mutation::change_chars(1, 3, line::from_text("x")).validate(&mut d).unwrap());
    }

    #[test]
    fn collapse_mutation() {
        let mut d = doc(json!([{"text": "a", "children": ["b"]}]));
        round_trip(
            &mut d,
            Mutation::set_collapsed(1, true),
            &json!([{"text": "a", "collapsed": true, "children": ["b"]}]),
        );
        assert!(!Mutation::set_collapsed(1, false).validate(&mut d).unwrap());
    }

    #[test]
    fn move_block_and_back() {
        let mut d = doc(json!(["a", "b", "c"]));
        round_trip(
            &mut d,
            Mutation::move_block(3, ROOT, 2, 1, 0),
            &json!([{"text": "a", "children": ["c"]}, "b"]),
        );
        round_trip(&mut d, Mutation::move_block(1, ROOT, 0, ROOT, 2), &json!(["b", "c", "a"]));
    }

    #[test]
    fn move_into_descendant_is_invalid() {
        let mut d = doc(json!([{"text": "a", "children": ["b"]}]));
        assert!(!Mutation::move_block(1, ROOT, 0, 2, 0).validate(&mut d).unwrap());
    }

    #[test]
    fn attach_and_detach_blocks() {
        let mut d = doc(json!(["a", "b"]));
        let m = round_trip(&mut d, Mutation::detach_blocks(ROOT, 0, 1), &json!(["b"]));
        assert_eq!(m.detached_rows(), &[1]);
        round_trip(
            &mut d,
            Mutation::attach_blocks(2, vec![1], 0),
            &json!([{"text": "a", "id": 1}, {"text": "b", "children": [{"clone": 1}]}]),
        );
    }

    #[test]
    fn attach_validation() {
        let mut d = doc(json!([{"text": "a", "children": ["b"]}]));
        assert!(!Mutation::attach_blocks(2, vec![1], 0).validate(&mut d).unwrap());
        assert!(!Mutation::attach_blocks(1, vec![2], 0).validate(&mut d).unwrap());
        assert!(!Mutation::attach_blocks(ROOT, vec![], 0).validate(&mut d).unwrap());
        assert!(Mutation::attach_blocks(ROOT, vec![2], 1).validate(&mut d).unwrap());
    }

    #[test]
    fn add_blocks_and_remutate_with_fresh_ids() {
        let mut d = doc(json!(["a"]));
        let rows: Vec<SerializedRow> = serde_json::from_value(json!([{"text": "new", "children": ["kid"]}])).unwrap();
        let mut m = Mutation::add_blocks(ROOT, 1, rows);
        m.mutate(&mut d).unwrap();
        assert_eq!(m.added_rows(), &[2]);
        assert_eq!(dump(&mut d), json!(["a", {"text": "new", "children": ["kid"]}]));
        m.rewind(&mut d).unwrap();
        assert_eq!(dump(&mut d), json!(["a"]));

        let mut map = IdMap::new();
        m.remutate(&mut d, &mut map).unwrap();
        assert_eq!(m.added_rows(), &[4]);
        assert_eq!(map.get(&2), Some(&4));
        assert_eq!(map.get(&3), Some(&5));
        assert_eq!(dump(&mut d), json!(["a", {"text": "new", "children": ["kid"]}]));

        let mut later = Mutation::add_chars(3, 3, line::from_text("s"));
        later.remap(&map);
        assert_eq!(later, Mutation::add_chars(5, 3, line::from_text("s")));
    }
}
