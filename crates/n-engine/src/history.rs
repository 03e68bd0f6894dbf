//! Undo/redo history: mutations grouped into entries.
//!
//! An entry is the atomic unit of undo/redo:
//!
//! - **Normal mode**: each command (`x`, `dd`, `>`...) is one entry.
//! - **Insert mode**: everything from entering insert to pressing Esc.
//! - **Groups**: while a group is open (macro replay), commits are held back
//!   and everything lands in one entry when the outermost group closes.
//!
//! ```text
//! let mark = history.begin(&cursor);
//! // apply mutations, recording each:
//! history.record(&cursor, mutation);
//! // on failure: history.rewind_to(doc, mark)
//! history.commit(&cursor);
//! ```
//!
//! Entries with no mutations are discarded, so a command that changed
//! nothing leaves no trace. Redo re-creates rows with fresh ids; the
//! old → new mapping is applied to the entry's cursor and to every entry
//! still waiting on the redo stack.

use tracing::debug;

use crate::cursor::Cursor;
use crate::document::Document;
use crate::error::Result;
use crate::mutation::{IdMap, Mutation};

/// Default bound on the undo stack.
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct HistoryEntry {
    mutations: Vec<Mutation>,
    cursor_before: Cursor,
    cursor_after: Cursor,
}

impl HistoryEntry {
    fn new(cursor: &Cursor) -> Self {
        Self {
            mutations: Vec::new(),
            cursor_before: cursor.clone(),
            cursor_after: cursor.clone(),
        }
    }

    fn remap(&mut self, map: &IdMap) {
        let f = |row| map.get(&row).copied().unwrap_or(row);
        self.cursor_before.remap(f);
        self.cursor_after.remap(f);
        for m in &mut self.mutations {
            m.remap(map);
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Undo/redo stacks for one session.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    pending: Option<HistoryEntry>,
    group_depth: usize,
    limit: usize,
}

impl History {
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            pending: None,
            group_depth: 0,
            limit,
        }
    }

    /// Change the undo bound, dropping the oldest entries if needed.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.trim();
    }

    fn trim(&mut self) {
        if self.undo_stack.len() > self.limit {
            let excess = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..excess);
        }
    }

    /// Make sure an entry is pending and return how many mutations it
    /// already holds. Pass that mark to [`rewind_to`](Self::rewind_to) to
    /// undo only what comes after.
    pub fn begin(&mut self, cursor: &Cursor) -> usize {
        self.pending
            .get_or_insert_with(|| HistoryEntry::new(cursor))
            .mutations
            .len()
    }

    /// Record an applied mutation.
    pub fn record(&mut self, cursor: &Cursor, mutation: Mutation) {
        self.begin(cursor);
        if let Some(entry) = &mut self.pending {
            entry.mutations.push(mutation);
        }
    }

    /// Mutations in the pending entry.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.as_ref().map_or(0, |e| e.mutations.len())
    }

    /// Finalize the pending entry with the cursor after the change. Held
    /// back while a group is open. Returns `true` if an entry was pushed.
    pub fn commit(&mut self, cursor: &Cursor) -> bool {
        if self.group_depth > 0 {
            return false;
        }
        self.push_pending(cursor)
    }

    fn push_pending(&mut self, cursor: &Cursor) -> bool {
        let Some(mut entry) = self.pending.take() else {
            return false;
        };
        if entry.mutations.is_empty() {
            return false;
        }
        entry.cursor_after = cursor.clone();
        debug!(mutations = entry.mutations.len(), "history commit");
        self.redo_stack.clear();
        self.undo_stack.push(entry);
        self.trim();
        true
    }

    /// Hold back commits until the matching [`close_group`](Self::close_group).
    pub fn open_group(&mut self, cursor: &Cursor) {
        self.begin(cursor);
        self.group_depth += 1;
    }

    /// Close a group; the outermost close commits everything recorded.
    pub fn close_group(&mut self, cursor: &Cursor) -> bool {
        self.group_depth = self.group_depth.saturating_sub(1);
        self.commit(cursor)
    }

    /// True while a group is open.
    #[must_use]
    pub const fn in_group(&self) -> bool {
        self.group_depth > 0
    }

    /// Rewind pending mutations recorded after `mark` and forget them.
    ///
    /// # Errors
    ///
    /// Store failure while rewinding; the mutations not yet rewound stay
    /// pending.
    pub fn rewind_to(&mut self, doc: &mut Document, mark: usize) -> Result<()> {
        let Some(entry) = &mut self.pending else {
            return Ok(());
        };
        while entry.mutations.len() > mark {
            if let Some(m) = entry.mutations.last() {
                m.rewind(doc)?;
            }
            entry.mutations.pop();
        }
        Ok(())
    }

    /// Drop the pending entry without touching the document.
    pub fn discard_pending(&mut self) {
        self.pending = None;
        self.group_depth = 0;
    }

    /// Undo the last entry. A pending entry is committed first so it can be
    /// undone. Returns the cursor to restore.
    ///
    /// # Errors
    ///
    /// Store failure; the entry stays on the undo stack.
    pub fn undo(&mut self, doc: &mut Document, cursor: &Cursor) -> Result<Option<Cursor>> {
        self.push_pending(cursor);
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(None);
        };
        let result = entry
            .mutations
            .iter()
            .rev()
            .try_for_each(|m| m.rewind(doc));
        if let Err(err) = result {
            self.undo_stack.push(entry);
            return Err(err);
        }
        debug!(mutations = entry.mutations.len(), "undo");
        let restore = entry.cursor_before.clone();
        self.redo_stack.push(entry);
        Ok(Some(restore))
    }

    /// Redo the last undone entry. Returns the cursor to restore.
    ///
    /// # Errors
    ///
    /// Store failure; the entry stays on the redo stack.
    pub fn redo(&mut self, doc: &mut Document) -> Result<Option<Cursor>> {
        let Some(mut entry) = self.redo_stack.pop() else {
            return Ok(None);
        };
        let mut map = IdMap::new();
        let result = entry
            .mutations
            .iter_mut()
            .try_for_each(|m| m.remutate(doc, &mut map));
        if let Err(err) = result {
            self.redo_stack.push(entry);
            return Err(err);
        }
        if !map.is_empty() {
            debug!(remapped = map.len(), "redo created fresh rows");
            entry.remap(&map);
            for later in &mut self.redo_stack {
                later.remap(&map);
            }
        }
        let restore = entry.cursor_after.clone();
        self.undo_stack.push(entry);
        Ok(Some(restore))
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.pending_len() > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line;
    use crate::path::Path;
    use crate::serialize::SerializedRow;
    use crate::ROOT;
    use n_store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn setup(text: &str) -> (Document, History, Cursor) {
        let mut doc = Document::open(Box::new(MemoryStore::new())).unwrap();
        doc.load_rows(ROOT, 0, &[SerializedRow::text(text)]).unwrap();
        (doc, History::default(), Cursor::new(Path::from_rows([1]), 0))
    }

    fn apply(doc: &mut Document, h: &mut History, c: &Cursor, mut m: Mutation) {
        m.mutate(doc).unwrap();
        h.record(c, m);
    }

    #[test]
    fn undo_restores_text_and_cursor() {
        let (mut doc, mut h, c) = setup("abc");
        h.begin(&c);
        apply(&mut doc, &mut h, &c, Mutation::del_chars(1, 0, 1));
        let mut after = c.clone();
        after.set_col(2);
        assert!(h.commit(&after));

        assert_eq!(doc.get_text(1).unwrap(), "bc");
        let restored = h.undo(&mut doc, &after).unwrap().unwrap();
        assert_eq!(restored.col, 0);
        assert_eq!(doc.get_text(1).unwrap(), "abc");

        let redone = h.redo(&mut doc).unwrap().unwrap();
        assert_eq!(redone.col, 2);
        assert_eq!(doc.get_text(1).unwrap(), "bc");
    }

    #[test]
    fn empty_entries_are_discarded() {
        let (_, mut h, c) = setup("abc");
        h.begin(&c);
        assert!(!h.commit(&c));
        assert!(!h.can_undo());
    }

    #[test]
    fn new_entry_clears_redo() {
        let (mut doc, mut h, c) = setup("abc");
        apply(&mut doc, &mut h, &c, Mutation::del_chars(1, 0, 1));
        h.commit(&c);
        h.undo(&mut doc, &c).unwrap();
        assert!(h.can_redo());
        apply(&mut doc, &mut h, &c, Mutation::del_chars(1, 2, 1));
        h.commit(&c);
        assert!(!h.can_redo());
    }

    #[test]
    fn undo_commits_pending_first() {
        let (mut doc, mut h, c) = setup("abc");
        apply(&mut doc, &mut h, &c, Mutation::add_chars(1, 0, line::from_text("x")));
        assert!(h.can_undo());
        h.undo(&mut doc, &c).unwrap();
        assert_eq!(doc.get_text(1).unwrap(), "abc");
    }

    #[test]
    fn group_makes_one_entry() {
        let (mut doc, mut h, c) = setup("abcd");
        h.open_group(&c);
        for _ in 0..3 {
            h.begin(&c);
            apply(&mut doc, &mut h, &c, Mutation::del_chars(1, 0, 1));
            assert!(!h.commit(&c));
        }
        assert!(h.close_group(&c));
        assert_eq!(h.undo_count(), 1);
        h.undo(&mut doc, &c).unwrap();
        assert_eq!(doc.get_text(1).unwrap(), "abcd");
    }

    #[test]
    fn rewind_to_mark() {
        let (mut doc, mut h, c) = setup("abcd");
        apply(&mut doc, &mut h, &c, Mutation::del_chars(1, 0, 1));
        let mark = h.begin(&c);
        apply(&mut doc, &mut h, &c, Mutation::del_chars(1, 0, 1));
        assert_eq!(doc.get_text(1).unwrap(), "cd");
        h.rewind_to(&mut doc, mark).unwrap();
        assert_eq!(doc.get_text(1).unwrap(), "bcd");
        assert_eq!(h.pending_len(), 1);
    }

    #[test]
    fn limit_drops_oldest() {
        let (mut doc, mut h, c) = setup("abcdef");
        h.set_limit(2);
        for _ in 0..4 {
            apply(&mut doc, &mut h, &c, Mutation::del_chars(1, 0, 1));
            h.commit(&c);
        }
        assert_eq!(h.undo_count(), 2);
        while h.undo(&mut doc, &c).unwrap().is_some() {}
        assert_eq!(doc.get_text(1).unwrap(), "cdef");
        assert_eq!((h.undo_count(), h.redo_count()), (0, 2));
    }

    #[test]
    fn redo_remaps_later_entries() {
        let (mut doc, mut h, c) = setup("top");
        // Entry 1 adds a row; entry 2 types into it.
        apply(
            &mut doc,
            &mut h,
            &c,
            Mutation::add_blocks(ROOT, 1, vec![SerializedRow::text("")]),
        );
        let mut on_new = c.clone();
        on_new.path = Path::from_rows([2]);
        h.commit(&on_new);
        apply(&mut doc, &mut h, &on_new, Mutation::add_chars(2, 0, line::from_text("hi")));
        h.commit(&on_new);

        h.undo(&mut doc, &on_new).unwrap();
        h.undo(&mut doc, &c).unwrap();
        assert_eq!(doc.child_rows(ROOT).unwrap(), vec![1]);

        let after = h.redo(&mut doc).unwrap().unwrap();
        assert_eq!(after.path, Path::from_rows([3]));
        let after = h.redo(&mut doc).unwrap().unwrap();
        assert_eq!(after.path, Path::from_rows([3]));
        assert_eq!(doc.get_text(3).unwrap(), "hi");
        assert_eq!(doc.child_rows(ROOT).unwrap(), vec![1, 3]);
    }
}
