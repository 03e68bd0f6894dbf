//! Document DAG: rows, adjacency and clone bookkeeping over a [`Store`].
//!
//! Every row is an integer id. Its text, parent list, child list and collapse
//! flag live under per-row keys in the store (see [`n_store::keys`]). A row
//! with more than one parent is a *clone*: one row, several positions.
//!
//! # Invariants
//!
//! - **Acyclic**: no row is its own ancestor. [`Document::attach_child`]
//!   rejects the attachment before writing anything.
//! - **No duplicate parentage**: a parent lists a child at most once.
//! - **Detach is not delete**: a row whose last parent is detached keeps all
//!   its keys. `detached_parent` remembers where it used to live; only
//!   [`Document::purge`] erases it.
//! - **Collapse is presentation**: collapsed rows keep their children.
//!
//! # Cache
//!
//! Reads go through an in-memory cache; a key that was read or written once
//! is never fetched from the store again. Writes go to the store first and
//! reach the cache only after the store accepted them, so a failed write
//! never leaves a tentative value behind.

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use n_store::{Store, StoreError, keys};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{OutlineError, Result, StructuralError};
use crate::line::{self, Cell, Line, LineRecord};
use crate::path::Path;
use crate::{ROOT, Row};

// ---------------------------------------------------------------------------
// View contents
// ---------------------------------------------------------------------------

/// One visible row under a view root, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRow {
    pub path: Path,
    /// Depth below the view root (top-level rows are 0).
    pub depth: usize,
    pub text: String,
    pub collapsed: bool,
    pub has_children: bool,
    pub is_clone: bool,
}

/// What a renderer can show right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewContents {
    pub rows: Vec<ViewRow>,
    /// Some rows were not in the cache and were left out.
    pub still_loading: bool,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The row DAG of one document.
pub struct Document {
    store: Box<dyn Store>,
    cache: HashMap<String, Option<Value>>,
    /// The `lastSave` stamp this session last wrote (or saw when opening).
    last_save: Option<u64>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("cached_keys", &self.cache.len())
            .field("last_save", &self.last_save)
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Open the document held by `store`.
    ///
    /// # Errors
    ///
    /// Store read failure.
    pub fn open(store: Box<dyn Store>) -> Result<Self> {
        let last_save = store.get(keys::LAST_SAVE)?.and_then(|v| v.as_u64());
        Ok(Self {
            store,
            cache: HashMap::new(),
            last_save,
        })
    }

    // -- Raw key access -----------------------------------------------------

    fn read(&mut self, key: &str) -> Result<Option<Value>> {
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached.clone());
        }
        trace!(key, "store get");
        let value = self.store.get(key)?;
        self.cache.insert(key.to_string(), value.clone());
        Ok(value)
    }

    /// Cache-only lookup: `None` if the key has never been loaded.
    fn peek(&self, key: &str) -> Option<Option<&Value>> {
        self.cache.get(key).map(Option::as_ref)
    }

    fn read_as<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        match self.read(key)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| codec_error(key, source)),
        }
    }

    fn write(&mut self, key: &str, value: Value) -> Result<()> {
        self.stamp()?;
        trace!(key, "store set");
        if let Err(err) = self.store.set(key, value.clone()) {
            warn!(key, %err, "store write failed");
            return Err(err.into());
        }
        let value = if value.is_null() { None } else { Some(value) };
        self.cache.insert(key.to_string(), value);
        Ok(())
    }

    fn write_as<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|source| codec_error(key, source))?;
        self.write(key, value)
    }

    /// Compare the stored `lastSave` with ours and advance it.
    fn stamp(&mut self) -> Result<()> {
        let stored = self.store.get(keys::LAST_SAVE)?.and_then(|v| v.as_u64());
        if stored > self.last_save {
            let theirs = stored.unwrap_or_default();
            let ours = self.last_save.unwrap_or_default();
            warn!(ours, theirs, "another session wrote to this document");
            return Err(OutlineError::MultipleWriter { ours, theirs });
        }
        let floor = stored.max(self.last_save).map_or(0, |s| s + 1);
        let next = now_millis().max(floor);
        self.store.set(keys::LAST_SAVE, Value::from(next))?;
        self.last_save = Some(next);
        Ok(())
    }

    /// Read an arbitrary global key (settings, macros, plugin data).
    ///
    /// # Errors
    ///
    /// Store failure or a value of the wrong shape.
    pub fn get_global<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        self.read_as(key)
    }

    /// Write an arbitrary global key.
    ///
    /// # Errors
    ///
    /// Store failure or a concurrent writer.
    pub fn set_global<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        self.write_as(key, value)
    }

    // -- Rows ---------------------------------------------------------------

    /// Allocate a fresh row id from the `lastID` counter.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn new_row(&mut self) -> Result<Row> {
        let last: Row = self.read_as(keys::LAST_ID)?.unwrap_or(ROOT);
        let row = last + 1;
        self.write_as(keys::LAST_ID, &row)?;
        trace!(row, "allocated row");
        Ok(row)
    }

    /// The styled content of `row` (empty if never set).
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn get_line(&mut self, row: Row) -> Result<Line> {
        Ok(self
            .read_as::<LineRecord>(&keys::line(row))?
            .map(LineRecord::into_line)
            .unwrap_or_default())
    }

    /// Replace the content of `row`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn set_line(&mut self, row: Row, line: &[Cell]) -> Result<()> {
        self.write_as(&keys::line(row), &LineRecord::from_line(line))
    }

    /// The plain text of `row`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn get_text(&mut self, row: Row) -> Result<String> {
        Ok(line::text(&self.get_line(row)?))
    }

    /// Number of cells in `row`'s line.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn line_len(&mut self, row: Row) -> Result<usize> {
        Ok(self.get_line(row)?.len())
    }

    /// Ordered child ids of `row`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn child_rows(&mut self, row: Row) -> Result<Vec<Row>> {
        Ok(self.read_as(&keys::children(row))?.unwrap_or_default())
    }

    /// Parent ids of `row`, in the order they were attached.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn get_parents(&mut self, row: Row) -> Result<Vec<Row>> {
        Ok(self.read_as(&keys::parents(row))?.unwrap_or_default())
    }

    /// The positions of `path`'s children.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn get_children(&mut self, path: &Path) -> Result<Vec<Path>> {
        Ok(self
            .child_rows(path.row())?
            .into_iter()
            .map(|row| path.child(row))
            .collect())
    }

    /// The `index`th child position of `path`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn get_child(&mut self, path: &Path, index: usize) -> Result<Option<Path>> {
        Ok(self
            .child_rows(path.row())?
            .get(index)
            .map(|&row| path.child(row)))
    }

    /// # Errors
    ///
    /// Store failure.
    pub fn has_children(&mut self, row: Row) -> Result<bool> {
        Ok(!self.child_rows(row)?.is_empty())
    }

    /// # Errors
    ///
    /// Store failure.
    pub fn collapsed(&mut self, row: Row) -> Result<bool> {
        Ok(self.read_as(&keys::collapsed(row))?.unwrap_or(false))
    }

    /// # Errors
    ///
    /// Store failure.
    pub fn set_collapsed(&mut self, row: Row, collapsed: bool) -> Result<()> {
        debug!(row, collapsed, "set collapsed");
        self.write_as(&keys::collapsed(row), &collapsed)
    }

    /// A row with more than one parent.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn is_clone(&mut self, row: Row) -> Result<bool> {
        Ok(self.get_parents(row)?.len() > 1)
    }

    /// Where `path`'s row sits among its parent's children.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn index_in_parent(&mut self, path: &Path) -> Result<Option<usize>> {
        if path.is_root() {
            return Ok(None);
        }
        let row = path.row();
        Ok(self
            .child_rows(path.parent_row())?
            .iter()
            .position(|&r| r == row))
    }

    /// True if every step of `path` is a current parent → child edge.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn is_valid_path(&mut self, path: &Path) -> Result<bool> {
        let mut parent = ROOT;
        for &row in path.rows() {
            if !self.child_rows(parent)?.contains(&row) {
                return Ok(false);
            }
            parent = row;
        }
        Ok(true)
    }

    // -- Structure ----------------------------------------------------------

    /// True if `ancestor` is `row` or can be reached from `row` by following
    /// parent links.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn is_ancestor(&mut self, ancestor: Row, row: Row) -> Result<bool> {
        let mut seen = HashSet::new();
        let mut stack = vec![row];
        while let Some(r) = stack.pop() {
            if r == ancestor {
                return Ok(true);
            }
            if seen.insert(r) {
                stack.extend(self.get_parents(r)?);
            }
        }
        Ok(false)
    }

    /// Why attaching `child` under `parent` would be illegal, if it would be.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn attach_error(&mut self, parent: Row, child: Row) -> Result<Option<StructuralError>> {
        if child == ROOT || self.is_ancestor(child, parent)? {
            return Ok(Some(StructuralError::Cycle { parent, child }));
        }
        if self.child_rows(parent)?.contains(&child) {
            return Ok(Some(StructuralError::DuplicateParent { parent, child }));
        }
        Ok(None)
    }

    /// Attach `child` under `parent` at `index` (clamped to the end).
    ///
    /// # Errors
    ///
    /// [`StructuralError`] before any write if the attachment would create a
    /// cycle or duplicate an existing edge; store failure otherwise.
    pub fn attach_child(&mut self, parent: Row, child: Row, index: usize) -> Result<()> {
        if let Some(err) = self.attach_error(parent, child)? {
            debug!(%err, "attach rejected");
            return Err(err.into());
        }
        let mut children = self.child_rows(parent)?;
        let index = index.min(children.len());
        children.insert(index, child);
        self.write_as(&keys::children(parent), &children)?;

        let mut parents = self.get_parents(child)?;
        parents.push(parent);
        self.write_as(&keys::parents(child), &parents)?;

        if let Some(old) = self.detached_parent(child)? {
            let mut orphans = self.detached_children(old)?;
            orphans.retain(|&r| r != child);
            self.write_as(&keys::detached_children(old), &orphans)?;
            self.write(&keys::detached_parent(child), Value::Null)?;
        }
        debug!(parent, child, index, "attached");
        Ok(())
    }

    /// Attach an existing row at a second (or further) position.
    ///
    /// # Errors
    ///
    /// Same as [`attach_child`](Self::attach_child).
    pub fn clone_row(&mut self, existing: Row, new_parent: Row, index: usize) -> Result<()> {
        self.attach_child(new_parent, existing, index)
    }

    /// Remove the `parent` → `child` edge. Returns the index the child had,
    /// or `None` if there was no such edge.
    ///
    /// A child left without parents stays in the store as a detached row.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn detach_child(&mut self, parent: Row, child: Row) -> Result<Option<usize>> {
        let mut children = self.child_rows(parent)?;
        let Some(index) = children.iter().position(|&r| r == child) else {
            return Ok(None);
        };
        children.remove(index);
        self.write_as(&keys::children(parent), &children)?;

        let mut parents = self.get_parents(child)?;
        parents.retain(|&p| p != parent);
        self.write_as(&keys::parents(child), &parents)?;

        if parents.is_empty() {
            self.write_as(&keys::detached_parent(child), &parent)?;
            let mut orphans = self.detached_children(parent)?;
            if !orphans.contains(&child) {
                orphans.push(child);
                self.write_as(&keys::detached_children(parent), &orphans)?;
            }
        }
        debug!(parent, child, index, "detached");
        Ok(Some(index))
    }

    /// Where a fully detached row used to live.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn detached_parent(&mut self, row: Row) -> Result<Option<Row>> {
        self.read_as(&keys::detached_parent(row))
    }

    /// Rows that were fully detached from `row`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn detached_children(&mut self, row: Row) -> Result<Vec<Row>> {
        Ok(self
            .read_as(&keys::detached_children(row))?
            .unwrap_or_default())
    }

    /// True if `row` can reach the root through parent links.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn is_attached(&mut self, row: Row) -> Result<bool> {
        self.is_ancestor(ROOT, row)
    }

    /// One attached position of `row`, preferring first parents.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn canonical_path(&mut self, row: Row) -> Result<Option<Path>> {
        if row == ROOT {
            return Ok(Some(Path::root()));
        }
        for parent in self.get_parents(row)? {
            if let Some(path) = self.canonical_path(parent)? {
                return Ok(Some(path.child(row)));
            }
        }
        Ok(None)
    }

    /// Every attached position of `row`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn all_paths(&mut self, row: Row) -> Result<Vec<Path>> {
        if row == ROOT {
            return Ok(vec![Path::root()]);
        }
        let mut paths = Vec::new();
        for parent in self.get_parents(row)? {
            for path in self.all_paths(parent)? {
                paths.push(path.child(row));
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Erase a detached row and every descendant that has no other parent.
    /// Returns `false` (and erases nothing) if `row` is still attached
    /// somewhere.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn purge(&mut self, row: Row) -> Result<bool> {
        if row == ROOT || !self.get_parents(row)?.is_empty() {
            return Ok(false);
        }
        for child in self.child_rows(row)? {
            self.detach_child(row, child)?;
            if self.get_parents(child)?.is_empty() {
                self.purge(child)?;
            }
        }
        if let Some(old) = self.detached_parent(row)? {
            let mut orphans = self.detached_children(old)?;
            orphans.retain(|&r| r != row);
            self.write_as(&keys::detached_children(old), &orphans)?;
        }
        for key in keys::all_row_keys(row) {
            self.write(&key, Value::Null)?;
        }
        debug!(row, "purged");
        Ok(true)
    }

    // -- Plugin data --------------------------------------------------------

    /// Metadata a plugin attached to `row`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn plugin_data(&mut self, row: Row, namespace: &str) -> Result<Option<Value>> {
        self.read(&keys::row_plugin(row, namespace))
    }

    /// # Errors
    ///
    /// Store failure.
    pub fn set_plugin_data(&mut self, row: Row, namespace: &str, value: Value) -> Result<()> {
        self.write(&keys::row_plugin(row, namespace), value)
    }

    /// Global plugin data.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn plugin_value(&mut self, namespace: &str, key: &str) -> Result<Option<Value>> {
        self.read(&keys::plugin(namespace, key))
    }

    /// # Errors
    ///
    /// Store failure.
    pub fn set_plugin_value(&mut self, namespace: &str, key: &str, value: Value) -> Result<()> {
        self.write(&keys::plugin(namespace, key), value)
    }

    // -- Visible order ------------------------------------------------------

    /// Children of `path` are shown: it is the view root, or not collapsed.
    fn shows_children(&mut self, path: &Path, view_root: &Path) -> Result<bool> {
        Ok(path == view_root || !self.collapsed(path.row())?)
    }

    /// The sibling `offset` positions away from `path`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn sibling(&mut self, path: &Path, offset: isize) -> Result<Option<Path>> {
        let (Some(parent), Some(index)) = (path.parent(), self.index_in_parent(path)?) else {
            return Ok(None);
        };
        let Some(target) = index.checked_add_signed(offset) else {
            return Ok(None);
        };
        self.get_child(&parent, target)
    }

    /// The first visible row under `view_root`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn first_visible(&mut self, view_root: &Path) -> Result<Option<Path>> {
        self.get_child(view_root, 0)
    }

    /// The last visible row under `view_root`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn last_visible(&mut self, view_root: &Path) -> Result<Option<Path>> {
        let mut path = view_root.clone();
        loop {
            if !self.shows_children(&path, view_root)? {
                break;
            }
            match self.get_children(&path)?.pop() {
                Some(last) => path = last,
                None => break,
            }
        }
        Ok((path != *view_root).then_some(path))
    }

    /// The row after `path` in display order.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn next_visible(&mut self, path: &Path, view_root: &Path) -> Result<Option<Path>> {
        if self.shows_children(path, view_root)? {
            if let Some(first) = self.get_child(path, 0)? {
                return Ok(Some(first));
            }
        }
        let mut cur = path.clone();
        while cur != *view_root && cur.is_descendant_of(view_root) {
            if let Some(next) = self.sibling(&cur, 1)? {
                return Ok(Some(next));
            }
            match cur.parent() {
                Some(parent) => cur = parent,
                None => break,
            }
        }
        Ok(None)
    }

    /// The row before `path` in display order.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn prev_visible(&mut self, path: &Path, view_root: &Path) -> Result<Option<Path>> {
        if !path.is_descendant_of(view_root) {
            return Ok(None);
        }
        if let Some(prev) = self.sibling(path, -1)? {
            let mut cur = prev;
            loop {
                if !self.shows_children(&cur, view_root)? {
                    break;
                }
                match self.get_children(&cur)?.pop() {
                    Some(last) => cur = last,
                    None => break,
                }
            }
            return Ok(Some(cur));
        }
        Ok(path.parent().filter(|parent| parent != view_root))
    }

    /// Every visible row under `view_root`, in display order.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn visible_rows(&mut self, view_root: &Path) -> Result<Vec<Path>> {
        let mut rows = Vec::new();
        let mut cur = self.first_visible(view_root)?;
        while let Some(path) = cur {
            cur = self.next_visible(&path, view_root)?;
            rows.push(path);
        }
        Ok(rows)
    }

    /// Expand every collapsed row strictly between `view_root` and `path`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn reveal(&mut self, path: &Path, view_root: &Path) -> Result<()> {
        let mut cur = path.parent();
        while let Some(p) = cur {
            if p == *view_root || !p.is_descendant_of(view_root) {
                break;
            }
            if self.collapsed(p.row())? {
                self.set_collapsed(p.row(), false)?;
            }
            cur = p.parent();
        }
        Ok(())
    }

    /// Rows a renderer can draw under `root`.
    ///
    /// With `force_load` every needed key is fetched. Without it only cached
    /// keys are used and the walk skips whatever is missing, reporting
    /// `still_loading`.
    ///
    /// # Errors
    ///
    /// Store failure (only with `force_load`).
    pub fn view_contents(&mut self, root: &Path, force_load: bool) -> Result<ViewContents> {
        let mut out = ViewContents::default();
        self.collect_view(root, root, 0, force_load, &mut out)?;
        Ok(out)
    }

    fn collect_view(
        &mut self,
        path: &Path,
        root: &Path,
        depth: usize,
        force_load: bool,
        out: &mut ViewContents,
    ) -> Result<()> {
        let children: Vec<Row> = if force_load {
            self.child_rows(path.row())?
        } else {
            match self.peek(&keys::children(path.row())) {
                Some(Some(value)) => serde_json::from_value(value.clone()).unwrap_or_default(),
                Some(None) => Vec::new(),
                None => {
                    out.still_loading = true;
                    return Ok(());
                }
            }
        };
        for row in children {
            let child = path.child(row);
            let fields = if force_load {
                Some((
                    self.get_text(row)?,
                    self.collapsed(row)?,
                    self.get_parents(row)?.len(),
                    self.has_children(row)?,
                ))
            } else {
                self.peek_view_fields(row)
            };
            let Some((text, collapsed, parent_count, has_children)) = fields else {
                out.still_loading = true;
                continue;
            };
            out.rows.push(ViewRow {
                path: child.clone(),
                depth,
                text,
                collapsed,
                has_children,
                is_clone: parent_count > 1,
            });
            if !collapsed || child == *root {
                self.collect_view(&child, root, depth + 1, force_load, out)?;
            }
        }
        Ok(())
    }

    fn peek_view_fields(&self, row: Row) -> Option<(String, bool, usize, bool)> {
        let text = match self.peek(&keys::line(row))? {
            Some(v) => serde_json::from_value::<LineRecord>(v.clone()).ok()?.text,
            None => String::new(),
        };
        let collapsed = self
            .peek(&keys::collapsed(row))?
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let parents = self
            .peek(&keys::parents(row))?
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let has_children = self
            .peek(&keys::children(row))?
            .and_then(Value::as_array)
            .is_some_and(|c| !c.is_empty());
        Some((text, collapsed, parents, has_children))
    }
}

fn codec_error(key: &str, source: serde_json::Error) -> OutlineError {
    StoreError::Codec {
        key: key.to_string(),
        source,
    }
    .into()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use n_store::{FailingStore, FailurePolicy, MemoryStore};
    use pretty_assertions::assert_eq;

    fn doc() -> (Document, MemoryStore) {
        let store = MemoryStore::new();
        let doc = Document::open(Box::new(store.clone())).unwrap();
        (doc, store)
    }

    /// root → a(1) → b(2), root → c(3)
    fn small() -> (Document, MemoryStore) {
        let (mut d, s) = doc();
        for _ in 0..3 {
            d.new_row().unwrap();
        }
        d.set_line(1, &line::from_text("a")).unwrap();
        d.set_line(2, &line::from_text("b")).unwrap();
        d.set_line(3, &line::from_text("c")).unwrap();
        d.attach_child(ROOT, 1, 0).unwrap();
        d.attach_child(1, 2, 0).unwrap();
        d.attach_child(ROOT, 3, 1).unwrap();
        (d, s)
    }

    #[test]
    fn new_rows_are_sequential() {
        let (mut d, _) = doc();
        assert_eq!(d.new_row().unwrap(), 1);
        assert_eq!(d.new_row().unwrap(), 2);
    }

    #[test]
    fn lines_round_trip_through_store() {
        let (mut d, store) = doc();
        d.set_line(4, &line::from_text("hello")).unwrap();
        let mut fresh = Document::open(Box::new(store)).unwrap();
        assert_eq!(fresh.get_text(4).unwrap(), "hello");
        assert_eq!(fresh.get_text(5).unwrap(), "");
    }

    #[test]
    fn attach_and_children() {
        let (mut d, _) = small();
        assert_eq!(d.child_rows(ROOT).unwrap(), vec![1, 3]);
        assert_eq!(d.get_parents(2).unwrap(), vec![1]);
        let kids = d.get_children(&Path::from_rows([1])).unwrap();
        assert_eq!(kids, vec![Path::from_rows([1, 2])]);
    }

    #[test]
    fn cycle_rejected_without_writes() {
        let (mut d, store) = small();
        let before = store.snapshot();
        let err = d.attach_child(2, 1, 0).unwrap_err();
        assert!(matches!(
            err,
            OutlineError::Structural(StructuralError::Cycle {
                parent: 2,
                child: 1
            })
        ));
        assert!(d.attach_child(1, 1, 0).is_err());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn duplicate_parent_rejected() {
        let (mut d, store) = small();
        let before = store.snapshot();
        let err = d.attach_child(1, 2, 5).unwrap_err();
        assert!(matches!(
            err,
            OutlineError::Structural(StructuralError::DuplicateParent { .. })
        ));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn clone_gives_two_paths() {
        let (mut d, _) = small();
        d.clone_row(2, 3, 0).unwrap();
        assert!(d.is_clone(2).unwrap());
        assert_eq!(
            d.all_paths(2).unwrap(),
            vec![Path::from_rows([1, 2]), Path::from_rows([3, 2])]
        );
        assert_eq!(d.canonical_path(2).unwrap(), Some(Path::from_rows([1, 2])));
    }

    #[test]
    fn detach_last_parent_keeps_row() {
        let (mut d, _) = small();
        d.clone_row(2, 3, 0).unwrap();
        assert_eq!(d.detach_child(1, 2).unwrap(), Some(0));
        assert!(d.is_attached(2).unwrap());
        assert_eq!(d.detached_parent(2).unwrap(), None);

        d.detach_child(3, 2).unwrap();
        assert!(!d.is_attached(2).unwrap());
        assert_eq!(d.get_text(2).unwrap(), "b");
        assert_eq!(d.detached_parent(2).unwrap(), Some(3));
        assert_eq!(d.detached_children(3).unwrap(), vec![2]);
        assert_eq!(d.canonical_path(2).unwrap(), None);
    }

    #[test]
    fn reattach_clears_detached_bookkeeping() {
        let (mut d, _) = small();
        d.detach_child(1, 2).unwrap();
        d.attach_child(3, 2, 0).unwrap();
        assert_eq!(d.detached_parent(2).unwrap(), None);
        assert!(d.detached_children(1).unwrap().is_empty());
    }

    #[test]
    fn detach_missing_edge() {
        let (mut d, _) = small();
        assert_eq!(d.detach_child(3, 2).unwrap(), None);
    }

    #[test]
    fn purge_erases_detached_subtree() {
        let (mut d, store) = small();
        assert!(!d.purge(1).unwrap());
        d.detach_child(ROOT, 1).unwrap();
        assert!(d.purge(1).unwrap());
        let snap = store.snapshot();
        assert!(!snap.contains_key("1:line"));
        assert!(!snap.contains_key("2:line"));
        assert!(snap.contains_key("3:line"));
        assert!(d.detached_children(ROOT).unwrap().is_empty());
    }

    #[test]
    fn visible_order_respects_collapse() {
        let (mut d, _) = small();
        let root = Path::root();
        let order = d.visible_rows(&root).unwrap();
        assert_eq!(
            order,
            vec![
                Path::from_rows([1]),
                Path::from_rows([1, 2]),
                Path::from_rows([3])
            ]
        );
        d.set_collapsed(1, true).unwrap();
        assert_eq!(
            d.visible_rows(&root).unwrap(),
            vec![Path::from_rows([1]), Path::from_rows([3])]
        );
        assert_eq!(d.last_visible(&root).unwrap(), Some(Path::from_rows([3])));
        assert_eq!(
            d.prev_visible(&Path::from_rows([3]), &root).unwrap(),
            Some(Path::from_rows([1]))
        );
    }

    #[test]
    fn zoomed_view_shows_collapsed_root_children() {
        let (mut d, _) = small();
        d.set_collapsed(1, true).unwrap();
        let view = Path::from_rows([1]);
        assert_eq!(
            d.visible_rows(&view).unwrap(),
            vec![Path::from_rows([1, 2])]
        );
        assert_eq!(d.prev_visible(&Path::from_rows([1, 2]), &view).unwrap(), None);
        assert_eq!(d.next_visible(&Path::from_rows([1, 2]), &view).unwrap(), None);
    }

    #[test]
    fn reveal_expands_ancestors() {
        let (mut d, _) = small();
        d.set_collapsed(1, true).unwrap();
        d.reveal(&Path::from_rows([1, 2]), &Path::root()).unwrap();
        assert!(!d.collapsed(1).unwrap());
    }

    #[test]
    fn view_contents_cache_only() {
        let (mut d, store) = small();
        let full = d.view_contents(&Path::root(), true).unwrap();
        assert_eq!(full.rows.len(), 3);
        assert!(!full.still_loading);

        let mut cold = Document::open(Box::new(store)).unwrap();
        let partial = cold.view_contents(&Path::root(), false).unwrap();
        assert!(partial.rows.is_empty());
        assert!(partial.still_loading);

        let loaded = cold.view_contents(&Path::root(), true).unwrap();
        assert_eq!(loaded, full);
        let warm = cold.view_contents(&Path::root(), false).unwrap();
        assert_eq!(warm, full);
    }

    #[test]
    fn plugin_data_round_trip() {
        let (mut d, _) = small();
        d.set_plugin_data(1, "marks", Value::from("todo")).unwrap();
        assert_eq!(d.plugin_data(1, "marks").unwrap(), Some(Value::from("todo")));
        d.set_plugin_value("marks", "index", serde_json::json!({"todo": 1}))
            .unwrap();
        assert!(d.plugin_value("marks", "index").unwrap().is_some());
    }

    #[test]
    fn second_writer_is_detected() {
        let (mut a, store) = doc();
        let mut b = Document::open(Box::new(store)).unwrap();
        a.set_line(1, &line::from_text("from a")).unwrap();
        let err = b.set_line(1, &line::from_text("from b")).unwrap_err();
        assert!(matches!(err, OutlineError::MultipleWriter { .. }));
        assert_eq!(a.get_text(1).unwrap(), "from a");
        a.set_line(1, &line::from_text("still a")).unwrap();
    }

    #[test]
    fn failed_write_leaves_cache_untouched() {
        let failing = FailingStore::new(MemoryStore::new(), FailurePolicy::OnKeySuffix(vec![":line".into()]));
        let switch = failing.switch();
        let mut d = Document::open(Box::new(failing)).unwrap();
        d.set_line(1, &line::from_text("old")).unwrap();
        switch.arm();
        assert!(d.set_line(1, &line::from_text("new")).is_err());
        assert_eq!(d.get_text(1).unwrap(), "old");
    }

    #[test]
    fn malformed_value_is_codec_error() {
        let mut store = MemoryStore::new();
        store.set("1:children", Value::from("nope")).unwrap();
        let mut d = Document::open(Box::new(store)).unwrap();
        let err = d.child_rows(1).unwrap_err();
        assert!(matches!(err, OutlineError::Store(StoreError::Codec { .. })));
    }
}
