//! Paths: one concrete position of a row in the DAG.
//!
//! A row with several parents (a clone) appears in several places at once.
//! A [`Path`] picks one of them: the chain of row ids from the document root
//! (excluded) down to the row. Two paths are equal when their chains are
//! equal, not when they end at the same row.
//!
//! Paths are plain values. They never own rows and can go stale when the
//! document changes; [`Document::is_valid_path`](crate::Document::is_valid_path)
//! checks one against the current structure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ROOT, Row};

/// An ancestry chain from (but excluding) the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    rows: Vec<Row>,
}

impl Path {
    /// The path of the document root.
    #[must_use]
    pub const fn root() -> Self {
        Self { rows: Vec::new() }
    }

    /// A path from an explicit chain. A leading root id is dropped.
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut rows: Vec<Row> = rows.into_iter().collect();
        if rows.first() == Some(&ROOT) {
            rows.remove(0);
        }
        Self { rows }
    }

    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The row this path points at.
    #[inline]
    #[must_use]
    pub fn row(&self) -> Row {
        self.rows.last().copied().unwrap_or(ROOT)
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows below the root.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.rows.len()
    }

    /// The parent position, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.rows.is_empty() {
            return None;
        }
        Some(Self {
            rows: self.rows[..self.rows.len() - 1].to_vec(),
        })
    }

    /// The row id of the parent position (the root for top-level rows).
    #[must_use]
    pub fn parent_row(&self) -> Row {
        match self.rows.len() {
            0 | 1 => ROOT,
            n => self.rows[n - 2],
        }
    }

    /// This path extended by `row`.
    #[must_use]
    pub fn child(&self, row: Row) -> Self {
        let mut rows = self.rows.clone();
        rows.push(row);
        Self { rows }
    }

    /// The first `depth` steps of this path.
    #[must_use]
    pub fn prefix(&self, depth: usize) -> Self {
        Self {
            rows: self.rows[..depth.min(self.rows.len())].to_vec(),
        }
    }

    /// True if `ancestor` is a strict prefix of this path.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.rows.len() > ancestor.rows.len() && self.rows.starts_with(&ancestor.rows)
    }

    /// True if the chain passes through `row` (the root counts).
    #[must_use]
    pub fn contains(&self, row: Row) -> bool {
        row == ROOT || self.rows.contains(&row)
    }

    /// Replace row ids through `map`. Ids not in the map are kept.
    pub fn remap(&mut self, map: impl Fn(Row) -> Row) {
        for row in &mut self.rows {
            *row = map(*row);
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ROOT}")?;
        for row in &self.rows {
            write!(f, "/{row}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_path() {
        let root = Path::root();
        assert!(root.is_root());
        assert_eq!(root.row(), ROOT);
        assert_eq!(root.parent(), None);
        assert_eq!(root.to_string(), "0");
    }

    #[test]
    fn child_and_parent() {
        let p = Path::root().child(3).child(7);
        assert_eq!(p.row(), 7);
        assert_eq!(p.parent_row(), 3);
        assert_eq!(p.parent(), Some(Path::from_rows([3])));
        assert_eq!(p.depth(), 2);
        assert_eq!(p.to_string(), "0/3/7");
    }

    #[test]
    fn from_rows_drops_root() {
        assert_eq!(Path::from_rows([0, 4]), Path::from_rows([4]));
    }

    #[test]
    fn descendant() {
        let a = Path::from_rows([1]);
        let b = Path::from_rows([1, 2]);
        assert!(b.is_descendant_of(&a));
        assert!(b.is_descendant_of(&Path::root()));
        assert!(!a.is_descendant_of(&a));
        assert!(!a.is_descendant_of(&b));
    }

    #[test]
    fn equality_is_chain_equality() {
        let a = Path::from_rows([1, 5]);
        let b = Path::from_rows([2, 5]);
        assert_eq!(a.row(), b.row());
        assert_ne!(a, b);
    }

    #[test]
    fn remap_rows() {
        let mut p = Path::from_rows([1, 2, 3]);
        p.remap(|r| if r == 2 { 9 } else { r });
        assert_eq!(p.rows(), &[1, 9, 3]);
    }

    #[test]
    fn prefix_and_contains() {
        let p = Path::from_rows([4, 5, 6]);
        assert_eq!(p.prefix(1), Path::from_rows([4]));
        assert_eq!(p.prefix(10), p);
        assert!(p.contains(5));
        assert!(p.contains(ROOT));
        assert!(!p.contains(9));
    }
}
