//! Jump history: positions visited through zooming.
//!
//! Every zoom (`]`, `[`, `enter`, `shift+enter`) pushes the pre-zoom
//! (view root, cursor) snapshot. `ctrl+o` walks back, `ctrl+i` forward.
//!
//! When the pointer is at the end of the list we're at the "live" position.
//! The first [`back`](JumpHistory::back) saves the live position so
//! [`forward`](JumpHistory::forward) can return to it.
//!
//! Entries can go stale as rows are deleted or moved. Traversal asks the
//! caller whether an entry is still valid and drops the ones that are not,
//! so the list prunes itself lazily.

use crate::error::Result;
use crate::path::Path;

/// Default bound on the jump history.
pub const DEFAULT_JUMP_LIMIT: usize = 100;

/// One remembered position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpEntry {
    pub view_root: Path,
    pub cursor: Path,
    pub col: usize,
}

/// Capped, browser-style navigation history.
#[derive(Debug)]
pub struct JumpHistory {
    entries: Vec<JumpEntry>,
    /// Index into `entries`; `entries.len()` when at the live position.
    current: usize,
    limit: usize,
}

impl JumpHistory {
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            current: 0,
            limit,
        }
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        self.trim();
    }

    fn trim(&mut self) {
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
            self.current = self.current.saturating_sub(excess);
        }
    }

    /// Record the position left by a zoom.
    ///
    /// Navigating mid-list discards the forward entries. A push with the
    /// same view root as the newest entry replaces it.
    pub fn push(&mut self, entry: JumpEntry) {
        if self.current < self.entries.len() {
            self.entries.truncate(self.current);
        }
        if let Some(last) = self.entries.last_mut() {
            if last.view_root == entry.view_root {
                *last = entry;
                self.current = self.entries.len();
                return;
            }
        }
        self.entries.push(entry);
        self.trim();
        self.current = self.entries.len();
    }

    /// Go back (`ctrl+o`). `live` is the position being left.
    ///
    /// # Errors
    ///
    /// Whatever `is_valid` returns.
    pub fn back(
        &mut self,
        live: JumpEntry,
        mut is_valid: impl FnMut(&JumpEntry) -> Result<bool>,
    ) -> Result<Option<JumpEntry>> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        if self.current >= self.entries.len() {
            if self.entries.last().is_none_or(|e| e.view_root != live.view_root) {
                self.entries.push(live);
            }
            self.current = self.entries.len() - 1;
        }
        while self.current > 0 {
            self.current -= 1;
            if is_valid(&self.entries[self.current])? {
                return Ok(Some(self.entries[self.current].clone()));
            }
            self.entries.remove(self.current);
        }
        Ok(None)
    }

    /// Go forward (`ctrl+i`).
    ///
    /// # Errors
    ///
    /// Whatever `is_valid` returns.
    pub fn forward(
        &mut self,
        mut is_valid: impl FnMut(&JumpEntry) -> Result<bool>,
    ) -> Result<Option<JumpEntry>> {
        while self.current + 1 < self.entries.len() {
            let next = self.current + 1;
            if is_valid(&self.entries[next])? {
                self.current = next;
                return Ok(Some(self.entries[next].clone()));
            }
            self.entries.remove(next);
        }
        Ok(None)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for JumpHistory {
    fn default() -> Self {
        Self::new(DEFAULT_JUMP_LIMIT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
