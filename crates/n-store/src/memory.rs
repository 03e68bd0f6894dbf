// SPDX-License-Identifier: MIT
//
// In-memory store.
//
// The map lives behind `Rc<RefCell<..>>` so that cloning a `MemoryStore`
// yields a second handle onto the same data. That is how two sessions end
// up "sharing a database" in tests (multiple-writer detection), and how a
// test keeps a handle for inspection after handing the store to a session.
//
// Single-threaded: `Rc` is not `Send`.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde_json::Value;

use crate::{Store, StoreError};

/// A shared in-process dictionary.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Rc<RefCell<HashMap<String, Value>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys holding a non-null value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    /// True if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }

    /// A sorted copy of the whole store. Two snapshots compare equal iff the
    /// stores hold exactly the same keys and values.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.data
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.data.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        tracing::trace!(key, "memory store set");
        let mut data = self.data.borrow_mut();
        if value.is_null() {
            data.remove(key);
        } else {
            data.insert(key.to_string(), value);
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
