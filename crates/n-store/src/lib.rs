// SPDX-License-Identifier: MIT
//
// n-store: the key-value store adapter behind n-outline documents.
//
// The outliner engine never talks to a database directly. It talks to a
// `Store`: a dictionary from string keys to JSON values with `get` and
// `set`, nothing more. Row content, adjacency, collapse flags, the id
// counter, macros and settings are all just keys (see `keys`). The engine
// layers its own cache on top, so a store only has to be a reliable
// dictionary.
//
// Calls are synchronous and return `Result`. Keys reach the engine through
// one queue and each is handled to completion, writes included, before the
// next, so a command never observes another command's partial writes. A
// backend with slow I/O blocks the caller; it does not interleave.
//
// Provided backends:
//
//   MemoryStore  → shared in-process map (clones see the same data)
//   FailingStore → wrapper that injects I/O failures on demand (tests)

pub mod failing;
pub mod keys;
pub mod memory;

use serde_json::Value;
use thiserror::Error;

pub use failing::{FailSwitch, FailingStore, FailurePolicy};
pub use memory::MemoryStore;

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Failure reported by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not complete the read or write.
    #[error("store backend error: {0}")]
    Backend(String),

    /// The backend does not provide this operation.
    #[error("store operation `{0}` is not implemented")]
    NotImplemented(&'static str),

    /// A stored value did not have the expected shape.
    #[error("malformed value under `{key}`: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

// ─── Store ──────────────────────────────────────────────────────────────────

/// A string-keyed dictionary of JSON values.
///
/// Both methods have defaults that fail with [`StoreError::NotImplemented`],
/// so a partial backend compiles but reports exactly which operation it is
/// missing the first time the engine needs it.
pub trait Store {
    /// Read the value under `key`. `Ok(None)` means the key was never set
    /// (or was cleared with `Value::Null`).
    ///
    /// # Errors
    ///
    /// Backend-specific I/O failure.
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _ = key;
        Err(StoreError::NotImplemented("get"))
    }

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Backend-specific I/O failure. On error the previous value must still
    /// be in place.
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let _ = (key, value);
        Err(StoreError::NotImplemented("set"))
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct Unfinished;
    impl Store for Unfinished {}

    #[test]
    fn missing_operations_report_not_implemented() {
        let mut store = Unfinished;
        assert!(matches!(
            store.get("k"),
            Err(StoreError::NotImplemented("get"))
        ));
        assert!(matches!(
            store.set("k", Value::Null),
            Err(StoreError::NotImplemented("set"))
        ));
    }

    #[test]
    fn boxed_store_delegates() {
        let mut store: Box<dyn Store> = Box::new(MemoryStore::new());
        store.set("a", Value::from(1)).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(Value::from(1)));
    }

    #[test]
    fn error_messages() {
        let err = StoreError::Backend("disk on fire".into());
        assert_eq!(err.to_string(), "store backend error: disk on fire");
        let err = StoreError::NotImplemented("set");
        assert_eq!(err.to_string(), "store operation `set` is not implemented");
    }
}
