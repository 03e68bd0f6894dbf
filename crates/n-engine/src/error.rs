//! Error types for the outliner core.
//!
//! Structural violations and store failures are real errors. A command that
//! merely cannot apply (indenting the first row, pasting a clone under its
//! own descendant) is not: it returns `Ok(false)` and leaves no trace in the
//! undo history.

use n_keys::KeyParseError;
use n_store::StoreError;
use thiserror::Error;

use crate::Row;

/// A change that would break the document's DAG shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// `child` is `parent` or one of its ancestors.
    #[error("attaching row {child} under row {parent} would create a cycle")]
    Cycle { parent: Row, child: Row },

    /// `parent` already has `child` as a direct child.
    #[error("row {child} is already a child of row {parent}")]
    DuplicateParent { parent: Row, child: Row },
}

/// A key binding table that cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// Two commands claim the same key sequence in one mode.
    #[error("{mode}: `{keys}` is bound to both `{existing}` and `{command}`")]
    DuplicateBinding {
        mode: String,
        keys: String,
        existing: String,
        command: String,
    },

    /// A hotkey override names a command that does not exist.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    /// A hotkey override names a mode that does not exist.
    #[error("unknown mode `{0}`")]
    UnknownMode(String),

    /// A hotkey override contains a malformed key token.
    #[error(transparent)]
    InvalidKey(#[from] KeyParseError),
}

/// Every error the outliner core can surface.
#[derive(Debug, Error)]
pub enum OutlineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// Another session wrote to the same store since we last did.
    #[error("document was modified by another session (last save {theirs}, ours {ours})")]
    MultipleWriter { ours: u64, theirs: u64 },

    /// A serialized document could not be loaded.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Binding(#[from] BindingError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OutlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = StructuralError::Cycle {
            parent: 3,
            child: 1,
        };
        assert_eq!(
            err.to_string(),
            "attaching row 1 under row 3 would create a cycle"
        );

        let err = OutlineError::from(StructuralError::DuplicateParent {
            parent: 0,
            child: 2,
        });
        assert_eq!(err.to_string(), "row 2 is already a child of row 0");

        let err = OutlineError::MultipleWriter { ours: 5, theirs: 9 };
        assert!(err.to_string().contains("another session"));
    }

    #[test]
    fn binding_error_from_key_error() {
        let err = BindingError::from(KeyParseError::Empty);
        assert_eq!(err.to_string(), "empty key token");
    }
}
