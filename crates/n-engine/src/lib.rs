//! # n-engine: outliner core for n-outline
//!
//! A document is a DAG of rows. Every row has a line of styled characters
//! and an ordered list of children; a row with more than one parent is a
//! *clone* and shows up, with the same text and children, everywhere it is
//! attached. This crate holds the whole editing model:
//!
//! - **[`path`]**, **[`document`]**: rows, paths through the DAG and the
//!   store-backed document with its visibility rules
//! - **[`line`]**, **[`serialize`]**: styled text and the nested JSON form
//! - **[`mutation`]**, **[`history`]**: reversible edits and undo/redo
//! - **[`cursor`]**, **[`motion`]**, **[`word`]**: where the cursor can go
//! - **[`mode`]**, **[`command`]**, **[`keymap`]**, **[`key_handler`]**:
//!   vim-style modal key dispatch with counts, repeat and macros
//! - **[`register`]**, **[`jumplist`]**, **[`settings`]**: session state
//!   beside the document
//! - **[`session`]**: one user editing one document, driven by keys
//!
//! Storage goes through the `n_store::Store` trait. Keys come in as
//! `n_keys::KeyEvent`s.

pub mod command;
pub mod cursor;
pub mod document;
pub mod error;
pub mod history;
pub mod jumplist;
pub mod key_handler;
pub mod keymap;
pub mod line;
pub mod mode;
pub mod motion;
pub mod mutation;
pub mod path;
pub mod register;
pub mod serialize;
pub mod session;
pub mod settings;
pub mod word;

mod blocks;
mod dispatch;
mod edit;
mod navigate;

#[cfg(test)]
mod testing;

/// Row identifier. Ids are allocated from a persisted counter and never
/// reused.
pub type Row = u64;

/// The root row. It has no text and no parent and is never detached.
pub const ROOT: Row = 0;

pub use command::Command;
pub use cursor::Cursor;
pub use document::{Document, ViewContents, ViewRow};
pub use error::{BindingError, OutlineError, Result, StructuralError};
pub use keymap::{Hotkeys, KeyBindings};
pub use line::{Cell, Line, Style};
pub use mode::Mode;
pub use motion::Motion;
pub use mutation::Mutation;
pub use path::Path;
pub use register::{Register, RegisterContent};
pub use serialize::{SerializedBlock, SerializedRow};
pub use session::Session;
pub use settings::Settings;
