//! Session: one user editing one document.
//!
//! The session owns everything a command can touch (the document, cursor,
//! mode, view root, history, register, jump list, settings) and passes
//! itself by `&mut` into command handlers. Nothing is global.
//!
//! Document changes made by commands go through [`Session::apply`], which
//! validates the mutation, applies it and records it in the pending history
//! entry. A mutation that fails validation is a constraint violation: it is
//! skipped, logged at `debug`, and reported as `Ok(false)`.

use n_keys::{KeyReceiver, parse_keys};
use n_store::{Store, keys};
use tracing::{debug, info};

use crate::cursor::Cursor;
use crate::document::{Document, ViewContents};
use crate::error::{OutlineError, Result};
use crate::history::History;
use crate::jumplist::{JumpEntry, JumpHistory};
use crate::key_handler::KeyState;
use crate::keymap::KeyBindings;
use crate::mode::Mode;
use crate::motion::Motion;
use crate::mutation::Mutation;
use crate::path::Path;
use crate::register::Register;
use crate::serialize::SerializedRow;
use crate::settings::Settings;
use crate::{ROOT, Row};

/// An editing session over one document.
#[derive(Debug)]
pub struct Session {
    pub(crate) doc: Document,
    pub(crate) cursor: Cursor,
    pub(crate) mode: Mode,
    pub(crate) view_root: Path,
    /// The other end of a visual selection.
    pub(crate) anchor: Option<Cursor>,
    pub(crate) history: History,
    pub(crate) register: Register,
    pub(crate) jumps: JumpHistory,
    pub(crate) settings: Settings,
    pub(crate) bindings: KeyBindings,
    pub(crate) keys: KeyState,
    /// The SEARCH or SETTINGS input line.
    pub(crate) input: String,
    pub(crate) last_find: Option<(Motion, char)>,
    pub(crate) last_search: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) closed: bool,
}

impl Session {
    /// Open a session over `store`.
    ///
    /// # Errors
    ///
    /// Store failure, or hotkey settings that do not build a key table.
    pub fn new(store: Box<dyn Store>) -> Result<Self> {
        Self::with_document(Document::open(store)?)
    }

    /// Open a session over an already opened document.
    ///
    /// Restores settings, macros and the last view root. An empty document
    /// gets one empty row, which is not part of the undo history.
    ///
    /// # Errors
    ///
    /// Store failure, or hotkey settings that do not build a key table.
    pub fn with_document(mut doc: Document) -> Result<Self> {
        let settings = Settings::load(&mut doc)?;
        let bindings = KeyBindings::new(&settings.hotkeys)?;
        let mut keys = KeyState::default();
        keys.macros = doc.get_global(keys::MACROS)?.unwrap_or_default();

        if !doc.has_children(ROOT)? {
            let row = doc.new_row()?;
            doc.attach_child(ROOT, row, 0)?;
        }
        let view_root = match doc.get_global::<Vec<Row>>(keys::LAST_VIEW_ROOT)? {
            Some(rows) => {
                let path = Path::from_rows(rows);
                if doc.is_valid_path(&path)? && doc.has_children(path.row())? {
                    path
                } else {
                    Path::root()
                }
            }
            None => Path::root(),
        };
        let first = doc
            .first_visible(&view_root)?
            .ok_or_else(|| OutlineError::InvalidDocument("view root has no rows".into()))?;

        let mut session = Self {
            doc,
            cursor: Cursor::new(first, 0),
            mode: Mode::Normal,
            view_root,
            anchor: None,
            history: History::new(settings.history_limit),
            register: Register::new(),
            jumps: JumpHistory::new(settings.jump_limit),
            settings,
            bindings,
            keys,
            input: String::new(),
            last_find: None,
            last_search: None,
            status: None,
            closed: false,
        };
        session.fix_cursor()?;
        info!(view_root = %session.view_root, "session opened");
        Ok(session)
    }

    // -- Public surface -----------------------------------------------------

    /// Process a whitespace-separated key script (`"d w"`, `"i h i esc"`).
    ///
    /// # Errors
    ///
    /// A malformed token (nothing is processed), or the first command
    /// that fails.
    pub fn handle_keys(&mut self, script: &str) -> Result<()> {
        let keys = parse_keys(script).map_err(crate::error::BindingError::from)?;
        for key in keys {
            self.handle_key(key)?;
        }
        Ok(())
    }

    /// Drain every key currently queued on `receiver`.
    ///
    /// # Errors
    ///
    /// The first command that fails; later keys stay queued.
    pub fn pump(&mut self, receiver: &KeyReceiver) -> Result<()> {
        while let Some(key) = receiver.try_next() {
            self.handle_key(key)?;
        }
        Ok(())
    }

    /// Stop accepting keys.
    pub fn close(&mut self) {
        debug!("session closed");
        self.closed = true;
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn document(&mut self) -> &mut Document {
        &mut self.doc
    }

    #[must_use]
    pub const fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub const fn view_root(&self) -> &Path {
        &self.view_root
    }

    #[must_use]
    pub const fn register(&self) -> &Register {
        &self.register
    }

    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// The SEARCH or SETTINGS line being typed.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub const fn keys(&self) -> &KeyState {
        &self.keys
    }

    /// The whole document in serialized form.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn serialize(&mut self) -> Result<Vec<SerializedRow>> {
        self.doc.serialize_document()
    }

    /// What a renderer shows under the current view root.
    ///
    /// # Errors
    ///
    /// Store failure (only with `force_load`).
    pub fn view(&mut self, force_load: bool) -> Result<ViewContents> {
        self.doc.view_contents(&self.view_root, force_load)
    }

    // -- Mutations ----------------------------------------------------------

    /// Validate, apply and record one mutation. `Ok(false)` means it did
    /// not apply to the current document and nothing was changed.
    pub(crate) fn apply(&mut self, mutation: Mutation) -> Result<bool> {
        Ok(self.apply_with(mutation, |_| ())?.is_some())
    }

    /// [`apply`](Self::apply), then read something off the applied
    /// mutation.
    pub(crate) fn apply_with<T>(
        &mut self,
        mut mutation: Mutation,
        read: impl FnOnce(&Mutation) -> T,
    ) -> Result<Option<T>> {
        if !mutation.validate(&mut self.doc)? {
            debug!(mutation = mutation.name(), "constraint violation, skipped");
            return Ok(None);
        }
        mutation.mutate(&mut self.doc)?;
        let out = read(&mutation);
        self.history.record(&self.cursor, mutation);
        Ok(Some(out))
    }

    /// Create rows from `rows` under `parent`. Returns the new top-level
    /// rows.
    pub(crate) fn add_blocks(
        &mut self,
        parent: Row,
        index: usize,
        rows: Vec<SerializedRow>,
    ) -> Result<Option<Vec<Row>>> {
        self.apply_with(Mutation::add_blocks(parent, index, rows), |m| {
            m.added_rows().to_vec()
        })
    }

    /// Detach `count` children of `parent` from `index`. Returns them.
    pub(crate) fn detach_blocks(
        &mut self,
        parent: Row,
        index: usize,
        count: usize,
    ) -> Result<Option<Vec<Row>>> {
        self.apply_with(Mutation::detach_blocks(parent, index, count), |m| {
            m.detached_rows().to_vec()
        })
    }

    /// Move `row` from `old_parent` to `new_parent` at `new_index`.
    pub(crate) fn move_block(
        &mut self,
        row: Row,
        old_parent: Row,
        new_parent: Row,
        new_index: usize,
    ) -> Result<bool> {
        self.apply(Mutation::move_block(row, old_parent, 0, new_parent, new_index))
    }

    // -- Modes --------------------------------------------------------------

    /// Switch modes, running the old mode's exit hook and the new mode's
    /// enter hook.
    pub(crate) fn set_mode(&mut self, mode: Mode) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        if let Some(exit) = self.mode.metadata().exit {
            exit(self)?;
        }
        debug!(from = %self.mode, to = %mode, "mode change");
        self.mode = mode;
        if let Some(enter) = mode.metadata().enter {
            enter(self)?;
        }
        Ok(())
    }

    // -- Cursor and view ----------------------------------------------------

    /// Length of the cursor row's line.
    pub(crate) fn cursor_len(&mut self) -> Result<usize> {
        self.doc.line_len(self.cursor.row())
    }

    /// Put the cursor on `path` at `col`, clamped to the line.
    pub(crate) fn move_cursor(&mut self, path: Path, col: usize) -> Result<()> {
        let len = self.doc.line_len(path.row())?;
        self.cursor.set_path(path, col);
        self.cursor.clamp(len, self.mode.cursor_past_end());
        Ok(())
    }

    /// Bring the cursor back to a valid, visible position under the view
    /// root after the document changed underneath it.
    pub(crate) fn fix_cursor(&mut self) -> Result<()> {
        if !self.doc.is_valid_path(&self.view_root)? {
            let fallback = self.doc.canonical_path(self.view_root.row())?;
            self.view_root = fallback.unwrap_or_else(Path::root);
        }
        if self.doc.first_visible(&self.view_root)?.is_none() && !self.view_root.is_root() {
            debug!(view_root = %self.view_root, "view root emptied, back to root");
            self.view_root = Path::root();
        }

        let path = self.cursor.path.clone();
        let valid = path.is_descendant_of(&self.view_root) && self.doc.is_valid_path(&path)?;
        if !valid {
            let canonical = self
                .doc
                .canonical_path(path.row())?
                .filter(|p| p.is_descendant_of(&self.view_root));
            let replacement = match canonical {
                Some(p) => Some(p),
                None => self.doc.first_visible(&self.view_root)?,
            };
            let Some(replacement) = replacement else {
                return Ok(());
            };
            debug!(from = %path, to = %replacement, "cursor relocated");
            self.cursor.path = replacement;
        }

        // Under a collapsed ancestor: move up to the outermost one.
        let depth = self.view_root.depth();
        for d in depth + 1..self.cursor.path.depth() {
            let ancestor = self.cursor.path.prefix(d);
            if self.doc.collapsed(ancestor.row())? {
                self.cursor.path = ancestor;
                break;
            }
        }

        let len = self.cursor_len()?;
        self.cursor.clamp(len, self.mode.cursor_past_end());
        Ok(())
    }

    /// Change the view root, remembering where we were and persisting it.
    pub(crate) fn set_view_root(&mut self, root: Path) -> Result<()> {
        if root == self.view_root {
            return Ok(());
        }
        self.jumps.push(JumpEntry {
            view_root: self.view_root.clone(),
            cursor: self.cursor.path.clone(),
            col: self.cursor.col,
        });
        self.view_root = root;
        self.persist_view_root()
    }

    pub(crate) fn persist_view_root(&mut self) -> Result<()> {
        debug!(view_root = %self.view_root, "view root");
        self.doc.set_global(keys::LAST_VIEW_ROOT, self.view_root.rows())
    }

    /// Restore a cursor saved by the history, widening the view root if it
    /// lies outside.
    pub(crate) fn restore_cursor(&mut self, cursor: Cursor) -> Result<()> {
        if !cursor.path.is_descendant_of(&self.view_root) {
            let common = self
                .view_root
                .rows()
                .iter()
                .zip(cursor.path.rows())
                .take_while(|(a, b)| a == b)
                .count();
            self.view_root = cursor
                .path
                .prefix(common.min(cursor.path.depth().saturating_sub(1)));
            self.persist_view_root()?;
        }
        self.cursor = cursor;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
