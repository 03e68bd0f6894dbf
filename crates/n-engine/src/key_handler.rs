//! Key handling: raw keys in, executed commands out.
//!
//! ```text
//! key ─► macro recording ─► mode key transforms ─► pending sequence
//!     ─► keymap lookup ─► execute (one history unit) ─► fix cursor
//! ```
//!
//! Counts are folded in by the NORMAL and visual key transforms. Digits
//! typed before each part of a command multiply: `2d3w` runs `dw` with a
//! count of six.
//!
//! Everything here runs on the caller's thread, one key at a time. A key
//! is fully processed (including any store writes) before the next one is
//! looked at, so commands never interleave in the history.
//!
//! # Repeat
//!
//! `.` replays the keys of the last repeatable command issued from NORMAL
//! mode. If that command entered INSERT, every key up to leaving INSERT is
//! part of the unit, so `ihello<esc>` repeats as a whole.
//!
//! # Macros
//!
//! `q{reg}` records raw keys until the next `q`; `@{reg}` feeds them back
//! through the same pipeline. One replay invocation is one history entry.
//! Macros are stored in the document under the `macros` key.

use std::collections::BTreeMap;

use n_keys::KeyEvent;
use tracing::{debug, info, trace, warn};

use crate::command::Command;
use crate::dispatch;
use crate::error::Result;
use crate::keymap::{Action, Lookup};
use crate::mode::Mode;
use crate::session::Session;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Largest count a command runs with. Longer digit runs and products of
/// factors are clamped to it.
pub const MAX_COUNT: usize = 10_000;

/// The keys behind one `.` unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotRepeat {
    pub count: Option<usize>,
    pub keys: Vec<KeyEvent>,
}

/// Per-session key pipeline state.
#[derive(Debug, Default)]
pub struct KeyState {
    /// Keys of the command being typed.
    seq: Vec<KeyEvent>,
    /// One count per part of the command (`2d3w` → `[2, 3]`).
    factors: Vec<usize>,
    /// Count being typed right now.
    digits: Option<usize>,
    awaiting_char: bool,
    pub(crate) recording: Option<(char, Vec<KeyEvent>)>,
    pub(crate) macros: BTreeMap<String, Vec<KeyEvent>>,
    /// Registers whose macros are being replayed, innermost last.
    replaying: Vec<char>,
    last_dot: Option<DotRepeat>,
    /// A repeat unit still collecting INSERT keys.
    dot_pending: Option<DotRepeat>,
    dot_replaying: bool,
}

impl KeyState {
    /// The next key is a character argument (`f`, `r`, `q`, `@`).
    #[must_use]
    pub const fn awaiting_char(&self) -> bool {
        self.awaiting_char
    }

    #[must_use]
    pub const fn has_digits(&self) -> bool {
        self.digits.is_some()
    }

    pub fn push_digit(&mut self, digit: u32) {
        let d = usize::try_from(digit).unwrap_or(0);
        let typed = self.digits.unwrap_or(0).saturating_mul(10).saturating_add(d);
        self.digits = Some(typed.min(MAX_COUNT));
    }

    /// Keys typed so far for the pending command.
    #[must_use]
    pub fn pending(&self) -> &[KeyEvent] {
        &self.seq
    }

    /// The register being recorded into.
    #[must_use]
    pub fn recording(&self) -> Option<char> {
        self.recording.as_ref().map(|(reg, _)| *reg)
    }

    #[must_use]
    pub fn macro_keys(&self, register: char) -> Option<&[KeyEvent]> {
        self.macros.get(&register.to_string()).map(Vec::as_slice)
    }

    #[must_use]
    pub const fn last_repeat(&self) -> Option<&DotRepeat> {
        self.last_dot.as_ref()
    }

    fn take_count(&mut self) -> Option<usize> {
        if self.factors.is_empty() {
            None
        } else {
            let product = self.factors.drain(..).fold(1, usize::saturating_mul);
            Some(product.min(MAX_COUNT))
        }
    }

    fn reset(&mut self) {
        self.seq.clear();
        self.factors.clear();
        self.digits = None;
        self.awaiting_char = false;
    }
}

const fn is_repeatable(action: Action) -> bool {
    match action {
        Action::Command { command, .. } => command.is_repeatable(),
        Action::Operator { command, .. } => !matches!(command, Command::Yank),
        Action::Motion { .. } => false,
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

impl Session {
    /// Process one key.
    ///
    /// # Errors
    ///
    /// The command this key completed failed; whatever it changed has been
    /// rolled back and the cursor and mode restored.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.closed {
            debug!(%key, "session closed, key dropped");
            return Ok(());
        }
        trace!(%key, mode = %self.mode, "key");
        if self.keys.replaying.is_empty() {
            if let Some((_, keys)) = &mut self.keys.recording {
                keys.push(key);
            }
        }
        self.process(key)
    }

    /// Run `key` through the pipeline without recording it into a macro.
    pub(crate) fn process(&mut self, key: KeyEvent) -> Result<()> {
        if self.mode == Mode::Insert && !self.keys.dot_replaying {
            if let Some(dot) = &mut self.keys.dot_pending {
                dot.keys.push(key);
            }
        }
        let result = self.dispatch_key(key);
        if self.mode != Mode::Insert {
            if let Some(dot) = self.keys.dot_pending.take() {
                self.keys.last_dot = Some(dot);
            }
        }
        result?;
        self.fix_cursor()?;
        if let Some(every) = self.mode.metadata().every {
            every(self)?;
        }
        Ok(())
    }

    fn dispatch_key(&mut self, mut key: KeyEvent) -> Result<()> {
        for transform in self.mode.metadata().key_transforms {
            match transform(self, key)? {
                Some(next) => key = next,
                None => return Ok(()),
            }
        }

        if let Some(n) = self.keys.digits.take() {
            self.keys.factors.push(n);
        }
        self.keys.seq.push(key);
        let recording = self.keys.recording.is_some();
        match self.bindings.lookup(self.mode, &self.keys.seq, recording) {
            Lookup::Incomplete { awaiting_char } => {
                self.keys.awaiting_char = awaiting_char;
                Ok(())
            }
            Lookup::NoMatch => {
                debug!(%key, mode = %self.mode, "no binding");
                if self.mode.is_insert_like() {
                    self.keys.seq.pop();
                } else {
                    self.keys.reset();
                }
                Ok(())
            }
            Lookup::Complete { action, leftover } => {
                let split = self.keys.seq.len() - leftover;
                let rest = self.keys.seq.split_off(split);
                let used = std::mem::take(&mut self.keys.seq);
                let count = self.keys.take_count();
                self.keys.reset();
                self.execute(action, count, &used)?;
                for key in rest {
                    self.process(key)?;
                }
                Ok(())
            }
        }
    }

    /// Run one resolved action as one history unit.
    fn execute(&mut self, action: Action, count: Option<usize>, keys: &[KeyEvent]) -> Result<()> {
        debug!(command = action.name(), ?count, mode = %self.mode, "execute");
        if let Action::Command { command, arg } = action {
            match command {
                Command::Undo => return self.undo(count),
                Command::Redo => return self.redo(count),
                Command::Repeat => return self.repeat(count),
                Command::RecordMacro => return self.record_macro(arg, keys.len()),
                Command::PlayMacro => return self.play_macro(arg, count),
                _ => {}
            }
        }

        let mode_before = self.mode;
        let cursor_before = self.cursor.clone();
        let anchor_before = self.anchor.clone();
        let mark = self.history.begin(&self.cursor);

        match dispatch::run(self, action, count) {
            Ok(applied) => {
                if !applied {
                    self.history.rewind_to(&mut self.doc, mark)?;
                }
                if self.mode != Mode::Insert {
                    self.history.commit(&self.cursor);
                }
                if mode_before == Mode::Normal && !self.keys.dot_replaying && is_repeatable(action) {
                    let dot = DotRepeat {
                        count,
                        keys: keys.to_vec(),
                    };
                    if self.mode == Mode::Insert {
                        self.keys.dot_pending = Some(dot);
                    } else {
                        self.keys.last_dot = Some(dot);
                    }
                }
                Ok(())
            }
            Err(err) => {
                warn!(command = action.name(), %err, "command failed, rolling back");
                if let Err(rewind) = self.history.rewind_to(&mut self.doc, mark) {
                    warn!(%rewind, "rollback incomplete");
                }
                self.cursor = cursor_before;
                self.mode = mode_before;
                self.anchor = anchor_before;
                if mode_before != Mode::Insert {
                    self.keys.dot_pending = None;
                    if !self.history.in_group() {
                        self.history.discard_pending();
                    }
                }
                Err(err)
            }
        }
    }

    fn undo(&mut self, count: Option<usize>) -> Result<()> {
        for _ in 0..count.unwrap_or(1) {
            match self.history.undo(&mut self.doc, &self.cursor)? {
                Some(cursor) => self.restore_cursor(cursor)?,
                None => {
                    self.status = Some("Already at oldest change".into());
                    break;
                }
            }
        }
        Ok(())
    }

    fn redo(&mut self, count: Option<usize>) -> Result<()> {
        for _ in 0..count.unwrap_or(1) {
            match self.history.redo(&mut self.doc)? {
                Some(cursor) => self.restore_cursor(cursor)?,
                None => {
                    self.status = Some("Already at newest change".into());
                    break;
                }
            }
        }
        Ok(())
    }

    fn repeat(&mut self, count: Option<usize>) -> Result<()> {
        let Some(dot) = self.keys.last_dot.clone() else {
            return Ok(());
        };
        let count = count.or(dot.count);
        debug!(keys = dot.keys.len(), ?count, "repeat");
        self.keys.dot_replaying = true;
        self.keys.reset();
        if let Some(n) = count {
            self.keys.factors.push(n);
        }
        let result = dot.keys.iter().try_for_each(|&key| self.process(key));
        self.keys.dot_replaying = false;
        result
    }

    /// Start recording into `register`, or stop the current recording.
    /// `stop_keys` is how many keys the stop command took; they are not part
    /// of the macro.
    fn record_macro(&mut self, register: Option<char>, stop_keys: usize) -> Result<()> {
        if let Some((reg, mut keys)) = self.keys.recording.take() {
            keys.truncate(keys.len().saturating_sub(stop_keys));
            info!(register = %reg, keys = keys.len(), "macro recorded");
            self.keys.macros.insert(reg.to_string(), keys);
            return self.doc.set_global(n_store::keys::MACROS, &self.keys.macros);
        }
        if let Some(reg) = register {
            debug!(register = %reg, "recording macro");
            self.keys.recording = Some((reg, Vec::new()));
        }
        Ok(())
    }

    fn play_macro(&mut self, register: Option<char>, count: Option<usize>) -> Result<()> {
        let Some(reg) = register else {
            return Ok(());
        };
        if self.keys.replaying.contains(&reg) {
            debug!(register = %reg, "recursive macro ignored");
            return Ok(());
        }
        let Some(keys) = self.keys.macros.get(&reg.to_string()).cloned() else {
            self.status = Some(format!("Register {reg} is empty"));
            return Ok(());
        };
        debug!(register = %reg, keys = keys.len(), ?count, "replaying macro");
        self.keys.replaying.push(reg);
        self.history.open_group(&self.cursor);
        let mut result = Ok(());
        'replay: for _ in 0..count.unwrap_or(1) {
            for &key in &keys {
                if let Err(err) = self.process(key) {
                    result = Err(err);
                    break 'replay;
                }
            }
        }
        self.keys.replaying.pop();
        self.history.close_group(&self.cursor);
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
