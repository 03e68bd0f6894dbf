// SPDX-License-Identifier: MIT
//
// Key queue: many emitters, one consumer.
//
// Front-ends push keys through a `KeyEmitter` whenever they arrive. The
// engine owns the single `KeyReceiver` and drains it between commands, so a
// key that arrives while a command is still running waits its turn instead
// of interleaving with it. There is no other locking.
//
// Shutdown is cooperative: dropping (or closing) the receiver makes every
// subsequent `emit` report `false`. Work already dequeued runs to
// completion.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::key::{KeyEvent, KeyParseError, parse_keys};

/// Create a connected emitter/receiver pair.
#[must_use]
pub fn channel() -> (KeyEmitter, KeyReceiver) {
    let (tx, rx) = mpsc::channel();
    (KeyEmitter { tx }, KeyReceiver { rx })
}

// ─── Emitter ────────────────────────────────────────────────────────────────

/// Producer side of the key queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct KeyEmitter {
    tx: Sender<KeyEvent>,
}

impl KeyEmitter {
    /// Enqueue one key. Returns `false` once the receiver is gone.
    pub fn emit(&self, key: KeyEvent) -> bool {
        self.tx.send(key).is_ok()
    }

    /// Parse and enqueue a whitespace-separated key script.
    ///
    /// Returns `Ok(false)` if the receiver closed part-way through.
    ///
    /// # Errors
    ///
    /// Fails before enqueuing anything if any token is malformed.
    pub fn emit_script(&self, script: &str) -> Result<bool, KeyParseError> {
        let keys = parse_keys(script)?;
        Ok(keys.into_iter().all(|key| self.emit(key)))
    }
}

// ─── Receiver ───────────────────────────────────────────────────────────────

/// Consumer side of the key queue. Exactly one exists per channel.
#[derive(Debug)]
pub struct KeyReceiver {
    rx: Receiver<KeyEvent>,
}

impl KeyReceiver {
    /// Take the next queued key without blocking.
    #[must_use]
    pub fn try_next(&self) -> Option<KeyEvent> {
        self.rx.try_recv().ok()
    }

    /// Iterate over every key queued right now, in arrival order.
    pub fn drain(&self) -> impl Iterator<Item = KeyEvent> + '_ {
        self.rx.try_iter()
    }

    /// Stop accepting keys. Emitters see `false` from now on.
    pub fn close(self) {
        drop(self.rx);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
