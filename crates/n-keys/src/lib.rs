// SPDX-License-Identifier: MIT
//
// n-keys: key tokens for n-outline.
//
// Every keystroke that reaches the outliner engine is a `KeyEvent`: a key
// code plus a modifier bitmask. Front-ends (terminal, browser bridge, test
// scripts) speak in string tokens like `"ctrl+shift+b"`, `"esc"` or `"a"`;
// this crate owns the one canonical mapping between the two so that macros
// stored in the document store and hotkey overrides in settings round-trip
// exactly.
//
// The `queue` module is the single-consumer channel that serializes key
// delivery: any number of emitters, exactly one receiver draining keys in
// arrival order.

pub mod key;
pub mod queue;

pub use key::{KeyCode, KeyEvent, KeyParseError, Modifiers, parse_keys};
pub use queue::{KeyEmitter, KeyReceiver, channel};
