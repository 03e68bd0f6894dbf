//! Key bindings: per-mode tries from key sequences to commands and motions.
//!
//! Each mode owns a trie. A node may carry a binding, children, or both:
//!
//! - `g` has children (`g g`, `g p`, `g c`) and no binding: typing `g`
//!   waits for the next key.
//! - `d` is an operator: after it, the trie first looks at `d`'s own
//!   children (`d d`), then resolves the rest of the sequence as a motion
//!   from the root (`d w`, `d g g`, `d f x`).
//! - `f`, `r`, `q`, `@` take one character argument.
//! - A plain binding with children (`y` in VISUAL_LINE, which also has
//!   `y c`) fires on any other next key, and that key is handed back to be
//!   processed on its own.
//!
//! Tables are built once per session from the defaults merged with the
//! user's hotkey overrides. Two different names on the same key sequence
//! in one mode is a configuration error.

use std::collections::{BTreeMap, HashMap};

use n_keys::{KeyEvent, parse_keys};
use tracing::debug;

use crate::command::Command;
use crate::error::BindingError;
use crate::mode::Mode;
use crate::motion::Motion;

/// Hotkey overrides: mode name → command or motion name → key sequences.
///
/// ```json
/// { "NORMAL": { "undo": ["u", "ctrl+z"], "word-forward": ["w"] } }
/// ```
pub type Hotkeys = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// What a trie node resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Command(Command),
    /// A command that waits for a motion.
    Operator(Command),
    Motion(Motion),
}

impl Binding {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Command(c) | Self::Operator(c) => c.name(),
            Self::Motion(m) => m.name(),
        }
    }

    const fn takes_char(self) -> bool {
        match self {
            Self::Command(c) => c.takes_char(),
            Self::Operator(_) => false,
            Self::Motion(m) => m.takes_char(),
        }
    }
}

/// A fully resolved key sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Command {
        command: Command,
        arg: Option<char>,
    },
    Motion {
        motion: Motion,
        arg: Option<char>,
    },
    Operator {
        command: Command,
        motion: Motion,
        arg: Option<char>,
    },
}

impl Action {
    /// The command name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Command { command, .. } | Self::Operator { command, .. } => command.name(),
            Self::Motion { motion, .. } => motion.name(),
        }
    }
}

/// Result of looking up a pending key sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// A prefix of something; wait for more keys. `awaiting_char` is set
    /// when the next key is a character argument.
    Incomplete { awaiting_char: bool },
    /// Nothing is bound to this sequence.
    NoMatch,
    /// Run `action`. The last `leftover` keys were not part of it and must
    /// be processed again.
    Complete { action: Action, leftover: usize },
}

impl Lookup {
    const fn complete(action: Action) -> Self {
        Self::Complete {
            action,
            leftover: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Trie
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
struct Node {
    binding: Option<Binding>,
    children: HashMap<KeyEvent, Node>,
}

impl Node {
    fn walk(&self, keys: &[KeyEvent]) -> (&Self, usize) {
        let mut node = self;
        let mut used = 0;
        for key in keys {
            match node.children.get(key) {
                Some(child) => {
                    node = child;
                    used += 1;
                }
                None => break,
            }
        }
        (node, used)
    }
}

/// Key tables for every mode.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    tries: HashMap<Mode, Node>,
}

impl KeyBindings {
    /// The default tables merged with `hotkeys`. An override replaces every
    /// default sequence of the name it mentions in that mode.
    ///
    /// # Errors
    ///
    /// [`BindingError`] for unknown modes, names or key tokens, and for two
    /// names bound to one sequence.
    pub fn new(hotkeys: &Hotkeys) -> Result<Self, BindingError> {
        let mut table: BTreeMap<Mode, BTreeMap<&str, Vec<String>>> = BTreeMap::new();
        for (mode, name, seqs) in default_table() {
            table
                .entry(mode)
                .or_default()
                .entry(name)
                .or_default()
                .extend(seqs.iter().map(ToString::to_string));
        }
        for (mode_name, names) in hotkeys {
            let mode = Mode::from_name(mode_name)
                .ok_or_else(|| BindingError::UnknownMode(mode_name.clone()))?;
            let entry = table.entry(mode).or_default();
            for (name, seqs) in names {
                debug!(mode = mode_name.as_str(), name = name.as_str(), "hotkey override");
                entry.insert(name.as_str(), seqs.clone());
            }
        }

        let mut tries = HashMap::new();
        for (mode, names) in table {
            let root: &mut Node = tries.entry(mode).or_default();
            for (name, seqs) in names {
                let binding = resolve_name(mode, name)?;
                for seq in seqs {
                    insert(root, mode, &seq, binding)?;
                }
            }
        }
        Ok(Self { tries })
    }

    /// Resolve the pending `keys` in `mode`. While a macro is `recording`,
    /// a bare `q` stops it instead of waiting for a register.
    #[must_use]
    pub fn lookup(&self, mode: Mode, keys: &[KeyEvent], recording: bool) -> Lookup {
        let Some(root) = self.tries.get(&mode) else {
            return Lookup::NoMatch;
        };
        if keys.is_empty() {
            return Lookup::Incomplete {
                awaiting_char: false,
            };
        }
        let (node, used) = root.walk(keys);
        let rest = &keys[used..];
        let Some(binding) = node.binding else {
            return if rest.is_empty() && !node.children.is_empty() {
                Lookup::Incomplete {
                    awaiting_char: false,
                }
            } else {
                Lookup::NoMatch
            };
        };

        match binding {
            Binding::Operator(command) => {
                if rest.is_empty() {
                    return Lookup::Incomplete {
                        awaiting_char: false,
                    };
                }
                match resolve_motion(root, rest) {
                    Lookup::Complete {
                        action: Action::Motion { motion, arg },
                        leftover,
                    } => Lookup::Complete {
                        action: Action::Operator {
                            command,
                            motion,
                            arg,
                        },
                        leftover,
                    },
                    Lookup::Complete { .. } => Lookup::NoMatch,
                    other => other,
                }
            }
            Binding::Command(Command::RecordMacro) if recording => {
                if rest.is_empty() {
                    Lookup::complete(Action::Command {
                        command: Command::RecordMacro,
                        arg: None,
                    })
                } else {
                    Lookup::NoMatch
                }
            }
            _ if binding.takes_char() => with_char_arg(binding, rest),
            _ if rest.is_empty() && !node.children.is_empty() => Lookup::Incomplete {
                awaiting_char: false,
            },
            _ => Lookup::Complete {
                action: plain_action(binding, None),
                leftover: rest.len(),
            },
        }
    }

    /// Every (keys, name) bound in `mode`, sorted, for help tables.
    #[must_use]
    pub fn bindings(&self, mode: Mode) -> Vec<(String, &'static str)> {
        fn collect(node: &Node, prefix: &mut Vec<String>, out: &mut Vec<(String, &'static str)>) {
            if let Some(binding) = node.binding {
                out.push((prefix.join(" "), binding.name()));
            }
            for (key, child) in &node.children {
                prefix.push(key.to_string());
                collect(child, prefix, out);
                prefix.pop();
            }
        }
        let mut out = Vec::new();
        if let Some(root) = self.tries.get(&mode) {
            collect(root, &mut Vec::new(), &mut out);
        }
        out.sort_unstable();
        out
    }
}

fn plain_action(binding: Binding, arg: Option<char>) -> Action {
    match binding {
        Binding::Command(command) | Binding::Operator(command) => Action::Command { command, arg },
        Binding::Motion(motion) => Action::Motion { motion, arg },
    }
}

fn with_char_arg(binding: Binding, rest: &[KeyEvent]) -> Lookup {
    match rest {
        [] => Lookup::Incomplete {
            awaiting_char: true,
        },
        [key] => key
            .printable()
            .map_or(Lookup::NoMatch, |ch| Lookup::complete(plain_action(binding, Some(ch)))),
        _ => Lookup::NoMatch,
    }
}

/// The motion spelled by `keys`, from the mode's root.
fn resolve_motion(root: &Node, keys: &[KeyEvent]) -> Lookup {
    let (node, used) = root.walk(keys);
    let rest = &keys[used..];
    match node.binding {
        Some(binding @ Binding::Motion(m)) => {
            if m.takes_char() {
                with_char_arg(binding, rest)
            } else if rest.is_empty() {
                Lookup::complete(Action::Motion { motion: m, arg: None })
            } else {
                Lookup::NoMatch
            }
        }
        Some(_) => Lookup::NoMatch,
        None if rest.is_empty() && !node.children.is_empty() => Lookup::Incomplete {
            awaiting_char: false,
        },
        None => Lookup::NoMatch,
    }
}

fn resolve_name(mode: Mode, name: &str) -> Result<Binding, BindingError> {
    if let Some(motion) = Motion::from_name(name) {
        return Ok(Binding::Motion(motion));
    }
    let command =
        Command::from_name(name).ok_or_else(|| BindingError::UnknownCommand(name.to_string()))?;
    Ok(if mode == Mode::Normal && command.is_operator() {
        Binding::Operator(command)
    } else {
        Binding::Command(command)
    })
}

fn insert(root: &mut Node, mode: Mode, seq: &str, binding: Binding) -> Result<(), BindingError> {
    let keys = parse_keys(seq)?;
    let mut node = root;
    for key in &keys {
        node = node.children.entry(*key).or_default();
    }
    match node.binding {
        Some(existing) if existing != binding => Err(BindingError::DuplicateBinding {
            mode: mode.name().to_string(),
            keys: seq.to_string(),
            existing: existing.name().to_string(),
            command: binding.name().to_string(),
        }),
        _ => {
            node.binding = Some(binding);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Motion keys shared by NORMAL and the visual modes.
const MOTION_KEYS: &[(&str, &[&str])] = &[
    ("left", &["h", "left"]),
    ("right", &["l", "right"]),
    ("up", &["k", "up"]),
    ("down", &["j", "down"]),
    ("line-start", &["0", "home"]),
    ("first-non-blank", &["^"]),
    ("line-end", &["$", "end"]),
    ("word-forward", &["w"]),
    ("word-backward", &["b"]),
    ("word-end", &["e"]),
    ("big-word-forward", &["W"]),
    ("big-word-backward", &["B"]),
    ("big-word-end", &["E"]),
    ("document-start", &["g g"]),
    ("document-end", &["G"]),
    ("find-forward", &["f"]),
    ("find-backward", &["F"]),
    ("till-forward", &["t"]),
    ("till-backward", &["T"]),
    ("repeat-find", &[";"]),
    ("repeat-find-reverse", &[","]),
    ("parent", &["g p"]),
    ("next-clone", &["g c"]),
];

const FORMATTING_KEYS: &[(&str, &[&str])] = &[
    ("toggle-bold", &["ctrl+b"]),
    ("toggle-italic", &["ctrl+shift+i"]),
    ("toggle-underline", &["ctrl+u"]),
    ("toggle-strikethrough", &["ctrl+enter"]),
];

const NORMAL_KEYS: &[(&str, &[&str])] = &[
    ("insert", &["i", "insert"]),
    ("insert-after", &["a"]),
    ("insert-line-start", &["I"]),
    ("insert-line-end", &["A"]),
    ("new-row-below", &["o"]),
    ("new-row-above", &["O"]),
    ("visual", &["v"]),
    ("visual-line", &["V"]),
    ("delete-char", &["x", "delete"]),
    ("delete-char-before", &["X"]),
    ("delete", &["d"]),
    ("delete-rows", &["d d"]),
    ("delete-to-end", &["D"]),
    ("change", &["c"]),
    ("change-row", &["c c", "S"]),
    ("change-to-end", &["C"]),
    ("substitute", &["s"]),
    ("yank", &["y"]),
    ("yank-rows", &["y y", "Y"]),
    ("yank-clone", &["y c"]),
    ("paste-after", &["p"]),
    ("paste-before", &["P"]),
    ("replace-char", &["r"]),
    ("swap-case", &["~"]),
    ("join-rows", &["J"]),
    ("undo", &["u"]),
    ("redo", &["ctrl+r"]),
    ("repeat", &["."]),
    ("record-macro", &["q"]),
    ("play-macro", &["@"]),
    ("indent", &[">", "tab", "ctrl+l"]),
    ("unindent", &["<", "shift+tab", "ctrl+h"]),
    ("swap-down", &["ctrl+j"]),
    ("swap-up", &["ctrl+k"]),
    ("toggle-collapse", &["z"]),
    ("zoom-in", &["]"]),
    ("zoom-out", &["["]),
    ("zoom-cursor", &["enter"]),
    ("zoom-root", &["shift+enter"]),
    ("jump-back", &["ctrl+o"]),
    ("jump-forward", &["ctrl+i"]),
    ("search", &["/"]),
    ("settings", &[":"]),
];

const INSERT_KEYS: &[(&str, &[&str])] = &[
    ("left", &["left"]),
    ("right", &["right"]),
    ("up", &["up"]),
    ("down", &["down"]),
    ("line-start", &["home"]),
    ("line-end", &["end"]),
    ("split-row", &["enter"]),
    ("backspace", &["backspace"]),
    ("delete-forward", &["delete"]),
    ("delete-word-back", &["ctrl+w"]),
    ("indent", &["tab"]),
    ("unindent", &["shift+tab"]),
    ("undo", &["ctrl+z"]),
    ("exit", &["esc"]),
];

const VISUAL_KEYS: &[(&str, &[&str])] = &[
    ("delete", &["d", "x"]),
    ("change", &["c"]),
    ("yank", &["y"]),
    ("swap-case", &["~"]),
    ("swap-anchor", &["o"]),
    ("visual-line", &["V"]),
    ("exit", &["esc"]),
];

const VISUAL_LINE_KEYS: &[(&str, &[&str])] = &[
    ("delete", &["d", "x"]),
    ("yank", &["y"]),
    ("yank-clone", &["y c"]),
    ("indent", &[">"]),
    ("unindent", &["<"]),
    ("toggle-collapse", &["z"]),
    ("swap-anchor", &["o"]),
    ("visual", &["v"]),
    ("exit", &["esc"]),
];

const INPUT_LINE_KEYS: &[(&str, &[&str])] = &[
    ("confirm", &["enter"]),
    ("backspace", &["backspace"]),
    ("exit", &["esc"]),
];

fn default_table() -> Vec<(Mode, &'static str, &'static [&'static str])> {
    let groups: [(Mode, &[&[(&str, &[&str])]]); 6] = [
        (Mode::Normal, &[MOTION_KEYS, NORMAL_KEYS, FORMATTING_KEYS]),
        (Mode::Insert, &[INSERT_KEYS, FORMATTING_KEYS]),
        (Mode::Visual, &[MOTION_KEYS, VISUAL_KEYS, FORMATTING_KEYS]),
        (Mode::VisualLine, &[MOTION_KEYS, VISUAL_LINE_KEYS]),
        (Mode::Search, &[INPUT_LINE_KEYS]),
        (Mode::Settings, &[INPUT_LINE_KEYS]),
    ];
    let mut out = Vec::new();
    for (mode, tables) in groups {
        for table in tables {
            for &(name, seqs) in *table {
                out.push((mode, name, seqs));
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
