//! Settings and the `:set` directive line.
//!
//! Each setting is stored under its own `settings:<name>` key so a document
//! carries its configuration with it. Two settings are typed and drive the
//! engine directly; everything else is free-form and kept as JSON for
//! whatever plugin reads it.
//!
//! | Name | Alias | Type | Default |
//! |------|-------|------|---------|
//! | `history_limit` | `historylimit` | integer | 500 |
//! | `jump_limit` | `jumplimit` | integer | 100 |
//! | `hotkeys` | | per-mode overrides | none |
//!
//! # Directive syntax
//!
//! | Syntax | Effect |
//! |--------|--------|
//! | `name` | enable a boolean, or show a number |
//! | `noname` | disable a boolean |
//! | `name!` | toggle a boolean |
//! | `name?` | show the current value |
//! | `name=value` | assign |
//! | (empty) | show every changed setting |

use std::collections::BTreeMap;

use n_store::keys;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::document::Document;
use crate::error::Result;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::jumplist::DEFAULT_JUMP_LIMIT;
use crate::keymap::Hotkeys;

const HISTORY_LIMIT: &str = "history_limit";
const JUMP_LIMIT: &str = "jump_limit";
const HOTKEYS: &str = "hotkeys";

// ---------------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------------

/// One parsed argument of a settings line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetDirective {
    On(String),
    Off(String),
    Toggle(String),
    Query(String),
    Assign(String, String),
    ShowChanged,
}

/// Canonical name of a numeric setting, if `name` is one.
#[must_use]
pub fn numeric_setting(name: &str) -> Option<&'static str> {
    match name {
        "history_limit" | "historylimit" => Some(HISTORY_LIMIT),
        "jump_limit" | "jumplimit" => Some(JUMP_LIMIT),
        _ => None,
    }
}

/// Parse a settings line. A leading `set` is accepted and ignored.
#[must_use]
pub fn parse_set(line: &str) -> Vec<SetDirective> {
    let trimmed = line.trim();
    let args = trimmed
        .strip_prefix("set ")
        .or_else(|| (trimmed == "set").then_some(""))
        .unwrap_or(trimmed)
        .trim();
    if args.is_empty() {
        return vec![SetDirective::ShowChanged];
    }
    args.split_whitespace().map(parse_set_arg).collect()
}

/// Parse one argument.
#[must_use]
pub fn parse_set_arg(arg: &str) -> SetDirective {
    if let Some((name, value)) = arg.split_once('=') {
        return SetDirective::Assign(name.to_string(), value.to_string());
    }
    if let Some(name) = arg.strip_suffix('?') {
        return SetDirective::Query(name.to_string());
    }
    if let Some(name) = arg.strip_suffix('!') {
        return SetDirective::Toggle(name.to_string());
    }
    if numeric_setting(arg).is_some() {
        return SetDirective::Query(arg.to_string());
    }
    // `nojump_limit` is not a thing, but `noisy` must stay `noisy`.
    if let Some(name) = arg.strip_prefix("no") {
        if !name.is_empty() && numeric_setting(name).is_none() {
            return SetDirective::Off(name.to_string());
        }
    }
    SetDirective::On(arg.to_string())
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub history_limit: usize,
    pub jump_limit: usize,
    pub hotkeys: Hotkeys,
    /// Free-form settings, read from the store on first use.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            jump_limit: DEFAULT_JUMP_LIMIT,
            hotkeys: Hotkeys::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Read the typed settings from `doc`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Store failure or a stored value of the wrong shape.
    pub fn load(doc: &mut Document) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            history_limit: doc
                .get_global(&keys::setting(HISTORY_LIMIT))?
                .unwrap_or(defaults.history_limit),
            jump_limit: doc
                .get_global(&keys::setting(JUMP_LIMIT))?
                .unwrap_or(defaults.jump_limit),
            hotkeys: doc.get_global(&keys::setting(HOTKEYS))?.unwrap_or_default(),
            extra: BTreeMap::new(),
        })
    }

    /// Persist the hotkey overrides.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn save_hotkeys(&self, doc: &mut Document) -> Result<()> {
        doc.set_global(&keys::setting(HOTKEYS), &self.hotkeys)
    }

    /// Current value of a free-form setting.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn get(&mut self, doc: &mut Document, name: &str) -> Result<Option<Value>> {
        if let Some(canonical) = numeric_setting(name) {
            let n = if canonical == HISTORY_LIMIT {
                self.history_limit
            } else {
                self.jump_limit
            };
            return Ok(Some(Value::from(n)));
        }
        if let Some(value) = self.extra.get(name) {
            return Ok(Some(value.clone()));
        }
        let value: Option<Value> = doc.get_global(&keys::setting(name))?;
        if let Some(value) = &value {
            self.extra.insert(name.to_string(), value.clone());
        }
        Ok(value)
    }

    fn set(&mut self, doc: &mut Document, name: &str, value: Value) -> Result<()> {
        debug!(name, %value, "setting changed");
        doc.set_global(&keys::setting(name), &value)?;
        self.extra.insert(name.to_string(), value);
        Ok(())
    }

    fn set_number(&mut self, doc: &mut Document, canonical: &'static str, n: usize) -> Result<()> {
        debug!(name = canonical, n, "setting changed");
        doc.set_global(&keys::setting(canonical), &n)?;
        if canonical == HISTORY_LIMIT {
            self.history_limit = n;
        } else {
            self.jump_limit = n;
        }
        Ok(())
    }

    /// Apply one directive. Returns a message to show, if any. Unknown
    /// values and type mismatches are reported in the message, not as
    /// errors.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn apply(&mut self, doc: &mut Document, directive: &SetDirective) -> Result<Option<String>> {
        match directive {
            SetDirective::Query(name) => Ok(Some(match self.get(doc, name)? {
                Some(value) => format!("{name}={}", display(&value)),
                None => format!("unknown setting: {name}"),
            })),
            SetDirective::On(name) | SetDirective::Off(name) => {
                if numeric_setting(name).is_some() {
                    return Ok(Some(format!("invalid argument: {name} is a number")));
                }
                let on = matches!(directive, SetDirective::On(_));
                self.set(doc, name, Value::Bool(on))?;
                Ok(None)
            }
            SetDirective::Toggle(name) => {
                if numeric_setting(name).is_some() {
                    return Ok(Some(format!("invalid argument: {name} is a number")));
                }
                match self.get(doc, name)? {
                    None | Some(Value::Bool(false)) => self.set(doc, name, Value::Bool(true))?,
                    Some(Value::Bool(true)) => self.set(doc, name, Value::Bool(false))?,
                    Some(_) => return Ok(Some(format!("invalid argument: {name} is not a boolean"))),
                }
                Ok(None)
            }
            SetDirective::Assign(name, raw) => {
                if let Some(canonical) = numeric_setting(name) {
                    return match raw.parse::<usize>() {
                        Ok(n) if n > 0 => {
                            self.set_number(doc, canonical, n)?;
                            Ok(None)
                        }
                        _ => Ok(Some(format!("invalid number: {name}={raw}"))),
                    };
                }
                let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw.as_str()));
                self.set(doc, name, value)?;
                Ok(None)
            }
            SetDirective::ShowChanged => {
                let defaults = Self::default();
                let mut parts = Vec::new();
                if self.history_limit != defaults.history_limit {
                    parts.push(format!("{HISTORY_LIMIT}={}", self.history_limit));
                }
                if self.jump_limit != defaults.jump_limit {
                    parts.push(format!("{JUMP_LIMIT}={}", self.jump_limit));
                }
                for (name, value) in &self.extra {
                    parts.push(format!("{name}={}", display(value)));
                }
                Ok(Some(parts.join(" ")))
            }
        }
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use n_store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn doc() -> (Document, MemoryStore) {
        let store = MemoryStore::new();
        (Document::open(Box::new(store.clone())).unwrap(), store)
    }

    #[test]
    fn parse_forms() {
        assert_eq!(parse_set_arg("wrap"), SetDirective::On("wrap".into()));
        assert_eq!(parse_set_arg("nowrap"), SetDirective::Off("wrap".into()));
        assert_eq!(parse_set_arg("wrap!"), SetDirective::Toggle("wrap".into()));
        assert_eq!(parse_set_arg("wrap?"), SetDirective::Query("wrap".into()));
        assert_eq!(
            parse_set_arg("jumplimit=5"),
            SetDirective::Assign("jumplimit".into(), "5".into())
        );
        assert_eq!(
            parse_set_arg("history_limit"),
            SetDirective::Query("history_limit".into())
        );
        assert_eq!(parse_set_arg("no"), SetDirective::On("no".into()));
    }

    #[test]
    fn parse_line() {
        assert_eq!(parse_set(""), vec![SetDirective::ShowChanged]);
        assert_eq!(parse_set("set"), vec![SetDirective::ShowChanged]);
        assert_eq!(
            parse_set("set a nob"),
            vec![SetDirective::On("a".into()), SetDirective::Off("b".into())]
        );
    }

    #[test]
    fn defaults_without_store_values() {
        let (mut d, _) = doc();
        let s = Settings::load(&mut d).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.history_limit, 500);
        assert_eq!(s.jump_limit, 100);
    }

    #[test]
    fn numbers_persist() {
        let (mut d, store) = doc();
        let mut s = Settings::load(&mut d).unwrap();
        let msg = s
            .apply(&mut d, &SetDirective::Assign("historylimit".into(), "3".into()))
            .unwrap();
        assert_eq!(msg, None);
        assert_eq!(s.history_limit, 3);

        let mut fresh = Document::open(Box::new(store)).unwrap();
        assert_eq!(Settings::load(&mut fresh).unwrap().history_limit, 3);
    }

    #[test]
    fn bad_number_reported() {
        let (mut d, _) = doc();
        let mut s = Settings::load(&mut d).unwrap();
        let msg = s
            .apply(&mut d, &SetDirective::Assign("jump_limit".into(), "lots".into()))
            .unwrap();
        assert_eq!(msg.as_deref(), Some("invalid number: jump_limit=lots"));
        assert_eq!(s.jump_limit, 100);
    }

    #[test]
    fn booleans_and_queries() {
        let (mut d, _) = doc();
        let mut s = Settings::load(&mut d).unwrap();
        s.apply(&mut d, &SetDirective::Toggle("spell".into())).unwrap();
        assert_eq!(
            s.apply(&mut d, &SetDirective::Query("spell".into())).unwrap().as_deref(),
            Some("spell=true")
        );
        s.apply(&mut d, &SetDirective::Off("spell".into())).unwrap();
        assert_eq!(s.get(&mut d, "spell").unwrap(), Some(Value::Bool(false)));
        assert_eq!(
            s.apply(&mut d, &SetDirective::Query("nothing".into())).unwrap().as_deref(),
            Some("unknown setting: nothing")
        );
    }

    #[test]
    fn assign_free_form_value() {
        let (mut d, _) = doc();
        let mut s = Settings::load(&mut d).unwrap();
        s.apply(&mut d, &SetDirective::Assign("theme".into(), "dark".into()))
            .unwrap();
        s.apply(&mut d, &SetDirective::Assign("width".into(), "80".into()))
            .unwrap();
        assert_eq!(
            s.apply(&mut d, &SetDirective::ShowChanged).unwrap().as_deref(),
            Some("theme=dark width=80")
        );
    }

    #[test]
    fn hotkeys_round_trip() {
        let (mut d, store) = doc();
        let mut s = Settings::load(&mut d).unwrap();
        s.hotkeys
            .entry("NORMAL".into())
            .or_default()
            .insert("undo".into(), vec!["U".into()]);
        s.save_hotkeys(&mut d).unwrap();
        let mut fresh = Document::open(Box::new(store)).unwrap();
        assert_eq!(Settings::load(&mut fresh).unwrap().hotkeys, s.hotkeys);
    }
}
