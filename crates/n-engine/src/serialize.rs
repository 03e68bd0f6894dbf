//! Serialized rows: the nested JSON form of a document or subtree.
//!
//! ```json
//! [
//!   { "text": "one", "id": 1, "children": ["uno"] },
//!   { "text": "two", "children": [{ "clone": 1 }, "dos"] }
//! ]
//! ```
//!
//! A row with nothing but text is written as a bare string. A clone is
//! expanded the first time a serialization pass meets it (tagged with its
//! `id`) and written as `{ "clone": id }` every later time, so the output is
//! finite and acyclic. Loading reverses this: ids in the input are local to
//! the input and map to freshly allocated rows.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::error::{OutlineError, Result};
use crate::line::{self, StyleMasks};
use crate::{ROOT, Row};

/// One serialized row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedRow {
    /// Text only.
    Text(String),
    /// A back-reference to a row defined earlier with the same `id`.
    Clone { clone: Row },
    /// Everything else.
    Block(Box<SerializedBlock>),
}

/// The full form of a serialized row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedBlock {
    pub text: String,
    #[serde(flatten)]
    pub styles: StyleMasks,
    #[serde(default, skip_serializing_if = "is_false")]
    pub collapsed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Row>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SerializedRow>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugins: BTreeMap<String, Value>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

impl SerializedRow {
    /// A text-only row.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A row with children.
    #[must_use]
    pub fn with_children(text: impl Into<String>, children: Vec<Self>) -> Self {
        Self::Block(Box::new(SerializedBlock {
            text: text.into(),
            children,
            ..SerializedBlock::default()
        }))
    }

    /// Parse a JSON document: either an array of rows or a single row.
    ///
    /// # Errors
    ///
    /// [`OutlineError::InvalidDocument`] if the JSON does not describe rows.
    pub fn parse_document(json: &str) -> Result<Vec<Self>> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| OutlineError::InvalidDocument(e.to_string()))?;
        let rows = match value {
            Value::Array(_) => serde_json::from_value(value),
            other => serde_json::from_value(other).map(|row| vec![row]),
        };
        rows.map_err(|e| OutlineError::InvalidDocument(e.to_string()))
    }

    /// Drop row-identity from this subtree: ids only matter for clones.
    fn simplify(self) -> Self {
        match self {
            Self::Block(block)
                if block.styles.is_empty()
                    && !block.collapsed
                    && block.id.is_none()
                    && block.children.is_empty()
                    && block.plugins.is_empty() =>
            {
                Self::Text(block.text)
            }
            other => other,
        }
    }
}

impl Document {
    /// Serialize `row` and its subtree.
    ///
    /// `emitted` tracks clones already expanded in this pass; pass the same
    /// set to serialize several rows as one document.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn serialize_row(&mut self, row: Row, emitted: &mut HashSet<Row>) -> Result<SerializedRow> {
        if emitted.contains(&row) {
            return Ok(SerializedRow::Clone { clone: row });
        }
        let is_clone = self.is_clone(row)?;
        if is_clone {
            emitted.insert(row);
        }
        let (text, styles) = line::to_masks(&self.get_line(row)?);
        let mut children = Vec::new();
        for child in self.child_rows(row)? {
            children.push(self.serialize_row(child, emitted)?);
        }
        let mut plugins = BTreeMap::new();
        for ns in self.plugin_namespaces()? {
            if let Some(value) = self.plugin_data(row, &ns)? {
                plugins.insert(ns, value);
            }
        }
        let block = SerializedBlock {
            text,
            styles,
            collapsed: self.collapsed(row)?,
            id: is_clone.then_some(row),
            children,
            plugins,
        };
        Ok(SerializedRow::Block(Box::new(block)).simplify())
    }

    /// Serialize several sibling rows as one pass.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn serialize_rows(&mut self, rows: &[Row]) -> Result<Vec<SerializedRow>> {
        let mut emitted = HashSet::new();
        rows.iter()
            .map(|&row| self.serialize_row(row, &mut emitted))
            .collect()
    }

    /// Serialize the whole document (the root's children).
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn serialize_document(&mut self) -> Result<Vec<SerializedRow>> {
        let rows = self.child_rows(ROOT)?;
        self.serialize_rows(&rows)
    }

    /// Plugin namespaces registered in this document.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn plugin_namespaces(&mut self) -> Result<Vec<String>> {
        Ok(self
            .get_global(n_store::keys::PLUGINS)?
            .unwrap_or_default())
    }

    /// Record a plugin namespace so its row data is serialized.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub fn register_plugin_namespace(&mut self, namespace: &str) -> Result<()> {
        let mut namespaces = self.plugin_namespaces()?;
        if !namespaces.iter().any(|n| n == namespace) {
            namespaces.push(namespace.to_string());
            self.set_global(n_store::keys::PLUGINS, &namespaces)?;
        }
        Ok(())
    }

    /// Create fresh, parentless rows for `rows`.
    ///
    /// Returns the top-level new rows. Every row created, in creation order,
    /// is appended to `created`.
    ///
    /// # Errors
    ///
    /// [`OutlineError::InvalidDocument`] for a `clone` reference to an id not
    /// defined earlier in `rows`; structural errors if a clone reference would
    /// create a cycle; store failure.
    pub fn load_detached(
        &mut self,
        rows: &[SerializedRow],
        created: &mut Vec<Row>,
    ) -> Result<Vec<Row>> {
        let mut ids = HashMap::new();
        let mut top = Vec::with_capacity(rows.len());
        for serialized in rows {
            top.push(self.load_one(serialized, &mut ids, created)?);
        }
        Ok(top)
    }

    fn load_one(
        &mut self,
        serialized: &SerializedRow,
        ids: &mut HashMap<Row, Row>,
        created: &mut Vec<Row>,
    ) -> Result<Row> {
        let text_only;
        let block = match serialized {
            SerializedRow::Clone { clone } => {
                return ids.get(clone).copied().ok_or_else(|| {
                    OutlineError::InvalidDocument(format!("clone of undefined id {clone}"))
                });
            }
            SerializedRow::Text(text) => {
                text_only = SerializedBlock {
                    text: text.clone(),
                    ..SerializedBlock::default()
                };
                &text_only
            }
            SerializedRow::Block(block) => block.as_ref(),
        };

        let row = self.new_row()?;
        created.push(row);
        if let Some(id) = block.id {
            ids.insert(id, row);
        }
        if !block.text.is_empty() {
            self.set_line(row, &line::from_masks(&block.text, &block.styles))?;
        }
        if block.collapsed {
            self.set_collapsed(row, true)?;
        }
        for (ns, value) in &block.plugins {
            self.register_plugin_namespace(ns)?;
            self.set_plugin_data(row, ns, value.clone())?;
        }
        for (index, child) in block.children.iter().enumerate() {
            let child_row = self.load_one(child, ids, created)?;
            self.attach_child(row, child_row, index)?;
        }
        Ok(row)
    }

    /// Load `rows` as children of `parent`, starting at `index`.
    ///
    /// # Errors
    ///
    /// Same as [`load_detached`](Self::load_detached).
    pub fn load_rows(&mut self, parent: Row, index: usize, rows: &[SerializedRow]) -> Result<Vec<Row>> {
        let mut created = Vec::new();
        let top = self.load_detached(rows, &mut created)?;
        for (offset, &row) in top.iter().enumerate() {
            self.attach_child(parent, row, index + offset)?;
        }
        Ok(top)
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
    use serde_json::json;

    fn doc() -> Document {
        Document::open(Box::new(MemoryStore::new())).unwrap()
    }

    fn rows(value: Value) -> Vec<SerializedRow> {
        serde_json::from_value(value).unwrap()
    }

    fn dump(d: &mut Document) -> Value {
        serde_json::to_value(d.serialize_document().unwrap()).unwrap()
    }

    #[test]
    fn untagged_forms() {
        let parsed = rows(json!(["a", {"clone": 3}, {"text": "b", "children": ["c"]}]));
        assert_eq!(parsed[0], SerializedRow::text("a"));
        assert_eq!(parsed[1], SerializedRow::Clone { clone: 3 });
        assert_eq!(
            parsed[2],
            SerializedRow::with_children("b", vec![SerializedRow::text("c")])
        );
    }

    #[test]
    fn load_then_serialize_is_stable() {
        let input = json!([
            {"text": "one", "children": ["uno", {"text": "deep", "collapsed": true, "children": ["x"]}]},
            "two",
            {"text": "bold", "bold": ".. ."}
        ]);
        let mut d = doc();
        d.load_rows(ROOT, 0, &rows(input.clone())).unwrap();
        assert_eq!(dump(&mut d), input);
    }

    #[test]
    fn clones_serialize_once() {
        let mut d = doc();
        d.load_rows(
            ROOT,
            0,
            &rows(json!([{"text": "one", "children": ["uno"]}, {"text": "two", "children": ["dos"]}])),
        )
        .unwrap();
        // one=1, uno=2, two=3, dos=4
        d.clone_row(1, 3, 0).unwrap();
        assert_eq!(
            dump(&mut d),
            json!([
                {"text": "one", "id": 1, "children": ["uno"]},
                {"text": "two", "children": [{"clone": 1}, "dos"]}
            ])
        );
    }

    #[test]
    fn clone_references_map_to_new_rows() {
        let mut d = doc();
        d.load_rows(ROOT, 0, &rows(json!(["first"]))).unwrap();
        let input = json!([
            {"text": "shared", "id": 40, "children": ["leaf"]},
            {"text": "holder", "children": [{"clone": 40}]}
        ]);
        let top = d.load_rows(ROOT, 1, &rows(input)).unwrap();
        assert_eq!(top, vec![2, 4]);
        assert!(d.is_clone(2).unwrap());
        assert_eq!(d.child_rows(4).unwrap(), vec![2]);
        assert_eq!(
            dump(&mut d),
            json!([
                "first",
                {"text": "shared", "id": 2, "children": ["leaf"]},
                {"text": "holder", "children": [{"clone": 2}]}
            ])
        );
    }

    #[test]
    fn undefined_clone_is_invalid() {
        let mut d = doc();
        let err = d.load_rows(ROOT, 0, &rows(json!([{"clone": 9}]))).unwrap_err();
        assert!(matches!(err, OutlineError::InvalidDocument(_)));
    }

    #[test]
    fn plugin_data_is_carried() {
        let mut d = doc();
        let input = json!([{"text": "task", "plugins": {"marks": "todo"}}]);
        d.load_rows(ROOT, 0, &rows(input.clone())).unwrap();
        assert_eq!(d.plugin_namespaces().unwrap(), vec!["marks".to_string()]);
        assert_eq!(dump(&mut d), input);
    }

    #[test]
    fn parse_document_accepts_single_row() {
        let one = SerializedRow::parse_document(r#"{"text": "solo", "collapsed": true}"#).unwrap();
        assert_eq!(one.len(), 1);
        assert!(matches!(&one[0], SerializedRow::Block(b) if b.text == "solo" && b.collapsed));
        let many = SerializedRow::parse_document(r#"["a", "b"]"#).unwrap();
        assert_eq!(many.len(), 2);
        assert!(SerializedRow::parse_document("{").is_err());
        assert!(SerializedRow::parse_document("42").is_err());
    }
}
