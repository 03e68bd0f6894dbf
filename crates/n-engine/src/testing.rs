//! Test harness: a session over an in-memory document, driven by key
//! scripts and checked against serialized JSON.

use n_store::{MemoryStore, Store};
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::document::Document;
use crate::error::Result;
use crate::mode::Mode;
use crate::serialize::SerializedRow;
use crate::session::Session;
use crate::ROOT;

pub(crate) struct TestCase {
    pub session: Session,
}

impl TestCase {
    /// A fresh session whose document is `rows`.
    pub fn new(rows: Value) -> Self {
        Self::with_store(MemoryStore::new(), rows)
    }

    pub fn with_store(store: impl Store + 'static, rows: Value) -> Self {
        let mut doc = Document::open(Box::new(store)).unwrap();
        let rows: Vec<SerializedRow> = serde_json::from_value(rows).unwrap();
        doc.load_rows(ROOT, 0, &rows).unwrap();
        Self {
            session: Session::with_document(doc).unwrap(),
        }
    }

    #[track_caller]
    pub fn send_keys(&mut self, script: &str) -> &mut Self {
        if let Err(err) = self.session.handle_keys(script) {
            panic!("`{script}` failed: {err}");
        }
        self
    }

    pub fn try_keys(&mut self, script: &str) -> Result<()> {
        self.session.handle_keys(script)
    }

    #[track_caller]
    pub fn expect(&mut self, expected: Value) -> &mut Self {
        let actual = serde_json::to_value(self.session.serialize().unwrap()).unwrap();
        assert_eq!(actual, expected);
        self
    }

    /// The cursor is on a row reading `text`, at `col`.
    #[track_caller]
    pub fn expect_cursor(&mut self, text: &str, col: usize) -> &mut Self {
        let row = self.session.cursor().row();
        let actual = self.session.document().get_text(row).unwrap();
        assert_eq!((actual.as_str(), self.session.cursor().col), (text, col));
        self
    }

    /// The register holds characters reading `text`.
    #[track_caller]
    pub fn expect_register(&mut self, text: &str) -> &mut Self {
        assert_eq!(self.session.register().text().as_deref(), Some(text));
        self
    }

    #[track_caller]
    pub fn expect_mode(&mut self, mode: Mode) -> &mut Self {
        assert_eq!(self.session.mode(), mode);
        self
    }

    /// The view root's text; the document root reads as `""`.
    #[track_caller]
    pub fn expect_view_root(&mut self, text: &str) -> &mut Self {
        let row = self.session.view_root().row();
        let actual = self.session.document().get_text(row).unwrap();
        assert_eq!(actual, text);
        self
    }
}
