// SPDX-License-Identifier: MIT
//
// n-outline: a modal, tree-structured outliner with clones.
//
// This binary is a thin driver over the engine crates:
//
//   n-store  → key-value persistence (in memory here)
//   n-keys   → key tokens and the single-consumer key queue
//   n-engine → document DAG, mutations, history, modal key dispatch
//
// It loads a document, feeds a key script through the queue and prints the
// resulting document and cursor:
//
//   --doc FILE      JSON rows to start from (empty document without it)
//   --keys SCRIPT   space-separated key tokens: "i h i esc"
//   --compact       one-line JSON instead of pretty-printed
//
// Logs go to stderr and are controlled by RUST_LOG; stdout carries only the
// result, so it can be piped.

use std::env;
use std::fs;
use std::process;

use n_engine::{BindingError, Document, OutlineError, ROOT, SerializedRow, Session};
use n_keys::channel;
use n_store::MemoryStore;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    doc: Option<String>,
    keys: Option<String>,
    compact: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut out = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--doc" => out.doc = Some(args.next().ok_or("--doc needs a file")?),
            "--keys" => out.keys = Some(args.next().ok_or("--keys needs a script")?),
            "--compact" => out.compact = true,
            other => return Err(format!("unknown argument `{other}`")),
        }
    }
    Ok(out)
}

#[derive(Debug, Error)]
enum Failure {
    #[error("{0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("cannot render output: {0}")]
    Render(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] OutlineError),
}

fn run(args: &Args) -> Result<String, Failure> {
    let mut doc = Document::open(Box::new(MemoryStore::new()))?;
    if let Some(path) = &args.doc {
        let json = fs::read_to_string(path).map_err(|e| Failure::Io(path.clone(), e))?;
        let rows = SerializedRow::parse_document(&json)?;
        let loaded = doc.load_rows(ROOT, 0, &rows)?;
        info!(path = path.as_str(), rows = loaded.len(), "document loaded");
    }
    let mut session = Session::with_document(doc)?;

    if let Some(script) = &args.keys {
        let (emitter, receiver) = channel();
        emitter
            .emit_script(script)
            .map_err(|e| OutlineError::from(BindingError::from(e)))?;
        session.pump(&receiver)?;
        debug!(mode = %session.mode(), "keys done");
    }

    let rows = session.serialize()?;
    let cursor = session.cursor().clone();
    let text = session.document().get_text(cursor.row())?;
    let out = serde_json::json!({
        "document": rows,
        "cursor": { "path": cursor.path.rows(), "col": cursor.col, "text": text },
        "mode": session.mode().name(),
    });
    let rendered = if args.compact {
        serde_json::to_string(&out)?
    } else {
        serde_json::to_string_pretty(&out)?
    };
    Ok(rendered)
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let args = parse_args(env::args().skip(1)).unwrap_or_else(|msg| {
        eprintln!("n-outline: {msg}");
        eprintln!("usage: n-outline [--doc FILE] [--keys SCRIPT] [--compact]");
        process::exit(1);
    });

    match run(&args) {
        Ok(out) => println!("{out}"),
        Err(err) => {
            eprintln!("n-outline: {err}");
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(ToString::to_string))
    }

    #[test]
    fn parses_flags() {
        let a = args(&["--doc", "x.json", "--keys", "i a esc", "--compact"]).unwrap();
        assert_eq!(a.doc.as_deref(), Some("x.json"));
        assert_eq!(a.keys.as_deref(), Some("i a esc"));
        assert!(a.compact);
    }

    #[test]
    fn rejects_bad_flags() {
        assert!(args(&["--doc"]).is_err());
        assert!(args(&["--verbose"]).is_err());
    }

    #[test]
    fn runs_keys_on_empty_document() {
        let a = args(&["--keys", "i h i esc", "--compact"]).unwrap();
        let out: serde_json::Value = serde_json::from_str(&run(&a).unwrap()).unwrap();
        assert_eq!(out["document"], serde_json::json!(["hi"]));
        assert_eq!(out["cursor"]["col"], 1);
        assert_eq!(out["mode"], "NORMAL");
    }

    #[test]
    fn bad_key_is_an_error() {
        let a = args(&["--keys", "hyper+x"]).unwrap();
        assert!(run(&a).is_err());
    }
}
