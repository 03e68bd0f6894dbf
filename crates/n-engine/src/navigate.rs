//! Mode switches, zooming, the jump list and the SEARCH and SETTINGS
//! input lines.

use tracing::{debug, info};

use crate::error::Result;
use crate::jumplist::JumpEntry;
use crate::mode::Mode;
use crate::path::Path;
use crate::session::Session;
use crate::settings;

/// `v`, `V`. Switching between the two keeps the anchor.
pub(crate) fn enter_visual(s: &mut Session, mode: Mode) -> Result<bool> {
    let anchor = s.anchor.take();
    s.set_mode(mode)?;
    if anchor.is_some() {
        s.anchor = anchor;
    }
    Ok(true)
}

/// `o` in the visual modes.
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn swap_anchor(s: &mut Session) -> Result<bool> {
    let Some(anchor) = s.anchor.take() else {
        return Ok(false);
    };
    let cursor = std::mem::replace(&mut s.cursor, anchor);
    s.anchor = Some(cursor);
    Ok(true)
}

pub(crate) fn exit(s: &mut Session) -> Result<bool> {
    s.set_mode(Mode::Normal)?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Zoom
// ---------------------------------------------------------------------------

/// `]`: zoom one level towards the cursor.
pub(crate) fn zoom_in(s: &mut Session) -> Result<bool> {
    let target = s.cursor.path.prefix(s.view_root.depth() + 1);
    if target == s.cursor.path {
        return zoom_cursor(s);
    }
    s.set_view_root(target)?;
    Ok(true)
}

/// `[`
pub(crate) fn zoom_out(s: &mut Session) -> Result<bool> {
    let Some(parent) = s.view_root.parent() else {
        return Ok(false);
    };
    let old = s.view_root.clone();
    s.set_view_root(parent)?;
    if s.doc.collapsed(old.row())? {
        s.move_cursor(old, 0)?;
    }
    Ok(true)
}

/// `enter`: make the cursor row the view root.
pub(crate) fn zoom_cursor(s: &mut Session) -> Result<bool> {
    let path = s.cursor.path.clone();
    let Some(first) = s.doc.get_child(&path, 0)? else {
        debug!(row = path.row(), "nothing to zoom into");
        return Ok(false);
    };
    s.set_view_root(path)?;
    s.move_cursor(first, 0)?;
    Ok(true)
}

/// `shift+enter`
pub(crate) fn zoom_root(s: &mut Session) -> Result<bool> {
    if s.view_root.is_root() {
        return Ok(false);
    }
    s.set_view_root(Path::root())?;
    Ok(true)
}

/// `ctrl+o` (`back`) and `ctrl+i`. Entries whose rows have since been
/// deleted or moved are dropped on the way.
pub(crate) fn jump(s: &mut Session, back: bool) -> Result<bool> {
    let live = JumpEntry {
        view_root: s.view_root.clone(),
        cursor: s.cursor.path.clone(),
        col: s.cursor.col,
    };
    let doc = &mut s.doc;
    let is_valid = |e: &JumpEntry| -> Result<bool> {
        Ok(e.cursor.is_descendant_of(&e.view_root)
            && doc.is_valid_path(&e.view_root)?
            && doc.is_valid_path(&e.cursor)?)
    };
    let found = if back {
        s.jumps.back(live, is_valid)?
    } else {
        s.jumps.forward(is_valid)?
    };
    let Some(entry) = found else {
        return Ok(false);
    };
    debug!(view_root = %entry.view_root, "jump");
    s.view_root = entry.view_root;
    s.persist_view_root()?;
    s.move_cursor(entry.cursor, entry.col)?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Input lines
// ---------------------------------------------------------------------------

/// `/`, `:`
pub(crate) fn start_input(s: &mut Session, mode: Mode) -> Result<bool> {
    s.set_mode(mode)?;
    Ok(true)
}

/// `enter` on the SEARCH or SETTINGS line.
pub(crate) fn confirm_input(s: &mut Session) -> Result<bool> {
    match s.mode {
        Mode::Search => search(s),
        Mode::Settings => apply_settings(s),
        _ => Ok(false),
    }
}

/// Case-insensitive search over the visible rows, starting after the
/// cursor row and wrapping around. An empty query repeats the last one.
fn search(s: &mut Session) -> Result<bool> {
    let typed = std::mem::take(&mut s.input).trim().to_lowercase();
    s.set_mode(Mode::Normal)?;
    let query = if typed.is_empty() {
        match s.last_search.clone() {
            Some(q) => q,
            None => return Ok(false),
        }
    } else {
        typed
    };
    s.last_search = Some(query.clone());

    let rows = s.doc.visible_rows(&s.view_root)?;
    let start = rows
        .iter()
        .position(|p| *p == s.cursor.path)
        .map_or(0, |i| i + 1);
    for offset in 0..rows.len() {
        let path = &rows[(start + offset) % rows.len()];
        let text = s.doc.get_text(path.row())?.to_lowercase();
        if let Some(byte) = text.find(&query) {
            let col = text[..byte].chars().count();
            s.move_cursor(path.clone(), col)?;
            return Ok(true);
        }
    }
    s.status = Some(format!("Pattern not found: {query}"));
    Ok(false)
}

fn apply_settings(s: &mut Session) -> Result<bool> {
    let line = std::mem::take(&mut s.input);
    s.set_mode(Mode::Normal)?;
    let mut messages = Vec::new();
    for directive in settings::parse_set(&line) {
        if let Some(message) = s.settings.apply(&mut s.doc, &directive)? {
            messages.push(message);
        }
    }
    s.history.set_limit(s.settings.history_limit);
    s.jumps.set_limit(s.settings.jump_limit);
    info!(line = line.as_str(), "settings");
    s.status = (!messages.is_empty()).then(|| messages.join(", "));
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
