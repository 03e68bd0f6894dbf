//! Routing a resolved [`Action`] to the code that runs it.
//!
//! Every handler returns `Ok(true)` if it did something and `Ok(false)` if
//! it was a no-op (nothing to delete, a constraint violation, a motion off
//! the edge). On `Ok(false)` the key handler rewinds whatever the handler
//! recorded, so a half-done command never reaches the history.

use crate::command::Command;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::keymap::Action;
use crate::line::Style;
use crate::mode::Mode;
use crate::motion::{self, Motion, MotionEnv};
use crate::session::Session;
use crate::{blocks, edit, navigate};

pub(crate) fn run(s: &mut Session, action: Action, count: Option<usize>) -> Result<bool> {
    match action {
        Action::Motion { motion, arg } => run_motion(s, motion, arg, count.unwrap_or(1)),
        Action::Operator {
            command,
            motion,
            arg,
        } => run_operator(s, command, motion, arg, count.unwrap_or(1)),
        Action::Command { command, arg } => run_command(s, command, arg, count.unwrap_or(1)),
    }
}

/// Resolve `motion` from the cursor, remembering character searches for
/// `;` and `,`.
pub(crate) fn resolve_motion(
    s: &mut Session,
    motion: Motion,
    arg: Option<char>,
    count: usize,
    for_operator: bool,
) -> Result<Option<Cursor>> {
    if motion.takes_char() {
        if let Some(ch) = arg {
            s.last_find = Some((motion, ch));
        }
    }
    let mut env = MotionEnv {
        doc: &mut s.doc,
        view_root: &s.view_root,
        past_end: s.mode.cursor_past_end(),
        for_operator,
        last_find: s.last_find,
    };
    motion::resolve(&mut env, &s.cursor, motion, arg, count)
}

const fn style_of(command: Command) -> Option<Style> {
    match command {
        Command::ToggleBold => Some(Style::BOLD),
        Command::ToggleItalic => Some(Style::ITALIC),
        Command::ToggleUnderline => Some(Style::UNDERLINE),
        Command::ToggleStrikethrough => Some(Style::STRIKETHROUGH),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Motions
// ---------------------------------------------------------------------------

fn run_motion(s: &mut Session, motion: Motion, arg: Option<char>, count: usize) -> Result<bool> {
    // VISUAL_LINE selections stay among one parent's children.
    if s.mode == Mode::VisualLine && matches!(motion, Motion::Up | Motion::Down) {
        let Some(parent) = s.cursor.path.parent() else {
            return Ok(false);
        };
        let Some(index) = s.doc.index_in_parent(&s.cursor.path)? else {
            return Ok(false);
        };
        let last = s.doc.child_rows(parent.row())?.len().saturating_sub(1);
        let target = if motion == Motion::Down {
            index.saturating_add(count).min(last)
        } else {
            index.saturating_sub(count)
        };
        if target == index {
            return Ok(false);
        }
        let Some(path) = s.doc.get_child(&parent, target)? else {
            return Ok(false);
        };
        let col = s.cursor.col;
        s.move_cursor(path, col)?;
        return Ok(true);
    }

    let Some(target) = resolve_motion(s, motion, arg, count, false)? else {
        return Ok(false);
    };
    match s.mode {
        Mode::Visual if target.path != s.cursor.path => return Ok(false),
        Mode::VisualLine => {
            let anchor_parent = s.anchor.as_ref().and_then(|a| a.path.parent());
            if target.path.parent() != anchor_parent {
                return Ok(false);
            }
        }
        _ => {}
    }
    s.cursor = target;
    if s.mode == Mode::Insert {
        let line = s.doc.get_line(s.cursor.row())?;
        s.cursor.refresh_style(&line);
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

fn run_operator(
    s: &mut Session,
    command: Command,
    motion: Motion,
    arg: Option<char>,
    count: usize,
) -> Result<bool> {
    if motion.is_row_motion() {
        // `dj`, `yk`: whole rows among the cursor's siblings.
        return match (command, motion) {
            (Command::Delete | Command::Yank, Motion::Down | Motion::Up) => {
                let Some(index) = s.doc.index_in_parent(&s.cursor.path)? else {
                    return Ok(false);
                };
                let (start, n) = if motion == Motion::Down {
                    (index, count.saturating_add(1))
                } else {
                    let start = index.saturating_sub(count);
                    (start, index - start + 1)
                };
                if command == Command::Delete {
                    blocks::delete_rows_at(s, start, n)
                } else {
                    blocks::yank_rows_at(s, start, n, false)
                }
            }
            _ => Ok(false),
        };
    }

    // `cw` changes to the end of the word, like `ce`.
    let motion = match (command, motion) {
        (Command::Change, Motion::WordForward) => Motion::WordEnd,
        (Command::Change, Motion::BigWordForward) => Motion::BigWordEnd,
        _ => motion,
    };
    let Some(target) = resolve_motion(s, motion, arg, count, true)? else {
        return Ok(false);
    };
    let len = s.cursor_len()?;
    let Some((start, end)) = motion::char_range(&s.cursor, &target, motion, len) else {
        return Ok(false);
    };
    match command {
        Command::Delete => {
            let deleted = edit::delete_cells(s, start, end)?;
            s.cursor.set_col(start);
            Ok(deleted)
        }
        Command::Change => {
            edit::delete_cells(s, start, end)?;
            s.cursor.set_col(start);
            s.set_mode(Mode::Insert)?;
            Ok(true)
        }
        Command::Yank => {
            let line = s.doc.get_line(s.cursor.row())?;
            s.register.save_chars(line[start..end].to_vec());
            s.cursor.set_col(start);
            Ok(true)
        }
        _ => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_command(s: &mut Session, command: Command, arg: Option<char>, n: usize) -> Result<bool> {
    if let Some(style) = style_of(command) {
        return match s.mode {
            Mode::Visual => edit::visual_toggle_style(s, style),
            Mode::Insert => {
                s.cursor.toggle_style(style);
                Ok(true)
            }
            _ => edit::toggle_style_at_cursor(s, style),
        };
    }

    match (s.mode, command) {
        (Mode::Search | Mode::Settings, Command::Confirm) => navigate::confirm_input(s),
        (Mode::Search | Mode::Settings, Command::Backspace) => Ok(s.input.pop().is_some()),

        (Mode::Visual, Command::Delete) => edit::visual_delete(s, false),
        (Mode::Visual, Command::Change) => edit::visual_delete(s, true),
        (Mode::Visual, Command::Yank) => edit::visual_yank(s),
        (Mode::Visual, Command::SwapCase) => edit::visual_swap_case(s),

        (Mode::VisualLine, Command::Delete) => blocks::visual_line_delete(s),
        (Mode::VisualLine, Command::Yank) => blocks::visual_line_yank(s, false),
        (Mode::VisualLine, Command::YankClone) => blocks::visual_line_yank(s, true),
        (Mode::VisualLine, Command::Indent) => blocks::visual_line_indent(s, true),
        (Mode::VisualLine, Command::Unindent) => blocks::visual_line_indent(s, false),
        (Mode::VisualLine, Command::ToggleCollapse) => blocks::visual_line_collapse(s),

        (_, cmd) => run_general(s, cmd, arg, n),
    }
}

fn run_general(s: &mut Session, command: Command, arg: Option<char>, n: usize) -> Result<bool> {
    match command {
        Command::Insert => edit::enter_insert(s, edit::InsertAt::Cursor),
        Command::InsertAfter => edit::enter_insert(s, edit::InsertAt::After),
        Command::InsertLineStart => edit::enter_insert(s, edit::InsertAt::LineStart),
        Command::InsertLineEnd => edit::enter_insert(s, edit::InsertAt::LineEnd),
        Command::NewRowBelow => blocks::new_row(s, true),
        Command::NewRowAbove => blocks::new_row(s, false),

        Command::Visual => navigate::enter_visual(s, Mode::Visual),
        Command::VisualLine => navigate::enter_visual(s, Mode::VisualLine),
        Command::SwapAnchor => navigate::swap_anchor(s),

        Command::DeleteChar => edit::delete_chars(s, n),
        Command::DeleteCharBefore => edit::delete_chars_before(s, n),
        Command::DeleteRows => blocks::delete_rows(s, n),
        Command::DeleteToEnd => edit::delete_to_end(s, false),
        Command::ChangeToEnd => edit::delete_to_end(s, true),
        Command::ChangeRow => edit::change_row(s),
        Command::Substitute => edit::substitute(s, n),
        Command::ReplaceChar => edit::replace_chars(s, arg, n),
        Command::SwapCase => edit::swap_case(s, n),
        Command::JoinRows => edit::join_rows(s, n),

        Command::YankRows => blocks::yank_rows(s, n, false),
        Command::YankClone => blocks::yank_rows(s, n, true),
        Command::PasteAfter => blocks::paste(s, true, n),
        Command::PasteBefore => blocks::paste(s, false, n),

        Command::Indent => blocks::indent(s, n),
        Command::Unindent => blocks::unindent(s, n),
        Command::SwapDown => blocks::swap(s, true),
        Command::SwapUp => blocks::swap(s, false),
        Command::ToggleCollapse => blocks::toggle_collapse(s),

        Command::ZoomIn => navigate::zoom_in(s),
        Command::ZoomOut => navigate::zoom_out(s),
        Command::ZoomCursor => navigate::zoom_cursor(s),
        Command::ZoomRoot => navigate::zoom_root(s),
        Command::JumpBack => navigate::jump(s, true),
        Command::JumpForward => navigate::jump(s, false),

        Command::Search => navigate::start_input(s, Mode::Search),
        Command::Settings => navigate::start_input(s, Mode::Settings),

        Command::SplitRow => edit::split_row(s),
        Command::Backspace => edit::backspace(s),
        Command::DeleteForward => edit::delete_forward(s),
        Command::DeleteWordBack => edit::delete_word_back(s),

        Command::Exit => navigate::exit(s),

        // Operators arrive as `Action::Operator` outside the visual modes.
        // Formatting, history, repeat and macros never reach here.
        Command::ToggleBold
        | Command::ToggleItalic
        | Command::ToggleUnderline
        | Command::ToggleStrikethrough
        | Command::Delete
        | Command::Change
        | Command::Yank
        | Command::Confirm
        | Command::Undo
        | Command::Redo
        | Command::Repeat
        | Command::RecordMacro
        | Command::PlayMacro => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::mode::Mode;
    use crate::testing::TestCase;
    use serde_json::json;

    #[test]
    fn operator_with_find() {
        let mut t = TestCase::new(json!(["hello world"]));
        t.send_keys("d f o").expect(json!([" world"]));
        t.send_keys("d t d").expect(json!(["d"]));
    }

    #[test]
    fn repeat_find_after_operator() {
        let mut t = TestCase::new(json!(["a,b,c,d"]));
        t.send_keys("f , ;").expect_cursor("a,b,c,d", 3);
        t.send_keys(",").expect_cursor("a,b,c,d", 1);
    }

    #[test]
    fn change_word_keeps_trailing_space() {
        let mut t = TestCase::new(json!(["one two"]));
        t.send_keys("c w x esc").expect(json!(["x two"]));
    }

    #[test]
    fn delete_backward_motion() {
        let mut t = TestCase::new(json!(["one two three"]));
        t.send_keys("$ d b").expect(json!(["one two e"]));
        t.expect_cursor("one two e", 8);
    }

    #[test]
    fn yank_motion_fills_register() {
        let mut t = TestCase::new(json!(["one two"]));
        t.send_keys("y e").expect_register("one");
        t.send_keys("$ p").expect(json!(["one twoone"]));
    }

    #[test]
    fn delete_rows_with_row_motion() {
        let mut t = TestCase::new(json!(["a", "b", "c", "d"]));
        t.send_keys("j d j").expect(json!(["a", "d"])).expect_cursor("d", 0);
        t.send_keys("d k").expect(json!([""]));
    }

    #[test]
    fn other_row_motions_do_nothing_under_operator() {
        let mut t = TestCase::new(json!(["a", "b"]));
        t.send_keys("d G").expect(json!(["a", "b"]));
        assert_eq!(t.session.history().undo_count(), 0);
    }

    #[test]
    fn insert_mode_arrows_pass_the_end() {
        let mut t = TestCase::new(json!(["ab"]));
        t.send_keys("i right right right !").expect(json!(["ab!"]));
        t.expect_mode(Mode::Insert);
    }

    #[test]
    fn visual_motions_stay_on_row() {
        let mut t = TestCase::new(json!(["abc", "def"]));
        t.send_keys("v j").expect_cursor("abc", 0);
        t.send_keys("l d").expect(json!(["c", "def"])).expect_mode(Mode::Normal);
    }
}
