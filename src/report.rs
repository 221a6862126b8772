//! Rendering of unhandled script errors. Syntax errors get a source-context
//! block with a caret pinpointing the offending column, reconstructed from
//! the engine's `[line: L, column: C]` message marker and the bytes still
//! sitting in the source buffer.

use crate::{
    engine::{value::ErrorValue, Engine, Feature},
    source::SourceBuffer,
};

/// Errors longer than this render as a placeholder instead.
const DISPLAY_LIMIT: usize = 256;

const TOO_LONG: &str = "[Error message too long]";

/// Lines of source printed before the offending line.
const SYNTAX_ERROR_CONTEXT: usize = 2;

/// Print an unhandled error to stderr. Must be called before the source
/// buffer is overwritten by the next load.
pub fn report_unhandled(error: &ErrorValue, buffer: &SourceBuffer) {
    let display = error.to_string();
    if display.len() >= DISPLAY_LIMIT {
        eprintln!("Script Error: {TOO_LONG}");
        return;
    }
    if Engine::has_feature(Feature::ErrorMessages) && error.is_syntax_error() {
        if let Some((line, column)) = scan_position(&display) {
            if line != 0 && column != 0 {
                print_context(buffer.bytes(), line, column);
            }
        }
    }
    eprintln!("Script Error: {display}");
}

/// Extract the `[line: L, column: C]` marker from an error message. The
/// engine is contracted to emit exactly this sub-language on syntax errors;
/// anything else yields `None`.
pub fn scan_position(message: &str) -> Option<(usize, usize)> {
    let after_line = message.find("[line: ")? + "[line: ".len();
    let rest = &message[after_line..];
    let comma = rest.find(',')?;
    let line = parse_digits(&rest[..comma])?;
    let tail = rest[comma..].strip_prefix(", column: ")?;
    let close = tail.find(']')?;
    let column = parse_digits(&tail[..close])?;
    Some((line, column))
}

fn parse_digits(text: &str) -> Option<usize> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn print_context(source: &[u8], err_line: usize, err_col: usize) {
    let text = String::from_utf8_lossy(source);
    let first = err_line.saturating_sub(SYNTAX_ERROR_CONTEXT).max(1);
    let mut rendered = String::new();
    for (idx, line) in text.lines().enumerate() {
        let number = idx + 1;
        if number > err_line {
            break;
        }
        if number >= first {
            if number > first {
                rendered.push('\n');
            }
            rendered.push_str(line);
        }
    }
    eprintln!("{rendered}");
    let mut caret = String::with_capacity(err_col);
    for _ in 1..err_col {
        caret.push('~');
    }
    caret.push('^');
    eprintln!("{caret}");
}
