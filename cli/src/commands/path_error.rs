use std::ops::Range;

use lalrpop_util::ParseError;
use thiserror::Error;
use xmlfilter_core::path::{PathError, PathParserError};
use yansi::{Condition, Paint};

/// A path expression given on the command line could not be compiled
#[derive(Error, Debug)]
#[error("{0}")]
pub struct PathSyntaxError(String);

/// Converts a [`PathError`] into a human-readable [`PathSyntaxError`] that
/// points at the offending part of the expression
pub trait IntoPathSyntaxError {
    fn into_path_syntax_error(self, option: &str, path: &str) -> PathSyntaxError;
}

fn expected_to_string(expected: &[String]) -> String {
    let mut result = String::new();
    for (i, e) in expected.iter().enumerate() {
        let sep = match i {
            0 => {
                if expected.len() > 1 {
                    " Expected one of"
                } else {
                    " Expected"
                }
            }
            _ if i < expected.len() - 1 => ",",
            _ => ", or",
        };
        result.push_str(sep);
        result.push(' ');
        result.push_str(e);
    }
    if !result.is_empty() {
        result.push('.');
    }
    result
}

fn describe(err: PathError, path: &str) -> Option<(String, Range<usize>)> {
    let described = match err {
        ParseError::InvalidToken { location } => ("Invalid token.".to_string(), location..location),
        ParseError::UnrecognizedEof { location, expected } => {
            if path.trim().is_empty() {
                return None;
            }
            (
                format!("Unrecognized end of path.{}", expected_to_string(&expected)),
                location..location,
            )
        }
        ParseError::UnrecognizedToken { token, expected } => (
            format!("Unrecognized token.{}", expected_to_string(&expected)),
            token.0..token.2,
        ),
        ParseError::ExtraToken { token } => ("Extra token.".to_string(), token.0..token.2),
        ParseError::User { error } => match error {
            PathParserError::InvalidNumber { start, end } => {
                ("Invalid number.".to_string(), start..end)
            }
            PathParserError::UnknownAxis { start, end } => {
                ("Unknown axis.".to_string(), start..end)
            }
        },
    };
    Some(described)
}

/// Renders `msg` below the line of `path` that contains `span` and marks
/// the span
fn render(option: &str, path: &str, msg: &str, span: Range<usize>, colored: bool) -> String {
    let condition = if colored {
        Condition::ALWAYS
    } else {
        Condition::NEVER
    };

    let bytes = path.as_bytes();
    let end = span.end.min(bytes.len());
    let start = span.start.min(end);

    let mut snippet_start = start;
    while snippet_start > 0 && bytes[snippet_start - 1] != b'\n' {
        snippet_start -= 1;
    }
    let mut snippet_end = end;
    while snippet_end < bytes.len() && bytes[snippet_end] != b'\n' {
        snippet_end += 1;
    }

    let span_len = end - start;
    let prefix = start - snippet_start;
    let center_prefix = ((span_len + 1) / 2).saturating_sub(1);
    let center_suffix = span_len / 2;

    format!(
        "Unable to parse {} path\n\n{}{}{}\n{}{}{}{}\n{}{}{}",
        option,
        &path[snippet_start..start],
        path[start..end].red().whenever(condition),
        &path[end..snippet_end],
        " ".repeat(prefix),
        "─".repeat(center_prefix).red().whenever(condition),
        (if end > start { "┬" } else { "│" }).red().whenever(condition),
        "─".repeat(center_suffix).red().whenever(condition),
        " ".repeat(prefix + center_prefix),
        "╰── ".red().whenever(condition),
        msg.red().bold().whenever(condition),
    )
}

impl IntoPathSyntaxError for PathError {
    fn into_path_syntax_error(self, option: &str, path: &str) -> PathSyntaxError {
        let Some((msg, span)) = describe(self, path) else {
            return PathSyntaxError(format!("The {option} path must not be empty"));
        };
        let colored = Condition::stderr_is_tty() && Condition::clicolor() && Condition::no_color();
        PathSyntaxError(render(option, path, &msg, span, colored))
    }
}
