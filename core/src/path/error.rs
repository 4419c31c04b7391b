use lalrpop_util::ParseError;
use thiserror::Error;

/// Custom errors from the [`PathParser`](super::PathParser)
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum PathParserError {
    /// Number could not be parsed
    #[error("invalid number")]
    InvalidNumber { start: usize, end: usize },

    /// The name in front of `::` is not a supported axis
    #[error("unknown axis")]
    UnknownAxis { start: usize, end: usize },
}

/// An error returned when a path expression cannot be compiled. Tokens are
/// stored as strings so the error does not borrow the expression.
pub type PathError = ParseError<usize, String, PathParserError>;
