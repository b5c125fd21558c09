use thiserror::Error;

use crate::{line_col, Span};

/// An error occurred while parsing a pattern.
///
/// Every error carries the 1-based line and column where it was detected,
/// computed from the byte offset of the offending token.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("error at {line}:{column}: {kind}")]
pub struct Error {
    pub kind: ErrorKind,
    pub line: u32,
    pub column: u32,
}

impl Error {
    /// Creates an error positioned at the start of `span`.
    pub(crate) fn new(kind: ErrorKind, src: &str, span: &Span) -> Self {
        Self::at_offset(kind, src, span.start())
    }

    /// Creates an error positioned at a raw byte offset.
    pub(crate) fn at_offset(kind: ErrorKind, src: &str, offset: usize) -> Self {
        let pos = line_col(src, offset);
        Self { kind, line: pos.line, column: pos.column }
    }
}

/// The different kinds of parse errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("unexpected {0}")]
    UnexpectedToken(String),

    #[error("unterminated string")]
    UnterminatedString,

    #[error("unterminated block comment")]
    UnterminatedComment,

    #[error("missing `>`")]
    UnterminatedCheck,

    #[error("poorly formed group start")]
    MalformedGroupStart,

    #[error("unknown ILCheck prefix `{0}`")]
    UnknownCheckPrefix(String),

    #[error("`{prefix}` expects {expected}, found {found} argument(s)")]
    WrongArgumentCount { prefix: String, expected: &'static str, found: usize },

    #[error("invalid capture name `{0}`")]
    InvalidCaptureName(String),

    #[error("invalid operand literal `{0}`")]
    InvalidOperandLiteral(String),

    #[error("invalid escape sequence in `{0}`")]
    InvalidEscapeSequence(String),

    #[error("invalid quantifier `{0}`")]
    InvalidQuantifier(String),
}
