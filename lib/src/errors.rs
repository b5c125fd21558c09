use std::io;

use thiserror::Error;

pub use cil_regex_parser::{Error as ParseError, ErrorKind as ParseErrorKind};

use crate::compiler::CompileError;

/// Errors returned while parsing or compiling a pattern.
#[derive(Error, Debug)]
pub enum Error {
    /// The pattern text is malformed.
    #[error(transparent)]
    ParseError(#[from] ParseError),

    /// The pattern parsed but cannot form a program.
    #[error(transparent)]
    CompileError(#[from] CompileError),

    /// A caller-supplied argument is invalid.
    #[error(transparent)]
    UsageError(#[from] UsageError),

    /// I/O error while reading a pattern from a file.
    #[error(transparent)]
    IoError(#[from] io::Error),
}

/// Errors caused by invalid arguments rather than invalid patterns.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UsageError {
    /// `start` or `end` does not denote a valid range over the input.
    #[error(
        "range {start}..{end} is not a valid match range for {len} instruction(s)"
    )]
    RangeOutOfBounds {
        /// The requested range's start.
        start: usize,
        /// The requested range's end.
        end: usize,
        /// The number of instructions actually available.
        len: usize,
    },

    /// The identifier is not a valid operand name. Names must start with a
    /// letter or underscore and continue with letters, digits or
    /// underscores.
    #[error("invalid operand name `{0}`")]
    InvalidOperandName(String),

    /// Operand dictionaries cannot hold the "no operand" value.
    #[error("the empty operand can not be added to a dictionary")]
    NullOperand,

    /// The requested name is not bound in the dictionary.
    #[error("operand `{0}` is not defined")]
    UndefinedOperand(String),
}

/// Error returned by the typed accessors of a captured operand when the
/// capture holds an operand of a different kind.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("captured operand is `{actual}`, not `{requested}`")]
pub struct TypeCastError {
    pub(crate) requested: &'static str,
    pub(crate) actual: &'static str,
}
