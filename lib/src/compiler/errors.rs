use thiserror::Error;

/// An error occurred while turning a parsed pattern into a program.
///
/// Where a source position is known it is reported 1-based, the same way
/// parse errors are.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CompileError {
    /// A `(` without its `)`, or the other way around.
    #[error("unbalanced group at {line}:{column}")]
    UnbalancedGroup {
        /// 1-based source line.
        line: u32,
        /// 1-based source column.
        column: u32,
    },

    /// A quantifier with nothing it can attach to.
    #[error("dangling quantifier at {line}:{column}")]
    DanglingQuantifier {
        /// 1-based source line.
        line: u32,
        /// 1-based source column.
        column: u32,
    },

    /// A quantifier attached to a check that cannot carry one.
    #[error("quantifier can not apply to this check at {line}:{column}")]
    UnquantifiableCheck {
        /// 1-based source line.
        line: u32,
        /// 1-based source column.
        column: u32,
    },

    /// The opcode name does not exist in the opcode table.
    #[error("unknown opcode `{name}` at {line}:{column}")]
    UnknownOpCode {
        /// The unresolved opcode name.
        name: String,
        /// 1-based source line.
        line: u32,
        /// 1-based source column.
        column: u32,
    },

    /// The `%name` does not name an opcode family.
    #[error("unknown opcode family `{name}` at {line}:{column}")]
    UnknownFamily {
        /// The unresolved family name.
        name: String,
        /// 1-based source line.
        line: u32,
        /// 1-based source column.
        column: u32,
    },

    /// A `ceq` check references an operand capture slot that the pattern
    /// does not define.
    #[error(
        "operand index {index} is out of range, the pattern captures \
         {count} operand(s)"
    )]
    UnknownOperandIndex {
        /// The out-of-range operand index that was referenced.
        index: u32,
        /// The number of operand captures the pattern actually defines.
        count: u32,
    },

    /// Two captures share a name.
    #[error("duplicate capture name `{name}` at {line}:{column}")]
    DuplicateCaptureName {
        /// The capture name used more than once.
        name: String,
        /// 1-based source line.
        line: u32,
        /// 1-based source column.
        column: u32,
    },

    /// A member-name pattern did not produce a valid regular expression.
    /// Only possible for verbatim (`?`-prefixed) patterns; literal member
    /// names are escaped.
    #[error("invalid member pattern `{pattern}`: {error}")]
    InvalidMemberPattern {
        /// The pattern text that failed to compile.
        pattern: String,
        /// The underlying regex compilation error message.
        error: String,
    },
}
