use thiserror::Error;

use crate::il::OperandKind;

/// A non-fatal diagnostic produced while resolving a pattern.
///
/// Warnings flag checks that are structurally valid but can never match,
/// which almost always indicates a typo in the pattern. They are collected
/// on the [`crate::Pattern`] rather than failing the parse, since the
/// surrounding pattern may still be useful.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The literal's type does not match the operand type the opcode
    /// encodes, so the check can never succeed. `<op ldc.i4.s 5>` triggers
    /// this: `ldc.i4.s` carries an `int8` operand and the literal must be
    /// written `5sb`.
    #[error(
        "`{opcode}` encodes a {expected:?} operand, the {found:?} literal \
         never matches (at {line}:{column})"
    )]
    LiteralKindMismatch {
        /// The opcode's name.
        opcode: String,
        /// The operand kind the opcode encodes.
        expected: OperandKind,
        /// The kind of the literal written in the pattern.
        found: OperandKind,
        /// 1-based source line.
        line: u32,
        /// 1-based source column.
        column: u32,
    },

    /// A member-name check (`fld`, `mth`, `typ`, `cls`) names an opcode
    /// whose operand is not a reference of that kind.
    #[error(
        "`{opcode}` does not take a {member} reference, the check never \
         matches (at {line}:{column})"
    )]
    MemberKindMismatch {
        /// The opcode's name.
        opcode: String,
        /// The member kind the check inspects.
        member: String,
        /// 1-based source line.
        line: u32,
        /// 1-based source column.
        column: u32,
    },

    /// A `cap` or `ceq` check names an opcode that encodes no operand and
    /// implies none either.
    #[error(
        "`{opcode}` has no operand to capture or compare (at {line}:{column})"
    )]
    NoOperandToCapture {
        /// The opcode's name.
        opcode: String,
        /// 1-based source line.
        line: u32,
        /// 1-based source column.
        column: u32,
    },
}
