/*! The instruction model.

This module defines what the engine knows about CIL: opcodes and their
names, multi-opcode families, operands and their equality rules, and the
instruction/method containers the matcher walks. Everything else in the
crate treats instructions as opaque `(opcode, operand)` pairs accessed
through this module.
*/

use std::borrow::Cow;
use std::fmt;
use std::fmt::{Display, Formatter};

pub use family::OpCodeFamily;
pub use instruction::{Instruction, Local, Method, Parameter};
pub use opcode::{export_names, OpCode, OperandKind};
pub use operand::{MemberRef, Operand};

pub(crate) use operand::escape_string;

mod family;
mod instruction;
mod opcode;
mod operand;

/// Matches a single opcode or a whole family of them.
///
/// A family compares equal to every concrete opcode that belongs to it,
/// which is what lets `<op %ldarg>` match `ldarg.1` and `ldarg.s` alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCodeMatcher {
    /// A single concrete opcode.
    Code(OpCode),
    /// A whole family of opcodes.
    Family(OpCodeFamily),
}

impl OpCodeMatcher {
    /// True if the matcher accepts the given opcode.
    #[inline]
    pub fn matches(&self, opcode: OpCode) -> bool {
        match self {
            OpCodeMatcher::Code(code) => *code == opcode,
            OpCodeMatcher::Family(family) => family.matches(opcode),
        }
    }

    /// True if this matcher is a family rather than a concrete opcode.
    #[inline]
    pub fn is_family(&self) -> bool {
        matches!(self, OpCodeMatcher::Family(_))
    }
}

impl Display for OpCodeMatcher {
    /// Formats the matcher as written in a pattern: the opcode name, the
    /// family name prefixed with `%`, or the bare word `any`.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OpCodeMatcher::Code(code) => write!(f, "{code}"),
            OpCodeMatcher::Family(OpCodeFamily::Any) => write!(f, "any"),
            OpCodeMatcher::Family(family) => write!(f, "%{family}"),
        }
    }
}

/// The operand an instruction effectively carries when matched through
/// `matcher`.
///
/// For a concrete-opcode matcher this is the instruction's own operand. For
/// a family matcher, a short-form opcode contributes its implicit operand
/// instead: matched through `%ldarg`, the operand of `ldarg.2` is parameter
/// 2. When a method context is available the synthesized parameter or
/// variable index is resolved against its lists; `None` means resolution
/// failed and the instruction cannot match.
pub(crate) fn effective_operand<'i>(
    instruction: &'i Instruction,
    matcher: &OpCodeMatcher,
    method: Option<&Method>,
) -> Option<Cow<'i, Operand>> {
    if !matcher.is_family() {
        return Some(Cow::Borrowed(instruction.operand()));
    }
    let synthesized = match instruction.opcode().implicit_operand() {
        Some(operand) => operand,
        None => return Some(Cow::Borrowed(instruction.operand())),
    };
    if let Some(method) = method {
        let resolvable = match synthesized {
            Operand::Parameter(index) => method.has_parameter(index),
            Operand::Variable(index) => method.has_local(index),
            _ => true,
        };
        if !resolvable {
            return None;
        }
    }
    Some(Cow::Owned(synthesized))
}

/// Does `instruction` match `matcher` with an operand equal to `expected`?
///
/// The operand comparison uses the family relaxation when `matcher` is a
/// family, and the instruction's short-form operand is synthesized first
/// (see [`effective_operand`]).
pub fn equals_instruction(
    instruction: &Instruction,
    matcher: &OpCodeMatcher,
    expected: &Operand,
    method: Option<&Method>,
) -> bool {
    if !matcher.matches(instruction.opcode()) {
        return false;
    }
    match effective_operand(instruction, matcher, method) {
        Some(operand) => operand.eq_relaxed(expected, matcher.is_family()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_opcode_with_literal() {
        let instr = Instruction::with_operand(OpCode::LdcI4, Operand::Int32(5));
        let matcher = OpCodeMatcher::Code(OpCode::LdcI4);
        assert!(equals_instruction(&instr, &matcher, &Operand::Int32(5), None));
        assert!(!equals_instruction(
            &instr,
            &matcher,
            &Operand::Int32(6),
            None
        ));
        // Strict comparison for concrete opcodes: no cross-type equality.
        assert!(!equals_instruction(
            &instr,
            &matcher,
            &Operand::Int64(5),
            None
        ));
    }

    #[test]
    fn family_synthesizes_short_form_constants() {
        let instr = Instruction::new(OpCode::LdcI45);
        let matcher = OpCodeMatcher::Family(OpCodeFamily::LdcI4);
        assert!(equals_instruction(&instr, &matcher, &Operand::Int32(5), None));
        assert!(!equals_instruction(
            &instr,
            &matcher,
            &Operand::Int32(4),
            None
        ));

        // ldc.i4.s carries an int8 operand; under a family it still equals
        // the int32 literal.
        let instr =
            Instruction::with_operand(OpCode::LdcI4S, Operand::Int8(5));
        assert!(equals_instruction(&instr, &matcher, &Operand::Int32(5), None));
    }

    #[test]
    fn family_synthesizes_parameters() {
        let instr = Instruction::new(OpCode::Ldarg1);
        let matcher = OpCodeMatcher::Family(OpCodeFamily::Ldarg);
        assert!(equals_instruction(
            &instr,
            &matcher,
            &Operand::Parameter(1),
            None
        ));
    }

    #[test]
    fn method_bounds_check_short_forms() {
        let mut method = Method::default();
        method.parameters.push(Parameter::default());

        let instr = Instruction::new(OpCode::Ldarg3);
        let matcher = OpCodeMatcher::Family(OpCodeFamily::Ldarg);
        // ldarg.3 cannot be resolved in a method with one parameter.
        assert!(!equals_instruction(
            &instr,
            &matcher,
            &Operand::Parameter(3),
            Some(&method)
        ));
        // Without a method context the index is taken at face value.
        assert!(equals_instruction(
            &instr,
            &matcher,
            &Operand::Parameter(3),
            None
        ));
    }

    #[test]
    fn any_family_matches_every_opcode() {
        let matcher = OpCodeMatcher::Family(OpCodeFamily::Any);
        assert!(matcher.matches(OpCode::Ret));
        assert!(matcher.matches(OpCode::Ldarg0));
        assert_eq!(matcher.to_string(), "any");
    }
}
