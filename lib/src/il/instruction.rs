use std::fmt;
use std::fmt::{Display, Formatter};

use crate::il::{OpCode, Operand};

/// A single CIL instruction: an opcode and its operand.
///
/// Instructions are plain values; the engine never mutates them and only
/// reads them through [`Instruction::opcode`] and [`Instruction::operand`].
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    opcode: OpCode,
    operand: Operand,
}

impl Instruction {
    /// Creates an instruction without an operand.
    pub fn new(opcode: OpCode) -> Self {
        Self { opcode, operand: Operand::None }
    }

    /// Creates an instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: Operand) -> Self {
        Self { opcode, operand }
    }

    /// The instruction's opcode.
    #[inline]
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// The instruction's operand; [`Operand::None`] when it takes none.
    #[inline]
    pub fn operand(&self) -> &Operand {
        &self.operand
    }
}

impl From<OpCode> for Instruction {
    fn from(opcode: OpCode) -> Self {
        Instruction::new(opcode)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.operand.is_none() {
            write!(f, "{}", self.opcode)
        } else {
            write!(f, "{} {}", self.opcode, self.operand)
        }
    }
}

/// A method parameter. Its index is its position in [`Method::parameters`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameter {
    /// The parameter's name, when known.
    pub name: Option<String>,
}

/// A local variable. Its index is its position in [`Method::locals`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Local {
    /// The variable's name, when known.
    pub name: Option<String>,
}

/// A method body together with the context needed to resolve short-form
/// operands.
///
/// Matching does not require a method; a bare instruction slice is enough.
/// When a method is supplied, parameter and variable indices implied by
/// short-form opcodes are checked against its lists, so `ldarg.3` will not
/// match inside a method with two parameters.
#[derive(Debug, Clone, Default)]
pub struct Method {
    /// The method's parameters, in signature order.
    pub parameters: Vec<Parameter>,
    /// The method's local variables, in declaration order.
    pub locals: Vec<Local>,
    /// The method body.
    pub instructions: Vec<Instruction>,
}

impl Method {
    /// Creates a method with the given body and empty parameter and local
    /// lists.
    pub fn with_instructions(instructions: Vec<Instruction>) -> Self {
        Self { parameters: Vec::new(), locals: Vec::new(), instructions }
    }

    /// True if the method declares a parameter with the given index.
    #[inline]
    pub fn has_parameter(&self, index: u32) -> bool {
        (index as usize) < self.parameters.len()
    }

    /// True if the method declares a local variable with the given index.
    #[inline]
    pub fn has_local(&self, index: u32) -> bool {
        (index as usize) < self.locals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::MemberRef;

    #[test]
    fn display() {
        assert_eq!(Instruction::new(OpCode::Ret).to_string(), "ret");
        assert_eq!(
            Instruction::with_operand(OpCode::LdcI4, Operand::Int32(5))
                .to_string(),
            "ldc.i4 5"
        );
        assert_eq!(
            Instruction::with_operand(
                OpCode::Call,
                Operand::Method(MemberRef::new("System.Void Foo::M()", 0)),
            )
            .to_string(),
            "call System.Void Foo::M()"
        );
    }
}
