/*! Instruction operands.

Operands are heterogeneous: numeric constants of several widths, strings,
parameter and variable references, metadata member references and branch
targets. They are modeled as one tagged value whose equality and display
dispatch on the variant.

Two equality relations exist. The strict one ([`PartialEq`]) requires the
same variant; numeric values of different widths never compare equal. The
relaxed one ([`Operand::eq_relaxed`]) is used when the pattern matched the
opcode through a family: there a literal `5` must also equal the `int8`
operand of `ldc.i4.s`, so numeric primitives of different types compare by
value.

Member references compare by fully qualified name together with the id of
their owning module, so the same textual name in two different modules does
not alias. Branch targets compare by identity, never structurally; following
them would recurse through the instruction graph.
*/

use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::il::Instruction;

/// A reference to a field, method, type or callsite in some module.
///
/// The fully qualified name is interned in an `Arc` so references are cheap
/// to clone into capture tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    full_name: Arc<str>,
    module_id: u64,
}

impl MemberRef {
    /// Creates a reference from its fully qualified name and the identifier
    /// of the module that owns it.
    pub fn new(full_name: impl Into<Arc<str>>, module_id: u64) -> Self {
        Self { full_name: full_name.into(), module_id }
    }

    /// The fully qualified name, e.g. `System.Void Foo::M()`.
    #[inline]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The identifier of the owning module.
    #[inline]
    pub fn module_id(&self) -> u64 {
        self.module_id
    }
}

impl Display for MemberRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// The operand of an instruction.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default)]
pub enum Operand {
    /// The instruction takes no operand.
    #[default]
    None,
    Int32(i32),
    Int64(i64),
    Int8(i8),
    UInt8(u8),
    Float32(f32),
    Float64(f64),
    String(Arc<str>),
    /// A method parameter, by index.
    Parameter(u32),
    /// A local variable, by index.
    Variable(u32),
    Field(MemberRef),
    Method(MemberRef),
    Type(MemberRef),
    CallSite(MemberRef),
    /// A branch target. Compares by identity.
    Target(Arc<Instruction>),
    /// The target table of a `switch`. Compares by identity.
    Targets(Arc<Vec<Arc<Instruction>>>),
}

impl Operand {
    /// Builds a string operand.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Operand::String(s.into())
    }

    /// True for `Operand::None`.
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Operand::None)
    }

    /// A short name of the operand's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Operand::None => "none",
            Operand::Int32(_) => "int32",
            Operand::Int64(_) => "int64",
            Operand::Int8(_) => "int8",
            Operand::UInt8(_) => "uint8",
            Operand::Float32(_) => "float32",
            Operand::Float64(_) => "float64",
            Operand::String(_) => "string",
            Operand::Parameter(_) => "parameter",
            Operand::Variable(_) => "variable",
            Operand::Field(_) => "field",
            Operand::Method(_) => "method",
            Operand::Type(_) => "type",
            Operand::CallSite(_) => "callsite",
            Operand::Target(_) => "target",
            Operand::Targets(_) => "targets",
        }
    }

    /// True if the operand is a numeric primitive.
    fn is_numeric(&self) -> bool {
        matches!(
            self,
            Operand::Int32(_)
                | Operand::Int64(_)
                | Operand::Int8(_)
                | Operand::UInt8(_)
                | Operand::Float32(_)
                | Operand::Float64(_)
        )
    }

    /// The operand's numeric value as an integer, when it is an integral
    /// primitive.
    fn as_integer(&self) -> Option<i128> {
        match self {
            Operand::Int32(v) => Some(*v as i128),
            Operand::Int64(v) => Some(*v as i128),
            Operand::Int8(v) => Some(*v as i128),
            Operand::UInt8(v) => Some(*v as i128),
            _ => None,
        }
    }

    /// The operand's numeric value as a float, for any numeric primitive.
    fn as_float(&self) -> Option<f64> {
        match self {
            Operand::Int32(v) => Some(*v as f64),
            Operand::Int64(v) => Some(*v as f64),
            Operand::Int8(v) => Some(*v as f64),
            Operand::UInt8(v) => Some(*v as f64),
            Operand::Float32(v) => Some(*v as f64),
            Operand::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Equality with the cross-type numeric relaxation.
    ///
    /// When `relaxed` is false this is plain [`PartialEq`]. When it is true
    /// (the opcode was matched through a family) two numeric primitives of
    /// different types compare by value: `Int32(5)` equals `Int8(5)`.
    pub fn eq_relaxed(&self, other: &Operand, relaxed: bool) -> bool {
        if self == other {
            return true;
        }
        if !relaxed || !self.is_numeric() || !other.is_numeric() {
            return false;
        }
        match (self.as_integer(), other.as_integer()) {
            (Some(a), Some(b)) => a == b,
            // At least one side is a float; compare in f64.
            _ => self.as_float() == other.as_float(),
        }
    }
}

impl PartialEq for Operand {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Operand::None, Operand::None) => true,
            (Operand::Int32(a), Operand::Int32(b)) => a == b,
            (Operand::Int64(a), Operand::Int64(b)) => a == b,
            (Operand::Int8(a), Operand::Int8(b)) => a == b,
            (Operand::UInt8(a), Operand::UInt8(b)) => a == b,
            (Operand::Float32(a), Operand::Float32(b)) => a == b,
            (Operand::Float64(a), Operand::Float64(b)) => a == b,
            (Operand::String(a), Operand::String(b)) => a == b,
            (Operand::Parameter(a), Operand::Parameter(b)) => a == b,
            (Operand::Variable(a), Operand::Variable(b)) => a == b,
            (Operand::Field(a), Operand::Field(b)) => a == b,
            (Operand::Method(a), Operand::Method(b)) => a == b,
            (Operand::Type(a), Operand::Type(b)) => a == b,
            (Operand::CallSite(a), Operand::CallSite(b)) => a == b,
            (Operand::Target(a), Operand::Target(b)) => Arc::ptr_eq(a, b),
            (Operand::Targets(a), Operand::Targets(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Display for Operand {
    /// Formats the operand in the same syntax pattern literals use, so a
    /// formatted check re-parses to an equivalent one.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Int32(v) => write!(f, "{v}"),
            Operand::Int64(v) => write!(f, "{v}l"),
            Operand::Int8(v) => write!(f, "{v}sb"),
            Operand::UInt8(v) => write!(f, "{v}b"),
            Operand::Float32(v) => write!(f, "{v}f"),
            Operand::Float64(v) => write!(f, "{v}d"),
            Operand::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Operand::Parameter(i) => write!(f, "arg({i})"),
            Operand::Variable(i) => write!(f, "loc({i})"),
            Operand::Field(r)
            | Operand::Method(r)
            | Operand::Type(r)
            | Operand::CallSite(r) => write!(f, "{r}"),
            Operand::Target(t) => write!(f, "-> {}", t.opcode()),
            Operand::Targets(t) => write!(f, "-> [{} targets]", t.len()),
        }
    }
}

pub(crate) fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{MemberRef, Operand};
    use crate::il::{Instruction, OpCode};

    #[test]
    fn strict_equality_requires_same_type() {
        assert_eq!(Operand::Int32(5), Operand::Int32(5));
        assert_ne!(Operand::Int32(5), Operand::Int64(5));
        assert_ne!(Operand::Int32(5), Operand::Int8(5));
        assert_ne!(Operand::Int32(5), Operand::Int32(6));
    }

    #[test]
    fn relaxed_equality_crosses_numeric_types() {
        assert!(Operand::Int32(5).eq_relaxed(&Operand::Int8(5), true));
        assert!(Operand::Int32(5).eq_relaxed(&Operand::Int64(5), true));
        assert!(Operand::Float64(2.0).eq_relaxed(&Operand::Int32(2), true));
        assert!(!Operand::Int32(5).eq_relaxed(&Operand::Int8(6), true));
        assert!(!Operand::Int32(5).eq_relaxed(&Operand::Int8(5), false));
        // The relaxation only applies to numeric primitives.
        assert!(!Operand::string("5").eq_relaxed(&Operand::Int32(5), true));
    }

    #[test]
    fn member_refs_compare_by_name_and_module() {
        let a = MemberRef::new("System.Int32 Foo::bar", 1);
        let b = MemberRef::new("System.Int32 Foo::bar", 1);
        let c = MemberRef::new("System.Int32 Foo::bar", 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn targets_compare_by_identity() {
        let a = Arc::new(Instruction::new(OpCode::Nop));
        let b = Arc::new(Instruction::new(OpCode::Nop));
        assert_eq!(Operand::Target(a.clone()), Operand::Target(a.clone()));
        assert_ne!(Operand::Target(a), Operand::Target(b));
    }

    #[test]
    fn literal_display_round_trips_the_type_tag() {
        assert_eq!(Operand::Int32(5).to_string(), "5");
        assert_eq!(Operand::Int64(5).to_string(), "5l");
        assert_eq!(Operand::Int8(-3).to_string(), "-3sb");
        assert_eq!(Operand::UInt8(7).to_string(), "7b");
        assert_eq!(Operand::Float32(1.5).to_string(), "1.5f");
        assert_eq!(Operand::Float64(2.5).to_string(), "2.5d");
        assert_eq!(Operand::string("a\nb").to_string(), "\"a\\nb\"");
    }
}
