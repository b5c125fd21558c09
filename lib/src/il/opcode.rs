/*! The CIL opcode table.

Every opcode defined by ECMA-335 partition III, single-byte and two-byte
encodings alike. The canonical name of an opcode is the dotted assembler
mnemonic (`ldarg.0`, `bne.un.s`); an underscored alias (`ldarg_0`) is
accepted everywhere a name is looked up, and lookups are case-insensitive.
*/

use std::fmt;
use std::fmt::{Display, Formatter};

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::il::Operand;

macro_rules! opcodes {
    ($($variant:ident => $name:literal,)+) => {
        /// A CIL operation code.
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum OpCode {
            $($variant,)+
        }

        impl OpCode {
            /// Every opcode, in instruction-set order.
            pub const ALL: &'static [OpCode] = &[$(OpCode::$variant,)+];

            /// The canonical dotted mnemonic of the opcode.
            pub fn name(self) -> &'static str {
                match self {
                    $(OpCode::$variant => $name,)+
                }
            }
        }
    };
}

opcodes! {
    Nop => "nop",
    Break => "break",
    Ldarg0 => "ldarg.0",
    Ldarg1 => "ldarg.1",
    Ldarg2 => "ldarg.2",
    Ldarg3 => "ldarg.3",
    Ldloc0 => "ldloc.0",
    Ldloc1 => "ldloc.1",
    Ldloc2 => "ldloc.2",
    Ldloc3 => "ldloc.3",
    Stloc0 => "stloc.0",
    Stloc1 => "stloc.1",
    Stloc2 => "stloc.2",
    Stloc3 => "stloc.3",
    LdargS => "ldarg.s",
    LdargaS => "ldarga.s",
    StargS => "starg.s",
    LdlocS => "ldloc.s",
    LdlocaS => "ldloca.s",
    StlocS => "stloc.s",
    Ldnull => "ldnull",
    LdcI4M1 => "ldc.i4.m1",
    LdcI40 => "ldc.i4.0",
    LdcI41 => "ldc.i4.1",
    LdcI42 => "ldc.i4.2",
    LdcI43 => "ldc.i4.3",
    LdcI44 => "ldc.i4.4",
    LdcI45 => "ldc.i4.5",
    LdcI46 => "ldc.i4.6",
    LdcI47 => "ldc.i4.7",
    LdcI48 => "ldc.i4.8",
    LdcI4S => "ldc.i4.s",
    LdcI4 => "ldc.i4",
    LdcI8 => "ldc.i8",
    LdcR4 => "ldc.r4",
    LdcR8 => "ldc.r8",
    Dup => "dup",
    Pop => "pop",
    Jmp => "jmp",
    Call => "call",
    Calli => "calli",
    Ret => "ret",
    BrS => "br.s",
    BrfalseS => "brfalse.s",
    BrtrueS => "brtrue.s",
    BeqS => "beq.s",
    BgeS => "bge.s",
    BgtS => "bgt.s",
    BleS => "ble.s",
    BltS => "blt.s",
    BneUnS => "bne.un.s",
    BgeUnS => "bge.un.s",
    BgtUnS => "bgt.un.s",
    BleUnS => "ble.un.s",
    BltUnS => "blt.un.s",
    Br => "br",
    Brfalse => "brfalse",
    Brtrue => "brtrue",
    Beq => "beq",
    Bge => "bge",
    Bgt => "bgt",
    Ble => "ble",
    Blt => "blt",
    BneUn => "bne.un",
    BgeUn => "bge.un",
    BgtUn => "bgt.un",
    BleUn => "ble.un",
    BltUn => "blt.un",
    Switch => "switch",
    LdindI1 => "ldind.i1",
    LdindU1 => "ldind.u1",
    LdindI2 => "ldind.i2",
    LdindU2 => "ldind.u2",
    LdindI4 => "ldind.i4",
    LdindU4 => "ldind.u4",
    LdindI8 => "ldind.i8",
    LdindI => "ldind.i",
    LdindR4 => "ldind.r4",
    LdindR8 => "ldind.r8",
    LdindRef => "ldind.ref",
    StindRef => "stind.ref",
    StindI1 => "stind.i1",
    StindI2 => "stind.i2",
    StindI4 => "stind.i4",
    StindI8 => "stind.i8",
    StindR4 => "stind.r4",
    StindR8 => "stind.r8",
    Add => "add",
    Sub => "sub",
    Mul => "mul",
    Div => "div",
    DivUn => "div.un",
    Rem => "rem",
    RemUn => "rem.un",
    And => "and",
    Or => "or",
    Xor => "xor",
    Shl => "shl",
    Shr => "shr",
    ShrUn => "shr.un",
    Neg => "neg",
    Not => "not",
    ConvI1 => "conv.i1",
    ConvI2 => "conv.i2",
    ConvI4 => "conv.i4",
    ConvI8 => "conv.i8",
    ConvR4 => "conv.r4",
    ConvR8 => "conv.r8",
    ConvU4 => "conv.u4",
    ConvU8 => "conv.u8",
    Callvirt => "callvirt",
    Cpobj => "cpobj",
    Ldobj => "ldobj",
    Ldstr => "ldstr",
    Newobj => "newobj",
    Castclass => "castclass",
    Isinst => "isinst",
    ConvRUn => "conv.r.un",
    Unbox => "unbox",
    Throw => "throw",
    Ldfld => "ldfld",
    Ldflda => "ldflda",
    Stfld => "stfld",
    Ldsfld => "ldsfld",
    Ldsflda => "ldsflda",
    Stsfld => "stsfld",
    Stobj => "stobj",
    ConvOvfI1Un => "conv.ovf.i1.un",
    ConvOvfI2Un => "conv.ovf.i2.un",
    ConvOvfI4Un => "conv.ovf.i4.un",
    ConvOvfI8Un => "conv.ovf.i8.un",
    ConvOvfU1Un => "conv.ovf.u1.un",
    ConvOvfU2Un => "conv.ovf.u2.un",
    ConvOvfU4Un => "conv.ovf.u4.un",
    ConvOvfU8Un => "conv.ovf.u8.un",
    ConvOvfIUn => "conv.ovf.i.un",
    ConvOvfUUn => "conv.ovf.u.un",
    Box => "box",
    Newarr => "newarr",
    Ldlen => "ldlen",
    Ldelema => "ldelema",
    LdelemI1 => "ldelem.i1",
    LdelemU1 => "ldelem.u1",
    LdelemI2 => "ldelem.i2",
    LdelemU2 => "ldelem.u2",
    LdelemI4 => "ldelem.i4",
    LdelemU4 => "ldelem.u4",
    LdelemI8 => "ldelem.i8",
    LdelemI => "ldelem.i",
    LdelemR4 => "ldelem.r4",
    LdelemR8 => "ldelem.r8",
    LdelemRef => "ldelem.ref",
    StelemI => "stelem.i",
    StelemI1 => "stelem.i1",
    StelemI2 => "stelem.i2",
    StelemI4 => "stelem.i4",
    StelemI8 => "stelem.i8",
    StelemR4 => "stelem.r4",
    StelemR8 => "stelem.r8",
    StelemRef => "stelem.ref",
    Ldelem => "ldelem",
    Stelem => "stelem",
    UnboxAny => "unbox.any",
    ConvOvfI1 => "conv.ovf.i1",
    ConvOvfU1 => "conv.ovf.u1",
    ConvOvfI2 => "conv.ovf.i2",
    ConvOvfU2 => "conv.ovf.u2",
    ConvOvfI4 => "conv.ovf.i4",
    ConvOvfU4 => "conv.ovf.u4",
    ConvOvfI8 => "conv.ovf.i8",
    ConvOvfU8 => "conv.ovf.u8",
    Refanyval => "refanyval",
    Ckfinite => "ckfinite",
    Mkrefany => "mkrefany",
    Ldtoken => "ldtoken",
    ConvU2 => "conv.u2",
    ConvU1 => "conv.u1",
    ConvI => "conv.i",
    ConvOvfI => "conv.ovf.i",
    ConvOvfU => "conv.ovf.u",
    AddOvf => "add.ovf",
    AddOvfUn => "add.ovf.un",
    MulOvf => "mul.ovf",
    MulOvfUn => "mul.ovf.un",
    SubOvf => "sub.ovf",
    SubOvfUn => "sub.ovf.un",
    Endfinally => "endfinally",
    Leave => "leave",
    LeaveS => "leave.s",
    StindI => "stind.i",
    ConvU => "conv.u",
    Arglist => "arglist",
    Ceq => "ceq",
    Cgt => "cgt",
    CgtUn => "cgt.un",
    Clt => "clt",
    CltUn => "clt.un",
    Ldftn => "ldftn",
    Ldvirtftn => "ldvirtftn",
    Ldarg => "ldarg",
    Ldarga => "ldarga",
    Starg => "starg",
    Ldloc => "ldloc",
    Ldloca => "ldloca",
    Stloc => "stloc",
    Localloc => "localloc",
    Endfilter => "endfilter",
    Unaligned => "unaligned",
    Volatile => "volatile",
    Tail => "tail",
    Initobj => "initobj",
    Constrained => "constrained",
    Cpblk => "cpblk",
    Initblk => "initblk",
    No => "no",
    Rethrow => "rethrow",
    Sizeof => "sizeof",
    Refanytype => "refanytype",
    Readonly => "readonly",
}

/// The kind of operand an opcode encodes in the instruction stream.
///
/// Short-form opcodes whose operand is implicit (`ldarg.0`, `ldc.i4.5`)
/// encode nothing and report [`OperandKind::None`]; their implied value is
/// available through [`OpCode::implicit_operand`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// No operand is encoded.
    None,
    /// An 8-bit signed integer (`ldc.i4.s`).
    Int8,
    /// An 8-bit unsigned integer (`unaligned.`, `no.`).
    UInt8,
    /// A 32-bit integer.
    Int32,
    /// A 64-bit integer.
    Int64,
    /// A 32-bit float.
    Float32,
    /// A 64-bit float.
    Float64,
    /// A string literal.
    String,
    /// A parameter reference.
    Parameter,
    /// A local variable reference.
    Variable,
    /// A field reference.
    Field,
    /// A method reference.
    Method,
    /// A type reference.
    Type,
    /// A standalone call-site signature.
    CallSite,
    /// A metadata token that may name a field, a method or a type
    /// (`ldtoken`).
    MemberToken,
    /// A branch target.
    Target,
    /// A table of branch targets (`switch`).
    Targets,
}

impl OpCode {
    /// The kind of operand this opcode encodes.
    pub fn operand_kind(self) -> OperandKind {
        use OpCode::*;
        match self {
            LdargS | LdargaS | StargS | Ldarg | Ldarga | Starg => {
                OperandKind::Parameter
            }
            LdlocS | LdlocaS | StlocS | Ldloc | Ldloca | Stloc => {
                OperandKind::Variable
            }
            LdcI4S => OperandKind::Int8,
            Unaligned | No => OperandKind::UInt8,
            LdcI4 => OperandKind::Int32,
            LdcI8 => OperandKind::Int64,
            LdcR4 => OperandKind::Float32,
            LdcR8 => OperandKind::Float64,
            Ldstr => OperandKind::String,
            BrS | BrfalseS | BrtrueS | BeqS | BgeS | BgtS | BleS | BltS
            | BneUnS | BgeUnS | BgtUnS | BleUnS | BltUnS | Br | Brfalse
            | Brtrue | Beq | Bge | Bgt | Ble | Blt | BneUn | BgeUn | BgtUn
            | BleUn | BltUn | Leave | LeaveS => OperandKind::Target,
            Switch => OperandKind::Targets,
            Call | Callvirt | Jmp | Ldftn | Ldvirtftn | Newobj => {
                OperandKind::Method
            }
            Calli => OperandKind::CallSite,
            Ldfld | Ldflda | Stfld | Ldsfld | Ldsflda | Stsfld => {
                OperandKind::Field
            }
            Cpobj | Ldobj | Stobj | Castclass | Isinst | Unbox | UnboxAny
            | Box | Newarr | Ldelema | Ldelem | Stelem | Refanyval
            | Mkrefany | Initobj | Constrained | Sizeof => OperandKind::Type,
            Ldtoken => OperandKind::MemberToken,
            _ => OperandKind::None,
        }
    }
}

lazy_static! {
    static ref OPCODES_BY_NAME: FxHashMap<String, OpCode> = {
        let mut map = FxHashMap::default();
        for opcode in OpCode::ALL {
            map.insert(normalize_name(opcode.name()), *opcode);
        }
        map
    };
}

/// Normalizes an opcode name for lookup: lowercase, `_` treated as `.`.
fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == '_' { '.' } else { c.to_ascii_lowercase() })
        .collect()
}

impl OpCode {
    /// Looks up an opcode by name.
    ///
    /// Lookup is case-insensitive and accepts `.` and `_` interchangeably,
    /// so `ldarg.0`, `Ldarg_0` and `LDARG.0` all name the same opcode.
    pub fn from_name(name: &str) -> Option<OpCode> {
        OPCODES_BY_NAME.get(&normalize_name(name)).copied()
    }

    /// The underscored alias of the opcode's name (`ldarg_0` for `ldarg.0`),
    /// or `None` when the name contains no dots and thus has no alias.
    pub fn alias(self) -> Option<String> {
        let name = self.name();
        if name.contains('.') {
            Some(name.replace('.', "_"))
        } else {
            None
        }
    }

    /// The operand implied by a short-form opcode, if any.
    ///
    /// `ldarg.2` implies parameter 2, `ldc.i4.m1` implies the constant -1,
    /// and so on. Opcodes that take an explicit operand (or none at all)
    /// return `None`.
    pub fn implicit_operand(self) -> Option<Operand> {
        match self {
            OpCode::Ldarg0 => Some(Operand::Parameter(0)),
            OpCode::Ldarg1 => Some(Operand::Parameter(1)),
            OpCode::Ldarg2 => Some(Operand::Parameter(2)),
            OpCode::Ldarg3 => Some(Operand::Parameter(3)),
            OpCode::Ldloc0 => Some(Operand::Variable(0)),
            OpCode::Ldloc1 => Some(Operand::Variable(1)),
            OpCode::Ldloc2 => Some(Operand::Variable(2)),
            OpCode::Ldloc3 => Some(Operand::Variable(3)),
            OpCode::Stloc0 => Some(Operand::Variable(0)),
            OpCode::Stloc1 => Some(Operand::Variable(1)),
            OpCode::Stloc2 => Some(Operand::Variable(2)),
            OpCode::Stloc3 => Some(Operand::Variable(3)),
            OpCode::LdcI4M1 => Some(Operand::Int32(-1)),
            OpCode::LdcI40 => Some(Operand::Int32(0)),
            OpCode::LdcI41 => Some(Operand::Int32(1)),
            OpCode::LdcI42 => Some(Operand::Int32(2)),
            OpCode::LdcI43 => Some(Operand::Int32(3)),
            OpCode::LdcI44 => Some(Operand::Int32(4)),
            OpCode::LdcI45 => Some(Operand::Int32(5)),
            OpCode::LdcI46 => Some(Operand::Int32(6)),
            OpCode::LdcI47 => Some(Operand::Int32(7)),
            OpCode::LdcI48 => Some(Operand::Int32(8)),
            _ => None,
        }
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns every recognized opcode name, in opcode order.
///
/// For each opcode the canonical dotted name is followed by its underscored
/// alias, when the two differ. External tooling uses this list to derive a
/// recognizer for the opcode vocabulary; lookups through
/// [`OpCode::from_name`] additionally accept any capitalization.
pub fn export_names() -> Vec<String> {
    let mut names = Vec::with_capacity(OpCode::ALL.len() * 2);
    for opcode in OpCode::ALL {
        names.push(opcode.name().to_string());
        if let Some(alias) = opcode.alias() {
            names.push(alias);
        }
    }
    names
}
