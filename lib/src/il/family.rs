/*! Multi-opcode families.

A family is a named set of semantically equivalent opcodes. `%ldarg` matches
every way of loading an argument (`ldarg`, `ldarg.s`, `ldarg.0` through
`ldarg.3`), `%ldc.i4` every way of loading an `int32` constant, and the
special family `any` matches every opcode. Families let a pattern say "an
argument load" without enumerating the encodings the compiler may have
picked.
*/

use std::fmt;
use std::fmt::{Display, Formatter};

use crate::il::OpCode;

macro_rules! families {
    ($($variant:ident => $name:literal [$($member:ident)*],)+) => {
        /// A named set of semantically equivalent opcodes.
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum OpCodeFamily {
            /// Matches every opcode.
            Any,
            $($variant,)+
        }

        impl OpCodeFamily {
            /// Every family, `Any` included.
            pub const ALL: &'static [OpCodeFamily] =
                &[OpCodeFamily::Any, $(OpCodeFamily::$variant,)+];

            /// The family's name, as written after `%` in a pattern.
            pub fn name(self) -> &'static str {
                match self {
                    OpCodeFamily::Any => "any",
                    $(OpCodeFamily::$variant => $name,)+
                }
            }

            /// True if `opcode` belongs to this family.
            pub fn matches(self, opcode: OpCode) -> bool {
                match self {
                    OpCodeFamily::Any => true,
                    $(OpCodeFamily::$variant => {
                        matches!(opcode, $(OpCode::$member)|*)
                    })+
                }
            }
        }
    };
}

families! {
    Ldarg => "ldarg" [Ldarg Ldarg0 Ldarg1 Ldarg2 Ldarg3 LdargS],
    Ldarga => "ldarga" [Ldarga LdargaS],
    Starg => "starg" [Starg StargS],
    Ldloc => "ldloc" [Ldloc Ldloc0 Ldloc1 Ldloc2 Ldloc3 LdlocS],
    Ldloca => "ldloca" [Ldloca LdlocaS],
    Stloc => "stloc" [Stloc Stloc0 Stloc1 Stloc2 Stloc3 StlocS],
    LdcI4 => "ldc.i4"
        [LdcI4 LdcI4S LdcI4M1 LdcI40 LdcI41 LdcI42 LdcI43 LdcI44 LdcI45
         LdcI46 LdcI47 LdcI48],
    Br => "br" [Br BrS],
    Brfalse => "brfalse" [Brfalse BrfalseS],
    Brtrue => "brtrue" [Brtrue BrtrueS],
    Beq => "beq" [Beq BeqS],
    Bge => "bge" [Bge BgeS],
    Bgt => "bgt" [Bgt BgtS],
    Ble => "ble" [Ble BleS],
    Blt => "blt" [Blt BltS],
    BneUn => "bne.un" [BneUn BneUnS],
    BgeUn => "bge.un" [BgeUn BgeUnS],
    BgtUn => "bgt.un" [BgtUn BgtUnS],
    BleUn => "ble.un" [BleUn BleUnS],
    BltUn => "blt.un" [BltUn BltUnS],
    Leave => "leave" [Leave LeaveS],
}

impl OpCodeFamily {
    /// Looks up a family by name, with the same normalization rules as
    /// opcode lookup: case-insensitive, `.` and `_` interchangeable.
    pub fn from_name(name: &str) -> Option<OpCodeFamily> {
        let normalized: String = name
            .chars()
            .map(|c| if c == '_' { '.' } else { c.to_ascii_lowercase() })
            .collect();
        OpCodeFamily::ALL.iter().copied().find(|f| f.name() == normalized)
    }
}

impl Display for OpCodeFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
