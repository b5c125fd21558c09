/*! Resolved checks and the compiled program.

A [`Check`] is the unit both patterns and programs are made of. In a pattern
the compile-time fields (`capture`, `other`, `alternatives`) are unset; the
compiler clones the checks into the program and fills them in while pairing
groups and numbering captures.
*/

use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use itertools::Itertools;
use regex::Regex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use cil_regex_parser::ast::{MemberKind, Quantifier};
use cil_regex_parser::Span;

use crate::il::{escape_string, Operand, OpCodeMatcher};

/// What a `ceq` check compares against, as written: a capture name or a
/// numeric operand slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EqTarget {
    Name(Arc<str>),
    Index(u32),
}

/// One logical matching step.
#[derive(Debug, Clone)]
pub(crate) enum CheckKind {
    /// Zero-width, always succeeds. The program sentinel and the filler for
    /// empty groups and alternatives; also the result of a literal `<nop>`.
    Nop,
    /// `^`.
    Start,
    /// `$`.
    End,
    /// `.`, consumes one instruction unconditionally.
    Any,
    /// `|`.
    Alternative,
    GroupStart {
        capturing: bool,
        name: Option<Arc<str>>,
    },
    GroupEnd,
    /// Matches the opcode only.
    OpCode(OpCodeMatcher),
    /// Matches the opcode and compares the operand to a literal.
    OpCodeOperand(OpCodeMatcher, Operand),
    /// Matches the opcode and stores the operand in a capture slot.
    CaptureOperand(OpCodeMatcher, Option<Arc<str>>),
    /// Matches the opcode and requires the operand to equal a previously
    /// captured (or externally bound) operand. `slot` is resolved by the
    /// compiler; it stays `None` in patterns and for purely external names.
    EqualsOperand {
        matcher: OpCodeMatcher,
        target: EqTarget,
        slot: Option<u32>,
    },
    /// Matches the opcode and requires the reference operand's fully
    /// qualified name to satisfy `regex`, which is derived from `pattern`.
    MemberName {
        kind: MemberKind,
        matcher: OpCodeMatcher,
        pattern: String,
        regex: Regex,
    },
    /// A floating quantifier. Never survives pattern building.
    Quantifier(Quantifier),
}

/// One element of a pattern or program.
#[derive(Debug, Clone)]
pub(crate) struct Check {
    pub kind: CheckKind,
    pub quantifier: Quantifier,
    /// Capture index: the group number for a capturing `GroupStart`, the
    /// operand slot for a `CaptureOperand`. Assigned by the compiler.
    pub capture: Option<u32>,
    /// Program index of the paired delimiter, for group starts and ends.
    pub other: usize,
    /// For a `GroupStart`, the program indices of the `Alternative` checks
    /// directly inside the group.
    pub alternatives: SmallVec<[u32; 2]>,
    /// Source span, for error reporting. Synthetic checks carry an empty
    /// span.
    pub span: Span,
}

impl PartialEq for CheckKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nop, Self::Nop) => true,
            (Self::Start, Self::Start) => true,
            (Self::End, Self::End) => true,
            (Self::Any, Self::Any) => true,
            (Self::Alternative, Self::Alternative) => true,
            (
                Self::GroupStart { capturing: c1, name: n1 },
                Self::GroupStart { capturing: c2, name: n2 },
            ) => c1 == c2 && n1 == n2,
            (Self::GroupEnd, Self::GroupEnd) => true,
            (Self::OpCode(m1), Self::OpCode(m2)) => m1 == m2,
            (Self::OpCodeOperand(m1, o1), Self::OpCodeOperand(m2, o2)) => {
                m1 == m2 && o1 == o2
            }
            (
                Self::CaptureOperand(m1, n1),
                Self::CaptureOperand(m2, n2),
            ) => m1 == m2 && n1 == n2,
            (
                Self::EqualsOperand { matcher: m1, target: t1, slot: s1 },
                Self::EqualsOperand { matcher: m2, target: t2, slot: s2 },
            ) => m1 == m2 && t1 == t2 && s1 == s2,
            (
                Self::MemberName {
                    kind: k1,
                    matcher: m1,
                    pattern: p1,
                    ..
                },
                Self::MemberName {
                    kind: k2,
                    matcher: m2,
                    pattern: p2,
                    ..
                },
            ) => k1 == k2 && m1 == m2 && p1 == p2,
            (Self::Quantifier(q1), Self::Quantifier(q2)) => q1 == q2,
            _ => false,
        }
    }
}

impl PartialEq for Check {
    fn eq(&self, other: &Self) -> bool {
        // Compile-time fields are not part of a check's identity; two
        // patterns are equal when they express the same checks.
        self.kind == other.kind && self.quantifier == other.quantifier
    }
}

impl Check {
    pub fn new(kind: CheckKind, quantifier: Quantifier, span: Span) -> Self {
        Self {
            kind,
            quantifier,
            capture: None,
            other: 0,
            alternatives: SmallVec::new(),
            span,
        }
    }

    /// A synthetic zero-width check.
    pub fn synthetic(kind: CheckKind) -> Self {
        Self::new(kind, Quantifier::ONE, Span::default())
    }
}

impl Display for Check {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CheckKind::Nop => write!(f, "<nop>")?,
            CheckKind::Start => write!(f, "^")?,
            CheckKind::End => write!(f, "$")?,
            CheckKind::Any => write!(f, ".")?,
            CheckKind::Alternative => write!(f, "|")?,
            CheckKind::GroupStart { capturing: false, .. } => {
                write!(f, "(?:")?
            }
            CheckKind::GroupStart { name: Some(name), .. } => {
                write!(f, "(?'{name}'")?
            }
            CheckKind::GroupStart { .. } => write!(f, "(")?,
            CheckKind::GroupEnd => write!(f, ")")?,
            CheckKind::OpCode(matcher) => write!(f, "<op {matcher}>")?,
            CheckKind::OpCodeOperand(matcher, operand) => {
                write!(f, "<op {matcher} {operand}>")?
            }
            CheckKind::CaptureOperand(matcher, None) => {
                write!(f, "<cap {matcher}>")?
            }
            CheckKind::CaptureOperand(matcher, Some(name)) => {
                write!(f, "<cap {matcher} '{name}'>")?
            }
            CheckKind::EqualsOperand { matcher, target, .. } => match target {
                EqTarget::Name(name) => {
                    write!(f, "<ceq {matcher} '{name}'>")?
                }
                EqTarget::Index(index) => {
                    write!(f, "<ceq {matcher} '{index}'>")?
                }
            },
            CheckKind::MemberName { kind, matcher, pattern, .. } => {
                write!(
                    f,
                    "<{} {} \"{}\">",
                    kind.prefix(),
                    matcher,
                    escape_string(pattern)
                )?
            }
            CheckKind::Quantifier(quantifier) => {
                // A floating quantifier prints alone; its own `quantifier`
                // field is the implicit one.
                write!(f, "{quantifier}")?;
                return Ok(());
            }
        }
        write!(f, "{}", self.quantifier)
    }
}

/// The compiled, flat form of a pattern.
///
/// `checks[0]` is a sentinel no-op; `checks[1]` opens the synthetic outer
/// capture group (group 0, the whole match) which the last check closes.
/// Every `GroupStart`/`GroupEnd` pair carries resolved `other` links and the
/// group's alternation entry points.
#[derive(Debug)]
pub(crate) struct Program {
    pub checks: Vec<Check>,
    /// Number of capture groups, the outer group included.
    pub group_count: u32,
    /// Number of operand capture slots.
    pub operand_count: u32,
    pub group_names: FxHashMap<Arc<str>, u32>,
    pub operand_names: FxHashMap<Arc<str>, u32>,
    /// Group index to name, for named groups.
    pub group_name_of: Vec<Option<Arc<str>>>,
    /// Operand slot to name, for named operand captures.
    pub operand_name_of: Vec<Option<Arc<str>>>,
}

impl Program {
    #[inline]
    pub fn check(&self, index: usize) -> &Check {
        &self.checks[index]
    }

    /// The program index of the check that follows `index` within its
    /// sequence, skipping over a whole group when `index` is a group start.
    #[inline]
    pub fn next_in_sequence(&self, index: usize) -> usize {
        match self.checks[index].kind {
            CheckKind::GroupStart { .. } => self.checks[index].other + 1,
            _ => index + 1,
        }
    }
}

impl Display for Program {
    /// Formats the program as a numbered listing, one check per line, with
    /// capture numbers, pair links and alternation entry points spelled
    /// out. Used by the compiler tests to pin down the exact layout.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, check) in self.checks.iter().enumerate() {
            write!(f, "{index:05}: {check}")?;
            if let Some(capture) = check.capture {
                match check.kind {
                    CheckKind::GroupStart { .. } => {
                        write!(f, " group({capture})")?
                    }
                    _ => write!(f, " slot({capture})")?,
                }
            }
            match check.kind {
                CheckKind::GroupStart { .. } | CheckKind::GroupEnd => {
                    write!(f, " other({})", check.other)?;
                    if !check.alternatives.is_empty() {
                        write!(
                            f,
                            " alt({})",
                            check.alternatives.iter().format(",")
                        )?;
                    }
                }
                _ => {}
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
