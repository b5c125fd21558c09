/*! Abstract syntax for instruction patterns.

A parsed pattern is a flat sequence of [`CheckExpr`] nodes in source order.
Group nesting is not represented as a tree; group delimiters and alternation
markers appear as ordinary checks, exactly as they do in the source, and are
paired later when the pattern is compiled. Every node borrows the opcode
names, capture names and member patterns from the source string.
*/

use std::borrow::Cow;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

use crate::Span;

/// How many times a check may match, and in which order the possibilities
/// are explored.
///
/// `max` is `None` for unbounded quantifiers. A greedy quantifier matches as
/// many iterations as possible and gives them back one at a time when the
/// rest of the pattern fails; a lazy one matches as few as possible and adds
/// iterations only when forced to.
///
/// The textual forms are the usual ones: `?`, `*`, `+`, `{n}`, `{n,}` and
/// `{n,m}`, each optionally suffixed with `?` to make it lazy.
#[derive(Debug, Clone, Copy)]
pub struct Quantifier {
    pub min: u32,
    pub max: Option<u32>,
    pub greedy: bool,
}

impl Quantifier {
    /// The implicit quantifier of an unquantified check.
    pub const ONE: Quantifier = Quantifier { min: 1, max: Some(1), greedy: true };

    /// True if this is the `{1,1}` quantifier, regardless of greediness.
    #[inline]
    pub fn is_one(&self) -> bool {
        self.min == 1 && self.max == Some(1)
    }

    /// True if the quantifier admits exactly one iteration count.
    ///
    /// Greediness is irrelevant for such quantifiers; there is nothing to
    /// give back or add.
    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.max == Some(self.min)
    }
}

impl PartialEq for Quantifier {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min
            && self.max == other.max
            && (self.is_fixed() || self.greedy == other.greedy)
    }
}

impl Eq for Quantifier {}

impl Display for Quantifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_one() {
            return Ok(());
        }
        match (self.min, self.max) {
            (0, Some(1)) => write!(f, "?")?,
            (0, None) => write!(f, "*")?,
            (1, None) => write!(f, "+")?,
            (min, Some(max)) if min == max => write!(f, "{{{min}}}")?,
            (min, None) => write!(f, "{{{min},}}")?,
            (min, Some(max)) => write!(f, "{{{min},{max}}}")?,
        }
        if !self.greedy && !self.is_fixed() {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// Error produced when a quantifier has a valid shape but invalid contents.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid quantifier `{0}`")]
pub struct QuantifierError(pub String);

impl FromStr for Quantifier {
    type Err = QuantifierError;

    /// Parses the textual form of a quantifier, including the optional
    /// laziness suffix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || QuantifierError(s.to_string());
        let (body, greedy) = match s.strip_suffix('?') {
            // A lone `?` is the {0,1} quantifier, not a laziness suffix.
            Some(body) if !body.is_empty() => (body, false),
            _ => (s, true),
        };
        let (min, max) = match body {
            "?" => (0, Some(1)),
            "*" => (0, None),
            "+" => (1, None),
            _ => {
                let body = body
                    .strip_prefix('{')
                    .and_then(|b| b.strip_suffix('}'))
                    .ok_or_else(err)?;
                match body.split_once(',') {
                    None => {
                        let n = parse_bound(body).ok_or_else(err)?;
                        (n, Some(n))
                    }
                    Some((min, "")) => {
                        (parse_bound(min).ok_or_else(err)?, None)
                    }
                    Some((min, max)) => {
                        let min = parse_bound(min).ok_or_else(err)?;
                        let max = parse_bound(max).ok_or_else(err)?;
                        if min > max {
                            return Err(err());
                        }
                        (min, Some(max))
                    }
                }
            }
        };
        if min == 0 && max == Some(0) {
            return Err(err());
        }
        Ok(Quantifier { min, max, greedy })
    }
}

fn parse_bound(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// The kind of member reference a member-name check inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Method,
    Type,
    CallSite,
}

impl MemberKind {
    /// The check prefix that selects this kind (`fld`, `mth`, `typ`, `cls`).
    pub fn prefix(self) -> &'static str {
        match self {
            MemberKind::Field => "fld",
            MemberKind::Method => "mth",
            MemberKind::Type => "typ",
            MemberKind::CallSite => "cls",
        }
    }
}

impl Display for MemberKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Field => write!(f, "field"),
            MemberKind::Method => write!(f, "method"),
            MemberKind::Type => write!(f, "type"),
            MemberKind::CallSite => write!(f, "callsite"),
        }
    }
}

/// An opcode (or opcode family) name as written in the source.
///
/// Family names are written with a leading `%` (for example `%ldarg`); the
/// leading `%` is not part of `name`. The bare word `any` also denotes a
/// family, but that is decided during resolution, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpCodeName<'src> {
    pub name: &'src str,
    pub family: bool,
    pub span: Span,
}

/// A literal operand written next to an opcode in an `op` check.
///
/// Numbers default to `int32`; a trailing type tag selects another numeric
/// type (`l`, `b`, `sb`, `f`, `d`).
#[derive(Debug, Clone, PartialEq)]
pub enum Literal<'src> {
    Int32(i32),
    Int64(i64),
    Int8(i8),
    UInt8(u8),
    Float32(f32),
    Float64(f64),
    String(Cow<'src, str>),
}

/// The capture referenced by a `ceq` check: a name or a numeric slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureRef<'src> {
    Name(&'src str),
    Index(u32),
}

/// A single element of a parsed pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckExpr<'src> {
    pub kind: CheckKind<'src>,
    /// The quantifier attached to this check. Defaults to [`Quantifier::ONE`];
    /// the parser fuses an explicit quantifier token onto the preceding check
    /// when that is permitted.
    pub quantifier: Quantifier,
    pub span: Span,
}

/// The different kinds of checks a pattern is made of.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckKind<'src> {
    /// `^` anchor.
    Start,
    /// `$` anchor.
    End,
    /// `.`, matches any single instruction.
    Any,
    /// `|`, splits the enclosing group into an alternation path.
    Alternative,
    /// `(`, `(?:` or `(?'name'`.
    GroupStart { capturing: bool, name: Option<&'src str> },
    /// `)`.
    GroupEnd,
    /// `<nop>`, a check that always succeeds without consuming input.
    Nop,
    /// `<op opcode>` or `<op opcode literal>`.
    Op { opcode: OpCodeName<'src>, operand: Option<Literal<'src>> },
    /// `<cap opcode>` or `<cap opcode 'name'>`.
    Capture { opcode: OpCodeName<'src>, name: Option<&'src str> },
    /// `<ceq opcode 'name_or_index'>`.
    OperandEquals { opcode: OpCodeName<'src>, capture: CaptureRef<'src> },
    /// `<fld opcode "pattern">` and its `mth`/`typ`/`cls` siblings.
    Member {
        kind: MemberKind,
        opcode: OpCodeName<'src>,
        pattern: Cow<'src, str>,
    },
    /// A quantifier that could not be fused onto the preceding check. The
    /// pattern builder attaches it or reports it as dangling.
    Quantifier(Quantifier),
}

impl CheckExpr<'_> {
    /// True if a quantifier token may fuse onto this check.
    ///
    /// Group starts and alternation markers cannot carry a quantifier, and a
    /// floating quantifier cannot be quantified either. A check that already
    /// has a non-default quantifier is also off limits.
    pub fn accepts_quantifier(&self) -> bool {
        self.quantifier.is_one()
            && !matches!(
                self.kind,
                CheckKind::GroupStart { .. }
                    | CheckKind::Alternative
                    | CheckKind::Quantifier(_)
            )
    }
}
