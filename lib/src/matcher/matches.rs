/*! Match results and the views over captured groups and operands.

A [`MatchResult`] borrows the instruction array it was matched against and
holds a shared handle to the compiled program, so it can both hand out
instruction slices for captured groups and start the next match after its
own end. Lookups that miss (an unmatched group, an unknown name) return
empty views with `success() == false` instead of erroring.
*/

use std::fmt;
use std::fmt::{Debug, Formatter};
use std::ops::Range;
use std::sync::Arc;

use crate::compiler::Program;
use crate::il::{Instruction, MemberRef, Method, Operand};
use crate::matcher::{RawMatch, Runner};
use crate::operands::OperandDictionary;
use crate::{MatchOptions, TypeCastError};

/// The result of a match attempt.
///
/// An unsuccessful match is still a value: `success()` is false, every
/// group and operand lookup returns an empty view, and `index`, `length`
/// and `end` are zero.
#[derive(Clone)]
pub struct MatchResult<'a> {
    program: Arc<Program>,
    options: MatchOptions,
    code: &'a [Instruction],
    method: Option<&'a Method>,
    dictionary: Option<OperandDictionary>,
    matched: bool,
    groups: Vec<Option<Range<usize>>>,
    operands: Vec<Option<Operand>>,
    /// The exclusive upper bound of the search that produced this match;
    /// `next_match` keeps searching up to the same bound.
    search_end: usize,
}

impl<'a> MatchResult<'a> {
    pub(crate) fn new(
        program: Arc<Program>,
        options: MatchOptions,
        code: &'a [Instruction],
        method: Option<&'a Method>,
        dictionary: Option<OperandDictionary>,
        raw: RawMatch,
        search_end: usize,
    ) -> Self {
        Self {
            program,
            options,
            code,
            method,
            dictionary,
            matched: raw.matched,
            groups: raw.groups,
            operands: raw.operands,
            search_end,
        }
    }

    /// True if the pattern matched.
    #[inline]
    pub fn success(&self) -> bool {
        self.matched
    }

    /// The range of the whole match within the instruction array.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.groups
            .first()
            .and_then(|g| g.clone())
            .filter(|_| self.matched)
            .unwrap_or(0..0)
    }

    /// Position of the first matched instruction.
    #[inline]
    pub fn index(&self) -> usize {
        self.range().start
    }

    /// Position right after the last matched instruction.
    #[inline]
    pub fn end(&self) -> usize {
        self.range().end
    }

    /// Number of instructions the match spans.
    #[inline]
    pub fn length(&self) -> usize {
        let range = self.range();
        range.end - range.start
    }

    /// The matched instructions.
    #[inline]
    pub fn instructions(&self) -> &'a [Instruction] {
        &self.code[self.range()]
    }

    /// The captured groups.
    #[inline]
    pub fn groups(&self) -> Groups<'_, 'a> {
        Groups { result: self }
    }

    /// The captured group with the given index. Group 0 is the whole
    /// match.
    pub fn group(&self, index: usize) -> Group<'_, 'a> {
        let range = match self.groups.get(index) {
            Some(range) if self.matched => range.clone(),
            _ => None,
        };
        Group {
            code: self.code,
            range,
            name: self
                .program
                .group_name_of
                .get(index)
                .and_then(|n| n.as_deref()),
        }
    }

    /// The captured group with the given name.
    pub fn group_named(&self, name: &str) -> Group<'_, 'a> {
        match self.program.group_names.get(name) {
            Some(index) => self.group(*index as usize),
            None => Group { code: self.code, range: None, name: None },
        }
    }

    /// The captured operands.
    #[inline]
    pub fn operands(&self) -> Operands<'_> {
        Operands { result: self }
    }

    /// The operand captured by the slot with the given index.
    pub fn operand(&self, index: usize) -> CapturedOperand<'_> {
        CapturedOperand {
            value: match self.operands.get(index) {
                Some(value) if self.matched => value.as_ref(),
                _ => None,
            },
            name: self
                .program
                .operand_name_of
                .get(index)
                .and_then(|n| n.as_deref()),
        }
    }

    /// The operand captured under the given name.
    pub fn operand_named(&self, name: &str) -> CapturedOperand<'_> {
        match self.program.operand_names.get(name) {
            Some(index) => self.operand(*index as usize),
            None => CapturedOperand { value: None, name: None },
        }
    }

    /// Matches the same pattern again, starting where this match ended.
    ///
    /// A zero-length match advances by one position, so iterating
    /// `next_match` until it fails enumerates every non-overlapping match.
    /// Called on an unsuccessful result, the next match is unsuccessful
    /// too.
    pub fn next_match(&self) -> MatchResult<'a> {
        self.next_match_impl(self.search_end)
    }

    /// Like [`MatchResult::next_match`], but with a new exclusive upper
    /// bound for the search.
    pub fn next_match_until(
        &self,
        end: usize,
    ) -> Result<MatchResult<'a>, crate::UsageError> {
        if end > self.code.len() {
            return Err(crate::UsageError::RangeOutOfBounds {
                start: self.end(),
                end,
                len: self.code.len(),
            });
        }
        Ok(self.next_match_impl(end))
    }

    fn next_match_impl(&self, search_end: usize) -> MatchResult<'a> {
        let start = if self.matched && self.length() > 0 {
            self.end()
        } else {
            self.end() + 1
        };
        if !self.matched || start > search_end {
            return MatchResult {
                program: self.program.clone(),
                options: self.options,
                code: self.code,
                method: self.method,
                dictionary: self.dictionary.clone(),
                matched: false,
                groups: vec![None; self.program.group_count as usize],
                operands: vec![None; self.program.operand_count as usize],
                search_end,
            };
        }
        let raw = Runner::new(
            &self.program,
            self.code,
            self.method,
            self.dictionary.as_ref(),
            self.options,
            start,
            search_end,
        )
        .run();
        MatchResult::new(
            self.program.clone(),
            self.options,
            self.code,
            self.method,
            self.dictionary.clone(),
            raw,
            search_end,
        )
    }

    /// Named operands with their values, in slot order. Used to seed an
    /// operand dictionary from a completed match.
    pub(crate) fn named_operands(
        &self,
    ) -> impl Iterator<Item = (&str, &Operand)> {
        self.program
            .operand_name_of
            .iter()
            .zip(self.operands.iter())
            .filter_map(|(name, value)| {
                Some((name.as_deref()?, value.as_ref()?))
            })
    }
}

impl PartialEq for MatchResult<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.code.as_ptr(), other.code.as_ptr())
            && self.matched == other.matched
            && self.groups == other.groups
            && self.operands == other.operands
    }
}

impl Debug for MatchResult<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchResult")
            .field("success", &self.matched)
            .field("range", &self.range())
            .field("groups", &self.groups)
            .field("operands", &self.operands)
            .finish()
    }
}

/// An iterator over successive non-overlapping matches, produced by
/// [`crate::Regex::find_iter`].
///
/// Iteration stops at the first unsuccessful result; a zero-length match
/// advances one position so the iterator always makes progress.
pub struct Matches<'a> {
    next: Option<MatchResult<'a>>,
}

impl<'a> Matches<'a> {
    pub(crate) fn new(first: MatchResult<'a>) -> Self {
        Self { next: Some(first) }
    }
}

impl<'a> Iterator for Matches<'a> {
    type Item = MatchResult<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if !current.success() {
            return None;
        }
        self.next = Some(current.next_match());
        Some(current)
    }
}

/// The collection of captured groups of a match.
pub struct Groups<'m, 'a> {
    result: &'m MatchResult<'a>,
}

impl<'m, 'a> Groups<'m, 'a> {
    /// Number of groups the pattern defines, the whole-match group
    /// included.
    #[inline]
    pub fn count(&self) -> usize {
        self.result.program.group_count as usize
    }

    /// The group with the given index.
    #[inline]
    pub fn get(&self, index: usize) -> Group<'m, 'a> {
        self.result.group(index)
    }

    /// The group with the given name.
    #[inline]
    pub fn by_name(&self, name: &str) -> Group<'m, 'a> {
        self.result.group_named(name)
    }

    /// Iterates over all groups in index order.
    pub fn iter(&self) -> impl Iterator<Item = Group<'m, 'a>> + '_ {
        (0..self.count()).map(|i| self.get(i))
    }
}

/// A captured group: a sub-range of the matched instructions.
///
/// An unmatched or unknown group has `success() == false` and an empty
/// range.
#[derive(Debug, Clone)]
pub struct Group<'m, 'a> {
    code: &'a [Instruction],
    range: Option<Range<usize>>,
    name: Option<&'m str>,
}

impl<'m, 'a> Group<'m, 'a> {
    /// True if the group participated in the match.
    #[inline]
    pub fn success(&self) -> bool {
        self.range.is_some()
    }

    /// The group's name, when it has one.
    #[inline]
    pub fn name(&self) -> Option<&'m str> {
        self.name
    }

    /// The group's range within the instruction array.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.range.clone().unwrap_or(0..0)
    }

    /// Position of the group's first instruction.
    #[inline]
    pub fn start(&self) -> usize {
        self.range().start
    }

    /// Position right after the group's last instruction.
    #[inline]
    pub fn end(&self) -> usize {
        self.range().end
    }

    /// Number of instructions the group spans.
    #[inline]
    pub fn len(&self) -> usize {
        let range = self.range();
        range.end - range.start
    }

    /// True if the group matched zero instructions (or did not match).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The instructions the group captured.
    #[inline]
    pub fn instructions(&self) -> &'a [Instruction] {
        &self.code[self.range()]
    }
}

/// The collection of captured operands of a match.
pub struct Operands<'m> {
    result: &'m MatchResult<'m>,
}

impl<'m> Operands<'m> {
    /// Number of operand capture slots the pattern defines.
    #[inline]
    pub fn count(&self) -> usize {
        self.result.program.operand_count as usize
    }

    /// The operand captured by the slot with the given index.
    #[inline]
    pub fn get(&self, index: usize) -> CapturedOperand<'m> {
        self.result.operand(index)
    }

    /// The operand captured under the given name.
    #[inline]
    pub fn by_name(&self, name: &str) -> CapturedOperand<'m> {
        self.result.operand_named(name)
    }

    /// Iterates over all operand slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = CapturedOperand<'m>> + '_ {
        (0..self.count()).map(|i| self.get(i))
    }
}

macro_rules! value_accessor {
    ($(#[$meta:meta])* $fn:ident, $variant:ident, $ty:ty, $kind:literal) => {
        #[doc = concat!("The captured `", $kind, "` value.")]
        $(#[$meta])*
        pub fn $fn(&self) -> Result<Option<$ty>, TypeCastError> {
            match self.value {
                None => Ok(None),
                Some(Operand::$variant(v)) => Ok(Some(*v)),
                Some(other) => Err(TypeCastError {
                    requested: $kind,
                    actual: other.kind(),
                }),
            }
        }
    };
}

macro_rules! ref_accessor {
    ($(#[$meta:meta])* $fn:ident, $variant:ident, $kind:literal) => {
        #[doc = concat!("The captured `", $kind, "` reference.")]
        $(#[$meta])*
        pub fn $fn(&self) -> Result<Option<&'m MemberRef>, TypeCastError> {
            match self.value {
                None => Ok(None),
                Some(Operand::$variant(r)) => Ok(Some(r)),
                Some(other) => Err(TypeCastError {
                    requested: $kind,
                    actual: other.kind(),
                }),
            }
        }
    };
}

/// One captured operand.
///
/// The typed accessors return `Ok(None)` when nothing was captured and
/// [`TypeCastError`] when the captured operand has a different kind;
/// requesting the wrong type is a programming error, not a failed match.
#[derive(Debug, Clone)]
pub struct CapturedOperand<'m> {
    value: Option<&'m Operand>,
    name: Option<&'m str>,
}

impl<'m> CapturedOperand<'m> {
    /// True if an operand was captured in this slot.
    #[inline]
    pub fn success(&self) -> bool {
        self.value.is_some()
    }

    /// The slot's name, when it has one.
    #[inline]
    pub fn name(&self) -> Option<&'m str> {
        self.name
    }

    /// The captured operand.
    #[inline]
    pub fn value(&self) -> Option<&'m Operand> {
        self.value
    }

    value_accessor!(int32, Int32, i32, "int32");
    value_accessor!(int64, Int64, i64, "int64");
    value_accessor!(int8, Int8, i8, "int8");
    value_accessor!(uint8, UInt8, u8, "uint8");
    value_accessor!(float32, Float32, f32, "float32");
    value_accessor!(float64, Float64, f64, "float64");
    value_accessor!(parameter, Parameter, u32, "parameter");
    value_accessor!(variable, Variable, u32, "variable");

    /// The captured string.
    pub fn string(&self) -> Result<Option<&'m str>, TypeCastError> {
        match self.value {
            None => Ok(None),
            Some(Operand::String(s)) => Ok(Some(s)),
            Some(other) => Err(TypeCastError {
                requested: "string",
                actual: other.kind(),
            }),
        }
    }

    ref_accessor!(field, Field, "field");
    ref_accessor!(method, Method, "method");
    ref_accessor!(type_ref, Type, "type");
    ref_accessor!(callsite, CallSite, "callsite");
}
