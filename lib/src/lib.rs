/*! A regular expression engine over CIL instruction streams.

Patterns are written in a small textual DSL whose atoms match individual
instructions instead of characters. The usual regex machinery is available
around them: greedy and lazy quantifiers, alternation, nested groups, named
captures and anchors, plus two things character regexes don't have:
operand captures (`<cap ...>`) and operand equality checks (`<ceq ...>`),
which together act like backreferences over instruction operands.

There are two main types in this crate: [`Pattern`] and [`Regex`]. A
pattern is the parsed, immutable form of the DSL text; a regex is the
compiled program ready to run against instructions. Compiled regexes are
immutable and can be shared freely; each `find` call runs an independent
matcher over the input.

# Example

```rust
use cil_regex::il::{Instruction, OpCode, Operand};
use cil_regex::{MatchOptions, Pattern, Regex};

let pattern = Pattern::parse("<cap %ldarg 'arg'> <op ldc.i4 5> <op add>")
    .unwrap();
let regex = Regex::new(&pattern, MatchOptions::empty()).unwrap();

let code = [
    Instruction::new(OpCode::Ldarg0),
    Instruction::with_operand(OpCode::LdcI4, Operand::Int32(5)),
    Instruction::new(OpCode::Add),
    Instruction::new(OpCode::Ret),
];

let result = regex.find(&code);
assert!(result.success());
assert_eq!(result.index(), 0);
assert_eq!(result.length(), 3);
assert_eq!(result.operand_named("arg").parameter(), Ok(Some(0)));
```
*/

#![deny(missing_docs)]

use std::fmt;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use bitflags::bitflags;
use itertools::Itertools;

pub use compiler::{CompileError, Warning};
pub use errors::{Error, ParseError, ParseErrorKind, TypeCastError, UsageError};
pub use matcher::matches::{
    CapturedOperand, Group, Groups, Matches, MatchResult, Operands,
};
pub use operands::OperandDictionary;

pub use cil_regex_parser::ast::{MemberKind, Quantifier};
pub use cil_regex_parser::{line_col, LineCol};

pub mod il;

mod compiler;
mod errors;
mod matcher;
mod operands;

#[cfg(test)]
mod tests;

use compiler::{Check, Program};
use il::{Instruction, Method};
use matcher::Runner;

bitflags! {
    /// Options that alter how a [`Regex`] matches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MatchOptions: u8 {
        /// Make `^` and `$` align to the configured `start`/`end` positions
        /// instead of the beginning and end of the instruction array.
        const SEARCH_BOUNDARIES = 0x01;
        /// Invert the greediness of every quantifier at run time, without
        /// recompiling the pattern.
        const SWAP_GREEDY = 0x02;
    }
}

/// A parsed, immutable instruction pattern.
///
/// Patterns are produced by [`Pattern::parse`] (or [`Pattern::from_file`])
/// and compiled into a runnable [`Regex`]. Formatting a pattern with
/// `Display` produces canonical DSL text that parses back to an equal
/// pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    checks: Vec<Check>,
    warnings: Vec<Warning>,
    source: String,
}

impl Pattern {
    /// Parses pattern text.
    ///
    /// Parsing is strict: a quantifier with nothing to attach to is an
    /// error. See [`Pattern::parse_lenient`] for the forgiving variant.
    pub fn parse(src: &str) -> Result<Pattern, Error> {
        let (checks, warnings) = compiler::build_checks(src, true)?;
        Ok(Pattern { checks, warnings, source: src.to_string() })
    }

    /// Parses pattern text, dropping quantifiers that cannot be attached
    /// instead of reporting them.
    pub fn parse_lenient(src: &str) -> Result<Pattern, Error> {
        let (checks, warnings) = compiler::build_checks(src, false)?;
        Ok(Pattern { checks, warnings, source: src.to_string() })
    }

    /// Diagnostics for checks that are valid but can never match, such as
    /// a literal whose type doesn't fit the opcode's operand.
    #[inline]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Reads and parses a pattern file (conventionally `*.ilregex`,
    /// UTF-8).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Pattern, Error> {
        let src = fs::read_to_string(path)?;
        Pattern::parse(&src)
    }

    /// The source text the pattern was parsed from.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn checks(&self) -> &[Check] {
        &self.checks
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.checks.iter().format(" "))
    }
}

impl PartialEq for Pattern {
    /// Two patterns are equal when they consist of the same checks,
    /// regardless of the spelling of the source text.
    fn eq(&self, other: &Self) -> bool {
        self.checks == other.checks
    }
}

/// A compiled instruction pattern, ready to match.
///
/// A regex is immutable and freely shareable; cloning shares the compiled
/// program. Matching allocates ephemeral state per call, so one regex can
/// serve any number of sequential matches.
#[derive(Debug, Clone)]
pub struct Regex {
    program: Arc<Program>,
    options: MatchOptions,
}

impl Regex {
    /// Compiles a pattern.
    pub fn new(
        pattern: &Pattern,
        options: MatchOptions,
    ) -> Result<Regex, CompileError> {
        let program = compiler::compile(pattern.checks(), pattern.source())?;
        Ok(Regex { program: Arc::new(program), options })
    }

    /// The options the regex was created with.
    #[inline]
    pub fn options(&self) -> MatchOptions {
        self.options
    }

    /// Number of capture groups, the implicit whole-match group included.
    #[inline]
    pub fn group_count(&self) -> u32 {
        self.program.group_count
    }

    /// Number of operand capture slots.
    #[inline]
    pub fn operand_count(&self) -> u32 {
        self.program.operand_count
    }

    /// Matches against a full instruction array.
    pub fn find<'a>(&self, code: &'a [Instruction]) -> MatchResult<'a> {
        // The full range is always valid.
        self.find_with(code, None, None, 0, code.len()).unwrap()
    }

    /// Iterates over every non-overlapping match in `code`, left to
    /// right.
    pub fn find_iter<'a>(&self, code: &'a [Instruction]) -> Matches<'a> {
        Matches::new(self.find(code))
    }

    /// Matches against the body of a method.
    ///
    /// The method also provides the parameter and variable lists used to
    /// resolve short-form operands, so `ldarg.3` only matches when the
    /// method actually has a fourth parameter.
    pub fn find_method<'a>(&self, method: &'a Method) -> MatchResult<'a> {
        self.find_with(
            &method.instructions,
            Some(method),
            None,
            0,
            method.instructions.len(),
        )
        .unwrap()
    }

    /// Matches against the instructions between `start` and `end`.
    pub fn find_in<'a>(
        &self,
        code: &'a [Instruction],
        start: usize,
        end: usize,
    ) -> Result<MatchResult<'a>, UsageError> {
        self.find_with(code, None, None, start, end)
    }

    /// Matches with every knob exposed: an optional method context, an
    /// optional operand dictionary seeding `ceq` names, and the range of
    /// positions to search.
    pub fn find_with<'a>(
        &self,
        code: &'a [Instruction],
        method: Option<&'a Method>,
        operands: Option<&OperandDictionary>,
        start: usize,
        end: usize,
    ) -> Result<MatchResult<'a>, UsageError> {
        if start > end || end > code.len() {
            return Err(UsageError::RangeOutOfBounds {
                start,
                end,
                len: code.len(),
            });
        }
        let raw = Runner::new(
            &self.program,
            code,
            method,
            operands,
            self.options,
            start,
            end,
        )
        .run();
        Ok(MatchResult::new(
            self.program.clone(),
            self.options,
            code,
            method,
            operands.cloned(),
            raw,
            end,
        ))
    }
}
