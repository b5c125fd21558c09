/*! The backtracking matcher.

Executes a compiled [`Program`] against an instruction array. The matcher is
a cooperative, single-threaded backtracker: it explores the program depth
first, expanding quantifiers according to their greediness, trying a group's
alternatives left to right, and undoing capture writes whenever a branch
fails. It never raises from matching; exhausting every possibility simply
yields an unsuccessful result.

The interpreter is written in continuation-passing style. Each step receives
the rest of the match as a continuation; returning `false` from deep inside
the continuation chain is what drives backtracking, and each site that wrote
a capture restores the previous value on the way out. This is the recursive
rendition of the state/iteration stacks: the call stack holds exactly one
frame per open quantifier iteration, and a quantifier's pending choices live
in its frame.

A runner is cheap to create and lives for a single `find` call. The program
it executes is immutable and shared.
*/

use std::mem;
use std::ops::Range;

use log::trace;

use crate::compiler::{CheckKind, EqTarget, Program};
use crate::il::{effective_operand, Instruction, Method, Operand};
use crate::operands::OperandDictionary;
use crate::MatchOptions;

use cil_regex_parser::ast::MemberKind;


pub(crate) mod matches;

/// The raw outcome of a runner: the capture tables as they stood when the
/// outer group completed.
pub(crate) struct RawMatch {
    pub matched: bool,
    pub groups: Vec<Option<Range<usize>>>,
    pub operands: Vec<Option<Operand>>,
}

/// A single match attempt over an instruction array.
pub(crate) struct Runner<'a, 'p> {
    program: &'p Program,
    code: &'a [Instruction],
    method: Option<&'a Method>,
    dictionary: Option<&'a OperandDictionary>,
    /// Position the `^` anchor accepts.
    anchor_start: usize,
    /// Position the `$` anchor accepts.
    anchor_end: usize,
    /// First start position the driver tries.
    search_start: usize,
    /// Last start position the driver tries; also the consumption limit.
    search_end: usize,
    swap_greedy: bool,
    groups: Vec<Option<Range<usize>>>,
    operands: Vec<Option<Operand>>,
}

/// The continuation type: "match the rest, starting at this input
/// position".
type Cont<'k, 'a, 'p> = dyn FnMut(&mut Runner<'a, 'p>, usize) -> bool + 'k;

impl<'a, 'p> Runner<'a, 'p> {
    pub fn new(
        program: &'p Program,
        code: &'a [Instruction],
        method: Option<&'a Method>,
        dictionary: Option<&'a OperandDictionary>,
        options: MatchOptions,
        start: usize,
        end: usize,
    ) -> Self {
        let boundaries = options.contains(MatchOptions::SEARCH_BOUNDARIES);
        Self {
            program,
            code,
            method,
            dictionary,
            anchor_start: if boundaries { start } else { 0 },
            anchor_end: if boundaries { end } else { code.len() },
            search_start: start,
            search_end: end,
            swap_greedy: options.contains(MatchOptions::SWAP_GREEDY),
            groups: vec![None; program.group_count as usize],
            operands: vec![None; program.operand_count as usize],
        }
    }

    /// Scans start positions in ascending order and returns the first
    /// match, or an unsuccessful result when every position fails.
    pub fn run(mut self) -> RawMatch {
        for at in self.search_start..=self.search_end {
            trace!("matching at position {at}");
            self.groups.fill(None);
            self.operands.fill(None);
            // The outer group is not quantified; one iteration of it is the
            // whole match. Its completion records group 0.
            if self.group_once(1, at, &mut |_, _| true) {
                return RawMatch {
                    matched: true,
                    groups: self.groups,
                    operands: self.operands,
                };
            }
        }
        RawMatch {
            matched: false,
            groups: vec![None; self.program.group_count as usize],
            operands: vec![None; self.program.operand_count as usize],
        }
    }

    /// Fetches a check through the `'p` program reference, so the borrow is
    /// independent of `&mut self`.
    #[inline]
    fn check_at(&self, index: usize) -> &'p crate::compiler::Check {
        let program = self.program;
        program.check(index)
    }

    /// Matches the sequence of checks starting at `index` until the
    /// enclosing group completes (its `GroupEnd`, or an `Alternative`
    /// belonging to it, is reached), then calls the continuation.
    fn seq(
        &mut self,
        index: usize,
        pos: usize,
        k: &mut Cont<'_, 'a, 'p>,
    ) -> bool {
        match self.check_at(index).kind {
            CheckKind::GroupEnd | CheckKind::Alternative => k(self, pos),
            _ => {
                let next = self.program.next_in_sequence(index);
                self.quantified(index, 0, pos, &mut |r, p| {
                    r.seq(next, p, &mut *k)
                })
            }
        }
    }

    /// Drives the quantifier of the check at `index`. `count` iterations
    /// have already matched.
    ///
    /// Greedy quantifiers try one more iteration first and fall back to the
    /// continuation; lazy ones try the continuation first once the minimum
    /// is reached. An iteration that consumes no input ends the expansion:
    /// it can be repeated forever without progress, so matching more copies
    /// of it can never help.
    fn quantified(
        &mut self,
        index: usize,
        count: u32,
        pos: usize,
        k: &mut Cont<'_, 'a, 'p>,
    ) -> bool {
        let q = self.check_at(index).quantifier;
        let greedy = q.greedy != self.swap_greedy;
        let below_max = q.max.map_or(true, |max| count < max);
        let min = q.min;

        let iterate = |r: &mut Self, k: &mut Cont<'_, 'a, 'p>| {
            r.once(index, pos, &mut |r, p| {
                if p == pos && count + 1 >= min {
                    k(r, p)
                } else {
                    r.quantified(index, count + 1, p, &mut *k)
                }
            })
        };

        if greedy {
            if below_max && iterate(self, &mut *k) {
                return true;
            }
            count >= min && k(self, pos)
        } else {
            if count >= min && k(self, pos) {
                return true;
            }
            below_max && iterate(self, k)
        }
    }

    /// Matches one iteration of the check at `index` at input position
    /// `pos`.
    fn once(
        &mut self,
        index: usize,
        pos: usize,
        k: &mut Cont<'_, 'a, 'p>,
    ) -> bool {
        let code = self.code;
        let check = self.check_at(index);
        match &check.kind {
            CheckKind::Nop => k(self, pos),
            CheckKind::Start => pos == self.anchor_start && k(self, pos),
            CheckKind::End => pos == self.anchor_end && k(self, pos),
            CheckKind::Any => pos < self.search_end && k(self, pos + 1),
            CheckKind::OpCode(matcher) => {
                pos < self.search_end
                    && matcher.matches(code[pos].opcode())
                    && k(self, pos + 1)
            }
            CheckKind::OpCodeOperand(matcher, expected) => {
                pos < self.search_end
                    && crate::il::equals_instruction(
                        &code[pos],
                        matcher,
                        expected,
                        self.method,
                    )
                    && k(self, pos + 1)
            }
            CheckKind::CaptureOperand(matcher, _) => {
                if pos >= self.search_end {
                    return false;
                }
                let instr = &code[pos];
                if !matcher.matches(instr.opcode()) {
                    return false;
                }
                let operand =
                    match effective_operand(instr, matcher, self.method) {
                        Some(operand) => operand.into_owned(),
                        None => return false,
                    };
                let slot = check.capture.unwrap() as usize;
                let saved =
                    mem::replace(&mut self.operands[slot], Some(operand));
                if k(self, pos + 1) {
                    true
                } else {
                    self.operands[slot] = saved;
                    false
                }
            }
            CheckKind::EqualsOperand { matcher, target, slot } => {
                if pos >= self.search_end {
                    return false;
                }
                let instr = &code[pos];
                if !matcher.matches(instr.opcode()) {
                    return false;
                }
                let operand =
                    match effective_operand(instr, matcher, self.method) {
                        Some(operand) => operand,
                        None => return false,
                    };
                // The in-pattern capture wins; the external dictionary is
                // consulted only when the slot holds nothing.
                let expected = slot
                    .and_then(|s| self.operands[s as usize].as_ref())
                    .or_else(|| match target {
                        EqTarget::Name(name) => self
                            .dictionary
                            .and_then(|dict| dict.get(name)),
                        EqTarget::Index(_) => None,
                    });
                let equal = match expected {
                    Some(expected) => {
                        operand.eq_relaxed(expected, matcher.is_family())
                    }
                    None => false,
                };
                equal && k(self, pos + 1)
            }
            CheckKind::MemberName { kind, matcher, regex, .. } => {
                if pos >= self.search_end {
                    return false;
                }
                let instr = &code[pos];
                if !matcher.matches(instr.opcode()) {
                    return false;
                }
                let name = match (kind, instr.operand()) {
                    (MemberKind::Field, Operand::Field(r)) => r.full_name(),
                    (MemberKind::Method, Operand::Method(r)) => r.full_name(),
                    (MemberKind::Type, Operand::Type(r)) => r.full_name(),
                    (MemberKind::CallSite, Operand::CallSite(r)) => {
                        r.full_name()
                    }
                    _ => return false,
                };
                regex.is_match(name) && k(self, pos + 1)
            }
            CheckKind::GroupStart { .. } => self.group_once(index, pos, k),
            // Group ends, alternation markers and floating quantifiers are
            // handled by `seq` and the compiler; they are never driven as
            // atoms.
            CheckKind::GroupEnd
            | CheckKind::Alternative
            | CheckKind::Quantifier(_) => unreachable!(),
        }
    }

    /// Matches one iteration of the group starting at `index`: its first
    /// branch, then each alternation entry point, left to right. When a
    /// branch completes, the group's capture (if any) records this
    /// iteration's range before the continuation runs, and is restored if
    /// the continuation fails.
    fn group_once(
        &mut self,
        index: usize,
        pos: usize,
        k: &mut Cont<'_, 'a, 'p>,
    ) -> bool {
        let check = self.check_at(index);
        let capture = check.capture;
        if self.branch(index + 1, pos, capture, &mut *k) {
            return true;
        }
        for alt in &check.alternatives {
            if self.branch(*alt as usize + 1, pos, capture, &mut *k) {
                return true;
            }
        }
        false
    }

    fn branch(
        &mut self,
        entry: usize,
        pos: usize,
        capture: Option<u32>,
        k: &mut Cont<'_, 'a, 'p>,
    ) -> bool {
        self.seq(entry, pos, &mut |r, p| match capture {
            Some(group) => {
                let slot = group as usize;
                let saved =
                    mem::replace(&mut r.groups[slot], Some(pos..p));
                if k(r, p) {
                    true
                } else {
                    r.groups[slot] = saved;
                    false
                }
            }
            None => k(r, p),
        })
    }
}
