/*! Turns pattern text into a compiled program.

Compilation happens in two steps. *Resolution* converts the parser's checks
into typed ones: opcode names are looked up in the opcode table, literals
become operands, member patterns become compiled regexes, and floating
quantifiers are attached to the check they follow (or reported as dangling).
The result is the immutable check sequence a [`crate::Pattern`] wraps.

*Flattening* then lays the checks out as a program: a sentinel no-op at
index 0, a synthetic capture group around everything (so group 0 is always
the whole match), resolved `other` links between group delimiters, per-group
alternation lists, numbered captures, and no-op fillers wherever a group or
alternative would otherwise be empty.
*/

use std::sync::Arc;

use log::debug;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use cil_regex_parser::ast::{self, MemberKind};
use cil_regex_parser::{line_col, Span};

use crate::il::{OpCode, OpCodeFamily, OpCodeMatcher, Operand, OperandKind};
use crate::Error;

pub use errors::CompileError;
pub use warnings::Warning;

pub(crate) use checks::{Check, CheckKind, EqTarget, Program};

mod checks;
mod errors;
mod warnings;

/// Parses and resolves pattern text into a check sequence, plus any
/// never-matching-check warnings found along the way.
///
/// With `strict` set, a quantifier that cannot be attached to the check it
/// follows is an error; otherwise it is silently dropped.
pub(crate) fn build_checks(
    src: &str,
    strict: bool,
) -> Result<(Vec<Check>, Vec<Warning>), Error> {
    let parsed = cil_regex_parser::parse(src)?;
    let mut checks: Vec<Check> = Vec::with_capacity(parsed.len());
    let mut warnings: Vec<Warning> = Vec::new();
    let mut group_names: FxHashSet<Arc<str>> = FxHashSet::default();
    let mut operand_names: FxHashSet<Arc<str>> = FxHashSet::default();

    for expr in &parsed {
        let kind = match &expr.kind {
            ast::CheckKind::Start => CheckKind::Start,
            ast::CheckKind::End => CheckKind::End,
            ast::CheckKind::Any => CheckKind::Any,
            ast::CheckKind::Alternative => CheckKind::Alternative,
            ast::CheckKind::GroupEnd => CheckKind::GroupEnd,
            ast::CheckKind::Nop => CheckKind::Nop,
            ast::CheckKind::GroupStart { capturing, name } => {
                let name = name.map(Arc::<str>::from);
                if let Some(name) = &name {
                    if !group_names.insert(name.clone()) {
                        return Err(duplicate_name(name, src, &expr.span));
                    }
                }
                CheckKind::GroupStart { capturing: *capturing, name }
            }
            ast::CheckKind::Op { opcode, operand } => {
                let matcher = resolve_opcode(opcode, src)?;
                match operand {
                    None => CheckKind::OpCode(matcher),
                    Some(literal) => {
                        let operand = resolve_literal(literal);
                        lint_literal(
                            &matcher,
                            &operand,
                            src,
                            &expr.span,
                            &mut warnings,
                        );
                        CheckKind::OpCodeOperand(matcher, operand)
                    }
                }
            }
            ast::CheckKind::Capture { opcode, name } => {
                let matcher = resolve_opcode(opcode, src)?;
                lint_capture(&matcher, src, &expr.span, &mut warnings);
                let name = name.map(Arc::<str>::from);
                if let Some(name) = &name {
                    if !operand_names.insert(name.clone()) {
                        return Err(duplicate_name(name, src, &expr.span));
                    }
                }
                CheckKind::CaptureOperand(matcher, name)
            }
            ast::CheckKind::OperandEquals { opcode, capture } => {
                let matcher = resolve_opcode(opcode, src)?;
                lint_capture(&matcher, src, &expr.span, &mut warnings);
                let target = match capture {
                    ast::CaptureRef::Name(name) => {
                        EqTarget::Name(Arc::from(*name))
                    }
                    ast::CaptureRef::Index(index) => EqTarget::Index(*index),
                };
                CheckKind::EqualsOperand { matcher, target, slot: None }
            }
            ast::CheckKind::Member { kind, opcode, pattern } => {
                let matcher = resolve_opcode(opcode, src)?;
                lint_member(*kind, &matcher, src, &expr.span, &mut warnings);
                let regex = member_regex(*kind, pattern).map_err(|e| {
                    Error::from(CompileError::InvalidMemberPattern {
                        pattern: pattern.to_string(),
                        error: e.to_string(),
                    })
                })?;
                CheckKind::MemberName {
                    kind: *kind,
                    matcher,
                    pattern: pattern.to_string(),
                    regex,
                }
            }
            ast::CheckKind::Quantifier(quantifier) => {
                match checks.last_mut() {
                    Some(last)
                        if last.quantifier.is_one()
                            && !matches!(
                                last.kind,
                                CheckKind::GroupStart { .. }
                                    | CheckKind::Alternative
                                    | CheckKind::Quantifier(_)
                            ) =>
                    {
                        last.quantifier = *quantifier;
                    }
                    _ if strict => {
                        let pos = line_col(src, expr.span.start());
                        return Err(CompileError::DanglingQuantifier {
                            line: pos.line,
                            column: pos.column,
                        }
                        .into());
                    }
                    // Lenient mode drops the quantifier.
                    _ => {}
                }
                continue;
            }
        };
        checks.push(Check::new(kind, expr.quantifier, expr.span.clone()));
    }

    Ok((checks, warnings))
}

/// Warns when a literal's type cannot possibly equal the operand of a
/// concrete opcode. Family matchers are exempt: they compare numeric
/// primitives by value across types.
fn lint_literal(
    matcher: &OpCodeMatcher,
    literal: &Operand,
    src: &str,
    span: &Span,
    warnings: &mut Vec<Warning>,
) {
    let OpCodeMatcher::Code(code) = matcher else {
        return;
    };
    let expected = code.operand_kind();
    let found = match literal {
        Operand::Int32(_) => OperandKind::Int32,
        Operand::Int64(_) => OperandKind::Int64,
        Operand::Int8(_) => OperandKind::Int8,
        Operand::UInt8(_) => OperandKind::UInt8,
        Operand::Float32(_) => OperandKind::Float32,
        Operand::Float64(_) => OperandKind::Float64,
        Operand::String(_) => OperandKind::String,
        _ => return,
    };
    if expected != found {
        let pos = line_col(src, span.start());
        warnings.push(Warning::LiteralKindMismatch {
            opcode: code.name().to_string(),
            expected,
            found,
            line: pos.line,
            column: pos.column,
        });
    }
}

/// Warns when a `cap`/`ceq` names a concrete opcode that neither encodes
/// nor implies an operand.
fn lint_capture(
    matcher: &OpCodeMatcher,
    src: &str,
    span: &Span,
    warnings: &mut Vec<Warning>,
) {
    let OpCodeMatcher::Code(code) = matcher else {
        return;
    };
    if code.operand_kind() == OperandKind::None
        && code.implicit_operand().is_none()
    {
        let pos = line_col(src, span.start());
        warnings.push(Warning::NoOperandToCapture {
            opcode: code.name().to_string(),
            line: pos.line,
            column: pos.column,
        });
    }
}

/// Warns when a member-name check names a concrete opcode whose operand is
/// not a reference of the inspected kind.
fn lint_member(
    kind: MemberKind,
    matcher: &OpCodeMatcher,
    src: &str,
    span: &Span,
    warnings: &mut Vec<Warning>,
) {
    let OpCodeMatcher::Code(code) = matcher else {
        return;
    };
    let operand_kind = code.operand_kind();
    let compatible = match kind {
        // `ldtoken` can name any member, so it satisfies every kind but
        // `cls`.
        MemberKind::Field => matches!(
            operand_kind,
            OperandKind::Field | OperandKind::MemberToken
        ),
        MemberKind::Method => matches!(
            operand_kind,
            OperandKind::Method | OperandKind::MemberToken
        ),
        MemberKind::Type => matches!(
            operand_kind,
            OperandKind::Type | OperandKind::MemberToken
        ),
        MemberKind::CallSite => operand_kind == OperandKind::CallSite,
    };
    if !compatible {
        let pos = line_col(src, span.start());
        warnings.push(Warning::MemberKindMismatch {
            opcode: code.name().to_string(),
            member: kind.to_string(),
            line: pos.line,
            column: pos.column,
        });
    }
}

fn duplicate_name(name: &str, src: &str, span: &Span) -> Error {
    let pos = line_col(src, span.start());
    CompileError::DuplicateCaptureName {
        name: name.to_string(),
        line: pos.line,
        column: pos.column,
    }
    .into()
}

fn resolve_opcode(
    opcode: &ast::OpCodeName<'_>,
    src: &str,
) -> Result<OpCodeMatcher, Error> {
    let pos = line_col(src, opcode.span.start());
    if opcode.family {
        return match OpCodeFamily::from_name(opcode.name) {
            Some(family) => Ok(OpCodeMatcher::Family(family)),
            None => Err(CompileError::UnknownFamily {
                name: opcode.name.to_string(),
                line: pos.line,
                column: pos.column,
            }
            .into()),
        };
    }
    if let Some(code) = OpCode::from_name(opcode.name) {
        return Ok(OpCodeMatcher::Code(code));
    }
    // The bare word `any` is the universal family.
    if opcode.name.eq_ignore_ascii_case("any") {
        return Ok(OpCodeMatcher::Family(OpCodeFamily::Any));
    }
    Err(CompileError::UnknownOpCode {
        name: opcode.name.to_string(),
        line: pos.line,
        column: pos.column,
    }
    .into())
}

fn resolve_literal(literal: &ast::Literal<'_>) -> Operand {
    match literal {
        ast::Literal::Int32(v) => Operand::Int32(*v),
        ast::Literal::Int64(v) => Operand::Int64(*v),
        ast::Literal::Int8(v) => Operand::Int8(*v),
        ast::Literal::UInt8(v) => Operand::UInt8(*v),
        ast::Literal::Float32(v) => Operand::Float32(*v),
        ast::Literal::Float64(v) => Operand::Float64(*v),
        ast::Literal::String(s) => Operand::string(s.as_ref()),
    }
}

/// Derives the regex a member-name check runs against fully qualified
/// names.
///
/// A pattern starting with `?` is used verbatim. Anything else is a literal
/// member name: it must appear at the beginning of the name or right after
/// a space, dot or colon, and is followed by a kind-specific tail (an
/// optional generic parameter for types, that plus a parenthesized argument
/// list for methods).
fn member_regex(
    kind: MemberKind,
    pattern: &str,
) -> Result<Regex, regex::Error> {
    if let Some(verbatim) = pattern.strip_prefix('?') {
        return Regex::new(verbatim);
    }
    let mut src = String::from(r"(?:^|[ .:])");
    src.push_str(&regex::escape(pattern));
    match kind {
        MemberKind::Field | MemberKind::CallSite => {}
        MemberKind::Type => src.push_str(r"(?:<[A-Za-z_]\w*>)?"),
        MemberKind::Method => {
            src.push_str(r"(?:<[A-Za-z_]\w*>)?");
            src.push_str(r"\(.*\)");
        }
    }
    Regex::new(&src)
}

/// Flattens a check sequence into a program.
pub(crate) fn compile(
    checks: &[Check],
    src: &str,
) -> Result<Program, CompileError> {
    let unbalanced = |span: &Span| {
        let pos = line_col(src, span.start());
        CompileError::UnbalancedGroup { line: pos.line, column: pos.column }
    };

    let mut program: Vec<Check> = Vec::with_capacity(checks.len() + 4);
    program.push(Check::synthetic(CheckKind::Nop));
    program.push({
        let mut outer = Check::synthetic(CheckKind::GroupStart {
            capturing: true,
            name: None,
        });
        outer.capture = Some(0);
        outer
    });

    // Stack of open group starts (program indices) and, in parallel, the
    // alternation entry points collected for each of them. The synthetic
    // outer group is the bottom entry.
    let mut starts: Vec<usize> = vec![1];
    let mut alternatives: Vec<Vec<u32>> = vec![Vec::new()];

    let mut group_count: u32 = 0;
    let mut operand_count: u32 = 0;
    let mut group_names: FxHashMap<Arc<str>, u32> = FxHashMap::default();
    let mut operand_names: FxHashMap<Arc<str>, u32> = FxHashMap::default();
    let mut group_name_of: Vec<Option<Arc<str>>> = vec![None];
    let mut operand_name_of: Vec<Option<Arc<str>>> = Vec::new();

    for check in checks {
        match &check.kind {
            CheckKind::GroupStart { capturing, name } => {
                if !check.quantifier.is_one() {
                    let pos = line_col(src, check.span.start());
                    return Err(CompileError::UnquantifiableCheck {
                        line: pos.line,
                        column: pos.column,
                    });
                }
                let mut cloned = check.clone();
                if *capturing {
                    group_count += 1;
                    cloned.capture = Some(group_count);
                    group_name_of.push(name.clone());
                    if let Some(name) = name {
                        group_names.insert(name.clone(), group_count);
                    }
                }
                starts.push(program.len());
                alternatives.push(Vec::new());
                program.push(cloned);
            }
            CheckKind::GroupEnd => {
                // The bottom entry belongs to the synthetic outer group; a
                // user `)` may not close it.
                if starts.len() == 1 {
                    return Err(unbalanced(&check.span));
                }
                let start = starts.pop().unwrap();
                let alts = alternatives.pop().unwrap();
                fill_empty_branch(&mut program, start, &alts);

                let end = program.len();
                let mut cloned = check.clone();
                cloned.other = start;
                cloned.alternatives = SmallVec::from_slice(&alts);
                program[start].other = end;
                program[start].alternatives = SmallVec::from_slice(&alts);
                // The quantifier is written after `)` but drives the whole
                // group, which the matcher enters at the start check.
                program[start].quantifier = cloned.quantifier;
                program.push(cloned);
            }
            CheckKind::Alternative => {
                if !check.quantifier.is_one() {
                    let pos = line_col(src, check.span.start());
                    return Err(CompileError::UnquantifiableCheck {
                        line: pos.line,
                        column: pos.column,
                    });
                }
                let start = *starts.last().unwrap();
                let alts = alternatives.last().unwrap();
                fill_empty_branch(&mut program, start, alts);
                alternatives.last_mut().unwrap().push(program.len() as u32);
                program.push(check.clone());
            }
            CheckKind::CaptureOperand(_, name) => {
                let mut cloned = check.clone();
                cloned.capture = Some(operand_count);
                operand_name_of.push(name.clone());
                if let Some(name) = name {
                    operand_names.insert(name.clone(), operand_count);
                }
                operand_count += 1;
                program.push(cloned);
            }
            CheckKind::Quantifier(_) => {
                let pos = line_col(src, check.span.start());
                return Err(CompileError::DanglingQuantifier {
                    line: pos.line,
                    column: pos.column,
                });
            }
            _ => program.push(check.clone()),
        }
    }

    if starts.len() > 1 {
        let span = program[*starts.last().unwrap()].span.clone();
        return Err(unbalanced(&span));
    }

    // Close the synthetic outer group.
    let start = starts.pop().unwrap();
    let alts = alternatives.pop().unwrap();
    fill_empty_branch(&mut program, start, &alts);
    let end = program.len();
    let mut outer_end = Check::synthetic(CheckKind::GroupEnd);
    outer_end.other = start;
    outer_end.alternatives = SmallVec::from_slice(&alts);
    program[start].other = end;
    program[start].alternatives = SmallVec::from_slice(&alts);
    program.push(outer_end);

    // Resolve `ceq` targets now that every capture slot is numbered.
    for check in program.iter_mut() {
        if let CheckKind::EqualsOperand { target, slot, .. } = &mut check.kind
        {
            match target {
                EqTarget::Name(name) => {
                    *slot = operand_names.get(name).copied();
                }
                EqTarget::Index(index) => {
                    if *index >= operand_count {
                        return Err(CompileError::UnknownOperandIndex {
                            index: *index,
                            count: operand_count,
                        });
                    }
                    *slot = Some(*index);
                }
            }
        }
    }

    let program = Program {
        checks: program,
        group_count: group_count + 1,
        operand_count,
        group_names,
        operand_names,
        group_name_of,
        operand_name_of,
    };

    debug!(
        "compiled pattern: {} check(s), {} group(s), {} operand slot(s)",
        program.checks.len(),
        program.group_count,
        program.operand_count,
    );

    Ok(program)
}

/// Inserts a no-op when a group branch would otherwise be empty, i.e. when
/// a `)` or `|` immediately follows the group's `(` or a previous `|`.
fn fill_empty_branch(program: &mut Vec<Check>, start: usize, alts: &[u32]) {
    let last = program.len() - 1;
    let branch_open =
        last == start || alts.last().is_some_and(|a| *a as usize == last);
    if branch_open {
        program.push(Check::synthetic(CheckKind::Nop));
    }
}
