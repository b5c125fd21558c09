use std::borrow::Cow;

use pretty_assertions::assert_eq;

use super::{parse, ErrorKind};
use crate::ast::{
    CaptureRef, CheckKind, Literal, MemberKind, OpCodeName, Quantifier,
};
use crate::Span;

#[test]
fn single_opcode_check() {
    let checks = parse("<op ldarg.0>").unwrap();

    assert_eq!(checks.len(), 1);
    assert_eq!(
        checks[0].kind,
        CheckKind::Op {
            opcode: OpCodeName {
                name: "ldarg.0",
                family: false,
                span: Span(4..11)
            },
            operand: None,
        }
    );
    assert_eq!(checks[0].quantifier, Quantifier::ONE);
    assert_eq!(checks[0].span, Span(0..12));
}

#[test]
fn opcode_with_literal() {
    let checks = parse(r#"<op ldc.i4 5> <op ldstr "hi\n"> <op ldc.i8 7l>"#)
        .unwrap();

    assert_eq!(checks.len(), 3);
    assert_eq!(
        checks[0].kind,
        CheckKind::Op {
            opcode: OpCodeName {
                name: "ldc.i4",
                family: false,
                span: Span(4..10)
            },
            operand: Some(Literal::Int32(5)),
        }
    );
    match &checks[1].kind {
        CheckKind::Op { operand: Some(Literal::String(s)), .. } => {
            assert_eq!(s, "hi\n");
            assert!(matches!(s, Cow::Owned(_)));
        }
        other => panic!("unexpected check: {other:?}"),
    }
    match &checks[2].kind {
        CheckKind::Op { operand: Some(Literal::Int64(7)), .. } => {}
        other => panic!("unexpected check: {other:?}"),
    }
}

#[test]
fn quantifier_fuses_onto_preceding_check() {
    let checks = parse("<op ldarg.0>?").unwrap();

    assert_eq!(checks.len(), 1);
    assert_eq!(
        checks[0].quantifier,
        Quantifier { min: 0, max: Some(1), greedy: true }
    );

    let checks = parse("<op nop>{2,}?").unwrap();
    assert_eq!(
        checks[0].quantifier,
        Quantifier { min: 2, max: None, greedy: false }
    );
}

#[test]
fn quantifier_after_group_end() {
    let checks = parse("(<op nop>)*").unwrap();

    assert_eq!(checks.len(), 3);
    assert_eq!(checks[2].kind, CheckKind::GroupEnd);
    assert_eq!(
        checks[2].quantifier,
        Quantifier { min: 0, max: None, greedy: true }
    );
}

#[test]
fn unattachable_quantifier_floats() {
    // After `(` the quantifier has nothing to fuse onto; the builder reports
    // it as dangling later.
    let checks = parse("(*<op nop>)").unwrap();

    assert_eq!(
        checks[1].kind,
        CheckKind::Quantifier(Quantifier { min: 0, max: None, greedy: true })
    );

    // A second quantifier cannot fuse onto an already-quantified check.
    let checks = parse("<op nop>?*").unwrap();
    assert_eq!(
        checks[0].quantifier,
        Quantifier { min: 0, max: Some(1), greedy: true }
    );
    assert_eq!(
        checks[1].kind,
        CheckKind::Quantifier(Quantifier { min: 0, max: None, greedy: true })
    );
}

#[test]
fn groups() {
    let checks = parse("(?'g' <op nop>)").unwrap();

    assert_eq!(checks.len(), 3);
    assert_eq!(
        checks[0].kind,
        CheckKind::GroupStart { capturing: true, name: Some("g") }
    );
    assert!(matches!(checks[1].kind, CheckKind::Op { .. }));
    assert_eq!(checks[2].kind, CheckKind::GroupEnd);

    let checks = parse("(?:.)").unwrap();
    assert_eq!(
        checks[0].kind,
        CheckKind::GroupStart { capturing: false, name: None }
    );
}

#[test]
fn anchors_any_and_alternation() {
    let checks = parse("^ . | $").unwrap();

    assert_eq!(checks.len(), 4);
    assert_eq!(checks[0].kind, CheckKind::Start);
    assert_eq!(checks[1].kind, CheckKind::Any);
    assert_eq!(checks[2].kind, CheckKind::Alternative);
    assert_eq!(checks[3].kind, CheckKind::End);
}

#[test]
fn families_and_captures() {
    let checks =
        parse("<cap %ldarg 'p'> . <ceq %ldarg 'p'> <ceq ldstr '0'>").unwrap();

    assert_eq!(
        checks[0].kind,
        CheckKind::Capture {
            opcode: OpCodeName {
                name: "ldarg",
                family: true,
                span: Span(5..11)
            },
            name: Some("p"),
        }
    );
    match &checks[2].kind {
        CheckKind::OperandEquals { capture: CaptureRef::Name("p"), .. } => {}
        other => panic!("unexpected check: {other:?}"),
    }
    match &checks[3].kind {
        CheckKind::OperandEquals { capture: CaptureRef::Index(0), .. } => {}
        other => panic!("unexpected check: {other:?}"),
    }
}

#[test]
fn member_checks() {
    let checks = parse(r#"<mth call "M"> <fld ldfld "count">"#).unwrap();

    match &checks[0].kind {
        CheckKind::Member { kind: MemberKind::Method, pattern, .. } => {
            assert_eq!(pattern, "M");
        }
        other => panic!("unexpected check: {other:?}"),
    }
    match &checks[1].kind {
        CheckKind::Member { kind: MemberKind::Field, pattern, .. } => {
            assert_eq!(pattern, "count");
        }
        other => panic!("unexpected check: {other:?}"),
    }
}

#[test]
fn nop_check() {
    let checks = parse("<nop>").unwrap();
    assert_eq!(checks[0].kind, CheckKind::Nop);
}

#[test]
fn comments_are_ignored() {
    let checks = parse("/* x */ <op nop> // trailing").unwrap();

    assert_eq!(checks.len(), 1);
    assert!(matches!(checks[0].kind, CheckKind::Op { .. }));
}

#[test]
fn missing_argument_position() {
    let err = parse("<op>").unwrap_err();

    assert!(matches!(err.kind, ErrorKind::WrongArgumentCount { .. }));
    assert_eq!(err.line, 1);
    assert_eq!(err.column, 5);
}

#[test]
fn unknown_prefix() {
    let err = parse("<bogus x>").unwrap_err();

    assert_eq!(err.kind, ErrorKind::UnknownCheckPrefix("bogus".to_string()));
    assert_eq!(
        err.to_string(),
        "error at 1:2: unknown ILCheck prefix `bogus`"
    );
}

#[test]
fn capture_name_validation() {
    // Digit-only capture names are allowed in `ceq` but not in `cap`.
    let err = parse("<cap ldstr '0'>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidCaptureName("0".to_string()));

    let err = parse("<ceq ldstr '9lives'>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidCaptureName("9lives".to_string()));
}

#[test]
fn lexical_errors() {
    let err = parse(r#"<op ldstr "oops>"#).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedString);

    let err = parse("/* no end").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedComment);

    let err = parse("<op nop").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedCheck);

    let err = parse("(?bad").unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedGroupStart);

    let err = parse("@").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedToken("`@`".to_string()));
}

#[test]
fn invalid_literals() {
    let err = parse("<op ldc.i4 5x>").unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::InvalidOperandLiteral("5x".to_string())
    );

    let err = parse("<op ldc.i4 1.5>").unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::InvalidOperandLiteral("1.5".to_string())
    );

    let err = parse("<op nop>{1.5}").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidQuantifier("{1.5}".to_string()));

    let err = parse("<op nop>{3,1}").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidQuantifier("{3,1}".to_string()));
}

#[test]
fn error_positions_are_line_relative() {
    let err = parse("<op nop>\n<bogus x>").unwrap_err();

    assert_eq!(err.line, 2);
    assert_eq!(err.column, 2);
}
