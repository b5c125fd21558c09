/*! Engine-level tests: end-to-end matching scenarios through the public
API. */

use pretty_assertions::assert_eq;

use crate::il::{Instruction, MemberRef, Method, OpCode, Operand, Parameter};
use crate::{
    Error, MatchOptions, OperandDictionary, Pattern, Regex, TypeCastError,
};

fn regex(pattern: &str) -> Regex {
    Regex::new(&Pattern::parse(pattern).unwrap(), MatchOptions::empty())
        .unwrap()
}

fn op(opcode: OpCode) -> Instruction {
    Instruction::new(opcode)
}

fn ldstr(s: &str) -> Instruction {
    Instruction::with_operand(OpCode::Ldstr, Operand::string(s))
}

fn call(full_name: &str) -> Instruction {
    Instruction::with_operand(
        OpCode::Call,
        Operand::Method(MemberRef::new(full_name, 0)),
    )
}

#[test]
fn plain_opcode_sequence() {
    let code = [
        op(OpCode::Ldarg0),
        op(OpCode::LdcI45),
        op(OpCode::Add),
        op(OpCode::Ret),
    ];

    let result = regex("<op ldarg.0> <op ldc.i4.5> <op add>").find(&code);
    assert!(result.success());
    assert_eq!(result.index(), 0);
    assert_eq!(result.length(), 3);
    assert_eq!(result.operands().count(), 0);
    assert_eq!(result.groups().count(), 1);
}

#[test]
fn operand_backreference_on_argument_loads() {
    let code = [
        op(OpCode::Ldarg0),
        op(OpCode::Ldarg1),
        op(OpCode::Ldarg0),
        op(OpCode::Ret),
    ];

    let result = regex("<cap %ldarg 'p'> . <ceq %ldarg 'p'>").find(&code);
    assert!(result.success());
    assert_eq!(result.index(), 0);
    assert_eq!(result.length(), 3);
    assert_eq!(result.operand_named("p").parameter(), Ok(Some(0)));
}

#[test]
fn backreference_fails_on_differing_operands() {
    // The third instruction loads a different argument than the first.
    let code = [
        op(OpCode::Ldarg0),
        op(OpCode::Nop),
        op(OpCode::Ldarg1),
        op(OpCode::Ret),
    ];

    let result = regex("<cap %ldarg 'p'> . <ceq %ldarg 'p'>").find(&code);
    assert!(!result.success());
}

#[test]
fn greedy_repeat_consumes_all() {
    let code = [op(OpCode::Nop), op(OpCode::Nop), op(OpCode::Nop), op(OpCode::Ret)];

    let result = regex("<op nop>{2,} <op ret>").find(&code);
    assert!(result.success());
    assert_eq!(result.length(), 4);
}

#[test]
fn lazy_repeat_reaches_the_ret() {
    let code = [op(OpCode::Nop), op(OpCode::Nop), op(OpCode::Nop), op(OpCode::Ret)];

    let result = regex("<op nop>{2,}? <op ret>").find(&code);
    assert!(result.success());
    assert_eq!(result.length(), 4);
}

#[test]
fn string_backreference_rejects_unequal_strings() {
    let code = [ldstr("a"), ldstr("b"), op(OpCode::Ret)];

    let result = regex("(?'s'<cap ldstr>) <ceq ldstr 's'>").find(&code);
    assert!(!result.success());
}

#[test]
fn string_backreference_accepts_equal_strings() {
    let code = [ldstr("a"), ldstr("a"), op(OpCode::Ret)];

    let result = regex("<cap ldstr 's'> <ceq ldstr 's'>").find(&code);
    assert!(result.success());
    assert_eq!(result.length(), 2);
    assert_eq!(result.operand_named("s").string(), Ok(Some("a")));
}

#[test]
fn method_name_matching() {
    let code = [call("System.Void Foo::M()"), op(OpCode::Ret)];

    let result = regex(r#"<mth call "M">"#).find(&code);
    assert!(result.success());
    assert_eq!(result.length(), 1);

    // A different member name does not match.
    assert!(!regex(r#"<mth call "N">"#).find(&code).success());

    // The derived regex requires the argument list for methods.
    let field_code = [Instruction::with_operand(
        OpCode::Ldfld,
        Operand::Field(MemberRef::new("System.Int32 Foo::M", 0)),
    )];
    assert!(!regex(r#"<mth ldfld "M">"#).find(&field_code).success());
}

#[test]
fn field_and_type_name_matching() {
    let code = [
        Instruction::with_operand(
            OpCode::Ldfld,
            Operand::Field(MemberRef::new("System.Int32 Counter::count", 0)),
        ),
        Instruction::with_operand(
            OpCode::Ldtoken,
            Operand::Type(MemberRef::new(
                "System.Collections.Generic.List<T>",
                0,
            )),
        ),
    ];

    assert!(regex(r#"<fld ldfld "count">"#).find(&code).success());
    assert!(!regex(r#"<fld ldfld "size">"#).find(&code).success());

    // The type tail admits an optional generic parameter.
    assert!(regex(r#"<typ ldtoken "List">"#).find(&code).success());

    // A `fld` check does not accept a type operand.
    assert!(!regex(r#"<fld ldtoken "List">"#).find(&code).success());
}

#[test]
fn verbatim_member_patterns() {
    let code = [call("System.Void Foo::M()")];

    // The DSL string escapes the backslashes; the regex receives
    // `Foo::M\(\)$`.
    assert!(regex(r#"<mth call "?Foo::M\\(\\)$">"#).find(&code).success());
    assert!(!regex(r#"<mth call "?^M">"#).find(&code).success());
}

#[test]
fn operand_literal_families() {
    // `%ldc.i4` with a literal matches both the shortcut form and the
    // short operand form.
    let code = [op(OpCode::LdcI45), op(OpCode::Ret)];
    let result = regex("<op %ldc.i4 5>").find(&code);
    assert!(result.success());

    let code = [
        Instruction::with_operand(OpCode::LdcI4S, Operand::Int8(5)),
        op(OpCode::Ret),
    ];
    assert!(regex("<op %ldc.i4 5>").find(&code).success());
    assert!(!regex("<op %ldc.i4 6>").find(&code).success());
}

#[test]
fn captured_operands_synthesize_short_forms() {
    let code = [op(OpCode::LdcI47)];

    let result = regex("<cap %ldc.i4 'k'>").find(&code);
    assert!(result.success());
    assert_eq!(result.operand_named("k").int32(), Ok(Some(7)));
}

#[test]
fn external_operand_dictionary() {
    let code = [ldstr("secret"), op(OpCode::Ret)];

    let mut dict = OperandDictionary::new();
    dict.add("needle", Operand::string("secret")).unwrap();

    let re = regex("<ceq ldstr 'needle'>");
    let result = re.find_with(&code, None, Some(&dict), 0, 2).unwrap();
    assert!(result.success());

    let mut wrong = OperandDictionary::new();
    wrong.add("needle", Operand::string("other")).unwrap();
    let result = re.find_with(&code, None, Some(&wrong), 0, 2).unwrap();
    assert!(!result.success());

    // An unbound name fails the check rather than erroring.
    let result = re.find(&code);
    assert!(!result.success());
}

#[test]
fn in_pattern_captures_shadow_the_dictionary() {
    let code = [ldstr("a"), ldstr("a")];

    let mut dict = OperandDictionary::new();
    dict.add("s", Operand::string("not-a")).unwrap();

    // The capture binds `s` to "a" before the ceq runs, so the dictionary
    // binding is ignored.
    let re = regex("<cap ldstr 's'> <ceq ldstr 's'>");
    let result = re.find_with(&code, None, Some(&dict), 0, 2).unwrap();
    assert!(result.success());
}

#[test]
fn dictionary_import_from_match() {
    let code = [ldstr("hello"), op(OpCode::Ret)];

    let result = regex("<cap ldstr 'msg'>").find(&code);
    assert!(result.success());

    let mut dict = OperandDictionary::new();
    dict.add_match(&result).unwrap();
    assert_eq!(dict.get("msg"), Some(&Operand::string("hello")));
}

#[test]
fn short_forms_respect_the_method_context() {
    let mut method = Method::with_instructions(vec![
        op(OpCode::Ldarg1),
        op(OpCode::Ret),
    ]);

    // No parameters declared: ldarg.1 cannot be resolved.
    let re = regex("<cap %ldarg 'p'>");
    assert!(!re.find_method(&method).success());

    method.parameters.push(Parameter::default());
    method.parameters.push(Parameter { name: Some("x".to_string()) });
    let result = re.find_method(&method);
    assert!(result.success());
    assert_eq!(result.operand_named("p").parameter(), Ok(Some(1)));
}

#[test]
fn typed_accessor_mismatches_are_cast_errors() {
    let code = [ldstr("text")];

    let result = regex("<cap ldstr 's'>").find(&code);
    assert!(result.success());
    assert_eq!(
        result.operand_named("s").int32(),
        Err(TypeCastError { requested: "int32", actual: "string" })
    );
    assert_eq!(result.operand_named("s").string(), Ok(Some("text")));

    // Absent captures are `Ok(None)`, not errors.
    assert_eq!(result.operand_named("missing").int32(), Ok(None));
}

#[test]
fn unsuccessful_lookups_return_empty_views() {
    let code = [op(OpCode::Ret)];

    let result = regex("(?'g'<op nop>)?").find(&code);
    assert!(result.success());

    let group = result.group_named("g");
    assert!(!group.success());
    assert_eq!(group.len(), 0);
    assert!(group.instructions().is_empty());

    let group = result.group_named("no_such_group");
    assert!(!group.success());

    let operand = result.operand_named("no_such_operand");
    assert!(!operand.success());
    assert_eq!(operand.value(), None);
}

#[test]
fn match_geometry_invariants() {
    let code = [op(OpCode::Nop), op(OpCode::Nop), op(OpCode::Ret)];

    for pattern in
        ["<op nop>+", "<op ret>", ".*", "(<op nop>|<op ret>)+", "<op nop>?"]
    {
        let result = regex(pattern).find(&code);
        assert!(result.end() >= result.index(), "pattern {pattern}");
        assert_eq!(
            result.length(),
            result.end() - result.index(),
            "pattern {pattern}"
        );
        for group in result.groups().iter() {
            assert!(group.start() <= group.end());
            assert!(group.end() <= code.len());
        }
    }
}

#[test]
fn matching_is_idempotent() {
    let code = [op(OpCode::Ldarg0), op(OpCode::Ldarg0), op(OpCode::Ret)];
    let re = regex("<cap %ldarg 'p'> <ceq %ldarg 'p'>");

    let first = re.find(&code);
    let second = re.find(&code);
    assert!(first.success());
    assert_eq!(first, second);
}

#[test]
fn next_match_iterates_disjoint_matches() {
    let code = [
        op(OpCode::Nop),
        op(OpCode::Ret),
        op(OpCode::Nop),
        op(OpCode::Ret),
    ];
    let re = regex("<op nop> <op ret>");

    let first = re.find(&code);
    assert_eq!(first.range(), 0..2);

    let second = first.next_match();
    assert_eq!(second.range(), 2..4);

    let third = second.next_match();
    assert!(!third.success());
    assert!(!third.next_match().success());
}

#[test]
fn next_match_advances_over_empty_matches() {
    let code = [op(OpCode::Ret), op(OpCode::Nop)];
    let re = regex("<op nop>*");

    let mut ranges = Vec::new();
    let mut result = re.find(&code);
    while result.success() {
        ranges.push(result.range());
        result = result.next_match();
    }
    assert_eq!(ranges, vec![0..0, 1..2, 2..2]);
}

#[test]
fn display_round_trip_preserves_the_pattern() {
    let sources = [
        "<op ldarg.0> <op ldc.i4.5> <op add>",
        "^ (?'g' <op ldarg.0> | <cap %ldarg 'p'> )+? . <ceq %ldarg 'p'> $",
        r#"(?: <op ldc.i4 -3> | <op ldc.r8 1.5d> ) <mth call "M"> <nop>"#,
        r#"<op ldstr "a\nb"> <fld ldfld "count"> <ceq ldstr '0'>"#,
        "<cap ldstr> ( <op dup> ){2,3}? <op any> <op %ldc.i4 7>",
    ];
    for src in sources {
        let pattern = Pattern::parse(src).unwrap();
        let printed = pattern.to_string();
        let reparsed = Pattern::parse(&printed).unwrap_or_else(|e| {
            panic!("`{printed}` failed to re-parse: {e}")
        });
        assert_eq!(pattern, reparsed, "source `{src}` printed `{printed}`");
    }
}

#[test]
fn group_counts_match_the_pattern() {
    let re = regex("(.)(?:.)(?'g'.)");
    assert_eq!(re.group_count(), 3);
    assert_eq!(re.operand_count(), 0);

    let re = regex("<cap ldstr> <cap ldstr 'a'>");
    assert_eq!(re.group_count(), 1);
    assert_eq!(re.operand_count(), 2);
}

#[test]
fn greedy_length_dominates_lazy_length() {
    // For A*B, the greedy expansion of A* is at least as long as the lazy
    // one whenever both match.
    let code = [
        op(OpCode::Nop),
        op(OpCode::Nop),
        op(OpCode::Ret),
        op(OpCode::Ret),
    ];

    let greedy = regex("(?'a'<op nop>*) <op any>").find(&code);
    let lazy = regex("(?'a'<op nop>*?) <op any>").find(&code);
    assert!(greedy.success() && lazy.success());
    assert!(greedy.group_named("a").len() >= lazy.group_named("a").len());
}

#[test]
fn parse_errors_surface_through_the_pattern_api() {
    let err = Pattern::parse("<op>").unwrap_err();
    match err {
        Error::ParseError(parse) => {
            assert_eq!(parse.line, 1);
            assert_eq!(parse.column, 5);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = Pattern::parse("<bogus x>").unwrap_err();
    assert!(err.to_string().contains("unknown ILCheck prefix `bogus`"));
}

#[test]
fn any_opcode_matcher() {
    let code = [op(OpCode::Ldarg0), ldstr("x"), op(OpCode::Ret)];

    let result = regex("<op any>{3}").find(&code);
    assert!(result.success());
    assert_eq!(result.length(), 3);

    // `any` also works for captures: it stores whatever operand is there.
    let result = regex("<op ldarg.0> <cap any 'o'>").find(&code);
    assert!(result.success());
    assert_eq!(result.operand_named("o").string(), Ok(Some("x")));
}

#[test]
fn pattern_warnings_flag_never_matching_checks() {
    // ldc.i4.s carries an int8 operand; the int32 literal never equals it.
    let pattern = Pattern::parse("<op ldc.i4.s 5>").unwrap();
    assert_eq!(pattern.warnings().len(), 1);
    assert!(pattern.warnings()[0].to_string().contains("never matches"));

    let pattern = Pattern::parse("<op ldc.i4 5> <op ldc.i4.s 5sb>").unwrap();
    assert!(pattern.warnings().is_empty());
}

#[test]
fn find_iter_enumerates_disjoint_matches() {
    let code = [
        op(OpCode::Nop),
        op(OpCode::Ret),
        op(OpCode::Nop),
        op(OpCode::Nop),
        op(OpCode::Ret),
    ];

    let ranges: Vec<_> = regex("<op nop>+ <op ret>")
        .find_iter(&code)
        .map(|m| m.range())
        .collect();
    assert_eq!(ranges, vec![0..2, 2..5]);
}

#[test]
fn branch_targets_compare_by_identity() {
    use std::sync::Arc;

    let target = Arc::new(op(OpCode::Ret));
    let other = Arc::new(op(OpCode::Ret));
    let code = [
        Instruction::with_operand(OpCode::BrS, Operand::Target(target.clone())),
        Instruction::with_operand(OpCode::BrS, Operand::Target(target)),
        Instruction::with_operand(OpCode::BrS, Operand::Target(other)),
    ];

    // The first two branches share a target object, the third does not,
    // even though all three targets are structurally identical.
    let re = regex("<cap %br 't'> <ceq %br 't'>");
    let result = re.find(&code);
    assert!(result.success());
    assert_eq!(result.range(), 0..2);

    let result = re.find_in(&code, 1, 3).unwrap();
    assert!(!result.success());
}

#[test]
fn equal_indexed_backreference() {
    let code = [ldstr("x"), ldstr("x")];

    // `'0'` refers to the first (anonymous) operand capture slot.
    let result = regex("<cap ldstr> <ceq ldstr '0'>").find(&code);
    assert!(result.success());
    assert_eq!(result.operand(0).string(), Ok(Some("x")));
}

#[test]
fn lenient_parsing_drops_dangling_quantifiers() {
    assert!(Pattern::parse("( * <op nop> )").is_err());

    let pattern = Pattern::parse_lenient("( * <op nop> )").unwrap();
    let regex = Regex::new(&pattern, MatchOptions::empty()).unwrap();
    let code = [op(OpCode::Nop)];
    assert!(regex.find(&code).success());
}

#[test]
fn patterns_from_files() {
    let path = std::env::temp_dir().join("cil_regex_test_pattern.ilregex");
    std::fs::write(&path, "// header comment\n<op nop> <op ret>\n").unwrap();

    let pattern = Pattern::from_file(&path).unwrap();
    let regex = Regex::new(&pattern, MatchOptions::empty()).unwrap();
    let code = [op(OpCode::Nop), op(OpCode::Ret)];
    assert!(regex.find(&code).success());

    std::fs::remove_file(&path).unwrap();

    match Pattern::from_file("/nonexistent/path.ilregex") {
        Err(Error::IoError(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn nested_group_captures() {
    let code = [
        op(OpCode::Ldarg0),
        Instruction::with_operand(OpCode::LdcI4, Operand::Int32(2)),
        op(OpCode::Mul),
        op(OpCode::Ret),
    ];

    let result = regex("(?'expr' <op ldarg.0> (?'factor' <op ldc.i4 2>) .) <op ret>")
        .find(&code);
    assert!(result.success());
    assert_eq!(result.group_named("expr").range(), 0..3);
    assert_eq!(result.group_named("factor").range(), 1..2);
    assert_eq!(result.group_named("factor").instructions().len(), 1);
    assert_eq!(result.groups().count(), 3);
}

#[test]
fn swap_greedy_equals_inverted_pattern() {
    // Toggling SWAP_GREEDY behaves exactly like inverting every
    // quantifier's greediness in the pattern text.
    let code = [
        op(OpCode::Nop),
        op(OpCode::Nop),
        op(OpCode::Ret),
        op(OpCode::Ret),
    ];

    let swapped = Regex::new(
        &Pattern::parse("(?'a'<op nop>*) (?'b'<op ret>+?)").unwrap(),
        MatchOptions::SWAP_GREEDY,
    )
    .unwrap();
    let inverted = regex("(?'a'<op nop>*?) (?'b'<op ret>+)");

    let left = swapped.find(&code);
    let right = inverted.find(&code);
    assert_eq!(left.range(), right.range());
    assert_eq!(
        left.group_named("a").range(),
        right.group_named("a").range()
    );
    assert_eq!(
        left.group_named("b").range(),
        right.group_named("b").range()
    );
}

#[test]
fn patterns_are_shareable_across_threads() {
    let re = regex("<op nop>+ <op ret>");

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let re = &re;
            scope.spawn(move || {
                let code =
                    [op(OpCode::Nop), op(OpCode::Nop), op(OpCode::Ret)];
                let result = re.find(&code);
                assert!(result.success());
                assert_eq!(result.length(), 3);
            });
        }
    });
}
