use super::*;
use crate::config::RunOptions;
use crate::ir::cfg::{verify, Cfg};
use crate::ir::interp::{run, Program, RuntimeError};
use crate::ir::{Inst, Terminator};
use crate::lexer::Lexer;
use crate::parser::Parser;

fn parse(source: &str) -> Ast {
    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);
    Parser::new(tokens)
        .parse_program()
        .unwrap_or_else(|errs| panic!("parse errors: {:?}", errs))
}

fn emit(source: &str) -> Emission {
    let ast = parse(source);
    Emitter::new(&ast)
        .emit_program()
        .unwrap_or_else(|e| panic!("emit error: {}", e))
}

fn emit_err(source: &str) -> EmitError {
    let ast = parse(source);
    match Emitter::new(&ast).emit_program() {
        Ok(emission) => panic!("expected an error, got\n{}", emission.module),
        Err(e) => e,
    }
}

fn eval(source: &str, entry: &str, args: &[i64]) -> i64 {
    let emission = emit(source);
    let program = Program::from_module(emission.module);
    run(&program, entry, args, RunOptions::default())
        .unwrap_or_else(|e| panic!("runtime error: {}", e))
        .value
}

fn phis_in(func: &Function, label: &str) -> usize {
    let block = func.block_by_label(label).expect("block exists");
    func.block(block).phis.len()
}

#[test]
fn constant_expression_function() {
    let emission = emit("fn f() return 3 + 4 * 2");
    assert_eq!(emission.unit, None);
    assert_eq!(
        emission.exports,
        vec![Export {
            name: "f".to_string(),
            arity: 0,
            may_fault: false
        }]
    );
    assert_eq!(eval("fn f() return 3 + 4 * 2", "f", &[]), 11);
}

#[test]
fn constant_expression_listing() {
    let emission = emit("fn f() return 3 + 4 * 2");
    insta::assert_snapshot!(emission.module.to_string(), @r"
    fn @f() -> i64 {
    bb0.entry:
        %0 = iconst 3
        %1 = iconst 4
        %2 = iconst 2
        %3 = mul i64 %1, %2
        %4 = add i64 %0, %3
        ret %4
    bb1.after_return:
        %5 = iconst 0
        ret %5
    }
    ");
}

#[test]
fn straight_line_reassignment_needs_no_phi() {
    let src = "fn f()\n    let a = 1\n    a = a + 1\n    a = a + 1\n    return a\n";
    let emission = emit(src);
    let f = emission.module.get("f").unwrap();
    assert!(f.phis().is_empty());
    assert_eq!(eval(src, "f", &[]), 3);
}

#[test]
fn counted_loop_places_one_phi_per_variable() {
    let src = "fn f()\n    let x = 0\n    for i < 3\n        x = x + i\n    return x\n";
    let emission = emit(src);
    let f = emission.module.get("f").unwrap();
    assert_eq!(phis_in(f, "for.header"), 2);
    assert_eq!(f.phis().len(), 2);
    let header = f.block_by_label("for.header").unwrap();
    for phi in &f.block(header).phis {
        let Inst::Phi(ops) = &f.value(*phi).inst else {
            panic!("phi expected");
        };
        assert_eq!(ops.len(), f.preds(header).len());
    }
    assert_eq!(eval(src, "f", &[]), 3);
}

#[test]
fn loop_bound_is_evaluated_once() {
    let src = "fn f(n)\n    let s = 0\n    for i < n\n        s = s + 1\n        n = 0\n    return s\n";
    assert_eq!(eval(src, "f", &[4]), 4);
}

#[test]
fn loop_with_zero_bound_skips_body() {
    let src = "fn f()\n    let x = 7\n    for i < 0\n        x = 0\n    return x\n";
    assert_eq!(eval(src, "f", &[]), 7);
}

#[test]
fn nested_loops() {
    let src = "fn f()\n    let x = 0\n    for i < 3\n        for j < 4\n            x = x + 1\n    return x\n";
    assert_eq!(eval(src, "f", &[]), 12);
}

#[test]
fn if_where_both_arms_return() {
    let src = "fn f(c)\n    if c\n        return 1\n    else\n        return 0\n";
    let emission = emit(src);
    let f = emission.module.get("f").unwrap();
    let join = f.block_by_label("if.join").unwrap();
    let cfg = Cfg::new(f);
    assert!(!cfg.is_reachable(join));
    assert!(f.preds(join).iter().all(|p| !cfg.is_reachable(*p)));
    assert_eq!(verify(f), Ok(()));
    assert_eq!(eval(src, "f", &[5]), 1);
    assert_eq!(eval(src, "f", &[0]), 0);
}

#[test]
fn if_merges_assignments() {
    let src = "fn f(c)\n    let x = 1\n    if c > 0\n        x = 2\n    return x\n";
    let emission = emit(src);
    let f = emission.module.get("f").unwrap();
    assert_eq!(phis_in(f, "if.join"), 1);
    assert_eq!(eval(src, "f", &[1]), 2);
    assert_eq!(eval(src, "f", &[-1]), 1);
}

#[test]
fn division_by_zero_is_caught_by_the_invoking_frame() {
    let src = "fn f() return 10 / 0\nfn g() return f() + 1\n";
    let emission = emit(src);
    assert_eq!(
        emission.exports.iter().map(|e| e.may_fault).collect::<Vec<_>>(),
        vec![true, false]
    );

    let f = emission.module.get("f").unwrap();
    assert!(f
        .block_ids()
        .any(|b| matches!(f.block(b).term, Some(Terminator::Raise(_)))));
    assert_eq!(f.invoke_count(), 0);
    let g = emission.module.get("g").unwrap();
    assert_eq!(g.invoke_count(), 1);
    assert!(g.block_by_label("fault.landing").is_some());

    let program = Program::from_module(emission.module);
    let result = run(&program, "g", &[], RunOptions::default()).unwrap();
    assert_eq!(result.value, 0);
    assert_eq!(result.reports.len(), 1);
    assert_eq!(result.reports[0].function, "g");
    assert_eq!(result.reports[0].code, 1);

    assert_eq!(
        run(&program, "f", &[], RunOptions::default()),
        Err(RuntimeError::UncaughtFault {
            function: "f".to_string(),
            code: 1
        })
    );
}

#[test]
fn nonzero_divisor_takes_the_normal_path() {
    let src = "fn f(a, b) return a / b\nfn g() return f(9, 2) + 1\n";
    let program = Program::from_module(emit(src).module);
    let result = run(&program, "g", &[], RunOptions::default()).unwrap();
    assert_eq!(result.value, 5);
    assert!(result.reports.is_empty());
}

#[test]
fn float_division_is_unchecked() {
    let emission = emit("fn f() return 1.0 / 0.0 > 1\n");
    assert_eq!(emission.exports[0].may_fault, false);
    assert_eq!(
        emission.module.get("f").unwrap().block_by_label("div.zero"),
        None
    );
}

#[test]
fn mixed_arithmetic_promotes_to_float() {
    assert_eq!(eval("fn f() return 1 + 2.5 * 2\n", "f", &[]), 6);
    let src = "fn f()\n    let x = 1\n    x = x + 0.9\n    return x\n";
    assert_eq!(eval(src, "f", &[]), 1);
}

#[test]
fn negation() {
    assert_eq!(eval("fn f(a) return -a * 2\n", "f", &[3]), -6);
}

#[test]
fn comparisons_yield_zero_or_one() {
    assert_eq!(eval("fn f(a) return (a < 3) + (a == 2)\n", "f", &[2]), 2);
    assert_eq!(eval("fn f(a) return a > 3\n", "f", &[2]), 0);
}

#[test]
fn recursion_through_the_own_symbol() {
    let src = "fn fact(n)\n    if n < 2\n        return 1\n    return n * fact(n - 1)\n";
    assert_eq!(eval(src, "fact", &[5]), 120);
}

#[test]
fn unit_function_returns_last_expression() {
    let emission = emit("fn f(a) return a + 1\nlet x = 4\nf(x)\n");
    assert_eq!(emission.unit.as_deref(), Some("__unit0"));
    assert!(emission.exports.iter().all(|e| e.name != "__unit0"));
    assert_eq!(eval("fn f(a) return a + 1\nlet x = 4\nf(x)\n", "__unit0", &[]), 5);
}

#[test]
fn unit_name_is_configurable() {
    let ast = parse("1 + 1\n");
    let emission = Emitter::new(&ast)
        .with_unit_name("__repl_3")
        .emit_program()
        .unwrap();
    assert_eq!(emission.unit.as_deref(), Some("__repl_3"));
    assert!(emission.module.get("__repl_3").is_some());
}

#[test]
fn scope_hygiene_inner_let_does_not_leak() {
    let err = emit_err("fn f(c)\n    if c\n        let y = 1\n    return y\n");
    assert!(matches!(err, EmitError::UnknownSymbol { ref name, .. } if name == "y"));
    assert_eq!(err.span().line, 4);
}

#[test]
fn scope_hygiene_loop_index_is_local() {
    let err = emit_err("fn f()\n    for i < 2\n        let z = i\n    return i\n");
    assert!(matches!(err, EmitError::UnknownSymbol { ref name, .. } if name == "i"));
}

#[test]
fn shadowing_in_inner_scope_is_allowed() {
    let src = "fn f()\n    let x = 1\n    if 1\n        let x = 5\n    return x\n";
    assert_eq!(eval(src, "f", &[]), 1);
}

#[test]
fn duplicate_let_in_one_scope() {
    let err = emit_err("fn f()\n    let a = 1\n    let a = 2\n    return a\n");
    assert!(matches!(err, EmitError::DuplicateSymbol { ref name, .. } if name == "a"));
}

#[test]
fn parameter_conflicts_with_let() {
    let err = emit_err("fn f(a)\n    let a = 2\n    return a\n");
    assert!(matches!(err, EmitError::DuplicateSymbol { .. }));
}

#[test]
fn duplicate_function() {
    let err = emit_err("fn f() return 1\nfn f() return 2\n");
    assert!(matches!(err, EmitError::DuplicateSymbol { ref name, .. } if name == "f"));
}

#[test]
fn call_arity_is_checked() {
    let err = emit_err("fn f(a) return a\nfn g() return f(1, 2)\n");
    assert!(matches!(
        err,
        EmitError::ArityMismatch {
            expected: 1,
            found: 2,
            ..
        }
    ));
}

#[test]
fn unknown_function_and_variable() {
    assert!(matches!(
        emit_err("fn g() return h()\n"),
        EmitError::UnknownSymbol { kind: "function", .. }
    ));
    assert!(matches!(
        emit_err("fn g() return q\n"),
        EmitError::UnknownSymbol { kind: "variable", .. }
    ));
}

#[test]
fn assigning_to_a_function_is_rejected() {
    let err = emit_err("fn f() return 1\nfn g()\n    f = 2\n    return 0\n");
    assert!(matches!(err, EmitError::UnknownSymbol { kind: "variable", .. }));
}

#[test]
fn calling_a_variable_is_rejected() {
    let err = emit_err("fn g(a) return a(1)\n");
    assert!(matches!(err, EmitError::UnknownSymbol { kind: "function", .. }));
}

#[test]
fn code_after_return_is_dead_but_well_formed() {
    let src = "fn f()\n    return 1\n    let y = 2\n    return y\n";
    let emission = emit(src);
    let f = emission.module.get("f").unwrap();
    assert_eq!(verify(f), Ok(()));
    assert_eq!(eval(src, "f", &[]), 1);
}

#[test]
fn earlier_exports_are_callable() {
    let first = emit("fn f(a) return 10 / a\n");
    let ast = parse("fn g() return f(0) + 3\n");
    let second = Emitter::new(&ast)
        .with_exports(&first.exports)
        .unwrap()
        .emit_program()
        .unwrap();
    assert_eq!(second.module.get("g").unwrap().invoke_count(), 1);

    let mut program = Program::from_module(first.module);
    program.link(second.module);
    let result = run(&program, "g", &[], RunOptions::default()).unwrap();
    assert_eq!(result.value, 0);
}

#[test]
fn an_export_listed_twice_is_a_duplicate() {
    let first = emit("fn f(a) return a\n");
    let mut exports = first.exports.clone();
    exports.extend(first.exports.iter().cloned());
    let ast = parse("fn g() return f(1)\n");
    assert!(matches!(
        Emitter::new(&ast).with_exports(&exports),
        Err(EmitError::DuplicateSymbol { ref name, .. }) if name == "f"
    ));
}

#[test]
fn pi_is_a_builtin_constant() {
    assert_eq!(eval("fn f() return pi() * 2\n", "f", &[]), 6);
    let emission = emit("fn f() return pi()\n");
    let f = emission.module.get("f").unwrap();
    assert_eq!(f.invoke_count(), 0);
    assert!(!emission.module.to_string().contains("@pi("));
}

#[test]
fn a_user_function_named_pi_shadows_the_builtin() {
    let src = "fn pi() return 3\nfn f() return pi() * 2\n";
    assert_eq!(eval(src, "f", &[]), 6);
    assert!(emit(src).module.to_string().contains("call i64 @pi()"));
}

#[test]
fn pi_takes_no_arguments() {
    let err = emit_err("fn f() return pi(1)\n");
    assert!(matches!(
        err,
        EmitError::ArityMismatch { expected: 0, found: 1, .. }
    ));
}

#[test]
fn thousands_of_sequential_divisions_compile_and_run() {
    let mut src = String::from("fn f()\n    let a = 1\n");
    for k in 1..=5_000 {
        src.push_str(&format!("    let b{} = {} / 1\n", k, k));
    }
    src.push_str("    return a\n");
    let emission = emit(&src);
    assert_eq!(emission.module.get("f").unwrap().phis().len(), 0);
    let program = Program::from_module(emission.module);
    let result = run(&program, "f", &[], RunOptions::default()).unwrap();
    assert_eq!(result.value, 1);
}

#[test]
fn custom_fault_identity_reaches_the_payload() {
    let ast = parse("fn f() return 1 / 0\n");
    let options = CompileOptions::default().with_fault_code(42);
    let emission = Emitter::new(&ast).with_options(options).emit_program().unwrap();
    let f = emission.module.get("f").unwrap();
    assert_eq!(
        f.count_insts(|i| matches!(i, Inst::FaultAlloc { code: 42, .. })),
        1
    );
}

#[test]
fn every_emitted_function_verifies() {
    let src = "fn a(x)\n    let y = 0\n    for i < x\n        if i > 1\n            y = y + i / 2\n        else\n            y = y - 1\n    return y\nfn b() return a(5) + a(0)\n";
    let emission = emit(src);
    for func in &emission.module.functions {
        assert_eq!(verify(func), Ok(()), "{}", func);
    }
}
