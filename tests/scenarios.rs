use jitcalc::{compile, run, Module, Program, RunOptions, RuntimeError, Session};

fn compile_ok(source: &str) -> Module {
    compile(source, "scenario.calc").unwrap_or_else(|errs| {
        panic!(
            "should compile, got {} errors: {:?}",
            errs.len(),
            errs.iter().map(|e| &e.message).collect::<Vec<_>>()
        )
    })
}

fn run_ok(source: &str, entry: &str, args: &[i64]) -> jitcalc::Execution {
    let program = Program::from_module(compile_ok(source));
    run(&program, entry, args, RunOptions::default())
        .unwrap_or_else(|e| panic!("{} failed: {}", entry, e))
}

// ── Straight-line and arithmetic ──

#[test]
fn test_precedence_in_returned_expression() {
    assert_eq!(run_ok("fn f() return 3 + 4 * 2\n", "f", &[]).value, 11);
}

#[test]
fn test_reassignment_chain_has_no_phis() {
    let src = "fn f()\n    let a = 1\n    a = a + 1\n    a = a + 1\n    return a\n";
    let module = compile_ok(src);
    assert!(module.get("f").unwrap().phis().is_empty());
    assert_eq!(run_ok(src, "f", &[]).value, 3);
}

#[test]
fn test_integer_overflow_wraps() {
    let src = "fn f(a) return a * 2\n";
    assert_eq!(run_ok(src, "f", &[i64::MAX]).value, -2);
}

// ── Control flow ──

#[test]
fn test_loop_sum() {
    let src = "fn f()\n    let x = 0\n    for i < 3\n        x = x + i\n    return x\n";
    let module = compile_ok(src);
    let f = module.get("f").unwrap();
    let header = f.block_by_label("for.header").unwrap();
    assert_eq!(f.block(header).phis.len(), 2);
    assert_eq!(run_ok(src, "f", &[]).value, 3);
}

#[test]
fn test_fibonacci_loop() {
    let src = "fn fib(n)\n    let a = 0\n    let b = 1\n    for i < n\n        let t = a + b\n        a = b\n        b = t\n    return a\n";
    assert_eq!(run_ok(src, "fib", &[10]).value, 55);
    assert_eq!(run_ok(src, "fib", &[0]).value, 0);
}

#[test]
fn test_both_arms_return() {
    let src = "fn f(c)\n    if c\n        return 1\n    else\n        return 0\n";
    assert_eq!(run_ok(src, "f", &[3]).value, 1);
    assert_eq!(run_ok(src, "f", &[0]).value, 0);
}

#[test]
fn test_recursive_fibonacci() {
    let src = "fn fib(n)\n    if n < 2\n        return n\n    return fib(n - 1) + fib(n - 2)\n";
    assert_eq!(run_ok(src, "fib", &[15]).value, 610);
}

// ── Division faults ──

#[test]
fn test_fault_in_callee_is_caught_by_caller() {
    let src = "fn f() return 10 / 0\nfn g() return f() + 1\n";
    let exec = run_ok(src, "g", &[]);
    assert_eq!(exec.value, 0);
    assert_eq!(exec.reports.len(), 1);
    assert_eq!(exec.reports[0].to_string(), "fault 1 caught in @g");
}

#[test]
fn test_fault_in_entry_escapes() {
    let program = Program::from_module(compile_ok("fn f(a) return 10 / a\n"));
    assert_eq!(
        run(&program, "f", &[0], RunOptions::default()),
        Err(RuntimeError::UncaughtFault {
            function: "f".to_string(),
            code: 1
        })
    );
    assert_eq!(
        run(&program, "f", &[3], RunOptions::default()).unwrap().value,
        3
    );
}

#[test]
fn test_fault_crosses_plain_recursive_calls() {
    // `down` calls itself before its own division is seen, so the
    // recursive call stays a plain call and the unwind passes through it.
    let src = "fn down(n)\n    if n > 0\n        return down(n - 1)\n    return 1 / n\nfn top() return down(3) + 5\n";
    let exec = run_ok(src, "top", &[]);
    assert_eq!(exec.value, 0);
    assert_eq!(exec.reports[0].function, "top");
}

#[test]
fn test_top_level_unit_catches_fault() {
    let src = "fn f(a) return 6 / a\nf(0) + f(2)\n";
    let exec = run_ok(src, "__unit0", &[]);
    assert_eq!(exec.value, 0);
    assert_eq!(exec.reports.len(), 1);
}

// ── Sessions ──

#[test]
fn test_session_builds_up_functions() {
    let mut session = Session::new();
    session.compile_unit("fn sq(x) return x * x\n").unwrap();
    session
        .compile_unit("fn sum_sq(n)\n    let s = 0\n    for i < n\n        s = s + sq(i)\n    return s\n")
        .unwrap();
    let exec = session.eval("sum_sq(4)\n").unwrap().unwrap();
    assert_eq!(exec.value, 14);
    let names: Vec<_> = session.exports().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["sq", "sum_sq"]);
}

#[test]
fn test_session_error_is_all_or_nothing() {
    let mut session = Session::new();
    let errs = session
        .compile_unit("fn ok() return 1\nfn bad(a) return ok(a)\n")
        .unwrap_err();
    assert!(errs[0].message.contains("takes 0 argument(s) but 1 were supplied"));
    assert!(session.exports().is_empty());
    assert!(session.program().is_empty());
}
