use crate::*;

#[test]
fn test_compile_valid_program() {
    let module = compile("fn f() return 3 + 4 * 2\n", "test.calc").unwrap();
    assert_eq!(module.functions.len(), 1);
    let text = module.to_string();
    assert!(text.contains("fn @f() -> i64 {"));
    assert!(text.contains("mul i64"));
}

#[test]
fn test_compile_unknown_variable_returns_diagnostic() {
    let errors = compile("fn f() return y\n", "test.calc").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "unknown variable `y`");
    assert_eq!((errors[0].span.line, errors[0].span.column), (1, 15));
}

#[test]
fn test_compile_parse_error_returns_diagnostic() {
    let errors = compile("let x =\n", "test.calc").unwrap_err();
    assert!(!errors.is_empty());
}

#[test]
fn test_top_level_statements_form_unit_function() {
    let module = compile("let a = 2\na * 21\n", "test.calc").unwrap();
    assert!(module.get("__unit0").is_some());
}

#[test]
fn test_verification_can_be_disabled() {
    let options = CompileOptions::default().with_verify(false);
    let module = compile_with_options("fn f(a) return a / 2\n", "t.calc", &options).unwrap();
    assert!(module.get("f").unwrap().block_by_label("div.zero").is_some());
}

#[test]
fn test_compile_file_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prog.calc");
    std::fs::write(&path, "fn sq(x) return x * x\nsq(7)\n").unwrap();
    let module = compile_file(&path).unwrap();
    assert!(module.get("sq").is_some());
}

#[test]
fn test_compile_file_missing_is_a_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let errors = compile_file(&dir.path().join("absent.calc")).unwrap_err();
    assert!(errors[0].message.starts_with("cannot read"));
}

#[test]
fn test_function_hashes_are_stable_and_distinct() {
    let a = compile("fn f() return 1\nfn g() return 2\n", "a.calc").unwrap();
    let b = compile("fn f() return 1\nfn g() return 3\n", "b.calc").unwrap();
    let ha = function_hashes(&a);
    let hb = function_hashes(&b);
    assert_eq!(ha[0], hb[0]);
    assert_ne!(ha[1].1, hb[1].1);
    assert_ne!(module_hash(&a), module_hash(&b));
    assert_eq!(module_hash(&a), module_hash(&a.clone()));
}

#[test]
fn test_diagnostic_renders_with_source() {
    let source = "fn f() return y\n";
    let errors = parse_source_silent(source)
        .map(|ast| crate::api::compile_ast(&ast, &CompileOptions::default(), &[], "__unit0"))
        .unwrap()
        .unwrap_err();
    let text = errors[0].render_to_string("test.calc", source);
    assert!(text.contains("unknown variable `y`"));
    assert!(text.contains("let y = ..."));
}
