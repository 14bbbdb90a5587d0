//! End-to-end scenarios through the public pipeline.

use covenant::compile::{check, compile};
use covenant::diagnostics::Severity;
use covenant::options::CompileOptions;

fn plain() -> CompileOptions {
    CompileOptions::default()
}

fn uninstrumented() -> CompileOptions {
    CompileOptions { runtime_contracts: false, ..Default::default() }
}

// ---------------------------------------------------------------------
// Scenario: divide with precondition
// ---------------------------------------------------------------------

#[test]
fn divide_with_precondition() {
    let source = "fn divide(a: Int, b: Int) -> Int @requires b != 0 { return a / b }";
    let result = compile(source, &plain());
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    let output = result.output.unwrap();
    assert!(output.contains("function divide(a, b)"));
    assert!(output.contains("__requires((b !== 0)"));
    // The failure message names the clause and the position.
    assert!(output.contains("precondition failed"));
    assert!(output.contains("\"b != 0\""));
}

#[test]
fn divide_without_instrumentation_has_no_guards() {
    let source = "fn divide(a: Int, b: Int) -> Int @requires b != 0 { return a / b }";
    let result = compile(source, &uninstrumented());
    assert!(result.success);
    let output = result.output.unwrap();
    assert!(!output.contains("__requires("));
    assert!(!output.contains("function __requires"));
    assert!(output.contains("return (a / b);"));
}

// ---------------------------------------------------------------------
// Scenario: bank-account invariant
// ---------------------------------------------------------------------

#[test]
fn account_invariant_is_constructed_into_guard() {
    let source = "struct Account { balance: Float64, @invariant balance >= 0.0 }";
    let result = compile(source, &plain());
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    let output = result.output.unwrap();
    assert!(output.contains("function Account(balance)"));
    assert!(output.contains("self.balance = balance;"));
    // Free variables rewrite to the instance's fields.
    assert!(output.contains("__invariant((self.balance >= 0.0)"));
    assert!(output.contains("invariant violated"));
}

// ---------------------------------------------------------------------
// Scenario: sorted-forall
// ---------------------------------------------------------------------

#[test]
fn forall_over_array_lowers_to_every() {
    let source = "fn check(a: [Int]) -> Bool { return forall i in a: i >= 0 }";
    let result = compile(source, &uninstrumented());
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    let output = result.output.unwrap();
    assert!(output.contains("a.every((i) => (i >= 0))"));
}

#[test]
fn exists_lowers_to_some() {
    let source = "fn any_negative(a: [Int]) -> Bool { return exists i in a: i < 0 }";
    let result = compile(source, &uninstrumented());
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    assert!(result.output.unwrap().contains("a.some((i) => (i < 0))"));
}

// ---------------------------------------------------------------------
// Scenario: effect discipline
// ---------------------------------------------------------------------

#[test]
fn undeclared_effect_call_fails() {
    let source = r#"
fn log(msg: String) -> Void @effect[IO] { IO.write(msg); }
fn caller(msg: String) -> Void { log(msg); }
"#;
    let result = check(source, &plain());
    assert!(!result.success);
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.message.contains("requires effect IO")),
        "diagnostics: {:?}",
        result.diagnostics
    );
}

#[test]
fn declaring_the_effect_clears_the_error() {
    let source = r#"
fn log(msg: String) -> Void @effect[IO] { IO.write(msg); }
fn caller(msg: String) -> Void @effect[IO] { log(msg); }
"#;
    let result = check(source, &plain());
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
}

// ---------------------------------------------------------------------
// Scenario: try propagation
// ---------------------------------------------------------------------

#[test]
fn try_propagation_types_and_lowers() {
    let source = r#"
fn parse(s: String) -> Result<Int, String> { return Err("bad"); }
fn use_it(s: String) -> Result<Int, String> { return Ok(parse(s)? + 1); }
"#;
    let result = compile(source, &plain());
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    let output = result.output.unwrap();
    assert!(output.contains("unwrap(parse(s))"));
    // The runtime carries the error value through unwrap.
    assert!(output.contains("unwrap on Err"));
}

// ---------------------------------------------------------------------
// Scenario: quantified ensures with old
// ---------------------------------------------------------------------

#[test]
fn ensures_with_old_snapshots_prestate() {
    let source = "fn inc(x: mut Int) -> Void @ensures x == old(x) + 1 { x += 1 }";
    let result = compile(source, &plain());
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    let output = result.output.unwrap();
    // The snapshot is cloned before the body runs.
    assert!(output.contains("= __clone(x);"));
    assert!(output.contains("__ensures("));
    assert!(output.contains("postcondition failed"));
    let clone_at = output.find("__clone(x)").unwrap();
    let mutate_at = output.find("x += 1").unwrap();
    assert!(clone_at < mutate_at, "snapshot must precede the mutation");
}

#[test]
fn result_rewrites_to_the_return_binding() {
    let source = "fn double(x: Int) -> Int @ensures result == x * 2 { return x * 2 }";
    let result = compile(source, &plain());
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    let output = result.output.unwrap();
    assert!(output.contains("const __ret"));
    assert!(
        output.contains("(__ret0 === (x * 2))") || output.contains("(__ret1 === (x * 2))"),
        "ensures should reference the bound return value:\n{}",
        output
    );
}

// ---------------------------------------------------------------------
// Cross-pass properties
// ---------------------------------------------------------------------

#[test]
fn comment_stripping_preserves_the_token_stream() {
    use covenant::diagnostics::DiagnosticSink;
    use covenant::intern::Interner;
    use covenant::lexer::Lexer;

    let with_comments = r#"
// leading comment
fn add(a: Int, /* inline */ b: Int) -> Int {
    /* nested /* block */ comment */
    return a + b; // trailing
}
"#;
    let stripped = r#"
fn add(a: Int,  b: Int) -> Int {

    return a + b;
}
"#;
    let mut interner = Interner::new();
    let mut sink = DiagnosticSink::new(None);
    let a = Lexer::new(with_comments, &mut interner).tokenize(&mut sink);
    let b = Lexer::new(stripped, &mut interner).tokenize(&mut sink);
    assert!(sink.is_empty());
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.kind, y.kind);
        assert_eq!(x.lexeme, y.lexeme);
    }
}

#[test]
fn diagnostics_arrive_in_pipeline_order() {
    let source = "let a: Int = $;\nfn f( { }\nlet b: Bool = 3;";
    let result = check(source, &plain());
    assert!(!result.success);
    let phases: Vec<String> = result.diagnostics.iter().map(|d| d.phase.to_string()).collect();
    let first_analyzer = phases.iter().position(|p| p == "analyzer");
    let last_lexer = phases.iter().rposition(|p| p == "lexer");
    if let (Some(first_analyzer), Some(last_lexer)) = (first_analyzer, last_lexer) {
        assert!(last_lexer < first_analyzer, "phases out of order: {:?}", phases);
    }
}

#[test]
fn warnings_do_not_fail_the_compilation() {
    // Diverging if branches warn but still compile.
    let source = "fn f(c: Bool) -> Int { let x = if c { 1 } else { \"s\" }; return 1; }";
    let result = compile(source, &plain());
    assert!(
        result.diagnostics.iter().any(|d| d.severity == Severity::Warning),
        "expected a divergence warning: {:?}",
        result.diagnostics
    );
    assert!(result.success);
}
