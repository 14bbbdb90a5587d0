//! Checker diagnostics across the error taxonomy.

use covenant::compile::check;
use covenant::options::CompileOptions;

fn errors_of(source: &str) -> Vec<String> {
    let result = check(source, &CompileOptions::default());
    result
        .diagnostics
        .iter()
        .filter(|d| d.severity == covenant::diagnostics::Severity::Error)
        .map(|d| d.message.clone())
        .collect()
}

fn assert_clean(source: &str) {
    let result = check(source, &CompileOptions::default());
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
}

fn assert_error_containing(source: &str, fragment: &str) {
    let errors = errors_of(source);
    assert!(
        errors.iter().any(|e| e.contains(fragment)),
        "expected an error containing {:?}, got: {:?}",
        fragment,
        errors
    );
}

// ---------------------------------------------------------------------
// Name errors
// ---------------------------------------------------------------------

#[test]
fn undefined_identifier_with_suggestion() {
    let source = "fn f() -> Int { let balance = 1; return blance; }";
    assert_error_containing(source, "undefined identifier 'blance'");
    assert_error_containing(source, "did you mean 'balance'");
}

#[test]
fn duplicate_definition_in_one_scope() {
    assert_error_containing(
        "fn f() -> Int { let x = 1; let x = 2; return x; }",
        "duplicate definition of 'x'",
    );
}

#[test]
fn shadowing_in_inner_scope_is_allowed() {
    assert_clean("fn f() -> Int { let x = 1; { let x = 2; x; } return x; }");
}

#[test]
fn unknown_type_is_reported() {
    assert_error_containing("fn f(x: Itn) -> Int { return 1; }", "unknown type 'Itn'");
}

#[test]
fn unknown_contract_reference() {
    assert_error_containing(
        "fn f() -> Int @contract Missing { return 1; }",
        "unknown contract 'Missing'",
    );
}

#[test]
fn known_contract_reference_resolves() {
    assert_clean(
        "contract NonZero { @requires x != 0 }\n\
         fn f(x: Int) -> Int @contract NonZero { return x; }",
    );
}

#[test]
fn unknown_capability_reference() {
    assert_error_containing(
        "fn f() -> Int @capability Net { host: \"x\" } { return 1; }",
        "unknown capability 'Net'",
    );
}

#[test]
fn declared_capability_resolves() {
    assert_clean(
        "capability Net { host: String, port: Int }\n\
         fn f() -> Int @capability Net { host: \"example.com\", port: 443 } { return 1; }",
    );
}

#[test]
fn forward_references_between_declarations() {
    assert_clean(
        "fn area(c: Circle) -> Float64 { return c.radius; }\n\
         struct Circle { radius: Float64 }",
    );
}

// ---------------------------------------------------------------------
// Type errors
// ---------------------------------------------------------------------

#[test]
fn assignment_type_mismatch() {
    assert_error_containing("let flag: Bool = 3;", "cannot assign");
}

#[test]
fn non_boolean_condition() {
    assert_error_containing(
        "fn f(x: Int) -> Int { if x { return 1; } return 0; }",
        "must be Bool",
    );
}

#[test]
fn non_numeric_arithmetic() {
    assert_error_containing(
        "fn f(s: String) -> Int { return s * 2; }",
        "needs numeric operands",
    );
}

#[test]
fn wrong_arity() {
    assert_error_containing(
        "fn add(a: Int, b: Int) -> Int { return a + b; }\n\
         fn g() -> Int { return add(1); }",
        "wrong number of arguments",
    );
}

#[test]
fn unknown_field_with_suggestion() {
    let source = "struct Account { balance: Float64 }\n\
                  fn f(a: Account) -> Float64 { return a.balanse; }";
    assert_error_containing(source, "has no field 'balanse'");
    assert_error_containing(source, "did you mean 'balance'");
}

#[test]
fn unknown_variant() {
    assert_error_containing(
        "enum Color { Red, Green }\nfn f() -> Color { return Color::Blue; }",
        "no variant 'Blue'",
    );
}

#[test]
fn cannot_dereference_non_reference() {
    assert_error_containing("fn f(x: Int) -> Int { return *x; }", "cannot dereference");
}

#[test]
fn tuple_index_out_of_bounds() {
    assert_error_containing(
        "fn f(p: (Int, Int)) -> Int { return p.2; }",
        "out of bounds",
    );
}

#[test]
fn integer_widening_is_accepted() {
    assert_clean(
        "fn wide(x: Int64) -> Int64 { return x; }\n\
         fn f(x: Int32) -> Int64 { return wide(x); }",
    );
}

#[test]
fn integer_narrowing_is_rejected() {
    assert_error_containing(
        "fn narrow(x: Int8) -> Int8 { return x; }\n\
         fn f(x: Int32) -> Int8 { return narrow(x); }",
        "expected Int8",
    );
}

#[test]
fn immutable_assignment_is_rejected() {
    assert_error_containing(
        "fn f() -> Int { let x = 1; x = 2; return x; }",
        "cannot assign to immutable binding 'x'",
    );
}

#[test]
fn mutable_assignment_is_accepted() {
    assert_clean("fn f() -> Int { let mut x = 1; x = 2; return x; }");
}

#[test]
fn bare_return_requires_void() {
    assert_error_containing("fn f() -> Int { return; }", "bare return");
    assert_clean("fn f() -> Void { return; }");
}

#[test]
fn missing_struct_literal_field() {
    assert_error_containing(
        "struct Point { x: Int, y: Int }\nfn f() -> Point { return Point { x: 1 }; }",
        "missing field 'y'",
    );
}

#[test]
fn defaulted_field_may_be_omitted() {
    assert_clean(
        "struct Point { x: Int, y: Int = 0 }\nfn f() -> Point { return Point { x: 1 }; }",
    );
}

#[test]
fn cannot_infer_without_type_or_initializer() {
    assert_error_containing("fn f() -> Void { let x; }", "cannot infer type of 'x'");
}

// ---------------------------------------------------------------------
// Effect errors
// ---------------------------------------------------------------------

#[test]
fn pure_function_may_not_declare_effects() {
    assert_error_containing(
        "pure fn f() -> Int @effect[IO] { return 1; }",
        "pure function may not declare effects",
    );
}

#[test]
fn unknown_effect_name() {
    assert_error_containing(
        "fn f() -> Int @effect[Network] { return 1; }",
        "unknown effect 'Network'",
    );
}

#[test]
fn effects_propagate_transitively() {
    // caller -> log requires IO on caller, and then on outer too.
    let source = "fn log(m: String) -> Void @effect[IO] { IO.write(m); }\n\
                  fn caller(m: String) -> Void @effect[IO] { log(m); }\n\
                  fn outer(m: String) -> Void { caller(m); }";
    assert_error_containing(source, "requires effect IO");
}

#[test]
fn declared_effect_allows_the_call() {
    assert_clean(
        "effect FileSystem { fn read(path: String) -> String; }\n\
         fn load(p: String) -> String @effect[FileSystem] { return FileSystem.read(p); }",
    );
}

// ---------------------------------------------------------------------
// Contract errors
// ---------------------------------------------------------------------

#[test]
fn old_outside_contract_context() {
    assert_error_containing(
        "fn f(x: Int) -> Int { return old(x); }",
        "'old' is only valid inside a contract context",
    );
}

#[test]
fn unbounded_quantifier_outside_contract() {
    assert_error_containing(
        "fn f() -> Bool { return forall n: n > 0; }",
        "unbounded quantifier outside a contract context",
    );
}

#[test]
fn unbounded_quantifier_in_ensures_is_fine() {
    assert_clean("fn f(x: Int) -> Int @ensures forall n: n == n { return x; }");
}

#[test]
fn try_outside_result_function() {
    assert_error_containing(
        "fn parse(s: String) -> Result<Int, String> { return Ok(1); }\n\
         fn f(s: String) -> Int { return parse(s)?; }",
        "'?' requires the enclosing function to return a Result",
    );
}

#[test]
fn try_on_non_result_value() {
    assert_error_containing(
        "fn f(x: Int) -> Result<Int, String> { return Ok(x?); }",
        "'?' applied to a non-Result value",
    );
}

#[test]
fn contract_condition_must_be_bool() {
    assert_error_containing(
        "fn f(x: Int) -> Int @requires x + 1 { return x; }",
        "contract condition must be Bool",
    );
}

#[test]
fn result_resolves_in_ensures() {
    assert_clean("fn f(x: Int) -> Int @ensures result >= x { return x; }");
}

// ---------------------------------------------------------------------
// Matches and loops
// ---------------------------------------------------------------------

#[test]
fn match_guard_must_be_bool() {
    assert_error_containing(
        "fn f(n: Int) -> Int { return match n { x if x + 1 => 1, _ => 0 }; }",
        "match guard must be Bool",
    );
}

#[test]
fn match_pattern_bindings_are_in_scope() {
    assert_clean(
        "enum Shape { Circle(Float64), Point }\n\
         fn area(s: Shape) -> Float64 {\n\
             return match s { Shape::Circle(r) => r * r, Shape::Point => 0.0 };\n\
         }",
    );
}

#[test]
fn loop_invariant_must_be_bool() {
    assert_error_containing(
        "fn f(n: Int) -> Int { let mut i = 0; while i < n @invariant i { i += 1; } return i; }",
        "loop invariant must be Bool",
    );
}

#[test]
fn for_infers_element_type() {
    assert_clean(
        "fn sum(xs: [Int]) -> Int { let mut total = 0; for x in xs { total += x; } return total; }",
    );
}

#[test]
fn type_map_is_total_over_checked_expressions() {
    use covenant::analysis::{analyze, WellKnown};
    use covenant::ast::AstArenas;
    use covenant::diagnostics::DiagnosticSink;
    use covenant::intern::Interner;
    use covenant::lexer::Lexer;
    use covenant::parser::Parser;

    let source = "fn divide(a: Int, b: Int) -> Int @requires b != 0 { return a / b }";
    let mut interner = Interner::new();
    let names = WellKnown::intern(&mut interner);
    let mut sink = DiagnosticSink::new(None);
    let tokens = Lexer::new(source, &mut interner).tokenize(&mut sink);
    let arenas = AstArenas::new();
    let ctx = arenas.context();
    let mut parser = Parser::new(tokens, ctx, &mut interner, &mut sink);
    let program = parser.parse_program();
    drop(parser);
    let analysis = analyze(&program, &interner, &names, &mut sink);
    assert!(!sink.has_errors());

    // Every recorded type is a real type, not an uninitialized sentinel, and
    // the map covers the interesting positions.
    assert!(!analysis.types.is_empty());
    for ty in analysis.types.values() {
        assert!(!matches!(ty, covenant::analysis::Ty::Error(_)));
    }
    // `a / b` sits at offset of "a / b" inside the braces.
    let offset = source.find("a / b").unwrap();
    let found = analysis
        .types
        .keys()
        .any(|span| span.offset == offset);
    assert!(found, "the division expression should be typed");
}
