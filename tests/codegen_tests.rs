//! Target-text shape: declarations, statements, expressions, and the
//! module-system and dialect switches.

use covenant::compile::compile;
use covenant::options::{CompileOptions, Dialect, ModuleSystem};

fn emit(source: &str) -> String {
    let result = compile(source, &CompileOptions::default());
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    result.output.unwrap()
}

fn emit_with(source: &str, options: &CompileOptions) -> String {
    let result = compile(source, options);
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    result.output.unwrap()
}

// ---------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------

#[test]
fn enum_variants_emit_tagged_factories() {
    let output = emit("enum Shape { Point, Circle(Float64) }");
    assert!(output.contains("const Shape = {"));
    assert!(output.contains("Point: Object.freeze({ tag: \"Point\", fields: [] })"));
    assert!(output.contains("Circle: (__f0) => ({ tag: \"Circle\", fields: [__f0] })"));
}

#[test]
fn impl_methods_attach_to_the_prototype() {
    let output = emit(
        "struct Circle { radius: Float64 }\n\
         impl Circle {\n\
             fn area(self) -> Float64 { return self.radius * self.radius; }\n\
         }",
    );
    assert!(output.contains("Circle.prototype.area = function ()"));
    assert!(output.contains("(this.radius * this.radius)"));
}

#[test]
fn effect_declarations_emit_identity_stubs() {
    let output = emit("effect FileSystem { fn read(path: String) -> String; }");
    assert!(output.contains("const FileSystem = {"));
    assert!(output.contains("read: (...__args) => __args[0],"));
}

#[test]
fn builtin_io_record_is_always_available() {
    let output = emit("fn f() -> Int { return 1; }");
    assert!(output.contains("const IO = {"));
    assert!(output.contains("console.log(value);"));
}

#[test]
fn traits_emit_nothing_in_javascript() {
    let output = emit("trait Shape { fn area(self) -> Float64; }");
    assert!(!output.contains("interface"));
    assert!(!output.contains("Shape"));
}

#[test]
fn traits_emit_interfaces_in_typescript() {
    let options = CompileOptions { dialect: Dialect::Typescript, ..Default::default() };
    let output = emit_with("trait Shape { fn area(self) -> Float64; }", &options);
    assert!(output.contains("interface Shape {"));
    assert!(output.contains("area(): number;"));
}

#[test]
fn struct_constructor_uses_default_parameters() {
    let output = emit("struct Point { x: Int, y: Int = 0 }");
    assert!(output.contains("function Point(x, y = 0)"));
}

// ---------------------------------------------------------------------
// Imports and exports
// ---------------------------------------------------------------------

#[test]
fn esm_imports_and_exports() {
    let output = emit(
        "import std.math.{sin, cos as cosine};\n\
         import std.io.*;\n\
         export fn f() -> Int { return 1; }",
    );
    assert!(output.contains("import { sin, cos as cosine } from \"./std/math.js\";"));
    assert!(output.contains("import * as io from \"./std/io.js\";"));
    assert!(output.contains("export function f()"));
}

#[test]
fn commonjs_imports_and_exports() {
    let options = CompileOptions { modules: ModuleSystem::CommonJs, ..Default::default() };
    let output = emit_with(
        "import std.math.{sin};\n\
         export fn f() -> Int { return 1; }\n\
         export struct Point { x: Int }",
        &options,
    );
    assert!(output.contains("const { sin } = require(\"./std/math\");"));
    assert!(output.contains("module.exports = { f, Point };"));
}

// ---------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------

#[test]
fn while_invariants_check_at_iteration_start() {
    let output = emit(
        "fn count(n: Int) -> Int {\n\
             let mut i = 0;\n\
             while i < n @invariant i >= 0 { i += 1; }\n\
             return i;\n\
         }",
    );
    let while_at = output.find("while ((i < n))").unwrap();
    let invariant_at = output.find("__invariant((i >= 0)").unwrap();
    let increment_at = output.find("(i += 1);").unwrap();
    assert!(while_at < invariant_at && invariant_at < increment_at);
}

#[test]
fn for_over_range_lowers_to_counting_loop() {
    let output = emit(
        "fn sum(n: Int) -> Int { let mut t = 0; for i in 0..n { t += i; } return t; }",
    );
    assert!(output.contains("for (let i = 0; i < n; i++)"));
}

#[test]
fn for_over_inclusive_range() {
    let output = emit(
        "fn sum(n: Int) -> Int { let mut t = 0; for i in 0..=n { t += i; } return t; }",
    );
    assert!(output.contains("for (let i = 0; i <= n; i++)"));
}

#[test]
fn for_over_array_lowers_to_for_of() {
    let output = emit(
        "fn sum(xs: [Int]) -> Int { let mut t = 0; for x in xs { t += x; } return t; }",
    );
    assert!(output.contains("for (const x of xs)"));
}

#[test]
fn match_statement_without_wildcard_raises() {
    let output = emit(
        "enum Color { Red, Green }\n\
         fn f(c: Color) -> Void {\n\
             match c { Color::Red => 1, Color::Green => 2 };\n\
         }",
    );
    assert!(output.contains(".tag === \"Red\""));
    assert!(output.contains("__matchFail("));
}

#[test]
fn terminal_wildcard_suppresses_the_failure_arm() {
    let output = emit(
        "fn f(n: Int) -> Void { match n { 0 => 1, _ => 2 }; }",
    );
    // The inline statement chain ends without an exhaustiveness check.
    let body = &output[output.find("function f(n)").unwrap()..];
    assert!(!body.contains("__matchFail("));
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

#[test]
fn power_lowers_to_math_pow() {
    let output = emit("fn f(x: Int) -> Int { return x ** 2; }");
    assert!(output.contains("Math.pow(x, 2)"));
}

#[test]
fn references_erase() {
    let output = emit("fn f(x: Int) -> Int { let r = &x; return *r; }");
    assert!(output.contains("const r = x;"));
    assert!(output.contains("return r;"));
}

#[test]
fn if_expression_lowers_to_iife() {
    let output = emit("fn f(c: Bool) -> Int { let x = if c { 1 } else { 2 }; return x; }");
    assert!(output.contains("(() => {"));
    assert!(output.contains("return 1;"));
    assert!(output.contains("return 2;"));
}

#[test]
fn match_expression_lowers_to_iife_over_the_subject() {
    let output = emit(
        "fn f(n: Int) -> Int { return match n { 0 => 10, _ => 20 }; }",
    );
    assert!(output.contains("((__m) => {"));
    assert!(output.contains("if (__m === 0) {"));
    assert!(output.contains("return 10;"));
}

#[test]
fn struct_literal_calls_the_constructor_in_declaration_order() {
    let output = emit(
        "struct Point { x: Int, y: Int }\n\
         fn f() -> Point { return Point { y: 2, x: 1 }; }",
    );
    assert!(output.contains("return Point(1, 2);"));
}

#[test]
fn struct_literal_spread_copy_extends() {
    let output = emit(
        "struct Point { x: Int, y: Int }\n\
         fn f(p: Point) -> Point { return Point { x: 9, ..p }; }",
    );
    assert!(output.contains("({ ...p, x: 9 })"));
}

#[test]
fn enum_construction_through_the_factory() {
    let output = emit(
        "enum Shape { Circle(Float64) }\n\
         fn f() -> Shape { return Shape::Circle(1.0); }",
    );
    assert!(output.contains("return Shape.Circle(1.0);"));
}

#[test]
fn range_value_materializes_an_array() {
    let output = emit("fn f() -> [Int] { return 1..4; }");
    assert!(output.contains("return __range(1, 4, false);"));
}

#[test]
fn lambdas_lower_to_arrows() {
    let output = emit("fn f() -> Int { let g = |x: Int| -> Int x + 1; return 1; }");
    assert!(output.contains("((x) => (x + 1))"));
}

#[test]
fn nil_lowers_to_null() {
    let output = emit("fn f() -> Int? { return nil; }");
    assert!(output.contains("return null;"));
}

#[test]
fn pattern_destructuring_binds_enum_fields_by_index() {
    let output = emit(
        "enum Shape { Circle(Float64), Point }\n\
         fn area(s: Shape) -> Float64 {\n\
             return match s { Shape::Circle(r) => r * r, Shape::Point => 0.0 };\n\
         }",
    );
    assert!(output.contains("__m.tag === \"Circle\""));
    assert!(output.contains("const r = __m.fields[0];"));
}

#[test]
fn guard_failure_falls_through_to_later_arms() {
    let output = emit(
        "fn f(n: Int) -> Int { return match n { x if x > 0 => 1, _ => 0 }; }",
    );
    let guard_at = output.find("if ((x > 0))").unwrap();
    let fallback_at = output.rfind("return 0;").unwrap();
    assert!(guard_at < fallback_at);
}
