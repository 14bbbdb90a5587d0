use super::Parser;
use crate::ast::{
    AnnotationKind, AstArenas, BinaryOp, DeclKind, ExprKind, ImportItems, Program, StmtKind,
};
use crate::diagnostics::DiagnosticSink;
use crate::intern::Interner;
use crate::lexer::Lexer;
use crate::token::Span;

fn with_program<R>(
    source: &str,
    f: impl FnOnce(&Program<'_>, &Interner, &DiagnosticSink) -> R,
) -> R {
    let mut interner = Interner::new();
    let mut sink = DiagnosticSink::new(None);
    let tokens = Lexer::new(source, &mut interner).tokenize(&mut sink);
    let arenas = AstArenas::new();
    let ctx = arenas.context();
    let mut parser = Parser::new(tokens, ctx, &mut interner, &mut sink);
    let program = parser.parse_program();
    drop(parser);
    f(&program, &interner, &sink)
}

#[test]
fn function_with_precondition() {
    let source = "fn divide(a: Int, b: Int) -> Int @requires b != 0 { return a / b; }";
    with_program(source, |program, _, sink| {
        assert!(!sink.has_errors(), "unexpected errors: {:?}", sink.iter().collect::<Vec<_>>());
        assert_eq!(program.decls.len(), 1);
        match &program.decls[0].kind {
            DeclKind::Function(f) => {
                assert_eq!(f.params.len(), 2);
                assert!(f.return_type.is_some());
                assert_eq!(f.annotations.len(), 1);
                assert!(matches!(f.annotations[0].kind, AnnotationKind::Requires(_)));
                assert!(f.body.is_some());
            }
            other => panic!("expected function, got {:?}", other),
        }
    });
}

#[test]
fn struct_with_invariant_and_default() {
    let source = "struct Account { balance: Float64 = 0.0, @invariant balance >= 0.0 }";
    with_program(source, |program, _, sink| {
        assert!(!sink.has_errors());
        match &program.decls[0].kind {
            DeclKind::Struct(s) => {
                assert_eq!(s.fields.len(), 1);
                assert!(s.fields[0].default.is_some());
                assert_eq!(s.annotations.len(), 1);
                assert!(matches!(s.annotations[0].kind, AnnotationKind::Invariant(_)));
            }
            other => panic!("expected struct, got {:?}", other),
        }
    });
}

#[test]
fn enum_with_unit_and_payload_variants() {
    let source = "enum Shape { Point, Circle(Float64), Rect(Float64, Float64) }";
    with_program(source, |program, _, sink| {
        assert!(!sink.has_errors());
        match &program.decls[0].kind {
            DeclKind::Enum(e) => {
                assert_eq!(e.variants.len(), 3);
                assert!(e.variants[0].fields.is_empty());
                assert_eq!(e.variants[2].fields.len(), 2);
            }
            other => panic!("expected enum, got {:?}", other),
        }
    });
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let source = "fn f() -> Int { return 1 + 2 * 3; }";
    with_program(source, |program, _, sink| {
        assert!(!sink.has_errors());
        let func = match &program.decls[0].kind {
            DeclKind::Function(f) => f,
            _ => unreachable!(),
        };
        let body = func.body.as_ref().unwrap();
        let ret = match &body.stmts[0].kind {
            StmtKind::Return { value: Some(v) } => v,
            other => panic!("expected return, got {:?}", other),
        };
        match &ret.kind {
            ExprKind::Binary { op: BinaryOp::Add, rhs, .. } => {
                assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected addition at top, got {:?}", other),
        }
    });
}

#[test]
fn exponentiation_is_right_associative() {
    let source = "fn f() -> Int { return 2 ** 3 ** 2; }";
    with_program(source, |program, _, sink| {
        assert!(!sink.has_errors());
        let func = match &program.decls[0].kind {
            DeclKind::Function(f) => f,
            _ => unreachable!(),
        };
        let ret = match &func.body.as_ref().unwrap().stmts[0].kind {
            StmtKind::Return { value: Some(v) } => v,
            _ => unreachable!(),
        };
        match &ret.kind {
            ExprKind::Binary { op: BinaryOp::Pow, lhs, rhs } => {
                assert!(matches!(lhs.kind, ExprKind::Literal(_)));
                assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Pow, .. }));
            }
            other => panic!("expected power at top, got {:?}", other),
        }
    });
}

#[test]
fn if_condition_is_not_a_struct_literal() {
    let source = "fn f(x: Int) -> Int { if x > 0 { return 1; } return 0; }";
    with_program(source, |_, _, sink| {
        assert!(!sink.has_errors(), "errors: {:?}", sink.iter().collect::<Vec<_>>());
    });
}

#[test]
fn match_with_guard_and_wildcard() {
    let source = r#"
fn classify(n: Int) -> Int {
    return match n {
        0 => 0,
        x if x > 0 => 1,
        _ => 2,
    };
}
"#;
    with_program(source, |program, _, sink| {
        assert!(!sink.has_errors(), "errors: {:?}", sink.iter().collect::<Vec<_>>());
        let func = match &program.decls[0].kind {
            DeclKind::Function(f) => f,
            _ => unreachable!(),
        };
        let ret = match &func.body.as_ref().unwrap().stmts[0].kind {
            StmtKind::Return { value: Some(v) } => v,
            _ => unreachable!(),
        };
        match &ret.kind {
            ExprKind::Match { arms, .. } => {
                assert_eq!(arms.len(), 3);
                assert!(arms[1].guard.is_some());
            }
            other => panic!("expected match, got {:?}", other),
        }
    });
}

#[test]
fn quantifier_and_old_in_annotations() {
    let source = "fn inc(x: mut Int) -> Int @ensures result == old(x) + 1 \
                  @ensures forall i in [1, 2]: i > 0 { return x + 1; }";
    with_program(source, |program, _, sink| {
        assert!(!sink.has_errors(), "errors: {:?}", sink.iter().collect::<Vec<_>>());
        let func = match &program.decls[0].kind {
            DeclKind::Function(f) => f,
            _ => unreachable!(),
        };
        assert_eq!(func.annotations.len(), 2);
        assert!(func.params[0].mutable);
    });
}

#[test]
fn unknown_annotation_is_skipped_with_suggestion() {
    let source = "fn f() -> Int @ensyres true { return 1; }";
    with_program(source, |program, _, sink| {
        assert!(sink.has_errors());
        let message = &sink.iter().next().unwrap().message;
        assert!(message.contains("unknown annotation"), "{}", message);
        assert!(message.contains("ensures"), "{}", message);
        // The declaration itself survives.
        assert!(matches!(program.decls[0].kind, DeclKind::Function(_)));
    });
}

#[test]
fn import_forms() {
    let source = "import std.math;\nimport std.io.{read, write as w};\nimport std.text.*;";
    with_program(source, |program, _, sink| {
        assert!(!sink.has_errors());
        assert_eq!(program.decls.len(), 3);
        match &program.decls[0].kind {
            DeclKind::Import(i) => assert!(matches!(i.items, ImportItems::Module)),
            _ => panic!(),
        }
        match &program.decls[1].kind {
            DeclKind::Import(i) => match &i.items {
                ImportItems::List(list) => {
                    assert_eq!(list.len(), 2);
                    assert!(list[1].1.is_some());
                }
                _ => panic!(),
            },
            _ => panic!(),
        }
        match &program.decls[2].kind {
            DeclKind::Import(i) => assert!(matches!(i.items, ImportItems::Wildcard)),
            _ => panic!(),
        }
    });
}

#[test]
fn export_wraps_declaration() {
    let source = "export fn f() -> Int { return 1; }";
    with_program(source, |program, _, sink| {
        assert!(!sink.has_errors());
        match &program.decls[0].kind {
            DeclKind::Export(inner) => {
                assert!(matches!(inner.kind, DeclKind::Function(_)));
            }
            other => panic!("expected export, got {:?}", other),
        }
    });
}

#[test]
fn recovery_reaches_later_declarations() {
    let source = "fn broken( { }\nfn good() -> Int { return 1; }";
    with_program(source, |program, _, sink| {
        assert!(sink.has_errors());
        let names: Vec<_> = program
            .decls
            .iter()
            .filter_map(|d| d.name())
            .collect();
        assert!(!names.is_empty(), "second declaration should be recovered");
    });
}

#[test]
fn nested_generics_split_shift_right() {
    let source = "fn f(x: Result<Option<Int>, String>, y: Option<Option<Int>>) -> Int { return 0; }";
    with_program(source, |_, _, sink| {
        assert!(!sink.has_errors(), "errors: {:?}", sink.iter().collect::<Vec<_>>());
    });
}

#[test]
fn trait_impl_and_effect_declarations() {
    let source = r#"
trait Shape: Display {
    fn area(self) -> Float64;
}
impl Shape for Circle {
    fn area(self) -> Float64 { return 3.14; }
}
effect FileSystem {
    fn read(path: String) -> String;
}
capability Net { host: String, port: Int }
contract NonNegative { @requires x >= 0 @ensures result >= 0 }
intent Sorted { @ensures true }
"#;
    with_program(source, |program, _, sink| {
        assert!(!sink.has_errors(), "errors: {:?}", sink.iter().collect::<Vec<_>>());
        assert_eq!(program.decls.len(), 6);
    });
}

#[test]
fn lambda_forms() {
    let source = "fn f() -> Int { let g = |x: Int| -> Int x + 1; let h = || 0; return 1; }";
    with_program(source, |_, _, sink| {
        assert!(!sink.has_errors(), "errors: {:?}", sink.iter().collect::<Vec<_>>());
    });
}

#[test]
fn struct_literal_with_spread() {
    let source = "fn f(p: Point) -> Point { return Point { x: 1, ..p }; }";
    with_program(source, |_, _, sink| {
        assert!(!sink.has_errors(), "errors: {:?}", sink.iter().collect::<Vec<_>>());
    });
}

#[test]
fn node_spans_lie_within_parents() {
    let source = "fn f(a: Int) -> Int @requires a > 0 { let x = a * 2 + 1; return x; }";
    with_program(source, |program, _, sink| {
        assert!(!sink.has_errors());
        let decl = program.decls[0];
        fn check_expr(expr: &crate::ast::Expr<'_>, parent: Span) {
            assert!(parent.contains(expr.span), "child span escapes parent");
            if let ExprKind::Binary { lhs, rhs, .. } = &expr.kind {
                check_expr(lhs, expr.span);
                check_expr(rhs, expr.span);
            }
        }
        if let DeclKind::Function(f) = &decl.kind {
            for stmt in f.body.as_ref().unwrap().stmts {
                assert!(decl.span.contains(stmt.span));
                if let StmtKind::Let { init: Some(init), .. } = &stmt.kind {
                    check_expr(init, stmt.span);
                }
            }
        }
    });
}
