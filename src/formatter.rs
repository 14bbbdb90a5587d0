//! Expression pretty-printer.
//!
//! Produces the serialized expression strings stored for contract and intent
//! declarations, and the clause text quoted inside runtime guard failures.

use crate::ast::{Expr, ExprKind, Literal, QuantifierKind};
use crate::intern::Interner;

pub struct ExprPrinter<'i> {
    interner: &'i Interner,
}

impl<'i> ExprPrinter<'i> {
    pub fn new(interner: &'i Interner) -> Self {
        ExprPrinter { interner }
    }

    pub fn print(&self, expr: &Expr<'_>) -> String {
        match &expr.kind {
            ExprKind::Ident(name) => self.interner.resolve(*name).to_string(),
            ExprKind::SelfRef => "self".to_string(),
            ExprKind::Literal(lit) => self.literal(lit),
            ExprKind::Path { base, member } => format!(
                "{}::{}",
                self.interner.resolve(*base),
                self.interner.resolve(*member)
            ),
            ExprKind::Binary { op, lhs, rhs } => format!(
                "{} {} {}",
                self.child(lhs),
                op.symbol(),
                self.child(rhs)
            ),
            ExprKind::Unary { op, operand } => {
                format!("{}{}", op.symbol(), self.child(operand))
            }
            ExprKind::Assign { op, target, value } => {
                let eq = match op {
                    Some(inner) => format!("{}=", inner.symbol()),
                    None => "=".to_string(),
                };
                format!("{} {} {}", self.print(target), eq, self.print(value))
            }
            ExprKind::Call { callee, args } => {
                let args: Vec<String> = args.iter().map(|a| self.print(a)).collect();
                format!("{}({})", self.child(callee), args.join(", "))
            }
            ExprKind::Member { object, field } => {
                format!("{}.{}", self.child(object), self.interner.resolve(*field))
            }
            ExprKind::TupleField { object, index } => {
                format!("{}.{}", self.child(object), index)
            }
            ExprKind::Index { object, index } => {
                format!("{}[{}]", self.child(object), self.print(index))
            }
            ExprKind::If { cond, .. } => format!("if {} {{ … }}", self.print(cond)),
            ExprKind::Match { subject, .. } => format!("match {} {{ … }}", self.print(subject)),
            ExprKind::Block(_) => "{ … }".to_string(),
            ExprKind::Lambda { params, .. } => {
                let params: Vec<String> = params
                    .iter()
                    .map(|p| self.interner.resolve(p.name).to_string())
                    .collect();
                format!("|{}| …", params.join(", "))
            }
            ExprKind::Array(items) => {
                let items: Vec<String> = items.iter().map(|e| self.print(e)).collect();
                format!("[{}]", items.join(", "))
            }
            ExprKind::Tuple(items) => {
                let items: Vec<String> = items.iter().map(|e| self.print(e)).collect();
                format!("({})", items.join(", "))
            }
            ExprKind::StructLit { name, fields, spread } => {
                let mut parts: Vec<String> = fields
                    .iter()
                    .map(|(f, v)| format!("{}: {}", self.interner.resolve(*f), self.print(v)))
                    .collect();
                if let Some(base) = spread {
                    parts.push(format!("..{}", self.print(base)));
                }
                format!("{} {{ {} }}", self.interner.resolve(*name), parts.join(", "))
            }
            ExprKind::Range { start, end, inclusive } => format!(
                "{}{}{}",
                self.child(start),
                if *inclusive { "..=" } else { ".." },
                self.child(end)
            ),
            ExprKind::Cast { expr, .. } => format!("{} as _", self.child(expr)),
            ExprKind::Old(inner) => format!("old({})", self.print(inner)),
            ExprKind::Quantifier { kind, bindings, body } => {
                let keyword = match kind {
                    QuantifierKind::Forall => "forall",
                    QuantifierKind::Exists => "exists",
                };
                let bindings: Vec<String> = bindings
                    .iter()
                    .map(|b| match b.collection {
                        Some(c) => format!(
                            "{} in {}",
                            self.interner.resolve(b.name),
                            self.print(c)
                        ),
                        None => self.interner.resolve(b.name).to_string(),
                    })
                    .collect();
                format!("{} {}: {}", keyword, bindings.join(", "), self.print(body))
            }
            ExprKind::Try(inner) => format!("{}?", self.child(inner)),
        }
    }

    /// Sub-expressions get parentheses when they are operators themselves,
    /// which keeps the serialized form unambiguous without a precedence
    /// reconstruction.
    fn child(&self, expr: &Expr<'_>) -> String {
        match &expr.kind {
            ExprKind::Binary { .. } | ExprKind::Assign { .. } | ExprKind::Range { .. } => {
                format!("({})", self.print(expr))
            }
            _ => self.print(expr),
        }
    }

    fn literal(&self, lit: &Literal) -> String {
        match lit {
            Literal::Int(n) => n.to_string(),
            Literal::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{:.1}", f)
                } else {
                    format!("{}", f)
                }
            }
            Literal::Str(s) => format!("{:?}", self.interner.resolve(*s)),
            Literal::Char(c) => format!("'{}'", c.escape_default()),
            Literal::Bool(b) => b.to_string(),
            Literal::Nil => "nil".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstArenas;
    use crate::diagnostics::DiagnosticSink;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn print_first_requires(source: &str) -> String {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new(None);
        let tokens = Lexer::new(source, &mut interner).tokenize(&mut sink);
        let arenas = AstArenas::new();
        let ctx = arenas.context();
        let mut parser = Parser::new(tokens, ctx, &mut interner, &mut sink);
        let program = parser.parse_program();
        drop(parser);
        assert!(!sink.has_errors(), "{:?}", sink.iter().collect::<Vec<_>>());
        let func = match &program.decls[0].kind {
            crate::ast::DeclKind::Function(f) => f,
            _ => panic!("expected function"),
        };
        let cond = func.requires().next().expect("no requires clause");
        ExprPrinter::new(&interner).print(cond)
    }

    #[test]
    fn prints_comparison_clause() {
        let text = print_first_requires("fn f(b: Int) -> Int @requires b != 0 { return b; }");
        assert_eq!(text, "b != 0");
    }

    #[test]
    fn prints_old_and_quantifier() {
        let text = print_first_requires(
            "fn f(a: [Int], x: Int) -> Int @requires forall i in a: i >= old(x) { return x; }",
        );
        assert_eq!(text, "forall i in a: i >= old(x)");
    }

    #[test]
    fn nested_operators_get_parentheses() {
        let text = print_first_requires("fn f(a: Int) -> Int @requires a + 1 > 0 { return a; }");
        assert_eq!(text, "(a + 1) > 0");
    }
}
