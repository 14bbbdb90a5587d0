//! End-to-end compilation pipeline.
//!
//! Source text in, diagnostics and target text out. The passes (lexer,
//! parser, analyzer, lowerer) run in order over one shared sink; later
//! passes run best-effort even after earlier errors unless
//! `stop_on_first_error` is set, so a single invocation reports everything.

use crate::analysis::{analyze, WellKnown};
use crate::ast::AstArenas;
use crate::codegen::lower_program;
use crate::diagnostics::{Diagnostic, DiagnosticSink, Phase};
use crate::intern::Interner;
use crate::lexer::Lexer;
use crate::options::CompileOptions;
use crate::parser::Parser;

pub struct CompileResult {
    /// Target text; present only when the compilation succeeded.
    pub output: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub success: bool,
}

impl CompileResult {
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == crate::diagnostics::Severity::Error)
            .count()
    }
}

/// Full pipeline: diagnostics plus target text.
pub fn compile(source: &str, options: &CompileOptions) -> CompileResult {
    run_pipeline(source, None, options, true)
}

/// Full pipeline with a file name attached to diagnostics.
pub fn compile_named(source: &str, file: Option<&str>, options: &CompileOptions) -> CompileResult {
    run_pipeline(source, file, options, true)
}

/// Stops after the checker; no target text is produced.
pub fn check(source: &str, options: &CompileOptions) -> CompileResult {
    run_pipeline(source, None, options, false)
}

pub fn check_named(source: &str, file: Option<&str>, options: &CompileOptions) -> CompileResult {
    run_pipeline(source, file, options, false)
}

fn run_pipeline(
    source: &str,
    file: Option<&str>,
    options: &CompileOptions,
    emit: bool,
) -> CompileResult {
    let mut interner = Interner::new();
    let names = WellKnown::intern(&mut interner);
    let mut sink = DiagnosticSink::new(file.map(str::to_string));

    let tokens = Lexer::new(source, &mut interner).tokenize(&mut sink);
    if options.stop_on_first_error && sink.has_errors() {
        return finish(None, sink);
    }

    let arenas = AstArenas::new();
    let ctx = arenas.context();
    let mut parser = Parser::new(tokens, ctx, &mut interner, &mut sink);
    let program = parser.parse_program();
    drop(parser);
    if options.stop_on_first_error && sink.has_errors() {
        return finish(None, sink);
    }

    let analysis = analyze(&program, &interner, &names, &mut sink);
    if options.stop_on_first_error && sink.has_errors() {
        return finish(None, sink);
    }

    let output = if emit {
        match lower_program(&program, &analysis, &interner, &names, options, file) {
            Ok(text) => Some(text),
            Err(failure) => {
                // Already-emitted text is discarded with the failure.
                sink.error(Phase::Codegen, failure.span, failure.message);
                None
            }
        }
    } else {
        None
    };

    finish(output, sink)
}

fn finish(output: Option<String>, sink: DiagnosticSink) -> CompileResult {
    let success = !sink.has_errors();
    CompileResult {
        output: if success { output } else { None },
        diagnostics: sink.into_vec(),
        success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::VerifyLevel;

    #[test]
    fn divide_with_precondition_compiles_with_guard() {
        let source = "fn divide(a: Int, b: Int) -> Int @requires b != 0 { return a / b; }";
        let result = compile(source, &CompileOptions::default());
        assert!(result.success, "diagnostics: {:?}", result.diagnostics);
        let output = result.output.unwrap();
        assert!(output.contains("function divide(a, b)"));
        assert!(output.contains("__requires((b !== 0)"));
        assert!(output.contains("b != 0"), "clause text should be quoted");
    }

    #[test]
    fn trusted_verify_level_suppresses_guards() {
        let source = "fn divide(a: Int, b: Int) -> Int @requires b != 0 { return a / b; }";
        let options = CompileOptions { verify: VerifyLevel::Trusted, ..Default::default() };
        let result = compile(source, &options);
        assert!(result.success);
        let output = result.output.unwrap();
        assert!(!output.contains("__requires("));
    }

    #[test]
    fn diagnostics_accumulate_across_passes() {
        // A lexical error and a type error in the same input both surface.
        let source = "let a: Int = $;\nlet b: Bool = 3;";
        let result = check(source, &CompileOptions::default());
        assert!(!result.success);
        let phases: Vec<_> = result.diagnostics.iter().map(|d| d.phase).collect();
        assert!(phases.contains(&Phase::Lexer));
        assert!(phases.contains(&Phase::Analyzer));
    }

    #[test]
    fn stop_on_first_error_short_circuits() {
        let source = "let a: Int = $;\nlet b: Bool = 3;";
        let options = CompileOptions { stop_on_first_error: true, ..Default::default() };
        let result = check(source, &options);
        assert!(!result.success);
        assert!(result.diagnostics.iter().all(|d| d.phase == Phase::Lexer));
    }

    #[test]
    fn failed_compiles_yield_no_output() {
        let source = "fn f() -> Int { return missing; }";
        let result = compile(source, &CompileOptions::default());
        assert!(!result.success);
        assert!(result.output.is_none());
    }

    #[test]
    fn check_never_produces_output() {
        let source = "fn f() -> Int { return 1; }";
        let result = check(source, &CompileOptions::default());
        assert!(result.success);
        assert!(result.output.is_none());
    }
}
