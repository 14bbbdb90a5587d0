//! Shared diagnostic sink threaded through every pass.
//!
//! No pass aborts on the first error: the lexer, parser, checker, and lowerer
//! all report here and continue, so one invocation surfaces every problem in
//! the input. Diagnostics are kept in emission order, which is source order
//! within a pass and pipeline order across passes.

use serde::Serialize;

use crate::style::Style;
use crate::token::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lexer,
    Parser,
    Analyzer,
    Codegen,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Lexer => "lexer",
            Phase::Parser => "parser",
            Phase::Analyzer => "analyzer",
            Phase::Codegen => "codegen",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One reported problem. `line`/`column` duplicate the span's position so the
/// serialized record matches the external interface; the span itself stays
/// available for caret rendering.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub phase: Phase,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
    pub message: String,
    #[serde(skip)]
    pub span: Span,
}

impl Diagnostic {
    /// The one-line form: `[phase] file:line:column: message`. Warnings get a
    /// `warning:` marker so tools can filter them.
    pub fn header(&self) -> String {
        let file = self.file.as_deref().unwrap_or("<input>");
        match self.severity {
            Severity::Error => format!(
                "[{}] {}:{}:{}: {}",
                self.phase, file, self.line, self.column, self.message
            ),
            Severity::Warning => format!(
                "[{}] warning: {}:{}:{}: {}",
                self.phase, file, self.line, self.column, self.message
            ),
            Severity::Info => format!(
                "[{}] info: {}:{}:{}: {}",
                self.phase, file, self.line, self.column, self.message
            ),
        }
    }

    /// Multi-line rendering with the offending source line and a caret
    /// underline, colored for terminals.
    pub fn render(&self, source: &str) -> String {
        let label = match self.severity {
            Severity::Error => Style::bold_red("error"),
            Severity::Warning => Style::bold_yellow("warning"),
            Severity::Info => Style::cyan("info"),
        };

        let (line_start, line_content) = self.source_line(source);
        let col = self.span.offset.saturating_sub(line_start);
        let underline_len = self.span.length.max(1).min(line_content.len().saturating_sub(col).max(1));
        let underline = format!("{}{}", " ".repeat(col), "^".repeat(underline_len));

        let gutter = Style::blue(&format!("{:4}", self.line));
        let pipe = Style::blue("|");

        format!(
            "{}: {}\n{} {} {}\n     {} {}",
            label,
            self.header(),
            gutter,
            pipe,
            line_content,
            pipe,
            Style::red(&underline)
        )
    }

    fn source_line<'s>(&self, source: &'s str) -> (usize, &'s str) {
        let offset = self.span.offset.min(source.len());
        let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = source[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or(source.len());
        (line_start, &source[line_start..line_end])
    }
}

/// Collector shared by all passes of one compilation.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    file: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new(file: Option<String>) -> Self {
        DiagnosticSink { file, diagnostics: Vec::new() }
    }

    pub fn report(&mut self, phase: Phase, severity: Severity, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            phase,
            severity,
            file: self.file.clone(),
            line: span.line,
            column: span.column,
            message: message.into(),
            span,
        });
    }

    pub fn error(&mut self, phase: Phase, span: Span, message: impl Into<String>) {
        self.report(phase, Severity::Error, span, message);
    }

    pub fn warning(&mut self, phase: Phase, span: Span, message: impl Into<String>) {
        self.report(phase, Severity::Warning, span, message);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_follows_external_format() {
        let mut sink = DiagnosticSink::new(Some("bank.cov".to_string()));
        sink.error(Phase::Analyzer, Span::new(3, 7, 21, 4), "undefined identifier 'blanace'");
        let diag = sink.iter().next().unwrap();
        assert_eq!(
            diag.header(),
            "[analyzer] bank.cov:3:7: undefined identifier 'blanace'"
        );
    }

    #[test]
    fn warnings_are_marked_for_filtering() {
        let mut sink = DiagnosticSink::new(None);
        sink.warning(Phase::Analyzer, Span::default(), "branch types diverge");
        let diag = sink.iter().next().unwrap();
        assert!(diag.header().contains("warning:"));
    }

    #[test]
    fn error_count_ignores_warnings() {
        let mut sink = DiagnosticSink::new(None);
        sink.warning(Phase::Parser, Span::default(), "w");
        sink.error(Phase::Parser, Span::default(), "e");
        sink.error(Phase::Analyzer, Span::default(), "e2");
        assert_eq!(sink.error_count(), 2);
        assert!(sink.has_errors());
    }

    #[test]
    fn render_underlines_the_span() {
        let source = "let bad = nonsense;";
        let mut sink = DiagnosticSink::new(None);
        sink.error(Phase::Analyzer, Span::new(1, 11, 10, 8), "undefined identifier");
        let out = sink.iter().next().unwrap().render(source);
        assert!(out.contains("nonsense"));
        assert!(out.contains("^^^^^^^^"));
    }

    #[test]
    fn serializes_to_json_record() {
        let mut sink = DiagnosticSink::new(Some("m.cov".into()));
        sink.error(Phase::Lexer, Span::new(2, 1, 10, 1), "unexpected character '$'");
        let json = serde_json::to_string(sink.iter().next().unwrap()).unwrap();
        assert!(json.contains("\"phase\":\"lexer\""));
        assert!(json.contains("\"severity\":\"error\""));
        assert!(json.contains("\"line\":2"));
    }
}
