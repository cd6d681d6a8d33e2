use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use inliner_span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
    Hint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    severity: DiagnosticSeverity,
    source_id: String,
    span: Span,
    message: String,
    code: Option<String>,
    suggestion: Option<String>,
    help: Option<String>,
}

impl Diagnostic {
    pub fn new<S: Into<String>>(
        severity: DiagnosticSeverity,
        source_id: S,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            source_id: source_id.into(),
            span,
            message: message.into(),
            code: None,
            suggestion: None,
            help: None,
        }
    }

    /// Short machine-readable tag, e.g. the name of a violated validation rule.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn severity(&self) -> DiagnosticSeverity {
        self.severity
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }

    pub fn report_kind(&self) -> ReportKind<'_> {
        match self.severity {
            DiagnosticSeverity::Error => ReportKind::Error,
            DiagnosticSeverity::Warning => ReportKind::Warning,
            DiagnosticSeverity::Info | DiagnosticSeverity::Hint => ReportKind::Advice,
        }
    }

    /// Create an info diagnostic
    pub fn info(source_id: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Info, source_id, span, message)
    }

    /// Create a hint diagnostic
    pub fn hint(source_id: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Hint, source_id, span, message)
    }

    /// Create an error diagnostic
    pub fn error(source_id: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Error, source_id, span, message)
    }

    /// Create a warning diagnostic
    pub fn warning(source_id: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, source_id, span, message)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
            DiagnosticSeverity::Hint => "hint",
        };
        match &self.code {
            Some(code) => write!(f, "{label}[{code}]: {}", self.message)?,
            None => write!(f, "{label}: {}", self.message)?,
        }
        write!(f, " ({}:{})", self.source_id, self.span)
    }
}

fn build_report(diagnostic: &Diagnostic, colored: bool) -> Report<'static, (String, std::ops::Range<usize>)> {
    let color = match diagnostic.severity {
        DiagnosticSeverity::Error => Color::Red,
        DiagnosticSeverity::Warning => Color::Yellow,
        DiagnosticSeverity::Info => Color::Blue,
        DiagnosticSeverity::Hint => Color::Cyan,
    };

    let span: std::ops::Range<usize> = diagnostic.span().into();
    let kind = match diagnostic.severity {
        DiagnosticSeverity::Error => ReportKind::Error,
        DiagnosticSeverity::Warning => ReportKind::Warning,
        DiagnosticSeverity::Info | DiagnosticSeverity::Hint => ReportKind::Advice,
    };
    let mut report = Report::build(kind, diagnostic.source_id().to_string(), span.start)
        .with_config(Config::default().with_color(colored))
        .with_message(diagnostic.message())
        .with_label(
            Label::new((diagnostic.source_id().to_string(), span))
                .with_message(diagnostic.message())
                .with_color(color),
        );

    if let Some(code) = diagnostic.code() {
        report = report.with_code(code);
    }

    if let Some(suggestion) = diagnostic.suggestion() {
        report = report.with_note(format!("suggestion: {suggestion}"));
    }

    if let Some(help) = diagnostic.help() {
        report = report.with_help(help);
    }

    report.finish()
}

pub fn emit_diagnostics(diagnostics: &[Diagnostic], source: &str) {
    for diagnostic in diagnostics {
        let report = build_report(diagnostic, true);
        let _ = report.eprint((diagnostic.source_id().to_string(), Source::from(source)));
    }
}

/// Emit a single diagnostic
pub fn emit_diagnostic(diagnostic: &Diagnostic, source: &str) {
    emit_diagnostics(std::slice::from_ref(diagnostic), source);
}

/// Render diagnostics without colour, for logs and tests.
pub fn render_diagnostics(diagnostics: &[Diagnostic], source: &str) -> String {
    let mut out = Vec::new();
    for diagnostic in diagnostics {
        let report = build_report(diagnostic, false);
        let _ = report.write(
            (diagnostic.source_id().to_string(), Source::from(source)),
            &mut out,
        );
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_location() {
        let diag = Diagnostic::error("Client.java", Span::new(3, 9), "bad template")
            .with_code("visibility");
        assert_eq!(
            diag.to_string(),
            "error[visibility]: bad template (Client.java:3..9)"
        );
    }

    #[test]
    fn renders_message_into_report() {
        let source = "class A { void f() {} }\n";
        let diag = Diagnostic::warning("A.java", Span::new(10, 14), "deprecated call")
            .with_help("inline the call");
        let rendered = render_diagnostics(&[diag], source);
        assert!(rendered.contains("deprecated call"));
        assert!(rendered.contains("inline the call"));
    }
}
