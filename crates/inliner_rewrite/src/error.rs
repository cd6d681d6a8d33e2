use inliner_span::Span;
use inliner_utils::errors::Diagnostic;
use thiserror::Error;

/// Why one call site was left alone. Other sites in the file still proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("no trusted template for the callee")]
    NoTemplate,
    #[error("`{callee}` expects {expected} argument(s) but the call passes {found}")]
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
    },
    #[error("a `throw` replacement can only stand in for a whole statement")]
    ThrowOutsideStatement,
    #[error("`{0}` cannot stand on its own as a statement")]
    NotAStatement(String),
    #[error("`{0}` would only fit a lambda that returns a value")]
    ValueLambdaBody(String),
    #[error("receiver `{0}` has side effects that the replacement would drop")]
    DroppedReceiver(String),
    #[error("`{0}` would be captured by a lambda parameter of the replacement")]
    Capture(String),
    #[error("cannot qualify `{qualified}` because `{segment}` is shadowed here")]
    ShadowedQualifier { qualified: String, segment: String },
    #[error("method reference `{0}` has no receiver to bind the replacement to")]
    UnboundMethodReference(String),
    #[error("receiver of method reference `{0}` is not a simple reference")]
    ImpureMethodReference(String),
    #[error("a method reference cannot stand in for a varargs method")]
    VariadicMethodReference,
    #[error("a {template} template cannot replace {site}")]
    KindMismatch {
        template: &'static str,
        site: &'static str,
    },
}

impl RewriteError {
    pub fn to_diagnostic(&self, source_id: &str, span: Span) -> Diagnostic {
        Diagnostic::warning(source_id, span, self.to_string()).with_code("rewrite")
    }
}
