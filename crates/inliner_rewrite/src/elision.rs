//! Dropping calls to fluent no-ops (`return this;`) instead of splicing them.

use inliner_fmt::Printer;
use inliner_template::MethodTemplate;

use crate::call_site::{CallKind, CallSite, Position};
use crate::edit::TextEdit;

/// The edit that removes a fluent no-op call, when the site allows it.
///
/// In a chain the call and its dot disappear (`x.noOp().next()` becomes
/// `x.next()`; an unqualified head becomes `this`). A standalone call
/// statement is deleted unless its receiver does something, in which case
/// only the receiver is kept. A statement that is the whole body of a
/// control-flow statement becomes `{}`. Assigned and other value positions
/// are left to ordinary splicing, which yields the receiver.
pub fn elide(template: &MethodTemplate, site: &CallSite, printer: &Printer) -> Option<TextEdit> {
    if !template.is_fluent_no_op() || site.kind != CallKind::Method {
        return None;
    }
    match site.position() {
        Position::ChainReceiver => match &site.receiver {
            Some(_) => {
                let span = site.chain.as_ref()?.removal_span()?;
                Some(TextEdit::delete(site.file, span))
            }
            None => Some(TextEdit::new(site.file, site.span, "this")),
        },
        Position::Statement => match &site.receiver {
            Some(receiver) if receiver.as_ref().is_effectful() => Some(TextEdit::new(
                site.file,
                site.span,
                printer.print_expr(receiver.as_ref()),
            )),
            _ => {
                let span = site.statement_span?;
                if site.sole_body {
                    Some(TextEdit::new(site.file, span, "{}"))
                } else {
                    Some(TextEdit::delete(site.file, span))
                }
            }
        },
        Position::AssignedValue | Position::LambdaBody | Position::Operand => None,
    }
}
