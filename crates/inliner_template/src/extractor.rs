//! Template extraction from single-statement method bodies.

use std::collections::BTreeSet;

use inliner_ast::nodes::{Expr, MethodDecl, Node, Stmt};
use inliner_fmt::{PrintOptions, Printer};
use inliner_symbol::{DeclId, ImportKind, ResolutionContext, SourceIndex, SymbolService};
use inliner_utils::errors::Diagnostic;
use inliner_span::Span;
use thiserror::Error;
use tracing::debug;

use crate::attributes::disable_reason;
use crate::imports::infer_imports;
use crate::placeholders::{TemplateScope, to_template};
use crate::template::{
    MethodTemplate, ReceiverPlaceholder, TemplateBody, TemplateSource, VarargsMode,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("`{0}` has no body")]
    NoBody(String),
    #[error("complex statement: {0}")]
    ComplexStatement(String),
    #[error("only inline methods with exactly one effectful statement")]
    NoOp,
    #[error("`super` member references cannot be inlined at other call sites")]
    SuperReference,
}

impl ExtractError {
    pub fn to_diagnostic(&self, source_id: &str, span: Span) -> Diagnostic {
        Diagnostic::info(source_id, span, self.to_string()).with_code("extract")
    }
}

/// Everything extraction needs to know about the declaration.
#[derive(Clone, Copy)]
pub struct TemplateOwner<'a> {
    pub id: DeclId,
    pub owner_type: DeclId,
    pub owner_type_name: &'a str,
    pub method: &'a MethodDecl,
    pub span: Span,
}

impl<'a> TemplateOwner<'a> {
    /// Look up a method or constructor in `index`, with a resolution context
    /// pointing into its declaration.
    pub fn from_index(index: &'a SourceIndex, id: DeclId) -> Option<(Self, ResolutionContext)> {
        let decl = index.declaration(id)?;
        let owner_type = decl.owner?;
        let owner_type_name = index.declaration(owner_type)?.qualified_name.as_deref()?;
        let (_, method) = index.callable_ast(id)?;
        let owner = TemplateOwner {
            id,
            owner_type,
            owner_type_name,
            method,
            span: decl.span,
        };
        Some((owner, ResolutionContext::at(decl.file, decl.span)))
    }
}

impl TemplateOwner<'_> {
    pub(crate) fn scope<'s>(
        &self,
        service: &'s dyn SymbolService,
        cx: ResolutionContext,
        params: &'s [String],
    ) -> TemplateScope<'s> {
        TemplateScope {
            service,
            cx,
            owner_type: self.owner_type,
            params,
        }
    }

    /// A template shell for this declaration around `body`.
    pub(crate) fn template(
        &self,
        service: &dyn SymbolService,
        cx: ResolutionContext,
        body: TemplateBody,
        source: TemplateSource,
    ) -> MethodTemplate {
        let receiver = if self.method.modifiers.is_static {
            ReceiverPlaceholder::None
        } else if body.uses_explicit_receiver() {
            ReceiverPlaceholder::ExplicitThis
        } else {
            ReceiverPlaceholder::ImplicitThis
        };
        let imports = infer_imports(&body, service, cx);
        MethodTemplate {
            owner: self.id,
            owner_name: self.method.name().to_string(),
            owner_type: self.owner_type,
            owner_type_name: self.owner_type_name.to_string(),
            file: cx.file,
            span: self.span,
            parameters: self.method.param_names(),
            varargs_last: self.method.is_varargs(),
            receiver,
            body,
            imports,
            source,
            varargs_mode: VarargsMode::None,
            returns_void: self.method.is_void() && !self.method.is_constructor,
            is_constructor: self.method.is_constructor,
            visibility: self.method.modifiers.visibility,
            disabled_reason: disable_reason(&self.method.annotations),
        }
    }
}

fn uses_super(expr: &Node<Expr>) -> bool {
    let mut found = false;
    inliner_ast::visit::walk_expr(expr, &mut |node| {
        if matches!(node.as_ref(), Expr::Super) {
            found = true;
        }
    });
    found
}

/// Shape check shared by extraction and authored replacements. Authored
/// replacements may be a conditional expression; extracted bodies may not.
pub(crate) fn body_of(stmt: Node<Stmt>, allow_conditional: bool) -> Result<TemplateBody, ExtractError> {
    let body = match stmt.into_inner() {
        Stmt::Expr(expr) | Stmt::Return(Some(expr)) => {
            if !allow_conditional && matches!(expr.as_ref(), Expr::Conditional { .. }) {
                return Err(ExtractError::ComplexStatement(
                    "conditional expression as the outermost expression".to_string(),
                ));
            }
            TemplateBody::Expr(expr)
        }
        Stmt::Return(None) => return Err(ExtractError::NoOp),
        Stmt::Throw(expr) => TemplateBody::Throw(expr),
        Stmt::Delegate { kind, args } => TemplateBody::Delegation { kind, args },
        other => return Err(ExtractError::ComplexStatement(other.describe().to_string())),
    };
    if body.roots().into_iter().any(uses_super) {
        return Err(ExtractError::SuperReference);
    }
    Ok(body)
}

/// Convert every root of a body into template form.
pub(crate) fn templatize(body: TemplateBody, scope: &TemplateScope<'_>) -> TemplateBody {
    match body {
        TemplateBody::Expr(expr) => TemplateBody::Expr(to_template(expr, scope)),
        TemplateBody::Throw(expr) => TemplateBody::Throw(to_template(expr, scope)),
        TemplateBody::Delegation { kind, args } => TemplateBody::Delegation {
            kind,
            args: args.into_iter().map(|arg| to_template(arg, scope)).collect(),
        },
    }
}

/// Infer a template from a method or constructor whose body is exactly one
/// statement. `cx` must point into the declaration.
pub fn extract(
    owner: TemplateOwner<'_>,
    service: &dyn SymbolService,
    cx: ResolutionContext,
) -> Result<MethodTemplate, ExtractError> {
    let method = owner.method;
    let block = method
        .body
        .as_ref()
        .ok_or_else(|| ExtractError::NoBody(method.name().to_string()))?;
    let statements = &block.as_ref().statements;
    let stmt = match statements.as_slice() {
        [] => return Err(ExtractError::NoOp),
        [single] => single.clone(),
        many => {
            return Err(ExtractError::ComplexStatement(format!(
                "block with {} statements",
                many.len()
            )));
        }
    };
    let body = body_of(stmt, false)?;
    let params = method.param_names();
    let body = templatize(body, &owner.scope(service, cx, &params));
    let template = owner.template(service, cx, body, TemplateSource::Extracted);
    debug!(
        method = %template.owner_name,
        replacement = %template.replacement_text(),
        "extracted template"
    );
    Ok(template)
}

fn quote(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn string_array(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| quote(item)).collect();
    format!("{{{}}}", quoted.join(", "))
}

/// The attribute an author would add to declare `template` by hand.
pub fn suggest(template: &MethodTemplate) -> String {
    let printer = Printer::new(PrintOptions {
        explicit_receiver: template.receiver != ReceiverPlaceholder::None,
    });
    let mut elements = vec![format!("replacement = {}", quote(&template.body.print(&printer)))];
    let (types, statics): (BTreeSet<_>, BTreeSet<_>) = template
        .imports
        .iter()
        .partition(|import| import.kind() == ImportKind::Type);
    let names = |set: BTreeSet<&inliner_symbol::ImportRequirement>| -> Vec<String> {
        set.into_iter()
            .map(|import| import.qualified_name().to_string())
            .collect()
    };
    let types = names(types);
    let statics = names(statics);
    if !types.is_empty() {
        elements.push(format!("imports = {}", string_array(&types)));
    }
    if !statics.is_empty() {
        elements.push(format!("staticImports = {}", string_array(&statics)));
    }
    format!("@InlineMe({})", elements.join(", "))
}

#[cfg(test)]
mod tests {
    #![expect(clippy::panic, reason = "Panicking on test failures is acceptable")]

    use super::*;
    use crate::testing::Fixture;
    use inliner_ast::nodes::Placeholder;

    const CLIENT: &str = "package com.acme;\n\
        import java.util.List;\n\
        public class Client {\n\
            private int count;\n\
            public void after(int x) {}\n\
            public void before(int x) { after(x); }\n\
            public void explicit(int x) { this.after(x); }\n\
            public static int timesTwo(int x) { return x * 2; }\n\
            public Client noOp() { return this; }\n\
            public void twice(int x) { after(x); after(x); }\n\
            public void branch(boolean b) { if (b) { after(1); } }\n\
            public int pick(boolean b) { return b ? 1 : 2; }\n\
            public void nothing() { return; }\n\
            public abstract void missing();\n\
            public List<String> wrap(String s) { return List.of(s); }\n\
            public int bump() { return count++; }\n\
            public Client(int x) { this(x, 0); }\n\
            public Client(int x, int y) { after(x + y); }\n\
        }\n";

    fn extract_named(name: &str) -> Result<MethodTemplate, ExtractError> {
        let fixture = Fixture::new(&[("Client.java", CLIENT)]);
        fixture.extract("com.acme.Client", name, 0)
    }

    #[test]
    fn implicit_receiver_calls() {
        let template = extract_named("before").expect("template");
        assert_eq!(template.receiver, ReceiverPlaceholder::ImplicitThis);
        assert_eq!(template.replacement_text(), "after(x)");
        assert_eq!(template.body.canonical(), "this.after(x)");
        assert_eq!(template.parameters, vec!["x".to_string()]);
    }

    #[test]
    fn explicit_this_sets_receiver_mode() {
        let template = extract_named("explicit").expect("template");
        assert_eq!(template.receiver, ReceiverPlaceholder::ExplicitThis);
        assert_eq!(template.replacement_text(), "this.after(x)");
    }

    #[test]
    fn static_owner_has_no_receiver() {
        let template = extract_named("timesTwo").expect("template");
        assert_eq!(template.receiver, ReceiverPlaceholder::None);
        let Some(expr) = template.body.expr() else {
            panic!("expected an expression body");
        };
        let Expr::Binary { left, .. } = expr.as_ref() else {
            panic!("expected a binary body, got {expr:?}");
        };
        assert_eq!(
            left.as_ref().as_ref(),
            &Expr::Placeholder(Placeholder::Param {
                name: "x".into(),
                index: 0
            })
        );
    }

    #[test]
    fn fluent_no_op_is_bare_receiver() {
        let template = extract_named("noOp").expect("template");
        assert!(template.is_fluent_no_op());
    }

    #[test]
    fn rejects_complex_bodies() {
        assert!(matches!(extract_named("twice"), Err(ExtractError::ComplexStatement(_))));
        assert!(matches!(extract_named("branch"), Err(ExtractError::ComplexStatement(_))));
        assert!(matches!(extract_named("pick"), Err(ExtractError::ComplexStatement(_))));
        assert_eq!(extract_named("nothing"), Err(ExtractError::NoOp));
        assert!(matches!(extract_named("missing"), Err(ExtractError::NoBody(_))));
    }

    #[test]
    fn infers_imports_for_named_types() {
        let template = extract_named("wrap").expect("template");
        let names: Vec<String> = template.imports.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["java.util.List".to_string()]);
        assert_eq!(
            suggest(&template),
            "@InlineMe(replacement = \"List.of(s)\", imports = {\"java.util.List\"})"
        );
    }

    #[test]
    fn member_fields_get_the_implicit_receiver() {
        let template = extract_named("bump").expect("template");
        assert_eq!(template.body.canonical(), "this.count++");
    }

    #[test]
    fn constructor_delegation() {
        let fixture = Fixture::new(&[("Client.java", CLIENT)]);
        let template = fixture.extract("com.acme.Client", "Client", 0).expect("ctor template");
        assert!(template.is_constructor);
        assert_eq!(template.replacement_text(), "this(x, 0)");
    }
}
