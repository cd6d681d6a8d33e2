//! Inferring and parsing the imports a template needs.

use std::collections::BTreeSet;

use ahash::AHashSet;
use inliner_ast::nodes::{Expr, Node, Type};
use inliner_span::Span;
use inliner_symbol::{Binding, ImportRequirement, ResolutionContext, SymbolService};

use crate::placeholders::lambda_bound_names;
use crate::template::TemplateBody;

fn is_implicit(qualified: &str) -> bool {
    qualified
        .strip_prefix("java.lang.")
        .is_some_and(|rest| !rest.contains('.'))
}

struct Collector<'a> {
    service: &'a dyn SymbolService,
    cx: ResolutionContext,
    bound: AHashSet<Span>,
    out: BTreeSet<ImportRequirement>,
}

impl Collector<'_> {
    fn type_name(&mut self, name: &str) {
        if name.contains('.') || name.is_empty() {
            return;
        }
        if let Some(qualified) = self.service.qualify_type(&self.cx, name)
            && !is_implicit(&qualified)
        {
            self.out.insert(ImportRequirement::type_import(qualified));
        }
    }

    fn ty(&mut self, ty: &Type) {
        if !ty.is_primitive() && !ty.name.starts_with('?') {
            self.type_name(&ty.name);
        }
        for arg in &ty.args {
            self.ty(arg.as_ref());
        }
    }

    fn expr(&mut self, node: &Node<Expr>) {
        match node.as_ref() {
            Expr::Name(name) if !self.bound.contains(node.span()) => {
                match self.service.resolve_name(&self.cx, name) {
                    Some(Binding::Type(_) | Binding::ExternalType(_)) => self.type_name(name),
                    Some(Binding::Local(_) | Binding::Field(_)) => {}
                    None => {
                        if let Some(qualified) = self.service.qualify_static(&self.cx, name) {
                            self.out.insert(ImportRequirement::static_import(qualified));
                        }
                    }
                }
            }
            Expr::Call {
                target: None, name, ..
            } => {
                if let Some(qualified) = self.service.qualify_static(&self.cx, name) {
                    self.out.insert(ImportRequirement::static_import(qualified));
                }
            }
            Expr::New { ty, .. } | Expr::Cast { ty, .. } | Expr::InstanceOf { ty, .. } => {
                self.ty(ty.as_ref());
            }
            Expr::NewArray { element, .. } => self.ty(element.as_ref()),
            _ => {}
        }
    }
}

/// Every type or static member the body names that is not implicitly visible,
/// resolved at the declaration.
pub fn infer_imports(
    body: &TemplateBody,
    service: &dyn SymbolService,
    cx: ResolutionContext,
) -> BTreeSet<ImportRequirement> {
    let mut collector = Collector {
        service,
        cx,
        bound: AHashSet::new(),
        out: BTreeSet::new(),
    };
    for root in body.roots() {
        collector.bound.extend(lambda_bound_names(root));
    }
    body.walk(&mut |node| collector.expr(node));
    collector.out
}

/// Declared import strings as requirements.
pub fn declared_imports(imports: &[String], static_imports: &[String]) -> BTreeSet<ImportRequirement> {
    imports
        .iter()
        .map(|name| ImportRequirement::type_import(name.trim()))
        .chain(
            static_imports
                .iter()
                .map(|name| ImportRequirement::static_import(name.trim())),
        )
        .collect()
}

pub fn format_imports(imports: &BTreeSet<ImportRequirement>) -> String {
    let names: Vec<String> = imports.iter().map(ToString::to_string).collect();
    format!("[{}]", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_lang_is_implicit() {
        assert!(is_implicit("java.lang.String"));
        assert!(!is_implicit("java.lang.reflect.Method"));
        assert!(!is_implicit("java.util.List"));
    }

    #[test]
    fn declared_strings_become_requirements() {
        let declared = declared_imports(
            &["java.util.List".to_string()],
            &["java.util.Objects.requireNonNull".to_string()],
        );
        assert_eq!(
            format_imports(&declared),
            "[java.util.List, static java.util.Objects.requireNonNull]"
        );
    }
}
