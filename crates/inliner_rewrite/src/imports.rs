//! Import handling for rewritten sites: add an import when the simple name is
//! free, fully qualify the reference when it is taken, and merge every
//! addition of a file into one edit.

use std::collections::{BTreeMap, BTreeSet};

use inliner_ast::nodes::{CompilationUnit, Expr, Node, Type, qualifier, simple_name};
use inliner_ast::visit::fold_expr;
use inliner_span::{FileId, Span};
use inliner_symbol::{
    Binding, ImportKind, ImportRequirement, ImportState, ResolutionContext, SymbolService,
};
use inliner_template::placeholders::lambda_bound_names;

use crate::edit::TextEdit;
use crate::error::RewriteError;

/// What one site needs done about its imports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteImports {
    /// To be added to the file.
    pub added: BTreeSet<ImportRequirement>,
    /// To be written fully qualified at the point of use.
    pub qualified: BTreeSet<ImportRequirement>,
}

impl SiteImports {
    pub fn is_qualified(&self, requirement: &ImportRequirement) -> bool {
        self.qualified.contains(requirement)
    }

    fn qualified_type(&self, name: &str) -> Option<&str> {
        self.qualified
            .iter()
            .find(|req| req.kind() == ImportKind::Type && req.simple_name() == name)
            .map(ImportRequirement::qualified_name)
    }

    fn qualified_static(&self, name: &str) -> Option<&str> {
        self.qualified
            .iter()
            .find(|req| req.kind() == ImportKind::StaticMember && req.simple_name() == name)
            .map(ImportRequirement::qualified_name)
    }

    fn qualify_type(&self, ty: Node<Type>) -> Node<Type> {
        let (mut ty, span) = ty.into_parts();
        if let Some(qualified) = self.qualified_type(&ty.name) {
            ty.name = qualified.to_string();
        }
        ty.args = ty.args.into_iter().map(|arg| self.qualify_type(arg)).collect();
        Node::new(ty, span)
    }

    /// Rewrite the template's own references to qualified requirements.
    /// Names bound by template lambdas are left alone.
    pub fn qualify(&self, expr: &Node<Expr>) -> Node<Expr> {
        if self.qualified.is_empty() {
            return expr.clone();
        }
        let bound = lambda_bound_names(expr);
        fold_expr(expr.clone(), &mut |node| {
            let span = *node.span();
            let expr = match node.into_inner() {
                Expr::Name(name) if !bound.contains(&span) => {
                    let (head, rest) = match name.split_once('.') {
                        Some((head, rest)) => (head, Some(rest)),
                        None => (name.as_str(), None),
                    };
                    let replaced = self
                        .qualified_type(head)
                        .or_else(|| self.qualified_static(head))
                        .map(|qualified| match rest {
                            Some(rest) => format!("{qualified}.{rest}"),
                            None => qualified.to_string(),
                        });
                    Expr::Name(replaced.unwrap_or(name))
                }
                Expr::Call {
                    target: None,
                    name,
                    args,
                } => {
                    let target = self.qualified_static(&name).and_then(qualifier).map(|owner| {
                        Box::new(Node::new(
                            Expr::Name(owner.to_string()),
                            Span::empty_at(span.start()),
                        ))
                    });
                    Expr::Call { target, name, args }
                }
                Expr::New { ty, args } => Expr::New {
                    ty: self.qualify_type(ty),
                    args,
                },
                Expr::Cast { ty, expr } => Expr::Cast {
                    ty: self.qualify_type(ty),
                    expr,
                },
                Expr::InstanceOf { expr, ty } => Expr::InstanceOf {
                    expr,
                    ty: self.qualify_type(ty),
                },
                Expr::NewArray {
                    element,
                    dims,
                    extra_dims,
                    init,
                } => Expr::NewArray {
                    element: self.qualify_type(element),
                    dims,
                    extra_dims,
                    init,
                },
                other => other,
            };
            Node::new(expr, span)
        })
    }
}

/// Imports planned for one file so far. Sites of a file are resolved in
/// order, so a later site sees what earlier ones added.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    file: FileId,
    add_imports: bool,
    planned: BTreeMap<(ImportKind, String), ImportRequirement>,
}

impl ImportPlan {
    pub fn new(file: FileId, add_imports: bool) -> Self {
        Self {
            file,
            add_imports,
            planned: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.planned.is_empty()
    }

    pub fn planned(&self) -> impl Iterator<Item = &ImportRequirement> {
        self.planned.values()
    }

    fn key(requirement: &ImportRequirement) -> (ImportKind, String) {
        (requirement.kind(), requirement.simple_name().to_string())
    }

    /// Decide how each requirement is met at `cx`. Nothing is recorded until
    /// [`ImportPlan::commit`], so a failed site leaves the plan untouched.
    pub fn resolve<'r>(
        &self,
        service: &dyn SymbolService,
        cx: &ResolutionContext,
        requirements: impl IntoIterator<Item = &'r ImportRequirement>,
    ) -> Result<SiteImports, RewriteError> {
        let mut imports = SiteImports::default();
        for requirement in requirements {
            let state = match self.planned.get(&Self::key(requirement)) {
                Some(planned) if planned == requirement => ImportState::Visible,
                Some(planned) => ImportState::Conflict {
                    bound_to: planned.qualified_name().to_string(),
                },
                None => service.import_state(cx, requirement),
            };
            match state {
                ImportState::Visible => {}
                ImportState::Free if self.add_imports => {
                    imports.added.insert(requirement.clone());
                }
                ImportState::Free | ImportState::Conflict { .. } => {
                    check_qualifier(service, cx, requirement)?;
                    imports.qualified.insert(requirement.clone());
                }
            }
        }
        Ok(imports)
    }

    pub fn commit(&mut self, imports: &SiteImports) {
        for requirement in &imports.added {
            self.planned
                .entry(Self::key(requirement))
                .or_insert_with(|| requirement.clone());
        }
    }

    /// One edit inserting every planned import: after the last import, else
    /// after the package declaration, else at the top of the file.
    pub fn insertion_edit(&self, unit: &CompilationUnit, text: &str) -> Option<TextEdit> {
        if self.planned.is_empty() {
            return None;
        }
        let ordered: BTreeSet<&ImportRequirement> = self.planned.values().collect();
        let lines: Vec<String> = ordered.iter().map(|req| req.declaration()).collect();
        let block = lines.join("\n");
        if let Some(last) = unit.imports.last() {
            return Some(TextEdit::insert(self.file, last.span().end(), format!("\n{block}")));
        }
        if let Some(package) = &unit.package {
            let after_name = package.span().end();
            let end = text
                .get(after_name..)
                .and_then(|rest| rest.find(';'))
                .map_or(after_name, |semi| after_name + semi + 1);
            return Some(TextEdit::insert(self.file, end, format!("\n\n{block}")));
        }
        Some(TextEdit::insert(self.file, 0, format!("{block}\n\n")))
    }
}

/// A fully qualified reference only works if its first segment still names
/// a package at the use site.
fn check_qualifier(
    service: &dyn SymbolService,
    cx: &ResolutionContext,
    requirement: &ImportRequirement,
) -> Result<(), RewriteError> {
    let qualified = requirement.qualified_name();
    let segment = qualified.split('.').next().unwrap_or(qualified);
    if segment == simple_name(qualified) {
        return Ok(());
    }
    match service.resolve_name(cx, segment) {
        Some(Binding::Local(_) | Binding::Field(_) | Binding::Type(_)) => {
            Err(RewriteError::ShadowedQualifier {
                qualified: qualified.to_string(),
                segment: segment.to_string(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inliner_fmt::print_expr;
    use inliner_parser::{parse_expression_source, parse_source};

    fn qualified(requirements: &[ImportRequirement]) -> SiteImports {
        SiteImports {
            added: BTreeSet::new(),
            qualified: requirements.iter().cloned().collect(),
        }
    }

    fn qualify(imports: &SiteImports, source: &str) -> String {
        let expr = parse_expression_source(source).expect("parse");
        print_expr(imports.qualify(&expr).as_ref())
    }

    #[test]
    fn type_references_are_qualified() {
        let imports = qualified(&[ImportRequirement::type_import("java.awt.List")]);
        assert_eq!(qualify(&imports, "List.of(x)"), "java.awt.List.of(x)");
        assert_eq!(qualify(&imports, "new List<List>()"), "new java.awt.List<java.awt.List>()");
        assert_eq!(qualify(&imports, "(List) x"), "(java.awt.List) x");
    }

    #[test]
    fn static_calls_gain_their_owner() {
        let imports = qualified(&[ImportRequirement::static_import("java.util.Objects.requireNonNull")]);
        assert_eq!(
            qualify(&imports, "requireNonNull(x)"),
            "java.util.Objects.requireNonNull(x)"
        );
    }

    #[test]
    fn lambda_parameters_are_not_qualified() {
        let imports = qualified(&[ImportRequirement::type_import("java.awt.List")]);
        assert_eq!(qualify(&imports, "run(List -> List)"), "run(List -> List)");
    }

    #[test]
    fn insertion_goes_after_the_last_import() {
        let text = "package p;\nimport a.B;\nclass C {}\n";
        let unit = parse_source(text).expect("parse");
        let mut plan = ImportPlan::new(FileId::new(0), true);
        plan.commit(&SiteImports {
            added: [
                ImportRequirement::static_import("x.Y.z"),
                ImportRequirement::type_import("x.Y"),
            ]
            .into_iter()
            .collect(),
            qualified: BTreeSet::new(),
        });
        let edit = plan.insertion_edit(&unit, text).expect("edit");
        assert_eq!(edit.span, Span::empty_at(22));
        assert_eq!(edit.replacement, "\nimport x.Y;\nimport static x.Y.z;");
    }

    #[test]
    fn insertion_after_package_when_there_are_no_imports() {
        let text = "package p;\nclass C {}\n";
        let unit = parse_source(text).expect("parse");
        let mut plan = ImportPlan::new(FileId::new(0), true);
        plan.commit(&SiteImports {
            added: [ImportRequirement::type_import("x.Y")].into_iter().collect(),
            qualified: BTreeSet::new(),
        });
        let edit = plan.insertion_edit(&unit, text).expect("edit");
        assert_eq!(edit.span, Span::empty_at(10));
        assert_eq!(edit.replacement, "\n\nimport x.Y;");
    }
}
