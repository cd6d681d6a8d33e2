//! Turning a concrete method body into a template tree.
//!
//! Parameters become parameter placeholders, `this` becomes the explicit
//! receiver placeholder, and unqualified references to members of the owner
//! type get the implicit receiver placeholder as their qualifier.

use ahash::AHashSet;
use inliner_ast::nodes::{Block, Expr, LambdaBody, Node, Placeholder, Stmt};
use inliner_ast::visit::{fold_expr, walk_block};
use inliner_span::Span;
use inliner_symbol::{Binding, DeclId, ResolutionContext, SymbolService};

/// Declaration-side context for the conversion.
pub struct TemplateScope<'a> {
    pub service: &'a dyn SymbolService,
    pub cx: ResolutionContext,
    pub owner_type: DeclId,
    pub params: &'a [String],
}

impl TemplateScope<'_> {
    fn is_own_member(&self, member: DeclId) -> bool {
        self.service
            .declaration(member)
            .and_then(|decl| decl.owner)
            .is_some_and(|owner| self.service.is_subtype(self.owner_type, owner))
    }

    fn is_own_field(&self, name: &str) -> bool {
        match self.service.resolve_name(&self.cx, name) {
            Some(Binding::Field(id)) => self.is_own_member(id),
            _ => false,
        }
    }

    fn is_own_method(&self, name: &str, arity: usize) -> bool {
        self.service
            .resolve_method(&self.cx, name, arity)
            .is_some_and(|id| self.is_own_member(id))
    }
}

fn implicit_receiver(at: Span) -> Box<Node<Expr>> {
    Box::new(Node::new(
        Expr::Placeholder(Placeholder::Receiver { explicit: false }),
        Span::empty_at(at.start()),
    ))
}

/// Convert a parsed expression into its template form.
pub fn to_template(expr: Node<Expr>, scope: &TemplateScope<'_>) -> Node<Expr> {
    let bound = lambda_bound_names(&expr);
    fold_expr(expr, &mut |node| convert(node, scope, &bound))
}

fn convert(node: Node<Expr>, scope: &TemplateScope<'_>, bound: &AHashSet<Span>) -> Node<Expr> {
    let (value, span) = node.into_parts();
    let converted = match value {
        Expr::This => Expr::Placeholder(Placeholder::Receiver { explicit: true }),
        Expr::Name(name) if !bound.contains(&span) => {
            if let Some(index) = scope.params.iter().position(|param| *param == name) {
                Expr::Placeholder(Placeholder::Param { name, index })
            } else if scope.is_own_field(&name) {
                Expr::Field {
                    target: implicit_receiver(span),
                    name,
                }
            } else {
                Expr::Name(name)
            }
        }
        Expr::Call {
            target: None,
            name,
            args,
        } if scope.is_own_method(&name, args.len()) => Expr::Call {
            target: Some(implicit_receiver(span)),
            name,
            args,
        },
        other => other,
    };
    Node::new(converted, span)
}

/// Spans of `Name` nodes that refer to a lambda parameter or to a local
/// declared inside a lambda block, rather than to anything outside.
pub fn lambda_bound_names(expr: &Node<Expr>) -> AHashSet<Span> {
    let mut bound = AHashSet::new();
    collect_bound(expr, &[], &mut bound);
    bound
}

fn head(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

fn collect_bound(expr: &Node<Expr>, scope: &[String], out: &mut AHashSet<Span>) {
    match expr.as_ref() {
        Expr::Name(name) => {
            if scope.iter().any(|bound| bound == head(name)) {
                out.insert(*expr.span());
            }
        }
        Expr::Lambda { params, body } => {
            let mut inner = scope.to_vec();
            inner.extend(params.iter().map(|param| param.as_ref().clone()));
            match body {
                LambdaBody::Expr(body) => collect_bound(body, &inner, out),
                LambdaBody::Block(block) => {
                    inner.extend(declared_names(&block.as_ref().statements));
                    walk_block(block, &mut |node| {
                        if let Expr::Lambda { params, .. } = node.as_ref() {
                            inner.extend(params.iter().map(|param| param.as_ref().clone()));
                        }
                    });
                    walk_block(block, &mut |node| {
                        if let Expr::Name(name) = node.as_ref()
                            && inner.iter().any(|bound| bound == head(name))
                        {
                            out.insert(*node.span());
                        }
                    });
                }
            }
        }
        _ => {
            for (_, child) in inliner_ast::visit::children(expr.as_ref()) {
                collect_bound(child, scope, out);
            }
        }
    }
}

/// Every local, loop and catch variable declared anywhere in `statements`.
fn declared_names(statements: &[Node<Stmt>]) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in statements {
        declared_in(stmt, &mut names);
    }
    names
}

fn declared_in(stmt: &Node<Stmt>, names: &mut Vec<String>) {
    match stmt.as_ref() {
        Stmt::Local { name, .. } => names.push(name.as_ref().clone()),
        Stmt::Block(block) => names.extend(declared_block(block)),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            declared_in(then_branch, names);
            if let Some(else_branch) = else_branch {
                declared_in(else_branch, names);
            }
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => declared_in(body, names),
        Stmt::For { init, body, .. } => {
            for stmt in init {
                declared_in(stmt, names);
            }
            declared_in(body, names);
        }
        Stmt::ForEach { name, body, .. } => {
            names.push(name.as_ref().clone());
            declared_in(body, names);
        }
        Stmt::Try {
            resources,
            body,
            catches,
            finally,
        } => {
            for resource in resources {
                declared_in(resource, names);
            }
            names.extend(declared_block(body));
            for catch in catches {
                names.push(catch.as_ref().name.as_ref().clone());
                names.extend(declared_block(&catch.as_ref().body));
            }
            if let Some(finally) = finally {
                names.extend(declared_block(finally));
            }
        }
        _ => {}
    }
}

fn declared_block(block: &Node<Block>) -> Vec<String> {
    declared_names(&block.as_ref().statements)
}

/// Parameter names of every lambda in `expr`, outermost first, paired with
/// the span of the lambda.
pub fn lambda_params(expr: &Node<Expr>) -> Vec<(Span, Vec<String>)> {
    let mut found = Vec::new();
    inliner_ast::visit::walk_expr(expr, &mut |node| {
        if let Expr::Lambda { params, .. } = node.as_ref() {
            found.push((
                *node.span(),
                params.iter().map(|param| param.as_ref().clone()).collect(),
            ));
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use inliner_parser::parse_expression_source;

    #[test]
    fn lambda_parameters_bind_their_uses() {
        let expr = parse_expression_source("list.map(x -> x + y)").expect("parse");
        let bound = lambda_bound_names(&expr);
        assert_eq!(bound.len(), 1);
    }

    #[test]
    fn block_lambda_locals_are_bound() {
        let expr =
            parse_expression_source("run(() -> { int n = 1; use(n); })").expect("parse");
        assert_eq!(lambda_bound_names(&expr).len(), 1);
        assert_eq!(lambda_params(&expr).len(), 1);
    }
}
