//! Binding call-site fragments to template placeholders, and splicing them
//! into the template tree.

use ahash::AHashMap;
use inliner_ast::nodes::{Expr, Node, Placeholder};
use inliner_ast::visit::{fold_expr, free_names, walk_expr};
use inliner_template::placeholders::lambda_params;
use inliner_template::{MethodTemplate, TemplateBody, VarargsMode};

use crate::error::RewriteError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Single(Node<Expr>),
    /// The variadic tail, expanded in place where the formal is an argument.
    Spread(Vec<Node<Expr>>),
}

impl Fragment {
    fn exprs(&self) -> Vec<&Node<Expr>> {
        match self {
            Fragment::Single(expr) => vec![expr],
            Fragment::Spread(exprs) => exprs.iter().collect(),
        }
    }
}

/// Placeholder bindings for one call site.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Substitution {
    params: AHashMap<String, Fragment>,
    receiver: Option<Node<Expr>>,
}

impl Substitution {
    /// Zip the call's arguments with the template's parameters.
    pub fn bind(
        template: &MethodTemplate,
        args: &[Node<Expr>],
        receiver: Option<Node<Expr>>,
    ) -> Result<Self, RewriteError> {
        let params = &template.parameters;
        let arity_error = || RewriteError::ArityMismatch {
            callee: template.owner_name.clone(),
            expected: params.len(),
            found: args.len(),
        };
        let fixed = match template.varargs_mode {
            VarargsMode::None => {
                if args.len() != params.len() {
                    return Err(arity_error());
                }
                params.len()
            }
            VarargsMode::Forward | VarargsMode::DropTail => {
                let fixed = params.len().checked_sub(1).ok_or_else(arity_error)?;
                if args.len() < fixed {
                    return Err(arity_error());
                }
                fixed
            }
        };

        let mut bound: AHashMap<String, Fragment> = params
            .iter()
            .zip(args)
            .take(fixed)
            .map(|(param, arg)| (param.clone(), Fragment::Single(arg.clone())))
            .collect();
        if template.varargs_mode == VarargsMode::Forward
            && let (Some(formal), Some(tail)) = (params.last(), args.get(fixed..))
        {
            bound.insert(formal.clone(), Fragment::Spread(tail.to_vec()));
        }
        Ok(Self {
            params: bound,
            receiver,
        })
    }

    pub fn get(&self, param: &str) -> Option<&Fragment> {
        self.params.get(param)
    }

    pub fn receiver(&self) -> Option<&Node<Expr>> {
        self.receiver.as_ref()
    }

    pub fn set_receiver(&mut self, receiver: Option<Node<Expr>>) {
        self.receiver = receiver;
    }

    fn expand(&self, args: Vec<Node<Expr>>) -> Vec<Node<Expr>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg.as_ref().param_placeholder().and_then(|name| self.params.get(name)) {
                Some(Fragment::Spread(tail)) => out.extend(tail.iter().cloned()),
                _ => out.push(arg),
            }
        }
        out
    }

    fn splice_node(&self, node: Node<Expr>) -> Node<Expr> {
        let bound = match node.as_ref() {
            Expr::Placeholder(Placeholder::Param { name, .. }) => match self.params.get(name) {
                Some(Fragment::Single(arg)) => Some(arg.clone()),
                _ => None,
            },
            Expr::Placeholder(Placeholder::Receiver { explicit }) => match (&self.receiver, *explicit) {
                (Some(receiver), _) => Some(receiver.clone()),
                (None, true) => Some(Node::new(Expr::This, *node.span())),
                // Printed as nothing: the member reference stays unqualified.
                (None, false) => None,
            },
            _ => None,
        };
        if let Some(bound) = bound {
            return bound;
        }
        let (expr, span) = node.into_parts();
        let expr = match expr {
            Expr::Call { target, name, args } => Expr::Call {
                target,
                name,
                args: self.expand(args),
            },
            Expr::New { ty, args } => Expr::New {
                ty,
                args: self.expand(args),
            },
            other => other,
        };
        Node::new(expr, span)
    }

    /// The template expression with every bound placeholder replaced.
    pub fn splice_expr(&self, expr: &Node<Expr>) -> Node<Expr> {
        fold_expr(expr.clone(), &mut |node| self.splice_node(node))
    }

    /// An argument list with every bound placeholder replaced and the
    /// variadic tail expanded.
    pub fn splice_args(&self, args: &[Node<Expr>]) -> Vec<Node<Expr>> {
        let spliced = args.iter().map(|arg| self.splice_expr(arg)).collect();
        self.expand(spliced)
    }

    /// A fragment spliced under a template lambda must not read a name that
    /// lambda declares as a parameter.
    pub fn check_capture(&self, body: &TemplateBody) -> Result<(), RewriteError> {
        for root in body.roots() {
            for (lambda, names) in lambda_params(root) {
                let mut captured = None;
                walk_expr(root, &mut |node| {
                    if captured.is_some() || !lambda.encloses(node.span()) {
                        return;
                    }
                    let fragments: Vec<&Node<Expr>> = match node.as_ref() {
                        Expr::Placeholder(Placeholder::Param { name, .. }) => self
                            .params
                            .get(name)
                            .map(Fragment::exprs)
                            .unwrap_or_default(),
                        Expr::Placeholder(Placeholder::Receiver { .. }) => {
                            self.receiver.iter().collect()
                        }
                        _ => Vec::new(),
                    };
                    captured = fragments
                        .into_iter()
                        .flat_map(free_names)
                        .find(|free| names.contains(free));
                });
                if let Some(name) = captured {
                    return Err(RewriteError::Capture(name));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::panic, reason = "Panicking on test failures is acceptable")]

    use super::*;
    use inliner_ast::nodes::Literal;
    use inliner_fmt::print_expr;
    use inliner_parser::parse_expression_source;
    use inliner_span::Span;
    use inliner_symbol::DeclId;
    use inliner_template::{ReceiverPlaceholder, TemplateSource};
    use inliner_ast::nodes::Visibility;
    use inliner_span::FileId;
    use std::collections::BTreeSet;

    /// Template over `params` whose body is `source`, with `this` as the
    /// receiver placeholder.
    fn template(source: &str, params: &[&str], mode: VarargsMode) -> MethodTemplate {
        let expr = parse_expression_source(source).expect("parse");
        let body = fold_expr(expr, &mut |node| match node.as_ref() {
            Expr::Name(name) if params.contains(&name.as_str()) => Node::new(
                Expr::Placeholder(Placeholder::Param {
                    name: name.clone(),
                    index: 0,
                }),
                *node.span(),
            ),
            Expr::This => Node::new(Expr::Placeholder(Placeholder::Receiver { explicit: true }), *node.span()),
            _ => node,
        });
        MethodTemplate {
            owner: DeclId::new(0),
            owner_name: "before".into(),
            owner_type: DeclId::new(1),
            owner_type_name: "com.acme.Client".into(),
            file: FileId::new(0),
            span: Span::default(),
            parameters: params.iter().map(ToString::to_string).collect(),
            varargs_last: mode != VarargsMode::None,
            receiver: ReceiverPlaceholder::ExplicitThis,
            body: TemplateBody::Expr(body),
            imports: BTreeSet::new(),
            source: TemplateSource::Extracted,
            varargs_mode: mode,
            returns_void: true,
            is_constructor: false,
            visibility: Visibility::Public,
            disabled_reason: None,
        }
    }

    fn args(sources: &[&str]) -> Vec<Node<Expr>> {
        sources
            .iter()
            .map(|source| parse_expression_source(source).expect("parse arg"))
            .collect()
    }

    fn spliced(template: &MethodTemplate, call_args: &[&str], receiver: Option<&str>) -> String {
        let receiver = receiver.map(|source| parse_expression_source(source).expect("parse receiver"));
        let substitution = Substitution::bind(template, &args(call_args), receiver).expect("bind");
        let Some(body) = template.body.expr() else {
            panic!("expected an expression template");
        };
        print_expr(substitution.splice_expr(body).as_ref())
    }

    #[test]
    fn arguments_keep_their_precedence() {
        let template = template("x * 2", &["x"], VarargsMode::None);
        assert_eq!(spliced(&template, &["1 + 1"], None), "(1 + 1) * 2");
    }

    #[test]
    fn forwarded_varargs_expand_in_place() {
        let template = template("this.after(inputs)", &["inputs"], VarargsMode::Forward);
        assert_eq!(spliced(&template, &[], None), "this.after()");
        assert_eq!(spliced(&template, &["1"], None), "this.after(1)");
        assert_eq!(spliced(&template, &["1", "2", "3"], Some("client")), "client.after(1, 2, 3)");
    }

    #[test]
    fn dropped_tails_are_ignored() {
        let template = template("this.after(first)", &["first", "inputs"], VarargsMode::DropTail);
        assert_eq!(spliced(&template, &["42", "1", "2", "3"], None), "this.after(42)");
    }

    #[test]
    fn exact_arity_is_required_without_varargs() {
        let template = template("this.after(x)", &["x"], VarargsMode::None);
        let error = Substitution::bind(&template, &args(&["1", "2"]), None);
        assert_eq!(
            error,
            Err(RewriteError::ArityMismatch {
                callee: "before".into(),
                expected: 1,
                found: 2,
            })
        );
    }

    #[test]
    fn lambda_parameters_do_not_capture_arguments() {
        let template = template("this.each(v -> use(v, x))", &["x"], VarargsMode::None);
        let substitution =
            Substitution::bind(&template, &args(&["v + 1"]), None).expect("bind");
        assert_eq!(
            substitution.check_capture(&template.body),
            Err(RewriteError::Capture("v".into()))
        );
        let substitution = Substitution::bind(&template, &args(&["w"]), None).expect("bind");
        assert_eq!(substitution.check_capture(&template.body), Ok(()));
    }

    #[test]
    fn receiver_literals_splice_as_primaries() {
        let template = template("this.repeat(n)", &["n"], VarargsMode::None);
        let receiver = Node::new(Expr::Literal(Literal::String("\"ab\"".into())), Span::default());
        let substitution = Substitution::bind(&template, &args(&["3"]), Some(receiver)).expect("bind");
        let Some(body) = template.body.expr() else {
            panic!("expected an expression template");
        };
        assert_eq!(print_expr(substitution.splice_expr(body).as_ref()), "\"ab\".repeat(3)");
    }
}
