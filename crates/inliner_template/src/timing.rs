//! When do placeholders get evaluated?
//!
//! A call evaluates each argument exactly once, before the body runs. After
//! inlining, an argument is evaluated wherever its placeholder sits, so a
//! placeholder that only occurs inside a lambda or a conditionally skipped
//! operand changes when (or whether) the argument expression runs.

use ahash::AHashMap;
use inliner_ast::nodes::{BinaryOp, Expr, LambdaBody, Node, Placeholder};
use inliner_ast::visit::children;

use crate::template::TemplateBody;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Param(String),
    Receiver,
}

impl Slot {
    pub fn label(&self) -> &str {
        match self {
            Slot::Param(name) => name,
            Slot::Receiver => "this",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Evaluated whenever the enclosing expression is.
    Always,
    /// Only on some paths, or later than the call.
    Sometimes,
}

type Occurrences = AHashMap<Slot, Evaluation>;

fn merge(into: &mut Occurrences, from: Occurrences) {
    for (slot, evaluation) in from {
        into.entry(slot)
            .and_modify(|current| {
                if evaluation == Evaluation::Always {
                    *current = Evaluation::Always;
                }
            })
            .or_insert(evaluation);
    }
}

fn deferred(mut occurrences: Occurrences) -> Occurrences {
    for evaluation in occurrences.values_mut() {
        *evaluation = Evaluation::Sometimes;
    }
    occurrences
}

/// `true && x` and `false || x` always evaluate `x`.
fn right_always_runs(op: BinaryOp, left: &Expr) -> bool {
    matches!(
        (op, left.bool_constant()),
        (BinaryOp::And, Some(true)) | (BinaryOp::Or, Some(false))
    )
}

fn analyze(expr: &Node<Expr>) -> Occurrences {
    match expr.as_ref() {
        Expr::Placeholder(Placeholder::Param { name, .. }) => {
            AHashMap::from_iter([(Slot::Param(name.clone()), Evaluation::Always)])
        }
        Expr::Placeholder(Placeholder::Receiver { .. }) => {
            AHashMap::from_iter([(Slot::Receiver, Evaluation::Always)])
        }
        Expr::Lambda { body, .. } => match body {
            LambdaBody::Expr(body) => deferred(analyze(body)),
            LambdaBody::Block(block) => {
                let mut found = Occurrences::new();
                inliner_ast::visit::walk_block(block, &mut |node| {
                    merge(&mut found, analyze_leaf(node));
                });
                deferred(found)
            }
        },
        Expr::Binary { op, left, right } if op.is_short_circuit() => {
            let mut found = analyze(left);
            let tail = analyze(right);
            if right_always_runs(*op, left.as_ref().as_ref()) {
                merge(&mut found, tail);
            } else {
                merge(&mut found, deferred(tail));
            }
            found
        }
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            let mut found = analyze(cond);
            let then_found = analyze(then_expr);
            let else_found = analyze(else_expr);
            match cond.as_ref().as_ref().bool_constant() {
                Some(true) => {
                    merge(&mut found, then_found);
                    merge(&mut found, deferred(else_found));
                }
                Some(false) => {
                    merge(&mut found, deferred(then_found));
                    merge(&mut found, else_found);
                }
                None => {
                    // Evaluated exactly once when both branches evaluate it.
                    let mut branches = Occurrences::new();
                    for (slot, evaluation) in &then_found {
                        let both = *evaluation == Evaluation::Always
                            && else_found.get(slot) == Some(&Evaluation::Always);
                        let evaluation = if both {
                            Evaluation::Always
                        } else {
                            Evaluation::Sometimes
                        };
                        branches.insert(slot.clone(), evaluation);
                    }
                    for slot in else_found.keys() {
                        branches.entry(slot.clone()).or_insert(Evaluation::Sometimes);
                    }
                    merge(&mut found, branches);
                }
            }
            found
        }
        other => {
            let mut found = Occurrences::new();
            for (_, child) in children(other) {
                merge(&mut found, analyze(child));
            }
            found
        }
    }
}

/// Placeholder at a single node, ignoring its children; used inside lambda
/// blocks where every occurrence is deferred anyway.
fn analyze_leaf(node: &Node<Expr>) -> Occurrences {
    match node.as_ref() {
        Expr::Placeholder(_) => analyze(node),
        _ => Occurrences::new(),
    }
}

/// Placeholders that occur in the body but are not guaranteed to be
/// evaluated exactly once at the call, sorted by name.
pub fn unsafe_placeholders(body: &TemplateBody) -> Vec<Slot> {
    let mut found = Occurrences::new();
    for root in body.roots() {
        merge(&mut found, analyze(root));
    }
    let mut slots: Vec<Slot> = found
        .into_iter()
        .filter(|(_, evaluation)| *evaluation == Evaluation::Sometimes)
        .map(|(slot, _)| slot)
        .collect();
    slots.sort();
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use inliner_parser::parse_expression_source;
    use inliner_span::Span;

    /// Parse `source` and turn every name in `params` into a placeholder,
    /// and `this` into the receiver placeholder.
    fn template(source: &str, params: &[&str]) -> TemplateBody {
        let expr = parse_expression_source(source).expect("parse");
        let converted = inliner_ast::visit::fold_expr(expr, &mut |node| match node.as_ref() {
            Expr::Name(name) if params.contains(&name.as_str()) => Node::new(
                Expr::Placeholder(Placeholder::Param {
                    name: name.clone(),
                    index: 0,
                }),
                Span::default(),
            ),
            Expr::This => Node::new(
                Expr::Placeholder(Placeholder::Receiver { explicit: true }),
                Span::default(),
            ),
            _ => node,
        });
        TemplateBody::Expr(converted)
    }

    fn unsafe_names(source: &str, params: &[&str]) -> Vec<String> {
        unsafe_placeholders(&template(source, params))
            .iter()
            .map(|slot| slot.label().to_string())
            .collect()
    }

    #[test]
    fn lambda_bodies_defer_evaluation() {
        assert_eq!(unsafe_names("this.after(() -> string)", &["string"]), vec!["string"]);
    }

    #[test]
    fn block_lambdas_defer_evaluation() {
        assert_eq!(unsafe_names("run(() -> { use(value); })", &["value"]), vec!["value"]);
    }

    #[test]
    fn conditions_are_always_evaluated() {
        assert!(unsafe_names("a && check()", &["a"]).is_empty());
        assert!(unsafe_names("a || check()", &["a"]).is_empty());
        assert!(unsafe_names("a ? 1 : 2", &["a"]).is_empty());
    }

    #[test]
    fn skipped_operands_are_unsafe() {
        assert_eq!(unsafe_names("check() && b", &["b"]), vec!["b"]);
        assert_eq!(unsafe_names("c ? b : 0", &["b", "c"]), vec!["b"]);
    }

    #[test]
    fn both_branches_count_once() {
        assert!(unsafe_names("c ? b + 1 : b - 1", &["b", "c"]).is_empty());
    }

    #[test]
    fn constant_conditions_pick_a_branch() {
        assert!(unsafe_names("true ? b : 0", &["b"]).is_empty());
        assert!(unsafe_names("true && b", &["b"]).is_empty());
        assert_eq!(unsafe_names("false ? b : 0", &["b"]), vec!["b"]);
    }

    #[test]
    fn any_unconditional_use_is_enough() {
        assert!(unsafe_names("use(b, () -> b)", &["b"]).is_empty());
    }

    #[test]
    fn receiver_is_checked_too() {
        assert_eq!(unsafe_names("run(() -> this.go())", &[]), vec!["this"]);
    }
}
