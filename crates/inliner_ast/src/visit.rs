//! Traversal helpers shared by the template and rewrite passes.

use crate::nodes::{Block, Expr, LambdaBody, Node, Stmt};
use crate::precedence::ChildSlot;

/// Direct expression children with the slot they occupy. Statements inside a
/// block-bodied lambda are not included; use [`walk_expr`] for a deep walk.
pub fn children(expr: &Expr) -> Vec<(ChildSlot, &Node<Expr>)> {
    match expr {
        Expr::Literal(_) | Expr::Name(_) | Expr::This | Expr::Super | Expr::Placeholder(_) => {
            Vec::new()
        }
        Expr::Field { target, .. } | Expr::MethodRef { target, .. } => {
            vec![(ChildSlot::Receiver, target.as_ref())]
        }
        Expr::Call { target, args, .. } => {
            let mut out = Vec::with_capacity(args.len() + 1);
            if let Some(target) = target {
                out.push((ChildSlot::Receiver, target.as_ref()));
            }
            out.extend(args.iter().map(|arg| (ChildSlot::Argument, arg)));
            out
        }
        Expr::New { args, .. } => args.iter().map(|arg| (ChildSlot::Argument, arg)).collect(),
        Expr::NewArray { dims, init, .. } => dims
            .iter()
            .map(|dim| (ChildSlot::Index, dim))
            .chain(init.iter().flatten().map(|item| (ChildSlot::Argument, item)))
            .collect(),
        Expr::Index { target, index } => vec![
            (ChildSlot::Receiver, target.as_ref()),
            (ChildSlot::Index, index.as_ref()),
        ],
        Expr::Unary { expr, .. }
        | Expr::Postfix { expr, .. }
        | Expr::Cast { expr, .. }
        | Expr::InstanceOf { expr, .. } => vec![(ChildSlot::Operand, expr.as_ref())],
        Expr::Binary { left, right, .. } => vec![
            (ChildSlot::Left, left.as_ref()),
            (ChildSlot::Right, right.as_ref()),
        ],
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => vec![
            (ChildSlot::Condition, cond.as_ref()),
            (ChildSlot::Then, then_expr.as_ref()),
            (ChildSlot::Else, else_expr.as_ref()),
        ],
        Expr::Assign { target, value, .. } => vec![
            (ChildSlot::AssignTarget, target.as_ref()),
            (ChildSlot::AssignValue, value.as_ref()),
        ],
        Expr::Lambda { body, .. } => match body {
            LambdaBody::Expr(body) => vec![(ChildSlot::LambdaBody, body.as_ref())],
            LambdaBody::Block(_) => Vec::new(),
        },
    }
}

/// Pre-order walk over every expression, descending into lambda blocks.
pub fn walk_expr<'a>(expr: &'a Node<Expr>, f: &mut dyn FnMut(&'a Node<Expr>)) {
    f(expr);
    if let Expr::Lambda {
        body: LambdaBody::Block(block),
        ..
    } = expr.as_ref()
    {
        walk_block(block, f);
    }
    for (_, child) in children(expr.as_ref()) {
        walk_expr(child, f);
    }
}

pub fn walk_block<'a>(block: &'a Node<Block>, f: &mut dyn FnMut(&'a Node<Expr>)) {
    for stmt in &block.as_ref().statements {
        walk_stmt(stmt, f);
    }
}

/// Visit every expression reachable from a statement.
pub fn walk_stmt<'a>(stmt: &'a Node<Stmt>, f: &mut dyn FnMut(&'a Node<Expr>)) {
    match stmt.as_ref() {
        Stmt::Expr(expr) | Stmt::Throw(expr) => walk_expr(expr, f),
        Stmt::Return(expr) => {
            if let Some(expr) = expr {
                walk_expr(expr, f);
            }
        }
        Stmt::Delegate { args, .. } => {
            for arg in args {
                walk_expr(arg, f);
            }
        }
        Stmt::Local { init, .. } => {
            if let Some(init) = init {
                walk_expr(init, f);
            }
        }
        Stmt::Block(block) => walk_block(block, f),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_expr(cond, f);
            walk_stmt(then_branch, f);
            if let Some(else_branch) = else_branch {
                walk_stmt(else_branch, f);
            }
        }
        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            walk_expr(cond, f);
            walk_stmt(body, f);
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
        } => {
            for stmt in init {
                walk_stmt(stmt, f);
            }
            if let Some(cond) = cond {
                walk_expr(cond, f);
            }
            for expr in update {
                walk_expr(expr, f);
            }
            walk_stmt(body, f);
        }
        Stmt::ForEach { iterable, body, .. } => {
            walk_expr(iterable, f);
            walk_stmt(body, f);
        }
        Stmt::Try {
            resources,
            body,
            catches,
            finally,
        } => {
            for resource in resources {
                walk_stmt(resource, f);
            }
            walk_block(body, f);
            for catch in catches {
                walk_block(&catch.as_ref().body, f);
            }
            if let Some(finally) = finally {
                walk_block(finally, f);
            }
        }
        Stmt::Break | Stmt::Continue | Stmt::Empty => {}
    }
}

/// Bottom-up rewrite: children are folded first, then `f` sees the rebuilt
/// node. Lambda block bodies are folded too.
pub fn fold_expr(expr: Node<Expr>, f: &mut dyn FnMut(Node<Expr>) -> Node<Expr>) -> Node<Expr> {
    let (value, span) = expr.into_parts();
    let rebuilt = match value {
        leaf @ (Expr::Literal(_) | Expr::Name(_) | Expr::This | Expr::Super | Expr::Placeholder(_)) => {
            leaf
        }
        Expr::Field { target, name } => Expr::Field {
            target: fold_box(target, f),
            name,
        },
        Expr::MethodRef { target, name } => Expr::MethodRef {
            target: fold_box(target, f),
            name,
        },
        Expr::Call { target, name, args } => Expr::Call {
            target: target.map(|target| fold_box(target, f)),
            name,
            args: fold_all(args, f),
        },
        Expr::New { ty, args } => Expr::New {
            ty,
            args: fold_all(args, f),
        },
        Expr::NewArray {
            element,
            dims,
            extra_dims,
            init,
        } => Expr::NewArray {
            element,
            dims: fold_all(dims, f),
            extra_dims,
            init: init.map(|items| fold_all(items, f)),
        },
        Expr::Index { target, index } => Expr::Index {
            target: fold_box(target, f),
            index: fold_box(index, f),
        },
        Expr::Unary { op, expr } => Expr::Unary {
            op,
            expr: fold_box(expr, f),
        },
        Expr::Postfix { op, expr } => Expr::Postfix {
            op,
            expr: fold_box(expr, f),
        },
        Expr::Cast { ty, expr } => Expr::Cast {
            ty,
            expr: fold_box(expr, f),
        },
        Expr::InstanceOf { expr, ty } => Expr::InstanceOf {
            expr: fold_box(expr, f),
            ty,
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op,
            left: fold_box(left, f),
            right: fold_box(right, f),
        },
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => Expr::Conditional {
            cond: fold_box(cond, f),
            then_expr: fold_box(then_expr, f),
            else_expr: fold_box(else_expr, f),
        },
        Expr::Assign { op, target, value } => Expr::Assign {
            op,
            target: fold_box(target, f),
            value: fold_box(value, f),
        },
        Expr::Lambda { params, body } => Expr::Lambda {
            params,
            body: match body {
                LambdaBody::Expr(body) => LambdaBody::Expr(fold_box(body, f)),
                LambdaBody::Block(block) => LambdaBody::Block(fold_block(block, f)),
            },
        },
    };
    f(Node::new(rebuilt, span))
}

fn fold_box(
    child: Box<Node<Expr>>,
    f: &mut dyn FnMut(Node<Expr>) -> Node<Expr>,
) -> Box<Node<Expr>> {
    Box::new(fold_expr(*child, f))
}

fn fold_inner(
    stmt: Box<Node<Stmt>>,
    f: &mut dyn FnMut(Node<Expr>) -> Node<Expr>,
) -> Box<Node<Stmt>> {
    Box::new(fold_stmt(*stmt, f))
}

fn fold_all(
    exprs: Vec<Node<Expr>>,
    f: &mut dyn FnMut(Node<Expr>) -> Node<Expr>,
) -> Vec<Node<Expr>> {
    exprs.into_iter().map(|expr| fold_expr(expr, f)).collect()
}

pub fn fold_block(
    block: Node<Block>,
    f: &mut dyn FnMut(Node<Expr>) -> Node<Expr>,
) -> Node<Block> {
    block.map(|block| {
        Block::new(
            block
                .statements
                .into_iter()
                .map(|stmt| fold_stmt(stmt, f))
                .collect(),
        )
    })
}

pub fn fold_stmt(stmt: Node<Stmt>, f: &mut dyn FnMut(Node<Expr>) -> Node<Expr>) -> Node<Stmt> {
    let (value, span) = stmt.into_parts();
    let rebuilt = match value {
        Stmt::Expr(expr) => Stmt::Expr(fold_expr(expr, f)),
        Stmt::Throw(expr) => Stmt::Throw(fold_expr(expr, f)),
        Stmt::Return(expr) => Stmt::Return(expr.map(|expr| fold_expr(expr, f))),
        Stmt::Delegate { kind, args } => Stmt::Delegate {
            kind,
            args: fold_all(args, f),
        },
        Stmt::Local { ty, name, init } => Stmt::Local {
            ty,
            name,
            init: init.map(|init| fold_expr(init, f)),
        },
        Stmt::Block(block) => Stmt::Block(fold_block(block, f)),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => Stmt::If {
            cond: fold_expr(cond, f),
            then_branch: fold_inner(then_branch, f),
            else_branch: else_branch.map(|branch| fold_inner(branch, f)),
        },
        Stmt::While { cond, body } => Stmt::While {
            cond: fold_expr(cond, f),
            body: fold_inner(body, f),
        },
        Stmt::DoWhile { body, cond } => Stmt::DoWhile {
            body: fold_inner(body, f),
            cond: fold_expr(cond, f),
        },
        Stmt::For {
            init,
            cond,
            update,
            body,
        } => Stmt::For {
            init: init.into_iter().map(|stmt| fold_stmt(stmt, f)).collect(),
            cond: cond.map(|cond| fold_expr(cond, f)),
            update: fold_all(update, f),
            body: fold_inner(body, f),
        },
        Stmt::ForEach {
            ty,
            name,
            iterable,
            body,
        } => Stmt::ForEach {
            ty,
            name,
            iterable: fold_expr(iterable, f),
            body: fold_inner(body, f),
        },
        Stmt::Try {
            resources,
            body,
            catches,
            finally,
        } => Stmt::Try {
            resources: resources
                .into_iter()
                .map(|stmt| fold_stmt(stmt, f))
                .collect(),
            body: fold_block(body, f),
            catches: catches
                .into_iter()
                .map(|catch| {
                    catch.map(|mut clause| {
                        clause.body = fold_block(clause.body, f);
                        clause
                    })
                })
                .collect(),
            finally: finally.map(|block| fold_block(block, f)),
        },
        other @ (Stmt::Break | Stmt::Continue | Stmt::Empty) => other,
    };
    Node::new(rebuilt, span)
}

/// Every simple name read anywhere in the expression (used for capture checks).
pub fn free_names(expr: &Node<Expr>) -> Vec<String> {
    let mut names = Vec::new();
    walk_expr(expr, &mut |node| {
        if let Expr::Name(name) = node.as_ref() {
            let head = name.split('.').next().unwrap_or(name);
            names.push(head.to_string());
        }
    });
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{BinaryOp, Literal};
    use inliner_span::Span;

    fn node(expr: Expr) -> Node<Expr> {
        Node::new(expr, Span::default())
    }

    #[test]
    fn fold_replaces_leaves_bottom_up() {
        let expr = node(Expr::Binary {
            op: BinaryOp::Add,
            left: Box::new(node(Expr::Name("x".into()))),
            right: Box::new(node(Expr::Literal(Literal::Number("1".into())))),
        });
        let folded = fold_expr(expr, &mut |n| match n.as_ref() {
            Expr::Name(_) => node(Expr::Literal(Literal::Number("2".into()))),
            _ => n,
        });
        let Expr::Binary { left, .. } = folded.as_ref() else {
            unreachable!("fold keeps the binary root");
        };
        assert_eq!(
            left.as_ref().as_ref(),
            &Expr::Literal(Literal::Number("2".into()))
        );
    }

    #[test]
    fn walk_reaches_call_arguments() {
        let call = node(Expr::call(
            Some(node(Expr::This)),
            "after",
            vec![node(Expr::Name("value".into()))],
        ));
        assert_eq!(free_names(&call), vec!["value".to_string()]);
    }
}
