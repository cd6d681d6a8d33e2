//! Precedence-aware source printer.
//!
//! The AST does not keep parentheses. Every child is printed through
//! [`Printer::write_child`], which asks [`needs_parens`] whether the child's
//! root operator binds loosely enough to need them in that slot.

use inliner_ast::nodes::{
    Block, Expr, LambdaBody, Literal, Node, Placeholder, Stmt, Type, UnaryOp,
};
use inliner_ast::precedence::{ChildSlot, Precedence, needs_parens};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintOptions {
    /// Print implicit receivers as `this.`; the canonical form of a template.
    pub explicit_receiver: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Printer {
    options: PrintOptions,
}

pub fn print_expr(expr: &Expr) -> String {
    Printer::default().print_expr(expr)
}

pub fn print_stmt(stmt: &Stmt) -> String {
    Printer::default().print_stmt(stmt)
}

pub fn print_type(ty: &Type) -> String {
    let mut out = String::new();
    write_type(&mut out, ty);
    out
}

impl Printer {
    pub fn new(options: PrintOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> PrintOptions {
        self.options
    }

    pub fn print_expr(&self, expr: &Expr) -> String {
        let mut out = String::new();
        self.write_expr(&mut out, expr);
        out
    }

    /// Print `expr` for a slot that requires at least `required`.
    pub fn print_expr_in(&self, expr: &Expr, required: Precedence) -> String {
        let mut out = String::new();
        if expr.precedence() < required {
            out.push('(');
            self.write_expr(&mut out, expr);
            out.push(')');
        } else {
            self.write_expr(&mut out, expr);
        }
        out
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        let mut out = String::new();
        self.write_stmt(&mut out, stmt);
        out
    }

    pub fn print_args(&self, args: &[Node<Expr>]) -> String {
        let mut out = String::new();
        self.write_args(&mut out, args);
        out
    }

    fn write_child(&self, out: &mut String, parent: &Expr, slot: ChildSlot, child: &Expr) {
        if needs_parens(parent, slot, child) {
            out.push('(');
            self.write_expr(out, child);
            out.push(')');
        } else {
            self.write_expr(out, child);
        }
    }

    fn write_args(&self, out: &mut String, args: &[Node<Expr>]) {
        out.push('(');
        for (index, arg) in args.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            // Arguments accept any expression; a comma can never be captured.
            self.write_expr(out, arg.as_ref());
        }
        out.push(')');
    }

    /// Receiver plus `.`; nothing for an implicit receiver unless the
    /// canonical form was requested.
    fn write_qualifier(&self, out: &mut String, parent: &Expr, target: &Expr) {
        if target.is_implicit_receiver() {
            if self.options.explicit_receiver {
                out.push_str("this.");
            }
            return;
        }
        self.write_child(out, parent, ChildSlot::Receiver, target);
        out.push('.');
    }

    pub fn write_expr(&self, out: &mut String, expr: &Expr) {
        match expr {
            Expr::Literal(literal) => write_literal(out, literal),
            Expr::Name(name) => out.push_str(name),
            Expr::This => out.push_str("this"),
            Expr::Super => out.push_str("super"),
            Expr::Placeholder(Placeholder::Param { name, .. }) => out.push_str(name),
            Expr::Placeholder(Placeholder::Receiver { .. }) => out.push_str("this"),
            Expr::Field { target, name } => {
                self.write_qualifier(out, expr, target.as_ref().as_ref());
                out.push_str(name);
            }
            Expr::Call { target, name, args } => {
                if let Some(target) = target {
                    self.write_qualifier(out, expr, target.as_ref().as_ref());
                }
                out.push_str(name);
                self.write_args(out, args);
            }
            Expr::New { ty, args } => {
                out.push_str("new ");
                write_type(out, ty.as_ref());
                self.write_args(out, args);
            }
            Expr::NewArray {
                element,
                dims,
                extra_dims,
                init,
            } => {
                out.push_str("new ");
                write_type(out, element.as_ref());
                for dim in dims {
                    out.push('[');
                    self.write_expr(out, dim.as_ref());
                    out.push(']');
                }
                for _ in 0..*extra_dims {
                    out.push_str("[]");
                }
                if let Some(items) = init {
                    out.push_str(" {");
                    for (index, item) in items.iter().enumerate() {
                        if index > 0 {
                            out.push_str(", ");
                        }
                        self.write_expr(out, item.as_ref());
                    }
                    out.push('}');
                }
            }
            Expr::Index { target, index } => {
                self.write_child(out, expr, ChildSlot::Receiver, target.as_ref().as_ref());
                out.push('[');
                self.write_expr(out, index.as_ref().as_ref());
                out.push(']');
            }
            Expr::Unary { op, expr: operand } => {
                out.push_str(op.symbol());
                let mut inner = String::new();
                self.write_child(&mut inner, expr, ChildSlot::Operand, operand.as_ref().as_ref());
                // `- -x`, `+ +x`: keep the signs from fusing into `--`/`++`.
                let sign = op.symbol().chars().last();
                if sign.is_some() && inner.chars().next() == sign {
                    out.push(' ');
                }
                out.push_str(&inner);
            }
            Expr::Postfix { op, expr: operand } => {
                self.write_child(out, expr, ChildSlot::Operand, operand.as_ref().as_ref());
                out.push_str(op.symbol());
            }
            Expr::Binary { op, left, right } => {
                self.write_child(out, expr, ChildSlot::Left, left.as_ref().as_ref());
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                self.write_child(out, expr, ChildSlot::Right, right.as_ref().as_ref());
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.write_child(out, expr, ChildSlot::Condition, cond.as_ref().as_ref());
                out.push_str(" ? ");
                self.write_child(out, expr, ChildSlot::Then, then_expr.as_ref().as_ref());
                out.push_str(" : ");
                self.write_child(out, expr, ChildSlot::Else, else_expr.as_ref().as_ref());
            }
            Expr::Assign { op, target, value } => {
                self.write_child(out, expr, ChildSlot::AssignTarget, target.as_ref().as_ref());
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                self.write_child(out, expr, ChildSlot::AssignValue, value.as_ref().as_ref());
            }
            Expr::Lambda { params, body } => {
                if params.len() == 1 {
                    out.push_str(params[0].as_ref());
                } else {
                    out.push('(');
                    let names: Vec<&str> = params.iter().map(|p| p.as_ref().as_str()).collect();
                    out.push_str(&names.join(", "));
                    out.push(')');
                }
                out.push_str(" -> ");
                match body {
                    LambdaBody::Expr(body) => {
                        self.write_child(out, expr, ChildSlot::LambdaBody, body.as_ref().as_ref());
                    }
                    LambdaBody::Block(block) => self.write_block(out, block.as_ref()),
                }
            }
            Expr::MethodRef { target, name } => {
                self.write_child(out, expr, ChildSlot::Receiver, target.as_ref().as_ref());
                out.push_str("::");
                out.push_str(name);
            }
            Expr::Cast { ty, expr: operand } => {
                out.push('(');
                write_type(out, ty.as_ref());
                out.push_str(") ");
                let operand = operand.as_ref().as_ref();
                // `(Name) -x` would read back as a subtraction.
                let signed = matches!(
                    operand,
                    Expr::Unary {
                        op: UnaryOp::Neg | UnaryOp::Plus | UnaryOp::PreInc | UnaryOp::PreDec,
                        ..
                    }
                );
                if signed && !ty.as_ref().is_primitive() {
                    out.push('(');
                    self.write_expr(out, operand);
                    out.push(')');
                } else {
                    self.write_child(out, expr, ChildSlot::Operand, operand);
                }
            }
            Expr::InstanceOf { expr: operand, ty } => {
                self.write_child(out, expr, ChildSlot::Operand, operand.as_ref().as_ref());
                out.push_str(" instanceof ");
                write_type(out, ty.as_ref());
            }
        }
    }

    fn write_block(&self, out: &mut String, block: &Block) {
        if block.is_empty() {
            out.push_str("{}");
            return;
        }
        out.push_str("{ ");
        for stmt in &block.statements {
            self.write_stmt(out, stmt.as_ref());
            out.push(' ');
        }
        out.push('}');
    }

    pub fn write_stmt(&self, out: &mut String, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.write_expr(out, expr.as_ref());
                out.push(';');
            }
            Stmt::Return(value) => {
                out.push_str("return");
                if let Some(value) = value {
                    out.push(' ');
                    self.write_expr(out, value.as_ref());
                }
                out.push(';');
            }
            Stmt::Throw(value) => {
                out.push_str("throw ");
                self.write_expr(out, value.as_ref());
                out.push(';');
            }
            Stmt::Delegate { kind, args } => {
                out.push_str(kind.keyword());
                self.write_args(out, args);
                out.push(';');
            }
            Stmt::Local { .. } => {
                self.write_local(out, stmt);
                out.push(';');
            }
            Stmt::Block(block) => self.write_block(out, block.as_ref()),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                out.push_str("if (");
                self.write_expr(out, cond.as_ref());
                out.push_str(") ");
                self.write_stmt(out, then_branch.as_ref().as_ref());
                if let Some(else_branch) = else_branch {
                    out.push_str(" else ");
                    self.write_stmt(out, else_branch.as_ref().as_ref());
                }
            }
            Stmt::While { cond, body } => {
                out.push_str("while (");
                self.write_expr(out, cond.as_ref());
                out.push_str(") ");
                self.write_stmt(out, body.as_ref().as_ref());
            }
            Stmt::DoWhile { body, cond } => {
                out.push_str("do ");
                self.write_stmt(out, body.as_ref().as_ref());
                out.push_str(" while (");
                self.write_expr(out, cond.as_ref());
                out.push_str(");");
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                out.push_str("for (");
                for (index, stmt) in init.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    match stmt.as_ref() {
                        Stmt::Expr(expr) => self.write_expr(out, expr.as_ref()),
                        other => self.write_local(out, other),
                    }
                }
                out.push(';');
                if let Some(cond) = cond {
                    out.push(' ');
                    self.write_expr(out, cond.as_ref());
                }
                out.push(';');
                for (index, expr) in update.iter().enumerate() {
                    out.push_str(if index > 0 { ", " } else { " " });
                    self.write_expr(out, expr.as_ref());
                }
                out.push_str(") ");
                self.write_stmt(out, body.as_ref().as_ref());
            }
            Stmt::ForEach {
                ty,
                name,
                iterable,
                body,
            } => {
                out.push_str("for (");
                write_type(out, ty.as_ref());
                out.push(' ');
                out.push_str(name.as_ref());
                out.push_str(" : ");
                self.write_expr(out, iterable.as_ref());
                out.push_str(") ");
                self.write_stmt(out, body.as_ref().as_ref());
            }
            Stmt::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                out.push_str("try ");
                if !resources.is_empty() {
                    out.push('(');
                    for (index, resource) in resources.iter().enumerate() {
                        if index > 0 {
                            out.push_str("; ");
                        }
                        self.write_local(out, resource.as_ref());
                    }
                    out.push_str(") ");
                }
                self.write_block(out, body.as_ref());
                for catch in catches {
                    let clause = catch.as_ref();
                    out.push_str(" catch (");
                    let types: Vec<String> =
                        clause.types.iter().map(|ty| print_type(ty.as_ref())).collect();
                    out.push_str(&types.join(" | "));
                    out.push(' ');
                    out.push_str(clause.name.as_ref());
                    out.push_str(") ");
                    self.write_block(out, clause.body.as_ref());
                }
                if let Some(finally) = finally {
                    out.push_str(" finally ");
                    self.write_block(out, finally.as_ref());
                }
            }
            Stmt::Break => out.push_str("break;"),
            Stmt::Continue => out.push_str("continue;"),
            Stmt::Empty => out.push(';'),
        }
    }

    /// A local declaration without its terminating `;`.
    fn write_local(&self, out: &mut String, stmt: &Stmt) {
        if let Stmt::Local { ty, name, init } = stmt {
            write_type(out, ty.as_ref());
            out.push(' ');
            out.push_str(name.as_ref());
            if let Some(init) = init {
                out.push_str(" = ");
                self.write_expr(out, init.as_ref());
            }
        }
    }
}

fn write_literal(out: &mut String, literal: &Literal) {
    match literal {
        Literal::Number(raw) | Literal::String(raw) | Literal::Char(raw) => out.push_str(raw),
        Literal::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
        Literal::Null => out.push_str("null"),
    }
}

fn write_type(out: &mut String, ty: &Type) {
    if let Some(keyword) = ty.name.strip_prefix("? ") {
        // Bounded wildcard: `? extends T` / `? super T`.
        out.push_str("? ");
        out.push_str(keyword);
        for bound in &ty.args {
            out.push(' ');
            write_type(out, bound.as_ref());
        }
        return;
    }
    out.push_str(&ty.name);
    if !ty.args.is_empty() {
        out.push('<');
        for (index, arg) in ty.args.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            write_type(out, arg.as_ref());
        }
        out.push('>');
    }
    for _ in 0..ty.dims {
        out.push_str("[]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inliner_ast::nodes::BinaryOp;
    use inliner_parser::parse_expression_source;
    use inliner_span::Span;

    fn round_trip(source: &str) -> String {
        let expr = parse_expression_source(source).expect("parse expression");
        print_expr(expr.as_ref())
    }

    fn boxed(expr: Expr) -> Box<Node<Expr>> {
        Box::new(Node::new(expr, Span::default()))
    }

    #[test]
    fn keeps_required_parentheses_only() {
        assert_eq!(round_trip("(1 + 1) * 2"), "(1 + 1) * 2");
        assert_eq!(round_trip("((a * b)) + c"), "a * b + c");
        assert_eq!(round_trip("a - (b - c)"), "a - (b - c)");
        assert_eq!(round_trip("(a ? b : c).d()"), "(a ? b : c).d()");
    }

    #[test]
    fn parenthesizes_spliced_receiver() {
        let sum = Expr::Binary {
            op: BinaryOp::Add,
            left: boxed(Expr::Name("x".into())),
            right: boxed(Expr::Literal(Literal::String("\"b\"".into()))),
        };
        let call = Expr::Call {
            target: Some(boxed(sum)),
            name: "repeat".into(),
            args: vec![Node::new(Expr::Literal(Literal::Number("10".into())), Span::default())],
        };
        assert_eq!(print_expr(&call), "(x + \"b\").repeat(10)");
    }

    #[test]
    fn implicit_receivers_print_unqualified_unless_canonical() {
        let call = Expr::Call {
            target: Some(boxed(Expr::Placeholder(Placeholder::Receiver { explicit: false }))),
            name: "after".into(),
            args: Vec::new(),
        };
        assert_eq!(print_expr(&call), "after()");
        let canonical = Printer::new(PrintOptions {
            explicit_receiver: true,
        });
        assert_eq!(canonical.print_expr(&call), "this.after()");
    }

    #[test]
    fn unary_signs_do_not_fuse() {
        let inner = Expr::Unary {
            op: UnaryOp::Neg,
            expr: boxed(Expr::Name("x".into())),
        };
        let outer = Expr::Unary {
            op: UnaryOp::Neg,
            expr: boxed(inner),
        };
        assert_eq!(print_expr(&outer), "- -x");
    }

    #[test]
    fn prints_lambdas_casts_and_generics() {
        assert_eq!(round_trip("x -> x + 1"), "x -> x + 1");
        assert_eq!(round_trip("(a, b) -> { return a; }"), "(a, b) -> { return a; }");
        assert_eq!(round_trip("(List<String>) value"), "(List<String>) value");
        assert_eq!(round_trip("new ArrayList<>()"), "new ArrayList<>()");
        assert_eq!(round_trip("Client::before"), "Client::before");
    }

    #[test]
    fn context_precedence_wraps_loose_roots() {
        let expr = parse_expression_source("a + b").expect("parse");
        let printer = Printer::default();
        assert_eq!(printer.print_expr_in(expr.as_ref(), Precedence::Multiplicative), "(a + b)");
        assert_eq!(printer.print_expr_in(expr.as_ref(), Precedence::Assignment), "a + b");
    }
}
