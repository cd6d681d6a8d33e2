//! Operator precedence of the target language and the precedence each child
//! slot of an expression requires.
//!
//! The printer and the call-site scanner share [`required_precedence`], so the
//! decision "does this operand need parentheses here" is made in one place and
//! keyed only on (parent operator, child slot).

use crate::nodes::{BinaryOp, Expr};

/// Binding strength, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    /// Assignment and lambda, also any slot that accepts a full expression.
    Assignment,
    Conditional,
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equality,
    Relational,
    Shift,
    Additive,
    Multiplicative,
    Unary,
    Postfix,
    Primary,
}

impl Precedence {
    /// The next tighter level; `Primary` is its own successor.
    pub fn tighter(self) -> Precedence {
        match self {
            Precedence::Assignment => Precedence::Conditional,
            Precedence::Conditional => Precedence::LogicalOr,
            Precedence::LogicalOr => Precedence::LogicalAnd,
            Precedence::LogicalAnd => Precedence::BitOr,
            Precedence::BitOr => Precedence::BitXor,
            Precedence::BitXor => Precedence::BitAnd,
            Precedence::BitAnd => Precedence::Equality,
            Precedence::Equality => Precedence::Relational,
            Precedence::Relational => Precedence::Shift,
            Precedence::Shift => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Unary,
            Precedence::Unary => Precedence::Postfix,
            Precedence::Postfix | Precedence::Primary => Precedence::Primary,
        }
    }
}

impl BinaryOp {
    pub fn precedence(self) -> Precedence {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => Precedence::Multiplicative,
            BinaryOp::Add | BinaryOp::Sub => Precedence::Additive,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => Precedence::Shift,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => Precedence::Relational,
            BinaryOp::Eq | BinaryOp::Ne => Precedence::Equality,
            BinaryOp::BitAnd => Precedence::BitAnd,
            BinaryOp::BitXor => Precedence::BitXor,
            BinaryOp::BitOr => Precedence::BitOr,
            BinaryOp::And => Precedence::LogicalAnd,
            BinaryOp::Or => Precedence::LogicalOr,
        }
    }
}

impl Expr {
    /// Effective precedence of this expression's root operator.
    pub fn precedence(&self) -> Precedence {
        match self {
            Expr::Literal(_)
            | Expr::Name(_)
            | Expr::This
            | Expr::Super
            | Expr::Field { .. }
            | Expr::Call { .. }
            | Expr::New { .. }
            | Expr::Index { .. }
            | Expr::MethodRef { .. }
            | Expr::Placeholder(_) => Precedence::Primary,
            // `new int[n][0]` would read as a second dimension.
            Expr::NewArray { .. } | Expr::Postfix { .. } => Precedence::Postfix,
            Expr::Unary { .. } | Expr::Cast { .. } => Precedence::Unary,
            Expr::Binary { op, .. } => op.precedence(),
            Expr::InstanceOf { .. } => Precedence::Relational,
            Expr::Conditional { .. } => Precedence::Conditional,
            Expr::Assign { .. } | Expr::Lambda { .. } => Precedence::Assignment,
        }
    }
}

/// Position of a child expression inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildSlot {
    Left,
    Right,
    Operand,
    Condition,
    Then,
    Else,
    AssignTarget,
    AssignValue,
    LambdaBody,
    /// Target of `.field`, `.method()`, `[i]` or `::name`.
    Receiver,
    Argument,
    Index,
}

/// Minimum precedence a child in `slot` of `parent` must have to be printed
/// without parentheses.
pub fn required_precedence(parent: &Expr, slot: ChildSlot) -> Precedence {
    match (parent, slot) {
        (Expr::Binary { op, .. }, ChildSlot::Left) => op.precedence(),
        // Left-associative: an equal-precedence right operand keeps its
        // parentheses (`a - (b - c)`, `"x" + (1 + 2)`).
        (Expr::Binary { op, .. }, ChildSlot::Right) => op.precedence().tighter(),
        (Expr::Conditional { .. }, ChildSlot::Condition) => Precedence::LogicalOr,
        (Expr::Conditional { .. }, ChildSlot::Then) => Precedence::Assignment,
        (Expr::Conditional { .. }, ChildSlot::Else) => Precedence::Conditional,
        (Expr::Assign { .. }, ChildSlot::AssignTarget) => Precedence::Postfix,
        (Expr::Assign { .. }, ChildSlot::AssignValue) => Precedence::Assignment,
        (Expr::Unary { .. } | Expr::Cast { .. }, ChildSlot::Operand) => Precedence::Unary,
        (Expr::Postfix { .. }, ChildSlot::Operand) => Precedence::Primary,
        (Expr::InstanceOf { .. }, ChildSlot::Operand) => Precedence::Relational,
        (_, ChildSlot::Receiver) => Precedence::Primary,
        (_, ChildSlot::Argument | ChildSlot::Index | ChildSlot::LambdaBody) => {
            Precedence::Assignment
        }
        _ => Precedence::Assignment,
    }
}

/// True when `child` printed in `slot` of `parent` needs parentheses.
pub fn needs_parens(parent: &Expr, slot: ChildSlot, child: &Expr) -> bool {
    child.precedence() < required_precedence(parent, slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Literal, Node};
    use inliner_span::Span;

    fn boxed(expr: Expr) -> Box<Node<Expr>> {
        Box::new(Node::new(expr, Span::default()))
    }

    fn binary(op: BinaryOp) -> Expr {
        Expr::Binary {
            op,
            left: boxed(Expr::Name("a".into())),
            right: boxed(Expr::Name("b".into())),
        }
    }

    #[test]
    fn additive_operand_of_multiplication_needs_parens() {
        let parent = binary(BinaryOp::Mul);
        assert!(needs_parens(&parent, ChildSlot::Left, &binary(BinaryOp::Add)));
        assert!(!needs_parens(&parent, ChildSlot::Left, &binary(BinaryOp::Div)));
    }

    #[test]
    fn right_operand_of_same_level_keeps_parens() {
        let parent = binary(BinaryOp::Sub);
        assert!(needs_parens(&parent, ChildSlot::Right, &binary(BinaryOp::Add)));
        assert!(!needs_parens(&parent, ChildSlot::Left, &binary(BinaryOp::Add)));
    }

    #[test]
    fn receivers_require_primary() {
        let call = Expr::call(None, "repeat", vec![]);
        assert!(needs_parens(&call, ChildSlot::Receiver, &binary(BinaryOp::Add)));
        assert!(!needs_parens(
            &call,
            ChildSlot::Receiver,
            &Expr::Literal(Literal::String("\"b\"".into()))
        ));
    }

    #[test]
    fn conditional_branches() {
        let parent = Expr::Conditional {
            cond: boxed(Expr::Name("c".into())),
            then_expr: boxed(Expr::Name("t".into())),
            else_expr: boxed(Expr::Name("e".into())),
        };
        let nested = parent.clone();
        assert!(needs_parens(&parent, ChildSlot::Condition, &nested));
        assert!(!needs_parens(&parent, ChildSlot::Else, &nested));
    }
}
