//! Fluent call chains as an ordered list of segments.
//!
//! `a.b().c.d(x)` flattens to head `a` and segments `b()`, `c`, `d(x)`.
//! Removing a no-op call from a chain is then a list operation: drop the
//! segment and let its neighbours join up.

use crate::nodes::{Expr, Node};
use inliner_span::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSegment {
    pub name: String,
    /// `None` for a field access, `Some` for a call.
    pub args: Option<Vec<Node<Expr>>>,
    /// Span of the chain prefix ending with this segment.
    pub span: Span,
}

impl ChainSegment {
    pub fn is_call(&self) -> bool {
        self.args.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallChain {
    /// Innermost receiver; `None` when the first segment is an unqualified call.
    pub head: Option<Node<Expr>>,
    pub segments: Vec<ChainSegment>,
}

impl CallChain {
    /// Split an expression into its receiver head and member segments.
    pub fn flatten(expr: &Node<Expr>) -> CallChain {
        let mut segments = Vec::new();
        let mut current = Some(expr);
        let mut head = None;
        while let Some(node) = current.take() {
            match node.as_ref() {
                Expr::Call { target, name, args } => {
                    segments.push(ChainSegment {
                        name: name.clone(),
                        args: Some(args.clone()),
                        span: *node.span(),
                    });
                    current = target.as_deref();
                }
                Expr::Field { target, name } => {
                    segments.push(ChainSegment {
                        name: name.clone(),
                        args: None,
                        span: *node.span(),
                    });
                    current = Some(target.as_ref());
                }
                _ => head = Some(node.clone()),
            }
        }
        segments.reverse();
        CallChain { head, segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the segment whose prefix span is exactly `span`.
    pub fn position_of(&self, span: Span) -> Option<usize> {
        self.segments.iter().position(|segment| segment.span == span)
    }

    /// Span covered by the receiver of segment `index`, if it has one.
    pub fn receiver_span(&self, index: usize) -> Option<Span> {
        match index.checked_sub(1) {
            Some(previous) => self.segments.get(previous).map(|segment| segment.span),
            None => self.head.as_ref().map(|head| *head.span()),
        }
    }

    /// Text range that disappears when segment `index` is dropped: from the
    /// end of its receiver to the end of the segment (`.noOp()`). For an
    /// unqualified first segment this is the whole segment.
    pub fn removal_span(&self, index: usize) -> Option<Span> {
        let segment = self.segments.get(index)?;
        let start = self
            .receiver_span(index)
            .map_or(segment.span.start(), |receiver| receiver.end());
        Some(Span::new(start, segment.span.end()))
    }

    /// Drop one segment. Dropping an unqualified head call leaves `this` as
    /// the receiver of whatever followed it.
    pub fn drop_segment(mut self, index: usize) -> CallChain {
        if index >= self.segments.len() {
            return self;
        }
        let removed = self.segments.remove(index);
        if index == 0 && self.head.is_none() && !self.segments.is_empty() {
            self.head = Some(Node::new(Expr::This, Span::empty_at(removed.span.start())));
        }
        self
    }

    /// Drop every call segment named `name` taking no arguments.
    pub fn without_calls(self, name: &str) -> CallChain {
        let mut chain = self;
        while let Some(index) = chain.segments.iter().position(|segment| {
            segment.name == name && segment.args.as_ref().is_some_and(Vec::is_empty)
        }) {
            chain = chain.drop_segment(index);
        }
        chain
    }

    /// Rebuild the expression. An empty chain yields its head, or `this`
    /// when even the head is gone.
    pub fn into_expr(self) -> Node<Expr> {
        let mut current = self.head;
        for segment in self.segments {
            let target = current.map(Box::new);
            let expr = match (segment.args, target) {
                (Some(args), target) => Expr::Call {
                    target,
                    name: segment.name,
                    args,
                },
                (None, Some(target)) => Expr::Field {
                    target,
                    name: segment.name,
                },
                (None, None) => Expr::Name(segment.name),
            };
            current = Some(Node::new(expr, segment.span));
        }
        current.unwrap_or_else(|| Node::new(Expr::This, Span::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(expr: Expr, start: usize, end: usize) -> Node<Expr> {
        Node::new(expr, Span::new(start, end))
    }

    /// `client.noOp().bar()` with realistic offsets.
    fn sample() -> Node<Expr> {
        let client = at(Expr::Name("client".into()), 0, 6);
        let no_op = at(Expr::call(Some(client), "noOp", vec![]), 0, 13);
        at(Expr::call(Some(no_op), "bar", vec![]), 0, 19)
    }

    #[test]
    fn flattens_receiver_first() {
        let chain = CallChain::flatten(&sample());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.segments[0].name, "noOp");
        assert_eq!(chain.head.map(Node::into_inner), Some(Expr::Name("client".into())));
    }

    #[test]
    fn removal_span_covers_the_dot_and_call() {
        let chain = CallChain::flatten(&sample());
        assert_eq!(chain.removal_span(0), Some(Span::new(6, 13)));
    }

    #[test]
    fn dropping_a_segment_joins_neighbours() {
        let chain = CallChain::flatten(&sample()).without_calls("noOp");
        let expected = Expr::call(
            Some(Node::new(Expr::Name("client".into()), Span::default())),
            "bar",
            vec![],
        );
        assert_eq!(chain.into_expr().into_inner(), expected);
    }

    #[test]
    fn dropping_unqualified_head_leaves_this() {
        let head = at(Expr::call(None, "noOp", vec![]), 0, 6);
        let outer = at(Expr::call(Some(head), "bar", vec![]), 0, 12);
        let chain = CallChain::flatten(&outer).drop_segment(0);
        let Expr::Call { target, .. } = chain.into_expr().into_inner() else {
            unreachable!("chain still ends in a call");
        };
        assert_eq!(target.map(|t| t.into_inner()), Some(Expr::This));
    }
}
