use inliner_ast::chain::CallChain;
use inliner_ast::nodes::{DelegationKind, Expr, Node, Type};
use inliner_ast::precedence::Precedence;
use inliner_span::{FileId, Span};
use inliner_symbol::{DeclId, ResolutionContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    Method,
    /// `new T(...)`, with the type as written.
    New(Node<Type>),
    /// `this(...)` / `super(...)` as the first statement of a constructor.
    Delegation(DelegationKind),
    /// `recv::name`
    MethodRef,
}

/// Where the call sits in the surrounding code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// The whole expression statement.
    Statement,
    /// Receiver of a further member access: `call().next()`.
    ChainReceiver,
    /// Right-hand side of an assignment or a local initializer.
    AssignedValue,
    /// Expression body of a lambda, which may have to be a statement
    /// expression when the lambda returns nothing.
    LambdaBody,
    /// Any other value position.
    Operand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntacticContext {
    /// Loosest precedence the call's slot accepts without parentheses.
    pub required: Precedence,
    pub position: Position,
}

impl SyntacticContext {
    pub fn new(required: Precedence, position: Position) -> Self {
        Self { required, position }
    }

    pub fn statement() -> Self {
        Self::new(Precedence::Assignment, Position::Statement)
    }
}

/// The fluent chain a call is part of, and which segment the call is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    pub chain: CallChain,
    pub segment: usize,
}

impl ChainLink {
    /// Text that disappears when the call is dropped from the chain.
    pub fn removal_span(&self) -> Option<Span> {
        self.chain.removal_span(self.segment)
    }
}

/// One invocation of a declaration that owns a trusted template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub callee: DeclId,
    pub kind: CallKind,
    /// Explicit receiver; `None` for an unqualified call, `new` and
    /// delegations.
    pub receiver: Option<Node<Expr>>,
    /// Receiver as written in the source.
    pub receiver_text: Option<String>,
    pub args: Vec<Node<Expr>>,
    pub context: SyntacticContext,
    pub file: FileId,
    pub enclosing_type: Option<DeclId>,
    pub span: Span,
    /// Span of the enclosing expression statement, when the call is one.
    pub statement_span: Option<Span>,
    /// The statement is the unbraced body of `if`, `else`, a loop or `do`,
    /// so it cannot be removed outright.
    pub sole_body: bool,
    pub chain: Option<ChainLink>,
}

impl CallSite {
    pub fn cx(&self) -> ResolutionContext {
        ResolutionContext::at(self.file, self.span)
    }

    pub fn is_qualified(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn position(&self) -> Position {
        self.context.position
    }
}
