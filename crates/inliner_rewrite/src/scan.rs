//! Finding the call sites of templated declarations in a parsed file.

use inliner_ast::chain::CallChain;
use inliner_ast::nodes::{Block, DelegationKind, Expr, LambdaBody, Member, Node, Stmt, TypeDecl};
use inliner_ast::precedence::{ChildSlot, Precedence, required_precedence};
use inliner_ast::visit::children;
use inliner_span::{FileId, Span};
use inliner_symbol::{DeclId, ResolutionContext, SourceFile, SymbolService, named_type, resolve_call, type_of};
use inliner_template::TemplateRegistry;
use tracing::trace;

use crate::call_site::{CallKind, CallSite, ChainLink, Position, SyntacticContext};

/// What the parent of an expression expects from it.
#[derive(Clone, Copy)]
struct Slot<'e> {
    context: SyntacticContext,
    statement: Option<Span>,
    sole_body: bool,
    /// Outermost expression of the member chain this expression is a
    /// receiver in.
    chain_root: Option<&'e Node<Expr>>,
}

impl Slot<'_> {
    fn value(required: Precedence, position: Position) -> Self {
        Self {
            context: SyntacticContext::new(required, position),
            statement: None,
            sole_body: false,
            chain_root: None,
        }
    }

    fn operand() -> Self {
        Self::value(Precedence::Assignment, Position::Operand)
    }

    fn statement(span: Option<Span>) -> Self {
        Self {
            context: SyntacticContext::statement(),
            statement: span,
            sole_body: false,
            chain_root: None,
        }
    }
}

/// Where a statement sits in its parent.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Place {
    Block,
    /// Unbraced body of `if`, `else`, a loop or `do`.
    Body,
    /// `for` initializer or `try` resource; never removable.
    Header,
}

struct Scanner<'a> {
    service: &'a dyn SymbolService,
    registry: &'a TemplateRegistry,
    file: FileId,
    ty: Option<&'a TypeDecl>,
    sites: Vec<CallSite>,
}

/// Every call, `new`, delegation and method reference in `source` whose
/// target owns a template in `registry`, in source order.
pub fn scan_file(
    service: &dyn SymbolService,
    registry: &TemplateRegistry,
    file: FileId,
    source: &SourceFile,
) -> Vec<CallSite> {
    let mut scanner = Scanner {
        service,
        registry,
        file,
        ty: None,
        sites: Vec::new(),
    };
    for ty in &source.unit.types {
        scanner.ty = Some(ty.as_ref());
        for member in &ty.as_ref().members {
            match member {
                Member::Field(field) => {
                    if let Some(init) = &field.as_ref().init {
                        scanner.visit_expr(init, Slot::value(Precedence::Assignment, Position::AssignedValue));
                    }
                }
                Member::Method(method) => {
                    if let Some(body) = &method.as_ref().body {
                        scanner.visit_block(body);
                    }
                }
            }
        }
    }
    let mut sites = scanner.sites;
    sites.sort_by_key(|site| (site.span.start(), site.span.end()));
    trace!(path = %source.path, sites = sites.len(), "scanned file");
    sites
}

impl<'a> Scanner<'a> {
    fn cx(&self, span: Span) -> ResolutionContext {
        ResolutionContext::at(self.file, span)
    }

    /// A declaration's own body never counts as a call site of itself.
    fn is_own_body(&self, callee: DeclId, span: Span) -> bool {
        self.service
            .declaration(callee)
            .is_some_and(|decl| decl.file == self.file && decl.span.encloses(&span))
    }

    fn push(&mut self, callee: DeclId, kind: CallKind, receiver: Option<Node<Expr>>, args: Vec<Node<Expr>>, span: Span, slot: &Slot<'_>) {
        if !self.registry.contains(callee) || self.is_own_body(callee, span) {
            return;
        }
        let receiver_text = receiver.as_ref().and_then(|receiver| {
            self.service
                .source_text(self.file, *receiver.span())
                .map(ToString::to_string)
        });
        let chain = slot.chain_root.and_then(|root| {
            let chain = CallChain::flatten(root);
            let segment = chain.position_of(span)?;
            Some(ChainLink { chain, segment })
        });
        self.sites.push(CallSite {
            callee,
            kind,
            receiver,
            receiver_text,
            args,
            context: slot.context,
            file: self.file,
            enclosing_type: self.service.enclosing_type(&self.cx(span)),
            span,
            statement_span: slot.statement,
            sole_body: slot.sole_body,
            chain,
        });
    }

    /// A method reference is only a site when the name is not overloaded.
    fn method_ref_target(&self, target: &Node<Expr>, name: &str, span: Span) -> Option<DeclId> {
        let owner = type_of(self.service, &self.cx(span), target.as_ref())?;
        match self.service.methods_named(owner.decl, name).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    fn consider(&mut self, node: &Node<Expr>, slot: &Slot<'_>) {
        let span = *node.span();
        match node.as_ref() {
            Expr::Call { target, args, .. } => {
                if let Some(callee) = resolve_call(self.service, &self.cx(span), node.as_ref()) {
                    let receiver = target.as_deref().cloned();
                    self.push(callee, CallKind::Method, receiver, args.clone(), span, slot);
                }
            }
            Expr::New { ty, args } => {
                if let Some(callee) = resolve_call(self.service, &self.cx(span), node.as_ref()) {
                    self.push(callee, CallKind::New(ty.clone()), None, args.clone(), span, slot);
                }
            }
            Expr::MethodRef { target, name } => {
                if let Some(callee) = self.method_ref_target(target, name, span) {
                    let receiver = Some(target.as_ref().clone());
                    self.push(callee, CallKind::MethodRef, receiver, Vec::new(), span, slot);
                }
            }
            _ => {}
        }
    }

    fn visit_expr(&mut self, node: &'a Node<Expr>, slot: Slot<'a>) {
        self.consider(node, &slot);
        if let Expr::Lambda {
            body: LambdaBody::Block(block),
            ..
        } = node.as_ref()
        {
            self.visit_block(block);
        }
        for (child_slot, child) in children(node.as_ref()) {
            let required = required_precedence(node.as_ref(), child_slot);
            let expected = match (node.as_ref(), child_slot) {
                (Expr::Call { .. } | Expr::Field { .. }, ChildSlot::Receiver) => Slot {
                    context: SyntacticContext::new(required, Position::ChainReceiver),
                    statement: None,
                    sole_body: false,
                    chain_root: Some(slot.chain_root.unwrap_or(node)),
                },
                (Expr::Lambda { .. }, ChildSlot::LambdaBody) => Slot::value(required, Position::LambdaBody),
                (Expr::Assign { .. }, ChildSlot::AssignValue) => Slot::value(required, Position::AssignedValue),
                _ => Slot::value(required, Position::Operand),
            };
            self.visit_expr(child, expected);
        }
    }

    fn visit_block(&mut self, block: &'a Node<Block>) {
        for stmt in &block.as_ref().statements {
            self.visit_stmt(stmt, Place::Block);
        }
    }

    fn delegation_target(&self, kind: DelegationKind, arity: usize, span: Span) -> Option<DeclId> {
        let cx = self.cx(span);
        let owner = match kind {
            DelegationKind::This => self.service.enclosing_type(&cx)?,
            DelegationKind::Super => {
                let ty = self.ty.filter(|ty| !ty.is_interface())?;
                let parent = ty.extends.first()?;
                named_type(self.service, &cx, &parent.as_ref().name)?
            }
        };
        self.service.constructor(owner, arity)
    }

    fn visit_stmt(&mut self, stmt: &'a Node<Stmt>, place: Place) {
        let span = *stmt.span();
        match stmt.as_ref() {
            Stmt::Expr(expr) => {
                let slot = match place {
                    Place::Block => Slot::statement(Some(span)),
                    Place::Body => Slot {
                        sole_body: true,
                        ..Slot::statement(Some(span))
                    },
                    Place::Header => Slot::statement(None),
                };
                self.visit_expr(expr, slot);
            }
            Stmt::Return(expr) => {
                if let Some(expr) = expr {
                    self.visit_expr(expr, Slot::operand());
                }
            }
            Stmt::Throw(expr) => self.visit_expr(expr, Slot::operand()),
            Stmt::Delegate { kind, args } => {
                if let Some(callee) = self.delegation_target(*kind, args.len(), span) {
                    self.push(
                        callee,
                        CallKind::Delegation(*kind),
                        None,
                        args.clone(),
                        span,
                        &Slot::statement(Some(span)),
                    );
                }
                for arg in args {
                    self.visit_expr(arg, Slot::operand());
                }
            }
            Stmt::Local { init, .. } => {
                if let Some(init) = init {
                    self.visit_expr(init, Slot::value(Precedence::Assignment, Position::AssignedValue));
                }
            }
            Stmt::Block(block) => self.visit_block(block),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(cond, Slot::operand());
                self.visit_stmt(then_branch, Place::Body);
                if let Some(else_branch) = else_branch {
                    self.visit_stmt(else_branch, Place::Body);
                }
            }
            Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
                self.visit_expr(cond, Slot::operand());
                self.visit_stmt(body, Place::Body);
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                for stmt in init {
                    self.visit_stmt(stmt, Place::Header);
                }
                if let Some(cond) = cond {
                    self.visit_expr(cond, Slot::operand());
                }
                // Update expressions are statements without a deletable span.
                for expr in update {
                    self.visit_expr(expr, Slot::statement(None));
                }
                self.visit_stmt(body, Place::Body);
            }
            Stmt::ForEach { iterable, body, .. } => {
                self.visit_expr(iterable, Slot::operand());
                self.visit_stmt(body, Place::Body);
            }
            Stmt::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                for resource in resources {
                    self.visit_stmt(resource, Place::Header);
                }
                self.visit_block(body);
                for catch in catches {
                    self.visit_block(&catch.as_ref().body);
                }
                if let Some(finally) = finally {
                    self.visit_block(finally);
                }
            }
            Stmt::Break | Stmt::Continue | Stmt::Empty => {}
        }
    }
}
