//! Turning one call site into one text edit.

use std::ops::AddAssign;

use inliner_ast::nodes::{Block, DelegationKind, Expr, LambdaBody, Node, Stmt};
use inliner_ast::precedence::Precedence;
use inliner_fmt::{PrintOptions, Printer, print_type};
use inliner_span::{FileId, Span};
use inliner_symbol::{
    Binding, ImportRequirement, ResolutionContext, SourceFile, SymbolService, type_of,
};
use inliner_template::{MethodTemplate, ReceiverPlaceholder, TemplateBody, TemplateRegistry};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::call_site::{CallKind, CallSite, Position};
use crate::edit::{BatchConflict, EditError, TextEdit, apply_edits, normalize};
use crate::elision::elide;
use crate::error::RewriteError;
use crate::imports::{ImportPlan, SiteImports};
use crate::substitution::Substitution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteConfig {
    /// Parenthesize a replacement whose root binds looser than its slot.
    /// Turning this off reproduces the unparenthesized legacy output.
    pub parenthesize_in_context: bool,
    /// Add missing imports; when off, references are fully qualified.
    pub add_imports: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            parenthesize_in_context: true,
            add_imports: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub attempted: usize,
    pub applied: usize,
    pub failed: usize,
    pub elided: usize,
    pub conflicts: usize,
}

impl AddAssign for RewriteStats {
    fn add_assign(&mut self, other: Self) {
        self.attempted += other.attempted;
        self.applied += other.applied;
        self.failed += other.failed;
        self.elided += other.elided;
        self.conflicts += other.conflicts;
    }
}

/// The edit for one site and the imports the file must gain for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRewrite {
    pub edit: TextEdit,
    pub imports: SiteImports,
    pub elided: bool,
}

/// Outcome for one file: either a consistent set of edits or a conflict that
/// leaves the file untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRewrite {
    pub file: FileId,
    pub edits: Vec<TextEdit>,
    pub failures: Vec<(Span, RewriteError)>,
    pub conflict: Option<BatchConflict>,
    pub stats: RewriteStats,
}

impl FileRewrite {
    pub fn is_changed(&self) -> bool {
        !self.edits.is_empty()
    }

    pub fn apply(&self, text: &str) -> Result<String, EditError> {
        apply_edits(text, &self.edits)
    }
}

fn mentions_receiver(body: &TemplateBody) -> bool {
    let mut found = false;
    body.walk(&mut |node| found |= node.as_ref().is_receiver_placeholder());
    found
}

fn has_side_effects(expr: &Node<Expr>) -> bool {
    let mut found = false;
    inliner_ast::visit::walk_expr(expr, &mut |node| found |= node.as_ref().is_effectful());
    found
}

pub struct Rewriter<'a> {
    service: &'a dyn SymbolService,
    registry: &'a TemplateRegistry,
    config: RewriteConfig,
}

impl<'a> Rewriter<'a> {
    pub fn new(
        service: &'a dyn SymbolService,
        registry: &'a TemplateRegistry,
        config: RewriteConfig,
    ) -> Self {
        Self {
            service,
            registry,
            config,
        }
    }

    pub fn config(&self) -> RewriteConfig {
        self.config
    }

    /// Rewrite every site of one file. Sites are independent; a failed site
    /// is reported and skipped. Overlapping edits discard the whole file.
    pub fn rewrite_file(&self, source: &SourceFile, file: FileId, sites: &[CallSite]) -> FileRewrite {
        let mut plan = ImportPlan::new(file, self.config.add_imports);
        let mut stats = RewriteStats::default();
        let mut edits = Vec::new();
        let mut failures = Vec::new();
        for site in sites {
            stats.attempted += 1;
            match self.rewrite_site(site, &plan) {
                Ok(rewrite) => {
                    plan.commit(&rewrite.imports);
                    if rewrite.elided {
                        stats.elided += 1;
                    }
                    stats.applied += 1;
                    edits.push(rewrite.edit);
                }
                Err(error) => {
                    debug!(path = %source.path, span = %site.span, %error, "call site left unchanged");
                    stats.failed += 1;
                    failures.push((site.span, error));
                }
            }
        }
        edits.extend(plan.insertion_edit(&source.unit, &source.text));

        let (edits, conflict) = match normalize(edits) {
            Ok(edits) => (edits, None),
            Err(conflict) => {
                warn!(path = %source.path, %conflict, "discarding all edits of the file");
                stats.conflicts += 1;
                stats.applied = 0;
                stats.elided = 0;
                (Vec::new(), Some(conflict))
            }
        };
        FileRewrite {
            file,
            edits,
            failures,
            conflict,
            stats,
        }
    }

    /// Rewrite one site against the imports already planned for its file.
    pub fn rewrite_site(&self, site: &CallSite, plan: &ImportPlan) -> Result<SiteRewrite, RewriteError> {
        let template = self.registry.get(site.callee).ok_or(RewriteError::NoTemplate)?;
        let printer = Printer::default();
        if let Some(edit) = elide(template, site, &printer) {
            return Ok(SiteRewrite {
                edit,
                imports: SiteImports::default(),
                elided: true,
            });
        }
        match &site.kind {
            CallKind::Method => self.rewrite_call(template, site, plan),
            CallKind::New(_) | CallKind::Delegation(_) => self.rewrite_constructor(template, site, plan),
            CallKind::MethodRef => self.rewrite_method_ref(template, site, plan),
        }
    }

    /// For a static template called without a qualifier from outside its
    /// type, the owner type becomes the receiver and must be importable.
    fn static_owner_receiver(
        &self,
        template: &MethodTemplate,
        site: &CallSite,
    ) -> Option<ImportRequirement> {
        if template.receiver != ReceiverPlaceholder::None
            || site.is_qualified()
            || !mentions_receiver(&template.body)
        {
            return None;
        }
        let inside_owner = site
            .enclosing_type
            .is_some_and(|ty| self.service.is_subtype(ty, template.owner_type));
        (!inside_owner).then(|| ImportRequirement::type_import(template.owner_type_name.clone()))
    }

    fn owner_name_expr(owner: &ImportRequirement, imports: &SiteImports, at: Span) -> Node<Expr> {
        let name = if imports.is_qualified(owner) {
            owner.qualified_name()
        } else {
            owner.simple_name()
        };
        Node::new(Expr::Name(name.to_string()), Span::empty_at(at.start()))
    }

    fn resolve_imports(
        &self,
        template: &MethodTemplate,
        owner: Option<&ImportRequirement>,
        cx: &ResolutionContext,
        plan: &ImportPlan,
    ) -> Result<SiteImports, RewriteError> {
        plan.resolve(
            self.service,
            cx,
            template.required_imports().iter().chain(owner),
        )
    }

    /// Implicit member references print unqualified unless a local at the
    /// site would capture one of them.
    fn printer_for(&self, template: &MethodTemplate, cx: &ResolutionContext, receiver_bound: bool) -> Printer {
        let mut shadowed = false;
        if !receiver_bound {
            template.body.walk(&mut |node| {
                if let Expr::Field { target, name } = node.as_ref()
                    && target.as_ref().as_ref().is_implicit_receiver()
                    && matches!(self.service.resolve_name(cx, name), Some(Binding::Local(_)))
                {
                    shadowed = true;
                }
            });
        }
        Printer::new(PrintOptions {
            explicit_receiver: shadowed,
        })
    }

    fn print_in_context(&self, printer: &Printer, expr: &Expr, required: Precedence) -> String {
        if self.config.parenthesize_in_context {
            printer.print_expr_in(expr, required)
        } else {
            printer.print_expr(expr)
        }
    }

    fn rewrite_call(
        &self,
        template: &MethodTemplate,
        site: &CallSite,
        plan: &ImportPlan,
    ) -> Result<SiteRewrite, RewriteError> {
        if let Some(receiver) = &site.receiver
            && !mentions_receiver(&template.body)
            && has_side_effects(receiver)
        {
            let text = site
                .receiver_text
                .clone()
                .unwrap_or_else(|| Printer::default().print_expr(receiver.as_ref()));
            return Err(RewriteError::DroppedReceiver(text));
        }
        let cx = site.cx();
        let owner = self.static_owner_receiver(template, site);
        let imports = self.resolve_imports(template, owner.as_ref(), &cx, plan)?;
        let receiver = match &owner {
            Some(owner) => Some(Self::owner_name_expr(owner, &imports, site.span)),
            None => site.receiver.clone(),
        };
        let printer = self.printer_for(template, &cx, receiver.is_some());
        let substitution = Substitution::bind(template, &site.args, receiver)?;
        substitution.check_capture(&template.body)?;

        let text = match &template.body {
            TemplateBody::Expr(expr) => {
                let spliced = substitution.splice_expr(&imports.qualify(expr));
                if !spliced.as_ref().is_effectful() {
                    // The target type of a lambda is unknown here, so only
                    // statement expressions are safe as its body.
                    match site.position() {
                        Position::Statement => {
                            return Err(RewriteError::NotAStatement(printer.print_expr(spliced.as_ref())));
                        }
                        Position::LambdaBody => {
                            return Err(RewriteError::ValueLambdaBody(printer.print_expr(spliced.as_ref())));
                        }
                        Position::ChainReceiver | Position::AssignedValue | Position::Operand => {}
                    }
                }
                self.print_in_context(&printer, spliced.as_ref(), site.context.required)
            }
            TemplateBody::Throw(expr) => {
                if site.position() != Position::Statement {
                    return Err(RewriteError::ThrowOutsideStatement);
                }
                let spliced = substitution.splice_expr(&imports.qualify(expr));
                format!("throw {}", printer.print_expr(spliced.as_ref()))
            }
            TemplateBody::Delegation { .. } => {
                return Err(RewriteError::KindMismatch {
                    template: "constructor",
                    site: "a method call",
                });
            }
        };
        debug!(method = %template.owner_name, replacement = %text, "rewrote call");
        Ok(SiteRewrite {
            edit: TextEdit::new(site.file, site.span, text),
            imports,
            elided: false,
        })
    }

    fn rewrite_constructor(
        &self,
        template: &MethodTemplate,
        site: &CallSite,
        plan: &ImportPlan,
    ) -> Result<SiteRewrite, RewriteError> {
        let TemplateBody::Delegation {
            kind: DelegationKind::This,
            args,
        } = &template.body
        else {
            return Err(RewriteError::KindMismatch {
                template: "method",
                site: "a constructor invocation",
            });
        };
        let cx = site.cx();
        let imports = self.resolve_imports(template, None, &cx, plan)?;
        let substitution = Substitution::bind(template, &site.args, None)?;
        substitution.check_capture(&template.body)?;
        let qualified: Vec<Node<Expr>> = args.iter().map(|arg| imports.qualify(arg)).collect();
        let args = substitution.splice_args(&qualified);
        let printer = Printer::default();
        let text = match &site.kind {
            CallKind::New(ty) => format!("new {}{}", print_type(ty.as_ref()), printer.print_args(&args)),
            CallKind::Delegation(kind) => format!("{}{};", kind.keyword(), printer.print_args(&args)),
            CallKind::Method | CallKind::MethodRef => {
                return Err(RewriteError::KindMismatch {
                    template: "constructor",
                    site: "a method call",
                });
            }
        };
        Ok(SiteRewrite {
            edit: TextEdit::new(site.file, site.span, text),
            imports,
            elided: false,
        })
    }

    /// Lambda parameter names that do not clash with anything visible at
    /// the site.
    fn fresh_params(&self, template: &MethodTemplate, cx: &ResolutionContext) -> Vec<String> {
        let mut chosen: Vec<String> = Vec::new();
        for param in &template.parameters {
            let taken = |name: &str, chosen: &[String]| {
                chosen.iter().any(|c| c == name)
                    || matches!(
                        self.service.resolve_name(cx, name),
                        Some(Binding::Local(_) | Binding::Field(_))
                    )
            };
            let mut name = param.clone();
            let mut suffix = 2;
            while taken(&name, &chosen) {
                name = format!("{param}{suffix}");
                suffix += 1;
            }
            chosen.push(name);
        }
        chosen
    }

    fn rewrite_method_ref(
        &self,
        template: &MethodTemplate,
        site: &CallSite,
        plan: &ImportPlan,
    ) -> Result<SiteRewrite, RewriteError> {
        if template.varargs_last {
            return Err(RewriteError::VariadicMethodReference);
        }
        let cx = site.cx();
        let target = site
            .receiver
            .clone()
            .ok_or_else(|| RewriteError::UnboundMethodReference(template.owner_name.clone()))?;
        let printer = Printer::default();
        let target_text = printer.print_expr(target.as_ref());

        if let Some(name) = template.forwarding_target() {
            let text = format!("{target_text}::{name}");
            return Ok(SiteRewrite {
                edit: TextEdit::new(site.file, site.span, text),
                imports: SiteImports::default(),
                elided: false,
            });
        }

        let is_static = template.receiver == ReceiverPlaceholder::None;
        if !is_static {
            let reference = format!("{target_text}::{}", template.owner_name);
            if type_of(self.service, &cx, target.as_ref()).is_some_and(|ty| ty.is_type_ref) {
                return Err(RewriteError::UnboundMethodReference(reference));
            }
            if !target.as_ref().is_simple_reference() {
                return Err(RewriteError::ImpureMethodReference(reference));
            }
        }

        let imports = self.resolve_imports(template, None, &cx, plan)?;
        let params = self.fresh_params(template, &cx);
        let args: Vec<Node<Expr>> = params
            .iter()
            .map(|name| Node::new(Expr::Name(name.clone()), Span::empty_at(site.span.start())))
            .collect();
        let substitution = Substitution::bind(template, &args, Some(target))?;
        substitution.check_capture(&template.body)?;

        let body = match &template.body {
            TemplateBody::Expr(expr) => {
                LambdaBody::Expr(Box::new(substitution.splice_expr(&imports.qualify(expr))))
            }
            TemplateBody::Throw(expr) => {
                let thrown = substitution.splice_expr(&imports.qualify(expr));
                let span = *thrown.span();
                LambdaBody::Block(Node::new(
                    Block::new(vec![Node::new(Stmt::Throw(thrown), span)]),
                    span,
                ))
            }
            TemplateBody::Delegation { .. } => {
                return Err(RewriteError::KindMismatch {
                    template: "constructor",
                    site: "a method reference",
                });
            }
        };
        let lambda = Expr::Lambda {
            params: params
                .into_iter()
                .map(|name| Node::new(name, Span::empty_at(site.span.start())))
                .collect(),
            body,
        };
        let text = self.print_in_context(&printer, &lambda, site.context.required);
        Ok(SiteRewrite {
            edit: TextEdit::new(site.file, site.span, text),
            imports,
            elided: false,
        })
    }
}
