use std::collections::BTreeSet;
use std::ops::Deref;

use ahash::AHashMap;
use inliner_ast::nodes::{DelegationKind, Expr, Node, Placeholder, Visibility};
use inliner_ast::visit::walk_expr;
use inliner_fmt::{PrintOptions, Printer};
use inliner_symbol::{DeclId, ImportRequirement};
use inliner_span::{FileId, Span};

/// The statement a template stands for, with placeholder leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateBody {
    /// An expression statement, a returned value or an assignment.
    Expr(Node<Expr>),
    Throw(Node<Expr>),
    /// `this(...)` / `super(...)` in a constructor.
    Delegation {
        kind: DelegationKind,
        args: Vec<Node<Expr>>,
    },
}

impl TemplateBody {
    /// Top-level expressions of the body.
    pub fn roots(&self) -> Vec<&Node<Expr>> {
        match self {
            TemplateBody::Expr(expr) | TemplateBody::Throw(expr) => vec![expr],
            TemplateBody::Delegation { args, .. } => args.iter().collect(),
        }
    }

    /// Pre-order visit of every expression in the body.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Node<Expr>)) {
        for root in self.roots() {
            walk_expr(root, f);
        }
    }

    pub fn expr(&self) -> Option<&Node<Expr>> {
        match self {
            TemplateBody::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    /// The body is exactly the receiver placeholder (`return this;`).
    pub fn is_bare_receiver(&self) -> bool {
        self.expr().is_some_and(|expr| expr.as_ref().is_receiver_placeholder())
    }

    pub fn uses_explicit_receiver(&self) -> bool {
        let mut found = false;
        self.walk(&mut |node| {
            if matches!(node.as_ref(), Expr::Placeholder(Placeholder::Receiver { explicit: true })) {
                found = true;
            }
        });
        found
    }

    /// Number of occurrences of the parameter placeholder `name`.
    pub fn param_occurrences(&self, name: &str) -> usize {
        let mut count = 0;
        self.walk(&mut |node| {
            if node.as_ref().param_placeholder() == Some(name) {
                count += 1;
            }
        });
        count
    }

    pub fn print(&self, printer: &Printer) -> String {
        match self {
            TemplateBody::Expr(expr) => printer.print_expr(expr.as_ref()),
            TemplateBody::Throw(expr) => format!("throw {}", printer.print_expr(expr.as_ref())),
            TemplateBody::Delegation { kind, args } => {
                format!("{}{}", kind.keyword(), printer.print_args(args))
            }
        }
    }

    /// Form used to compare two templates: every receiver written out.
    pub fn canonical(&self) -> String {
        self.print(&Printer::new(PrintOptions {
            explicit_receiver: true,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverPlaceholder {
    /// Static owner: no receiver.
    None,
    /// Member references are unqualified in the body.
    ImplicitThis,
    /// The body writes `this` explicitly.
    ExplicitThis,
}

/// How the variadic formal of the owner is used; decided during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VarargsMode {
    /// The owner is not variadic: arity must match exactly.
    #[default]
    None,
    /// The variadic formal is passed on whole; the tail is bundled.
    Forward,
    /// Only the fixed prefix is used; extra call-site arguments are dropped.
    DropTail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Extracted,
    Authored {
        replacement: String,
        declared_imports: BTreeSet<ImportRequirement>,
        /// Canonical form of the template extracted from the owner's own
        /// body, when the body is extractable.
        body_replacement: Option<String>,
    },
}

impl TemplateSource {
    pub fn is_authored(&self) -> bool {
        matches!(self, TemplateSource::Authored { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTemplate {
    pub owner: DeclId,
    /// Simple name of the templated method (the type name for constructors).
    pub owner_name: String,
    pub owner_type: DeclId,
    /// Qualified name of the declaring type.
    pub owner_type_name: String,
    pub file: FileId,
    /// Span of the templated declaration, used for diagnostics.
    pub span: Span,
    pub parameters: Vec<String>,
    pub varargs_last: bool,
    pub receiver: ReceiverPlaceholder,
    pub body: TemplateBody,
    /// Imports inferred from the body.
    pub imports: BTreeSet<ImportRequirement>,
    pub source: TemplateSource,
    pub varargs_mode: VarargsMode,
    pub returns_void: bool,
    pub is_constructor: bool,
    pub visibility: Visibility,
    pub disabled_reason: Option<String>,
}

impl MethodTemplate {
    /// Imports a rewrite must make available: what the author declared, or
    /// what extraction inferred.
    pub fn required_imports(&self) -> &BTreeSet<ImportRequirement> {
        match &self.source {
            TemplateSource::Authored {
                declared_imports, ..
            } => declared_imports,
            TemplateSource::Extracted => &self.imports,
        }
    }

    pub fn replacement_text(&self) -> String {
        self.body.print(&Printer::default())
    }

    /// A method whose template is `this`: calls to it can be dropped from
    /// fluent chains.
    pub fn is_fluent_no_op(&self) -> bool {
        !self.returns_void && self.body.is_bare_receiver()
    }

    /// The template is a single call passing the parameters through in
    /// declaration order, so a method reference can simply be renamed.
    pub fn forwarding_target(&self) -> Option<&str> {
        let TemplateBody::Expr(expr) = &self.body else {
            return None;
        };
        let Expr::Call { target, name, args } = expr.as_ref() else {
            return None;
        };
        let receiver_ok = target
            .as_ref()
            .is_some_and(|target| target.as_ref().as_ref().is_receiver_placeholder());
        let forwards = args.len() == self.parameters.len()
            && args
                .iter()
                .zip(&self.parameters)
                .all(|(arg, param)| arg.as_ref().param_placeholder() == Some(param.as_str()));
        (receiver_ok && forwards).then_some(name.as_str())
    }

    pub fn variadic_formal(&self) -> Option<&str> {
        if self.varargs_last {
            self.parameters.last().map(String::as_str)
        } else {
            None
        }
    }
}

/// A template that passed validation. Only the validator constructs these,
/// so the rewriter never sees an unchecked template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTemplate(MethodTemplate);

impl ValidatedTemplate {
    pub(crate) fn new(template: MethodTemplate) -> Self {
        Self(template)
    }

    pub fn into_inner(self) -> MethodTemplate {
        self.0
    }
}

impl Deref for ValidatedTemplate {
    type Target = MethodTemplate;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Trusted templates keyed by the declaration they belong to.
#[derive(Debug, Default, Clone)]
pub struct TemplateRegistry {
    templates: AHashMap<DeclId, ValidatedTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template; returns the one it replaced, if any.
    pub fn insert(&mut self, template: ValidatedTemplate) -> Option<ValidatedTemplate> {
        self.templates.insert(template.owner, template)
    }

    pub fn get(&self, owner: DeclId) -> Option<&ValidatedTemplate> {
        self.templates.get(&owner)
    }

    pub fn contains(&self, owner: DeclId) -> bool {
        self.templates.contains_key(&owner)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidatedTemplate> {
        self.templates.values()
    }
}
