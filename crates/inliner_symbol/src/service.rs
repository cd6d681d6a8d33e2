use std::fmt;

use inliner_ast::nodes::simple_name;
use inliner_span::{FileId, Span};

use crate::decl::{DeclId, Declaration};

/// Where a query is asked from. Immutable and cheap to copy; every extractor,
/// validator and rewriter call receives one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolutionContext {
    pub file: FileId,
    pub position: usize,
}

impl ResolutionContext {
    pub fn new(file: FileId, position: usize) -> Self {
        Self { file, position }
    }

    pub fn at(file: FileId, span: Span) -> Self {
        Self::new(file, span.start())
    }
}

/// What a simple name means at a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// A parameter or local variable.
    Local(DeclId),
    Field(DeclId),
    Type(DeclId),
    /// A type known only by its qualified name (imports, `java.lang`).
    ExternalType(String),
}

impl Binding {
    pub fn is_variable(&self) -> bool {
        matches!(self, Binding::Local(_) | Binding::Field(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImportKind {
    Type,
    StaticMember,
}

/// A name the rewritten code needs in scope. Ordered by kind, then name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImportRequirement {
    kind: ImportKind,
    qualified_name: String,
}

impl ImportRequirement {
    pub fn new(kind: ImportKind, qualified_name: impl Into<String>) -> Self {
        Self {
            kind,
            qualified_name: qualified_name.into(),
        }
    }

    pub fn type_import(qualified_name: impl Into<String>) -> Self {
        Self::new(ImportKind::Type, qualified_name)
    }

    pub fn static_import(qualified_name: impl Into<String>) -> Self {
        Self::new(ImportKind::StaticMember, qualified_name)
    }

    pub fn kind(&self) -> ImportKind {
        self.kind
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.qualified_name)
    }

    /// The import declaration that satisfies this requirement.
    pub fn declaration(&self) -> String {
        match self.kind {
            ImportKind::Type => format!("import {};", self.qualified_name),
            ImportKind::StaticMember => format!("import static {};", self.qualified_name),
        }
    }
}

impl fmt::Display for ImportRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ImportKind::Type => f.write_str(&self.qualified_name),
            ImportKind::StaticMember => write!(f, "static {}", self.qualified_name),
        }
    }
}

/// Whether the simple name of a requirement can be used at a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportState {
    /// Already refers to the required entity.
    Visible,
    /// Unbound; adding the import makes it refer to the required entity.
    Free,
    /// Bound to something else; the reference must be fully qualified.
    Conflict { bound_to: String },
}

/// Scope and declaration queries. Implementations are immutable once built
/// and shared across threads.
pub trait SymbolService: Send + Sync {
    fn declaration(&self, id: DeclId) -> Option<&Declaration>;

    /// Meaning of a simple name at `cx`: locals and parameters, then fields
    /// of the enclosing type and its supertypes, then types.
    fn resolve_name(&self, cx: &ResolutionContext, name: &str) -> Option<Binding>;

    /// Target of an unqualified call `name(..)` with `arity` arguments.
    fn resolve_method(&self, cx: &ResolutionContext, name: &str, arity: usize) -> Option<DeclId>;

    /// Member of `owner` or one of its supertypes. `arity` is `None` for
    /// fields.
    fn resolve_member(&self, owner: DeclId, name: &str, arity: Option<usize>) -> Option<DeclId>;

    fn constructor(&self, owner: DeclId, arity: usize) -> Option<DeclId>;

    /// Every method called `name` on `owner` or its supertypes, any arity.
    fn methods_named(&self, owner: DeclId, name: &str) -> Vec<DeclId>;

    /// Qualified name of the type `name` refers to at `cx`.
    fn qualify_type(&self, cx: &ResolutionContext, name: &str) -> Option<String>;

    /// Qualified name of a statically imported member visible as `name`.
    fn qualify_static(&self, cx: &ResolutionContext, name: &str) -> Option<String>;

    fn import_state(&self, cx: &ResolutionContext, requirement: &ImportRequirement) -> ImportState;

    fn enclosing_type(&self, cx: &ResolutionContext) -> Option<DeclId>;

    /// Reflexive, transitive subtype test over indexed types.
    fn is_subtype(&self, sub: DeclId, sup: DeclId) -> bool;

    fn type_by_name(&self, qualified: &str) -> Option<DeclId>;

    fn package_of(&self, file: FileId) -> Option<&str>;

    fn source_text(&self, file: FileId, span: Span) -> Option<&str>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_order_by_kind_then_name() {
        let mut requirements = vec![
            ImportRequirement::static_import("a.B.c"),
            ImportRequirement::type_import("z.Z"),
            ImportRequirement::type_import("a.A"),
        ];
        requirements.sort();
        let names: Vec<String> = requirements.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["a.A", "z.Z", "static a.B.c"]);
    }

    #[test]
    fn import_declarations() {
        assert_eq!(
            ImportRequirement::static_import("java.util.Objects.requireNonNull").declaration(),
            "import static java.util.Objects.requireNonNull;"
        );
        assert_eq!(ImportRequirement::type_import("java.util.List").simple_name(), "List");
    }
}
