use std::fmt;

use inliner_ast::nodes::{Type, Visibility};
use inliner_span::{FileId, Span};

/// Stable handle of a declaration inside one [`crate::SourceIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u32);

impl DeclId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Class,
    Interface,
    Field,
    Method,
    Constructor,
    Param,
    Local,
}

impl DeclKind {
    pub fn is_type(self) -> bool {
        matches!(self, DeclKind::Class | DeclKind::Interface)
    }

    pub fn is_callable(self) -> bool {
        matches!(self, DeclKind::Method | DeclKind::Constructor)
    }

    pub fn is_variable(self) -> bool {
        matches!(self, DeclKind::Field | DeclKind::Param | DeclKind::Local)
    }
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub id: DeclId,
    pub kind: DeclKind,
    pub name: String,
    /// Enclosing type of members; `None` for types, params and locals.
    pub owner: Option<DeclId>,
    pub file: FileId,
    pub span: Span,
    pub visibility: Visibility,
    pub is_static: bool,
    pub deprecated: bool,
    /// Declared type of variables, return type of methods.
    pub ty: Option<Type>,
    /// The type declaration `ty` names, when it is one of the indexed types.
    pub ty_decl: Option<DeclId>,
    /// Parameter types of callables, in order.
    pub params: Vec<Type>,
    pub varargs: bool,
    /// `pkg.Type` for types, `pkg.Type.member` for members.
    pub qualified_name: Option<String>,
}

impl Declaration {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether a call with `count` arguments can target this callable.
    pub fn accepts_arity(&self, count: usize) -> bool {
        if self.varargs {
            count + 1 >= self.params.len()
        } else {
            count == self.params.len()
        }
    }

    /// Whether argument position `index` lands in the variadic parameter.
    pub fn is_variadic_position(&self, index: usize) -> bool {
        self.varargs && index + 1 >= self.params.len()
    }

    /// How the declaration reads in diagnostics: `name()` for callables.
    pub fn display_name(&self) -> String {
        if self.kind.is_callable() {
            format!("{}()", self.name)
        } else {
            self.name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(params: usize, varargs: bool) -> Declaration {
        Declaration {
            id: DeclId::new(0),
            kind: DeclKind::Method,
            name: "before".into(),
            owner: None,
            file: FileId::new(0),
            span: Span::default(),
            visibility: Visibility::Public,
            is_static: false,
            deprecated: false,
            ty: None,
            ty_decl: None,
            params: vec![Type::simple("int"); params],
            varargs,
            qualified_name: None,
        }
    }

    #[test]
    fn varargs_accept_any_tail() {
        let decl = method(2, true);
        assert!(decl.accepts_arity(1));
        assert!(decl.accepts_arity(5));
        assert!(!decl.accepts_arity(0));
        assert!(decl.is_variadic_position(3));
        assert!(!decl.is_variadic_position(0));
    }

    #[test]
    fn fixed_arity_is_exact() {
        let decl = method(1, false);
        assert!(decl.accepts_arity(1));
        assert!(!decl.accepts_arity(2));
        assert_eq!(decl.display_name(), "before()");
    }
}
