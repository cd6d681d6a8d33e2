//! Best-effort static typing of receiver expressions.
//!
//! Only what call-target resolution needs: names, fields, calls, `new`,
//! casts and `this`. Anything else types as unknown.

use inliner_ast::nodes::{Expr, Placeholder};

use crate::decl::DeclId;
use crate::service::{Binding, ResolutionContext, SymbolService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprType {
    pub decl: DeclId,
    /// The expression names the type itself (`Client` in `Client.make()`).
    pub is_type_ref: bool,
}

impl ExprType {
    fn instance(decl: DeclId) -> Self {
        Self {
            decl,
            is_type_ref: false,
        }
    }
}

/// `a.b.C` for a chain of names and field accesses.
pub fn dotted_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name(name) => Some(name.clone()),
        Expr::Field { target, name } => {
            let mut prefix = dotted_name(target.as_ref().as_ref())?;
            prefix.push('.');
            prefix.push_str(name);
            Some(prefix)
        }
        _ => None,
    }
}

fn variable_type(service: &dyn SymbolService, id: DeclId) -> Option<ExprType> {
    service
        .declaration(id)?
        .ty_decl
        .map(ExprType::instance)
}

fn name_type(service: &dyn SymbolService, cx: &ResolutionContext, name: &str) -> Option<ExprType> {
    match service.resolve_name(cx, name)? {
        Binding::Local(id) | Binding::Field(id) => variable_type(service, id),
        Binding::Type(id) => Some(ExprType {
            decl: id,
            is_type_ref: true,
        }),
        Binding::ExternalType(_) => None,
    }
}

pub fn type_of(service: &dyn SymbolService, cx: &ResolutionContext, expr: &Expr) -> Option<ExprType> {
    match expr {
        Expr::This | Expr::Super | Expr::Placeholder(Placeholder::Receiver { .. }) => {
            service.enclosing_type(cx).map(ExprType::instance)
        }
        Expr::Name(name) | Expr::Placeholder(Placeholder::Param { name, .. }) => {
            name_type(service, cx, name)
        }
        Expr::Field { target, name } => {
            if let Some(owner) = type_of(service, cx, target.as_ref().as_ref()) {
                let field = service.resolve_member(owner.decl, name, None)?;
                return variable_type(service, field);
            }
            let qualified = dotted_name(expr)?;
            service.type_by_name(&qualified).map(|decl| ExprType {
                decl,
                is_type_ref: true,
            })
        }
        Expr::Call { .. } | Expr::New { .. } => {
            let callee = resolve_call(service, cx, expr)?;
            let decl = service.declaration(callee)?;
            match expr {
                Expr::New { .. } => decl.owner.map(ExprType::instance),
                _ => decl.ty_decl.map(ExprType::instance),
            }
        }
        Expr::Cast { ty, .. } => {
            let qualified = service.qualify_type(cx, &ty.as_ref().name)?;
            service.type_by_name(&qualified).map(ExprType::instance)
        }
        Expr::Conditional { then_expr, .. } => type_of(service, cx, then_expr.as_ref().as_ref()),
        _ => None,
    }
}

/// The type a written type name refers to, when it is indexed.
pub fn named_type(service: &dyn SymbolService, cx: &ResolutionContext, name: &str) -> Option<DeclId> {
    let qualified = service.qualify_type(cx, name)?;
    service.type_by_name(&qualified)
}

/// Declaration a method call or instance creation invokes.
pub fn resolve_call(service: &dyn SymbolService, cx: &ResolutionContext, expr: &Expr) -> Option<DeclId> {
    match expr {
        Expr::Call {
            target: None,
            name,
            args,
        } => service.resolve_method(cx, name, args.len()),
        Expr::Call {
            target: Some(target),
            name,
            args,
        } => {
            let owner = type_of(service, cx, target.as_ref().as_ref())?;
            service.resolve_member(owner.decl, name, Some(args.len()))
        }
        Expr::New { ty, args } => {
            let owner = named_type(service, cx, &ty.as_ref().name)?;
            service.constructor(owner, args.len())
        }
        _ => None,
    }
}

/// Field an expression reads, if it is a field access or a bare field name.
pub fn resolve_field(service: &dyn SymbolService, cx: &ResolutionContext, expr: &Expr) -> Option<DeclId> {
    match expr {
        Expr::Name(name) => match service.resolve_name(cx, name)? {
            Binding::Field(id) => Some(id),
            _ => None,
        },
        Expr::Field { target, name } => {
            let owner = type_of(service, cx, target.as_ref().as_ref())?;
            service.resolve_member(owner.decl, name, None)
        }
        _ => None,
    }
}
