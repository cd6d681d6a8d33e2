//! Scope and symbol queries used by template extraction, validation and
//! call-site rewriting.
//!
//! [`SymbolService`] is the query surface. [`SourceIndex`] answers it from a
//! set of parsed compilation units held in memory.

pub mod decl;
pub mod index;
pub mod service;
pub mod typing;

pub use decl::{DeclId, DeclKind, Declaration};
pub use index::{SourceFile, SourceIndex, at_least_as_visible, is_java_lang};
pub use service::{Binding, ImportKind, ImportRequirement, ImportState, ResolutionContext, SymbolService};
pub use typing::{ExprType, dotted_name, named_type, resolve_call, resolve_field, type_of};
