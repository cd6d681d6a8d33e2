//! Call-site rewriting: find the invocations of templated declarations and
//! replace each one with its template, spliced with the call's own
//! arguments and receiver.
//!
//! Every file is handled on its own. Its edits are either applied together
//! or, when any two overlap, not at all.

pub mod call_site;
pub mod edit;
pub mod elision;
pub mod error;
pub mod imports;
pub mod rewriter;
pub mod scan;
pub mod substitution;

pub use call_site::{CallKind, CallSite, ChainLink, Position, SyntacticContext};
pub use edit::{BatchConflict, EditError, TextEdit, apply_edits, normalize};
pub use error::RewriteError;
pub use imports::{ImportPlan, SiteImports};
pub use rewriter::{FileRewrite, RewriteConfig, RewriteStats, Rewriter, SiteRewrite};
pub use scan::scan_file;
pub use substitution::{Fragment, Substitution};
