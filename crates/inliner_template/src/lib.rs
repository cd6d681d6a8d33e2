//! Method templates: extraction from single-statement bodies, authored
//! replacements, and the validation that makes a template trustworthy.
//!
//! A [`MethodTemplate`] only reaches the rewriter wrapped in a
//! [`ValidatedTemplate`], which [`validate`] alone produces.

pub mod attributes;
pub mod authored;
pub mod extractor;
pub mod imports;
pub mod placeholders;
pub mod template;
pub mod timing;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use attributes::{AuthoredTemplate, TemplateAttributes, disable_reason, find_template_attributes};
pub use authored::{from_attributes, from_declaration};
pub use extractor::{ExtractError, TemplateOwner, extract, suggest};
pub use imports::{declared_imports, format_imports, infer_imports};
pub use template::{
    MethodTemplate, ReceiverPlaceholder, TemplateBody, TemplateRegistry, TemplateSource,
    ValidatedTemplate, VarargsMode,
};
pub use timing::{Slot, unsafe_placeholders};
pub use validator::{ValidationError, ValidationReport, ValidationRule, validate};
