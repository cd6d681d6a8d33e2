//! Templates declared by an author rather than inferred.

use inliner_parser::{SourceError, parse_replacement_source};
use inliner_symbol::{ResolutionContext, SymbolService};

use crate::attributes::{TemplateAttributes, find_template_attributes};
use crate::extractor::{TemplateOwner, body_of, extract, templatize};
use crate::imports::declared_imports;
use crate::template::{MethodTemplate, TemplateSource};
use crate::validator::ValidationError;

fn parse_failure(replacement: &str, error: &SourceError) -> ValidationError {
    ValidationError::NotSingleStatement(format!("`{replacement}` does not parse ({error})"))
}

/// Build the template an attribute bag declares for `owner`. A replacement
/// that is not a single expression, `throw` or delegation fails here.
///
/// `disabled_reason` overrides any disable marker on the declaration itself.
pub fn from_attributes(
    attributes: &dyn TemplateAttributes,
    owner: TemplateOwner<'_>,
    service: &dyn SymbolService,
    cx: ResolutionContext,
    disabled_reason: Option<String>,
) -> Result<MethodTemplate, ValidationError> {
    let replacement = attributes.replacement().ok_or_else(|| {
        ValidationError::NotSingleStatement("no replacement text".to_string())
    })?;
    let stmt = parse_replacement_source(&replacement)
        .map_err(|error| parse_failure(&replacement, &error))?;
    let body = body_of(stmt, true)
        .map_err(|error| ValidationError::NotSingleStatement(error.to_string()))?;
    let params = owner.method.param_names();
    let body = templatize(body, &owner.scope(service, cx, &params));

    let body_replacement = extract(owner, service, cx)
        .ok()
        .map(|extracted| extracted.body.canonical());
    let source = TemplateSource::Authored {
        replacement,
        declared_imports: declared_imports(&attributes.imports(), &attributes.static_imports()),
        body_replacement,
    };
    let mut template = owner.template(service, cx, body, source);
    if disabled_reason.is_some() {
        template.disabled_reason = disabled_reason;
    }
    Ok(template)
}

/// The template declared on the method itself, if it carries one.
pub fn from_declaration(
    owner: TemplateOwner<'_>,
    service: &dyn SymbolService,
    cx: ResolutionContext,
) -> Option<Result<MethodTemplate, ValidationError>> {
    let attributes = find_template_attributes(&owner.method.annotations)?;
    Some(from_attributes(attributes, owner, service, cx, None))
}
