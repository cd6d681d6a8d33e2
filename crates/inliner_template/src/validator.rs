//! Deciding whether a template may be trusted at every call site.

use std::fmt;

use inliner_ast::nodes::{DelegationKind, Expr, Node};
use inliner_symbol::{
    Binding, DeclId, ResolutionContext, SymbolService, at_least_as_visible, named_type,
    resolve_call, resolve_field, type_of,
};
use inliner_span::Span;
use inliner_utils::errors::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::imports::format_imports;
use crate::template::{
    MethodTemplate, TemplateBody, TemplateSource, ValidatedTemplate, VarargsMode,
};
use crate::timing::unsafe_placeholders;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValidationRule {
    SingleStatement,
    NotNoOp,
    Visibility,
    EvaluationTiming,
    Varargs,
    ParameterNames,
    Imports,
    BodyMatch,
}

impl ValidationRule {
    pub fn code(self) -> &'static str {
        match self {
            ValidationRule::SingleStatement => "single-statement",
            ValidationRule::NotNoOp => "no-op",
            ValidationRule::Visibility => "visibility",
            ValidationRule::EvaluationTiming => "evaluation-timing",
            ValidationRule::Varargs => "varargs",
            ValidationRule::ParameterNames => "parameter-names",
            ValidationRule::Imports => "imports",
            ValidationRule::BodyMatch => "body-match",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("replacement must be a single expression, `throw` or constructor delegation: {0}")]
    NotSingleStatement(String),
    #[error("only inline methods with exactly one effectful statement")]
    NoOp,
    #[error("deprecated or less visible API elements: {}", .0.join(", "))]
    Visibility(Vec<String>),
    #[error(
        "{} would no longer be evaluated exactly once at the call site",
        .0.join(", ")
    )]
    EvaluationTiming(Vec<String>),
    #[error("varargs: {0}")]
    Varargs(String),
    #[error("parameter `{0}` has a synthetic name, so arguments cannot be matched to the replacement")]
    SyntheticParameterName(String),
    #[error("declared imports {declared} miss {missing} (inferred {inferred})")]
    ImportMismatch {
        declared: String,
        inferred: String,
        missing: String,
    },
    #[error("declared imports {declared} include {unused}, which the replacement never uses (inferred {inferred})")]
    UnusedImports {
        declared: String,
        inferred: String,
        unused: String,
    },
    #[error("replacement `{authored}` does not match the method body `{extracted}`")]
    BodyMismatch { authored: String, extracted: String },
}

impl ValidationError {
    pub fn rule(&self) -> ValidationRule {
        match self {
            ValidationError::NotSingleStatement(_) => ValidationRule::SingleStatement,
            ValidationError::NoOp => ValidationRule::NotNoOp,
            ValidationError::Visibility(_) => ValidationRule::Visibility,
            ValidationError::EvaluationTiming(_) => ValidationRule::EvaluationTiming,
            ValidationError::Varargs(_) => ValidationRule::Varargs,
            ValidationError::SyntheticParameterName(_) => ValidationRule::ParameterNames,
            ValidationError::ImportMismatch { .. } | ValidationError::UnusedImports { .. } => {
                ValidationRule::Imports
            }
            ValidationError::BodyMismatch { .. } => ValidationRule::BodyMatch,
        }
    }

    pub fn to_diagnostic(&self, source_id: &str, span: Span) -> Diagnostic {
        let diagnostic = match self {
            ValidationError::UnusedImports { .. } => Diagnostic::warning(source_id, span, self.to_string()),
            _ => Diagnostic::error(source_id, span, self.to_string()),
        }
        .with_code(self.rule().code());
        match self {
            ValidationError::BodyMismatch { extracted, .. } => {
                diagnostic.with_suggestion(format!("replacement = \"{extracted}\""))
            }
            ValidationError::EvaluationTiming(_) => diagnostic
                .with_help("evaluate the argument into a local before the call, or inline by hand"),
            _ => diagnostic,
        }
    }
}

/// Outcome of validating one template: the trusted template, or every rule
/// it violated.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub owner: DeclId,
    pub span: Span,
    pub errors: Vec<ValidationError>,
    /// Findings that do not reject the template.
    pub warnings: Vec<ValidationError>,
    /// Set when validation was partly skipped on the author's request.
    pub note: Option<String>,
    pub template: Option<ValidatedTemplate>,
}

impl ValidationReport {
    pub fn is_accepted(&self) -> bool {
        self.template.is_some()
    }

    pub fn rules(&self) -> Vec<ValidationRule> {
        self.errors.iter().map(ValidationError::rule).collect()
    }

    pub fn to_diagnostics(&self, source_id: &str) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = self
            .errors
            .iter()
            .chain(&self.warnings)
            .map(|error| error.to_diagnostic(source_id, self.span))
            .collect();
        if let Some(note) = &self.note {
            diagnostics.push(Diagnostic::info(source_id, self.span, note.clone()).with_code("validation-disabled"));
        }
        diagnostics
    }
}

fn is_synthetic_name(name: &str) -> bool {
    name.strip_prefix("arg")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn check_parameter_names(template: &MethodTemplate) -> Option<ValidationError> {
    template
        .parameters
        .iter()
        .find(|name| is_synthetic_name(name))
        .map(|name| ValidationError::SyntheticParameterName(name.clone()))
}

fn check_no_op(template: &MethodTemplate) -> Option<ValidationError> {
    if !template.returns_void {
        return None;
    }
    match &template.body {
        TemplateBody::Expr(expr) if !expr.as_ref().is_effectful() => Some(ValidationError::NoOp),
        _ => None,
    }
}

/// Constructors can only be inlined through `this(...)`; the authored text
/// must not be blank.
fn check_single_statement(template: &MethodTemplate) -> Option<ValidationError> {
    if template.is_constructor
        && !matches!(
            template.body,
            TemplateBody::Delegation {
                kind: DelegationKind::This,
                ..
            }
        )
    {
        return Some(ValidationError::NotSingleStatement(
            "a constructor template must delegate with `this(...)`".to_string(),
        ));
    }
    match &template.source {
        TemplateSource::Authored { replacement, .. } if replacement.trim().is_empty() => Some(
            ValidationError::NotSingleStatement("empty replacement".to_string()),
        ),
        _ => None,
    }
}

/// Declarations the body refers to, in order of first reference.
fn referenced_declarations(
    body: &TemplateBody,
    service: &dyn SymbolService,
    cx: &ResolutionContext,
) -> Vec<DeclId> {
    let mut found = Vec::new();
    let mut push = |id: Option<DeclId>| {
        if let Some(id) = id
            && !found.contains(&id)
        {
            found.push(id);
        }
    };
    body.walk(&mut |node: &Node<Expr>| match node.as_ref() {
        Expr::New { ty, .. } => {
            push(named_type(service, cx, &ty.as_ref().name));
            push(resolve_call(service, cx, node.as_ref()));
        }
        Expr::Call { .. } => push(resolve_call(service, cx, node.as_ref())),
        Expr::Field { .. } => push(resolve_field(service, cx, node.as_ref())),
        Expr::Name(name) => match service.resolve_name(cx, name) {
            Some(Binding::Field(id) | Binding::Type(id)) => push(Some(id)),
            _ => {}
        },
        Expr::Cast { ty, .. } | Expr::InstanceOf { ty, .. } => {
            push(named_type(service, cx, &ty.as_ref().name));
        }
        Expr::MethodRef { target, name } => {
            if let Some(owner) = type_of(service, cx, target.as_ref().as_ref()) {
                push(service.methods_named(owner.decl, name).first().copied());
            }
        }
        _ => {}
    });
    found
}

fn check_visibility(
    template: &MethodTemplate,
    service: &dyn SymbolService,
    cx: &ResolutionContext,
) -> Option<ValidationError> {
    let offending: Vec<String> = referenced_declarations(&template.body, service, cx)
        .into_iter()
        .filter(|id| *id != template.owner)
        .filter_map(|id| service.declaration(id))
        .filter(|decl| decl.deprecated || !at_least_as_visible(decl.visibility, template.visibility))
        .map(|decl| format!("`{}`", decl.display_name()))
        .collect();
    (!offending.is_empty()).then(|| ValidationError::Visibility(offending))
}

fn check_timing(template: &MethodTemplate) -> Option<ValidationError> {
    let slots: Vec<String> = unsafe_placeholders(&template.body)
        .iter()
        .map(|slot| format!("`{}`", slot.label()))
        .collect();
    (!slots.is_empty()).then(|| ValidationError::EvaluationTiming(slots))
}

/// Every argument list in the body, with the callee when it resolves.
fn argument_lists<'a>(
    template: &'a MethodTemplate,
    service: &dyn SymbolService,
    cx: &ResolutionContext,
) -> Vec<(&'a [Node<Expr>], Option<DeclId>)> {
    let mut lists = Vec::new();
    if let TemplateBody::Delegation { args, .. } = &template.body {
        lists.push((args.as_slice(), service.constructor(template.owner_type, args.len())));
    }
    template.body.walk(&mut |node| {
        if let Expr::Call { args, .. } | Expr::New { args, .. } = node.as_ref() {
            lists.push((args.as_slice(), resolve_call(service, cx, node.as_ref())));
        }
    });
    lists
}

/// How the variadic formal flows through the body.
fn varargs_mode(
    template: &MethodTemplate,
    service: &dyn SymbolService,
    cx: &ResolutionContext,
) -> Result<VarargsMode, ValidationError> {
    let Some(formal) = template.variadic_formal() else {
        return Ok(VarargsMode::None);
    };
    let total = template.body.param_occurrences(formal);
    if total == 0 {
        return Ok(VarargsMode::DropTail);
    }
    let mut forwarded = 0;
    for (args, callee) in argument_lists(template, service, cx) {
        for (position, arg) in args.iter().enumerate() {
            if arg.as_ref().param_placeholder() != Some(formal) {
                continue;
            }
            forwarded += 1;
            if position + 1 != args.len() {
                return Err(ValidationError::Varargs(format!(
                    "`{formal}` must be passed as the last argument"
                )));
            }
            if let Some(decl) = callee.and_then(|id| service.declaration(id))
                && !decl.is_variadic_position(position)
            {
                return Err(ValidationError::Varargs(format!(
                    "`{formal}` is passed to non-variadic parameter {} of `{}`",
                    position + 1,
                    decl.display_name()
                )));
            }
        }
    }
    if forwarded != total {
        return Err(ValidationError::Varargs(format!(
            "`{formal}` is used outside an argument list"
        )));
    }
    Ok(VarargsMode::Forward)
}

/// Varargs handling when the checks are skipped: forward if the formal
/// appears at all.
fn best_effort_varargs(template: &MethodTemplate) -> VarargsMode {
    match template.variadic_formal() {
        None => VarargsMode::None,
        Some(formal) if template.body.param_occurrences(formal) > 0 => VarargsMode::Forward,
        Some(_) => VarargsMode::DropTail,
    }
}

fn check_authored(template: &MethodTemplate) -> Vec<ValidationError> {
    let TemplateSource::Authored {
        declared_imports,
        body_replacement,
        ..
    } = &template.source
    else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    let missing: std::collections::BTreeSet<_> =
        template.imports.difference(declared_imports).cloned().collect();
    if !missing.is_empty() {
        errors.push(ValidationError::ImportMismatch {
            declared: format_imports(declared_imports),
            inferred: format_imports(&template.imports),
            missing: format_imports(&missing),
        });
    }
    if let Some(extracted) = body_replacement {
        let authored = template.body.canonical();
        if authored != *extracted {
            errors.push(ValidationError::BodyMismatch {
                authored,
                extracted: extracted.clone(),
            });
        }
    }
    errors
}

/// Declared imports the replacement does not need. Harmless, so only a
/// warning.
fn unused_imports(template: &MethodTemplate) -> Option<ValidationError> {
    let TemplateSource::Authored { declared_imports, .. } = &template.source else {
        return None;
    };
    let unused: std::collections::BTreeSet<_> =
        declared_imports.difference(&template.imports).cloned().collect();
    (!unused.is_empty()).then(|| ValidationError::UnusedImports {
        declared: format_imports(declared_imports),
        inferred: format_imports(&template.imports),
        unused: format_imports(&unused),
    })
}

/// Run every rule against `template`. `cx` must point into the templated
/// declaration so parameters and members resolve as the body sees them.
///
/// The shape rules and the parameter-name rule always run; a
/// validation-disable marker skips the rest and leaves a note instead.
pub fn validate(
    mut template: MethodTemplate,
    service: &dyn SymbolService,
    cx: ResolutionContext,
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    errors.extend(check_parameter_names(&template));
    errors.extend(check_single_statement(&template));
    errors.extend(check_no_op(&template));

    let note = template
        .disabled_reason
        .as_ref()
        .map(|reason| format!("validation disabled for `{}`: {reason}", template.owner_name));
    if note.is_some() {
        template.varargs_mode = best_effort_varargs(&template);
    } else {
        errors.extend(check_visibility(&template, service, &cx));
        errors.extend(check_timing(&template));
        match varargs_mode(&template, service, &cx) {
            Ok(mode) => template.varargs_mode = mode,
            Err(error) => errors.push(error),
        }
        errors.extend(check_authored(&template));
        warnings.extend(unused_imports(&template));
    }

    debug!(
        method = %template.owner_name,
        accepted = errors.is_empty(),
        violations = errors.len(),
        "validated template"
    );
    let owner = template.owner;
    let span = template.span;
    let template = errors.is_empty().then(|| ValidatedTemplate::new(template));
    ValidationReport {
        owner,
        span,
        errors,
        warnings,
        note,
        template,
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::panic, reason = "Panicking on test failures is acceptable")]

    use super::*;
    use crate::attributes::AuthoredTemplate;
    use crate::testing::Fixture;

    const CLIENT: &str = "package com.acme;\n\
        import java.util.List;\n\
        import java.util.function.Supplier;\n\
        public class Client {\n\
            public int field;\n\
            private int secret;\n\
            private void privateMethod() {}\n\
            @Deprecated public void old() {}\n\
            public void after(int x) {}\n\
            public void before(int x) { after(x); }\n\
            public void leaks() { privateMethod(); }\n\
            public void legacy() { old(); }\n\
            public int peek() { return secret; }\n\
            public void lazily(Supplier<String> s) {}\n\
            public void later(String string) { lazily(() -> string); }\n\
            public boolean both(boolean a, boolean b) { return a && b; }\n\
            public void synthetic(int arg0) { after(arg0); }\n\
            public void nothing() { field; }\n\
            public Client self() { return this; }\n\
            public void sink(Object... items) {}\n\
            public void fixed(Object[] items) {}\n\
            public void forward(Object... items) { sink(items); }\n\
            public void drop(int x, Object... items) { after(x); }\n\
            public void misplaced(Object... items) { fixed(items); }\n\
            @NoValidation(reason = \"trusted\") public void trusted() { privateMethod(); }\n\
            public List<String> wrap(String s) { return List.of(s); }\n\
        }\n";

    fn validate_named(name: &str) -> ValidationReport {
        Fixture::new(&[("Client.java", CLIENT)]).validate_extracted("com.acme.Client", name, 0)
    }

    #[test]
    fn simple_delegation_is_accepted() {
        let report = validate_named("before");
        assert!(report.is_accepted(), "{:?}", report.errors);
        assert!(report.note.is_none());
    }

    #[test]
    fn private_and_deprecated_references_are_rejected() {
        let report = validate_named("leaks");
        assert_eq!(
            report.errors,
            vec![ValidationError::Visibility(vec!["`privateMethod()`".to_string()])]
        );
        assert_eq!(
            report.errors[0].to_string(),
            "deprecated or less visible API elements: `privateMethod()`"
        );
        assert_eq!(validate_named("legacy").rules(), vec![ValidationRule::Visibility]);
        assert_eq!(validate_named("peek").rules(), vec![ValidationRule::Visibility]);
    }

    #[test]
    fn deferred_arguments_are_rejected() {
        let report = validate_named("later");
        assert_eq!(
            report.errors,
            vec![ValidationError::EvaluationTiming(vec!["`string`".to_string()])]
        );
        assert_eq!(validate_named("both").rules(), vec![ValidationRule::EvaluationTiming]);
    }

    #[test]
    fn synthetic_parameter_names_are_rejected() {
        assert!(is_synthetic_name("arg0"));
        assert!(is_synthetic_name("arg12"));
        assert!(!is_synthetic_name("args"));
        assert!(!is_synthetic_name("arg"));
        assert_eq!(validate_named("synthetic").rules(), vec![ValidationRule::ParameterNames]);
    }

    #[test]
    fn void_methods_must_do_something() {
        assert_eq!(validate_named("nothing").rules(), vec![ValidationRule::NotNoOp]);
        assert!(validate_named("self").is_accepted());
    }

    #[test]
    fn constructors_must_delegate() {
        const CTORS: &str = "package com.acme;\n\
            public class Point {\n\
                public Point(int x) { this(x, 0); }\n\
                public Point(int x, int y) { init(x + y); }\n\
                public Point(int x, int y, int z) {}\n\
                public void init(int v) {}\n\
            }\n";
        let fixture = Fixture::new(&[("Point.java", CTORS)]);
        assert!(fixture.validate_extracted("com.acme.Point", "Point", 0).is_accepted());
        assert_eq!(
            fixture.validate_extracted("com.acme.Point", "Point", 1).rules(),
            vec![ValidationRule::SingleStatement]
        );
    }

    #[test]
    fn varargs_modes() {
        let forward = validate_named("forward");
        let Some(template) = &forward.template else {
            panic!("expected forward to validate, got {:?}", forward.errors);
        };
        assert_eq!(template.varargs_mode, VarargsMode::Forward);

        let drop = validate_named("drop");
        let Some(template) = &drop.template else {
            panic!("expected drop to validate, got {:?}", drop.errors);
        };
        assert_eq!(template.varargs_mode, VarargsMode::DropTail);

        assert_eq!(validate_named("misplaced").rules(), vec![ValidationRule::Varargs]);
    }

    #[test]
    fn disabled_validation_keeps_a_note() {
        let report = validate_named("trusted");
        assert!(report.is_accepted());
        assert_eq!(
            report.note.as_deref(),
            Some("validation disabled for `trusted`: trusted")
        );
        let diagnostics = report.to_diagnostics("Client.java");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), Some("validation-disabled"));
    }

    fn authored(method: &str, replacement: &str, imports: &[&str]) -> AuthoredTemplate {
        AuthoredTemplate {
            method: format!("com.acme.Client#{method}"),
            replacement: replacement.to_string(),
            imports: imports.iter().map(ToString::to_string).collect(),
            static_imports: Vec::new(),
            validation_disabled_reason: None,
        }
    }

    #[test]
    fn authored_templates_match_the_body() {
        let fixture = Fixture::new(&[("Client.java", CLIENT)]);
        let report = fixture.validate_authored(&authored("before", "this.after(x)", &[]));
        assert!(report.is_accepted(), "{:?}", report.errors);

        let report = fixture.validate_authored(&authored("before", "after(x + 1)", &[]));
        assert_eq!(
            report.errors,
            vec![ValidationError::BodyMismatch {
                authored: "this.after(x + 1)".to_string(),
                extracted: "this.after(x)".to_string(),
            }]
        );
    }

    #[test]
    fn authored_imports_must_cover_inferred_ones() {
        let fixture = Fixture::new(&[("Client.java", CLIENT)]);
        let report = fixture.validate_authored(&authored("wrap", "List.of(s)", &[]));
        assert_eq!(report.rules(), vec![ValidationRule::Imports]);
        assert_eq!(
            report.errors[0].to_string(),
            "declared imports [] miss [java.util.List] (inferred [java.util.List])"
        );
        let report = fixture.validate_authored(&authored("wrap", "List.of(s)", &["java.util.List"]));
        assert!(report.is_accepted(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn surplus_declared_imports_are_reported() {
        let fixture = Fixture::new(&[("Client.java", CLIENT)]);
        let mut template = authored("before", "this.after(x)", &["java.util.List"]);
        template.static_imports = vec!["java.util.Objects.requireNonNull".to_string()];
        let report = fixture.validate_authored(&template);
        assert!(report.is_accepted(), "{:?}", report.errors);
        let [ValidationError::UnusedImports { declared, inferred, unused }] = report.warnings.as_slice()
        else {
            panic!("expected one unused-imports warning, got {:?}", report.warnings);
        };
        assert_eq!(inferred, "[]");
        assert_eq!(declared, unused);
        assert!(unused.contains("java.util.List"), "{unused}");
        assert!(unused.contains("java.util.Objects.requireNonNull"), "{unused}");

        let diagnostics = report.to_diagnostics("Client.java");
        let [diagnostic] = diagnostics.as_slice() else {
            panic!("expected one diagnostic, got {diagnostics:?}");
        };
        assert!(!diagnostic.is_error());
        assert_eq!(diagnostic.code(), Some("imports"));
    }

    #[test]
    fn unparsable_replacements_fail_the_shape_rule() {
        let fixture = Fixture::new(&[("Client.java", CLIENT)]);
        let Err(error) = fixture.authored(&authored("before", "after(x); after(x)", &[])) else {
            panic!("expected a parse failure");
        };
        assert_eq!(error.rule(), ValidationRule::SingleStatement);
    }
}
