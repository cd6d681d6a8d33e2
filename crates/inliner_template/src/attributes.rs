//! Where templates are declared.
//!
//! Attribute bags are recognised by the elements they carry, never by the
//! annotation's name: anything with a string `replacement` is a template
//! declaration, and anything whose only element is `reason` is the
//! validation-disable marker.

use inliner_ast::nodes::{Annotation, Node};
use serde::{Deserialize, Serialize};

const TEMPLATE_ELEMENTS: [&str; 3] = ["replacement", "imports", "staticImports"];

/// A declared template: replacement text plus the imports it needs.
pub trait TemplateAttributes {
    fn replacement(&self) -> Option<String>;

    fn imports(&self) -> Vec<String>;

    fn static_imports(&self) -> Vec<String>;
}

impl TemplateAttributes for Annotation {
    fn replacement(&self) -> Option<String> {
        self.element("replacement")?.as_ref().as_string()
    }

    fn imports(&self) -> Vec<String> {
        self.element("imports")
            .and_then(|value| value.as_ref().as_string_list())
            .unwrap_or_default()
    }

    fn static_imports(&self) -> Vec<String> {
        self.element("staticImports")
            .and_then(|value| value.as_ref().as_string_list())
            .unwrap_or_default()
    }
}

/// The first annotation shaped like a template declaration.
pub fn find_template_attributes(annotations: &[Node<Annotation>]) -> Option<&Annotation> {
    annotations.iter().map(AsRef::as_ref).find(|annotation| {
        annotation.replacement().is_some()
            && annotation
                .element_names()
                .all(|name| TEMPLATE_ELEMENTS.contains(&name))
    })
}

/// Reason carried by a validation-disable marker, if one is present.
pub fn disable_reason(annotations: &[Node<Annotation>]) -> Option<String> {
    annotations.iter().map(AsRef::as_ref).find_map(|annotation| {
        match annotation.elements.as_slice() {
            [only] if only.name == "reason" => only.value.as_ref().as_string(),
            _ => None,
        }
    })
}

/// A template supplied from configuration instead of source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthoredTemplate {
    /// `pkg.Type#method`; `pkg.Type#Type` names a constructor.
    pub method: String,
    pub replacement: String,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub static_imports: Vec<String>,
    #[serde(default)]
    pub validation_disabled_reason: Option<String>,
}

impl AuthoredTemplate {
    /// Split `method` into (qualified type, member name).
    pub fn target(&self) -> Option<(&str, &str)> {
        let (owner, member) = self.method.split_once('#')?;
        (!owner.is_empty() && !member.is_empty()).then_some((owner, member))
    }
}

impl TemplateAttributes for AuthoredTemplate {
    fn replacement(&self) -> Option<String> {
        Some(self.replacement.clone())
    }

    fn imports(&self) -> Vec<String> {
        self.imports.clone()
    }

    fn static_imports(&self) -> Vec<String> {
        self.static_imports.clone()
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::panic, reason = "Panicking on test failures is acceptable")]

    use super::*;
    use inliner_parser::parse_source;

    fn method_annotations(source: &str) -> Vec<Node<Annotation>> {
        let unit = parse_source(source).expect("parse");
        let Some((_, method)) = unit.methods().next() else {
            panic!("expected a method");
        };
        method.as_ref().annotations.clone()
    }

    #[test]
    fn recognises_templates_by_shape() {
        let annotations = method_annotations(
            "class A { @Deprecated @Whatever(replacement = \"this.b()\", imports = {\"x.Y\"}) void a() { b(); } void b() {} }",
        );
        let found = find_template_attributes(&annotations).expect("template attributes");
        assert_eq!(found.replacement().as_deref(), Some("this.b()"));
        assert_eq!(found.imports(), vec!["x.Y".to_string()]);
        assert!(found.static_imports().is_empty());
    }

    #[test]
    fn extra_elements_disqualify_a_bag() {
        let annotations = method_annotations(
            "class A { @Other(replacement = \"b()\", priority = \"high\") void a() { b(); } void b() {} }",
        );
        assert!(find_template_attributes(&annotations).is_none());
    }

    #[test]
    fn only_a_lone_reason_disables_validation() {
        let annotations = method_annotations(
            "class A { @SuppressWarnings(\"InlineMe\") @NoValidation(reason = \"legacy\") void a() { b(); } void b() {} }",
        );
        assert_eq!(disable_reason(&annotations).as_deref(), Some("legacy"));
        let suppressed = method_annotations(
            "class A { @SuppressWarnings(\"InlineMe\") void a() { b(); } void b() {} }",
        );
        assert_eq!(disable_reason(&suppressed), None);
    }

    #[test]
    fn authored_targets_split_on_hash() {
        let authored = AuthoredTemplate {
            method: "com.acme.Client#before".into(),
            replacement: "this.after()".into(),
            imports: Vec::new(),
            static_imports: Vec::new(),
            validation_disabled_reason: None,
        };
        assert_eq!(authored.target(), Some(("com.acme.Client", "before")));
    }
}
