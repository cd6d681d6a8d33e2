//! In-memory fixtures shared by this crate's tests.

#![expect(clippy::panic, reason = "Panicking on test failures is acceptable")]

use inliner_symbol::{DeclId, SourceFile, SourceIndex};

use crate::attributes::AuthoredTemplate;
use crate::authored::from_attributes;
use crate::extractor::{ExtractError, TemplateOwner, extract};
use crate::template::MethodTemplate;
use crate::validator::{ValidationError, ValidationReport, validate};

pub(crate) struct Fixture {
    pub index: SourceIndex,
}

impl Fixture {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let sources = files
            .iter()
            .map(|(path, text)| SourceFile::parse(*path, *text).expect("fixture parses"))
            .collect();
        Self {
            index: SourceIndex::build(sources),
        }
    }

    /// The `nth` callable named `name` declared in `qualified_type`.
    pub fn callable(&self, qualified_type: &str, name: &str, nth: usize) -> DeclId {
        let found = self.index.callables_named(qualified_type, name);
        *found
            .get(nth)
            .unwrap_or_else(|| panic!("no callable {qualified_type}#{name} [{nth}]"))
    }

    fn owner(&self, qualified_type: &str, name: &str, nth: usize) -> (TemplateOwner<'_>, inliner_symbol::ResolutionContext) {
        let id = self.callable(qualified_type, name, nth);
        TemplateOwner::from_index(&self.index, id).expect("callable has a declaration")
    }

    pub fn extract(&self, qualified_type: &str, name: &str, nth: usize) -> Result<MethodTemplate, ExtractError> {
        let (owner, cx) = self.owner(qualified_type, name, nth);
        extract(owner, &self.index, cx)
    }

    pub fn authored(&self, authored: &AuthoredTemplate) -> Result<MethodTemplate, ValidationError> {
        let (qualified_type, name) = authored.target().expect("authored target");
        let (owner, cx) = self.owner(qualified_type, name, 0);
        from_attributes(authored, owner, &self.index, cx, authored.validation_disabled_reason.clone())
    }

    pub fn validate_extracted(&self, qualified_type: &str, name: &str, nth: usize) -> ValidationReport {
        let (_, cx) = self.owner(qualified_type, name, nth);
        let template = self
            .extract(qualified_type, name, nth)
            .unwrap_or_else(|error| panic!("{qualified_type}#{name} does not extract: {error}"));
        validate(template, &self.index, cx)
    }

    pub fn validate_authored(&self, authored: &AuthoredTemplate) -> ValidationReport {
        let (qualified_type, name) = authored.target().expect("authored target");
        let (_, cx) = self.owner(qualified_type, name, 0);
        let template = self
            .authored(authored)
            .unwrap_or_else(|error| panic!("{} does not build: {error}", authored.method));
        validate(template, &self.index, cx)
    }
}
