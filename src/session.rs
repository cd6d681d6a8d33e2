//! One run over a set of sources: parse and index them, gather and validate
//! templates, then rewrite every file's call sites in parallel.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashSet;
use anyhow::{Context, Result};
use inliner_rewrite::{FileRewrite, RewriteStats, Rewriter, scan_file};
use inliner_span::{FileId, Span};
use inliner_symbol::{DeclId, ResolutionContext, SourceFile, SourceIndex, SymbolService};
use inliner_template::{
    MethodTemplate, TemplateOwner, TemplateRegistry, ValidationError, ValidationReport, extract,
    from_attributes, from_declaration, suggest, validate,
};
use inliner_utils::errors::{Diagnostic, emit_diagnostics};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::InlinerConfig;

/// Expand directories into the `.java` files below them.
pub fn discover_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let pattern = path.join("**").join("*.java");
            let pattern = pattern.to_string_lossy();
            for entry in glob::glob(&pattern).with_context(|| format!("invalid source pattern {pattern}"))? {
                files.push(entry.context("failed to walk source directory")?);
            }
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

pub fn read_sources(paths: &[PathBuf]) -> Result<Vec<(String, String)>> {
    discover_sources(paths)?
        .into_iter()
        .map(|path| {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok((path.display().to_string(), text))
        })
        .collect()
}

/// A file left out of the run because it does not parse.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub path: String,
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Templates gathered for a run, trusted or not.
#[derive(Debug, Default)]
pub struct TemplateSet {
    pub registry: TemplateRegistry,
    pub reports: Vec<ValidationReport>,
    /// Configured templates whose target could not be pinned down.
    pub unresolved: Vec<String>,
}

impl TemplateSet {
    pub fn rejected(&self) -> impl Iterator<Item = &ValidationReport> {
        self.reports.iter().filter(|report| !report.is_accepted())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub path: String,
    pub span: Span,
    pub method: String,
    pub attribute: String,
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: String,
    pub rewrite: FileRewrite,
    /// New text of the file; `None` when nothing changed.
    pub rewritten: Option<String>,
}

impl FileOutcome {
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = self
            .rewrite
            .failures
            .iter()
            .map(|(span, error)| error.to_diagnostic(&self.path, *span))
            .collect();
        if let Some(conflict) = &self.rewrite.conflict {
            diagnostics.push(conflict.to_diagnostic(&self.path));
        }
        diagnostics
    }
}

#[derive(Debug, Clone, Default)]
pub struct InlineOutcome {
    pub files: Vec<FileOutcome>,
    pub stats: RewriteStats,
}

impl InlineOutcome {
    pub fn changed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files
            .iter()
            .filter_map(|file| Some((file.path.as_str(), file.rewritten.as_deref()?)))
    }

    /// Write every changed file back to its path. Returns how many were
    /// written.
    pub fn write(&self) -> Result<usize> {
        let mut written = 0;
        for (path, text) in self.changed() {
            fs::write(path, text).with_context(|| format!("failed to write {path}"))?;
            written += 1;
        }
        Ok(written)
    }
}

pub struct Session {
    index: SourceIndex,
    config: InlinerConfig,
    skipped: Vec<ParseFailure>,
}

impl Session {
    /// Parse `(path, text)` pairs. Files that do not parse are set aside
    /// with their diagnostics; the rest are indexed together.
    pub fn new(files: Vec<(String, String)>, config: InlinerConfig) -> Self {
        let parsed: Vec<Result<SourceFile, ParseFailure>> = files
            .into_par_iter()
            .map(|(path, text)| match SourceFile::parse(path.clone(), text.clone()) {
                Ok(source) => Ok(source),
                Err(error) => Err(ParseFailure {
                    diagnostics: error.to_diagnostics(&path),
                    path,
                    text,
                }),
            })
            .collect();
        let mut sources = Vec::with_capacity(parsed.len());
        let mut skipped = Vec::new();
        for result in parsed {
            match result {
                Ok(source) => sources.push(source),
                Err(failure) => {
                    warn!(path = %failure.path, "skipping file that does not parse");
                    skipped.push(failure);
                }
            }
        }
        Self {
            index: SourceIndex::build(sources),
            config,
            skipped,
        }
    }

    pub fn open(paths: &[PathBuf], config: InlinerConfig) -> Result<Self> {
        Ok(Self::new(read_sources(paths)?, config))
    }

    pub fn index(&self) -> &SourceIndex {
        &self.index
    }

    pub fn config(&self) -> &InlinerConfig {
        &self.config
    }

    pub fn skipped(&self) -> &[ParseFailure] {
        &self.skipped
    }

    fn path_of(&self, file: FileId) -> &str {
        self.index.file(file).map_or("<unknown>", |source| source.path.as_str())
    }

    fn method_name(&self, id: DeclId) -> String {
        self.index
            .declaration(id)
            .map(|decl| decl.qualified_name.clone().unwrap_or_else(|| decl.display_name()))
            .unwrap_or_else(|| id.to_string())
    }

    fn judge(
        &self,
        id: DeclId,
        cx: ResolutionContext,
        built: Result<MethodTemplate, ValidationError>,
        set: &mut TemplateSet,
    ) {
        let report = match built {
            Ok(template) => validate(template, &self.index, cx),
            Err(error) => ValidationReport {
                owner: id,
                span: self.index.declaration(id).map_or_else(Span::default, |decl| decl.span),
                errors: vec![error],
                warnings: Vec::new(),
                note: None,
                template: None,
            },
        };
        if let Some(template) = &report.template {
            set.registry.insert(template.clone());
        } else {
            debug!(method = %self.method_name(id), errors = report.errors.len(), "template rejected");
        }
        set.reports.push(report);
    }

    /// Configured templates first, then template attributes in the sources,
    /// then, when enabled, extraction from deprecated methods. The first
    /// source that names a method decides its template.
    pub fn collect_templates(&self) -> TemplateSet {
        let mut set = TemplateSet::default();
        let mut claimed = AHashSet::new();

        for authored in &self.config.templates {
            let Some((ty, name)) = authored.target() else {
                set.unresolved.push(format!("`{}` is not of the form `pkg.Type#member`", authored.method));
                continue;
            };
            let id = match self.index.callables_named(ty, name).as_slice() {
                [id] => *id,
                [] => {
                    set.unresolved.push(format!("no method or constructor `{}`", authored.method));
                    continue;
                }
                _ => {
                    set.unresolved.push(format!("`{}` is overloaded", authored.method));
                    continue;
                }
            };
            let Some((owner, cx)) = TemplateOwner::from_index(&self.index, id) else {
                continue;
            };
            let reason = authored.validation_disabled_reason.clone();
            let built = from_attributes(authored, owner, &self.index, cx, reason);
            claimed.insert(id);
            self.judge(id, cx, built, &mut set);
        }

        for decl in self.index.declarations() {
            if !decl.kind.is_callable() || claimed.contains(&decl.id) {
                continue;
            }
            let Some((owner, cx)) = TemplateOwner::from_index(&self.index, decl.id) else {
                continue;
            };
            if let Some(built) = from_declaration(owner, &self.index, cx) {
                self.judge(decl.id, cx, built, &mut set);
            } else if self.config.extract_from_deprecated && decl.deprecated {
                match extract(owner, &self.index, cx) {
                    Ok(template) => self.judge(decl.id, cx, Ok(template), &mut set),
                    Err(error) => debug!(method = %self.method_name(decl.id), %error, "nothing to extract"),
                }
            }
        }

        info!(
            trusted = set.registry.len(),
            rejected = set.rejected().count(),
            "collected templates"
        );
        set
    }

    /// Attribute text for each deprecated method that declares no template
    /// but has one that would validate.
    pub fn suggestions(&self) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();
        for decl in self.index.declarations() {
            if !decl.kind.is_callable() || !decl.deprecated {
                continue;
            }
            let Some((owner, cx)) = TemplateOwner::from_index(&self.index, decl.id) else {
                continue;
            };
            if from_declaration(owner, &self.index, cx).is_some() {
                continue;
            }
            let Ok(template) = extract(owner, &self.index, cx) else {
                continue;
            };
            let report = validate(template, &self.index, cx);
            if let Some(template) = &report.template {
                suggestions.push(Suggestion {
                    path: self.path_of(decl.file).to_string(),
                    span: decl.span,
                    method: self.method_name(decl.id),
                    attribute: suggest(template),
                });
            }
        }
        suggestions
    }

    pub fn validation_diagnostics(&self, templates: &TemplateSet) -> Vec<Diagnostic> {
        templates
            .reports
            .iter()
            .flat_map(|report| {
                let file = self.index.declaration(report.owner).map(|decl| decl.file);
                let path = file.map_or("<unknown>", |file| self.path_of(file));
                report.to_diagnostics(path)
            })
            .collect()
    }

    fn inline_file(&self, file: FileId, registry: &TemplateRegistry) -> Result<FileOutcome> {
        let source = self
            .index
            .file(file)
            .with_context(|| format!("file {file} is not indexed"))?;
        let sites = scan_file(&self.index, registry, file, source);
        let rewriter = Rewriter::new(&self.index, registry, self.config.rewrite);
        let rewrite = rewriter.rewrite_file(source, file, &sites);
        let rewritten = if rewrite.is_changed() {
            Some(
                rewrite
                    .apply(&source.text)
                    .with_context(|| format!("failed to apply edits to {}", source.path))?,
            )
        } else {
            None
        };
        Ok(FileOutcome {
            path: source.path.clone(),
            rewrite,
            rewritten,
        })
    }

    /// Rewrite the call sites of every trusted template. Nothing is written.
    pub fn inline(&self, templates: &TemplateSet) -> Result<InlineOutcome> {
        let files: Vec<FileId> = self.index.file_ids().collect();
        let outcomes = files
            .par_iter()
            .map(|file| self.inline_file(*file, &templates.registry))
            .collect::<Result<Vec<_>>>()?;
        let mut stats = RewriteStats::default();
        for outcome in &outcomes {
            stats += outcome.rewrite.stats;
        }
        info!(
            files = outcomes.len(),
            attempted = stats.attempted,
            applied = stats.applied,
            failed = stats.failed,
            elided = stats.elided,
            conflicts = stats.conflicts,
            "inlined call sites"
        );
        Ok(InlineOutcome {
            files: outcomes,
            stats,
        })
    }

    /// Print diagnostics against the text of the file they belong to.
    pub fn emit(&self, diagnostics: &[Diagnostic]) {
        let mut by_file: BTreeMap<&str, Vec<Diagnostic>> = BTreeMap::new();
        for diagnostic in diagnostics {
            by_file
                .entry(diagnostic.source_id())
                .or_default()
                .push(diagnostic.clone());
        }
        for (path, diagnostics) in by_file {
            let text = self
                .index
                .file_by_path(path)
                .and_then(|file| self.index.file(file))
                .map(|source| source.text.as_str())
                .or_else(|| {
                    self.skipped
                        .iter()
                        .find(|failure| failure.path == path)
                        .map(|failure| failure.text.as_str())
                })
                .unwrap_or_default();
            emit_diagnostics(&diagnostics, text);
        }
    }
}

/// Directory the implicit configuration file is looked up in.
pub fn config_dir(paths: &[PathBuf]) -> &Path {
    match paths {
        [only] if only.is_dir() => only.as_path(),
        _ => Path::new("."),
    }
}
