//! `inliner.yaml`: rewrite switches and templates supplied outside the
//! sources.

use std::fs;
use std::path::{Path, PathBuf};

use inliner_rewrite::RewriteConfig;
use inliner_template::AuthoredTemplate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "inliner.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("template target `{0}` is not of the form `pkg.Type#member`")]
    BadTarget(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// JSON for `.json` files, YAML otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InlinerConfig {
    pub rewrite: RewriteConfig,
    /// Try to extract templates from deprecated methods that declare none.
    pub extract_from_deprecated: bool,
    /// Authored templates; these win over annotations on the same method.
    pub templates: Vec<AuthoredTemplate>,
}

impl InlinerConfig {
    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: InlinerConfig = match format {
            ConfigFormat::Yaml if text.trim().is_empty() => InlinerConfig::default(),
            ConfigFormat::Yaml => serde_yaml::from_str(text)?,
            ConfigFormat::Json => serde_json::from_str(text)?,
        };
        config.check()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text, ConfigFormat::from_path(path))?;
        debug!(
            path = %path.display(),
            templates = config.templates.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    /// The explicit file if given, else `inliner.yaml` under `dir` when it
    /// exists, else defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        let implicit = dir.join(DEFAULT_CONFIG_FILE);
        if implicit.is_file() {
            Self::from_path(&implicit)
        } else {
            Ok(Self::default())
        }
    }

    fn check(&self) -> Result<(), ConfigError> {
        match self.templates.iter().find(|template| template.target().is_none()) {
            Some(bad) => Err(ConfigError::BadTarget(bad.method.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::panic, reason = "Panicking on test failures is acceptable")]

    use super::*;

    #[test]
    fn every_field_has_a_default() {
        let config = InlinerConfig::parse("", ConfigFormat::Yaml).expect("empty config");
        assert_eq!(config, InlinerConfig::default());
        assert!(config.rewrite.parenthesize_in_context);
        assert!(config.rewrite.add_imports);
        assert!(!config.extract_from_deprecated);
    }

    #[test]
    fn yaml_templates() {
        let text = "rewrite:\n  add_imports: false\nextract_from_deprecated: true\ntemplates:\n  - method: com.acme.Client#before\n    replacement: this.after(x)\n    static_imports: [java.util.Objects.requireNonNull]\n";
        let config = InlinerConfig::parse(text, ConfigFormat::Yaml).expect("valid yaml");
        assert!(!config.rewrite.add_imports);
        assert!(config.rewrite.parenthesize_in_context);
        assert!(config.extract_from_deprecated);
        let [template] = config.templates.as_slice() else {
            panic!("expected one template, got {:?}", config.templates);
        };
        assert_eq!(template.target(), Some(("com.acme.Client", "before")));
        assert_eq!(template.static_imports, vec!["java.util.Objects.requireNonNull"]);
        assert!(template.imports.is_empty());
    }

    #[test]
    fn json_by_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("inliner.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("inliner.yml")), ConfigFormat::Yaml);
        let text = r#"{"templates": [{"method": "a.B#c", "replacement": "d()", "validation_disabled_reason": "legacy"}]}"#;
        let config = InlinerConfig::parse(text, ConfigFormat::Json).expect("valid json");
        assert_eq!(
            config.templates[0].validation_disabled_reason.as_deref(),
            Some("legacy")
        );
    }

    #[test]
    fn unknown_keys_and_bad_targets_are_rejected() {
        assert!(matches!(
            InlinerConfig::parse("rewrite:\n  fancy: true\n", ConfigFormat::Yaml),
            Err(ConfigError::Yaml(_))
        ));
        let bad = "templates:\n  - method: Client.before\n    replacement: x\n";
        assert!(matches!(
            InlinerConfig::parse(bad, ConfigFormat::Yaml),
            Err(ConfigError::BadTarget(target)) if target == "Client.before"
        ));
    }

    #[test]
    fn implicit_file_is_optional() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = InlinerConfig::load(None, dir.path()).expect("defaults");
        assert_eq!(config, InlinerConfig::default());

        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "extract_from_deprecated: true\n")
            .expect("write config");
        let config = InlinerConfig::load(None, dir.path()).expect("implicit file");
        assert!(config.extract_from_deprecated);
    }
}
