#![expect(clippy::panic, reason = "Panicking on test failures is acceptable")]

use std::fs;
use std::path::{Path, PathBuf};

use inliner::config::{ConfigFormat, InlinerConfig};
use inliner::session::{Session, discover_sources};
use inliner_template::ValidationRule;

const CLIENT: &str = "package com.acme;

public class Client {
    public void after(String name) {}

    @Deprecated
    public void before(String name) { this.after(name); }
}
";

const APP: &str = "package app;

import com.acme.Client;

class App {
    void run(Client client) {
        client.before(\"x\");
        client.after(\"y\");
    }
}
";

const RENAME: &str = "templates:
  - method: com.acme.Client#before
    replacement: this.after(name)
";

fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, text) in files {
        let path = root.join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create source directory");
        }
        fs::write(&path, text).expect("write source");
    }
}

fn rename_config() -> InlinerConfig {
    InlinerConfig::parse(RENAME, ConfigFormat::Yaml).expect("valid config")
}

fn in_memory(files: &[(&str, &str)], config: InlinerConfig) -> Session {
    let files = files
        .iter()
        .map(|(path, text)| ((*path).to_string(), (*text).to_string()))
        .collect();
    Session::new(files, config)
}

#[test]
fn configured_templates_rewrite_call_sites() {
    let session = in_memory(
        &[("com/acme/Client.java", CLIENT), ("app/App.java", APP)],
        rename_config(),
    );
    let templates = session.collect_templates();
    assert_eq!(templates.registry.len(), 1);
    assert!(templates.unresolved.is_empty());

    let outcome = session.inline(&templates).expect("inline");
    assert_eq!(outcome.stats.attempted, 1);
    assert_eq!(outcome.stats.applied, 1);
    let changed: Vec<(&str, &str)> = outcome.changed().collect();
    let [(path, text)] = changed.as_slice() else {
        panic!("expected one changed file, got {changed:?}");
    };
    assert_eq!(*path, "app/App.java");
    assert!(text.contains("        client.after(\"x\");\n"), "{text}");
    assert!(!text.contains("before"), "{text}");
}

#[test]
fn deprecated_methods_need_a_template_or_extraction() {
    let files = [("com/acme/Client.java", CLIENT), ("app/App.java", APP)];
    let session = in_memory(&files, InlinerConfig::default());
    let templates = session.collect_templates();
    assert!(templates.registry.is_empty());
    let outcome = session.inline(&templates).expect("inline");
    assert_eq!(outcome.changed().count(), 0);

    let config = InlinerConfig {
        extract_from_deprecated: true,
        ..InlinerConfig::default()
    };
    let session = in_memory(&files, config);
    let templates = session.collect_templates();
    assert_eq!(templates.registry.len(), 1);
    assert_eq!(session.inline(&templates).expect("inline").stats.applied, 1);
}

#[test]
fn unresolved_configured_targets_are_reported() {
    let config = InlinerConfig::parse(
        "templates:\n  - method: com.acme.Client#gone\n    replacement: this.after(name)\n",
        ConfigFormat::Yaml,
    )
    .expect("valid config");
    let session = in_memory(&[("com/acme/Client.java", CLIENT)], config);
    let templates = session.collect_templates();
    assert!(templates.registry.is_empty());
    assert_eq!(templates.unresolved.len(), 1);
    assert!(templates.unresolved[0].contains("com.acme.Client#gone"));
}

#[test]
fn malformed_targets_built_in_code_are_reported() {
    let mut config = rename_config();
    config.templates[0].method = "com.acme.Client.before".to_string();
    let session = in_memory(&[("com/acme/Client.java", CLIENT), ("app/App.java", APP)], config);
    let templates = session.collect_templates();
    assert!(templates.registry.is_empty());
    let [unresolved] = templates.unresolved.as_slice() else {
        panic!("expected one unresolved target, got {:?}", templates.unresolved);
    };
    assert!(unresolved.contains("com.acme.Client.before"), "{unresolved}");
}

#[test]
fn written_files_are_stable_on_a_second_run() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_tree(
        dir.path(),
        &[("com/acme/Client.java", CLIENT), ("app/App.java", APP)],
    );
    let roots = vec![dir.path().to_path_buf()];
    let found = discover_sources(&roots).expect("discover");
    assert_eq!(found.len(), 2);

    let session = Session::open(&roots, rename_config()).expect("open");
    let outcome = session.inline(&session.collect_templates()).expect("inline");
    assert_eq!(outcome.write().expect("write"), 1);

    let app: PathBuf = dir.path().join("app/App.java");
    let text = fs::read_to_string(&app).expect("read back");
    assert!(text.contains("client.after(\"x\");"), "{text}");

    let again = Session::open(&roots, rename_config()).expect("reopen");
    let outcome = again.inline(&again.collect_templates()).expect("inline");
    assert_eq!(outcome.stats.attempted, 0);
    assert_eq!(outcome.changed().count(), 0);
}

#[test]
fn private_references_fail_validation() {
    const LEAKY: &str = "package com.acme;

public class Leaky {
    private int count() { return 0; }

    @InlineMe(replacement = \"this.count()\")
    public int size() { return this.count(); }
}
";
    let session = in_memory(&[("com/acme/Leaky.java", LEAKY)], InlinerConfig::default());
    let templates = session.collect_templates();
    assert!(templates.registry.is_empty());
    let rejected: Vec<_> = templates.rejected().collect();
    let [report] = rejected.as_slice() else {
        panic!("expected one rejected template, got {rejected:?}");
    };
    assert!(report.rules().contains(&ValidationRule::Visibility), "{report:?}");

    let diagnostics = session.validation_diagnostics(&templates);
    assert!(!diagnostics.is_empty());
    assert!(
        diagnostics
            .iter()
            .all(|diagnostic| diagnostic.source_id() == "com/acme/Leaky.java")
    );
}

#[test]
fn suggestions_cover_undeclared_deprecated_methods() {
    let session = in_memory(&[("com/acme/Client.java", CLIENT)], InlinerConfig::default());
    let suggestions = session.suggestions();
    let [suggestion] = suggestions.as_slice() else {
        panic!("expected one suggestion, got {suggestions:?}");
    };
    assert_eq!(suggestion.path, "com/acme/Client.java");
    assert_eq!(suggestion.method, "com.acme.Client.before");
    assert_eq!(
        suggestion.attribute,
        "@InlineMe(replacement = \"this.after(name)\")"
    );
}

#[test]
fn unparsable_files_are_skipped() {
    let session = in_memory(
        &[
            ("com/acme/Client.java", CLIENT),
            ("app/Broken.java", "package app;\nclass Broken { void run( }\n"),
            ("app/App.java", APP),
        ],
        rename_config(),
    );
    let [failure] = session.skipped() else {
        panic!("expected one skipped file");
    };
    assert_eq!(failure.path, "app/Broken.java");
    assert!(!failure.diagnostics.is_empty());

    let outcome = session.inline(&session.collect_templates()).expect("inline");
    assert_eq!(outcome.stats.applied, 1);
}
