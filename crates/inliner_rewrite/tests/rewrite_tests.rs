#![expect(clippy::panic, reason = "Panicking on test failures is acceptable")]

use inliner_rewrite::{FileRewrite, RewriteConfig, RewriteError, Rewriter, scan_file};
use inliner_symbol::{DeclId, SourceFile, SourceIndex};
use inliner_template::{
    TemplateOwner, TemplateRegistry, ValidatedTemplate, extract, from_declaration, validate,
};

const CLIENT: &str = "package com.acme;

public class Client {
    public Client noOp() { return this; }
    public Client bar() { return this; }
    public void after(int... inputs) {}
    public void before(int... inputs) { this.after(inputs); }
    public void ignoreVarargs(int first, int... inputs) { this.after(first); }
    public static int timesTwo(int x) { return x * 2; }
    public static int helper(int v) { return v; }
    public static int addOne(int x) { return helper(x) + 1; }
    public void fresh(String name) {}
    public void stale(String name) { this.fresh(name); }
    public void tidy(String name) { this.fresh(name.trim()); }
    public Client shout() { return this.bar(); }
    public static Client make() { return new Client(); }
    public int plain(int x) { return x + 1; }
}
";

const POINT: &str = "package com.acme;

public class Point {
    public Point(int x) { this(x, 0); }
    public Point(int x, int y) {}
}
";

const CHECKS: &str = "package com.acme;

import java.util.Objects;

public class Checks {
    @InlineMe(replacement = \"Objects.requireNonNull(value)\", imports = {\"java.util.Objects\"})
    public static String check(String value) { return Objects.requireNonNull(value); }
}
";

const APP: &str = "package app;

import com.acme.Client;
import java.util.List;

class App {
    void run(Client client, List<String> names) {
        new Client().noOp().bar();
        client.noOp();
        client.before(1);
        client.before();
        client.before(1, 2, 3);
        client.ignoreVarargs(42, 1, 2, 3);
        int y = Client.timesTwo(1 + 1);
        int z = Client.timesTwo(4) + 1;
        Client same = client.noOp();
        names.forEach(client::stale);
        names.forEach(client::tidy);
    }
}
";

const EXTRACTED: [(&str, &str); 11] = [
    ("com.acme.Client", "noOp"),
    ("com.acme.Client", "before"),
    ("com.acme.Client", "ignoreVarargs"),
    ("com.acme.Client", "timesTwo"),
    ("com.acme.Client", "addOne"),
    ("com.acme.Client", "stale"),
    ("com.acme.Client", "tidy"),
    ("com.acme.Client", "shout"),
    ("com.acme.Client", "plain"),
    ("com.acme.Point", "Point"),
    ("com.acme.Checks", "check"),
];

struct Project {
    index: SourceIndex,
    registry: TemplateRegistry,
}

fn trusted(index: &SourceIndex, id: DeclId) -> ValidatedTemplate {
    let (owner, cx) = TemplateOwner::from_index(index, id).expect("callable");
    let template = match from_declaration(owner, index, cx) {
        Some(authored) => authored.expect("authored template builds"),
        None => {
            let (owner, cx) = TemplateOwner::from_index(index, id).expect("callable");
            extract(owner, index, cx).expect("template extracts")
        }
    };
    let report = validate(template, index, cx);
    report
        .template
        .unwrap_or_else(|| panic!("template rejected: {:?}", report.errors))
}

impl Project {
    fn new(files: &[(&str, &str)]) -> Self {
        let mut all = vec![
            ("com/acme/Client.java", CLIENT),
            ("com/acme/Point.java", POINT),
            ("com/acme/Checks.java", CHECKS),
        ];
        all.extend_from_slice(files);
        let sources = all
            .iter()
            .map(|(path, text)| SourceFile::parse(*path, *text).expect("fixture parses"))
            .collect();
        let index = SourceIndex::build(sources);
        let mut registry = TemplateRegistry::new();
        for (ty, name) in EXTRACTED {
            let id = *index
                .callables_named(ty, name)
                .first()
                .unwrap_or_else(|| panic!("no callable {ty}#{name}"));
            registry.insert(trusted(&index, id));
        }
        Self { index, registry }
    }

    fn rewrite_with(&self, path: &str, config: RewriteConfig) -> FileRewrite {
        let file = self.index.file_by_path(path).expect("file is indexed");
        let source = self.index.file(file).expect("source");
        let sites = scan_file(&self.index, &self.registry, file, source);
        Rewriter::new(&self.index, &self.registry, config).rewrite_file(source, file, &sites)
    }

    fn rewrite(&self, path: &str) -> FileRewrite {
        self.rewrite_with(path, RewriteConfig::default())
    }

    fn rewritten(&self, path: &str) -> String {
        let file = self.index.file_by_path(path).expect("file is indexed");
        let text = &self.index.file(file).expect("source").text;
        self.rewrite(path).apply(text).expect("edits apply")
    }
}

#[test]
fn fluent_no_ops_collapse() {
    let out = Project::new(&[("app/App.java", APP)]).rewritten("app/App.java");
    assert!(out.contains("        new Client().bar();\n"), "{out}");
    assert!(out.contains("        Client same = client;\n"), "{out}");
    assert!(!out.contains("noOp"), "{out}");
}

#[test]
fn varargs_forward_and_drop() {
    let out = Project::new(&[("app/App.java", APP)]).rewritten("app/App.java");
    assert!(out.contains("        client.after(1);\n"), "{out}");
    assert!(out.contains("        client.after();\n"), "{out}");
    assert!(out.contains("        client.after(1, 2, 3);\n"), "{out}");
    assert!(out.contains("        client.after(42);\n"), "{out}");
}

#[test]
fn arguments_and_results_keep_precedence() {
    let out = Project::new(&[("app/App.java", APP)]).rewritten("app/App.java");
    assert!(out.contains("int y = (1 + 1) * 2;"), "{out}");
    assert!(out.contains("int z = 4 * 2 + 1;"), "{out}");
}

#[test]
fn method_references_are_renamed_or_become_lambdas() {
    let out = Project::new(&[("app/App.java", APP)]).rewritten("app/App.java");
    assert!(out.contains("names.forEach(client::fresh);"), "{out}");
    assert!(out.contains("names.forEach(name -> client.fresh(name.trim()));"), "{out}");
}

#[test]
fn stats_count_every_site() {
    let rewrite = Project::new(&[("app/App.java", APP)]).rewrite("app/App.java");
    assert_eq!(rewrite.conflict, None);
    assert_eq!(rewrite.stats.attempted, 11);
    assert_eq!(rewrite.stats.applied, 11);
    assert_eq!(rewrite.stats.failed, 0);
    assert_eq!(rewrite.stats.elided, 2);
}

#[test]
fn rewriting_is_idempotent() {
    let out = Project::new(&[("app/App.java", APP)]).rewritten("app/App.java");
    let again = Project::new(&[("app/App.java", out.as_str())]);
    let rewrite = again.rewrite("app/App.java");
    assert_eq!(rewrite.stats.attempted, 0);
    assert!(!rewrite.is_changed());
}

#[test]
fn constructors_and_delegations() {
    const SHAPES: &str = "package app;

import com.acme.Point;

class Spot extends Point {
    Spot() {
        super(5);
    }

    Point make() {
        return new Point(3);
    }
}
";
    let out = Project::new(&[("app/Spot.java", SHAPES)]).rewritten("app/Spot.java");
    assert!(out.contains("        super(5, 0);\n"), "{out}");
    assert!(out.contains("return new Point(3, 0);"), "{out}");
}

#[test]
fn missing_imports_are_added() {
    const PLAIN: &str = "package app;

import com.acme.Checks;

class Plain {
    String run(String s) {
        return Checks.check(s);
    }
}
";
    let out = Project::new(&[("app/Plain.java", PLAIN)]).rewritten("app/Plain.java");
    assert_eq!(
        out,
        "package app;

import com.acme.Checks;
import java.util.Objects;

class Plain {
    String run(String s) {
        return Objects.requireNonNull(s);
    }
}
"
    );
}

#[test]
fn occupied_names_are_qualified() {
    const CLASH: &str = "package app;

import com.acme.Checks;
import org.other.Objects;

class Clash {
    String run(String s) {
        return Checks.check(s);
    }
}
";
    let out = Project::new(&[("app/Clash.java", CLASH)]).rewritten("app/Clash.java");
    assert!(out.contains("return java.util.Objects.requireNonNull(s);"), "{out}");
    assert!(!out.contains("import java.util.Objects;"), "{out}");
}

#[test]
fn qualification_can_replace_imports() {
    const PLAIN: &str = "package app;

import com.acme.Checks;

class Plain {
    String run(String s) {
        return Checks.check(s);
    }
}
";
    let config = RewriteConfig {
        add_imports: false,
        ..RewriteConfig::default()
    };
    let project = Project::new(&[("app/Plain.java", PLAIN)]);
    let rewrite = project.rewrite_with("app/Plain.java", config);
    let text = &project.index.file(rewrite.file).expect("source").text;
    let out = rewrite.apply(text).expect("edits apply");
    assert!(out.contains("return java.util.Objects.requireNonNull(s);"), "{out}");
    assert!(!out.contains("import java.util.Objects;"), "{out}");
}

#[test]
fn static_imports_gain_the_owner_as_qualifier() {
    const STATICS: &str = "package app;

import static com.acme.Client.addOne;

class Statics {
    int run() {
        return addOne(3);
    }
}
";
    let out = Project::new(&[("app/Statics.java", STATICS)]).rewritten("app/Statics.java");
    assert!(
        out.contains("import static com.acme.Client.addOne;\nimport com.acme.Client;\n"),
        "{out}"
    );
    assert!(out.contains("return Client.helper(3) + 1;"), "{out}");
}

#[test]
fn failed_sites_leave_their_siblings_alone() {
    const MIXED: &str = "package app;

import com.acme.Client;

class Mixed {
    void run(Client client) {
        Client.timesTwo(3);
        client.before(7);
    }
}
";
    let project = Project::new(&[("app/Mixed.java", MIXED)]);
    let rewrite = project.rewrite("app/Mixed.java");
    assert_eq!(rewrite.stats.failed, 1);
    assert_eq!(rewrite.stats.applied, 1);
    let Some((_, error)) = rewrite.failures.first() else {
        panic!("expected one failure");
    };
    assert!(matches!(error, RewriteError::NotAStatement(_)), "{error:?}");
    let out = project.rewritten("app/Mixed.java");
    assert!(out.contains("        Client.timesTwo(3);\n"), "{out}");
    assert!(out.contains("        client.after(7);\n"), "{out}");
}

#[test]
fn overlapping_sites_discard_the_file() {
    const NESTED: &str = "package app;

import com.acme.Client;

class Nested {
    int run() {
        return Client.timesTwo(Client.timesTwo(1));
    }
}
";
    let rewrite = Project::new(&[("app/Nested.java", NESTED)]).rewrite("app/Nested.java");
    let Some(conflict) = &rewrite.conflict else {
        panic!("expected a batch conflict");
    };
    let diagnostic = conflict.to_diagnostic("app/Nested.java");
    assert!(
        diagnostic.help().is_some_and(|help| help.contains("inline the inner call by hand")),
        "{diagnostic}"
    );
    assert!(rewrite.edits.is_empty());
    assert_eq!(rewrite.stats.conflicts, 1);
    assert_eq!(rewrite.stats.applied, 0);
}

#[test]
fn legacy_output_skips_context_parentheses() {
    const LOOSE: &str = "package app;

import com.acme.Client;

class Loose {
    int run() {
        return 3 * Client.timesTwo(4);
    }
}
";
    let project = Project::new(&[("app/Loose.java", LOOSE)]);
    let out = project.rewritten("app/Loose.java");
    assert!(out.contains("return 3 * (4 * 2);"), "{out}");

    let config = RewriteConfig {
        parenthesize_in_context: false,
        ..RewriteConfig::default()
    };
    let rewrite = project.rewrite_with("app/Loose.java", config);
    let text = &project.index.file(rewrite.file).expect("source").text;
    let out = rewrite.apply(text).expect("edits apply");
    assert!(out.contains("return 3 * 4 * 2;"), "{out}");
}

#[test]
fn sole_statement_bodies_keep_a_statement() {
    const LOOPS: &str = "package app;

import com.acme.Client;

class Loops {
    void run(Client client, boolean flag) {
        if (flag) client.noOp();
        else client.bar();
        while (flag) client.noOp();
        do client.noOp(); while (flag);
        client.noOp();
    }
}
";
    let project = Project::new(&[("app/Loops.java", LOOPS)]);
    let rewrite = project.rewrite("app/Loops.java");
    assert_eq!(rewrite.stats.elided, 4);
    let out = project.rewritten("app/Loops.java");
    assert!(out.contains("        if (flag) {}\n        else client.bar();\n"), "{out}");
    assert!(out.contains("        while (flag) {}\n"), "{out}");
    assert!(out.contains("        do {} while (flag);\n"), "{out}");
    assert!(!out.contains("noOp"), "{out}");
}

#[test]
fn lambda_bodies_only_take_statement_expressions() {
    const LAMBDAS: &str = "package app;

import com.acme.Client;
import java.util.List;

class Lambdas {
    void run(Client client, List<String> names) {
        names.forEach(n -> client.noOp());
        names.forEach(n -> client.before(1));
    }
}
";
    let project = Project::new(&[("app/Lambdas.java", LAMBDAS)]);
    let rewrite = project.rewrite("app/Lambdas.java");
    assert_eq!(rewrite.stats.failed, 1);
    assert_eq!(rewrite.stats.applied, 1);
    let Some((_, error)) = rewrite.failures.first() else {
        panic!("expected one failure");
    };
    assert!(matches!(error, RewriteError::ValueLambdaBody(_)), "{error:?}");
    let out = project.rewritten("app/Lambdas.java");
    assert!(out.contains("names.forEach(n -> client.noOp());"), "{out}");
    assert!(out.contains("names.forEach(n -> client.after(1));"), "{out}");
}

#[test]
fn receivers_with_side_effects_are_not_dropped() {
    const MAKERS: &str = "package app;

import com.acme.Client;

class Makers {
    int run(Client client) {
        int kept = client.plain(1);
        return Client.make().plain(2);
    }
}
";
    let project = Project::new(&[("app/Makers.java", MAKERS)]);
    let rewrite = project.rewrite("app/Makers.java");
    assert_eq!(rewrite.stats.failed, 1);
    let Some((_, error)) = rewrite.failures.first() else {
        panic!("expected one failure");
    };
    assert_eq!(error, &RewriteError::DroppedReceiver("Client.make()".to_string()));
    let out = project.rewritten("app/Makers.java");
    assert!(out.contains("int kept = 1 + 1;"), "{out}");
    assert!(out.contains("return Client.make().plain(2);"), "{out}");
}

#[test]
fn spliced_receivers_keep_their_parentheses() {
    const LOUD: &str = "package app;

import com.acme.Client;

class Loud {
    Client run(Client client, Client other, boolean flag) {
        return (flag ? client : other).shout();
    }
}
";
    let out = Project::new(&[("app/Loud.java", LOUD)]).rewritten("app/Loud.java");
    assert!(out.contains("return (flag ? client : other).bar();"), "{out}");
}
