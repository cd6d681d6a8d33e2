#![expect(clippy::print_stdout, reason = "Reports are the command output")]

use std::env;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inliner_utils::logger;
use tracing::{debug, warn};

use crate::config::InlinerConfig;
use crate::session::{Session, TemplateSet, config_dir};

#[derive(Parser, Debug)]
#[command(
    name = "inliner",
    version,
    about = "Inline deprecated APIs at their call sites"
)]
pub struct InlinerCli {
    #[arg(long, global = true, value_name = "file")]
    /// Configuration file (defaults to inliner.yaml next to the sources).
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    /// Try to extract templates from deprecated methods that declare none.
    extract_deprecated: bool,

    #[arg(long, global = true)]
    /// Display phase timing information.
    time: bool,

    #[command(subcommand)]
    command: Command,
}

impl InlinerCli {
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a template attribute for every deprecated method that could carry one.
    Suggest {
        /// Source files or directories (defaults to the current directory)
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
    },
    /// Check every declared template and report the rules it breaks.
    Validate {
        /// Source files or directories (defaults to the current directory)
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
    },
    /// Replace call sites of templated methods with their templates.
    Inline {
        /// Source files or directories (defaults to the current directory)
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
        /// Write changed files in place instead of printing them.
        #[arg(short, long)]
        write: bool,
    },
}

impl Command {
    fn paths(&self) -> &[PathBuf] {
        match self {
            Command::Suggest { paths } | Command::Validate { paths } | Command::Inline { paths, .. } => paths,
        }
    }
}

struct Timings(Vec<(&'static str, Duration)>);

impl Timings {
    fn measure<T>(&mut self, name: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let value = f();
        self.0.push((name, start.elapsed()));
        value
    }

    fn print(&self) {
        println!("\nTimings:");
        let total: Duration = self.0.iter().map(|(_, duration)| *duration).sum();
        for (name, duration) in &self.0 {
            let pct = if total.as_secs_f64() > 0.0 {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            } else {
                0.0
            };
            println!(
                "  {:20} {:8.2}ms ({:5.1}%)",
                name,
                duration.as_secs_f64() * 1000.0,
                pct
            );
        }
    }
}

pub fn run() -> Result<()> {
    logger::init_logging();
    let cli = InlinerCli::parse();

    let paths = cli.command.paths();
    let cwd = env::current_dir().context("failed to read the working directory")?;
    let mut config = InlinerConfig::load(cli.config_path(), &cwd.join(config_dir(paths)))
        .context("failed to load configuration")?;
    config.extract_from_deprecated |= cli.extract_deprecated;

    let mut timings = Timings(Vec::new());
    let session = timings.measure("parse", || Session::open(paths, config))?;
    for failure in session.skipped() {
        session.emit(&failure.diagnostics);
    }
    debug!(
        files = session.index().file_ids().count(),
        skipped = session.skipped().len(),
        "opened session"
    );

    let result = match &cli.command {
        Command::Suggest { .. } => {
            timings.measure("suggest", || handle_suggest(&session));
            Ok(())
        }
        Command::Validate { .. } => {
            let templates = timings.measure("validate", || session.collect_templates());
            handle_validate(&session, &templates)
        }
        Command::Inline { write, .. } => {
            let templates = timings.measure("validate", || session.collect_templates());
            timings.measure("inline", || handle_inline(&session, &templates, *write))
        }
    };

    if cli.time {
        timings.print();
    }
    result
}

fn handle_suggest(session: &Session) {
    let suggestions = session.suggestions();
    if suggestions.is_empty() {
        println!("no deprecated method has an inlinable body");
    }
    for suggestion in suggestions {
        println!("{} ({}):", suggestion.method, suggestion.path);
        println!("    {}", suggestion.attribute);
    }
}

fn report_unresolved(templates: &TemplateSet) {
    for unresolved in &templates.unresolved {
        warn!("configured template skipped: {unresolved}");
    }
}

fn handle_validate(session: &Session, templates: &TemplateSet) -> Result<()> {
    report_unresolved(templates);
    session.emit(&session.validation_diagnostics(templates));

    let rejected = templates.rejected().count();
    println!(
        "{} template(s) checked, {} trusted, {} rejected",
        templates.reports.len(),
        templates.registry.len(),
        rejected
    );
    if rejected > 0 {
        bail!("template validation failed");
    }
    Ok(())
}

fn handle_inline(session: &Session, templates: &TemplateSet, write: bool) -> Result<()> {
    report_unresolved(templates);
    if templates.rejected().next().is_some() {
        session.emit(&session.validation_diagnostics(templates));
    }

    let outcome = session.inline(templates)?;
    for file in &outcome.files {
        session.emit(&file.diagnostics());
    }

    if write {
        let written = outcome.write()?;
        println!("rewrote {written} file(s)");
    } else {
        for (path, text) in outcome.changed() {
            println!("== {path} ==");
            print!("{text}");
        }
    }

    let stats = outcome.stats;
    println!(
        "{} call site(s): {} inlined, {} failed, {} elided, {} file(s) left untouched by conflicts",
        stats.attempted, stats.applied, stats.failed, stats.elided, stats.conflicts
    );
    Ok(())
}
