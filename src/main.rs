use inliner::cli;

fn main() -> anyhow::Result<()> {
    if let Err(e) = cli::run() {
        let msg = e.to_string();
        // Rejected templates have already been reported as diagnostics.
        if msg.contains("template validation failed") {
            std::process::exit(1);
        }
        #[expect(clippy::print_stderr, reason = "Errors before logging is set up")]
        {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![expect(clippy::panic, reason = "Panicking on test failures is acceptable")]

    use clap::Parser;
    use inliner::cli::{Command, InlinerCli};

    #[test]
    fn inline_command_honors_write_flag() {
        let cli = InlinerCli::parse_from(["inliner", "inline", "src/main/java", "--write"]);
        match cli.command() {
            Command::Inline { paths, write } => {
                assert_eq!(paths.len(), 1);
                assert_eq!(paths[0].to_string_lossy(), "src/main/java");
                assert!(*write);
            }
            other => panic!("expected inline command, got {other:?}"),
        }
    }

    #[test]
    fn paths_default_to_the_working_directory() {
        let cli = InlinerCli::parse_from(["inliner", "validate", "--config", "ci/inliner.json"]);
        match cli.command() {
            Command::Validate { paths } => {
                assert_eq!(paths.len(), 1);
                assert_eq!(paths[0].to_string_lossy(), ".");
            }
            other => panic!("expected validate command, got {other:?}"),
        }
        assert_eq!(
            cli.config_path().map(|p| p.to_string_lossy().into_owned()),
            Some("ci/inliner.json".into())
        );
    }
}
