//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use stackweave::output::OutputConfig;

/// stackweave - Wire a frontend stack into a project, idempotently
#[derive(Parser, Debug)]
#[command(name = "stackweave")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install the frontend stack into a project
    Install(commands::install::InstallArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // A logger may already be installed when embedded; keep it.
        let _ = env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .format_timestamp(None)
            .try_init();

        let out = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Install(args) => commands::install::execute(args, &out),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install_flags() {
        let cli = Cli::try_parse_from([
            "stackweave",
            "install",
            "--framework",
            "vue",
            "--typescript=false",
            "--ssr",
            "-y",
        ])
        .unwrap();
        let Commands::Install(args) = cli.command else {
            panic!("expected install");
        };
        assert_eq!(args.framework.as_deref(), Some("vue"));
        assert_eq!(args.typescript.as_deref(), Some("false"));
        assert_eq!(args.ssr.as_deref(), Some("true"));
        assert!(args.yes);
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["stackweave", "completions", "fish"]).unwrap();
        assert!(matches!(cli.command, Commands::Completions(_)));
        assert!(Cli::try_parse_from(["stackweave", "completions", "tcsh"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["stackweave", "install", "--color", "never", "--log-level", "debug"])
                .unwrap();
        assert_eq!(cli.color, "never");
        assert_eq!(cli.log_level, "debug");
    }
}
