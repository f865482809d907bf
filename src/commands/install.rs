//! Install command implementation
//!
//! Runs the whole pipeline against a project directory:
//! 1. Load `.stackweave.yaml` (if any) and merge its option defaults under
//!    the command-line options
//! 2. Validate options, compose units and finalize the plan
//! 3. Show the plan (`--dry-run`) or ask for confirmation (unless `--yes`)
//! 4. Commit to disk and run deferred tasks
//! 5. Print the end-of-run report; exit non-zero if the install aborted

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm};

use stackweave::config::{self, CONFIG_FILE};
use stackweave::options::RawOptions;
use stackweave::output::{emoji, OutputConfig};
use stackweave::phases::orchestrator::Pipeline;
use stackweave::phases::PipelineState;
use stackweave::report;
use stackweave::store::DiskStore;
use stackweave::tasks::CommandTaskRunner;
use stackweave::units::Registry;

/// Arguments for the install command
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Frontend framework (react, vue, svelte)
    #[arg(long, value_name = "NAME")]
    pub framework: Option<String>,

    /// Generate TypeScript; `--typescript=false` turns it off
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub typescript: Option<String>,

    /// Add a server-side rendering entrypoint
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub ssr: Option<String>,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Project directory (defaults to current directory)
    #[arg(short, long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Path to the project file (defaults to <dir>/.stackweave.yaml)
    #[arg(short, long, value_name = "PATH", env = "STACKWEAVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show the planned operations without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the unit invocation tree
    #[arg(long)]
    pub trace: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,

    /// List the units in install order and exit
    #[arg(long)]
    pub list_units: bool,
}

impl InstallArgs {
    /// Options given on the command line, as raw strings.
    fn raw_options(&self) -> RawOptions {
        let mut raw = RawOptions::new();
        if let Some(framework) = &self.framework {
            raw.set("framework", framework.clone());
        }
        if let Some(typescript) = &self.typescript {
            raw.set("typescript", typescript.clone());
        }
        if let Some(ssr) = &self.ssr {
            raw.set("ssr", ssr.clone());
        }
        if self.yes {
            raw.set("yes", "true");
        }
        raw
    }
}

/// Execute the install command
pub fn execute(args: InstallArgs, out: &OutputConfig) -> Result<()> {
    let registry = Registry::builtin();
    if args.list_units {
        print!("{}", report::render_units(&registry));
        return Ok(());
    }

    let dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    if !dir.is_dir() {
        anyhow::bail!("Project directory not found: {}", dir.display());
    }

    let config_path = match &args.config {
        Some(path) if !path.exists() => {
            anyhow::bail!("Configuration file not found: {}", path.display())
        }
        Some(path) => path.clone(),
        None => dir.join(CONFIG_FILE),
    };
    let project = config::load(&config_path)?.unwrap_or_default();
    let raw = project.default_options()?.overlay(&args.raw_options());

    if !args.quiet {
        println!("{} {}", emoji(out, "🧵", "==>"), out.heading("stackweave install"));
        if args.dry_run {
            println!("{} DRY RUN MODE - No changes will be made", emoji(out, "🔎", "[DRY RUN]"));
        }
        println!();
    }

    let mut pipeline = Pipeline::new(&registry);

    let options = pipeline.validate_options(&raw)?;
    if pipeline.state() == PipelineState::OptionsValidated {
        pipeline.compose()?;
        pipeline.finalize()?;
    }

    if args.trace {
        if let Some(finalized) = pipeline.finalized() {
            ptree::print_tree(&report::invocation_tree(&finalized.invocations))?;
            println!();
        }
    }

    if pipeline.state() == PipelineState::Finalized && !args.dry_run {
        let planned = pipeline.finalized().map_or(0, |f| f.operations.len());
        if !options.yes && !confirm(&dir, planned)? {
            println!("Aborted. Nothing was written.");
            return Ok(());
        }

        let mut store = DiskStore::new(&dir);
        log::info!("committing {} operation(s) into {}", planned, store.root().display());
        let mut runner = CommandTaskRunner::new(&dir, &project);
        pipeline.commit(&project.layout, &mut store, &mut runner)?;
    }

    let outcome = pipeline.into_outcome();

    // A dry run stops at Finalized; anything terminal has no plan left to show.
    if args.dry_run && !outcome.state.is_terminal() {
        print!("{}", report::render_plan(&outcome)?);
        println!();
    }

    if !args.quiet {
        print!("{}", report::render(&outcome, out));
    }

    if outcome.is_aborted() {
        match outcome.first_error() {
            Some(first) => anyhow::bail!("install aborted: {}", first),
            None => match &outcome.failure {
                Some(failure) => anyhow::bail!("install aborted: {}", failure),
                None => anyhow::bail!("install aborted"),
            },
        }
    }

    Ok(())
}

/// Ask before writing. Refuses when nobody is there to answer.
fn confirm(dir: &Path, planned: usize) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!(
            "Refusing to modify {} without confirmation; pass --yes to run non-interactively",
            dir.display()
        );
    }

    let theme = ColorfulTheme::default();
    let confirmed = Confirm::with_theme(&theme)
        .with_prompt(format!(
            "Apply {} planned change(s) to {}?",
            planned,
            dir.display()
        ))
        .default(true)
        .interact()?;
    Ok(confirmed)
}
