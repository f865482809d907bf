//! Deferred task runners.
//!
//! `DeferTask` operations are never applied during Commit. Once every write
//! has landed, the pipeline hands each task to a [`TaskRunner`] in append
//! order. Whatever the runner reports comes back as diagnostics for the final
//! report; a failing task never undoes the commit.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use indicatif::ProgressBar;

use crate::config::ProjectConfig;
use crate::mutation::{Diagnostic, DiagnosticKind};

/// Runs named tasks after Commit.
pub trait TaskRunner {
    fn run_after_commit(&mut self, name: &str, args: &[String]) -> Vec<Diagnostic>;
}

/// Records task invocations without running anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingTaskRunner {
    pub calls: Vec<(String, Vec<String>)>,
}

impl RecordingTaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the tasks seen so far, in order.
    pub fn names(&self) -> Vec<&str> {
        self.calls.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl TaskRunner for RecordingTaskRunner {
    fn run_after_commit(&mut self, name: &str, args: &[String]) -> Vec<Diagnostic> {
        self.calls.push((name.to_string(), args.to_vec()));
        Vec::new()
    }
}

/// Runs tasks as external commands configured in the project file.
#[derive(Debug, Clone)]
pub struct CommandTaskRunner {
    working_dir: PathBuf,
    commands: std::collections::BTreeMap<String, Vec<String>>,
}

impl CommandTaskRunner {
    pub fn new(working_dir: impl Into<PathBuf>, config: &ProjectConfig) -> Self {
        Self {
            working_dir: working_dir.into(),
            commands: config.tasks.clone(),
        }
    }
}

impl TaskRunner for CommandTaskRunner {
    fn run_after_commit(&mut self, name: &str, args: &[String]) -> Vec<Diagnostic> {
        let Some((program, base_args)) = self.commands.get(name).and_then(|c| c.split_first())
        else {
            return vec![Diagnostic::warning(
                DiagnosticKind::Task,
                format!(
                    "no command configured for task '{}'; run it manually{}",
                    name,
                    if args.is_empty() {
                        String::new()
                    } else {
                        format!(" with: {}", args.join(" "))
                    }
                ),
            )];
        };

        log::info!("running task {}: {} {:?}", name, program, base_args);
        let spinner = ProgressBar::new_spinner();
        spinner.set_message(format!("running {}", name));
        spinner.enable_steady_tick(Duration::from_millis(100));
        let output = Command::new(program)
            .args(base_args)
            .args(args)
            .current_dir(&self.working_dir)
            .output();
        spinner.finish_and_clear();

        match output {
            Ok(output) if output.status.success() => {
                log::debug!("{} stdout:\n{}", name, String::from_utf8_lossy(&output.stdout));
                vec![Diagnostic::notice(
                    DiagnosticKind::Task,
                    format!("task '{}' finished", name),
                )]
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let detail = stderr.lines().last().unwrap_or_default().trim();
                vec![Diagnostic::warning(
                    DiagnosticKind::Task,
                    if detail.is_empty() {
                        format!("task '{}' exited with {}", name, output.status)
                    } else {
                        format!("task '{}' exited with {}: {}", name, output.status, detail)
                    },
                )]
            }
            Err(e) => vec![Diagnostic::warning(
                DiagnosticKind::Task,
                format!("task '{}' could not be started ({}): {}", name, program, e),
            )],
        }
    }
}
