//! Orchestrator for a complete install
//!
//! [`Pipeline`] walks the phases as an explicit state machine:
//!
//! ```text
//! Init -> OptionsValidated -> Composing -> Finalized -> Committing -> Done
//!   \_________________\___________\____________\____________\---> Aborted
//! ```
//!
//! Each step checks the current state and fails with
//! [`Error::InvalidTransition`] when called out of order. Fatal diagnostics
//! move the pipeline to `Aborted` instead of returning an `Err`, so the
//! caller can still build a full report with [`Pipeline::into_outcome`].
//!
//! [`run`] drives all phases in one call.

use serde_json::Value;

use super::commit::{CommitFailure, CommitSummary};
use super::{phase1, phase2, phase3, phase4, PipelineState};
use crate::config::Layout;
use crate::error::{Error, Result};
use crate::mutation::{
    Diagnostic, FinalizedSet, InvocationRecord, MutationSet, Operation, PendingOperation,
};
use crate::options::{Options, RawOptions};
use crate::store::FileStore;
use crate::tasks::TaskRunner;
use crate::units::Registry;

/// One install, from raw options to a committed tree.
#[derive(Debug)]
pub struct Pipeline<'r> {
    registry: &'r Registry,
    state: PipelineState,
    options: Options,
    set: MutationSet,
    finalized: Option<FinalizedSet>,
    summary: Option<CommitSummary>,
    failure: Option<Box<CommitFailure>>,
    task_diagnostics: Vec<Diagnostic>,
}

impl<'r> Pipeline<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            state: PipelineState::Init,
            options: Options::default(),
            set: MutationSet::new(),
            finalized: None,
            summary: None,
            failure: None,
            task_diagnostics: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Validated options; the declared defaults before validation.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The plan, once finalized.
    pub fn finalized(&self) -> Option<&FinalizedSet> {
        self.finalized.as_ref()
    }

    fn expect(&self, state: PipelineState, action: &str) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                action: action.to_string(),
                state: self.state.to_string(),
            })
        }
    }

    fn enter(&mut self, next: PipelineState) {
        log::info!("pipeline: {} -> {}", self.state, next);
        self.state = next;
    }

    /// `Init -> OptionsValidated`, or `Aborted` on an invalid flag.
    pub fn validate_options(&mut self, raw: &RawOptions) -> Result<Options> {
        self.expect(PipelineState::Init, "validate options")?;
        let (options, proceed) = phase1::execute(raw, &mut self.set);
        self.options = options;
        self.enter(if proceed {
            PipelineState::OptionsValidated
        } else {
            PipelineState::Aborted
        });
        Ok(options)
    }

    /// `OptionsValidated -> Composing`: run every unit.
    pub fn compose(&mut self) -> Result<()> {
        self.expect(PipelineState::OptionsValidated, "compose")?;
        self.enter(PipelineState::Composing);
        phase2::execute(self.registry, &self.options, &mut self.set);
        Ok(())
    }

    /// `Composing -> Finalized`, or `Aborted` on any error diagnostic.
    pub fn finalize(&mut self) -> Result<&FinalizedSet> {
        self.expect(PipelineState::Composing, "finalize")?;
        let finalized = phase3::execute(std::mem::take(&mut self.set));
        self.enter(if finalized.has_errors() {
            PipelineState::Aborted
        } else {
            PipelineState::Finalized
        });
        Ok(self.finalized.insert(finalized))
    }

    /// `Finalized -> Committing -> Done`, or `Aborted` on a write failure.
    ///
    /// Deferred tasks run only after every write succeeded.
    pub fn commit<S, T>(&mut self, layout: &Layout, store: &mut S, runner: &mut T) -> Result<()>
    where
        S: FileStore + ?Sized,
        T: TaskRunner + ?Sized,
    {
        self.expect(PipelineState::Finalized, "commit")?;
        self.enter(PipelineState::Committing);

        let result = match &self.finalized {
            Some(finalized) => phase4::execute(finalized, layout, store),
            None => {
                return Err(Error::InvalidTransition {
                    action: "commit".to_string(),
                    state: "missing plan".to_string(),
                })
            }
        };

        match result {
            Ok(summary) => {
                for pending in &summary.deferred {
                    if let Operation::DeferTask { name, args } = &pending.operation {
                        log::info!("running deferred task {}", name);
                        for diagnostic in runner.run_after_commit(name, args) {
                            self.task_diagnostics
                                .push(diagnostic.from_unit(pending.origin.clone()));
                        }
                    }
                }
                self.summary = Some(summary);
                self.enter(PipelineState::Done);
            }
            Err(failure) => {
                log::warn!("{}", failure);
                self.failure = Some(failure);
                self.enter(PipelineState::Aborted);
            }
        }
        Ok(())
    }

    /// Everything the run produced, whatever state it stopped in.
    pub fn into_outcome(self) -> RunOutcome {
        let FinalizedSet {
            operations,
            config,
            mut diagnostics,
            invocations,
        } = match self.finalized {
            Some(finalized) => finalized,
            None => self.set.finalize(),
        };
        diagnostics.extend(self.task_diagnostics);

        RunOutcome {
            state: self.state,
            options: self.options,
            operations,
            config,
            diagnostics,
            invocations,
            summary: self.summary,
            failure: self.failure,
        }
    }
}

/// Final result of an install.
#[derive(Debug)]
pub struct RunOutcome {
    /// `Done`, `Aborted`, or wherever the caller stopped driving the
    /// pipeline (e.g. `Finalized` for a dry run).
    pub state: PipelineState,
    pub options: Options,
    /// Effective operations, duplicates removed.
    pub operations: Vec<PendingOperation>,
    /// Effective configuration document.
    pub config: Value,
    /// Every diagnostic in the order it was raised, task results last.
    pub diagnostics: Vec<Diagnostic>,
    pub invocations: Vec<InvocationRecord>,
    pub summary: Option<CommitSummary>,
    pub failure: Option<Box<CommitFailure>>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Done
    }

    pub fn is_aborted(&self) -> bool {
        self.state == PipelineState::Aborted
    }

    /// First fatal diagnostic, if the run aborted on one.
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.is_error())
    }
}

/// Execute the complete install: validate, compose, finalize and commit.
pub fn run<S, T>(
    registry: &Registry,
    raw: &RawOptions,
    layout: &Layout,
    store: &mut S,
    runner: &mut T,
) -> Result<RunOutcome>
where
    S: FileStore + ?Sized,
    T: TaskRunner + ?Sized,
{
    let mut pipeline = Pipeline::new(registry);

    pipeline.validate_options(raw)?;
    if pipeline.state() == PipelineState::OptionsValidated {
        pipeline.compose()?;
        pipeline.finalize()?;
    }
    if pipeline.state() == PipelineState::Finalized {
        pipeline.commit(layout, store, runner)?;
    }

    Ok(pipeline.into_outcome())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::DiagnosticKind;
    use crate::store::MemoryStore;
    use crate::tasks::RecordingTaskRunner;
    use crate::units::{Composer, Unit, UnitArgs};

    #[test]
    fn test_run_default_install() {
        let registry = Registry::builtin();
        let mut store = MemoryStore::new();
        let mut runner = RecordingTaskRunner::new();

        let outcome = run(
            &registry,
            &RawOptions::new(),
            &Layout::default(),
            &mut store,
            &mut runner,
        )
        .unwrap();

        assert!(outcome.is_success());
        assert_eq!(runner.names(), vec!["routes:generate"]);
        assert!(store.exists("package.json"));
        assert!(store.exists("config/stackweave.json"));
        assert!(store.exists("app/frontend/entrypoints/application.ts"));
        let summary = outcome.summary.unwrap();
        assert_eq!(summary.dependencies_added.len(), 5);
    }

    #[test]
    fn test_steps_out_of_order_are_rejected() {
        let registry = Registry::builtin();
        let mut pipeline = Pipeline::new(&registry);

        let err = pipeline.compose().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot compose while pipeline is Init"
        );
        assert!(pipeline.finalize().is_err());
        assert_eq!(pipeline.state(), PipelineState::Init);
    }

    #[test]
    fn test_invalid_flag_aborts_before_composing() {
        let registry = Registry::builtin();
        let mut store = MemoryStore::new();
        let outcome = run(
            &registry,
            &RawOptions::new().with("typescript", "perhaps"),
            &Layout::default(),
            &mut store,
            &mut RecordingTaskRunner::new(),
        )
        .unwrap();

        assert!(outcome.is_aborted());
        assert!(outcome.invocations.is_empty());
        assert!(store.is_empty());
        assert_eq!(
            outcome.first_error().unwrap().kind,
            DiagnosticKind::OptionValidation
        );
    }

    struct Snake;

    impl Unit for Snake {
        fn name(&self) -> &str {
            "snake"
        }

        fn run(&self, _args: &UnitArgs, cx: &mut Composer<'_>) -> Result<()> {
            cx.append(Operation::config("serialization", "transform_keys", "snake"));
            Ok(())
        }
    }

    struct WithSnake;

    impl Unit for WithSnake {
        fn name(&self) -> &str {
            "build-tooling"
        }

        fn run(&self, args: &UnitArgs, cx: &mut Composer<'_>) -> Result<()> {
            crate::units::build_tooling::BuildTooling.run(args, cx)?;
            cx.compose("snake", &[]);
            Ok(())
        }
    }

    #[test]
    fn test_conflict_aborts_without_writes() {
        let mut registry = Registry::builtin();
        registry.register(Snake);
        registry.register(WithSnake);
        let mut store = MemoryStore::new();
        let mut runner = RecordingTaskRunner::new();

        let outcome = run(
            &registry,
            &RawOptions::new(),
            &Layout::default(),
            &mut store,
            &mut runner,
        )
        .unwrap();

        assert!(outcome.is_aborted());
        assert!(store.is_empty());
        assert!(runner.calls.is_empty());
        let error = outcome.first_error().unwrap();
        assert_eq!(error.kind, DiagnosticKind::ConfigConflict);
        assert!(error.message.contains("\"snake\""));
        assert!(error.message.contains("\"lower_camel\""));
    }

    #[test]
    fn test_dry_run_stops_at_finalized() {
        let registry = Registry::builtin();
        let mut pipeline = Pipeline::new(&registry);
        pipeline.validate_options(&RawOptions::new()).unwrap();
        pipeline.compose().unwrap();
        let planned = pipeline.finalize().unwrap().operations.len();

        let outcome = pipeline.into_outcome();
        assert_eq!(outcome.state, PipelineState::Finalized);
        assert_eq!(outcome.operations.len(), planned);
        assert!(outcome.summary.is_none());
    }
}
