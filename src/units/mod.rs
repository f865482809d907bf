//! # Installer Units
//!
//! A unit is an independently authored installer: given its arguments it
//! appends operations to the shared [`MutationSet`] and never touches storage.
//! Units are addressed by a stable name and a flat list of string flags, so
//! the pipeline can drive units it does not implement itself through the
//! same [`Registry`].
//!
//! ## Composition
//!
//! A unit may invoke another unit with [`Composer::compose`]. The composed
//! unit appends into the same mutation set, so siblings that run later see
//! its operations. The composer enforces:
//!
//! - at most one invocation of each unit per run (later requests are skipped
//!   with a notice);
//! - no cycles (a unit composing something already on the call stack is an
//!   error);
//! - unknown names are errors.
//!
//! ## Built-in units
//!
//! | name | module |
//! |---|---|
//! | `build-tooling` | [`build_tooling`] |
//! | `routing` | [`routing`] |
//! | `serialization` | [`serialization`] |
//! | `type-generation` | [`type_generation`] |
//! | `integration` | [`integration`] |

pub mod build_tooling;
pub mod integration;
pub mod routing;
pub mod serialization;
pub mod type_generation;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::mutation::{Diagnostic, DiagnosticKind, MutationSet, Operation};
use crate::options::{parse_flag, Framework};

/// An installer unit.
pub trait Unit {
    /// Stable name the unit is registered and composed under.
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str {
        ""
    }

    /// Append this unit's operations.
    ///
    /// Returning `Err` records a fatal `UnitError` diagnostic attributed to
    /// the unit; whatever it appended before failing stays in the log but the
    /// run will abort before Commit.
    fn run(&self, args: &UnitArgs, cx: &mut Composer<'_>) -> Result<()>;
}

/// Parsed view of a unit's flag list.
///
/// Understands `--name=value`, `--name value`, `--name` (true) and
/// `--no-name` (false).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitArgs {
    raw: Vec<String>,
}

impl UnitArgs {
    pub fn new(args: &[String]) -> Self {
        Self { raw: args.to_vec() }
    }

    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    /// Value of `--name=value` or `--name value`. The last occurrence wins.
    pub fn value(&self, name: &str) -> Option<&str> {
        let long = format!("--{}", name);
        let prefix = format!("--{}=", name);
        let mut found = None;
        let mut i = 0;
        while i < self.raw.len() {
            let arg = &self.raw[i];
            if let Some(value) = arg.strip_prefix(&prefix) {
                found = Some(value);
            } else if *arg == long {
                if let Some(next) = self.raw.get(i + 1).filter(|next| !next.starts_with("--")) {
                    found = Some(next.as_str());
                    i += 1;
                }
            }
            i += 1;
        }
        found
    }

    /// State of a boolean flag, if it was given at all.
    pub fn flag(&self, name: &str) -> Option<bool> {
        let long = format!("--{}", name);
        let negated = format!("--no-{}", name);
        let prefix = format!("--{}=", name);
        self.raw.iter().rev().find_map(|arg| {
            if *arg == long {
                Some(true)
            } else if *arg == negated {
                Some(false)
            } else {
                arg.strip_prefix(&prefix).and_then(parse_flag)
            }
        })
    }

    pub fn flag_or(&self, name: &str, default: bool) -> bool {
        self.flag(name).unwrap_or(default)
    }

    /// The `--framework` value; `react` when absent.
    pub fn framework(&self, unit: &str) -> Result<Framework> {
        match self.value("framework") {
            None => Ok(Framework::default()),
            Some(value) => value.parse().map_err(|message| Error::Unit {
                unit: unit.to_string(),
                message,
            }),
        }
    }
}

/// Name-addressed collection of units, built once before a run.
#[derive(Default)]
pub struct Registry {
    units: BTreeMap<String, Box<dyn Unit>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the five built-in units.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(build_tooling::BuildTooling);
        registry.register(routing::Routing);
        registry.register(serialization::Serialization);
        registry.register(type_generation::TypeGeneration);
        registry.register(integration::Integration);
        registry
    }

    /// Register `unit` under its name, returning any unit it replaced.
    pub fn register<U: Unit + 'static>(&mut self, unit: U) -> Option<Box<dyn Unit>> {
        let name = unit.name().to_string();
        let replaced = self.units.insert(name.clone(), Box::new(unit));
        if replaced.is_some() {
            log::warn!("unit '{}' registered twice; keeping the later one", name);
        }
        replaced
    }

    pub fn get(&self, name: &str) -> Option<&dyn Unit> {
        self.units.get(name).map(Box::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Runs units against one shared mutation set.
pub struct Composer<'a> {
    registry: &'a Registry,
    set: &'a mut MutationSet,
    stack: Vec<String>,
    invoked: BTreeSet<String>,
}

impl<'a> Composer<'a> {
    pub fn new(registry: &'a Registry, set: &'a mut MutationSet) -> Self {
        Self {
            registry,
            set,
            stack: Vec::new(),
            invoked: BTreeSet::new(),
        }
    }

    /// Invoke unit `name` with `args`.
    ///
    /// Problems are recorded as diagnostics rather than returned, so one run
    /// reports every failing unit.
    pub fn invoke(&mut self, name: &str, args: &[String]) {
        if self.stack.iter().any(|running| running == name) {
            let mut cycle = self.stack.clone();
            cycle.push(name.to_string());
            let error = Error::CycleDetected {
                cycle: cycle.join(" -> "),
            };
            self.diagnose_current(Diagnostic::error(DiagnosticKind::Unit, error.to_string()));
            return;
        }

        if self.invoked.contains(name) {
            self.diagnose_current(Diagnostic::notice(
                DiagnosticKind::Composition,
                format!("unit '{}' already ran in this install; not running it again", name),
            ));
            return;
        }

        let registry = self.registry;
        let Some(unit) = registry.get(name) else {
            let error = Error::UnknownUnit {
                name: name.to_string(),
            };
            self.diagnose_current(Diagnostic::error(DiagnosticKind::Unit, error.to_string()));
            return;
        };

        let depth = self.stack.len();
        log::info!("{}running unit {} {:?}", "  ".repeat(depth), name, args);

        self.invoked.insert(name.to_string());
        let handle = self.set.open_invocation(name, args, depth);
        let mark = self.set.diagnostics().len();
        self.stack.push(name.to_string());

        if let Err(err) = unit.run(&UnitArgs::new(args), self) {
            let message = match err {
                Error::Unit { message, .. } => message,
                other => other.to_string(),
            };
            self.set
                .diagnose(Diagnostic::error(DiagnosticKind::Unit, message).from_unit(name));
        }

        self.stack.pop();
        self.set.close_invocation(handle, mark);
    }

    /// Compose another unit into the current run.
    pub fn compose(&mut self, name: &str, args: &[String]) {
        self.invoke(name, args);
    }

    /// Name of the unit currently running.
    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    /// Append an operation on behalf of the running unit.
    pub fn append(&mut self, operation: Operation) {
        let origin = self.current().unwrap_or("pipeline").to_string();
        self.set.append(&origin, operation);
    }

    /// Record a notice from the running unit.
    pub fn notice(&mut self, message: impl Into<String>) {
        self.diagnose_current(Diagnostic::notice(DiagnosticKind::Unit, message));
    }

    /// Record a warning from the running unit.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.diagnose_current(Diagnostic::warning(DiagnosticKind::Unit, message));
    }

    /// Whether `name` has been invoked in this run.
    pub fn has_run(&self, name: &str) -> bool {
        self.invoked.contains(name)
    }

    /// Whether any unit has proposed dependency `name`.
    pub fn has_dependency(&self, name: &str) -> bool {
        self.set.has_dependency(name)
    }

    /// Configuration asserted so far by earlier units.
    pub fn config(&self, namespace: &str, key_path: &str) -> Option<&Value> {
        self.set.config(namespace, key_path)
    }

    /// Fail unless `prerequisite` already ran, naming what needs it.
    pub fn require(&self, unit: &str, prerequisite: &str) -> Result<()> {
        if self.has_run(prerequisite) {
            Ok(())
        } else {
            Err(Error::Unit {
                unit: unit.to_string(),
                message: format!(
                    "requires the '{}' unit to run first; it was not part of this install",
                    prerequisite
                ),
            })
        }
    }

    fn diagnose_current(&mut self, diagnostic: Diagnostic) {
        let diagnostic = match self.current() {
            Some(unit) => {
                let unit = unit.to_string();
                diagnostic.from_unit(unit)
            }
            None => diagnostic,
        };
        self.set.diagnose(diagnostic);
    }
}

/// Frontend sources live under this directory.
pub const FRONTEND_ROOT: &str = "app/frontend";

/// File extension for generated scripts.
pub(crate) fn script_extension(typescript: bool) -> &'static str {
    if typescript {
        "ts"
    } else {
        "js"
    }
}

/// Path of the main client entrypoint.
pub fn entrypoint_path(typescript: bool) -> String {
    format!(
        "{}/entrypoints/application.{}",
        FRONTEND_ROOT,
        script_extension(typescript)
    )
}

/// Path of the server-side rendering entrypoint.
pub fn ssr_entrypoint_path(typescript: bool) -> String {
    format!("{}/ssr/ssr.{}", FRONTEND_ROOT, script_extension(typescript))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> UnitArgs {
        UnitArgs::new(&list.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_unit_args_values_and_flags() {
        let parsed = args(&["--framework=vue", "--typescript", "--no-ssr", "--out", "dir"]);
        assert_eq!(parsed.value("framework"), Some("vue"));
        assert_eq!(parsed.value("out"), Some("dir"));
        assert_eq!(parsed.flag("typescript"), Some(true));
        assert_eq!(parsed.flag("ssr"), Some(false));
        assert_eq!(parsed.flag("missing"), None);
        assert!(parsed.flag_or("missing", true));
    }

    #[test]
    fn test_unit_args_last_occurrence_wins() {
        let parsed = args(&["--ssr", "--no-ssr", "--framework=vue", "--framework=svelte"]);
        assert_eq!(parsed.flag("ssr"), Some(false));
        assert_eq!(parsed.value("framework"), Some("svelte"));
    }

    #[test]
    fn test_unit_args_flag_with_value() {
        let parsed = args(&["--typescript=false"]);
        assert_eq!(parsed.flag("typescript"), Some(false));
    }

    #[test]
    fn test_unit_args_framework() {
        assert_eq!(args(&[]).framework("x").unwrap(), Framework::React);
        assert_eq!(
            args(&["--framework=svelte"]).framework("x").unwrap(),
            Framework::Svelte
        );
        let err = args(&["--framework=angular"]).framework("x").unwrap_err();
        assert!(err.to_string().contains("angular"));
    }

    struct Echo;

    impl Unit for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn run(&self, args: &UnitArgs, cx: &mut Composer<'_>) -> Result<()> {
            cx.append(Operation::defer("echo", args.raw().to_vec()));
            Ok(())
        }
    }

    struct Loop;

    impl Unit for Loop {
        fn name(&self) -> &str {
            "loop"
        }

        fn run(&self, _args: &UnitArgs, cx: &mut Composer<'_>) -> Result<()> {
            cx.compose("loop", &[]);
            Ok(())
        }
    }

    struct Failing;

    impl Unit for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn run(&self, _args: &UnitArgs, cx: &mut Composer<'_>) -> Result<()> {
            cx.append(Operation::dependency("half-done", "*"));
            cx.require("failing", "never-ran")
        }
    }

    #[test]
    fn test_registry_builtin_names() {
        let registry = Registry::builtin();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "build-tooling",
                "integration",
                "routing",
                "serialization",
                "type-generation"
            ]
        );
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = Registry::new();
        assert!(registry.register(Echo).is_none());
        assert!(registry.register(Echo).is_some());
    }

    #[test]
    fn test_composer_appends_with_origin() {
        let mut registry = Registry::new();
        registry.register(Echo);
        let mut set = MutationSet::new();
        Composer::new(&registry, &mut set).invoke("echo", &["--x".to_string()]);

        assert_eq!(set.operations().len(), 1);
        assert_eq!(set.operations()[0].origin, "echo");
        assert_eq!(set.invocations()[0].args, vec!["--x".to_string()]);
    }

    #[test]
    fn test_composer_runs_unit_at_most_once() {
        let mut registry = Registry::new();
        registry.register(Echo);
        let mut set = MutationSet::new();
        let mut composer = Composer::new(&registry, &mut set);
        composer.invoke("echo", &[]);
        composer.invoke("echo", &[]);
        drop(composer);

        assert_eq!(set.operations().len(), 1);
        assert_eq!(set.notices().count(), 1);
        assert!(!set.has_errors());
    }

    #[test]
    fn test_composer_detects_cycle() {
        let mut registry = Registry::new();
        registry.register(Loop);
        let mut set = MutationSet::new();
        Composer::new(&registry, &mut set).invoke("loop", &[]);

        let error = set.errors().next().unwrap();
        assert_eq!(error.kind, DiagnosticKind::Unit);
        assert!(error.message.contains("loop -> loop"));
    }

    #[test]
    fn test_composer_unknown_unit() {
        let registry = Registry::new();
        let mut set = MutationSet::new();
        Composer::new(&registry, &mut set).invoke("nope", &[]);
        let error = set.errors().next().unwrap();
        assert_eq!(error.kind, DiagnosticKind::Unit);
        assert!(error.message.contains("Unknown unit: nope"));
    }

    #[test]
    fn test_unit_error_is_attributed() {
        let mut registry = Registry::new();
        registry.register(Failing);
        let mut set = MutationSet::new();
        Composer::new(&registry, &mut set).invoke("failing", &[]);

        let error = set.errors().next().unwrap();
        assert_eq!(error.kind, DiagnosticKind::Unit);
        assert_eq!(error.source.as_deref(), Some("failing"));
        assert!(error.message.contains("never-ran"));
        assert_eq!(set.invocations()[0].diagnostics.len(), 1);
    }
}
