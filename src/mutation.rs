//! # Mutation Set
//!
//! The in-memory, append-only log of everything one run proposes to do to the
//! target tree, plus every diagnostic raised while proposing it. Units only
//! ever append; nothing here touches storage.
//!
//! ## Key Components
//!
//! - **`Operation`**: one proposed mutation (dependency, config key, file
//!   creation, file patch, deferred task).
//! - **`PendingOperation`**: an operation tagged with the unit that proposed
//!   it, so conflicts can name both sides.
//! - **`Diagnostic`**: a notice, warning or error with its originating unit.
//! - **`InvocationRecord`**: audit trail of which unit ran with which
//!   arguments, at which composition depth.
//! - **`MutationSet::finalize`**: the single conflict and validation pass
//!   that turns the log into a [`FinalizedSet`] ready for Commit.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coordinator::{canonical_key, ConfigCoordinator};
use crate::error::{Error, Result};
use crate::transform::Transform;

/// What `CreateFile` does when the path already has content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnExists {
    /// Replace the existing content.
    Overwrite,
    /// Leave the existing content alone.
    Skip,
    /// Abort Commit if the existing content differs.
    #[default]
    Error,
}

/// A single proposed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Operation {
    /// Add an entry to the dependency manifest.
    AddDependency {
        name: String,
        /// Where to fetch from when not the default registry (URL or path).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        locator: Option<String>,
        /// Semver requirement, e.g. `^5.4.0`.
        constraints: String,
    },
    /// Set a key inside a namespace of the configuration document.
    SetConfig {
        namespace: String,
        key_path: String,
        value: Value,
    },
    /// Create a file.
    CreateFile {
        path: PathBuf,
        content: String,
        #[serde(default)]
        on_exists: OnExists,
    },
    /// Transform the current content of an existing file.
    PatchFile { path: PathBuf, transform: Transform },
    /// Run a named task after Commit succeeds.
    DeferTask {
        name: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

/// Operation kinds, the first half of an operation's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    AddDependency,
    SetConfig,
    CreateFile,
    PatchFile,
    DeferTask,
}

impl Operation {
    pub fn dependency(name: impl Into<String>, constraints: impl Into<String>) -> Self {
        Operation::AddDependency {
            name: name.into(),
            locator: None,
            constraints: constraints.into(),
        }
    }

    pub fn config(
        namespace: impl Into<String>,
        key_path: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Operation::SetConfig {
            namespace: namespace.into(),
            key_path: key_path.into(),
            value: value.into(),
        }
    }

    pub fn create(path: impl Into<PathBuf>, content: impl Into<String>, on_exists: OnExists) -> Self {
        Operation::CreateFile {
            path: path.into(),
            content: content.into(),
            on_exists,
        }
    }

    pub fn patch(path: impl Into<PathBuf>, transform: Transform) -> Self {
        Operation::PatchFile {
            path: path.into(),
            transform,
        }
    }

    pub fn defer<S: Into<String>>(name: impl Into<String>, args: impl IntoIterator<Item = S>) -> Self {
        Operation::DeferTask {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::AddDependency { .. } => OperationKind::AddDependency,
            Operation::SetConfig { .. } => OperationKind::SetConfig,
            Operation::CreateFile { .. } => OperationKind::CreateFile,
            Operation::PatchFile { .. } => OperationKind::PatchFile,
            Operation::DeferTask { .. } => OperationKind::DeferTask,
        }
    }

    /// The second half of the identity: dependency name, `namespace.key`,
    /// file path or task name.
    pub fn target(&self) -> String {
        match self {
            Operation::AddDependency { name, .. } => name.clone(),
            Operation::SetConfig {
                namespace,
                key_path,
                ..
            } => format!("{}.{}", namespace, canonical_key(key_path)),
            Operation::CreateFile { path, .. } | Operation::PatchFile { path, .. } => {
                path.display().to_string()
            }
            Operation::DeferTask { name, .. } => name.clone(),
        }
    }

    /// The file this operation writes directly, if any.
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Operation::CreateFile { path, .. } | Operation::PatchFile { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::AddDependency {
                name, constraints, ..
            } => write!(f, "add dependency {} {}", name, constraints),
            Operation::SetConfig { value, .. } => {
                write!(f, "set {} = {}", self.target(), value)
            }
            Operation::CreateFile { path, .. } => write!(f, "create {}", path.display()),
            Operation::PatchFile { path, transform } => {
                write!(f, "patch {} ({})", path.display(), transform)
            }
            Operation::DeferTask { name, args } if args.is_empty() => {
                write!(f, "run {}", name)
            }
            Operation::DeferTask { name, args } => write!(f, "run {} {}", name, args.join(" ")),
        }
    }
}

/// An operation together with the unit that proposed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub origin: String,
    #[serde(flatten)]
    pub operation: Operation,
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Notice,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// What kind of problem a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A user option was invalid and, for warnings, replaced by its default.
    OptionValidation,
    /// Two units asserted different values for one configuration key.
    ConfigConflict,
    /// Two units asked for the same dependency with different requirements.
    DependencyConflict,
    /// An operation payload failed validation at finalize.
    InvalidOperation,
    /// A unit failed: it reported that it cannot proceed, composed a unit
    /// already on the call stack, or named a unit that is not registered.
    /// Also used for notes a unit chose to record.
    Unit,
    /// Composition bookkeeping, such as skipping a repeated invocation.
    Composition,
    /// Outcome of a deferred task.
    Task,
}

/// A severity-tagged message, optionally attributed to a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            source: None,
            message: message.into(),
        }
    }

    pub fn notice(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Notice, kind, message)
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, message)
    }

    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, message)
    }

    /// Attribute the diagnostic to a unit.
    pub fn from_unit(mut self, unit: impl Into<String>) -> Self {
        self.source = Some(unit.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(unit) => write!(f, "{} [{}]: {}", self.severity, unit, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Audit record of one unit invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRecord {
    pub unit: String,
    pub args: Vec<String>,
    /// 0 for units the pipeline invoked, 1+ for composed units.
    pub depth: usize,
    /// Diagnostics raised while this unit (and anything it composed) ran.
    pub diagnostics: Vec<Diagnostic>,
}

/// Ordered, append-only log of pending operations and diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationSet {
    operations: Vec<PendingOperation>,
    diagnostics: Vec<Diagnostic>,
    invocations: Vec<InvocationRecord>,
}

impl MutationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation proposed by `origin`. Never fails; payloads are
    /// validated by [`MutationSet::finalize`].
    pub fn append(&mut self, origin: &str, operation: Operation) {
        log::trace!("{} proposes: {}", origin, operation);
        self.operations.push(PendingOperation {
            origin: origin.to_string(),
            operation,
        });
    }

    /// Record a diagnostic.
    pub fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Open an invocation record; returns a handle for
    /// [`MutationSet::close_invocation`].
    pub fn open_invocation(&mut self, unit: &str, args: &[String], depth: usize) -> usize {
        self.invocations.push(InvocationRecord {
            unit: unit.to_string(),
            args: args.to_vec(),
            depth,
            diagnostics: Vec::new(),
        });
        self.invocations.len() - 1
    }

    /// Attach every diagnostic raised since `first_diagnostic` to the record.
    pub fn close_invocation(&mut self, handle: usize, first_diagnostic: usize) {
        let raised = self.diagnostics[first_diagnostic..].to_vec();
        if let Some(record) = self.invocations.get_mut(handle) {
            record.diagnostics = raised;
        }
    }

    pub fn operations(&self) -> &[PendingOperation] {
        &self.operations
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn invocations(&self) -> &[InvocationRecord] {
        &self.invocations
    }

    pub fn notices(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Notice)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
    }

    /// Whether any unit has proposed dependency `name` so far.
    pub fn has_dependency(&self, name: &str) -> bool {
        self.operations.iter().any(|pending| {
            matches!(&pending.operation, Operation::AddDependency { name: n, .. } if n == name)
        })
    }

    /// The effective value of a configuration key proposed so far.
    pub fn config(&self, namespace: &str, key_path: &str) -> Option<&Value> {
        ConfigCoordinator::lookup(&self.operations, namespace, key_path)
    }

    /// Run the conflict and validation pass and produce the effective plan.
    ///
    /// - `SetConfig` duplicates with equal values collapse to the first;
    ///   differing values become one `ConfigConflict` error per key.
    /// - `AddDependency` duplicates collapse the same way; dependencies with
    ///   differing requirements are a `DependencyConflict`.
    /// - `DeferTask` operations are never collapsed: each one reaches the
    ///   task runner.
    /// - Payloads are validated: semver requirements, URL locators, relative
    ///   paths that stay inside the tree, and patch transforms.
    pub fn finalize(self) -> FinalizedSet {
        let MutationSet {
            operations,
            mut diagnostics,
            invocations,
        } = self;

        let merged = ConfigCoordinator::merge(&operations);
        for conflict in &merged.conflicts {
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticKind::ConfigConflict,
                    format!("ConfigConflict: {}", conflict),
                )
                .from_unit(conflict.second.unit.clone()),
            );
        }

        let mut redundant: Vec<bool> = vec![false; operations.len()];
        for index in merged.duplicates {
            redundant[index] = true;
        }

        let mut seen: HashMap<(OperationKind, String), usize> = HashMap::new();
        for (index, pending) in operations.iter().enumerate() {
            if let Err(problem) = validate(&pending.operation) {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::InvalidOperation,
                        format!("invalid operation `{}`: {}", pending.operation, problem),
                    )
                    .from_unit(pending.origin.clone()),
                );
            }

            let kind = pending.operation.kind();
            if kind != OperationKind::AddDependency {
                continue;
            }
            let identity = (kind, pending.operation.target());
            let Some(&first) = seen.get(&identity) else {
                seen.insert(identity, index);
                continue;
            };
            let earlier = &operations[first];
            if earlier.operation == pending.operation {
                redundant[index] = true;
            } else {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::DependencyConflict,
                        format!(
                            "DependencyConflict: '{}' requested as `{}` by '{}' but as `{}` by '{}'",
                            identity.1,
                            earlier.operation,
                            earlier.origin,
                            pending.operation,
                            pending.origin
                        ),
                    )
                    .from_unit(pending.origin.clone()),
                );
            }
        }

        let operations = operations
            .into_iter()
            .zip(redundant)
            .filter_map(|(pending, dropped)| (!dropped).then_some(pending))
            .collect();

        FinalizedSet {
            operations,
            config: merged.document,
            diagnostics,
            invocations,
        }
    }
}

/// Validate an operation payload.
fn validate(operation: &Operation) -> Result<()> {
    match operation {
        Operation::AddDependency {
            name,
            locator,
            constraints,
        } => {
            if name.trim().is_empty() {
                return Err(invalid("dependency name is empty"));
            }
            semver::VersionReq::parse(constraints)?;
            if let Some(locator) = locator.as_deref().filter(|l| l.contains("://")) {
                url::Url::parse(locator)?;
            }
            Ok(())
        }
        Operation::SetConfig {
            namespace,
            key_path,
            ..
        } => {
            if namespace.trim().is_empty() {
                Err(invalid("configuration namespace is empty"))
            } else if canonical_key(key_path).is_empty() {
                Err(invalid("configuration key path is empty"))
            } else {
                Ok(())
            }
        }
        Operation::CreateFile { path, .. } => validate_path(path),
        Operation::PatchFile { path, transform } => {
            validate_path(path)?;
            transform.validate()
        }
        Operation::DeferTask { name, .. } if name.trim().is_empty() => {
            Err(invalid("task name is empty"))
        }
        Operation::DeferTask { .. } => Ok(()),
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidOperation {
        message: message.into(),
    }
}

fn validate_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(invalid("path is empty"));
    }
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                return Err(invalid(format!("'{}' must be relative", path.display())));
            }
            Component::ParentDir => {
                return Err(invalid(format!(
                    "'{}' escapes the target tree",
                    path.display()
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(())
}

/// A mutation set that passed through [`MutationSet::finalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedSet {
    /// Effective operations in append order, duplicates removed.
    pub operations: Vec<PendingOperation>,
    /// Effective configuration document, keyed by namespace.
    pub config: Value,
    pub diagnostics: Vec<Diagnostic>,
    pub invocations: Vec<InvocationRecord>,
}

impl FinalizedSet {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.is_error())
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}
