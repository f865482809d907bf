//! Phase 4: Commit
//!
//! Applies a [`FinalizedSet`] to a [`FileStore`], strictly in append order.
//!
//! ## Process
//!
//! 1.  **Pending content**: every path is read from the store at most once,
//!     on first touch. Later operations on the same path see the content the
//!     earlier ones produced, not what is on disk.
//!
//! 2.  **Apply**:
//!     - `AddDependency` adds an entry under `dependencies` in the manifest.
//!       An entry that already exists is left alone.
//!     - `SetConfig` sets the key in the configuration document. A different
//!       value already on disk is overwritten with a warning.
//!     - `CreateFile` honours its [`OnExists`] policy; identical existing
//!       content is never a conflict.
//!     - `PatchFile` applies its transform to the pending content.
//!     - `DeferTask` is collected for the task runner.
//!
//! 3.  **Write**: content that did not change is not written, which keeps a
//!     re-run against an installed tree free of writes.
//!
//! A failure stops the phase. Writes already made stay in place; the failure
//! names the operation that failed and every operation not applied.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::Layout;
use crate::coordinator::full_path;
use crate::document::{Document, PathSegment};
use crate::error::{Error, Result};
use crate::mutation::{FinalizedSet, OnExists, Operation, PendingOperation};
use crate::store::FileStore;

/// Key in the manifest that dependencies are added under.
pub const DEPENDENCIES_KEY: &str = "dependencies";

/// What a successful commit did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitSummary {
    /// Paths whose content changed, in first-write order.
    pub files_written: Vec<PathBuf>,
    /// Paths touched whose content was already as intended.
    pub files_unchanged: Vec<PathBuf>,
    /// `CreateFile` targets left alone by their `skip` policy.
    pub skipped_creates: Vec<PathBuf>,
    pub dependencies_added: Vec<String>,
    /// `namespace.key` of every configuration key written.
    pub config_keys_set: Vec<String>,
    /// `DeferTask` operations, for the task runner.
    pub deferred: Vec<PendingOperation>,
}

impl CommitSummary {
    fn written(&mut self, path: &Path) {
        self.files_unchanged.retain(|p| p != path);
        if !self.files_written.iter().any(|p| p == path) {
            self.files_written.push(path.to_path_buf());
        }
    }

    fn unchanged(&mut self, path: &Path) {
        let known = self.files_written.iter().chain(&self.files_unchanged);
        if !known.into_iter().any(|p| p == path) {
            self.files_unchanged.push(path.to_path_buf());
        }
    }

    /// Whether the commit changed nothing on the store.
    pub fn is_noop(&self) -> bool {
        self.files_written.is_empty()
    }
}

/// A commit that stopped part-way.
#[derive(Debug)]
pub struct CommitFailure {
    pub error: Error,
    /// The operation that failed.
    pub failed: PendingOperation,
    /// Operations after the failed one, never applied.
    pub unapplied: Vec<PendingOperation>,
    /// What was applied before the failure.
    pub applied: CommitSummary,
}

impl fmt::Display for CommitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "commit failed at `{}` from '{}': {} ({} operation(s) not applied)",
            self.failed.operation,
            self.failed.origin,
            self.error,
            self.unapplied.len()
        )
    }
}

/// Store access with a pending-content cache.
struct Workspace<'s, S: FileStore + ?Sized> {
    store: &'s mut S,
    pending: HashMap<PathBuf, Option<String>>,
}

impl<'s, S: FileStore + ?Sized> Workspace<'s, S> {
    fn new(store: &'s mut S) -> Self {
        Self {
            store,
            pending: HashMap::new(),
        }
    }

    fn read(&mut self, path: &Path) -> Result<Option<String>> {
        if let Some(content) = self.pending.get(path) {
            return Ok(content.clone());
        }
        let content = self.store.read(path)?;
        self.pending.insert(path.to_path_buf(), content.clone());
        Ok(content)
    }

    /// Write `content` unless it is already the pending content. Returns
    /// whether anything was written.
    fn write(&mut self, path: &Path, content: String) -> Result<bool> {
        if self.read(path)?.as_deref() == Some(content.as_str()) {
            return Ok(false);
        }
        self.store.write(path, &content)?;
        self.pending.insert(path.to_path_buf(), Some(content));
        Ok(true)
    }

    fn document(&mut self, path: &Path) -> Result<Document> {
        let content = self.read(path)?;
        Document::parse(path, content.as_deref())
    }

    fn save(&mut self, document: &Document, summary: &mut CommitSummary) -> Result<()> {
        let path = document.path().to_path_buf();
        if self.write(&path, document.render()?)? {
            summary.written(&path);
        } else {
            summary.unchanged(&path);
        }
        Ok(())
    }
}

/// Execute Phase 4: apply `finalized` to `store`.
pub fn execute<S: FileStore + ?Sized>(
    finalized: &FinalizedSet,
    layout: &Layout,
    store: &mut S,
) -> std::result::Result<CommitSummary, Box<CommitFailure>> {
    let mut workspace = Workspace::new(store);
    let mut summary = CommitSummary::default();

    for (index, pending) in finalized.operations.iter().enumerate() {
        log::debug!("applying {} (from {})", pending.operation, pending.origin);
        if let Err(error) = apply(&mut workspace, pending, layout, &mut summary) {
            log::debug!("commit stopped at operation {}: {}", index, error);
            return Err(Box::new(CommitFailure {
                error,
                failed: pending.clone(),
                unapplied: finalized.operations[index + 1..].to_vec(),
                applied: summary,
            }));
        }
    }

    log::info!(
        "commit wrote {} file(s), {} unchanged",
        summary.files_written.len(),
        summary.files_unchanged.len()
    );
    Ok(summary)
}

fn apply<S: FileStore + ?Sized>(
    workspace: &mut Workspace<'_, S>,
    pending: &PendingOperation,
    layout: &Layout,
    summary: &mut CommitSummary,
) -> Result<()> {
    match &pending.operation {
        Operation::AddDependency {
            name,
            locator,
            constraints,
        } => {
            let mut manifest = workspace.document(&layout.manifest)?;
            let segments = [
                PathSegment::Key(DEPENDENCIES_KEY.to_string()),
                PathSegment::Key(name.clone()),
            ];
            let wanted = Value::String(locator.clone().unwrap_or_else(|| constraints.clone()));

            match manifest.get(&segments) {
                Some(existing) if *existing == wanted => summary.unchanged(&layout.manifest),
                Some(existing) => {
                    log::warn!(
                        "{} already declares {} as {}; keeping it (wanted {})",
                        layout.manifest.display(),
                        name,
                        existing,
                        wanted
                    );
                    summary.unchanged(&layout.manifest);
                }
                None => {
                    manifest.set(&segments, wanted)?;
                    workspace.save(&manifest, summary)?;
                    summary.dependencies_added.push(name.clone());
                }
            }
        }
        Operation::SetConfig {
            namespace,
            key_path,
            value,
        } => {
            let mut document = workspace.document(&layout.config)?;
            let segments = full_path(namespace, key_path);

            match document.get(&segments) {
                Some(existing) if existing == value => {
                    summary.unchanged(&layout.config);
                    return Ok(());
                }
                Some(existing) => log::warn!(
                    "overwriting {} = {} in {} with {}",
                    pending.operation.target(),
                    existing,
                    layout.config.display(),
                    value
                ),
                None => {}
            }

            document.set(&segments, value.clone())?;
            workspace.save(&document, summary)?;
            summary.config_keys_set.push(pending.operation.target());
        }
        Operation::CreateFile {
            path,
            content,
            on_exists,
        } => match workspace.read(path)? {
            Some(existing) if existing == *content => summary.unchanged(path),
            Some(_) if *on_exists == OnExists::Skip => {
                log::debug!("{} exists; skipping create", path.display());
                summary.skipped_creates.push(path.clone());
            }
            Some(_) if *on_exists == OnExists::Error => {
                return Err(Error::FileExists { path: path.clone() });
            }
            _ => {
                workspace.write(path, content.clone())?;
                summary.written(path);
            }
        },
        Operation::PatchFile { path, transform } => {
            let current = workspace.read(path)?.ok_or_else(|| Error::Transform {
                path: path.clone(),
                message: "file does not exist".to_string(),
            })?;
            let patched = transform.apply(path, &current)?;
            if workspace.write(path, patched)? {
                summary.written(path);
            } else {
                summary.unchanged(path);
            }
        }
        Operation::DeferTask { .. } => summary.deferred.push(pending.clone()),
    }
    Ok(())
}
