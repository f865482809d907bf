//! # stackweave
//!
//! A declarative, idempotent installer for a frontend stack. Independent
//! installer units propose mutations to a project (dependencies, configuration
//! keys, new files, patches to existing files, follow-up tasks); the pipeline
//! checks that the proposals agree and only then applies them.
//!
//! ## Quick Example
//!
//! ```
//! use stackweave::config::Layout;
//! use stackweave::options::RawOptions;
//! use stackweave::phases::orchestrator::run;
//! use stackweave::store::MemoryStore;
//! use stackweave::tasks::RecordingTaskRunner;
//! use stackweave::units::Registry;
//!
//! let registry = Registry::builtin();
//! let mut store = MemoryStore::new();
//! let mut tasks = RecordingTaskRunner::new();
//!
//! let raw = RawOptions::new().with("framework", "vue");
//! let outcome = run(&registry, &raw, &Layout::default(), &mut store, &mut tasks).unwrap();
//!
//! assert!(outcome.is_success());
//! assert!(store.exists("package.json"));
//! assert_eq!(tasks.names(), vec!["routes:generate"]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Options (`options`)**: declared user options, validated once before
//!   any unit runs.
//! - **Units (`units`)**: installers addressed by name plus string flags,
//!   held in a `Registry`. A unit may compose another unit.
//! - **Mutation Set (`mutation`)**: the append-only log of proposed
//!   operations and diagnostics for one run.
//! - **Coordinator (`coordinator`)**: merges configuration assertions from
//!   every unit and reports conflicts.
//! - **Phases (`phases`)**: validate, compose, finalize, commit; driven by the
//!   `orchestrator` state machine.
//! - **Stores and tasks (`store`, `tasks`)**: the only collaborators that touch
//!   the outside world, used after finalization.
//!
//! ## Execution Flow
//!
//! 1.  **Validate**: raw option strings become typed `Options`; bad choices
//!     warn and fall back to defaults, bad flags abort.
//! 2.  **Compose**: units run in `PIPELINE_ORDER`, appending operations.
//! 3.  **Finalize**: duplicates collapse; conflicts and invalid payloads are
//!     fatal.
//! 4.  **Commit**: operations are applied in order; deferred tasks run after.
//!
//! Nothing is written unless all of phases 1-3 succeed.

pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod mutation;
pub mod options;
pub mod output;
pub mod phases;
pub mod report;
pub mod store;
pub mod tasks;
pub mod transform;
pub mod units;

#[cfg(test)]
mod pipeline_proptest;
