//! Implementation of the phases of an install.
//!
//! ## Overview
//!
//! An install follows 4 phases:
//! 1. Option Validation - Coerce raw option values to their declared types
//! 2. Composition - Run units in [`PIPELINE_ORDER`] against one mutation set
//! 3. Finalization - Detect conflicts and validate every operation payload
//! 4. Commit - Apply operations to a file store in append order, then hand
//!    deferred tasks to a task runner
//!
//! The [`orchestrator`] drives the phases through [`PipelineState`]. Nothing
//! touches storage before phase 4, so any fatal diagnostic raised in phases
//! 1-3 aborts with the tree untouched.

use std::fmt;

use crate::units::{build_tooling, integration, routing, serialization, type_generation};

// Phase modules
pub mod commit;
pub mod compose;
pub mod finalize;
pub mod orchestrator;
pub mod validate;

pub use commit as phase4;
pub use compose as phase2;
pub use finalize as phase3;
pub use validate as phase1;

/// Where an install is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    OptionsValidated,
    Composing,
    Finalized,
    Committing,
    Done,
    /// Terminal; reached from any state on a fatal diagnostic or a Commit
    /// failure.
    Aborted,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Aborted)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a unit in [`PIPELINE_ORDER`] gets invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The pipeline invokes it with the full option flags.
    Root,
    /// Another unit composes it when `option` is on; the pipeline never
    /// invokes it directly.
    ComposedBy {
        parent: &'static str,
        option: &'static str,
    },
}

/// One entry of the fixed unit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStep {
    pub unit: &'static str,
    pub placement: Placement,
}

/// Units in producer-before-consumer order.
///
/// A unit whose generated code other units import comes first. Adding a unit
/// means declaring its position here.
pub const PIPELINE_ORDER: &[PipelineStep] = &[
    PipelineStep {
        unit: build_tooling::NAME,
        placement: Placement::Root,
    },
    PipelineStep {
        unit: routing::NAME,
        placement: Placement::Root,
    },
    PipelineStep {
        unit: serialization::NAME,
        placement: Placement::Root,
    },
    PipelineStep {
        unit: type_generation::NAME,
        placement: Placement::ComposedBy {
            parent: integration::NAME,
            option: "typescript",
        },
    },
    PipelineStep {
        unit: integration::NAME,
        placement: Placement::Root,
    },
];

/// Position of `unit` in [`PIPELINE_ORDER`].
pub fn position(unit: &str) -> Option<usize> {
    PIPELINE_ORDER.iter().position(|step| step.unit == unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Registry;

    #[test]
    fn test_pipeline_order_names_every_builtin_unit_once() {
        let registry = Registry::builtin();
        let mut ordered: Vec<_> = PIPELINE_ORDER.iter().map(|step| step.unit).collect();
        ordered.sort_unstable();
        let registered: Vec<_> = registry.names().collect();
        assert_eq!(ordered, registered);
    }

    #[test]
    fn test_pipeline_order_is_fixed() {
        let order: Vec<_> = PIPELINE_ORDER.iter().map(|step| step.unit).collect();
        assert_eq!(
            order,
            vec![
                "build-tooling",
                "routing",
                "serialization",
                "type-generation",
                "integration"
            ]
        );
    }

    #[test]
    fn test_composed_units_precede_their_parent() {
        for (index, step) in PIPELINE_ORDER.iter().enumerate() {
            if let Placement::ComposedBy { parent, .. } = step.placement {
                let parent_index = position(parent).unwrap();
                assert!(parent_index > index, "{} must come before {}", step.unit, parent);
                assert_eq!(PIPELINE_ORDER[parent_index].placement, Placement::Root);
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Aborted.is_terminal());
        assert!(!PipelineState::Finalized.is_terminal());
        assert_eq!(PipelineState::OptionsValidated.to_string(), "OptionsValidated");
    }
}
