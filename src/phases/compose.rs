//! Phase 2: Composition
//!
//! Runs every root unit of [`PIPELINE_ORDER`] with the validated options as
//! flags. Units append into one shared [`MutationSet`], so a unit sees what
//! earlier units proposed. Units marked [`Placement::ComposedBy`] are left to
//! their parent.
//!
//! A failing unit does not stop the phase; its error is recorded and the
//! remaining units still run so that one report lists every problem.

use super::{Placement, PIPELINE_ORDER};
use crate::mutation::MutationSet;
use crate::options::Options;
use crate::units::{Composer, Registry};

/// Execute Phase 2: run the pipeline's root units in order.
pub fn execute(registry: &Registry, options: &Options, set: &mut MutationSet) {
    let args = options.to_args();
    let mut composer = Composer::new(registry, set);

    for step in PIPELINE_ORDER {
        match step.placement {
            Placement::Root => composer.invoke(step.unit, &args),
            Placement::ComposedBy { parent, option } => {
                log::debug!("{} is composed by {} when --{} is set", step.unit, parent, option);
            }
        }
    }
}
