//! Phase 3: Finalization
//!
//! Turns the mutation log into the effective plan. This is the only place
//! conflicts between units are detected; see [`MutationSet::finalize`].

use crate::mutation::{FinalizedSet, MutationSet};

/// Execute Phase 3: finalize `set`.
pub fn execute(set: MutationSet) -> FinalizedSet {
    let proposed = set.operations().len();
    let finalized = set.finalize();

    log::info!(
        "finalized {} of {} proposed operations",
        finalized.operations.len(),
        proposed
    );
    for error in finalized.errors() {
        log::debug!("finalize: {}", error);
    }
    finalized
}
