//! Phase 1: Option Validation
//!
//! Coerces raw option strings to [`Options`]. Choices that do not validate
//! become warnings with the declared default substituted; flags that do not
//! validate are errors, which abort the install before any unit runs.

use crate::mutation::{Diagnostic, MutationSet};
use crate::options::{Options, RawOptions};

/// Execute Phase 1: validate `raw` and record the diagnostics on `set`.
///
/// Returns the validated options and whether the install may continue.
pub fn execute(raw: &RawOptions, set: &mut MutationSet) -> (Options, bool) {
    let (options, diagnostics) = Options::validate(raw);
    let fatal = diagnostics.iter().any(Diagnostic::is_error);

    for diagnostic in diagnostics {
        log::debug!("option validation: {}", diagnostic);
        set.diagnose(diagnostic);
    }

    log::info!(
        "options: framework={} typescript={} ssr={}",
        options.framework,
        options.typescript,
        options.ssr
    );
    (options, !fatal)
}
