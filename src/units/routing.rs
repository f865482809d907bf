//! Routing unit: typed route helpers generated from the server's routes.
//!
//! The helpers themselves are emitted by a deferred `routes:generate` task,
//! which runs after Commit so it sees the final manifest and configuration.

use super::{entrypoint_path, script_extension, Composer, Unit, UnitArgs, FRONTEND_ROOT};
use crate::error::Result;
use crate::mutation::Operation;
use crate::transform::Transform;

pub const NAME: &str = "routing";
pub const DEPENDENCY: &str = "js-from-routes";
pub const VERSION: &str = "^4.0.0";
pub const GENERATE_TASK: &str = "routes:generate";

/// Naming style of generated route helpers. Shared with the integration
/// unit's key camelization.
pub const STYLE: &str = "camel";

#[derive(Debug, Clone, Copy, Default)]
pub struct Routing;

impl Unit for Routing {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Route helpers generated from server routes"
    }

    fn run(&self, args: &UnitArgs, cx: &mut Composer<'_>) -> Result<()> {
        let typescript = args.flag_or("typescript", true);

        cx.append(Operation::dependency(DEPENDENCY, VERSION));
        cx.append(Operation::config(NAME, "style", STYLE));
        cx.append(Operation::config(
            NAME,
            "output_folder",
            format!("{}/api", FRONTEND_ROOT),
        ));
        cx.append(Operation::config(
            NAME,
            "extension",
            script_extension(typescript),
        ));

        if cx.has_run(super::build_tooling::NAME) {
            cx.append(Operation::patch(
                entrypoint_path(typescript),
                Transform::EnsureLine {
                    line: "import '~/api'".to_string(),
                },
            ));
        } else {
            cx.notice("no client entrypoint was set up; import '~/api' where route helpers are needed");
        }

        cx.append(Operation::defer(GENERATE_TASK, Vec::<String>::new()));
        Ok(())
    }
}
