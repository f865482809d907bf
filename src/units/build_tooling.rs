//! Build tooling unit: bundler dependency, framework plugin and entrypoints.

use super::{entrypoint_path, ssr_entrypoint_path, Composer, Unit, UnitArgs, FRONTEND_ROOT};
use crate::error::Result;
use crate::mutation::{OnExists, Operation};
use crate::options::Framework;

pub const NAME: &str = "build-tooling";
pub const DEPENDENCY: &str = "vite";
pub const VERSION: &str = "^5.4.0";

/// Sets up the bundler every other unit's generated code is loaded through.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildTooling;

fn plugin(framework: Framework) -> &'static str {
    match framework {
        Framework::React => "@vitejs/plugin-react",
        Framework::Vue => "@vitejs/plugin-vue",
        Framework::Svelte => "@sveltejs/vite-plugin-svelte",
    }
}

const ENTRYPOINT: &str = "\
// Client entrypoint. Imports are added by installer units.
console.debug('frontend booted')
";

const SSR_ENTRYPOINT: &str = "\
// Server-side rendering entrypoint.
";

impl Unit for BuildTooling {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Bundler, framework plugin and client entrypoint"
    }

    fn run(&self, args: &UnitArgs, cx: &mut Composer<'_>) -> Result<()> {
        let framework = args.framework(NAME)?;
        let typescript = args.flag_or("typescript", true);
        let ssr = args.flag_or("ssr", false);

        cx.append(Operation::dependency(DEPENDENCY, VERSION));
        cx.append(Operation::config("build", "plugin", plugin(framework)));
        cx.append(Operation::config(
            "build",
            "entrypoints_dir",
            format!("{}/entrypoints", FRONTEND_ROOT),
        ));
        cx.append(Operation::create(
            entrypoint_path(typescript),
            ENTRYPOINT,
            OnExists::Skip,
        ));

        if ssr {
            cx.append(Operation::config(
                "build",
                "ssr_entrypoint",
                ssr_entrypoint_path(typescript),
            ));
            cx.append(Operation::create(
                ssr_entrypoint_path(typescript),
                SSR_ENTRYPOINT,
                OnExists::Skip,
            ));
        }

        Ok(())
    }
}
