//! Integration unit: wires the frontend framework adapter into the app.
//!
//! Composes the type generation unit itself when `--typescript` is on, so the
//! pipeline never has to invoke it a second time.

use super::{entrypoint_path, ssr_entrypoint_path, Composer, Unit, UnitArgs, FRONTEND_ROOT};
use crate::error::Result;
use crate::mutation::{OnExists, Operation};
use crate::options::Framework;
use crate::transform::Transform;

pub const NAME: &str = "integration";
pub const VERSION: &str = "^1.2.0";

/// Adapter package for `framework`.
pub fn adapter(framework: Framework) -> &'static str {
    match framework {
        Framework::React => "@inertiajs/react",
        Framework::Vue => "@inertiajs/vue3",
        Framework::Svelte => "@inertiajs/svelte",
    }
}

fn page(framework: Framework, typescript: bool) -> (String, String) {
    let (extension, content) = match framework {
        Framework::React => (
            if typescript { "tsx" } else { "jsx" },
            "export default function Home() {\n  return <h1>Home</h1>\n}\n",
        ),
        Framework::Vue => ("vue", "<template>\n  <h1>Home</h1>\n</template>\n"),
        Framework::Svelte => ("svelte", "<h1>Home</h1>\n"),
    };
    (
        format!("{}/pages/Home.{}", FRONTEND_ROOT, extension),
        content.to_string(),
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Integration;

impl Unit for Integration {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Framework adapter, pages and entrypoint wiring"
    }

    fn run(&self, args: &UnitArgs, cx: &mut Composer<'_>) -> Result<()> {
        let framework = args.framework(NAME)?;
        let typescript = args.flag_or("typescript", true);
        let ssr = args.flag_or("ssr", false);

        cx.require(NAME, super::build_tooling::NAME)?;

        if typescript {
            cx.compose(
                super::type_generation::NAME,
                &[format!("--framework={}", framework)],
            );
        }

        // Payload keys arrive camelized unless the serializer says otherwise.
        let camelize = cx
            .config(super::serialization::NAME, "transform_keys")
            .map_or(true, |keys| keys.as_str() == Some(super::serialization::TRANSFORM_KEYS));

        let adapter = adapter(framework);
        cx.append(Operation::dependency(adapter, VERSION));
        cx.append(Operation::config(NAME, "framework", framework.as_str()));
        cx.append(Operation::config(NAME, "camelize", camelize));
        cx.append(Operation::config(NAME, "ssr", ssr));

        let (page_path, page_content) = page(framework, typescript);
        cx.append(Operation::create(page_path, page_content, OnExists::Skip));

        cx.append(Operation::patch(
            entrypoint_path(typescript),
            Transform::EnsureLine {
                line: format!("import {{ createInertiaApp }} from '{}'", adapter),
            },
        ));

        if ssr {
            cx.append(Operation::patch(
                ssr_entrypoint_path(typescript),
                Transform::EnsureLine {
                    line: format!("import createServer from '{}/server'", adapter),
                },
            ));
        }

        Ok(())
    }
}
