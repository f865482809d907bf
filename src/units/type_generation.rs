//! Type generation unit: TypeScript types for serialized payloads.
//!
//! Only meaningful for TypeScript projects; the integration unit composes it
//! when `--typescript` is on, and the pipeline never invokes it directly.

use super::{Composer, Unit, UnitArgs, FRONTEND_ROOT};
use crate::error::Result;
use crate::mutation::{OnExists, Operation};

pub const NAME: &str = "type-generation";
pub const DEPENDENCY: &str = "typelizer";
pub const VERSION: &str = "^0.3.0";

/// Directory the generated types are written to.
pub fn output_dir() -> String {
    format!("{}/types/serializers", FRONTEND_ROOT)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TypeGeneration;

impl Unit for TypeGeneration {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "TypeScript types for serializer output"
    }

    fn run(&self, _args: &UnitArgs, cx: &mut Composer<'_>) -> Result<()> {
        cx.require(NAME, super::serialization::NAME)?;

        cx.append(Operation::dependency(DEPENDENCY, VERSION));
        cx.append(Operation::config("typegen", "output_dir", output_dir()));
        // Generated types assume this casing.
        cx.append(Operation::config(
            super::serialization::NAME,
            "transform_keys",
            super::serialization::TRANSFORM_KEYS,
        ));
        cx.append(Operation::create(
            format!("{}/index.ts", output_dir()),
            "// Generated by typelizer. Do not edit.\nexport {}\n",
            OnExists::Skip,
        ));
        Ok(())
    }
}
