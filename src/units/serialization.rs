//! Serialization unit: serializer base class and key casing convention.

use super::{Composer, Unit, UnitArgs};
use crate::error::Result;
use crate::mutation::{OnExists, Operation};

pub const NAME: &str = "serialization";
pub const DEPENDENCY: &str = "alba";
pub const VERSION: &str = "^3.1.0";

/// Key casing applied to serialized payloads. Other units that consume the
/// payloads re-assert this value; finalize verifies they agree.
pub const TRANSFORM_KEYS: &str = "lower_camel";

pub const BASE_SERIALIZER: &str = "app/serializers/application_serializer.rb";

#[derive(Debug, Clone, Copy, Default)]
pub struct Serialization;

impl Unit for Serialization {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Serializer base class and key casing"
    }

    fn run(&self, _args: &UnitArgs, cx: &mut Composer<'_>) -> Result<()> {
        cx.append(Operation::dependency(DEPENDENCY, VERSION));
        cx.append(Operation::config(NAME, "transform_keys", TRANSFORM_KEYS));
        cx.append(Operation::create(
            BASE_SERIALIZER,
            format!(
                "class ApplicationSerializer\n  include Alba::Resource\n\n  transform_keys :{}\nend\n",
                TRANSFORM_KEYS
            ),
            OnExists::Skip,
        ));
        Ok(())
    }
}
