//! Built-in peripheral models.

pub mod gc9106;

use crate::model_registry::ModelRegistry;

/// Register every model shipped with the generator.
pub fn register_builtin_models(registry: &mut ModelRegistry) {
    registry.register(gc9106::MODEL);
}
