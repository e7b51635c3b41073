//! Registry of peripheral models.
//!
//! Maps platform names to [`PeripheralModel`]s. The registry is built at
//! startup, populated via `register()`, and handed to the generator by
//! value, so tests can run against a registry of their own.

use std::collections::HashMap;

use thiserror::Error;

use crate::model::PeripheralModel;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Model '{0}' is not registered")]
    ModelNotFound(String),
}

/// Registry of available peripheral models.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<&'static str, PeripheralModel>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in model.
    pub fn with_builtin_models() -> Self {
        let mut registry = Self::new();
        crate::models::register_builtin_models(&mut registry);
        registry
    }

    /// Register a model under its platform name.
    ///
    /// # Panics
    /// Panics if a model with the same name is already registered.
    pub fn register(&mut self, model: PeripheralModel) {
        if self.models.contains_key(model.name) {
            panic!("Model '{}' is already registered", model.name);
        }
        self.models.insert(model.name, model);
    }

    /// Look up a model by platform name.
    ///
    /// # Errors
    /// Returns `RegistryError::ModelNotFound` if no model with the given name is registered.
    pub fn get_model(&self, name: &str) -> Result<&PeripheralModel, RegistryError> {
        self.models
            .get(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))
    }

    /// List all registered platform names, sorted.
    pub fn list_models(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.models.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Geometry;
    use dpgen_common::schema::Schema;

    fn empty_schema() -> Result<Schema, dpgen_common::schema::SchemaError> {
        Schema::builder().build()
    }

    const TEST_MODEL: PeripheralModel = PeripheralModel::new(
        "test_panel",
        "test::Panel",
        &[],
        Geometry {
            width: 1,
            height: 1,
        },
        empty_schema,
    );

    #[test]
    fn registry_register_and_lookup() {
        let mut reg = ModelRegistry::new();
        reg.register(TEST_MODEL);
        let model = reg.get_model("test_panel").expect("should find");
        assert_eq!(model.class, "test::Panel");
    }

    #[test]
    fn registry_model_not_found() {
        let reg = ModelRegistry::new();
        assert_eq!(
            reg.get_model("st7735").unwrap_err(),
            RegistryError::ModelNotFound("st7735".into())
        );
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = ModelRegistry::new();
        reg.register(TEST_MODEL);
        reg.register(TEST_MODEL);
    }

    #[test]
    fn builtin_models() {
        let reg = ModelRegistry::with_builtin_models();
        assert_eq!(reg.list_models(), vec!["gc9106"]);
    }
}
