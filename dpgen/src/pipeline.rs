//! Per-build generation pipeline.
//!
//! For each display instance: select the model by `platform`, validate the
//! rest of the table against the model schema, claim the instance id, then
//! run the setup sequencer. A failing instance is recorded and skipped;
//! its siblings are still generated.

use dpgen_common::config::{ConfigError, Manifest, CONF_PLATFORM};
use dpgen_common::schemas::{CONF_ID, CONF_PAGES};
use dpgen_common::validate::RawConfig;
use tracing::{debug, error, info};

use crate::collaborators::{Collaborators, SpiBusTable};
use crate::error::GenError;
use crate::ids::IdAllocator;
use crate::model_registry::ModelRegistry;
use crate::sequencer::{self, SetupSequence};

/// Outcome of one build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Sequences of every instance that succeeded, in manifest order.
    pub sequences: Vec<SetupSequence>,
    /// One error per failed instance, in manifest order.
    pub failures: Vec<GenError>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Generator for one build.
pub struct Generator {
    registry: ModelRegistry,
    ids: IdAllocator,
    collaborators: Collaborators,
}

impl Generator {
    pub fn new(registry: ModelRegistry, collaborators: Collaborators) -> Self {
        Self {
            registry,
            ids: IdAllocator::new(),
            collaborators,
        }
    }

    /// Generator with the built-in models and reference collaborators over
    /// the manifest's SPI buses.
    ///
    /// Bus ids are claimed first, so no display can take one.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, ConfigError> {
        let buses = SpiBusTable::from_decls(&manifest.spi)?;
        let mut ids = IdAllocator::new();
        for bus in buses.buses() {
            if !ids.claim(&bus.id) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate spi bus id: {}",
                    bus.id
                )));
            }
        }
        let registry = ModelRegistry::with_builtin_models();
        debug!("Available platforms: {}", registry.list_models().join(", "));
        Ok(Self {
            registry,
            ids,
            collaborators: Collaborators::reference(buses)?,
        })
    }

    /// Generate every instance. Never stops at the first failure.
    pub fn generate(&mut self, instances: &[RawConfig]) -> BuildReport {
        let mut report = BuildReport::default();
        for (idx, raw) in instances.iter().enumerate() {
            match self.generate_instance(idx, raw) {
                Ok(sequence) => report.sequences.push(sequence),
                Err(e) => {
                    error!(instance = e.instance(), key = e.key().unwrap_or("-"), "{e}");
                    report.failures.push(e);
                }
            }
        }
        info!(
            "Generated {} instance(s), {} failed",
            report.sequences.len(),
            report.failures.len()
        );
        report
    }

    /// Generate one instance. `idx` is its manifest position.
    pub fn generate_instance(
        &mut self,
        idx: usize,
        raw: &RawConfig,
    ) -> Result<SetupSequence, GenError> {
        let label = match raw.get(CONF_ID) {
            Some(toml::Value::String(id)) => id.clone(),
            _ => format!("display[{idx}]"),
        };

        let platform = match raw.get(CONF_PLATFORM) {
            Some(toml::Value::String(name)) => name.as_str(),
            _ => return Err(GenError::MissingPlatform { instance: label }),
        };
        let model = *self
            .registry
            .get_model(platform)
            .map_err(|_| GenError::UnknownPlatform {
                instance: label.clone(),
                platform: platform.to_string(),
            })?;

        let schema = model.schema().map_err(|source| GenError::Schema {
            instance: label.clone(),
            model: model.name,
            source,
        })?;
        let mut fields = raw.clone();
        fields.remove(CONF_PLATFORM);
        let config = schema
            .validate(&fields)
            .map_err(|source| GenError::Validation {
                instance: label.clone(),
                source,
            })?;

        let id = match config.text(CONF_ID) {
            Some(explicit) => {
                if !self.ids.claim(explicit) {
                    return Err(GenError::IdCollision {
                        instance: label,
                        id: explicit.to_string(),
                    });
                }
                explicit.to_string()
            }
            None => self.ids.generate(model.name),
        };
        for page_id in config
            .pages(CONF_PAGES)
            .unwrap_or_default()
            .iter()
            .filter_map(|page| page.id.as_deref())
        {
            if !self.ids.claim(page_id) {
                return Err(GenError::IdCollision {
                    instance: id,
                    id: page_id.to_string(),
                });
            }
        }

        sequencer::sequence(&model, &id, config, &mut self.ids, &mut self.collaborators)
    }
}
