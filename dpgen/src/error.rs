//! Per-instance generation errors.

use dpgen_common::schema::SchemaError;
use dpgen_common::validate::ValidationError;
use thiserror::Error;

use crate::collaborators::{RegisterError, ResolveError};

/// Why one display instance could not be generated.
///
/// Every variant names the instance; variants raised by a collaborator
/// also name the configuration key being processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenError {
    #[error("{instance}: unknown platform '{platform}'")]
    UnknownPlatform { instance: String, platform: String },

    #[error("{instance}: no platform given")]
    MissingPlatform { instance: String },

    #[error("{instance}: {source}")]
    Validation {
        instance: String,
        #[source]
        source: ValidationError,
    },

    #[error("{instance}: schema of model '{model}' is malformed: {source}")]
    Schema {
        instance: String,
        model: &'static str,
        #[source]
        source: SchemaError,
    },

    #[error("{instance}: [id] '{id}' is already used by another instance")]
    IdCollision { instance: String, id: String },

    #[error("{instance}: [{key}] {source}")]
    Resolution {
        instance: String,
        key: String,
        #[source]
        source: ResolveError,
    },

    #[error("{instance}: [{key}] {registrar} registration failed: {source}")]
    Registration {
        instance: String,
        key: String,
        registrar: &'static str,
        #[source]
        source: RegisterError,
    },
}

impl GenError {
    /// Id (or manifest position) of the failing instance.
    pub fn instance(&self) -> &str {
        match self {
            Self::UnknownPlatform { instance, .. }
            | Self::MissingPlatform { instance }
            | Self::Validation { instance, .. }
            | Self::Schema { instance, .. }
            | Self::IdCollision { instance, .. }
            | Self::Resolution { instance, .. }
            | Self::Registration { instance, .. } => instance,
        }
    }

    /// Configuration key the failure is attributed to.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::UnknownPlatform { .. } | Self::MissingPlatform { .. } => Some("platform"),
            Self::Validation { source, .. } => source.keys().first().copied(),
            Self::Schema { .. } => None,
            Self::IdCollision { .. } => Some("id"),
            Self::Resolution { key, .. } | Self::Registration { key, .. } => Some(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_instance_and_key() {
        let err = GenError::Resolution {
            instance: "tft".into(),
            key: "dc_pin".into(),
            source: ResolveError::EmptyLambda,
        };
        assert_eq!(err.instance(), "tft");
        assert_eq!(err.key(), Some("dc_pin"));
        assert_eq!(err.to_string(), "tft: [dc_pin] lambda body is empty");
    }

    #[test]
    fn validation_key_comes_from_source() {
        let err = GenError::Validation {
            instance: "display[0]".into(),
            source: ValidationError::MissingRequired {
                key: "dc_pin".into(),
            },
        };
        assert_eq!(err.key(), Some("dc_pin"));
    }
}
