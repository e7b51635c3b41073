//! Reusable schema blocks.
//!
//! Peripheral models compose their schema from these generic blocks:
//!
//! | Block | Keys |
//! |-------|------|
//! | [`display_schema`] | `id`, `rotation`, `auto_clear_enabled`, `lambda`, `pages` |
//! | [`polling_schema`] | `update_interval` |
//! | [`component_schema`] | `setup_priority` |
//! | [`spi_device_schema`] | `spi_id`, `cs_pin`, `data_rate`, `spi_mode` |

use std::time::Duration;

use crate::schema::{Schema, SchemaError};
use crate::value::{FieldType, Value};

// ─── Key names ──────────────────────────────────────────────────────

pub const CONF_ID: &str = "id";
pub const CONF_ROTATION: &str = "rotation";
pub const CONF_AUTO_CLEAR_ENABLED: &str = "auto_clear_enabled";
pub const CONF_LAMBDA: &str = "lambda";
pub const CONF_PAGES: &str = "pages";
pub const CONF_UPDATE_INTERVAL: &str = "update_interval";
pub const CONF_SETUP_PRIORITY: &str = "setup_priority";
pub const CONF_SPI_ID: &str = "spi_id";
pub const CONF_CS_PIN: &str = "cs_pin";
pub const CONF_DATA_RATE: &str = "data_rate";
pub const CONF_SPI_MODE: &str = "spi_mode";
pub const CONF_RESET_PIN: &str = "reset_pin";
pub const CONF_DC_PIN: &str = "dc_pin";

// ─── Options & defaults ─────────────────────────────────────────────

/// Accepted display rotations in degrees.
pub const ROTATIONS: &[&str] = &["0", "90", "180", "270"];

/// SPI clock polarity / phase modes.
pub const SPI_MODES: &[&str] = &["mode0", "mode1", "mode2", "mode3"];

/// Polling interval used when a model does not override it.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

/// SPI clock used when neither model nor user sets one.
pub const DEFAULT_DATA_RATE_HZ: u32 = 1_000_000;

const BEHAVIOR_KEYS: &[&str] = &[CONF_PAGES, CONF_LAMBDA];

/// Common keys of every frame-buffer display.
///
/// `pages` and `lambda` both define what is drawn; at most one may be set.
pub fn display_schema() -> Result<Schema, SchemaError> {
    Schema::builder()
        .optional(CONF_ID, FieldType::Id)
        .with_default(
            CONF_ROTATION,
            FieldType::Enum(ROTATIONS),
            Value::Enum("0".into()),
        )
        .with_default(CONF_AUTO_CLEAR_ENABLED, FieldType::Bool, true)
        .optional(CONF_LAMBDA, FieldType::Lambda)
        .optional(CONF_PAGES, FieldType::Pages)
        .at_most_one(BEHAVIOR_KEYS)
        .build()
}

/// Polling component block with the given default interval.
pub fn polling_schema(default_interval: Duration) -> Result<Schema, SchemaError> {
    Schema::builder()
        .with_default(CONF_UPDATE_INTERVAL, FieldType::Duration, default_interval)
        .build()
}

/// Generic component block.
pub fn component_schema() -> Result<Schema, SchemaError> {
    Schema::builder()
        .optional(CONF_SETUP_PRIORITY, FieldType::Float)
        .build()
}

/// SPI device block with the given default clock.
pub fn spi_device_schema(default_data_rate_hz: u32) -> Result<Schema, SchemaError> {
    Schema::builder()
        .optional(CONF_SPI_ID, FieldType::Id)
        .optional(CONF_CS_PIN, FieldType::Pin)
        .with_default(
            CONF_DATA_RATE,
            FieldType::Frequency,
            Value::Frequency(default_data_rate_hz),
        )
        .with_default(
            CONF_SPI_MODE,
            FieldType::Enum(SPI_MODES),
            Value::Enum("mode0".into()),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_blocks_build() {
        assert!(display_schema().is_ok());
        assert!(polling_schema(DEFAULT_UPDATE_INTERVAL).is_ok());
        assert!(component_schema().is_ok());
        assert!(spi_device_schema(DEFAULT_DATA_RATE_HZ).is_ok());
    }

    #[test]
    fn polling_override_replaces_generic_default() {
        let schema = polling_schema(DEFAULT_UPDATE_INTERVAL)
            .unwrap()
            .extend(&polling_schema(Duration::from_secs(1)).unwrap())
            .unwrap();
        assert_eq!(
            schema.get(CONF_UPDATE_INTERVAL).unwrap().default_value(),
            Some(&Value::Duration(Duration::from_secs(1)))
        );
    }

    #[test]
    fn display_block_declares_behavior_exclusion() {
        let schema = display_schema().unwrap();
        assert_eq!(schema.constraints().len(), 1);
    }

    #[test]
    fn blocks_have_disjoint_keys() {
        let display = display_schema().unwrap();
        let spi = spi_device_schema(DEFAULT_DATA_RATE_HZ).unwrap();
        assert!(display.keys().all(|k| !spi.accepts(k)));
    }
}
