//! Peripheral models and the typed views the sequencer works from.
//!
//! A [`PeripheralModel`] is everything the generator needs to know about
//! one controller family: the platform name users select it by, the
//! generated class, its composed schema, and which validated keys feed the
//! constructor in which order.

use std::time::Duration;

use dpgen_common::pin::PinRef;
use dpgen_common::schema::{Schema, SchemaError};
use dpgen_common::schemas::{
    CONF_AUTO_CLEAR_ENABLED, CONF_CS_PIN, CONF_DATA_RATE, CONF_DC_PIN, CONF_LAMBDA, CONF_PAGES,
    CONF_RESET_PIN, CONF_ROTATION, CONF_SETUP_PRIORITY, CONF_SPI_ID, CONF_SPI_MODE,
    CONF_UPDATE_INTERVAL, ROTATIONS, SPI_MODES,
};
use dpgen_common::validate::{ValidatedConfig, ValidationError};
use dpgen_common::value::{FieldType, Page, Value};
use serde::Serialize;

use crate::collaborators::{Geometry, SpiMode};

// ─── Frame-buffer geometry keys ─────────────────────────────────────

pub const CONF_DEVICE_WIDTH: &str = "device_width";
pub const CONF_DEVICE_HEIGHT: &str = "device_height";
pub const CONF_COL_START: &str = "col_start";
pub const CONF_ROW_START: &str = "row_start";

/// Static description of one controller family.
#[derive(Debug, Clone, Copy)]
pub struct PeripheralModel {
    /// Platform name selected by `platform = "..."`.
    pub name: &'static str,
    /// Fully qualified class of the generated object.
    pub class: &'static str,
    /// Validated keys passed to the constructor, in parameter order.
    pub ctor_keys: &'static [&'static str],
    /// Controller RAM size.
    pub limits: Geometry,
    schema: fn() -> Result<Schema, SchemaError>,
}

impl PeripheralModel {
    pub const fn new(
        name: &'static str,
        class: &'static str,
        ctor_keys: &'static [&'static str],
        limits: Geometry,
        schema: fn() -> Result<Schema, SchemaError>,
    ) -> Self {
        Self {
            name,
            class,
            ctor_keys,
            limits,
            schema,
        }
    }

    /// Build the model's composed schema.
    pub fn schema(&self) -> Result<Schema, SchemaError> {
        (self.schema)()
    }
}

/// Constructed peripheral object: identity plus constructor arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeripheralDescriptor {
    pub id: String,
    pub class: &'static str,
    pub ctor_args: Vec<Value>,
}

impl PeripheralDescriptor {
    /// Collect constructor arguments in the model's fixed key order.
    pub fn from_config(
        model: &PeripheralModel,
        id: &str,
        config: &ValidatedConfig,
    ) -> Result<Self, ValidationError> {
        let ctor_args = model
            .ctor_keys
            .iter()
            .map(|key| config.get(key).cloned().ok_or_else(|| missing(key)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: id.to_string(),
            class: model.class,
            ctor_args,
        })
    }
}

/// What the display draws.
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    /// Nothing configured; the object is created without a writer.
    None,
    Writer(String),
    Pages(Vec<Page>),
}

/// SPI device settings before bus resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct SpiDeviceConfig {
    pub spi_id: Option<String>,
    pub cs_pin: Option<PinRef>,
    pub data_rate_hz: u32,
    pub mode: SpiMode,
}

/// Typed view of a validated display record.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySetup {
    pub update_interval: Duration,
    pub setup_priority: Option<f64>,
    pub width: i64,
    pub height: i64,
    pub col_start: i64,
    pub row_start: i64,
    pub rotation: u16,
    pub auto_clear: bool,
    pub reset_pin: Option<PinRef>,
    pub dc_pin: PinRef,
    pub behavior: Behavior,
    pub spi: SpiDeviceConfig,
}

fn missing(key: &str) -> ValidationError {
    ValidationError::MissingRequired {
        key: key.to_string(),
    }
}

fn require<T>(value: Option<T>, key: &str) -> Result<T, ValidationError> {
    value.ok_or_else(|| missing(key))
}

impl DisplaySetup {
    /// Extract the sequencer's view.
    ///
    /// Fails only when the record was validated against a schema that does
    /// not declare the display, polling and SPI blocks.
    pub fn from_validated(config: &ValidatedConfig) -> Result<Self, ValidationError> {
        let rotation_text = require(config.text(CONF_ROTATION), CONF_ROTATION)?;
        let rotation = rotation_text
            .parse::<u16>()
            .map_err(|e| ValidationError::InvalidValue {
                key: CONF_ROTATION.to_string(),
                expected: FieldType::Enum(ROTATIONS),
                reason: e.to_string(),
            })?;

        let mode_text = require(config.text(CONF_SPI_MODE), CONF_SPI_MODE)?;
        let mode = SpiMode::from_option(mode_text).ok_or_else(|| ValidationError::InvalidValue {
            key: CONF_SPI_MODE.to_string(),
            expected: FieldType::Enum(SPI_MODES),
            reason: format!("unsupported mode {mode_text:?}"),
        })?;

        let behavior = if let Some(lambda) = config.text(CONF_LAMBDA) {
            Behavior::Writer(lambda.to_string())
        } else if let Some(pages) = config.pages(CONF_PAGES) {
            Behavior::Pages(pages.to_vec())
        } else {
            Behavior::None
        };

        Ok(Self {
            update_interval: require(config.duration(CONF_UPDATE_INTERVAL), CONF_UPDATE_INTERVAL)?,
            setup_priority: config.float(CONF_SETUP_PRIORITY),
            width: require(config.int(CONF_DEVICE_WIDTH), CONF_DEVICE_WIDTH)?,
            height: require(config.int(CONF_DEVICE_HEIGHT), CONF_DEVICE_HEIGHT)?,
            col_start: require(config.int(CONF_COL_START), CONF_COL_START)?,
            row_start: require(config.int(CONF_ROW_START), CONF_ROW_START)?,
            rotation,
            auto_clear: require(config.bool(CONF_AUTO_CLEAR_ENABLED), CONF_AUTO_CLEAR_ENABLED)?,
            reset_pin: config.pin(CONF_RESET_PIN),
            dc_pin: require(config.pin(CONF_DC_PIN), CONF_DC_PIN)?,
            behavior,
            spi: SpiDeviceConfig {
                spi_id: config.text(CONF_SPI_ID).map(str::to_string),
                cs_pin: config.pin(CONF_CS_PIN),
                data_rate_hz: require(config.frequency(CONF_DATA_RATE), CONF_DATA_RATE)?,
                mode,
            },
        })
    }
}
