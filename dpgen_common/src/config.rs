//! Build manifest loading.
//!
//! A manifest is one TOML file describing a firmware build: shared build
//! settings, the SPI buses available on the board, and one raw table per
//! display instance. Instance tables stay untyped here; they are checked
//! against the selected peripheral model's schema by the generator.
//!
//! # TOML Example
//!
//! ```toml
//! [build]
//! name = "hallway-panel"
//! log_level = "debug"
//!
//! [[spi]]
//! id = "spi_bus"
//! clk_pin = "GPIO18"
//! mosi_pin = "GPIO23"
//!
//! [[display]]
//! platform = "gc9106"
//! dc_pin = "GPIO4"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::pin::PinRef;
use crate::validate::RawConfig;
use crate::value::{is_identifier, parse_frequency};

/// Key selecting the peripheral model of a display instance.
pub const CONF_PLATFORM: &str = "platform";

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for the generator.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Shared build settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Project name, reported in logs.
    pub name: String,

    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,
}

impl BuildConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "build.name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_max_data_rate() -> String {
    "80MHz".to_string()
}

/// An SPI bus available on the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpiBusDecl {
    /// Bus identifier referenced by `spi_id`.
    pub id: String,
    pub clk_pin: PinRef,
    #[serde(default)]
    pub mosi_pin: Option<PinRef>,
    #[serde(default)]
    pub miso_pin: Option<PinRef>,
    /// Highest clock the bus supports, e.g. `"40MHz"`.
    #[serde(default = "default_max_data_rate")]
    pub max_data_rate: String,
}

impl SpiBusDecl {
    /// `max_data_rate` in Hz.
    pub fn max_data_rate_hz(&self) -> Result<u32, ConfigError> {
        parse_frequency(&self.max_data_rate).map_err(|e| {
            ConfigError::ValidationError(format!("spi '{}': max_data_rate: {e}", self.id))
        })
    }
}

/// Complete build manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub build: BuildConfig,

    #[serde(default)]
    pub spi: Vec<SpiBusDecl>,

    /// Raw display instance tables, each with a `platform` key.
    #[serde(default)]
    pub display: Vec<RawConfig>,
}

impl Manifest {
    /// Check manifest-level rules. Instance contents are not inspected
    /// beyond the `platform` key.
    ///
    /// # Validation Rules
    /// 1. `build.name` non-empty
    /// 2. SPI bus ids are unique identifiers
    /// 3. SPI `max_data_rate` parses as a frequency
    /// 4. every display table names its `platform` as a string
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build.validate()?;

        let mut bus_ids = HashSet::new();
        for bus in &self.spi {
            if !is_identifier(&bus.id) {
                return Err(ConfigError::ValidationError(format!(
                    "spi id {:?} is not a valid identifier",
                    bus.id
                )));
            }
            if !bus_ids.insert(bus.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate spi bus id: {}",
                    bus.id
                )));
            }
            bus.max_data_rate_hz()?;
        }

        for (idx, display) in self.display.iter().enumerate() {
            match display.get(CONF_PLATFORM) {
                Some(toml::Value::String(_)) => {}
                Some(_) => {
                    return Err(ConfigError::ValidationError(format!(
                        "display[{idx}].platform must be a string"
                    )));
                }
                None => {
                    return Err(ConfigError::ValidationError(format!(
                        "display[{idx}] has no platform"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

impl Manifest {
    /// Load and validate a manifest file.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let manifest = Self::load(path)?;
        manifest.validate()?;
        tracing::debug!(
            "Loaded manifest '{}': {} spi bus(es), {} display(s)",
            manifest.build.name,
            manifest.spi.len(),
            manifest.display.len()
        );
        Ok(manifest)
    }
}
