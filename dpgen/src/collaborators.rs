//! Collaborator interfaces consumed by the setup sequencer.
//!
//! The sequencer never talks to a bus, a pin or a compiler directly. It
//! asks these traits to resolve and register things and records what they
//! return as setup operations. Each trait is a seam: the reference
//! implementations under this module are deterministic in-process models,
//! and tests plug in recording fakes.
//!
//! | Trait | Fails when |
//! |-------|------------|
//! | [`ComponentRegistrar`] | never for valid handles (idempotent) |
//! | [`DisplayRegistrar`] | geometry does not fit the controller |
//! | [`BusRegistrar`] | bus missing or incapable of the device's needs |
//! | [`PinResolver`] | pin invalid, reserved, input-only or already claimed |
//! | [`CallbackCompiler`] | source does not fit the callback signature |

use std::fmt;
use std::time::Duration;

use dpgen_common::config::ConfigError;
use dpgen_common::pin::PinRef;
use dpgen_common::value::serialize_duration_ms;
use serde::Serialize;
use thiserror::Error;

pub mod gpio;
pub mod lambda;
pub mod spi;
pub mod tables;

pub use gpio::GpioPinTable;
pub use lambda::LambdaCompiler;
pub use spi::{SpiBus, SpiBusTable};
pub use tables::{ComponentTable, DisplayTable};

const CONF_CLK_PIN: &str = "clk_pin";
const CONF_MOSI_PIN: &str = "mosi_pin";
const CONF_MISO_PIN: &str = "miso_pin";

// ─── Handles ────────────────────────────────────────────────────────

/// Handle to a constructed peripheral object.
///
/// Only the sequencer creates handles, right after emitting the
/// construction step, so every collaborator call sees a constructed object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PeripheralHandle {
    id: String,
}

impl PeripheralHandle {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for PeripheralHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Direction a pin is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PinMode {
    Output,
    Input,
}

/// A resolved GPIO pin expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinHandle {
    /// Variable name of the generated pin object.
    pub var: String,
    pub pin: PinRef,
    pub mode: PinMode,
}

/// Signature a callback is compiled against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackSignature {
    /// `(type, name)` pairs.
    pub params: Vec<(String, String)>,
    pub return_type: String,
}

impl CallbackSignature {
    /// `void (display::DisplayBuffer &it)`: the writer and page signature.
    pub fn display_writer() -> Self {
        Self {
            params: vec![("display::DisplayBuffer &".to_string(), "it".to_string())],
            return_type: "void".to_string(),
        }
    }

    pub fn returns_void(&self) -> bool {
        self.return_type == "void"
    }
}

/// A compiled callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackHandle {
    /// Variable name of the generated callback.
    pub var: String,
    pub signature: CallbackSignature,
    /// Body as it will be emitted.
    pub body: String,
}

// ─── Settings passed to registrars ──────────────────────────────────

/// Controller geometry limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub width: i64,
    pub height: i64,
}

/// Polling registration parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollingSettings {
    #[serde(serialize_with = "serialize_duration_ms")]
    pub interval: Duration,
    pub setup_priority: Option<f64>,
}

/// Display registration parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySettings {
    pub width: i64,
    pub height: i64,
    pub col_start: i64,
    pub row_start: i64,
    /// Controller RAM size the visible window must fit in.
    pub limits: Geometry,
    /// Degrees: 0, 90, 180 or 270.
    pub rotation: u16,
    pub auto_clear: bool,
}

/// SPI clock polarity / phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpiMode {
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

impl SpiMode {
    /// Parse the canonical `modeN` spelling.
    pub fn from_option(option: &str) -> Option<Self> {
        match option {
            "mode0" => Some(Self::Mode0),
            "mode1" => Some(Self::Mode1),
            "mode2" => Some(Self::Mode2),
            "mode3" => Some(Self::Mode3),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

/// SPI device parameters handed to the bus registrar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpiDevice {
    pub spi_id: Option<String>,
    pub cs_pin: Option<PinHandle>,
    pub data_rate_hz: u32,
    pub mode: SpiMode,
}

/// Outcome of a successful bus registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusBinding {
    pub bus_id: String,
    pub cs_pin: Option<PinHandle>,
    pub data_rate_hz: u32,
    pub mode: SpiMode,
}

// ─── Error Types ────────────────────────────────────────────────────

/// A pin or callback could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("{pin} does not exist on this target")]
    InvalidPin { pin: PinRef },

    #[error("{pin} is reserved for the flash interface")]
    ReservedPin { pin: PinRef },

    #[error("{pin} is input-only and cannot be used as an output")]
    InputOnlyPin { pin: PinRef },

    #[error("{pin} is already used by '{owner}'")]
    PinInUse { pin: PinRef, owner: String },

    #[error("lambda body is empty")]
    EmptyLambda,

    #[error("lambda has unbalanced braces")]
    UnbalancedBraces,

    #[error("lambda returns a value but the signature returns {return_type}")]
    UnexpectedReturn { return_type: String },
}

/// A registrar rejected the peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { key: &'static str, reason: String },

    #[error("no SPI bus named '{id}'")]
    UnknownBus { id: String },

    #[error("no SPI bus is configured")]
    NoBus,

    #[error("{count} SPI buses are configured, set spi_id to pick one")]
    AmbiguousBus { count: usize },

    #[error("SPI bus '{bus}' has no MOSI pin, the display cannot be written")]
    NoMosi { bus: String },

    #[error("data rate {requested} Hz exceeds the {max} Hz supported by bus '{bus}'")]
    DataRateTooHigh { bus: String, requested: u32, max: u32 },
}

impl RegisterError {
    /// Configuration key the rejection is about, when the registrar knows it.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::InvalidGeometry { key, .. } => Some(*key),
            Self::UnknownBus { .. } | Self::NoBus | Self::AmbiguousBus { .. } => Some("spi_id"),
            Self::NoMosi { .. } => Some("spi_id"),
            Self::DataRateTooHigh { .. } => Some("data_rate"),
        }
    }
}

// ─── Traits ─────────────────────────────────────────────────────────

/// Registers a peripheral with the host's polling scheduler.
pub trait ComponentRegistrar {
    /// Idempotent per handle.
    fn register(
        &mut self,
        handle: &PeripheralHandle,
        polling: &PollingSettings,
    ) -> Result<(), RegisterError>;
}

/// Makes a peripheral visible to the display subsystem.
pub trait DisplayRegistrar {
    fn register(
        &mut self,
        handle: &PeripheralHandle,
        settings: &DisplaySettings,
    ) -> Result<(), RegisterError>;
}

/// Binds a peripheral to an SPI bus.
pub trait BusRegistrar {
    fn register(
        &mut self,
        handle: &PeripheralHandle,
        device: &SpiDevice,
    ) -> Result<BusBinding, RegisterError>;
}

/// Turns a pin reference into a pin object owned by `owner`.
///
/// `var` is the object's name, already claimed in the build's id namespace.
pub trait PinResolver {
    fn resolve(
        &mut self,
        owner: &PeripheralHandle,
        key: &str,
        var: String,
        pin: PinRef,
        mode: PinMode,
    ) -> Result<PinHandle, ResolveError>;
}

/// Compiles user callback source against a signature.
///
/// `var` names the compiled callback, as with [`PinResolver`].
pub trait CallbackCompiler {
    fn compile(
        &mut self,
        var: String,
        source: &str,
        signature: &CallbackSignature,
    ) -> Result<CallbackHandle, ResolveError>;
}

/// The full set of collaborators one generator run talks to.
pub struct Collaborators {
    pub components: Box<dyn ComponentRegistrar>,
    pub displays: Box<dyn DisplayRegistrar>,
    pub buses: Box<dyn BusRegistrar>,
    pub pins: Box<dyn PinResolver>,
    pub callbacks: Box<dyn CallbackCompiler>,
}

impl Collaborators {
    /// Reference collaborators over the given SPI buses.
    ///
    /// The buses' clock and data pins are reserved up front, so displays
    /// cannot claim them.
    pub fn reference(buses: SpiBusTable) -> Result<Self, ConfigError> {
        let mut pins = GpioPinTable::new();
        for bus in buses.buses() {
            let lines = [
                (Some(bus.clk), CONF_CLK_PIN, PinMode::Output),
                (bus.mosi, CONF_MOSI_PIN, PinMode::Output),
                (bus.miso, CONF_MISO_PIN, PinMode::Input),
            ];
            for (pin, key, mode) in lines {
                let Some(pin) = pin else { continue };
                pins.reserve(pin, &format!("{}.{key}", bus.id), mode)
                    .map_err(|e| {
                        ConfigError::ValidationError(format!("spi '{}': {key}: {e}", bus.id))
                    })?;
            }
        }
        Ok(Self {
            components: Box::new(ComponentTable::new()),
            displays: Box::new(DisplayTable::new()),
            buses: Box::new(buses),
            pins: Box::new(pins),
            callbacks: Box::new(LambdaCompiler::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spi_mode_from_option() {
        assert_eq!(SpiMode::from_option("mode3"), Some(SpiMode::Mode3));
        assert_eq!(SpiMode::from_option("MODE3"), None);
        assert_eq!(SpiMode::Mode2.index(), 2);
    }

    #[test]
    fn writer_signature_returns_void() {
        let sig = CallbackSignature::display_writer();
        assert!(sig.returns_void());
        assert_eq!(sig.params.len(), 1);
    }

    #[test]
    fn register_error_keys() {
        assert_eq!(
            RegisterError::DataRateTooHigh {
                bus: "b".into(),
                requested: 2,
                max: 1
            }
            .key(),
            Some("data_rate")
        );
        assert_eq!(RegisterError::NoBus.key(), Some("spi_id"));
    }

    fn bus(id: &str, clk: u8, mosi: u8) -> SpiBus {
        SpiBus {
            id: id.into(),
            clk: PinRef::gpio(clk),
            mosi: Some(PinRef::gpio(mosi)),
            miso: None,
            max_data_rate_hz: 40_000_000,
        }
    }

    #[test]
    fn reference_rejects_buses_sharing_a_pin() {
        let buses = SpiBusTable::new(vec![bus("spi_a", 18, 23), bus("spi_b", 14, 18)]);
        match Collaborators::reference(buses) {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains("spi_b"), "{msg}");
                assert!(msg.contains("spi_a.clk_pin"), "{msg}");
            }
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("shared bus pin accepted"),
        }
        assert!(Collaborators::reference(SpiBusTable::new(vec![bus("spi_a", 18, 23)])).is_ok());
    }
}
