//! Reference SPI bus registrar over the buses declared in the manifest.

use dpgen_common::config::{ConfigError, SpiBusDecl};
use dpgen_common::pin::PinRef;
use tracing::{debug, info};

use super::{BusBinding, BusRegistrar, PeripheralHandle, RegisterError, SpiDevice};

/// One SPI controller available to devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiBus {
    pub id: String,
    pub clk: PinRef,
    pub mosi: Option<PinRef>,
    pub miso: Option<PinRef>,
    pub max_data_rate_hz: u32,
}

impl SpiBus {
    pub fn from_decl(decl: &SpiBusDecl) -> Result<Self, ConfigError> {
        Ok(Self {
            id: decl.id.clone(),
            clk: decl.clk_pin,
            mosi: decl.mosi_pin,
            miso: decl.miso_pin,
            max_data_rate_hz: decl.max_data_rate_hz()?,
        })
    }
}

/// Buses of one build, plus the devices attached to each.
#[derive(Debug, Default)]
pub struct SpiBusTable {
    buses: Vec<SpiBus>,
    /// `(bus id, device id)` in registration order.
    attached: Vec<(String, String)>,
}

impl SpiBusTable {
    pub fn new(buses: Vec<SpiBus>) -> Self {
        Self {
            buses,
            attached: Vec::new(),
        }
    }

    pub fn from_decls(decls: &[SpiBusDecl]) -> Result<Self, ConfigError> {
        let buses = decls
            .iter()
            .map(SpiBus::from_decl)
            .collect::<Result<Vec<_>, _>>()?;
        info!("SPI buses: {}", buses.len());
        Ok(Self::new(buses))
    }

    pub fn buses(&self) -> &[SpiBus] {
        &self.buses
    }

    /// Device ids attached to `bus_id`.
    pub fn devices_on(&self, bus_id: &str) -> Vec<&str> {
        self.attached
            .iter()
            .filter(|(bus, _)| bus == bus_id)
            .map(|(_, device)| device.as_str())
            .collect()
    }

    fn select(&self, spi_id: Option<&str>) -> Result<&SpiBus, RegisterError> {
        match spi_id {
            Some(id) => self
                .buses
                .iter()
                .find(|bus| bus.id == id)
                .ok_or_else(|| RegisterError::UnknownBus { id: id.to_string() }),
            None => match self.buses.as_slice() {
                [] => Err(RegisterError::NoBus),
                [only] => Ok(only),
                many => Err(RegisterError::AmbiguousBus { count: many.len() }),
            },
        }
    }
}

impl BusRegistrar for SpiBusTable {
    fn register(
        &mut self,
        handle: &PeripheralHandle,
        device: &SpiDevice,
    ) -> Result<BusBinding, RegisterError> {
        let bus = self.select(device.spi_id.as_deref())?;
        if bus.mosi.is_none() {
            return Err(RegisterError::NoMosi {
                bus: bus.id.clone(),
            });
        }
        if device.data_rate_hz > bus.max_data_rate_hz {
            return Err(RegisterError::DataRateTooHigh {
                bus: bus.id.clone(),
                requested: device.data_rate_hz,
                max: bus.max_data_rate_hz,
            });
        }

        let bus_id = bus.id.clone();
        debug!(
            "Attached {handle} to SPI bus {bus_id} at {} Hz, mode {}",
            device.data_rate_hz,
            device.mode.index()
        );
        self.attached.push((bus_id.clone(), handle.id().to_string()));
        Ok(BusBinding {
            bus_id,
            cs_pin: device.cs_pin.clone(),
            data_rate_hz: device.data_rate_hz,
            mode: device.mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::SpiMode;

    fn bus(id: &str, mosi: bool) -> SpiBus {
        SpiBus {
            id: id.to_string(),
            clk: PinRef::gpio(18),
            mosi: mosi.then(|| PinRef::gpio(23)),
            miso: None,
            max_data_rate_hz: 40_000_000,
        }
    }

    fn device(spi_id: Option<&str>, rate: u32) -> SpiDevice {
        SpiDevice {
            spi_id: spi_id.map(str::to_string),
            cs_pin: None,
            data_rate_hz: rate,
            mode: SpiMode::Mode0,
        }
    }

    #[test]
    fn single_bus_is_the_default() {
        let mut table = SpiBusTable::new(vec![bus("spi_a", true)]);
        let handle = PeripheralHandle::new("tft");
        let binding = table.register(&handle, &device(None, 8_000_000)).unwrap();
        assert_eq!(binding.bus_id, "spi_a");
        assert_eq!(table.devices_on("spi_a"), vec!["tft"]);
    }

    #[test]
    fn default_bus_must_be_unambiguous() {
        let handle = PeripheralHandle::new("tft");
        let mut none = SpiBusTable::default();
        assert_eq!(
            none.register(&handle, &device(None, 1)),
            Err(RegisterError::NoBus)
        );

        let mut two = SpiBusTable::new(vec![bus("spi_a", true), bus("spi_b", true)]);
        assert_eq!(
            two.register(&handle, &device(None, 1)),
            Err(RegisterError::AmbiguousBus { count: 2 })
        );
        assert!(two.register(&handle, &device(Some("spi_b"), 1)).is_ok());
    }

    #[test]
    fn unknown_bus_id() {
        let mut table = SpiBusTable::new(vec![bus("spi_a", true)]);
        let err = table
            .register(&PeripheralHandle::new("tft"), &device(Some("spi_x"), 1))
            .unwrap_err();
        assert_eq!(err, RegisterError::UnknownBus { id: "spi_x".into() });
    }

    #[test]
    fn capability_checks() {
        let handle = PeripheralHandle::new("tft");
        let mut read_only = SpiBusTable::new(vec![bus("spi_a", false)]);
        assert!(matches!(
            read_only.register(&handle, &device(None, 1)),
            Err(RegisterError::NoMosi { .. })
        ));

        let mut table = SpiBusTable::new(vec![bus("spi_a", true)]);
        assert!(matches!(
            table.register(&handle, &device(None, 80_000_000)),
            Err(RegisterError::DataRateTooHigh { max: 40_000_000, .. })
        ));
        assert!(table.devices_on("spi_a").is_empty());
    }
}
