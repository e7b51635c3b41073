//! Reference pin resolver for ESP32-class targets.
//!
//! Pin map:
//! - GPIO0..=GPIO39 exist,
//! - GPIO6..=GPIO11 are wired to the SPI flash and are never handed out,
//! - GPIO34..=GPIO39 are input-only,
//! - GPIO0, 2, 5, 12 and 15 are strapping pins (allowed, logged).
//!
//! Each pin can be claimed once, either by a peripheral or by a bus
//! through [`GpioPinTable::reserve`].

use std::collections::HashMap;

use dpgen_common::pin::PinRef;
use tracing::{debug, warn};

use super::{PeripheralHandle, PinHandle, PinMode, PinResolver, ResolveError};

const MAX_GPIO: u8 = 39;
const FLASH_PINS: std::ops::RangeInclusive<u8> = 6..=11;
const INPUT_ONLY_PINS: std::ops::RangeInclusive<u8> = 34..=39;
const STRAPPING_PINS: [u8; 5] = [0, 2, 5, 12, 15];

/// Pin claims for one build.
#[derive(Debug, Default)]
pub struct GpioPinTable {
    /// GPIO number → claimant (`handle.key` or a bus pin).
    claims: HashMap<u8, String>,
}

impl GpioPinTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owner of a claimed pin, if any.
    pub fn owner(&self, number: u8) -> Option<&str> {
        self.claims.get(&number).map(String::as_str)
    }

    pub fn claimed_count(&self) -> usize {
        self.claims.len()
    }

    /// Claim `pin` for something that is not a peripheral, such as the
    /// clock line of an SPI bus. `owner` is reported to later claimants.
    pub fn reserve(&mut self, pin: PinRef, owner: &str, mode: PinMode) -> Result<(), ResolveError> {
        self.check(pin, owner, mode)?;
        self.claims.insert(pin.number, owner.to_string());
        debug!("Reserved {pin} for {owner}");
        Ok(())
    }

    fn check(&self, pin: PinRef, claimant: &str, mode: PinMode) -> Result<(), ResolveError> {
        if pin.number > MAX_GPIO {
            return Err(ResolveError::InvalidPin { pin });
        }
        if FLASH_PINS.contains(&pin.number) {
            return Err(ResolveError::ReservedPin { pin });
        }
        if mode == PinMode::Output && INPUT_ONLY_PINS.contains(&pin.number) {
            return Err(ResolveError::InputOnlyPin { pin });
        }
        if let Some(existing) = self.claims.get(&pin.number) {
            return Err(ResolveError::PinInUse {
                pin,
                owner: existing.clone(),
            });
        }
        if STRAPPING_PINS.contains(&pin.number) {
            warn!("{claimant}: {pin} is a strapping pin, external pull resistors may affect boot");
        }
        Ok(())
    }
}

impl PinResolver for GpioPinTable {
    fn resolve(
        &mut self,
        owner: &PeripheralHandle,
        key: &str,
        var: String,
        pin: PinRef,
        mode: PinMode,
    ) -> Result<PinHandle, ResolveError> {
        let claimant = format!("{owner}.{key}");
        self.check(pin, &claimant, mode)?;
        debug!("Claimed {pin} for {claimant} as {var}");
        self.claims.insert(pin.number, claimant);
        Ok(PinHandle { var, pin, mode })
    }
}
