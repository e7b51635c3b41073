//! GPIO pin references.
//!
//! `PinRef` is the structural form of a pin as written in configuration
//! (`"GPIO4"`, `"4"`, `4`, or a table with `number` / `inverted`).
//! Whether the pin exists on the target, is output-capable or is already
//! claimed is decided later by the pin resolver, not here.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// A GPIO pin as referenced from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct PinRef {
    /// GPIO number.
    pub number: u8,
    /// Logic inversion requested by the user.
    pub inverted: bool,
}

impl PinRef {
    /// Non-inverted pin with the given GPIO number.
    pub const fn gpio(number: u8) -> Self {
        Self {
            number,
            inverted: false,
        }
    }

    /// Same pin with the inversion flag set.
    pub const fn inverted(self) -> Self {
        Self {
            inverted: true,
            ..self
        }
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.number)
    }
}

impl FromStr for PinRef {
    type Err = String;

    /// Accepts `GPIO4`, `gpio4` and bare `4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = match trimmed.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("gpio") => &trimmed[4..],
            _ => trimmed,
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("unknown pin {s:?}, expected \"GPIO<n>\" or a pin number"));
        }
        let number: u8 = digits
            .parse()
            .map_err(|_| format!("pin number out of range: {s:?}"))?;
        Ok(Self::gpio(number))
    }
}

impl TryFrom<String> for PinRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
