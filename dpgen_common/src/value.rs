//! Typed configuration values and scalar coercion helpers.
//!
//! Raw configuration arrives as an untyped TOML tree. The validator turns
//! each accepted field into a [`Value`] according to its declared
//! [`FieldType`]; the parsing helpers here cover the textual forms users
//! write for durations, frequencies, booleans and identifiers.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::pin::PinRef;

// ─── FieldType ──────────────────────────────────────────────────────

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Signed integer.
    Int,
    /// Boolean flag.
    Bool,
    /// Floating point number (integers are widened).
    Float,
    /// Free-form string.
    String,
    /// Time period, e.g. `"1s"` or `500` (milliseconds).
    Duration,
    /// Frequency, e.g. `"8MHz"` or `8000000` (Hz).
    Frequency,
    /// GPIO pin reference.
    Pin,
    /// User-supplied callback source.
    Lambda,
    /// C identifier naming a generated object.
    Id,
    /// One of a fixed set of options (matched case-insensitively).
    Enum(&'static [&'static str]),
    /// Non-empty list of display pages.
    Pages,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "integer"),
            Self::Bool => write!(f, "boolean"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::Duration => write!(f, "duration"),
            Self::Frequency => write!(f, "frequency"),
            Self::Pin => write!(f, "pin"),
            Self::Lambda => write!(f, "lambda"),
            Self::Id => write!(f, "identifier"),
            Self::Enum(options) => write!(f, "one of [{}]", options.join(", ")),
            Self::Pages => write!(f, "list of pages"),
        }
    }
}

// ─── Value ──────────────────────────────────────────────────────────

/// One display page: an optional id and its drawing lambda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Explicit page id, if the user gave one.
    pub id: Option<String>,
    /// Drawing callback source.
    pub lambda: String,
}

/// A resolved configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Float(f64),
    String(String),
    Duration(#[serde(serialize_with = "serialize_duration_ms")] Duration),
    /// Frequency in Hz.
    Frequency(u32),
    Pin(PinRef),
    Lambda(String),
    Id(String),
    /// Canonical spelling of the selected option.
    Enum(String),
    Pages(Vec<Page>),
}

impl Value {
    /// Whether this value is a valid instance of `ty`.
    pub fn matches(&self, ty: FieldType) -> bool {
        match (self, ty) {
            (Self::Int(_), FieldType::Int)
            | (Self::Bool(_), FieldType::Bool)
            | (Self::Float(_), FieldType::Float)
            | (Self::String(_), FieldType::String)
            | (Self::Duration(_), FieldType::Duration)
            | (Self::Frequency(_), FieldType::Frequency)
            | (Self::Pin(_), FieldType::Pin)
            | (Self::Lambda(_), FieldType::Lambda)
            | (Self::Id(_), FieldType::Id)
            | (Self::Pages(_), FieldType::Pages) => true,
            (Self::Enum(v), FieldType::Enum(options)) => options.contains(&v.as_str()),
            _ => false,
        }
    }

    /// Convert back to the raw TOML form accepted by the validator.
    pub fn to_toml(&self) -> toml::Value {
        match self {
            Self::Int(v) => toml::Value::Integer(*v),
            Self::Bool(v) => toml::Value::Boolean(*v),
            Self::Float(v) => toml::Value::Float(*v),
            Self::String(v) | Self::Lambda(v) | Self::Id(v) | Self::Enum(v) => {
                toml::Value::String(v.clone())
            }
            Self::Duration(d) => toml::Value::String(format_duration(*d)),
            Self::Frequency(hz) => toml::Value::String(format_frequency(*hz)),
            Self::Pin(pin) if pin.inverted => {
                let mut table = toml::Table::new();
                table.insert("number".into(), toml::Value::String(pin.to_string()));
                table.insert("inverted".into(), toml::Value::Boolean(true));
                toml::Value::Table(table)
            }
            Self::Pin(pin) => toml::Value::String(pin.to_string()),
            Self::Pages(pages) => toml::Value::Array(
                pages
                    .iter()
                    .map(|page| {
                        let mut table = toml::Table::new();
                        if let Some(id) = &page.id {
                            table.insert("id".into(), toml::Value::String(id.clone()));
                        }
                        table.insert("lambda".into(), toml::Value::String(page.lambda.clone()));
                        toml::Value::Table(table)
                    })
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) | Self::Lambda(v) | Self::Id(v) | Self::Enum(v) => write!(f, "{v}"),
            Self::Duration(d) => write!(f, "{}", format_duration(*d)),
            Self::Frequency(hz) => write!(f, "{}", format_frequency(*hz)),
            Self::Pin(pin) => write!(f, "{pin}"),
            Self::Pages(pages) => write!(f, "{} page(s)", pages.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Self::Duration(v)
    }
}

impl From<PinRef> for Value {
    fn from(v: PinRef) -> Self {
        Self::Pin(v)
    }
}

/// Serialize a `Duration` as whole milliseconds.
pub fn serialize_duration_ms<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

// ─── Parsing helpers ────────────────────────────────────────────────

/// Split `"12.5 ms"` into `(12.5, "ms")`.
fn split_number_unit(s: &str) -> Result<(f64, &str), String> {
    let s = s.trim();
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(end);
    if number.is_empty() {
        return Err(format!("expected a number in {s:?}"));
    }
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid number {number:?}"))?;
    Ok((value, unit.trim()))
}

/// Parse a time period such as `"1s"`, `"500ms"`, `"2min"`, `"1h"`, `"250us"`.
///
/// Resolution is one microsecond; finer fractions are rejected.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let (value, unit) = split_number_unit(s)?;
    let scale_us: f64 = match unit.to_ascii_lowercase().as_str() {
        "us" => 1.0,
        "ms" => 1_000.0,
        "s" | "sec" => 1_000_000.0,
        "min" => 60_000_000.0,
        "h" => 3_600_000_000.0,
        "" => return Err(format!("missing unit in {s:?} (use us, ms, s, min or h)")),
        other => return Err(format!("unknown time unit {other:?}")),
    };
    let micros = value * scale_us;
    if micros.fract() != 0.0 {
        return Err(format!("{s:?} is finer than one microsecond"));
    }
    if micros > u64::MAX as f64 {
        return Err(format!("{s:?} is out of range"));
    }
    Ok(Duration::from_micros(micros as u64))
}

/// Canonical text for a duration, exact to the microsecond.
pub fn format_duration(d: Duration) -> String {
    let micros = d.as_micros();
    if micros % 1_000_000 == 0 {
        format!("{}s", micros / 1_000_000)
    } else if micros % 1_000 == 0 {
        format!("{}ms", micros / 1_000)
    } else {
        format!("{micros}us")
    }
}

/// Parse a frequency such as `"8MHz"`, `"400kHz"` or `"10Hz"` into Hz.
pub fn parse_frequency(s: &str) -> Result<u32, String> {
    let (value, unit) = split_number_unit(s)?;
    let scale: f64 = match unit.to_ascii_lowercase().as_str() {
        "hz" => 1.0,
        "khz" => 1_000.0,
        "mhz" => 1_000_000.0,
        "" => return Err(format!("missing unit in {s:?} (use Hz, kHz or MHz)")),
        other => return Err(format!("unknown frequency unit {other:?}")),
    };
    let hz = value * scale;
    if hz.fract() != 0.0 {
        return Err(format!("{s:?} is not a whole number of Hz"));
    }
    if hz > u32::MAX as f64 {
        return Err(format!("{s:?} is out of range"));
    }
    Ok(hz as u32)
}

/// Canonical text for a frequency in Hz.
pub fn format_frequency(hz: u32) -> String {
    if hz != 0 && hz % 1_000_000 == 0 {
        format!("{}MHz", hz / 1_000_000)
    } else if hz != 0 && hz % 1_000 == 0 {
        format!("{}kHz", hz / 1_000)
    } else {
        format!("{hz}Hz")
    }
}

/// Boolean spellings accepted in addition to TOML `true` / `false`.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "enable" => Some(true),
        "false" | "no" | "off" | "disable" => Some(false),
        _ => None,
    }
}

/// Whether `s` is a valid C identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
