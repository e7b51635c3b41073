//! Validation of raw configuration against a [`Schema`].
//!
//! Checks run in a fixed order and the first failure is returned:
//!
//! 1. cross-field constraints (mutual exclusion),
//! 2. required keys present,
//! 3. no unknown keys,
//! 4. every given value coerces to its declared type.
//!
//! Missing optional keys are then filled from their defaults. Validation
//! is pure: it reads the raw table and returns a new record.

use std::time::Duration;

use thiserror::Error;

use crate::pin::PinRef;
use crate::schema::{Constraint, Schema};
use crate::value::{self, FieldType, Page, Value};

/// Untyped key/value tree as written by the user.
pub type RawConfig = toml::Table;

// ─── Error Types ────────────────────────────────────────────────────

/// Configuration rejected by the schema.
///
/// `key` fields hold the full key path, e.g. `pages[1].lambda`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Key not declared by the schema.
    #[error("[{key}] unknown configuration key")]
    UnknownKey { key: String },

    /// Value has the wrong TOML kind for the field.
    #[error("[{key}] expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: FieldType,
        found: &'static str,
    },

    /// Value has the right kind but cannot be interpreted.
    #[error("[{key}] invalid {expected}: {reason}")]
    InvalidValue {
        key: String,
        expected: FieldType,
        reason: String,
    },

    /// Required key not given.
    #[error("[{key}] required key is missing")]
    MissingRequired { key: String },

    /// More than one key of an at-most-one group is set.
    #[error("[{}] keys are mutually exclusive, set at most one of them", .keys.join(", "))]
    MutuallyExclusive { keys: Vec<String> },
}

impl ValidationError {
    /// Every key path the error refers to.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::UnknownKey { key }
            | Self::TypeMismatch { key, .. }
            | Self::InvalidValue { key, .. }
            | Self::MissingRequired { key } => vec![key.as_str()],
            Self::MutuallyExclusive { keys } => keys.iter().map(String::as_str).collect(),
        }
    }
}

// ─── ValidatedConfig ────────────────────────────────────────────────

/// Fully typed, defaulted and constraint-checked configuration.
///
/// Immutable. Entries follow schema declaration order. Optional keys
/// without a default that the user omitted are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    values: Vec<(&'static str, Value)>,
}

impl ValidatedConfig {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn duration(&self, key: &str) -> Option<Duration> {
        match self.get(key)? {
            Value::Duration(v) => Some(*v),
            _ => None,
        }
    }

    pub fn frequency(&self, key: &str) -> Option<u32> {
        match self.get(key)? {
            Value::Frequency(v) => Some(*v),
            _ => None,
        }
    }

    pub fn pin(&self, key: &str) -> Option<PinRef> {
        match self.get(key)? {
            Value::Pin(v) => Some(*v),
            _ => None,
        }
    }

    /// String-like value: string, lambda, identifier or enum option.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            Value::String(v) | Value::Lambda(v) | Value::Id(v) | Value::Enum(v) => Some(v),
            _ => None,
        }
    }

    pub fn pages(&self, key: &str) -> Option<&[Page]> {
        match self.get(key)? {
            Value::Pages(v) => Some(v),
            _ => None,
        }
    }

    /// Raw form of this record, with defaults materialised.
    ///
    /// Validating the result against the same schema yields an equal record.
    pub fn to_raw(&self) -> RawConfig {
        self.values
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.to_toml()))
            .collect()
    }
}

// ─── Validation ─────────────────────────────────────────────────────

impl Schema {
    /// Validate `raw` against this schema. See [`validate`].
    pub fn validate(&self, raw: &RawConfig) -> Result<ValidatedConfig, ValidationError> {
        validate(self, raw)
    }
}

/// Validate a raw configuration table and resolve defaults.
pub fn validate(schema: &Schema, raw: &RawConfig) -> Result<ValidatedConfig, ValidationError> {
    for constraint in schema.constraints() {
        match constraint {
            Constraint::AtMostOne(keys) => {
                let present: Vec<String> = keys
                    .iter()
                    .filter(|k| raw.contains_key(**k))
                    .map(|k| (*k).to_string())
                    .collect();
                if present.len() > 1 {
                    return Err(ValidationError::MutuallyExclusive { keys: present });
                }
            }
        }
    }

    if let Some(spec) = schema
        .fields()
        .iter()
        .find(|f| f.is_required() && !raw.contains_key(f.key))
    {
        return Err(ValidationError::MissingRequired {
            key: spec.key.to_string(),
        });
    }

    if let Some(key) = raw.keys().find(|k| !schema.accepts(k)) {
        return Err(ValidationError::UnknownKey { key: key.clone() });
    }

    let mut values = Vec::with_capacity(schema.fields().len());
    for spec in schema.fields() {
        match raw.get(spec.key) {
            Some(given) => values.push((spec.key, coerce(spec.key, spec.ty, given)?)),
            None => {
                if let Some(default) = spec.default_value() {
                    values.push((spec.key, default.clone()));
                }
            }
        }
    }
    Ok(ValidatedConfig { values })
}

fn kind(v: &toml::Value) -> &'static str {
    match v {
        toml::Value::String(_) => "string",
        toml::Value::Integer(_) => "integer",
        toml::Value::Float(_) => "float",
        toml::Value::Boolean(_) => "boolean",
        toml::Value::Datetime(_) => "datetime",
        toml::Value::Array(_) => "array",
        toml::Value::Table(_) => "table",
    }
}

fn mismatch(path: &str, expected: FieldType, found: &toml::Value) -> ValidationError {
    ValidationError::TypeMismatch {
        key: path.to_string(),
        expected,
        found: kind(found),
    }
}

fn invalid(path: &str, expected: FieldType, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        key: path.to_string(),
        expected,
        reason: reason.into(),
    }
}

/// Coerce one raw value to `ty`. `path` is used in error reports.
fn coerce(path: &str, ty: FieldType, raw: &toml::Value) -> Result<Value, ValidationError> {
    use toml::Value as T;

    match (ty, raw) {
        (FieldType::Int, T::Integer(v)) => Ok(Value::Int(*v)),
        (FieldType::Int, T::String(s)) => s
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| invalid(path, ty, format!("{s:?} is not an integer"))),

        (FieldType::Bool, T::Boolean(v)) => Ok(Value::Bool(*v)),
        (FieldType::Bool, T::String(s)) => value::parse_bool(s)
            .map(Value::Bool)
            .ok_or_else(|| invalid(path, ty, format!("{s:?} is not a boolean"))),

        (FieldType::Float, T::Float(v)) if v.is_finite() => Ok(Value::Float(*v)),
        (FieldType::Float, T::Float(v)) => Err(invalid(path, ty, format!("{v} is not finite"))),
        (FieldType::Float, T::Integer(v)) => Ok(Value::Float(*v as f64)),

        (FieldType::String, T::String(s)) => Ok(Value::String(s.clone())),

        (FieldType::Duration, T::String(s)) => {
            let period = value::parse_duration(s).map_err(|e| invalid(path, ty, e))?;
            if period.subsec_nanos() % 1_000_000 != 0 {
                return Err(invalid(
                    path,
                    ty,
                    format!("{s:?} is not a whole number of milliseconds"),
                ));
            }
            Ok(Value::Duration(period))
        }
        (FieldType::Duration, T::Integer(ms)) => u64::try_from(*ms)
            .map(|ms| Value::Duration(Duration::from_millis(ms)))
            .map_err(|_| invalid(path, ty, "negative time period")),

        (FieldType::Frequency, T::String(s)) => value::parse_frequency(s)
            .map(Value::Frequency)
            .map_err(|e| invalid(path, ty, e)),
        (FieldType::Frequency, T::Integer(hz)) => u32::try_from(*hz)
            .map(Value::Frequency)
            .map_err(|_| invalid(path, ty, format!("{hz} Hz is out of range"))),

        (FieldType::Pin, _) => coerce_pin(path, raw).map(Value::Pin),

        (FieldType::Lambda, T::String(s)) => Ok(Value::Lambda(s.clone())),

        (FieldType::Id, _) => coerce_id(path, raw).map(Value::Id),

        (FieldType::Enum(options), T::String(_) | T::Integer(_)) => {
            let text = match raw {
                T::String(s) => s.trim().to_string(),
                other => other.to_string(),
            };
            options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(&text))
                .map(|o| Value::Enum((*o).to_string()))
                .ok_or_else(|| invalid(path, ty, format!("{text:?} is not an accepted option")))
        }

        (FieldType::Pages, T::Array(items)) => coerce_pages(path, items).map(Value::Pages),

        _ => Err(mismatch(path, ty, raw)),
    }
}

fn coerce_id(path: &str, raw: &toml::Value) -> Result<String, ValidationError> {
    match raw {
        toml::Value::String(s) if value::is_identifier(s) => Ok(s.clone()),
        toml::Value::String(s) => Err(invalid(
            path,
            FieldType::Id,
            format!("{s:?} is not a valid identifier"),
        )),
        other => Err(mismatch(path, FieldType::Id, other)),
    }
}

fn coerce_pin(path: &str, raw: &toml::Value) -> Result<PinRef, ValidationError> {
    use toml::Value as T;

    match raw {
        T::String(s) => s.parse().map_err(|e: String| invalid(path, FieldType::Pin, e)),
        T::Integer(n) => u8::try_from(*n)
            .map(PinRef::gpio)
            .map_err(|_| invalid(path, FieldType::Pin, format!("pin number {n} out of range"))),
        T::Table(table) => {
            if let Some(key) = table.keys().find(|k| *k != "number" && *k != "inverted") {
                return Err(ValidationError::UnknownKey {
                    key: format!("{path}.{key}"),
                });
            }
            let number_path = format!("{path}.number");
            let mut pin = match table.get("number") {
                Some(number @ (T::String(_) | T::Integer(_))) => coerce_pin(&number_path, number)?,
                Some(other) => return Err(mismatch(&number_path, FieldType::Pin, other)),
                None => return Err(ValidationError::MissingRequired { key: number_path }),
            };
            if let Some(inverted) = table.get("inverted") {
                let inverted_path = format!("{path}.inverted");
                if let Value::Bool(true) = coerce(&inverted_path, FieldType::Bool, inverted)? {
                    pin = pin.inverted();
                }
            }
            Ok(pin)
        }
        other => Err(mismatch(path, FieldType::Pin, other)),
    }
}

fn coerce_pages(path: &str, items: &[toml::Value]) -> Result<Vec<Page>, ValidationError> {
    if items.is_empty() {
        return Err(invalid(path, FieldType::Pages, "at least one page is required"));
    }
    let mut pages: Vec<Page> = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{idx}]");
        let toml::Value::Table(table) = item else {
            return Err(ValidationError::TypeMismatch {
                key: item_path,
                expected: FieldType::Pages,
                found: kind(item),
            });
        };
        if let Some(key) = table.keys().find(|k| *k != "id" && *k != "lambda") {
            return Err(ValidationError::UnknownKey {
                key: format!("{item_path}.{key}"),
            });
        }
        let lambda_path = format!("{item_path}.lambda");
        let lambda = match table.get("lambda") {
            Some(toml::Value::String(src)) => src.clone(),
            Some(other) => return Err(mismatch(&lambda_path, FieldType::Lambda, other)),
            None => return Err(ValidationError::MissingRequired { key: lambda_path }),
        };
        let id = match table.get("id") {
            Some(raw) => {
                let id_path = format!("{item_path}.id");
                let id = coerce_id(&id_path, raw)?;
                if pages.iter().any(|p| p.id.as_deref() == Some(id.as_str())) {
                    return Err(invalid(&id_path, FieldType::Id, format!("duplicate page id {id:?}")));
                }
                Some(id)
            }
            None => None,
        };
        pages.push(Page { id, lambda });
    }
    Ok(pages)
}
