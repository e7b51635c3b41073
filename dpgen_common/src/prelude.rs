//! Prelude module for common re-exports.
//!
//! ```rust
//! use dpgen_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{BuildConfig, ConfigError, ConfigLoader, LogLevel, Manifest, SpiBusDecl};

// ─── Schema & validation ────────────────────────────────────────────
pub use crate::schema::{Constraint, FieldSpec, Presence, Schema, SchemaError};
pub use crate::validate::{validate, RawConfig, ValidatedConfig, ValidationError};

// ─── Values ─────────────────────────────────────────────────────────
pub use crate::pin::PinRef;
pub use crate::value::{FieldType, Page, Value};
