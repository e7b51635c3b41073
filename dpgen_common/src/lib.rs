//! DPGEN Common Library
//!
//! Configuration schema, validation and shared types for display
//! peripheral code generation.
//!
//! # Module Structure
//!
//! - [`value`] - Typed values, field types and scalar parsing
//! - [`pin`] - GPIO pin references
//! - [`schema`] - Schema descriptors, builder and composition
//! - [`schemas`] - Reusable display / polling / component / SPI blocks
//! - [`validate`] - Raw configuration validation and default resolution
//! - [`config`] - Build manifest loading
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use dpgen_common::prelude::*;
//!
//! let schema = Schema::builder()
//!     .required("dc_pin", FieldType::Pin)
//!     .with_default("device_width", FieldType::Int, 80_i64)
//!     .build()
//!     .unwrap();
//! let raw: RawConfig = toml::from_str("dc_pin = \"GPIO4\"").unwrap();
//! let config = schema.validate(&raw).unwrap();
//! assert_eq!(config.int("device_width"), Some(80));
//! ```

pub mod config;
pub mod pin;
pub mod prelude;
pub mod schema;
pub mod schemas;
pub mod validate;
pub mod value;
