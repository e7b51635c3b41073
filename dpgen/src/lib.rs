//! # dpgen
//!
//! Display peripheral setup generator.
//!
//! Takes raw display instance tables from a build manifest, validates each
//! against its peripheral model's schema and turns it into an ordered list
//! of construction and setup operations, which are then rendered as
//! firmware source.
//!
//! # Module Structure
//!
//! - [`collaborators`] - registrar / resolver traits and reference implementations
//! - [`model`] - peripheral models, descriptors and the typed setup view
//! - [`models`] - built-in models
//! - [`model_registry`] - platform name → model lookup
//! - [`ids`] - build-wide id namespace
//! - [`sequencer`] - validated record → setup sequence
//! - [`pipeline`] - per-instance generation with failure isolation
//! - [`emit`] - C++ and JSON rendering
//!
//! # Pipeline
//!
//! ```text
//! manifest ─► raw table ─► Schema::validate ─► ValidatedConfig
//!                                                   │
//!                  collaborators ◄──── sequencer ◄──┘
//!                                          │
//!                                          ▼
//!                                    SetupSequence ─► emit
//! ```

pub mod collaborators;
pub mod emit;
pub mod error;
pub mod ids;
pub mod model;
pub mod model_registry;
pub mod models;
pub mod pipeline;
pub mod sequencer;

pub use error::GenError;
pub use pipeline::{BuildReport, Generator};
pub use sequencer::{SetupOp, SetupSequence};
