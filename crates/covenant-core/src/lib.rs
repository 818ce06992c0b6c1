//! # covenant-core
//!
//! Foundation crate for the Covenant temporal intelligence and obligation engine.
//! Defines all types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;
pub mod validation;

// Re-export the most commonly used types at the crate root.
pub use config::CovenantConfig;
pub use errors::{CovenantError, CovenantResult, EntityKind};
pub use models::{BucketType, TimeSeriesPoint};
