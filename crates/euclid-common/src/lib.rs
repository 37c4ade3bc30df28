//! euclid-common — Shared types, errors, configuration and runtime state used
//! across all Euclid's Window crates.

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod settings;

// Re-export commonly used types
pub use config::Settings;
pub use error::{EuclidError, Result};
pub use settings::SettingsStore;
