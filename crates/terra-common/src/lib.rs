//! Shared building blocks for the Terra authentication workspace

pub mod auth_constants;
pub mod config;
pub mod logging;

pub use config::{ConfigLoader, ConfigurationError};
