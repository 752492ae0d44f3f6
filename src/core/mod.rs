//! Core error and configuration types for the telemetry subsystem.

#![warn(missing_docs)]

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{RouteConfig, TelemetryConfig, TelemetryConfigBuilder};
pub use error::{Result, TallyError};
