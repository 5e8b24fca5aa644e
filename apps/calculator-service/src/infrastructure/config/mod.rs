//! Configuration Module
//!
//! Environment-driven settings for the service and the demonstration client.

mod settings;

pub use settings::{ClientSettings, ConfigError, HandlerSettings, ServerSettings, ServiceConfig};
