//! Calculator Configuration Settings
//!
//! Configuration types for the calculator service and client, loaded from
//! environment variables. Unparseable numbers fall back to their defaults;
//! values that would break a call (an unknown echo mode, a zero-capacity
//! response buffer, an empty endpoint) are rejected.

use std::time::Duration;

use crate::application::services::{BoundedWork, EchoMode};

/// Server port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// gRPC server port.
    pub grpc_port: u16,
    /// Health check and metrics HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            grpc_port: 50069,
            health_port: 8083,
        }
    }
}

/// Behaviour of the call handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSettings {
    /// Simulated work performed by `SumWithDeadline`.
    pub deadline_work: BoundedWork,
    /// Pause after each factor emitted by `Factorize`.
    pub factor_emit_interval: Duration,
    /// What `FindMax` answers with.
    pub echo_mode: EchoMode,
    /// Capacity of each streaming call's response channel.
    pub response_buffer: usize,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            deadline_work: BoundedWork::default(),
            factor_emit_interval: Duration::from_millis(500),
            echo_mode: EchoMode::Latest,
            response_buffer: 64,
        }
    }
}

impl HandlerSettings {
    /// Settings without pauses, for tests and benchmarks.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            deadline_work: BoundedWork {
                steps: 0,
                step: Duration::ZERO,
            },
            factor_emit_interval: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Server port settings.
    pub server: ServerSettings,
    /// Handler behaviour.
    pub handlers: HandlerSettings,
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value that cannot be used.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_defaults = ServerSettings::default();
        let handler_defaults = HandlerSettings::default();

        let server = ServerSettings {
            grpc_port: parse_or(&lookup, "CALCULATOR_GRPC_PORT", server_defaults.grpc_port),
            health_port: parse_or(
                &lookup,
                "CALCULATOR_HEALTH_PORT",
                server_defaults.health_port,
            ),
        };

        let echo_mode = match lookup("CALCULATOR_MAX_ECHO_MODE") {
            Some(raw) => raw
                .parse::<EchoMode>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "CALCULATOR_MAX_ECHO_MODE".to_string(),
                    reason: e.to_string(),
                })?,
            None => handler_defaults.echo_mode,
        };

        let response_buffer = parse_or(
            &lookup,
            "CALCULATOR_RESPONSE_BUFFER",
            handler_defaults.response_buffer,
        );
        if response_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CALCULATOR_RESPONSE_BUFFER".to_string(),
                reason: "capacity must be at least 1".to_string(),
            });
        }

        let handlers = HandlerSettings {
            deadline_work: BoundedWork {
                steps: parse_or(
                    &lookup,
                    "CALCULATOR_DEADLINE_WORK_STEPS",
                    handler_defaults.deadline_work.steps,
                ),
                step: parse_millis_or(
                    &lookup,
                    "CALCULATOR_DEADLINE_STEP_MS",
                    handler_defaults.deadline_work.step,
                ),
            },
            factor_emit_interval: parse_millis_or(
                &lookup,
                "CALCULATOR_FACTOR_EMIT_INTERVAL_MS",
                handler_defaults.factor_emit_interval,
            ),
            echo_mode,
            response_buffer,
        };

        Ok(Self { server, handlers })
    }
}

/// Settings for the demonstration client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Server endpoint URI.
    pub endpoint: String,
    /// Delay between streamed requests.
    pub request_pacing: Duration,
    /// Timeout applied to `SumWithDeadline`.
    pub call_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:50069".to_string(),
            request_pacing: Duration::from_secs(1),
            call_timeout: Duration::from_secs(4),
        }
    }
}

impl ClientSettings {
    /// Create client settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is set but empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create client settings from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let endpoint = match lookup("CALCULATOR_ENDPOINT") {
            Some(raw) if raw.trim().is_empty() => {
                return Err(ConfigError::EmptyValue("CALCULATOR_ENDPOINT".to_string()));
            }
            Some(raw) => raw.trim().to_string(),
            None => defaults.endpoint,
        };

        Ok(Self {
            endpoint,
            request_pacing: parse_millis_or(
                &lookup,
                "CALCULATOR_REQUEST_PACING_MS",
                defaults.request_pacing,
            ),
            call_timeout: parse_millis_or(
                &lookup,
                "CALCULATOR_CALL_TIMEOUT_MS",
                defaults.call_timeout,
            ),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable holds a value that cannot be used.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_millis_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
