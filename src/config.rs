//! Peer Configuration
//!
//! Runtime knobs for a peer. Gameplay constants (board size, fleet) are not
//! configurable and live in the crate root.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::core::salt::MIN_SALT_BYTES;

/// Which carrier the signals use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Same-process broadcast bus.
    #[default]
    Local,
    /// Loopback WebSocket between the two peers.
    Ws,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(TransportKind::Local),
            "ws" | "websocket" => Ok(TransportKind::Ws),
            other => Err(ConfigError::InvalidValue {
                var: "FLEET_TRANSPORT",
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Peer configuration.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Signal carrier.
    pub transport: TransportKind,
    /// Listen address for the WebSocket transport.
    pub ws_addr: SocketAddr,
    /// Salt length in bytes (at least 16).
    pub salt_bytes: usize,
    /// How long to wait for an answer before re-sending a guess.
    pub signal_timeout: Duration,
    /// Turn limit before the match is abandoned.
    pub max_turns: u32,
    /// `tracing` filter directive.
    pub log_filter: String,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Local,
            ws_addr: SocketAddr::from(([127, 0, 0, 1], 9001)),
            salt_bytes: 32,
            signal_timeout: Duration::from_millis(2000),
            max_turns: 200,
            log_filter: "info".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { var, value })
}

impl PeerConfig {
    /// Defaults overridden by `FLEET_*` and `RUST_LOG` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("FLEET_TRANSPORT") {
            config.transport = value.parse()?;
        }
        if let Some(value) = lookup("FLEET_WS_ADDR") {
            config.ws_addr = parse_var("FLEET_WS_ADDR", value)?;
        }
        if let Some(value) = lookup("FLEET_SALT_BYTES") {
            let bytes: usize = parse_var("FLEET_SALT_BYTES", value)?;
            config.salt_bytes = bytes.max(MIN_SALT_BYTES);
        }
        if let Some(value) = lookup("FLEET_SIGNAL_TIMEOUT_MS") {
            config.signal_timeout = Duration::from_millis(parse_var("FLEET_SIGNAL_TIMEOUT_MS", value)?);
        }
        if let Some(value) = lookup("FLEET_MAX_TURNS") {
            config.max_turns = parse_var("FLEET_MAX_TURNS", value)?;
        }
        if let Some(value) = lookup("RUST_LOG") {
            config.log_filter = value;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PeerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.transport, TransportKind::Local);
        assert_eq!(config.salt_bytes, 32);
        assert_eq!(config.max_turns, 200);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_overrides() {
        let config = PeerConfig::from_lookup(lookup(&[
            ("FLEET_TRANSPORT", "WS"),
            ("FLEET_WS_ADDR", "127.0.0.1:7000"),
            ("FLEET_SIGNAL_TIMEOUT_MS", "250"),
            ("FLEET_MAX_TURNS", "50"),
            ("RUST_LOG", "fleet_commit=debug"),
        ]))
        .unwrap();

        assert_eq!(config.transport, TransportKind::Ws);
        assert_eq!(config.ws_addr.port(), 7000);
        assert_eq!(config.signal_timeout, Duration::from_millis(250));
        assert_eq!(config.max_turns, 50);
        assert_eq!(config.log_filter, "fleet_commit=debug");
    }

    #[test]
    fn test_salt_bytes_clamped() {
        let config = PeerConfig::from_lookup(lookup(&[("FLEET_SALT_BYTES", "4")])).unwrap();
        assert_eq!(config.salt_bytes, MIN_SALT_BYTES);
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(PeerConfig::from_lookup(lookup(&[("FLEET_TRANSPORT", "carrier-pigeon")])).is_err());
        assert!(PeerConfig::from_lookup(lookup(&[("FLEET_MAX_TURNS", "many")])).is_err());
    }
}
