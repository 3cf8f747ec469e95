//! Service configuration from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

use crate::escrow::ledger::DEFAULT_MINIMUM_BET;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Smallest accepted deposit and stake, in minimal currency units.
    pub minimum_bet: u128,
    /// Hex-encoded Ed25519 public key of the arbiter. The derived address
    /// is the only identity allowed to resolve matches.
    pub arbiter_pubkey: String,
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Load configuration from environment variables. `RPS_ARBITER_PUBKEY`
    /// is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let minimum_bet = match std::env::var("RPS_MINIMUM_BET") {
            Ok(raw) => raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    name: "RPS_MINIMUM_BET",
                    reason: e.to_string(),
                }
            })?,
            Err(_) => DEFAULT_MINIMUM_BET,
        };

        let arbiter_pubkey = std::env::var("RPS_ARBITER_PUBKEY")
            .map_err(|_| ConfigError::Missing("RPS_ARBITER_PUBKEY"))?;

        let bind_addr = std::env::var("RPS_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "RPS_BIND_ADDR",
                reason: e.to_string(),
            })?;

        Ok(Self {
            minimum_bet,
            arbiter_pubkey,
            bind_addr,
        })
    }
}
