//! Server configuration loaded from environment variables.

use crate::permission::cache::{
    DEFAULT_FRESHNESS_SECONDS, DEFAULT_MAX_ENTRIES, DEFAULT_NEGATIVE_FRESHNESS_SECONDS,
};
use crate::permission::signature::{SigningDomain, DEFAULT_CHAIN_ID, DEFAULT_VERIFYING_CONTRACT};
use crate::permission::types::parse_address;
use crate::permission::validator::{ValidationPolicy, DEFAULT_PROBE_TIMEOUT};
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CHAIN_RPC_URL: &str = "https://mainnet.base.org";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub port: u16,
    pub chain_rpc_url: String,
    pub chain_rpc_timeout: Duration,
    pub freshness_window_seconds: u64,
    pub negative_freshness_window_seconds: u64,
    pub cache_max_entries: u64,
    pub signing_domain: SigningDomain,
}

impl ServerSettings {
    /// Build settings from a variable lookup, falling back to defaults for
    /// unset variables.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SigningDomain::default();

        Ok(ServerSettings {
            port: parse_var(&lookup, "PORT", DEFAULT_PORT)?,
            chain_rpc_url: lookup("CHAIN_RPC_URL")
                .unwrap_or_else(|| DEFAULT_CHAIN_RPC_URL.to_string()),
            chain_rpc_timeout: Duration::from_millis(parse_var(
                &lookup,
                "CHAIN_RPC_TIMEOUT_MS",
                DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
            )?),
            freshness_window_seconds: parse_var(
                &lookup,
                "FRESHNESS_WINDOW_SECONDS",
                DEFAULT_FRESHNESS_SECONDS,
            )?,
            negative_freshness_window_seconds: parse_var(
                &lookup,
                "NEGATIVE_FRESHNESS_WINDOW_SECONDS",
                DEFAULT_NEGATIVE_FRESHNESS_SECONDS,
            )?,
            cache_max_entries: parse_var(&lookup, "CACHE_MAX_ENTRIES", DEFAULT_MAX_ENTRIES)?,
            signing_domain: SigningDomain {
                name: lookup("SPEND_PERMISSION_DOMAIN_NAME").unwrap_or(defaults.name),
                version: lookup("SPEND_PERMISSION_DOMAIN_VERSION").unwrap_or(defaults.version),
                chain_id: parse_var(&lookup, "SPEND_PERMISSION_CHAIN_ID", DEFAULT_CHAIN_ID)?,
                verifying_contract: match lookup("SPEND_PERMISSION_MANAGER_ADDRESS") {
                    Some(value) => {
                        parse_address(&value).ok_or(ConfigError::InvalidValue {
                            var: "SPEND_PERMISSION_MANAGER_ADDRESS",
                            value,
                        })?
                    }
                    None => DEFAULT_VERIFYING_CONTRACT,
                },
            },
        })
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            freshness_window: self.freshness_window_seconds,
            negative_freshness_window: self.negative_freshness_window_seconds,
            probe_timeout: self.chain_rpc_timeout,
        }
    }
}

/// Load settings from the process environment.
pub fn load_config() -> Result<ServerSettings, ConfigError> {
    ServerSettings::from_vars(|name| env::var(name).ok())
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}
