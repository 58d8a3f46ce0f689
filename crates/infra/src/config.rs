//! Process configuration from environment variables.
//!
//! | variable | default |
//! |----------|---------|
//! | `STOCKROOM_BIND_ADDR` | `0.0.0.0:8080` |
//! | `STOCKROOM_STORE` | `memory` (`memory` or `postgres`) |
//! | `DATABASE_URL` | required when the store is `postgres` |
//! | `STOCKROOM_DB_MAX_CONNECTIONS` | `10` |

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var} must be set when {because}")]
    Missing {
        var: &'static str,
        because: &'static str,
    },
}

/// Which store backs the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_raw =
            get("STOCKROOM_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_raw
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "STOCKROOM_BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        let store_kind = get("STOCKROOM_STORE").map(|v| v.to_ascii_lowercase());
        let store = match store_kind.as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("postgres") => {
                let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing {
                    var: "DATABASE_URL",
                    because: "STOCKROOM_STORE=postgres",
                })?;
                let max_connections = match get("STOCKROOM_DB_MAX_CONNECTIONS") {
                    None => DEFAULT_MAX_CONNECTIONS,
                    Some(raw) => match raw.parse::<u32>() {
                        Ok(n) if n > 0 => n,
                        _ => {
                            return Err(ConfigError::Invalid {
                                var: "STOCKROOM_DB_MAX_CONNECTIONS",
                                value: raw,
                                reason: "expected a positive integer".to_string(),
                            });
                        }
                    },
                };
                StoreBackend::Postgres {
                    database_url,
                    max_connections,
                }
            }
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "STOCKROOM_STORE",
                    value: other.to_string(),
                    reason: "expected 'memory' or 'postgres'".to_string(),
                });
            }
        };

        Ok(Self { bind_addr, store })
    }
}
