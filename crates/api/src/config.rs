//! Process configuration, read once from the environment at startup.

use releasehub_observability::LogFormat;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";

/// Which release store backs the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// `BIND_ADDRESS`, default `0.0.0.0:8080`.
    pub bind_address: String,
    /// `JWT_SECRET`; `None` means the insecure dev default is in use.
    pub jwt_secret: Option<String>,
    /// `USE_PERSISTENT_STORES` + `DATABASE_URL` + `DATABASE_MAX_CONNECTIONS`.
    pub store: StoreConfig,
    /// `LOG_FORMAT`, `json` (default) or `pretty`.
    pub log_format: LogFormat,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_address = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let jwt_secret = lookup("JWT_SECRET").filter(|s| !s.is_empty());

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).ok_or(ConfigError::Invalid {
                name: "LOG_FORMAT",
                value: raw,
            })?,
            None => LogFormat::default(),
        };

        let persistent = match lookup("USE_PERSISTENT_STORES") {
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| ConfigError::Invalid {
                name: "USE_PERSISTENT_STORES",
                value: raw,
            })?,
            None => false,
        };

        let store = if persistent {
            let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;
            let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
                Some(raw) => raw.trim().parse::<u32>().map_err(|_| ConfigError::Invalid {
                    name: "DATABASE_MAX_CONNECTIONS",
                    value: raw,
                })?,
                None => 5,
            };
            StoreConfig::Postgres {
                database_url,
                max_connections,
            }
        } else {
            StoreConfig::InMemory
        };

        Ok(Self {
            bind_address,
            jwt_secret,
            store,
            log_format,
        })
    }

    pub fn jwt_secret_or_dev_default(&self) -> &str {
        self.jwt_secret.as_deref().unwrap_or(DEV_JWT_SECRET)
    }
}
