//! CLI configuration module.
//!
//! Configuration is layered: built-in defaults, then an optional TOML
//! file, then `BILLBOOK_*` environment variables.
//!
//! | Variable                          | Default          |
//! |-----------------------------------|------------------|
//! | `BILLBOOK_DATABASE_PATH`          | `./billbook.db`  |
//! | `BILLBOOK_USER_ID`                | `local-user`     |
//! | `BILLBOOK_DEFAULT_PAYMENT_METHOD` | from settings    |
//! | `BILLBOOK_DUE_SOON_DAYS`          | `7`              |
//! | `BILLBOOK_MAX_CONNECTIONS`        | `5`              |

use billbook_core::{TenantId, DUE_SOON_HORIZON_DAYS};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Tenant every command runs as
    pub user_id: String,

    /// Overrides the payment method taken from the tenant's settings
    pub default_payment_method: Option<String>,

    /// Horizon for `due-soon` in days
    pub due_soon_days: u32,

    /// Connection pool size
    pub max_connections: u32,
}

impl CliConfig {
    /// Load configuration from the process environment and an optional file.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_sources(file, Environment::with_prefix("BILLBOOK"))
    }

    /// Load configuration from explicit sources.
    pub fn from_sources(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("database_path", "./billbook.db")?
            .set_default("user_id", "local-user")?
            .set_default("due_soon_days", i64::from(DUE_SOON_HORIZON_DAYS))?
            .set_default("max_connections", 5)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: CliConfig = builder
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue("BILLBOOK_USER_ID".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("BILLBOOK_MAX_CONNECTIONS".to_string()));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue("BILLBOOK_DATABASE_PATH".to_string()));
        }
        Ok(())
    }

    /// The configured tenant.
    pub fn tenant(&self) -> Result<TenantId, ConfigError> {
        TenantId::new(self.user_id.trim()).map_err(|_| ConfigError::InvalidValue("BILLBOOK_USER_ID".to_string()))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Failed to read configuration: {0}")]
    Load(#[from] config::ConfigError),
}
