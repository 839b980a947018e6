//! Worker configuration

use serde::Deserialize;
use uuid::Uuid;

use core_kernel::Timezone;
use infra_db::DatabaseConfig;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Worker configuration, read from `BILLING_*` environment variables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// PostgreSQL connection string
    pub database_url: String,
    pub max_connections: u32,
    /// Company whose ledger is swept
    pub company_id: Option<Uuid>,
    /// Actor recorded on changes made by the worker
    pub actor_id: Uuid,
    /// Company timezone used to decide what "today" is
    pub timezone: Timezone,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/msp_billing".to_string(),
            max_connections: 5,
            company_id: None,
            actor_id: Uuid::nil(),
            timezone: Timezone::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl WorkerConfig {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix("BILLING"))
    }

    /// Loads configuration from an environment source
    pub fn from_environment(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Pool settings derived from the worker settings
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone()).max_connections(self.max_connections)
    }
}
