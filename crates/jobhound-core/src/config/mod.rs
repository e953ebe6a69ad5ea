//! Settings, one module per `[section]` of `config/default.toml`.

pub mod cache;
pub mod database;
pub mod housekeeping;
pub mod logging;
pub mod scanner;
pub mod sources;
pub mod telegram;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::cache::CacheConfig;
use self::database::DatabaseConfig;
use self::housekeeping::HousekeepingConfig;
use self::logging::LoggingConfig;
use self::scanner::ScannerConfig;
use self::sources::SourcesConfig;
use self::telegram::TelegramConfig;
use self::worker::WorkerConfig;

use crate::error::AppError;

/// Every section is optional; a missing one takes its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Scan scheduling and per-scan limits.
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// External posting sources.
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Telegram messaging transport.
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Retention housekeeping.
    #[serde(default)]
    pub housekeeping: HousekeepingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Later layers win: `config/default.toml`, then `config/{env}.toml`,
    /// then `JOBHOUND__SECTION__KEY` variables.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let layered = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("JOBHOUND")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Cannot read config/{env}: {e}")))?;

        Ok(layered.try_deserialize()?)
    }

    /// Log a redacted summary of the active configuration.
    pub fn log_summary(&self) {
        tracing::info!(
            database = %self.database.redacted_url(),
            cache = %self.cache.provider,
            delivery_concurrency = self.worker.delivery_concurrency,
            scan_schedule = %self.scanner.schedule,
            sources = ?self.sources.enabled_names(),
            telegram_polling = self.telegram.polling_enabled,
            "Configuration loaded"
        );
    }
}
