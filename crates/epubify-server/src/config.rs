use std::time::Duration;

use epubify_core::config::ConversionConfig;
use epubify_core::error::AppError;
use epubify_core::registry::DEFAULT_TASK_TTL;

pub const DEFAULT_PORT: u16 = 3000;

/// Server settings, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// How long finished and failed jobs stay downloadable.
    pub task_ttl: Duration,
    pub conversion: ConversionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            task_ttl: DEFAULT_TASK_TTL,
            conversion: ConversionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// `EPUBIFY_PORT` (default 3000) and `EPUBIFY_TASK_TTL_HOURS` (default 24),
    /// plus everything [`ConversionConfig::from_env`] reads.
    pub fn from_env() -> Result<Self, AppError> {
        let port = match std::env::var("EPUBIFY_PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::ConfigError(format!("Invalid EPUBIFY_PORT '{raw}'")))?,
            Err(_) => DEFAULT_PORT,
        };

        let task_ttl = match std::env::var("EPUBIFY_TASK_TTL_HOURS") {
            Ok(raw) => {
                let hours: u64 = raw.trim().parse().map_err(|_| {
                    AppError::ConfigError(format!("Invalid EPUBIFY_TASK_TTL_HOURS '{raw}'"))
                })?;
                if hours == 0 {
                    return Err(AppError::ConfigError(
                        "EPUBIFY_TASK_TTL_HOURS must be at least 1".into(),
                    ));
                }
                Duration::from_secs(hours * 60 * 60)
            }
            Err(_) => DEFAULT_TASK_TTL,
        };

        Ok(Self {
            port,
            task_ttl,
            conversion: ConversionConfig::from_env()?,
        })
    }
}
