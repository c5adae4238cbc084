//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "medcast.toml",
    "./config/config.toml",
    "./config/medcast.toml",
    "/etc/medcast/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("MEDCAST_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut AppConfig) {
        // HTTP
        if let Ok(val) = env::var("MEDCAST_HTTP_PORT") {
            if let Ok(port) = val.parse() {
                config.http.port = port;
            }
        }
        if let Ok(val) = env::var("MEDCAST_HTTP_HOST") {
            config.http.host = val;
        }
        if let Ok(val) = env::var("MEDCAST_CORS_ORIGINS") {
            config.http.cors_origins = val.split(',').map(|s| s.trim().to_string()).collect();
        }

        // MongoDB
        if let Ok(val) = env::var("MEDCAST_MONGODB_URI") {
            config.mongodb.uri = val;
        }
        if let Ok(val) = env::var("MEDCAST_MONGODB_DATABASE") {
            config.mongodb.database = val;
        }

        // WhatsApp provider
        if let Ok(val) = env::var("MEDCAST_WHATSAPP_BASE_URL") {
            config.whatsapp.api_base_url = val;
        }
        if let Ok(val) = env::var("MEDCAST_WHATSAPP_PHONE_NUMBER_ID") {
            config.whatsapp.phone_number_id = val;
        }
        if let Ok(val) = env::var("MEDCAST_WHATSAPP_ACCESS_TOKEN") {
            config.whatsapp.access_token = val;
        }
        if let Ok(val) = env::var("MEDCAST_WHATSAPP_DEFAULT_LOCALE") {
            config.whatsapp.default_locale = val;
        }

        // Dispatch
        if let Ok(val) = env::var("MEDCAST_DISPATCH_SENDS_PER_MINUTE") {
            if val.eq_ignore_ascii_case("none") {
                config.dispatch.sends_per_minute = None;
            } else if let Ok(rpm) = val.parse() {
                config.dispatch.sends_per_minute = Some(rpm);
            }
        }
        if let Ok(val) = env::var("MEDCAST_DISPATCH_SEND_TIMEOUT_SECONDS") {
            if let Ok(secs) = val.parse() {
                config.dispatch.send_timeout_seconds = secs;
            }
        }
        if let Ok(val) = env::var("MEDCAST_DISPATCH_LEDGER_WRITE_RETRIES") {
            if let Ok(retries) = val.parse() {
                config.dispatch.ledger_write_retries = retries;
            }
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
