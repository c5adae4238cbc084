//! MedCast Configuration System
//!
//! This crate provides TOML-based configuration with environment variable
//! override support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub mongodb: MongoConfig,
    pub whatsapp: WhatsAppConfig,
    pub dispatch: DispatchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            mongodb: MongoConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::ValidationError(
                "http.port must be non-zero".to_string(),
            ));
        }
        if self.dispatch.send_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.send_timeout_seconds must be non-zero".to_string(),
            ));
        }
        if let Some(rpm) = self.dispatch.sends_per_minute {
            if rpm == 0 {
                return Err(ConfigError::ValidationError(
                    "dispatch.sends_per_minute must be non-zero when set".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["http://localhost:4200".to_string()],
        }
    }
}

/// MongoDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "medcast".to_string(),
        }
    }
}

/// WhatsApp Cloud API provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Graph API base URL
    pub api_base_url: String,
    /// Business phone number id the messages are sent from
    pub phone_number_id: String,
    /// Bearer token for the Cloud API
    pub access_token: String,
    /// Template language code used when a template does not carry one
    pub default_locale: String,
    pub connect_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://graph.facebook.com/v19.0".to_string(),
            phone_number_id: String::new(),
            access_token: String::new(),
            default_locale: "en".to_string(),
            connect_timeout_seconds: 10,
            request_timeout_seconds: 30,
        }
    }
}

/// Dispatch engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Outbound pacing quota. `None` disables pacing entirely.
    pub sends_per_minute: Option<u32>,
    /// Upper bound on one provider send call
    pub send_timeout_seconds: u64,
    /// Bounded retries for a ledger write that fails after a send resolved
    pub ledger_write_retries: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            // The legacy system paced at one send per 100ms
            sends_per_minute: Some(600),
            send_timeout_seconds: 30,
            ledger_write_retries: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let toml = r#"
            [http]
            port = 9999

            [dispatch]
            sends_per_minute = 120
        "#;
        let config = AppConfig::from_str(toml).unwrap();
        assert_eq!(config.http.port, 9999);
        assert_eq!(config.dispatch.sends_per_minute, Some(120));
        assert_eq!(config.mongodb.database, "medcast");
        assert_eq!(config.dispatch.ledger_write_retries, 3);
    }

    #[test]
    fn rejects_zero_send_timeout() {
        let toml = r#"
            [dispatch]
            send_timeout_seconds = 0
        "#;
        assert!(AppConfig::from_str(toml).is_err());
    }

    #[test]
    fn rejects_zero_pacing_quota() {
        let toml = r#"
            [dispatch]
            sends_per_minute = 0
        "#;
        assert!(AppConfig::from_str(toml).is_err());
    }
}
