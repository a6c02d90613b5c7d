//! Application Configuration Module
//!
//! Centralizes the configuration for the TPA server. Settings are loaded
//! from environment variables (with `.env` support for local development)
//! into a single shareable struct.

use std::env;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub package_name: String,
    pub port: u16,
    pub augmentos_api_key: String,
    pub augmentos_ws_url: String,
    pub openai_api_key: String,
    pub joke_model: String,
    pub max_user_jokes: u32,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// *   `PACKAGE_NAME`: (Optional) TPA package identifier. Defaults to "com.example.dadwall".
    /// *   `PORT`: (Optional) Webhook listener port. Defaults to 3000.
    /// *   `AUGMENTOS_API_KEY`: Your secret key for the AugmentOS cloud. Required.
    /// *   `AUGMENTOS_WS_URL`: (Optional) Cloud WebSocket endpoint to connect sessions to.
    /// *   `OPENAI_API_KEY`: Your secret key for the OpenAI API. Required.
    /// *   `JOKE_MODEL`: (Optional) The model used to generate jokes. Defaults to "gpt-4.1".
    /// *   `MAX_USER_JOKES`: (Optional) Per-user joke cap. Defaults to 5.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let package_name =
            env::var("PACKAGE_NAME").unwrap_or_else(|_| "com.example.dadwall".to_string());

        let port_str = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port = port_str
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("PORT".to_string(), port_str.clone()))?;

        let augmentos_api_key = env::var("AUGMENTOS_API_KEY").map_err(|_| {
            ConfigError::MissingVar("AUGMENTOS_API_KEY environment variable is required".to_string())
        })?;

        let augmentos_ws_url = env::var("AUGMENTOS_WS_URL")
            .unwrap_or_else(|_| "wss://prod.augmentos.cloud".to_string());

        let openai_api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            ConfigError::MissingVar("OPENAI_API_KEY environment variable is required".to_string())
        })?;

        let joke_model = env::var("JOKE_MODEL").unwrap_or_else(|_| "gpt-4.1".to_string());

        let max_jokes_str = env::var("MAX_USER_JOKES").unwrap_or_else(|_| "5".to_string());
        let max_user_jokes = max_jokes_str.parse::<u32>().map_err(|_| {
            ConfigError::InvalidValue("MAX_USER_JOKES".to_string(), max_jokes_str.clone())
        })?;

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            package_name,
            port,
            augmentos_api_key,
            augmentos_ws_url,
            openai_api_key,
            joke_model,
            max_user_jokes,
            log_level,
        })
    }
}
