use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "usd";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;
const DEFAULT_ORDER_NUMBER_START: i64 = 1000;

/// Application configuration, loaded from `config/*.toml` plus
/// `APP__`-prefixed environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret for verifying bearer tokens (issued by the identity
    /// provider, not by this service)
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to create missing tables on startup (dev/test convenience)
    #[serde(default)]
    pub auto_migrate: bool,

    /// Payment provider secret API key
    pub payment_api_key: String,

    /// Payment provider API base URL
    #[serde(default = "default_payment_api_base")]
    pub payment_api_base: String,

    /// Shared secret used to verify inbound payment webhooks. When unset the
    /// webhook endpoint rejects every delivery.
    #[serde(default)]
    pub payment_webhook_secret: Option<String>,

    /// Maximum accepted age of a signed webhook timestamp (seconds)
    #[serde(default = "default_webhook_tolerance")]
    pub payment_webhook_tolerance_secs: u64,

    /// Where the payment provider redirects the buyer after success
    pub checkout_success_url: String,

    /// Where the payment provider redirects the buyer on cancel
    pub checkout_cancel_url: String,

    /// ISO currency code used for payment sessions
    #[serde(default = "default_currency")]
    pub currency: String,

    /// First order number handed out when the counter row is created
    #[serde(default = "default_order_number_start")]
    pub order_number_start: i64,

    /// Internal address that receives new-order staff notifications
    #[serde(default)]
    pub staff_notification_email: Option<String>,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_payment_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_webhook_tolerance() -> u64 {
    DEFAULT_WEBHOOK_TOLERANCE_SECS
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_order_number_start() -> i64 {
    DEFAULT_ORDER_NUMBER_START
}

impl AppConfig {
    /// Minimal constructor used by tests.
    pub fn new(
        database_url: String,
        jwt_secret: String,
        payment_api_key: String,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            host: default_host(),
            port: default_port(),
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            payment_api_key,
            payment_api_base: default_payment_api_base(),
            payment_webhook_secret: None,
            payment_webhook_tolerance_secs: default_webhook_tolerance(),
            checkout_success_url: "http://localhost:3000/checkout/success".to_string(),
            checkout_cancel_url: "http://localhost:3000/cart".to_string(),
            currency: default_currency(),
            order_number_start: default_order_number_start(),
            staff_notification_email: None,
            cors_allowed_origins: None,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Loads configuration from `config/default.toml`, an environment-specific
/// overlay, and `APP__*` environment variables (highest precedence).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = env::var("APP_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder()
        .set_default("environment", run_env.clone())?
        .add_source(File::from(Path::new(CONFIG_DIR).join("default.toml")).required(false))
        .add_source(File::from(Path::new(CONFIG_DIR).join(format!("{run_env}.toml"))).required(false));

    builder = builder.add_source(Environment::with_prefix("APP").separator("__"));

    let cfg: AppConfig = builder.build()?.try_deserialize()?;

    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

    info!(environment = %cfg.environment, "Configuration loaded");
    Ok(cfg)
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "a_sufficiently_long_secret_for_testing_purposes".to_string(),
            "sk_test_123".to_string(),
            "test".to_string(),
        );

        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.currency, "usd");
        assert_eq!(cfg.payment_webhook_tolerance_secs, 300);
        assert!(cfg.is_development());
    }
}
