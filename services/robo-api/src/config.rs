//! Configuration for the API service.

use std::time::Duration;

use robo_auth_core::{AuthConfig, SigningKey};
use robo_billing_core::BillingConfig;
use robo_fleet_core::config::{DEFAULT_MESSAGE_QUOTA, DEFAULT_PLAN_DURATION_DAYS};
use robo_fleet_core::FleetPolicy;
use robo_types::PlanType;

/// Ten years; larger values overflow plan expiry arithmetic
const MAX_PLAN_DURATION_DAYS: i64 = 3650;

/// Response generator settings
#[derive(Clone)]
pub struct GeneratorConfig {
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
    /// Token signing and password hashing
    pub auth: AuthConfig,
    /// Stripe keys, prices and redirect URLs
    pub billing: BillingConfig,
    /// Quota and plan length
    pub policy: FleetPolicy,
    /// Response generator
    pub generator: GeneratorConfig,
    /// Where replies are forwarded after each conversation, if anywhere
    pub notify_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        // Database
        let database_url = required("DATABASE_URL")?;

        // Server
        let http_port = parsed("HTTP_PORT", 8080)?;
        let request_timeout_secs: u64 = parsed("REQUEST_TIMEOUT_SECS", 30)?;
        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        // Auth: refuse to start without a usable key
        let signing_key = SigningKey::new(required("JWT_SECRET_KEY")?)
            .map_err(|_| ConfigError::Invalid("JWT_SECRET_KEY"))?;
        let auth = AuthConfig::new(signing_key);

        // Stripe
        let mut billing = BillingConfig::new(
            required("STRIPE_SECRET_KEY")?,
            required("STRIPE_WEBHOOK_SECRET")?,
        );
        for (plan_type, var) in [
            (PlanType::Basic, "STRIPE_BASIC_PRICE_ID"),
            (PlanType::Premium, "STRIPE_PREMIUM_PRICE_ID"),
            (PlanType::Enterprise, "STRIPE_ENTERPRISE_PRICE_ID"),
        ] {
            if let Some(price_id) = optional(var) {
                billing = billing.with_price(plan_type, price_id);
            }
        }
        if let (Some(success), Some(cancel)) =
            (optional("STRIPE_SUCCESS_URL"), optional("STRIPE_CANCEL_URL"))
        {
            billing = billing.with_urls(success, cancel);
        }

        // Generator
        let generator = GeneratorConfig {
            api_key: required("OPENAI_API_KEY")?,
            model: optional("OPENAI_MODEL"),
            base_url: optional("OPENAI_BASE_URL"),
        };

        // Fleet policy
        let notify_timeout_secs: u64 = parsed("NOTIFY_TIMEOUT_SECS", 5)?;
        let policy = FleetPolicy::default()
            .with_message_quota(parsed("MESSAGE_QUOTA", DEFAULT_MESSAGE_QUOTA)?)
            .with_plan_duration_days(parsed_in_range(
                "PLAN_DURATION_DAYS",
                DEFAULT_PLAN_DURATION_DAYS,
                1..=MAX_PLAN_DURATION_DAYS,
            )?)
            .with_notify_timeout(Duration::from_secs(notify_timeout_secs));

        Ok(Self {
            http_port,
            database_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
            auth,
            billing,
            policy,
            generator,
            notify_url: optional("NOTIFY_URL"),
        })
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    optional(var).ok_or(ConfigError::Missing(var))
}

fn optional(var: &'static str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(var) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(var)),
        None => Ok(default),
    }
}

fn parsed_in_range<T>(
    var: &'static str,
    default: T,
    range: std::ops::RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd,
{
    let value = parsed(var, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(var))
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
