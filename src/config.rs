use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::application::payment_service::{
    OrphanedCustomerPolicy, PaymentSettings, DEFAULT_EPHEMERAL_KEY_API_VERSION,
};
use crate::domain::money::Currency;
use crate::domain::payment::SecretKey;
use crate::infrastructure::stripe::DEFAULT_API_BASE;

pub const DEFAULT_CURRENCY: &str = "MAD";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub payments: PaymentSettings,
    pub stripe_api_base: String,
    pub stripe_timeout: Duration,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from any name -> value lookup. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", get("PORT"), 8080u16)?;

        let currency_code = get("PAYMENT_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let currency = Currency::new(&currency_code).map_err(|e| ConfigError::Invalid {
            name: "PAYMENT_CURRENCY",
            reason: e.to_string(),
        })?;

        let mut payments = PaymentSettings::new(currency);
        payments.secret_key = get("STRIPE_SECRET_KEY").map(SecretKey::new);
        payments.publishable_key = get("STRIPE_PUBLISHABLE_KEY");
        payments.ephemeral_key_api_version = get("STRIPE_API_VERSION")
            .unwrap_or_else(|| DEFAULT_EPHEMERAL_KEY_API_VERSION.to_string());
        payments.allow_placeholder_amount =
            parse_or("ALLOW_PLACEHOLDER_AMOUNT", get("ALLOW_PLACEHOLDER_AMOUNT"), false)?;
        payments.orphaned_customer_policy = match get("ORPHANED_CUSTOMER_POLICY") {
            Some(raw) => raw
                .parse::<OrphanedCustomerPolicy>()
                .map_err(|reason| ConfigError::Invalid {
                    name: "ORPHANED_CUSTOMER_POLICY",
                    reason,
                })?,
            None => OrphanedCustomerPolicy::default(),
        };

        if payments.secret_key.is_none() {
            log::warn!("STRIPE_SECRET_KEY is not set; payment intent requests will fail");
        }
        if payments.publishable_key.is_none() {
            log::warn!("STRIPE_PUBLISHABLE_KEY is not set; payment intent requests will fail");
        }

        let timeout_secs = parse_or("STRIPE_TIMEOUT_SECS", get("STRIPE_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "STRIPE_TIMEOUT_SECS",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            database_url,
            host,
            port,
            payments,
            stripe_api_base: get("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            stripe_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: format!("'{}': {}", raw, e),
        }),
        None => Ok(default),
    }
}
