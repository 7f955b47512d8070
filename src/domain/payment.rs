use std::fmt;

use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

use super::money::Currency;

/// Mask a credential for logs, keeping only a short prefix.
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    format!("{}***", prefix)
}

/// Server-side processor credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&redact(&self.0)).finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntentRequest {
    /// Major-unit amount. `None` only makes sense when the diagnostic
    /// placeholder is enabled.
    pub amount: Option<BigDecimal>,
    pub user_id: Option<String>,
}

/// Credentials handed to the device to drive the payment sheet for a single
/// checkout attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentIntentResult {
    pub client_secret: String,
    pub ephemeral_key_secret: String,
    pub customer_id: String,
    pub publishable_key: String,
}

impl fmt::Debug for PaymentIntentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentIntentResult")
            .field("client_secret", &redact(&self.client_secret))
            .field("ephemeral_key_secret", &redact(&self.ephemeral_key_secret))
            .field("customer_id", &self.customer_id)
            .field("publishable_key", &redact(&self.publishable_key))
            .finish()
    }
}

/// Intent id embedded in a client secret (`pi_123_secret_abc` -> `pi_123`).
pub fn intent_id_from_client_secret(client_secret: &str) -> Option<&str> {
    client_secret
        .split_once("_secret_")
        .map(|(id, _)| id)
        .filter(|id| !id.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerParams {
    pub order_reference: Uuid,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct EphemeralKey {
    pub id: String,
    pub secret: String,
}

impl fmt::Debug for EphemeralKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKey")
            .field("id", &self.id)
            .field("secret", &redact(&self.secret))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntentParams {
    /// Smallest currency unit.
    pub amount: i64,
    pub currency: Currency,
    pub customer_id: String,
    pub order_reference: Uuid,
}

#[derive(Clone, PartialEq, Eq)]
pub struct CreatedIntent {
    pub id: String,
    pub client_secret: String,
}

impl fmt::Debug for CreatedIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedIntent")
            .field("id", &self.id)
            .field("client_secret", &redact(&self.client_secret))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessorError {
    #[error("payment processor unreachable: {0}")]
    Transport(String),
    #[error("payment processor rejected the request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("unexpected payment processor response: {0}")]
    Decode(String),
}
