use std::str::FromStr;

use bigdecimal::BigDecimal;
use log::{error, info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::money::{to_minor_units, Currency};
use crate::domain::payment::{
    CustomerParams, IntentParams, PaymentIntentRequest, PaymentIntentResult, ProcessorError,
    SecretKey,
};
use crate::domain::ports::PaymentProcessor;

/// Major-unit amount used when a request omits `amount` and the diagnostic
/// placeholder is switched on.
pub const PLACEHOLDER_AMOUNT: i64 = 1000;

pub const DEFAULT_EPHEMERAL_KEY_API_VERSION: &str = "2022-11-15";

/// What to do with a customer created for a checkout whose later steps failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanedCustomerPolicy {
    /// Leave the customer in place and log it for manual reconciliation.
    #[default]
    LogOnly,
    /// Best-effort delete of the customer.
    Delete,
}

impl FromStr for OrphanedCustomerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::LogOnly),
            "delete" => Ok(Self::Delete),
            other => Err(format!("expected 'log' or 'delete', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub secret_key: Option<SecretKey>,
    pub publishable_key: Option<String>,
    pub currency: Currency,
    pub ephemeral_key_api_version: String,
    pub allow_placeholder_amount: bool,
    pub orphaned_customer_policy: OrphanedCustomerPolicy,
}

impl PaymentSettings {
    pub fn new(currency: Currency) -> Self {
        Self {
            secret_key: None,
            publishable_key: None,
            currency,
            ephemeral_key_api_version: DEFAULT_EPHEMERAL_KEY_API_VERSION.to_string(),
            allow_placeholder_amount: false,
            orphaned_customer_policy: OrphanedCustomerPolicy::default(),
        }
    }

    pub fn with_keys(
        mut self,
        secret_key: impl Into<String>,
        publishable_key: impl Into<String>,
    ) -> Self {
        self.secret_key = Some(SecretKey::new(secret_key));
        self.publishable_key = Some(publishable_key.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum PaymentIntentError {
    #[error("amount is required")]
    MissingAmount,
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("payment processor secret key is not configured")]
    MissingSecretKey,
    #[error("payment processor publishable key is not configured")]
    MissingPublishableKey,
    #[error("failed to create customer: {0}")]
    CustomerCreation(#[source] ProcessorError),
    #[error("failed to create ephemeral key: {source}")]
    EphemeralKey {
        customer_id: String,
        source: ProcessorError,
    },
    #[error("failed to create payment intent: {source}")]
    IntentCreation {
        customer_id: String,
        source: ProcessorError,
    },
}

impl PaymentIntentError {
    /// Input problems the caller can fix, as opposed to server-side failures.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingAmount | Self::InvalidAmount(_))
    }
}

/// Issues payment intents on behalf of the device so the processor secret
/// never leaves the server.
pub struct PaymentIntentService<P> {
    processor: P,
    settings: PaymentSettings,
}

impl<P: PaymentProcessor> PaymentIntentService<P> {
    pub fn new(processor: P, settings: PaymentSettings) -> Self {
        Self {
            processor,
            settings,
        }
    }

    pub fn currency(&self) -> &Currency {
        &self.settings.currency
    }

    /// Create customer, ephemeral key and payment intent, in that order.
    ///
    /// Input and configuration are checked before the processor is contacted.
    /// Nothing is retried; a failure after the customer exists is handled by
    /// the configured [`OrphanedCustomerPolicy`].
    pub async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntentResult, PaymentIntentError> {
        let amount = self.resolve_amount(request.amount)?;
        let currency = &self.settings.currency;
        let minor_amount = to_minor_units(&amount, currency)
            .map_err(|e| PaymentIntentError::InvalidAmount(e.to_string()))?;
        if minor_amount <= 0 {
            return Err(PaymentIntentError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }

        let key = self
            .settings
            .secret_key
            .as_ref()
            .ok_or(PaymentIntentError::MissingSecretKey)?;
        let publishable_key = self
            .settings
            .publishable_key
            .clone()
            .ok_or(PaymentIntentError::MissingPublishableKey)?;

        let order_reference = Uuid::new_v4();
        info!(
            "Creating payment intent for {} {} ({} minor units), order ref {}",
            amount, currency, minor_amount, order_reference
        );

        let customer = self
            .processor
            .create_customer(
                key,
                &CustomerParams {
                    order_reference,
                    user_id: request.user_id,
                },
            )
            .await
            .map_err(|e| {
                error!("Customer creation failed for order ref {}: {}", order_reference, e);
                PaymentIntentError::CustomerCreation(e)
            })?;

        let ephemeral_key = match self
            .processor
            .create_ephemeral_key(key, &customer.id, &self.settings.ephemeral_key_api_version)
            .await
        {
            Ok(ephemeral_key) => ephemeral_key,
            Err(source) => {
                error!(
                    "Ephemeral key creation failed for customer {}: {}",
                    customer.id, source
                );
                self.handle_orphaned_customer(key, &customer.id, order_reference)
                    .await;
                return Err(PaymentIntentError::EphemeralKey {
                    customer_id: customer.id,
                    source,
                });
            }
        };

        let intent = match self
            .processor
            .create_payment_intent(
                key,
                &IntentParams {
                    amount: minor_amount,
                    currency: currency.clone(),
                    customer_id: customer.id.clone(),
                    order_reference,
                },
            )
            .await
        {
            Ok(intent) => intent,
            Err(source) => {
                error!(
                    "Payment intent creation failed for customer {}: {}",
                    customer.id, source
                );
                self.handle_orphaned_customer(key, &customer.id, order_reference)
                    .await;
                return Err(PaymentIntentError::IntentCreation {
                    customer_id: customer.id,
                    source,
                });
            }
        };

        info!(
            "Payment intent {} ready for customer {} (order ref {})",
            intent.id, customer.id, order_reference
        );

        Ok(PaymentIntentResult {
            client_secret: intent.client_secret,
            ephemeral_key_secret: ephemeral_key.secret,
            customer_id: customer.id,
            publishable_key,
        })
    }

    fn resolve_amount(&self, amount: Option<BigDecimal>) -> Result<BigDecimal, PaymentIntentError> {
        match amount {
            Some(amount) => Ok(amount),
            None if self.settings.allow_placeholder_amount => {
                warn!(
                    "No amount supplied, using placeholder amount {}",
                    PLACEHOLDER_AMOUNT
                );
                Ok(BigDecimal::from(PLACEHOLDER_AMOUNT))
            }
            None => Err(PaymentIntentError::MissingAmount),
        }
    }

    async fn handle_orphaned_customer(
        &self,
        key: &SecretKey,
        customer_id: &str,
        order_reference: Uuid,
    ) {
        match self.settings.orphaned_customer_policy {
            OrphanedCustomerPolicy::LogOnly => warn!(
                "Customer {} (order ref {}) has no payment intent; reconcile manually",
                customer_id, order_reference
            ),
            OrphanedCustomerPolicy::Delete => {
                match self.processor.delete_customer(key, customer_id).await {
                    Ok(()) => info!(
                        "Deleted customer {} after failed checkout (order ref {})",
                        customer_id, order_reference
                    ),
                    Err(e) => error!(
                        "Could not delete customer {} (order ref {}): {}; reconcile manually",
                        customer_id, order_reference, e
                    ),
                }
            }
        }
    }
}
