use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bigdecimal::BigDecimal;
use log::{debug, info, warn};

use super::error::ClientError;
use super::gateway::{PaymentIntentGateway, PaymentSheet, UserNotifier};
use crate::domain::payment::{intent_id_from_client_secret, redact};
use crate::handlers::payments::PaymentIntentResponse;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a single checkout attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    RequestingIntent,
    IntentReady,
    PresentingSheet,
    Confirmed,
    Cancelled,
    Failed(String),
}

impl CheckoutState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RequestingIntent => "requestingIntent",
            Self::IntentReady => "intentReady",
            Self::PresentingSheet => "presentingSheet",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the platform payment sheet reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetResult {
    Completed,
    Canceled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Confirmed { payment_intent_id: String },
    Cancelled,
    Failed(String),
}

/// Everything the payment sheet needs for one intent.
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentSheetConfig {
    pub merchant_display_name: String,
    pub publishable_key: String,
    pub customer_id: String,
    pub customer_ephemeral_key_secret: String,
    pub payment_intent_client_secret: String,
    /// Needed for methods such as bank redirects that confirm later.
    pub allows_delayed_payment_methods: bool,
    pub return_url: String,
}

impl fmt::Debug for PaymentSheetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentSheetConfig")
            .field("merchant_display_name", &self.merchant_display_name)
            .field("publishable_key", &redact(&self.publishable_key))
            .field("customer_id", &self.customer_id)
            .field(
                "customer_ephemeral_key_secret",
                &redact(&self.customer_ephemeral_key_secret),
            )
            .field(
                "payment_intent_client_secret",
                &redact(&self.payment_intent_client_secret),
            )
            .field("allows_delayed_payment_methods", &self.allows_delayed_payment_methods)
            .field("return_url", &self.return_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub merchant_display_name: String,
    /// Deep link the sheet returns to after a redirect-based payment.
    pub return_url: String,
    pub request_timeout: Duration,
}

impl OrchestratorSettings {
    pub fn new(merchant_display_name: impl Into<String>, return_url: impl Into<String>) -> Self {
        Self {
            merchant_display_name: merchant_display_name.into(),
            return_url: return_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

struct Session {
    state: CheckoutState,
    /// Bumped on every `initialize_payment`; responses for older values are dropped.
    token: u64,
    payment_intent_id: Option<String>,
    history: Vec<CheckoutState>,
}

impl Session {
    fn transition(&mut self, next: CheckoutState) {
        debug!("Checkout {} -> {}", self.state, next);
        self.history.push(next.clone());
        self.state = next;
    }
}

/// Card payment state machine for one checkout session.
///
/// Never creates orders; callers act on the [`PaymentOutcome`].
pub struct PaymentOrchestrator<G, S> {
    gateway: G,
    sheet: S,
    notifier: Arc<dyn UserNotifier>,
    settings: OrchestratorSettings,
    session: Mutex<Session>,
}

impl<G: PaymentIntentGateway, S: PaymentSheet> PaymentOrchestrator<G, S> {
    pub fn new(
        gateway: G,
        sheet: S,
        notifier: Arc<dyn UserNotifier>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            gateway,
            sheet,
            notifier,
            settings,
            session: Mutex::new(Session {
                state: CheckoutState::Idle,
                token: 0,
                payment_intent_id: None,
                history: vec![CheckoutState::Idle],
            }),
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.lock().state.clone()
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn transitions(&self) -> Vec<CheckoutState> {
        self.lock().history.clone()
    }

    /// Back to `Idle` from anything but an open sheet.
    pub fn reset(&self) -> bool {
        let mut session = self.lock();
        match session.state {
            CheckoutState::PresentingSheet => false,
            CheckoutState::Idle => true,
            _ => {
                session.token += 1;
                session.payment_intent_id = None;
                session.transition(CheckoutState::Idle);
                true
            }
        }
    }

    /// Request a payment intent for `amount` (major units) and configure the
    /// payment sheet with it.
    ///
    /// A newer call supersedes one still in flight. On failure the user is
    /// notified and the state becomes `Failed`.
    pub async fn initialize_payment(&self, amount: &BigDecimal, user_id: Option<&str>) -> bool {
        let token = {
            let mut session = self.lock();
            if session.state == CheckoutState::PresentingSheet {
                warn!("Payment sheet is open; ignoring new payment request");
                return false;
            }
            if session.state != CheckoutState::Idle {
                session.transition(CheckoutState::Idle);
            }
            session.token += 1;
            session.payment_intent_id = None;
            session.transition(CheckoutState::RequestingIntent);
            session.token
        };

        let response = match tokio::time::timeout(
            self.settings.request_timeout,
            self.gateway.create_payment_intent(amount, user_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout),
        };

        let mut session = self.lock();
        if session.token != token {
            debug!("Discarding payment intent response for superseded request {}", token);
            return false;
        }

        let prepared = response.and_then(|intent| self.configure_sheet(intent));
        match prepared {
            Ok(payment_intent_id) => {
                info!("Payment intent {} ready", payment_intent_id);
                session.payment_intent_id = Some(payment_intent_id);
                session.transition(CheckoutState::IntentReady);
                true
            }
            Err(e) => {
                let message = e.user_message();
                warn!("Could not prepare payment: {}", e);
                session.transition(CheckoutState::Failed(message.clone()));
                drop(session);
                self.notifier.notify_error(&message);
                false
            }
        }
    }

    /// Show the payment sheet for the prepared intent.
    ///
    /// Rejected without a state change unless an intent is ready.
    pub async fn process_payment(&self) -> Result<PaymentOutcome, ClientError> {
        let (token, payment_intent_id) = {
            let mut session = self.lock();
            let id = match (&session.state, &session.payment_intent_id) {
                (CheckoutState::IntentReady, Some(id)) => id.clone(),
                (state, _) => {
                    return Err(ClientError::InvalidState(format!(
                        "cannot present payment sheet while {}",
                        state
                    )))
                }
            };
            session.transition(CheckoutState::PresentingSheet);
            (session.token, id)
        };

        let result = self.sheet.present().await;

        let mut session = self.lock();
        if session.token != token {
            return Err(ClientError::InvalidState(
                "checkout was restarted while the payment sheet was open".to_string(),
            ));
        }
        session.payment_intent_id = None;

        let outcome = match result {
            SheetResult::Completed => {
                info!("Payment {} confirmed", payment_intent_id);
                session.transition(CheckoutState::Confirmed);
                PaymentOutcome::Confirmed { payment_intent_id }
            }
            SheetResult::Canceled => {
                info!("Payment sheet dismissed");
                session.transition(CheckoutState::Cancelled);
                PaymentOutcome::Cancelled
            }
            SheetResult::Failed(message) => {
                warn!("Payment {} failed: {}", payment_intent_id, message);
                session.transition(CheckoutState::Failed(message.clone()));
                drop(session);
                self.notifier.notify_error(&message);
                return Ok(PaymentOutcome::Failed(message));
            }
        };
        Ok(outcome)
    }

    fn configure_sheet(&self, intent: PaymentIntentResponse) -> Result<String, ClientError> {
        if [
            &intent.payment_intent,
            &intent.ephemeral_key,
            &intent.customer,
            &intent.publishable_key,
        ]
        .iter()
        .any(|v| v.trim().is_empty())
        {
            return Err(ClientError::Decode(
                "payment intent response is missing credentials".to_string(),
            ));
        }
        let payment_intent_id = intent_id_from_client_secret(&intent.payment_intent)
            .ok_or_else(|| ClientError::Decode("malformed payment intent secret".to_string()))?
            .to_string();

        self.sheet.configure(PaymentSheetConfig {
            merchant_display_name: self.settings.merchant_display_name.clone(),
            publishable_key: intent.publishable_key,
            customer_id: intent.customer,
            customer_ephemeral_key_secret: intent.ephemeral_key,
            payment_intent_client_secret: intent.payment_intent,
            allows_delayed_payment_methods: true,
            return_url: self.settings.return_url.clone(),
        })?;
        Ok(payment_intent_id)
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
