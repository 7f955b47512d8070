//! Device-side checkout library.
//!
//! Drives a checkout from a cart to a placed order. No order is written until
//! the payment sheet reports success, except for cash on delivery. Platform
//! pieces are injected through the traits in [`gateway`].

pub mod checkout;
pub mod error;
pub mod gateway;
pub mod http;
pub mod orchestrator;

pub use checkout::{Cart, CheckoutContext, CheckoutFlow, CheckoutOutcome};
pub use error::ClientError;
pub use http::HttpCheckoutApi;
pub use orchestrator::{CheckoutState, OrchestratorSettings, PaymentOrchestrator, PaymentOutcome};
