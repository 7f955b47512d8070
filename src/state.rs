use std::sync::Arc;

use crate::application::order_service::OrderService;
use crate::application::payment_service::{PaymentIntentService, PaymentSettings};
use crate::domain::ports::{OrderRepository, PaymentProcessor};

pub type SharedOrderService = OrderService<Arc<dyn OrderRepository>>;
pub type SharedPaymentService = PaymentIntentService<Arc<dyn PaymentProcessor>>;

/// Services shared by every worker. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<SharedOrderService>,
    pub payments: Arc<SharedPaymentService>,
}

impl AppState {
    /// Orders are stamped with the payment currency so both sides agree.
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        processor: Arc<dyn PaymentProcessor>,
        settings: PaymentSettings,
    ) -> Self {
        let payments = PaymentIntentService::new(processor, settings);
        let currency = payments.currency().code().to_string();
        Self {
            orders: Arc::new(OrderService::new(repo, currency)),
            payments: Arc::new(payments),
        }
    }
}
