use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use log::{error, info};
use uuid::Uuid;

use super::error::ClientError;
use super::gateway::{
    LocationStore, OrderGateway, PaymentIntentGateway, PaymentMethodStore, PaymentSheet,
    SessionProvider, UserNotifier,
};
use super::orchestrator::{CheckoutState, PaymentOrchestrator, PaymentOutcome};
use crate::domain::order::{DeliveryOption, OrderDraft, OrderItem, PaymentMethod};
use crate::handlers::orders::{CreateOrderRequest, OrderResponse, TrackingResponse};

#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    pub restaurant: String,
    pub items: Vec<OrderItem>,
    pub delivery_option: DeliveryOption,
    pub delivery_fee: BigDecimal,
}

impl Cart {
    pub fn subtotal(&self) -> BigDecimal {
        self.items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + item.line_total())
    }

    pub fn total(&self) -> BigDecimal {
        self.subtotal() + &self.delivery_fee
    }
}

#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    Placed(OrderResponse),
    Cancelled,
    Failed(String),
}

/// Platform collaborators read during checkout.
#[derive(Clone)]
pub struct CheckoutContext {
    pub orders: Arc<dyn OrderGateway>,
    pub session: Arc<dyn SessionProvider>,
    pub locations: Arc<dyn LocationStore>,
    pub payment_methods: Arc<dyn PaymentMethodStore>,
    pub notifier: Arc<dyn UserNotifier>,
}

pub struct CheckoutFlow<G, S> {
    payments: PaymentOrchestrator<G, S>,
    ctx: CheckoutContext,
}

impl<G: PaymentIntentGateway, S: PaymentSheet> CheckoutFlow<G, S> {
    pub fn new(payments: PaymentOrchestrator<G, S>, ctx: CheckoutContext) -> Self {
        Self { payments, ctx }
    }

    pub fn payments(&self) -> &PaymentOrchestrator<G, S> {
        &self.payments
    }

    /// Turn the cart into an order.
    ///
    /// Cash on delivery goes straight to order creation. Card payments only
    /// create the order after the payment sheet confirms.
    pub async fn checkout(&self, cart: &Cart) -> CheckoutOutcome {
        let user_id = self.ctx.session.current_user_id();
        let address = match cart.delivery_option {
            DeliveryOption::HomeDelivery => self.ctx.locations.saved_address(),
            DeliveryOption::Pickup => None,
        };
        let payment_method = self.ctx.payment_methods.selected_method();

        let mut draft = OrderDraft {
            user_id: user_id.clone(),
            items: cart.items.clone(),
            subtotal: cart.subtotal(),
            delivery_fee: cart.delivery_fee.clone(),
            total: cart.total(),
            restaurant: cart.restaurant.clone(),
            delivery_option: cart.delivery_option,
            address,
            payment_method,
            payment_intent_id: None,
        };
        if let Err(e) = draft.validate_contents() {
            return self.fail(ClientError::InvalidOrder(e.to_string()).user_message());
        }

        if payment_method == PaymentMethod::Card {
            if !self
                .payments
                .initialize_payment(&draft.total, user_id.as_deref())
                .await
            {
                // The orchestrator has already told the user.
                return match self.payments.state() {
                    CheckoutState::Failed(message) => CheckoutOutcome::Failed(message),
                    _ => CheckoutOutcome::Failed("Payment could not be started".to_string()),
                };
            }
            match self.payments.process_payment().await {
                Ok(PaymentOutcome::Confirmed { payment_intent_id }) => {
                    draft.payment_intent_id = Some(payment_intent_id);
                }
                Ok(PaymentOutcome::Cancelled) => {
                    self.ctx
                        .notifier
                        .notify_info("Payment cancelled. Your cart is still saved.");
                    return CheckoutOutcome::Cancelled;
                }
                Ok(PaymentOutcome::Failed(message)) => return CheckoutOutcome::Failed(message),
                Err(e) => return self.fail(e.user_message()),
            }
        }

        match self.ctx.orders.create_order(&CreateOrderRequest::from(&draft)).await {
            Ok(order) => {
                info!("Order {} placed", order.id);
                self.ctx.notifier.notify_info("Order placed");
                CheckoutOutcome::Placed(order)
            }
            Err(e) => {
                if let Some(intent) = &draft.payment_intent_id {
                    error!(
                        "Payment {} succeeded but the order was not saved: {}",
                        intent, e
                    );
                }
                self.fail(e.user_message())
            }
        }
    }

    /// Tracking data for the confirmation screen.
    pub async fn confirmation(&self, order_id: Uuid) -> Result<TrackingResponse, ClientError> {
        self.ctx.orders.track_order(order_id).await
    }

    /// Items of a past order, ready to go back into a cart.
    pub async fn reorder(&self, order_id: Uuid) -> Result<Vec<OrderItem>, ClientError> {
        self.ctx
            .orders
            .reorder_items(order_id)
            .await?
            .into_iter()
            .map(|p| OrderItem::try_from(p).map_err(|e| ClientError::Decode(e.to_string())))
            .collect()
    }

    fn fail(&self, message: String) -> CheckoutOutcome {
        self.ctx.notifier.notify_error(&message);
        CheckoutOutcome::Failed(message)
    }
}
