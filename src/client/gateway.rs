use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::error::ClientError;
use super::orchestrator::{PaymentSheetConfig, SheetResult};
use crate::domain::order::{Address, PaymentMethod};
use crate::handlers::orders::{
    CreateOrderRequest, ListOrdersResponse, OrderItemPayload, OrderResponse, TrackingResponse,
};
use crate::handlers::payments::PaymentIntentResponse;

/// Server endpoint that issues payment intents.
#[async_trait]
pub trait PaymentIntentGateway: Send + Sync {
    /// `amount` is in major units; the server owns currency and conversion.
    async fn create_payment_intent(
        &self,
        amount: &BigDecimal,
        user_id: Option<&str>,
    ) -> Result<PaymentIntentResponse, ClientError>;
}

#[async_trait]
impl<T: PaymentIntentGateway + ?Sized> PaymentIntentGateway for Arc<T> {
    async fn create_payment_intent(
        &self,
        amount: &BigDecimal,
        user_id: Option<&str>,
    ) -> Result<PaymentIntentResponse, ClientError> {
        (**self).create_payment_intent(amount, user_id).await
    }
}

/// Order read and write endpoints.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<OrderResponse, ClientError>;
    async fn get_order(&self, id: Uuid) -> Result<OrderResponse, ClientError>;
    async fn track_order(&self, id: Uuid) -> Result<TrackingResponse, ClientError>;
    async fn list_orders(
        &self,
        user_id: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<ListOrdersResponse, ClientError>;
    async fn reorder_items(&self, id: Uuid) -> Result<Vec<OrderItemPayload>, ClientError>;
}

/// Platform payment UI.
#[async_trait]
pub trait PaymentSheet: Send + Sync {
    fn configure(&self, config: PaymentSheetConfig) -> Result<(), ClientError>;
    /// Show the configured sheet and wait for the user to finish with it.
    async fn present(&self) -> SheetResult;
}

#[async_trait]
impl<T: PaymentSheet + ?Sized> PaymentSheet for Arc<T> {
    fn configure(&self, config: PaymentSheetConfig) -> Result<(), ClientError> {
        (**self).configure(config)
    }

    async fn present(&self) -> SheetResult {
        (**self).present().await
    }
}

pub trait UserNotifier: Send + Sync {
    fn notify_error(&self, message: &str);
    fn notify_info(&self, message: &str);
}

pub trait SessionProvider: Send + Sync {
    /// `None` for guests.
    fn current_user_id(&self) -> Option<String>;
}

pub trait LocationStore: Send + Sync {
    fn saved_address(&self) -> Option<Address>;
}

pub trait PaymentMethodStore: Send + Sync {
    fn selected_method(&self) -> PaymentMethod;
}
