use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{ListResult, Order, OrderDraft, OrderStatus};
use super::payment::{
    CreatedIntent, Customer, CustomerParams, EphemeralKey, IntentParams, ProcessorError, SecretKey,
};

pub trait OrderRepository: Send + Sync + 'static {
    /// Persist a validated draft as a new `pending` order stamped with `currency`.
    fn create(&self, draft: OrderDraft, currency: &str) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list(&self, user_id: Option<&str>, page: i64, limit: i64) -> Result<ListResult, DomainError>;
    /// Move an order to `status`, rejecting transitions the lifecycle forbids.
    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, DomainError>;
}

impl<T: OrderRepository + ?Sized> OrderRepository for Arc<T> {
    fn create(&self, draft: OrderDraft, currency: &str) -> Result<Order, DomainError> {
        (**self).create(draft, currency)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        (**self).find_by_id(id)
    }

    fn list(&self, user_id: Option<&str>, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        (**self).list(user_id, page, limit)
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, DomainError> {
        (**self).update_status(id, status)
    }
}

/// Remote payment processor. Every call is authenticated with the secret key
/// passed in, so callers can refuse to reach the processor at all when no key
/// is configured.
#[async_trait]
pub trait PaymentProcessor: Send + Sync + 'static {
    async fn create_customer(
        &self,
        key: &SecretKey,
        params: &CustomerParams,
    ) -> Result<Customer, ProcessorError>;

    async fn create_ephemeral_key(
        &self,
        key: &SecretKey,
        customer_id: &str,
        api_version: &str,
    ) -> Result<EphemeralKey, ProcessorError>;

    async fn create_payment_intent(
        &self,
        key: &SecretKey,
        params: &IntentParams,
    ) -> Result<CreatedIntent, ProcessorError>;

    async fn delete_customer(&self, key: &SecretKey, customer_id: &str)
        -> Result<(), ProcessorError>;
}

#[async_trait]
impl<T: PaymentProcessor + ?Sized> PaymentProcessor for Arc<T> {
    async fn create_customer(
        &self,
        key: &SecretKey,
        params: &CustomerParams,
    ) -> Result<Customer, ProcessorError> {
        (**self).create_customer(key, params).await
    }

    async fn create_ephemeral_key(
        &self,
        key: &SecretKey,
        customer_id: &str,
        api_version: &str,
    ) -> Result<EphemeralKey, ProcessorError> {
        (**self)
            .create_ephemeral_key(key, customer_id, api_version)
            .await
    }

    async fn create_payment_intent(
        &self,
        key: &SecretKey,
        params: &IntentParams,
    ) -> Result<CreatedIntent, ProcessorError> {
        (**self).create_payment_intent(key, params).await
    }

    async fn delete_customer(
        &self,
        key: &SecretKey,
        customer_id: &str,
    ) -> Result<(), ProcessorError> {
        (**self).delete_customer(key, customer_id).await
    }
}
