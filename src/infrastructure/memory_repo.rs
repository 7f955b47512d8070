use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, Order, OrderDraft, OrderStatus};
use crate::domain::ports::OrderRepository;

/// Process-local order store, used by tests and local demos.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<Vec<Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an order as-is, bypassing validation.
    pub fn seed(&self, order: Order) -> Result<(), DomainError> {
        self.lock()?.push(order);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|orders| orders.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Order>>, DomainError> {
        self.orders
            .lock()
            .map_err(|_| DomainError::Internal("order store lock poisoned".to_string()))
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn create(&self, draft: OrderDraft, currency: &str) -> Result<Order, DomainError> {
        let order = Order::place(draft, currency, Utc::now());
        self.lock()?.push(order.clone());
        Ok(order)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.lock()?.iter().find(|o| o.id == id).cloned())
    }

    fn list(&self, user_id: Option<&str>, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let orders = self.lock()?;
        let matching: Vec<&Order> = orders
            .iter()
            .rev()
            .filter(|o| user_id.map_or(true, |uid| o.user_id.as_deref() == Some(uid)))
            .collect();

        let offset = (page - 1).max(0).saturating_mul(limit.max(0));
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(ListResult {
            total: matching.len() as i64,
            items: matching
                .into_iter()
                .skip(offset)
                .take(limit.max(0) as usize)
                .cloned()
                .collect(),
        })
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, DomainError> {
        let mut orders = self.lock()?;
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(DomainError::NotFound)?;

        order.status.ensure_transition(&status)?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}
