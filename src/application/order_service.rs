use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, Order, OrderDraft, OrderItem, OrderStatus, TrackingInfo};
use crate::domain::ports::OrderRepository;

pub struct OrderService<R> {
    repo: R,
    currency: String,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R, currency: impl Into<String>) -> Self {
        Self {
            repo,
            currency: currency.into(),
        }
    }

    pub fn create_order(&self, draft: OrderDraft) -> Result<Order, DomainError> {
        draft.validate()?;
        let order = self.repo.create(draft, &self.currency)?;
        log::info!(
            "Created order {} ({} {}, {})",
            order.id,
            order.total,
            order.currency,
            order.payment_method.as_str()
        );
        Ok(order)
    }

    pub fn get_order_details(&self, id: Uuid) -> Result<Order, DomainError> {
        self.repo.find_by_id(id)?.ok_or(DomainError::NotFound)
    }

    pub fn list_orders(
        &self,
        user_id: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        self.repo.list(user_id, page, limit)
    }

    /// Read-only view for the tracking screen; never changes the status.
    pub fn track_order(&self, id: Uuid) -> Result<TrackingInfo, DomainError> {
        Ok(self.get_order_details(id)?.tracking())
    }

    /// Lines of a past order, ready to be put back into a cart.
    pub fn reorder_items(&self, id: Uuid) -> Result<Vec<OrderItem>, DomainError> {
        Ok(self.get_order_details(id)?.items)
    }

    pub fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, DomainError> {
        if let OrderStatus::Unknown(raw) = &status {
            return Err(DomainError::InvalidInput(format!(
                "'{}' is not an order status",
                raw
            )));
        }
        let order = self.repo.update_status(id, status)?;
        log::info!("Order {} is now {}", order.id, order.status);
        Ok(order)
    }
}
