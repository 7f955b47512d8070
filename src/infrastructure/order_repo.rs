use std::str::FromStr;

use chrono::Utc;
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    Address, DeliveryOption, ListResult, Order, OrderDraft, OrderItem, OrderStatus, PaymentMethod,
};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_items, order_outbox, orders};

use super::models::{NewOrderItemRow, NewOrderRow, NewOutboxEventRow, OrderItemRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Row mapping ───────────────────────────────────────────────────────────────

fn to_domain(row: OrderRow, items: Vec<OrderItemRow>) -> Result<Order, DomainError> {
    let corrupt = |field: &str, e: String| {
        DomainError::Internal(format!("order {} has corrupt {}: {}", row.id, field, e))
    };
    let delivery_option = DeliveryOption::from_str(&row.delivery_option)
        .map_err(|e| corrupt("delivery_option", e.to_string()))?;
    let payment_method = PaymentMethod::from_str(&row.payment_method)
        .map_err(|e| corrupt("payment_method", e.to_string()))?;
    let address = row
        .address
        .clone()
        .map(serde_json::from_value::<Address>)
        .transpose()
        .map_err(|e| corrupt("address", e.to_string()))?;

    let mut items = items;
    items.sort_by_key(|i| i.position);

    Ok(Order {
        id: row.id,
        user_id: row.user_id,
        status: OrderStatus::parse(&row.status),
        items: items
            .into_iter()
            .map(|i| OrderItem {
                product_id: i.product_id,
                name: i.name,
                unit_price: i.unit_price,
                quantity: i.quantity,
                image_url: i.image_url,
            })
            .collect(),
        subtotal: row.subtotal,
        delivery_fee: row.delivery_fee,
        total: row.total,
        currency: row.currency,
        restaurant: row.restaurant,
        delivery_option,
        address,
        payment_method,
        payment_intent_id: row.payment_intent_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn outbox_event(order_id: Uuid, event_type: &str, payload: serde_json::Value) -> NewOutboxEventRow {
    NewOutboxEventRow {
        id: Uuid::new_v4(),
        aggregate_type: "Order".to_string(),
        aggregate_id: order_id.to_string(),
        event_type: event_type.to_string(),
        payload,
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, draft: OrderDraft, currency: &str) -> Result<Order, DomainError> {
        let order = Order::place(draft, currency, Utc::now());
        let address = order
            .address
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order.id,
                    user_id: order.user_id.as_deref(),
                    status: order.status.as_str(),
                    restaurant: &order.restaurant,
                    delivery_option: order.delivery_option.as_str(),
                    address,
                    payment_method: order.payment_method.as_str(),
                    payment_intent_id: order.payment_intent_id.as_deref(),
                    subtotal: &order.subtotal,
                    delivery_fee: &order.delivery_fee,
                    total: &order.total,
                    currency: &order.currency,
                    created_at: order.created_at,
                    updated_at: order.updated_at,
                })
                .execute(conn)?;

            // 2. Insert items, keeping cart order
            let new_items: Vec<NewOrderItemRow> = order
                .items
                .iter()
                .enumerate()
                .map(|(position, item)| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id: order.id,
                    position: position as i32,
                    product_id: &item.product_id,
                    name: &item.name,
                    unit_price: &item.unit_price,
                    quantity: item.quantity,
                    image_url: item.image_url.as_deref(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            // 3. Outbox event in the same transaction
            let item_payloads: Vec<serde_json::Value> = order
                .items
                .iter()
                .map(|i| {
                    json!({
                        "product_id": i.product_id,
                        "quantity": i.quantity,
                        "unit_price": i.unit_price.to_string()
                    })
                })
                .collect();
            diesel::insert_into(order_outbox::table)
                .values(&outbox_event(
                    order.id,
                    "OrderCreated",
                    json!({
                        "order_id": order.id,
                        "user_id": order.user_id,
                        "status": order.status.as_str(),
                        "restaurant": order.restaurant,
                        "payment_method": order.payment_method.as_str(),
                        "total": order.total.to_string(),
                        "currency": order.currency,
                        "items": item_payloads
                    }),
                ))
                .execute(conn)?;

            Ok(())
        })?;

        Ok(order)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = OrderItemRow::belonging_to(&order)
            .select(OrderItemRow::as_select())
            .order(order_items::position.asc())
            .load(&mut conn)?;

        to_domain(order, items).map(Some)
    }

    fn list(&self, user_id: Option<&str>, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1).max(0).saturating_mul(limit);
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = match user_id {
                Some(uid) => orders::table
                    .filter(orders::user_id.eq(uid))
                    .count()
                    .get_result(conn)?,
                None => orders::table.count().get_result(conn)?,
            };

            let mut query = orders::table
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .into_boxed();
            if let Some(uid) = user_id {
                query = query.filter(orders::user_id.eq(uid));
            }
            let rows: Vec<OrderRow> = query.load(conn)?;

            let items: Vec<OrderItemRow> = OrderItemRow::belonging_to(&rows)
                .select(OrderItemRow::as_select())
                .load(conn)?;
            let grouped = items.grouped_by(&rows);

            let items = rows
                .into_iter()
                .zip(grouped)
                .map(|(row, items)| to_domain(row, items))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ListResult { items, total })
        })
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let current = orders::table
                .filter(orders::id.eq(id))
                .select(OrderRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound)?;

            let from = OrderStatus::parse(&current.status);
            from.ensure_transition(&status)?;

            let updated = diesel::update(orders::table.filter(orders::id.eq(id)))
                .set((
                    orders::status.eq(status.as_str()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            diesel::insert_into(order_outbox::table)
                .values(&outbox_event(
                    id,
                    "OrderStatusChanged",
                    json!({
                        "order_id": id,
                        "from": from.as_str(),
                        "to": status.as_str()
                    }),
                ))
                .execute(conn)?;

            let items = OrderItemRow::belonging_to(&updated)
                .select(OrderItemRow::as_select())
                .load(conn)?;
            to_domain(updated, items)
        })
    }
}
