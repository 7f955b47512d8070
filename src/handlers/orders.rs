use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::order::{
    present_status, Address, DeliveryOption, Order, OrderDraft, OrderItem, OrderStatus,
    PaymentMethod, TrackingInfo,
};
use crate::errors::{AppError, ErrorResponse};
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemPayload {
    pub product_id: String,
    pub name: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&OrderItem> for OrderItemPayload {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            price: item.unit_price.to_string(),
            quantity: item.quantity,
            image_url: item.image_url.clone(),
        }
    }
}

impl TryFrom<OrderItemPayload> for OrderItem {
    type Error = AppError;

    fn try_from(p: OrderItemPayload) -> Result<Self, Self::Error> {
        Ok(OrderItem {
            unit_price: decimal("price", &p.price)?,
            product_id: p.product_id,
            name: p.name,
            quantity: p.quantity,
            image_url: p.image_url,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    pub items: Vec<OrderItemPayload>,
    pub subtotal: String,
    pub delivery_fee: String,
    pub total: String,
    pub restaurant: String,
    #[schema(value_type = String, example = "homeDelivery")]
    pub delivery_option: DeliveryOption,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub address: Option<Address>,
    #[schema(value_type = String, example = "card")]
    pub payment_method: PaymentMethod,
    /// Processor intent id (`pi_...`), required for card payments.
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

impl TryFrom<CreateOrderRequest> for OrderDraft {
    type Error = AppError;

    fn try_from(body: CreateOrderRequest) -> Result<Self, Self::Error> {
        Ok(OrderDraft {
            user_id: body.user_id,
            items: body
                .items
                .into_iter()
                .map(OrderItem::try_from)
                .collect::<Result<_, _>>()?,
            subtotal: decimal("subtotal", &body.subtotal)?,
            delivery_fee: decimal("deliveryFee", &body.delivery_fee)?,
            total: decimal("total", &body.total)?,
            restaurant: body.restaurant,
            delivery_option: body.delivery_option,
            address: body.address,
            payment_method: body.payment_method,
            payment_intent_id: body.payment_intent_id,
        })
    }
}

impl From<&OrderDraft> for CreateOrderRequest {
    fn from(draft: &OrderDraft) -> Self {
        Self {
            user_id: draft.user_id.clone(),
            items: draft.items.iter().map(OrderItemPayload::from).collect(),
            subtotal: draft.subtotal.to_string(),
            delivery_fee: draft.delivery_fee.to_string(),
            total: draft.total.to_string(),
            restaurant: draft.restaurant.clone(),
            delivery_option: draft.delivery_option,
            address: draft.address.clone(),
            payment_method: draft.payment_method,
            payment_intent_id: draft.payment_intent_id.clone(),
        }
    }
}

const MAX_FRACTION_DIGITS: i64 = 4;
const MAX_INTEGER_DIGITS: i64 = 12;

/// Parse a money field. Exponent notation is accepted, but the value must fit
/// in a bounded number of digits before any arithmetic touches it.
fn decimal(field: &str, raw: &str) -> Result<BigDecimal, AppError> {
    let value = BigDecimal::from_str(raw.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid {} '{}': {}", field, raw, e)))?;

    let (_, scale) = value.as_bigint_and_exponent();
    let integer_digits = i64::try_from(value.digits())
        .unwrap_or(i64::MAX)
        .saturating_sub(scale);
    if scale > MAX_FRACTION_DIGITS || integer_digits > MAX_INTEGER_DIGITS {
        return Err(AppError::BadRequest(format!(
            "Invalid {} '{}': at most {} integer and {} fractional digits are allowed",
            field, raw, MAX_INTEGER_DIGITS, MAX_FRACTION_DIGITS
        )));
    }
    Ok(value)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Option<String>,
    /// Raw status code; unrecognised values are passed through unchanged.
    pub status: String,
    pub status_label: String,
    pub items: Vec<OrderItemPayload>,
    pub subtotal: String,
    pub delivery_fee: String,
    pub total: String,
    pub currency: String,
    pub restaurant: String,
    #[schema(value_type = String)]
    pub delivery_option: DeliveryOption,
    #[schema(value_type = Option<Object>)]
    pub address: Option<Address>,
    #[schema(value_type = String)]
    pub payment_method: PaymentMethod,
    pub payment_intent_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Order> for OrderResponse {
    fn from(o: &Order) -> Self {
        let presentation = present_status(&o.status);
        Self {
            id: o.id,
            user_id: o.user_id.clone(),
            status: presentation.code,
            status_label: presentation.label.to_string(),
            items: o.items.iter().map(OrderItemPayload::from).collect(),
            subtotal: o.subtotal.to_string(),
            delivery_fee: o.delivery_fee.to_string(),
            total: o.total.to_string(),
            currency: o.currency.clone(),
            restaurant: o.restaurant.clone(),
            delivery_option: o.delivery_option,
            address: o.address.clone(),
            payment_method: o.payment_method,
            payment_intent_id: o.payment_intent_id.clone(),
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStepPayload {
    pub key: String,
    pub label: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingResponse {
    pub order_id: Uuid,
    pub status: String,
    pub status_label: String,
    pub restaurant: String,
    #[schema(value_type = String)]
    pub delivery_option: DeliveryOption,
    #[schema(value_type = Option<Object>)]
    pub address: Option<Address>,
    pub placed_at: String,
    pub updated_at: String,
    pub steps: Vec<TrackingStepPayload>,
}

impl From<TrackingInfo> for TrackingResponse {
    fn from(t: TrackingInfo) -> Self {
        let presentation = present_status(&t.status);
        Self {
            order_id: t.order_id,
            status: presentation.code,
            status_label: presentation.label.to_string(),
            restaurant: t.restaurant,
            delivery_option: t.delivery_option,
            address: t.address,
            placed_at: t.placed_at.to_rfc3339(),
            updated_at: t.updated_at.to_rfc3339(),
            steps: t
                .steps
                .into_iter()
                .map(|s| TrackingStepPayload {
                    key: s.key.to_string(),
                    label: s.label.to_string(),
                    completed: s.completed,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of `pending`, `processing`, `delivered`, `cancelled`.
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReorderResponse {
    pub items: Vec<OrderItemPayload>,
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Only return orders placed by this user.
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Places an order with status `pending`. The order, its items and an
/// `OrderCreated` outbox event are written in a single transaction.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = OrderResponse),
        (status = 400, description = "Order violates an invariant", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let draft = OrderDraft::try_from(body.into_inner())?;
    let orders = state.orders.clone();

    let order = web::block(move || orders.create_order(draft)).await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(&order)))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let orders = state.orders.clone();

    let order = web::block(move || orders.get_order_details(order_id)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(&order)))
}

/// GET /orders/{id}/tracking
///
/// Read-only status timeline for the confirmation and tracking screens.
#[utoipa::path(
    get,
    path = "/orders/{id}/tracking",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Tracking information", body = TrackingResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn track_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let orders = state.orders.clone();

    let tracking = web::block(move || orders.track_order(order_id)).await??;

    Ok(HttpResponse::Ok().json(TrackingResponse::from(tracking)))
}

/// POST /orders/{id}/reorder
///
/// Returns the lines of a past order so the client can refill a cart. Nothing
/// is written.
#[utoipa::path(
    post,
    path = "/orders/{id}/reorder",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Items of the original order", body = ReorderResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn reorder(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let orders = state.orders.clone();

    let items = web::block(move || orders.reorder_items(order_id)).await??;

    Ok(HttpResponse::Ok().json(ReorderResponse {
        items: items.iter().map(OrderItemPayload::from).collect(),
    }))
}

/// PATCH /orders/{id}/status
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Unknown target status", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn update_status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let status = OrderStatus::parse(&body.status);
    let orders = state.orders.clone();

    let order = web::block(move || orders.update_status(order_id, status)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(&order)))
}

/// GET /orders
///
/// Returns a paginated list of orders, newest first.
/// Use `page` (1-based) and `limit` to control pagination.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("userId" = Option<String>, Query, description = "Filter by user"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let orders = state.orders.clone();

    let result =
        web::block(move || orders.list_orders(params.user_id.as_deref(), page, limit)).await??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}
