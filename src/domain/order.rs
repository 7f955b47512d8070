use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Lifecycle of a placed order.
///
/// The four known statuses form a closed set. Anything else read back from
/// storage is kept verbatim in `Unknown` so it can be shown as such instead of
/// being mistaken for a normal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Processing,
    Delivered,
    Cancelled,
    Unknown(String),
}

impl OrderStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "delivered" => Self::Delivered,
            "cancelled" => Self::Cancelled,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    pub fn can_transition_to(&self, next: &OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Cancelled)
                | (Self::Processing, Self::Delivered)
                | (Self::Processing, Self::Cancelled)
        )
    }

    pub fn ensure_transition(&self, next: &OrderStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const UNKNOWN_STATUS_LABEL: &str = "Unknown status";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPresentation {
    pub code: String,
    pub label: &'static str,
    pub recognized: bool,
}

/// Display label for a status. Unrecognised values get their own label and
/// are reported as a data-quality problem.
pub fn present_status(status: &OrderStatus) -> StatusPresentation {
    let label = match status {
        OrderStatus::Pending => "Pending",
        OrderStatus::Processing => "Processing",
        OrderStatus::Delivered => "Delivered",
        OrderStatus::Cancelled => "Cancelled",
        OrderStatus::Unknown(raw) => {
            log::warn!("Order has unrecognised status '{}'", raw);
            UNKNOWN_STATUS_LABEL
        }
    };
    StatusPresentation {
        code: status.as_str().to_string(),
        label,
        recognized: status.is_known(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryOption {
    HomeDelivery,
    Pickup,
}

impl DeliveryOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HomeDelivery => "homeDelivery",
            Self::Pickup => "pickup",
        }
    }
}

impl FromStr for DeliveryOption {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "homeDelivery" => Ok(Self::HomeDelivery),
            "pickup" => Ok(Self::Pickup),
            other => Err(DomainError::InvalidInput(format!(
                "unknown delivery option '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    Card,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::CashOnDelivery => "cashOnDelivery",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "cashOnDelivery" => Ok(Self::CashOnDelivery),
            other => Err(DomainError::InvalidInput(format!(
                "unknown payment method '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub image_url: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> BigDecimal {
        self.unit_price.clone() * BigDecimal::from(self.quantity)
    }
}

/// Everything needed to place an order, before identity is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub user_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal: BigDecimal,
    pub delivery_fee: BigDecimal,
    pub total: BigDecimal,
    pub restaurant: String,
    pub delivery_option: DeliveryOption,
    pub address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub payment_intent_id: Option<String>,
}

/// Column widths of the order tables, in characters.
pub const MAX_USER_ID_LEN: usize = 128;
pub const MAX_RESTAURANT_LEN: usize = 255;
pub const MAX_PRODUCT_ID_LEN: usize = 255;
pub const MAX_ITEM_NAME_LEN: usize = 255;
pub const MAX_PAYMENT_INTENT_ID_LEN: usize = 255;

impl OrderDraft {
    /// Check lines, totals and delivery details. The payment reference is
    /// left out so a client can run this before paying.
    pub fn validate_contents(&self) -> Result<(), DomainError> {
        if let Some(user_id) = &self.user_id {
            ensure_max_len("user id", user_id, MAX_USER_ID_LEN)?;
        }
        ensure_max_len("restaurant", &self.restaurant, MAX_RESTAURANT_LEN)?;

        if self.items.is_empty() {
            return Err(invalid("order must contain at least one item"));
        }
        for item in &self.items {
            if item.product_id.trim().is_empty() {
                return Err(invalid("item product id must not be empty"));
            }
            ensure_max_len("item product id", &item.product_id, MAX_PRODUCT_ID_LEN)?;
            ensure_max_len("item name", &item.name, MAX_ITEM_NAME_LEN)?;
            if item.quantity <= 0 {
                return Err(invalid(format!(
                    "quantity for '{}' must be positive",
                    item.product_id
                )));
            }
            if item.unit_price < BigDecimal::zero() {
                return Err(invalid(format!(
                    "unit price for '{}' must not be negative",
                    item.product_id
                )));
            }
        }

        let zero = BigDecimal::zero();
        if self.subtotal < zero || self.delivery_fee < zero || self.total < zero {
            return Err(invalid("amounts must not be negative"));
        }

        let line_sum = self
            .items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + item.line_total());
        if line_sum != self.subtotal {
            return Err(invalid(format!(
                "subtotal {} does not match item total {}",
                self.subtotal, line_sum
            )));
        }
        let expected_total = self.subtotal.clone() + &self.delivery_fee;
        if expected_total != self.total {
            return Err(invalid(format!(
                "total {} does not equal subtotal {} plus delivery fee {}",
                self.total, self.subtotal, self.delivery_fee
            )));
        }

        if self.restaurant.trim().is_empty() {
            return Err(invalid("restaurant must not be empty"));
        }
        if self.delivery_option == DeliveryOption::HomeDelivery && self.address.is_none() {
            return Err(invalid("home delivery requires an address"));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.validate_contents()?;
        if let Some(id) = &self.payment_intent_id {
            ensure_max_len("payment intent id", id, MAX_PAYMENT_INTENT_ID_LEN)?;
        }
        let has_reference = self
            .payment_intent_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        match (self.payment_method, has_reference) {
            (PaymentMethod::Card, false) => {
                Err(invalid("card orders require a payment intent reference"))
            }
            (PaymentMethod::CashOnDelivery, true) => Err(invalid(
                "cash on delivery orders must not carry a payment intent reference",
            )),
            _ => Ok(()),
        }
    }
}

fn invalid(msg: impl Into<String>) -> DomainError {
    DomainError::InvalidInput(msg.into())
}

fn ensure_max_len(field: &str, value: &str, max: usize) -> Result<(), DomainError> {
    if value.chars().count() > max {
        return Err(invalid(format!("{} must be at most {} characters", field, max)));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub subtotal: BigDecimal,
    pub delivery_fee: BigDecimal,
    pub total: BigDecimal,
    pub currency: String,
    pub restaurant: String,
    pub delivery_option: DeliveryOption,
    pub address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialise a validated draft as a new pending order.
    pub fn place(draft: OrderDraft, currency: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            status: OrderStatus::Pending,
            items: draft.items,
            subtotal: draft.subtotal,
            delivery_fee: draft.delivery_fee,
            total: draft.total,
            currency: currency.to_string(),
            restaurant: draft.restaurant,
            delivery_option: draft.delivery_option,
            address: draft.address,
            payment_method: draft.payment_method,
            payment_intent_id: draft.payment_intent_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn tracking(&self) -> TrackingInfo {
        TrackingInfo {
            order_id: self.id,
            status: self.status.clone(),
            restaurant: self.restaurant.clone(),
            delivery_option: self.delivery_option,
            address: self.address.clone(),
            placed_at: self.created_at,
            updated_at: self.updated_at,
            steps: tracking_steps(&self.status, self.delivery_option),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingInfo {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub restaurant: String,
    pub delivery_option: DeliveryOption,
    pub address: Option<Address>,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub steps: Vec<TrackingStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingStep {
    pub key: &'static str,
    pub label: &'static str,
    pub completed: bool,
}

fn step(key: &'static str, label: &'static str, completed: bool) -> TrackingStep {
    TrackingStep {
        key,
        label,
        completed,
    }
}

fn tracking_steps(status: &OrderStatus, delivery: DeliveryOption) -> Vec<TrackingStep> {
    let handed_over = match delivery {
        DeliveryOption::HomeDelivery => "Delivered",
        DeliveryOption::Pickup => "Picked up",
    };
    match status {
        OrderStatus::Cancelled => vec![
            step("placed", "Order placed", true),
            step("cancelled", "Order cancelled", true),
        ],
        _ => {
            let preparing = matches!(status, OrderStatus::Processing | OrderStatus::Delivered);
            let done = matches!(status, OrderStatus::Delivered);
            vec![
                step("placed", "Order placed", true),
                step("preparing", "Preparing your order", preparing),
                step("delivered", handed_over, done),
            ]
        }
    }
}
