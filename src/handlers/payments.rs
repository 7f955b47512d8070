use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::payment::PaymentIntentRequest;
use crate::errors::{AppError, ErrorResponse};
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    /// Amount in major currency units, e.g. `1000` for 1000.00 MAD.
    #[schema(value_type = Option<f64>, example = 1000)]
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl TryFrom<CreatePaymentIntentRequest> for PaymentIntentRequest {
    type Error = AppError;

    fn try_from(body: CreatePaymentIntentRequest) -> Result<Self, Self::Error> {
        let amount = match body.amount {
            None | Some(Value::Null) => None,
            // serde_json renders numbers in their shortest exact form, so
            // going through the text keeps 10.1 from becoming 10.0999...
            Some(Value::Number(n)) => Some(BigDecimal::from_str(&n.to_string()).map_err(|e| {
                AppError::BadRequest(format!("amount must be a number: {}", e))
            })?),
            Some(other) => {
                return Err(AppError::BadRequest(format!(
                    "amount must be a number, got {}",
                    other
                )))
            }
        };
        Ok(PaymentIntentRequest {
            amount,
            user_id: body.user_id.filter(|u| !u.trim().is_empty()),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    /// Client secret of the payment intent.
    pub payment_intent: String,
    /// Ephemeral key secret scoped to `customer`.
    pub ephemeral_key: String,
    pub customer: String,
    pub publishable_key: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /create-payment-intent
///
/// Creates a customer, an ephemeral key and a payment intent for the given
/// amount. The currency is fixed by server configuration.
#[utoipa::path(
    post,
    path = "/create-payment-intent",
    request_body = CreatePaymentIntentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = PaymentIntentResponse),
        (status = 400, description = "Missing, non-numeric or non-positive amount", body = ErrorResponse),
        (status = 500, description = "Missing configuration or payment processor failure", body = ErrorResponse),
    ),
    tag = "payments"
)]
pub async fn create_payment_intent(
    state: web::Data<AppState>,
    body: web::Json<CreatePaymentIntentRequest>,
) -> Result<HttpResponse, AppError> {
    let request = PaymentIntentRequest::try_from(body.into_inner())?;
    let result = state.payments.create_payment_intent(request).await?;

    Ok(HttpResponse::Ok().json(PaymentIntentResponse {
        payment_intent: result.client_secret,
        ephemeral_key: result.ephemeral_key_secret,
        customer: result.customer_id,
        publishable_key: result.publishable_key,
    }))
}
