use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use uuid::Uuid;

use super::error::ClientError;
use super::gateway::{OrderGateway, PaymentIntentGateway};
use crate::errors::ErrorResponse;
use crate::handlers::orders::{
    CreateOrderRequest, ListOrdersResponse, OrderItemPayload, OrderResponse, ReorderResponse,
    TrackingResponse,
};
use crate::handlers::payments::PaymentIntentResponse;

/// Talks to the checkout server over HTTP.
#[derive(Clone)]
pub struct HttpCheckoutApi {
    http: Client,
    base_url: String,
}

impl HttpCheckoutApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).trim().to_string());
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else {
        ClientError::Network(e.to_string())
    }
}

/// JSON number for a major-unit amount. Whole amounts go out as integers.
fn amount_json(amount: &BigDecimal) -> Result<Value, ClientError> {
    let value = if amount.is_integer() {
        amount.to_i64().map(Value::from)
    } else {
        amount.to_f64().filter(|f| f.is_finite()).map(Value::from)
    };
    value.ok_or_else(|| ClientError::InvalidOrder(format!("amount {} is out of range", amount)))
}

#[async_trait]
impl PaymentIntentGateway for HttpCheckoutApi {
    async fn create_payment_intent(
        &self,
        amount: &BigDecimal,
        user_id: Option<&str>,
    ) -> Result<PaymentIntentResponse, ClientError> {
        let mut body = json!({ "amount": amount_json(amount)? });
        if let Some(user_id) = user_id {
            body["userId"] = Value::from(user_id);
        }
        self.send(self.http.post(self.url("/create-payment-intent")).json(&body))
            .await
    }
}

#[async_trait]
impl OrderGateway for HttpCheckoutApi {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<OrderResponse, ClientError> {
        self.send(self.http.post(self.url("/orders")).json(request))
            .await
    }

    async fn get_order(&self, id: Uuid) -> Result<OrderResponse, ClientError> {
        self.send(self.http.get(self.url(&format!("/orders/{}", id))))
            .await
    }

    async fn track_order(&self, id: Uuid) -> Result<TrackingResponse, ClientError> {
        self.send(self.http.get(self.url(&format!("/orders/{}/tracking", id))))
            .await
    }

    async fn list_orders(
        &self,
        user_id: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<ListOrdersResponse, ClientError> {
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(user_id) = user_id {
            query.push(("userId", user_id.to_string()));
        }
        self.send(self.http.get(self.url("/orders")).query(&query))
            .await
    }

    async fn reorder_items(&self, id: Uuid) -> Result<Vec<OrderItemPayload>, ClientError> {
        let response: ReorderResponse = self
            .send(self.http.post(self.url(&format!("/orders/{}/reorder", id))))
            .await?;
        Ok(response.items)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn whole_amounts_are_sent_as_integers() {
        assert_eq!(amount_json(&BigDecimal::from(1000)).unwrap(), json!(1000));
        assert_eq!(
            amount_json(&BigDecimal::from_str("1000.00").unwrap()).unwrap(),
            json!(1000)
        );
    }

    #[test]
    fn fractional_amounts_are_sent_as_decimals() {
        assert_eq!(
            amount_json(&BigDecimal::from_str("10.5").unwrap()).unwrap(),
            json!(10.5)
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpCheckoutApi::new("http://localhost:8080/", Duration::from_secs(1))
            .expect("client should build");
        assert_eq!(api.url("/orders"), "http://localhost:8080/orders");
    }
}
