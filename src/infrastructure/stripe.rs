use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::domain::payment::{
    CreatedIntent, Customer, CustomerParams, EphemeralKey, IntentParams, ProcessorError, SecretKey,
};
use crate::domain::ports::PaymentProcessor;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Stripe REST adapter. Requests are form-encoded and authenticated with the
/// secret key passed on each call.
pub struct StripeClient {
    http: Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct CustomerBody {
    id: String,
}

#[derive(Debug, Deserialize)]
struct EphemeralKeyBody {
    id: String,
    secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentBody {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
}

impl StripeClient {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, ProcessorError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProcessorError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProcessorError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProcessorError::Transport(e.to_string()))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProcessorError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProcessorError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(ProcessorError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| ProcessorError::Decode(e.to_string()))
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => error
            .message
            .or(error.code)
            .or(error.kind)
            .unwrap_or_else(|| "unknown error".to_string()),
        Err(_) if body.trim().is_empty() => "empty error response".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_customer(
        &self,
        key: &SecretKey,
        params: &CustomerParams,
    ) -> Result<Customer, ProcessorError> {
        let mut form = vec![(
            "metadata[order_reference]",
            params.order_reference.to_string(),
        )];
        if let Some(user_id) = &params.user_id {
            form.push(("metadata[user_id]", user_id.clone()));
        }

        let body: CustomerBody = self
            .send(
                self.http
                    .post(self.url("/v1/customers"))
                    .bearer_auth(key.expose())
                    .form(&form),
            )
            .await?;
        log::debug!("Created customer {}", body.id);
        Ok(Customer { id: body.id })
    }

    async fn create_ephemeral_key(
        &self,
        key: &SecretKey,
        customer_id: &str,
        api_version: &str,
    ) -> Result<EphemeralKey, ProcessorError> {
        let body: EphemeralKeyBody = self
            .send(
                self.http
                    .post(self.url("/v1/ephemeral_keys"))
                    .bearer_auth(key.expose())
                    .header("Stripe-Version", api_version)
                    .form(&[("customer", customer_id)]),
            )
            .await?;
        let secret = body
            .secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProcessorError::Decode("ephemeral key has no secret".to_string()))?;
        Ok(EphemeralKey {
            id: body.id,
            secret,
        })
    }

    async fn create_payment_intent(
        &self,
        key: &SecretKey,
        params: &IntentParams,
    ) -> Result<CreatedIntent, ProcessorError> {
        let form = [
            ("amount", params.amount.to_string()),
            ("currency", params.currency.processor_code()),
            ("customer", params.customer_id.clone()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[order_id]", params.order_reference.to_string()),
        ];
        let body: PaymentIntentBody = self
            .send(
                self.http
                    .post(self.url("/v1/payment_intents"))
                    .bearer_auth(key.expose())
                    .form(&form),
            )
            .await?;
        let client_secret = body
            .client_secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ProcessorError::Decode(format!("payment intent {} has no client secret", body.id))
            })?;
        Ok(CreatedIntent {
            id: body.id,
            client_secret,
        })
    }

    async fn delete_customer(
        &self,
        key: &SecretKey,
        customer_id: &str,
    ) -> Result<(), ProcessorError> {
        let _: serde_json::Value = self
            .send(
                self.http
                    .delete(self.url(&format!("/v1/customers/{}", customer_id)))
                    .bearer_auth(key.expose()),
            )
            .await?;
        Ok(())
    }
}
