use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::application::payment_service::PaymentIntentError;
use crate::domain::errors::DomainError;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    /// Server misconfiguration; the message is safe to show.
    #[error("{0}")]
    Configuration(String),

    /// A downstream service failed; the message is passed through.
    #[error("{0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound => AppError::NotFound,
            DomainError::InvalidInput(msg) => AppError::BadRequest(msg),
            e @ DomainError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<PaymentIntentError> for AppError {
    fn from(e: PaymentIntentError) -> Self {
        match e {
            e if e.is_client_error() => AppError::BadRequest(e.to_string()),
            e @ (PaymentIntentError::MissingSecretKey | PaymentIntentError::MissingPublishableKey) => {
                AppError::Configuration(e.to_string())
            }
            e => AppError::Upstream(e.to_string()),
        }
    }
}

impl From<BlockingError> for AppError {
    fn from(e: BlockingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Configuration(_) | AppError::Upstream(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(detail) => {
                log::error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            AppError::Configuration(_) | AppError::Upstream(_) => {
                log::error!("{}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse { error: message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::ProcessorError;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    async fn body_of(err: AppError) -> ErrorResponse {
        let bytes = to_bytes(err.error_response().into_body())
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be an error object")
    }

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound.error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn bad_request_returns_400() {
        let err = AppError::BadRequest("amount is required".to_string());
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflict_returns_409() {
        let err = AppError::Conflict("nope".to_string());
        assert_eq!(err.error_response().status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn internal_error_hides_details() {
        let err = AppError::Internal("connection refused on 10.0.0.3".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(err).await.error, "Internal server error");
    }

    #[actix_web::test]
    async fn upstream_error_keeps_message() {
        let err: AppError = PaymentIntentError::EphemeralKey {
            customer_id: "cus_1".to_string(),
            source: ProcessorError::Api {
                status: 400,
                message: "Invalid API version".to_string(),
            },
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_of(err).await.error.contains("Invalid API version"));
    }

    #[test]
    fn not_found_display() {
        assert_eq!(AppError::NotFound.to_string(), "Not found");
    }

    #[test]
    fn domain_errors_map_to_http_classes() {
        assert!(matches!(AppError::from(DomainError::NotFound), AppError::NotFound));
        assert!(matches!(
            AppError::from(DomainError::InvalidInput("bad value".to_string())),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(DomainError::InvalidTransition {
                from: "delivered".to_string(),
                to: "pending".to_string()
            }),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(DomainError::Internal("oops".to_string())),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn payment_errors_map_to_http_classes() {
        assert!(matches!(
            AppError::from(PaymentIntentError::MissingAmount),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(PaymentIntentError::MissingSecretKey),
            AppError::Configuration(_)
        ));
        assert!(matches!(
            AppError::from(PaymentIntentError::CustomerCreation(ProcessorError::Transport(
                "timed out".to_string()
            ))),
            AppError::Upstream(_)
        ));
    }
}
