use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Order not found")]
    NotFound,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Cannot move order from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
    #[error("Internal error: {0}")]
    Internal(String),
}
