// till/server/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use till_core::PurchaseError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  // Everything the domain layer can fail with; HTTP mapping below.
  #[error(transparent)]
  Purchase(#[from] PurchaseError),
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      AppError::Config(_) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue"}))
      }
      AppError::Purchase(source) => purchase_error_response(source),
    }
  }
}

fn purchase_error_response(err: &PurchaseError) -> HttpResponse {
  match err {
    PurchaseError::InvalidLineItems(m) => {
      HttpResponse::UnprocessableEntity().json(json!({"error": m}))
    }
    // Missing and not-owned answer identically.
    PurchaseError::NotFound => HttpResponse::NotFound().json(json!({"error": "Order not found"})),
    PurchaseError::InvalidTransition { .. } => {
      HttpResponse::Conflict().json(json!({"error": err.to_string()}))
    }
    PurchaseError::Conflict(m) => HttpResponse::Conflict().json(json!({"error": m})),
    PurchaseError::GatewayUnavailable(_) => {
      HttpResponse::InternalServerError().json(json!({"error": "Payment provider error"}))
    }
    // Never explain to the sender why a signature was rejected.
    PurchaseError::InvalidSignature => {
      HttpResponse::BadRequest().json(json!({"error": "Webhook verification failed"}))
    }
    PurchaseError::MalformedEvent(_) => {
      HttpResponse::BadRequest().json(json!({"error": "Malformed webhook payload"}))
    }
    PurchaseError::Storage(_) => {
      HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"}))
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
