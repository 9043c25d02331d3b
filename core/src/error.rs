// till/core/src/error.rs
use thiserror::Error;

use crate::models::OrderStatus;

/// Failure taxonomy for the order/payment lifecycle.
///
/// Everything the workflow, stores, and gateway can fail with is one of these.
/// The HTTP layer decides status codes; this crate only decides meaning.
#[derive(Debug, Error)]
pub enum PurchaseError {
  /// Order creation was asked for with an empty, unknown, or inactive item list.
  /// Nothing is persisted when this is returned.
  #[error("Invalid line items: {0}")]
  InvalidLineItems(String),

  /// The order does not exist, or is not visible to the requesting owner.
  /// Owner-scoped lookups answer identically for "missing" and "not yours".
  #[error("Order not found")]
  NotFound,

  /// The requested status change is not an edge of the order state machine.
  /// Terminal states reject every further transition.
  #[error("Invalid status transition: {from} -> {to}")]
  InvalidTransition { from: OrderStatus, to: OrderStatus },

  /// A verified event contradicts the order's settled state, e.g. a success
  /// webhook for an order already failed, or a second success under a
  /// different payment reference. Needs an operator, not a retry.
  #[error("Conflicting payment state: {0}")]
  Conflict(String),

  /// The payment provider could not be reached or answered outside its
  /// contract. Surfaced to the caller; never retried automatically.
  #[error("Payment gateway unavailable: {0}")]
  GatewayUnavailable(String),

  /// Webhook signature verification failed. The payload must not be trusted
  /// and must never reach the workflow.
  #[error("Webhook signature verification failed")]
  InvalidSignature,

  /// The signature checked out but the payload is not a parseable event.
  #[error("Malformed webhook payload: {0}")]
  MalformedEvent(String),

  #[error("Storage error: {0}")]
  Storage(#[from] sqlx::Error),
}

pub type Result<T, E = PurchaseError> = std::result::Result<T, E>;
