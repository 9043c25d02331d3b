// till/core/src/gateway/mod.rs

pub mod stripe;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::Order;

/// Result of asking the provider to open a payment attempt for an order.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
  /// Provider-side id; becomes the order's `payment_reference` once the
  /// webhook confirms the outcome.
  pub intent_id: String,
  /// Handed to the paying client so it can drive the provider's checkout.
  pub client_secret: String,
}

/// What a verified webhook event means to the purchase workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEventKind {
  PaymentSucceeded,
  PaymentFailed,
  /// Providers send many event types this system does not act on. They are
  /// acknowledged and dropped at the endpoint.
  Other,
}

impl PaymentEventKind {
  pub fn from_event_type(event_type: &str) -> Self {
    match event_type {
      "payment_intent.succeeded" => PaymentEventKind::PaymentSucceeded,
      "payment_intent.payment_failed" => PaymentEventKind::PaymentFailed,
      _ => PaymentEventKind::Other,
    }
  }
}

/// A webhook payload that passed signature verification, reduced to the
/// fields the workflow cares about.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
  /// Provider event id, used for log correlation across redeliveries.
  pub event_id: String,
  /// Raw provider type string, kept for logging.
  pub event_type: String,
  pub kind: PaymentEventKind,
  /// The payment object's id (the order's eventual `payment_reference`).
  pub payment_reference: Option<String>,
  /// Recovered from the metadata this service attached at intent creation.
  pub order_id: Option<Uuid>,
  /// Provider's human-readable failure reason, when it sent one.
  pub failure_message: Option<String>,
}

/// Narrow seam in front of the external payment provider. The purchase
/// workflow never sees provider-specific types, and nothing behind this
/// trait is reachable without passing signature verification first.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Opens a payment attempt for `order.total_cents`, tagging it with the
  /// order id so the webhook can find its way back. Network failures and
  /// provider errors surface as `GatewayUnavailable`; the call is never
  /// retried here, since a duplicate attempt would mint a second intent.
  async fn create_intent(&self, order: &Order) -> Result<PaymentIntent>;

  /// Authenticates a raw webhook delivery and parses it into a
  /// [`PaymentEvent`]. Rejection means the payload is untrusted and must be
  /// dropped at the boundary.
  fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> Result<PaymentEvent>;
}
