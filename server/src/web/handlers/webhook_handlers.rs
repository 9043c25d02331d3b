// till/server/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;
use till_core::{PaymentEventKind, PurchaseError};

// --- Handler Implementation ---

/// The trust boundary between the payment provider and the purchase
/// workflow.
///
/// Contract with the provider: once the signature verifies, the delivery is
/// acknowledged with a 2xx for every disposition we can never do better on
/// (ignored event types, unknown orders, conflicts an operator must look
/// at). Only signature/parse failures and transient storage errors answer
/// non-2xx; the latter so that at-least-once redelivery can succeed later,
/// which the idempotent workflow makes safe.
#[instrument(
    name = "handler::payment_webhook",
    skip(app_state, req, body),
    fields(
        payload_bytes = body.len(),
        event_id = tracing::field::Empty,
        event_type = tracing::field::Empty
    )
)]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes, // Raw request body; verification needs the exact bytes
) -> Result<HttpResponse, AppError> {
  let signature_header = req
    .headers()
    .get("stripe-signature")
    .and_then(|h_val| h_val.to_str().ok())
    .unwrap_or_default();

  // Hard boundary: nothing below runs for an unverified payload.
  let event = app_state.gateway.verify_webhook(&body, signature_header)?;

  let span = tracing::Span::current();
  span.record("event_id", event.event_id.as_str());
  span.record("event_type", event.event_type.as_str());

  match event.kind {
    PaymentEventKind::PaymentSucceeded => {
      let order_id = match event.order_id {
        Some(id) => id,
        None => {
          warn!("Success event carries no usable order metadata; acknowledging.");
          return Ok(HttpResponse::Ok().json(json!({"status": "ignored"})));
        }
      };
      let payment_reference = match event.payment_reference.as_deref() {
        Some(reference) => reference,
        None => {
          warn!(%order_id, "Success event carries no payment object id; acknowledging.");
          return Ok(HttpResponse::Ok().json(json!({"status": "ignored"})));
        }
      };

      match app_state
        .workflow
        .complete_payment(order_id, payment_reference, &event.event_id)
        .await
      {
        Ok(order) => {
          info!(%order_id, status = %order.status, "Success event processed.");
          Ok(HttpResponse::Ok().json(json!({"status": "processed"})))
        }
        Err(PurchaseError::NotFound) => {
          // Not an order of ours; redelivery would never help.
          warn!(%order_id, "Success event for unknown order; acknowledging.");
          Ok(HttpResponse::Ok().json(json!({"status": "unknown_order"})))
        }
        Err(PurchaseError::Conflict(detail)) => {
          // Operator case: the event contradicts a settled order. Ack so the
          // provider stops retrying something that can never apply cleanly.
          error!(%order_id, detail, "Success event conflicts with settled order state.");
          Ok(HttpResponse::Ok().json(json!({"status": "conflict"})))
        }
        Err(other) => Err(AppError::from(other)),
      }
    }

    PaymentEventKind::PaymentFailed => {
      let order_id = match event.order_id {
        Some(id) => id,
        None => {
          warn!("Failure event carries no usable order metadata; acknowledging.");
          return Ok(HttpResponse::Ok().json(json!({"status": "ignored"})));
        }
      };
      let reason = event.failure_message.as_deref().unwrap_or("payment failed");

      match app_state
        .workflow
        .handle_payment_failure(order_id, event.payment_reference.as_deref(), reason)
        .await
      {
        Ok(order) => {
          info!(%order_id, status = %order.status, "Failure event processed.");
          Ok(HttpResponse::Ok().json(json!({"status": "processed"})))
        }
        Err(PurchaseError::NotFound) => {
          warn!(%order_id, "Failure event for unknown order; acknowledging.");
          Ok(HttpResponse::Ok().json(json!({"status": "unknown_order"})))
        }
        Err(other) => Err(AppError::from(other)),
      }
    }

    PaymentEventKind::Other => {
      // Providers emit many event types this service does not subscribe to
      // semantically; delivery must still succeed.
      info!("Unhandled event type acknowledged.");
      Ok(HttpResponse::Ok().json(json!({"status": "ignored"})))
    }
  }
}
