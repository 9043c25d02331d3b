// till/server/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

// Re-using the AuthenticatedUser extractor from order_handlers
use super::order_handlers::AuthenticatedUser;

// --- Request DTO ---
#[derive(Deserialize, Debug)]
pub struct CreateIntentRequestPayload {
  pub order_id: Uuid,
}

// --- Handler Implementation ---

#[instrument(
    name = "handler::create_payment_intent",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, order_id = %req_payload.order_id)
)]
pub async fn create_intent_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CreateIntentRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  // The workflow vets ownership and pending status; only then is the
  // provider asked to open an intent. A gateway failure here surfaces as a
  // 500 and is left for the user to retry explicitly.
  let order = app_state
    .workflow
    .begin_payment(req_payload.order_id, auth_user.user_id)
    .await?;

  let intent = app_state.gateway.create_intent(&order).await?;

  info!(order_id = %order.id, intent_id = %intent.intent_id, "Payment intent created.");
  Ok(HttpResponse::Ok().json(json!({
      "client_secret": intent.client_secret,
      "payment_intent_id": intent.intent_id
  })))
}
