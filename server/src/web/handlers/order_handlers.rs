// till/server/src/web/handlers/order_handlers.rs

use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

// --- Custom Extractor for the Authenticated User ---
// Identity is established upstream (session/gateway proxy) and forwarded as
// an X-User-ID header; this extractor only parses and enforces its presence.
#[derive(Debug)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    if let Some(user_id_header) = req.headers().get("X-User-ID") {
      if let Ok(user_id_str) = user_id_header.to_str() {
        if let Ok(user_id) = Uuid::parse_str(user_id_str) {
          return futures_util::future::ready(Ok(AuthenticatedUser { user_id }));
        }
      }
    }
    warn!("AuthenticatedUser extractor: Missing or invalid X-User-ID header.");
    futures_util::future::ready(Err(AppError::Auth(
      "User authentication required. Missing or invalid X-User-ID header.".to_string(),
    )))
  }
}

// --- Request DTOs ---
#[derive(Deserialize, Debug)]
pub struct CreateOrderRequestPayload {
  pub items: Vec<OrderItemPayload>,
}

#[derive(Deserialize, Debug)]
pub struct OrderItemPayload {
  pub template_id: Uuid,
}

#[derive(Deserialize, Debug)]
pub struct ListOrdersQuery {
  pub page: Option<u32>,
}

// --- Handler Implementations ---

#[instrument(
    name = "handler::create_order",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, item_count = req_payload.items.len())
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CreateOrderRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let template_ids: Vec<Uuid> = req_payload.items.iter().map(|item| item.template_id).collect();

  let order = app_state
    .workflow
    .create_order(auth_user.user_id, &template_ids, &app_state.config.currency)
    .await?;

  info!(order_id = %order.id, total_cents = order.total_cents, "Order created.");
  Ok(HttpResponse::Created().json(json!({
      "message": "Order created.",
      "order": order
  })))
}

#[instrument(
    name = "handler::list_orders",
    skip(app_state, query, auth_user),
    fields(user_id = %auth_user.user_id)
)]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let page = app_state
    .workflow
    .list_orders(auth_user.user_id, query.page.unwrap_or(1))
    .await?;

  Ok(HttpResponse::Ok().json(json!({
      "orders": page.items,
      "page": page.page,
      "page_size": page.page_size,
      "total": page.total
  })))
}

#[instrument(
    name = "handler::get_order",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.user_id, order_id = %path)
)]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .workflow
    .get_order(path.into_inner(), Some(auth_user.user_id))
    .await?;

  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

#[instrument(
    name = "handler::cancel_order",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.user_id, order_id = %path)
)]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .workflow
    .cancel_order(path.into_inner(), auth_user.user_id)
    .await?;

  info!(order_id = %order.id, "Order cancelled.");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order cancelled.",
      "order": order
  })))
}
