// till/server/src/web/routes.rs

use actix_web::web;

// Liveness probe. Deliberately does not touch the database: a wedged pool
// should show up in request latencies and logs, not flap the probe.
async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// This function is called in `main.rs` to configure services for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1") // Base path for API version 1
      // Health Check Route
      .route("/health", web::get().to(health_check_handler))
      // Order Routes (authenticated, owner-scoped)
      .service(
        web::scope("/orders")
          .route(
            "",
            web::post().to(crate::web::handlers::order_handlers::create_order_handler),
          )
          .route(
            "",
            web::get().to(crate::web::handlers::order_handlers::list_orders_handler),
          )
          .route(
            "/{order_id}",
            web::get().to(crate::web::handlers::order_handlers::get_order_handler),
          )
          .route(
            "/{order_id}/cancel",
            web::post().to(crate::web::handlers::order_handlers::cancel_order_handler),
          ),
      )
      // Payment Routes: intent creation is authenticated; the webhook is
      // unauthenticated but signature-verified inside its handler.
      .service(
        web::scope("/payments")
          .route(
            "/create-intent",
            web::post().to(crate::web::handlers::payment_handlers::create_intent_handler),
          )
          .route(
            "/webhook",
            web::post().to(crate::web::handlers::webhook_handlers::payment_webhook_handler),
          ),
      ),
  );
}
