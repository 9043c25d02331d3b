// till/server/src/web/handlers/mod.rs

// Declare handler modules
pub mod order_handlers;
pub mod payment_handlers;
pub mod webhook_handlers;

// routes.rs accesses handlers via their module path
// (e.g., order_handlers::create_order_handler).
