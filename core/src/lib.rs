// src/lib.rs

//! till-core: the order and payment lifecycle engine behind the till server.
//!
//! What lives here:
//!  - The order data model with price-snapshot line items and the
//!    `pending -> paid | failed | cancelled` state machine.
//!  - Storage ports (`OrderStore`, `TemplateCatalog`) with in-memory and
//!    Postgres implementations; status changes go through an atomic
//!    compare-and-swap so concurrent webhook deliveries cannot corrupt an
//!    order.
//!  - A payment gateway port with a Stripe-shaped implementation: intent
//!    creation over REST and HMAC-SHA256 webhook verification.
//!  - `PurchaseWorkflow`, the only component allowed to mutate order
//!    status, with idempotent settlement operations that absorb
//!    at-least-once webhook delivery.
//!
//! The crate is HTTP-agnostic; the server wires these pieces to actix-web.

// Declare modules according to the planned structure
pub mod error;
pub mod gateway;
pub mod models;
pub mod store;
pub mod workflow;

// --- Re-exports for the Public API ---

pub use crate::error::{PurchaseError, Result};

pub use crate::models::{LineItem, NewOrder, Order, OrderStatus, Template};

pub use crate::store::memory::{InMemoryOrderStore, InMemoryTemplateCatalog};
pub use crate::store::postgres::{PgOrderStore, PgTemplateCatalog};
pub use crate::store::{OrderStore, Page, TemplateCatalog, PAGE_SIZE};

pub use crate::gateway::stripe::StripeGateway;
pub use crate::gateway::{PaymentEvent, PaymentEventKind, PaymentGateway, PaymentIntent};

// The orchestrator most consumers start from
pub use crate::workflow::PurchaseWorkflow;
