// till/core/src/models/order.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType}; // Renamed Type to SqlxType to avoid conflict
use uuid::Uuid;

/// Order lifecycle states. Matches the `order_status` Postgres enum.
///
/// `Pending` is the only state an order can leave. `Paid`, `Failed` and
/// `Cancelled` are terminal: once settled, an order never moves again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Paid,
  Failed,
  Cancelled,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Paid => "paid",
      OrderStatus::Failed => "failed",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  pub fn is_terminal(&self) -> bool {
    !matches!(self, OrderStatus::Pending)
  }

  /// The full transition relation of the order state machine. Forward only:
  /// `pending` may settle into any terminal state, terminal states may not
  /// move at all, and re-entering `pending` is never legal.
  pub fn can_transition_to(&self, next: OrderStatus) -> bool {
    matches!(self, OrderStatus::Pending) && next != OrderStatus::Pending
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One template reference plus its price at order-creation time.
///
/// The price is a snapshot: later catalog price changes never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct LineItem {
  pub template_id: Uuid,
  pub unit_price_cents: i64,
}

/// A user's checkout request for one or more templates.
///
/// Financial record: orders are created `pending`, settled exactly once by
/// the purchase workflow, and never physically deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub line_items: Vec<LineItem>,
  /// Sum of the line-item snapshots, fixed at creation.
  pub total_cents: i64,
  pub currency: String,
  pub status: OrderStatus,
  /// External gateway transaction id, set only when settling into `paid`
  /// or `failed`.
  pub payment_reference: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// What the workflow hands the store to persist. The store assigns id,
/// timestamps, and the initial `pending` status.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: Uuid,
  pub currency: String,
  pub line_items: Vec<LineItem>,
  pub total_cents: i64,
}
