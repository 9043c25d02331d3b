// till/core/src/store/mod.rs

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{NewOrder, Order, OrderStatus, Template};

/// Orders returned per `list_orders` page.
pub const PAGE_SIZE: u32 = 20;

/// One page of an owner's order history, newest first.
#[derive(Debug, Clone)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// 1-based page number actually served.
  pub page: u32,
  pub page_size: u32,
  /// Total records across all pages.
  pub total: u64,
}

/// Durable home of [`Order`] records.
///
/// Reads are owner-scoped where the caller acts on a user's behalf; writes
/// are reduced to exactly two operations, creation and the conditional
/// status transition. There is no delete: orders are financial records.
#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Persists a new order atomically (order row plus line items), assigning
  /// id and timestamps and starting it in [`OrderStatus::Pending`].
  async fn create_order(&self, new_order: NewOrder) -> Result<Order>;

  /// Fetches one order. With `owner` set, an order that exists but belongs
  /// to someone else answers [`PurchaseError::NotFound`], indistinguishable
  /// from a missing one.
  ///
  /// [`PurchaseError::NotFound`]: crate::error::PurchaseError::NotFound
  async fn get_order(&self, order_id: Uuid, owner: Option<Uuid>) -> Result<Order>;

  /// The owner's orders, newest first, in fixed-size pages. `page` is
  /// 1-based; values below 1 are served as page 1.
  async fn list_orders(&self, owner: Uuid, page: u32) -> Result<Page<Order>>;

  /// Compare-and-swap status update: succeeds only when the order is still
  /// `pending` and `new_status` is a legal edge of the state machine, in a
  /// single atomic check-and-write. Exactly one of two concurrent callers
  /// wins; the loser sees [`PurchaseError::InvalidTransition`].
  ///
  /// `payment_reference` is recorded when given and left untouched when
  /// `None` (cancellation records no reference).
  ///
  /// [`PurchaseError::InvalidTransition`]: crate::error::PurchaseError::InvalidTransition
  async fn transition_status(
    &self,
    order_id: Uuid,
    new_status: OrderStatus,
    payment_reference: Option<&str>,
  ) -> Result<Order>;
}

/// Read-only lookup into the template catalog.
///
/// The catalog is another system's domain; the purchase workflow only asks
/// "does this template exist, is it sellable, and at what price right now".
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
  async fn get_template(&self, template_id: Uuid) -> Result<Option<Template>>;
}
