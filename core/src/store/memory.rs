// till/core/src/store/memory.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{PurchaseError, Result};
use crate::models::{NewOrder, Order, OrderStatus, Template};
use crate::store::{OrderStore, Page, TemplateCatalog, PAGE_SIZE};

/// Order store backed by process memory, with the same contract as the
/// Postgres store. Used by tests and by library consumers that want the
/// workflow without a database.
///
/// Orders are kept in insertion order, so "newest first" is the reverse
/// walk. Every operation holds the lock for its whole body; that single
/// write lock is what makes `transition_status` an atomic check-and-write.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
  orders: Arc<RwLock<Vec<Order>>>,
}

impl InMemoryOrderStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
  async fn create_order(&self, new_order: NewOrder) -> Result<Order> {
    let now = Utc::now();
    let order = Order {
      id: Uuid::new_v4(),
      user_id: new_order.user_id,
      line_items: new_order.line_items,
      total_cents: new_order.total_cents,
      currency: new_order.currency,
      status: OrderStatus::Pending,
      payment_reference: None,
      created_at: now,
      updated_at: now,
    };
    self.orders.write().await.push(order.clone());
    Ok(order)
  }

  async fn get_order(&self, order_id: Uuid, owner: Option<Uuid>) -> Result<Order> {
    let orders = self.orders.read().await;
    let order = orders
      .iter()
      .find(|o| o.id == order_id)
      .ok_or(PurchaseError::NotFound)?;
    if owner.is_some_and(|owner| owner != order.user_id) {
      // Same answer as a missing order: existence must not leak.
      return Err(PurchaseError::NotFound);
    }
    Ok(order.clone())
  }

  async fn list_orders(&self, owner: Uuid, page: u32) -> Result<Page<Order>> {
    let page = page.max(1);
    let orders = self.orders.read().await;
    let mine: Vec<&Order> = orders.iter().rev().filter(|o| o.user_id == owner).collect();
    let total = mine.len() as u64;
    // Widen before multiplying; a far page must page past the end, not wrap.
    let offset = u64::from(page - 1) * u64::from(PAGE_SIZE);
    let items = mine
      .into_iter()
      .skip(offset.min(total) as usize)
      .take(PAGE_SIZE as usize)
      .cloned()
      .collect();
    Ok(Page {
      items,
      page,
      page_size: PAGE_SIZE,
      total,
    })
  }

  async fn transition_status(
    &self,
    order_id: Uuid,
    new_status: OrderStatus,
    payment_reference: Option<&str>,
  ) -> Result<Order> {
    let mut orders = self.orders.write().await;
    let order = orders
      .iter_mut()
      .find(|o| o.id == order_id)
      .ok_or(PurchaseError::NotFound)?;
    if !order.status.can_transition_to(new_status) {
      return Err(PurchaseError::InvalidTransition {
        from: order.status,
        to: new_status,
      });
    }
    order.status = new_status;
    if let Some(reference) = payment_reference {
      order.payment_reference = Some(reference.to_owned());
    }
    order.updated_at = Utc::now();
    Ok(order.clone())
  }
}

/// Catalog lookup backed by a map. `upsert` replacing an entry is how tests
/// model a price change after orders were already taken.
#[derive(Clone, Default)]
pub struct InMemoryTemplateCatalog {
  templates: Arc<RwLock<HashMap<Uuid, Template>>>,
}

impl InMemoryTemplateCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn upsert(&self, template: Template) {
    self.templates.write().await.insert(template.id, template);
  }
}

#[async_trait]
impl TemplateCatalog for InMemoryTemplateCatalog {
  async fn get_template(&self, template_id: Uuid) -> Result<Option<Template>> {
    Ok(self.templates.read().await.get(&template_id).cloned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::LineItem;

  fn new_order_for(user_id: Uuid, cents: i64) -> NewOrder {
    NewOrder {
      user_id,
      currency: "usd".to_owned(),
      line_items: vec![LineItem {
        template_id: Uuid::new_v4(),
        unit_price_cents: cents,
      }],
      total_cents: cents,
    }
  }

  #[tokio::test]
  async fn create_then_get_round_trips() {
    let store = InMemoryOrderStore::new();
    let user = Uuid::new_v4();

    let created = store.create_order(new_order_for(user, 2500)).await.unwrap();
    assert_eq!(created.status, OrderStatus::Pending);
    assert_eq!(created.payment_reference, None);

    let fetched = store.get_order(created.id, Some(user)).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.total_cents, 2500);
  }

  #[tokio::test]
  async fn get_order_hides_other_owners() {
    let store = InMemoryOrderStore::new();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let created = store.create_order(new_order_for(owner, 1000)).await.unwrap();

    let err = store.get_order(created.id, Some(stranger)).await.unwrap_err();
    assert!(matches!(err, PurchaseError::NotFound));
    // The unscoped internal path still sees it.
    assert!(store.get_order(created.id, None).await.is_ok());
  }

  #[tokio::test]
  async fn list_orders_is_newest_first_and_paged() {
    let store = InMemoryOrderStore::new();
    let user = Uuid::new_v4();
    let mut ids = Vec::new();
    for cents in 1..=25 {
      let order = store.create_order(new_order_for(user, cents)).await.unwrap();
      ids.push(order.id);
    }

    let first = store.list_orders(user, 1).await.unwrap();
    assert_eq!(first.total, 25);
    assert_eq!(first.items.len(), PAGE_SIZE as usize);
    assert_eq!(first.items[0].id, ids[24]);

    let second = store.list_orders(user, 2).await.unwrap();
    assert_eq!(second.items.len(), 5);
    assert_eq!(second.items[4].id, ids[0]);
  }

  #[tokio::test]
  async fn list_orders_far_page_is_empty_with_true_total() {
    let store = InMemoryOrderStore::new();
    let user = Uuid::new_v4();
    store.create_order(new_order_for(user, 1000)).await.unwrap();

    let far = store.list_orders(user, u32::MAX).await.unwrap();
    assert!(far.items.is_empty());
    assert_eq!(far.total, 1);
    assert_eq!(far.page, u32::MAX);
  }

  #[tokio::test]
  async fn transition_rejects_terminal_states() {
    let store = InMemoryOrderStore::new();
    let user = Uuid::new_v4();
    let order = store.create_order(new_order_for(user, 500)).await.unwrap();

    let paid = store
      .transition_status(order.id, OrderStatus::Paid, Some("pi_1"))
      .await
      .unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(paid.payment_reference.as_deref(), Some("pi_1"));

    let err = store
      .transition_status(order.id, OrderStatus::Failed, Some("pi_2"))
      .await
      .unwrap_err();
    assert!(matches!(
      err,
      PurchaseError::InvalidTransition {
        from: OrderStatus::Paid,
        to: OrderStatus::Failed,
      }
    ));
    // The losing write must not have touched the reference.
    let current = store.get_order(order.id, None).await.unwrap();
    assert_eq!(current.payment_reference.as_deref(), Some("pi_1"));
  }

  #[tokio::test]
  async fn concurrent_transitions_have_exactly_one_winner() {
    let store = InMemoryOrderStore::new();
    let user = Uuid::new_v4();
    let order = store.create_order(new_order_for(user, 500)).await.unwrap();

    let a = store.transition_status(order.id, OrderStatus::Paid, Some("pi_a"));
    let b = store.transition_status(order.id, OrderStatus::Paid, Some("pi_b"));
    let (ra, rb) = tokio::join!(a, b);

    assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
    let winner = store.get_order(order.id, None).await.unwrap();
    assert_eq!(winner.status, OrderStatus::Paid);
    assert!(matches!(
      winner.payment_reference.as_deref(),
      Some("pi_a") | Some("pi_b")
    ));
  }

  #[tokio::test]
  async fn cancel_preserves_missing_reference() {
    let store = InMemoryOrderStore::new();
    let user = Uuid::new_v4();
    let order = store.create_order(new_order_for(user, 500)).await.unwrap();

    let cancelled = store
      .transition_status(order.id, OrderStatus::Cancelled, None)
      .await
      .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.payment_reference, None);
  }
}
