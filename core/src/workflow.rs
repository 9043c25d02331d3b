// till/core/src/workflow.rs

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{PurchaseError, Result};
use crate::models::{LineItem, NewOrder, Order, OrderStatus};
use crate::store::{OrderStore, Page, TemplateCatalog};

/// The one component allowed to mutate order status.
///
/// Payment confirmations arrive over an unreliable, replayable channel:
/// webhooks are delivered at least once, can race their own retries, and can
/// arrive after a user-initiated cancel. Every transition here is therefore
/// checked against the order's current state instead of blindly applied, and
/// every externally triggered operation is idempotent. The store's
/// compare-and-swap `transition_status` closes the remaining window between
/// check and write.
pub struct PurchaseWorkflow {
  orders: Arc<dyn OrderStore>,
  catalog: Arc<dyn TemplateCatalog>,
}

impl PurchaseWorkflow {
  pub fn new(orders: Arc<dyn OrderStore>, catalog: Arc<dyn TemplateCatalog>) -> Self {
    Self { orders, catalog }
  }

  /// Creates a `pending` order for `user_id`, snapshotting the current
  /// catalog price of every requested template into the line items.
  ///
  /// Rejects an empty list, an unknown template, or an inactive template
  /// with [`PurchaseError::InvalidLineItems`] before anything is persisted.
  /// The snapshots make the order immune to later price changes.
  #[instrument(name = "workflow::create_order", skip(self))]
  pub async fn create_order(
    &self,
    user_id: Uuid,
    template_ids: &[Uuid],
    currency: &str,
  ) -> Result<Order> {
    if template_ids.is_empty() {
      return Err(PurchaseError::InvalidLineItems(
        "order must contain at least one item".to_owned(),
      ));
    }

    let mut line_items = Vec::with_capacity(template_ids.len());
    for template_id in template_ids {
      let template = self
        .catalog
        .get_template(*template_id)
        .await?
        .ok_or_else(|| {
          PurchaseError::InvalidLineItems(format!("unknown template {template_id}"))
        })?;
      if !template.is_active {
        return Err(PurchaseError::InvalidLineItems(format!(
          "template {template_id} is not purchasable"
        )));
      }
      line_items.push(LineItem {
        template_id: template.id,
        unit_price_cents: template.price_cents,
      });
    }
    let total_cents = line_items.iter().map(|item| item.unit_price_cents).sum();

    let order = self
      .orders
      .create_order(NewOrder {
        user_id,
        currency: currency.to_owned(),
        line_items,
        total_cents,
      })
      .await?;
    info!(order_id = %order.id, total_cents, "order created");
    Ok(order)
  }

  /// Owner-scoped fetch; `owner: None` is the trusted internal path.
  pub async fn get_order(&self, order_id: Uuid, owner: Option<Uuid>) -> Result<Order> {
    self.orders.get_order(order_id, owner).await
  }

  /// The owner's order history, newest first.
  pub async fn list_orders(&self, owner: Uuid, page: u32) -> Result<Page<Order>> {
    self.orders.list_orders(owner, page).await
  }

  /// Gatekeeper for intent creation: the order must exist, belong to the
  /// caller, and still be `pending`. Returns the order the gateway should
  /// quote; does not mutate anything.
  #[instrument(name = "workflow::begin_payment", skip(self))]
  pub async fn begin_payment(&self, order_id: Uuid, owner: Uuid) -> Result<Order> {
    let order = self.orders.get_order(order_id, Some(owner)).await?;
    if order.status != OrderStatus::Pending {
      return Err(PurchaseError::Conflict(format!(
        "payment can only start for a pending order, order {order_id} is {}",
        order.status
      )));
    }
    Ok(order)
  }

  /// Settles an order as `paid` in response to a verified success event.
  ///
  /// Idempotent under at-least-once webhook delivery:
  /// - already `paid` with the same `payment_reference`: success, no write;
  /// - `pending`: compare-and-swap to `paid`, recording the reference. A
  ///   caller that loses the swap against a concurrent delivery re-reads the
  ///   order and still reports success if the winner recorded the same
  ///   reference;
  /// - `failed`/`cancelled`, or `paid` under a different reference:
  ///   [`PurchaseError::Conflict`]. The settled state is never overwritten;
  ///   this needs an operator, not a retry.
  #[instrument(name = "workflow::complete_payment", skip(self))]
  pub async fn complete_payment(
    &self,
    order_id: Uuid,
    payment_reference: &str,
    event_id: &str,
  ) -> Result<Order> {
    let order = self.orders.get_order(order_id, None).await?;
    match order.status {
      OrderStatus::Paid => {
        if order.payment_reference.as_deref() == Some(payment_reference) {
          debug!(%order_id, event_id, "duplicate success event absorbed");
          Ok(order)
        } else {
          Err(PurchaseError::Conflict(format!(
            "order {order_id} is already paid under reference {:?}, refusing to record {payment_reference}",
            order.payment_reference
          )))
        }
      }
      OrderStatus::Pending => {
        match self
          .orders
          .transition_status(order_id, OrderStatus::Paid, Some(payment_reference))
          .await
        {
          Ok(updated) => {
            info!(%order_id, payment_reference, event_id, "order paid");
            Ok(updated)
          }
          Err(PurchaseError::InvalidTransition { .. }) => {
            // Lost the swap to a concurrent delivery. If the winner wrote
            // the same reference this is the duplicate-delivery no-op.
            let current = self.orders.get_order(order_id, None).await?;
            if current.status == OrderStatus::Paid
              && current.payment_reference.as_deref() == Some(payment_reference)
            {
              debug!(%order_id, event_id, "lost settlement race to an identical delivery");
              Ok(current)
            } else {
              Err(PurchaseError::Conflict(format!(
                "order {order_id} settled as {} under reference {:?} while handling {payment_reference}",
                current.status, current.payment_reference
              )))
            }
          }
          Err(other) => Err(other),
        }
      }
      OrderStatus::Failed | OrderStatus::Cancelled => Err(PurchaseError::Conflict(format!(
        "success event for order {order_id} in terminal state {}",
        order.status
      ))),
    }
  }

  /// Records a failed payment attempt: `pending` orders move to `failed`
  /// with the provider's reference (when it sent one) and the reason goes to
  /// the audit log. Orders already settled are left exactly as they are;
  /// in particular a `paid` order is never downgraded by a late or replayed
  /// failure event.
  #[instrument(name = "workflow::handle_payment_failure", skip(self))]
  pub async fn handle_payment_failure(
    &self,
    order_id: Uuid,
    payment_reference: Option<&str>,
    reason: &str,
  ) -> Result<Order> {
    let order = self.orders.get_order(order_id, None).await?;
    if order.status.is_terminal() {
      debug!(%order_id, status = %order.status, "failure event for settled order ignored");
      return Ok(order);
    }

    // Audit trail for declined payments lives in the log stream.
    warn!(%order_id, ?payment_reference, reason, "payment failed");

    match self
      .orders
      .transition_status(order_id, OrderStatus::Failed, payment_reference)
      .await
    {
      Ok(updated) => Ok(updated),
      Err(PurchaseError::InvalidTransition { .. }) => {
        // Raced another settlement between the read and the swap; the order
        // is terminal now, so this delivery reduces to the no-op above.
        self.orders.get_order(order_id, None).await
      }
      Err(other) => Err(other),
    }
  }

  /// User-initiated cancellation of a `pending` order. Terminal orders fail
  /// with [`PurchaseError::InvalidTransition`]; a cancel that races a
  /// success webhook loses cleanly to the compare-and-swap.
  #[instrument(name = "workflow::cancel_order", skip(self))]
  pub async fn cancel_order(&self, order_id: Uuid, owner: Uuid) -> Result<Order> {
    let order = self.orders.get_order(order_id, Some(owner)).await?;
    let cancelled = self
      .orders
      .transition_status(order.id, OrderStatus::Cancelled, None)
      .await?;
    info!(%order_id, "order cancelled");
    Ok(cancelled)
  }
}
