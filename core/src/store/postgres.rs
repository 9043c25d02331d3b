// till/core/src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{PurchaseError, Result};
use crate::models::{LineItem, NewOrder, Order, OrderStatus, Template};
use crate::store::{OrderStore, Page, TemplateCatalog, PAGE_SIZE};

const ORDER_COLUMNS: &str =
  "id, user_id, total_cents, currency, status, payment_reference, created_at, updated_at";

/// Order store on Postgres. Schema lives in the server's `migrations/`
/// directory (`orders`, `order_items`, and the `order_status` enum).
#[derive(Clone)]
pub struct PgOrderStore {
  pool: PgPool,
}

impl PgOrderStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn line_items_for(&self, order_id: Uuid) -> Result<Vec<LineItem>> {
    let items = sqlx::query_as::<_, LineItem>(
      "SELECT template_id, unit_price_cents FROM order_items \
       WHERE order_id = $1 ORDER BY position ASC",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(items)
  }
}

/// The `orders` row without its line items; joined up in Rust because the
/// item lists are tiny and the two queries stay trivially indexable.
#[derive(Debug, FromRow)]
struct OrderRow {
  id: Uuid,
  user_id: Uuid,
  total_cents: i64,
  currency: String,
  status: OrderStatus,
  payment_reference: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl OrderRow {
  fn into_order(self, line_items: Vec<LineItem>) -> Order {
    Order {
      id: self.id,
      user_id: self.user_id,
      line_items,
      total_cents: self.total_cents,
      currency: self.currency,
      status: self.status,
      payment_reference: self.payment_reference,
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}

#[derive(Debug, FromRow)]
struct ItemRow {
  order_id: Uuid,
  template_id: Uuid,
  unit_price_cents: i64,
}

#[async_trait]
impl OrderStore for PgOrderStore {
  async fn create_order(&self, new_order: NewOrder) -> Result<Order> {
    let order_id = Uuid::new_v4();
    let now = Utc::now();

    // Order row and its items commit or roll back together.
    let mut tx = self.pool.begin().await?;
    sqlx::query(
      "INSERT INTO orders (id, user_id, total_cents, currency, status, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $6)",
    )
    .bind(order_id)
    .bind(new_order.user_id)
    .bind(new_order.total_cents)
    .bind(&new_order.currency)
    .bind(OrderStatus::Pending)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for (position, item) in new_order.line_items.iter().enumerate() {
      sqlx::query(
        "INSERT INTO order_items (order_id, template_id, unit_price_cents, position) \
         VALUES ($1, $2, $3, $4)",
      )
      .bind(order_id)
      .bind(item.template_id)
      .bind(item.unit_price_cents)
      .bind(position as i32)
      .execute(&mut *tx)
      .await?;
    }
    tx.commit().await?;

    Ok(Order {
      id: order_id,
      user_id: new_order.user_id,
      line_items: new_order.line_items,
      total_cents: new_order.total_cents,
      currency: new_order.currency,
      status: OrderStatus::Pending,
      payment_reference: None,
      created_at: now,
      updated_at: now,
    })
  }

  async fn get_order(&self, order_id: Uuid, owner: Option<Uuid>) -> Result<Order> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(order_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or(PurchaseError::NotFound)?;

    if owner.is_some_and(|owner| owner != row.user_id) {
      // Same answer as a missing order: existence must not leak.
      return Err(PurchaseError::NotFound);
    }

    let items = self.line_items_for(order_id).await?;
    Ok(row.into_order(items))
  }

  async fn list_orders(&self, owner: Uuid, page: u32) -> Result<Page<Order>> {
    let page = page.max(1);
    let offset = i64::from(page - 1) * i64::from(PAGE_SIZE);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
      .bind(owner)
      .fetch_one(&self.pool)
      .await?;

    let rows = sqlx::query_as::<_, OrderRow>(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
       ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(owner)
    .bind(i64::from(PAGE_SIZE))
    .bind(offset)
    .fetch_all(&self.pool)
    .await?;

    if rows.is_empty() {
      return Ok(Page {
        items: Vec::new(),
        page,
        page_size: PAGE_SIZE,
        total: total as u64,
      });
    }

    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let item_rows = sqlx::query_as::<_, ItemRow>(
      "SELECT order_id, template_id, unit_price_cents FROM order_items \
       WHERE order_id = ANY($1) ORDER BY position ASC",
    )
    .bind(&ids)
    .fetch_all(&self.pool)
    .await?;

    let mut items_by_order: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
    for item in item_rows {
      items_by_order.entry(item.order_id).or_default().push(LineItem {
        template_id: item.template_id,
        unit_price_cents: item.unit_price_cents,
      });
    }

    let items = rows
      .into_iter()
      .map(|row| {
        let line_items = items_by_order.remove(&row.id).unwrap_or_default();
        row.into_order(line_items)
      })
      .collect();

    Ok(Page {
      items,
      page,
      page_size: PAGE_SIZE,
      total: total as u64,
    })
  }

  async fn transition_status(
    &self,
    order_id: Uuid,
    new_status: OrderStatus,
    payment_reference: Option<&str>,
  ) -> Result<Order> {
    if new_status == OrderStatus::Pending {
      // Re-entering pending is illegal from every state; report it against
      // the live row so the error names the real starting point.
      let current = self.get_order(order_id, None).await?;
      return Err(PurchaseError::InvalidTransition {
        from: current.status,
        to: new_status,
      });
    }

    // The status guard in the WHERE clause is the compare-and-swap: of two
    // concurrent settlements, exactly one matches the pending row.
    let updated = sqlx::query_as::<_, OrderRow>(&format!(
      "UPDATE orders \
       SET status = $2, payment_reference = COALESCE($3, payment_reference), updated_at = now() \
       WHERE id = $1 AND status = 'pending' \
       RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(new_status)
    .bind(payment_reference)
    .fetch_optional(&self.pool)
    .await?;

    match updated {
      Some(row) => {
        let items = self.line_items_for(order_id).await?;
        Ok(row.into_order(items))
      }
      None => {
        // Zero rows: either the order is gone or it already settled.
        let current = self.get_order(order_id, None).await?;
        Err(PurchaseError::InvalidTransition {
          from: current.status,
          to: new_status,
        })
      }
    }
  }
}

/// Catalog lookup against the `templates` table.
#[derive(Clone)]
pub struct PgTemplateCatalog {
  pool: PgPool,
}

impl PgTemplateCatalog {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl TemplateCatalog for PgTemplateCatalog {
  async fn get_template(&self, template_id: Uuid) -> Result<Option<Template>> {
    let template = sqlx::query_as::<_, Template>(
      "SELECT id, name, price_cents, is_active FROM templates WHERE id = $1",
    )
    .bind(template_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(template)
  }
}
