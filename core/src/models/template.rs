// till/core/src/models/template.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Catalog read model for a purchasable template.
///
/// The catalog itself (CRUD, categories, content) is owned elsewhere; the
/// order workflow only needs the current price and whether the template may
/// still be sold.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Template {
  pub id: Uuid,
  pub name: String,
  pub price_cents: i64,
  pub is_active: bool,
}
