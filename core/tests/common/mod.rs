// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use std::sync::Arc;

use uuid::Uuid;

use till_core::{InMemoryOrderStore, InMemoryTemplateCatalog, PurchaseWorkflow, Template};

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Workflow wired to in-memory ports, plus direct handles on those ports so
/// tests can inspect state or reshape the catalog behind the workflow's back.
pub struct TestHarness {
  pub workflow: PurchaseWorkflow,
  pub orders: Arc<InMemoryOrderStore>,
  pub catalog: Arc<InMemoryTemplateCatalog>,
}

pub async fn harness_with_templates(templates: Vec<Template>) -> TestHarness {
  setup_tracing();
  let orders = Arc::new(InMemoryOrderStore::new());
  let catalog = Arc::new(InMemoryTemplateCatalog::new());
  for template in templates {
    catalog.upsert(template).await;
  }
  let workflow = PurchaseWorkflow::new(orders.clone(), catalog.clone());
  TestHarness {
    workflow,
    orders,
    catalog,
  }
}

pub fn template(price_cents: i64) -> Template {
  Template {
    id: Uuid::new_v4(),
    name: "Certificate of Completion".to_string(),
    price_cents,
    is_active: true,
  }
}

pub fn inactive_template(price_cents: i64) -> Template {
  Template {
    is_active: false,
    ..template(price_cents)
  }
}
