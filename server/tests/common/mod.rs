// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use sha2::Sha256;
use uuid::Uuid;

use till_core::{
  InMemoryOrderStore, InMemoryTemplateCatalog, NewOrder, Order, OrderStatus, OrderStore, Page,
  PaymentEvent, PaymentGateway, PaymentIntent, PurchaseError, PurchaseWorkflow, StripeGateway,
  Template,
};
use till_server::config::AppConfig;
use till_server::state::AppState;

pub const TEST_STRIPE_SECRET_KEY: &str = "sk_test_123";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

// --- Helper for Tracing Setup (call once per test run if needed) ---
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

/// Application state over in-memory ports, plus direct handles on those
/// ports so tests can seed the catalog or inspect orders underneath the
/// HTTP surface.
pub struct TestContext {
  pub state: AppState,
  pub orders: Arc<InMemoryOrderStore>,
  pub catalog: Arc<InMemoryTemplateCatalog>,
}

fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    database_url: "postgres://unused-in-tests".to_string(),
    stripe_secret_key: TEST_STRIPE_SECRET_KEY.to_string(),
    stripe_webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
    currency: "usd".to_string(),
    run_migrations: false,
  }
}

/// Context whose gateway is the real Stripe adapter holding the test
/// webhook secret. Webhook tests sign against that same secret; nothing
/// here ever reaches the provider's API.
pub async fn context_with_templates(templates: Vec<Template>) -> TestContext {
  let gateway = Arc::new(StripeGateway::new(
    TEST_STRIPE_SECRET_KEY.to_string(),
    TEST_WEBHOOK_SECRET.to_string(),
  ));
  context_with_gateway(templates, gateway).await
}

pub async fn context_with_gateway(
  templates: Vec<Template>,
  gateway: Arc<dyn PaymentGateway>,
) -> TestContext {
  setup_tracing();
  let orders = Arc::new(InMemoryOrderStore::new());
  let catalog = Arc::new(InMemoryTemplateCatalog::new());
  for template in templates {
    catalog.upsert(template).await;
  }
  let workflow = Arc::new(PurchaseWorkflow::new(orders.clone(), catalog.clone()));
  let state = AppState {
    workflow,
    gateway,
    config: Arc::new(test_config()),
  };
  TestContext {
    state,
    orders,
    catalog,
  }
}

/// Context like [`context_with_templates`] but whose order store fails
/// every status write, as the pool does during a database outage. Reads
/// and creation still work, so tests can seed orders through the API; the
/// returned handle sees the backing store directly.
pub async fn context_with_failing_writes(templates: Vec<Template>) -> TestContext {
  setup_tracing();
  let backing = Arc::new(InMemoryOrderStore::new());
  let orders: Arc<dyn OrderStore> = Arc::new(FailingOrderStore {
    inner: backing.clone(),
  });
  let catalog = Arc::new(InMemoryTemplateCatalog::new());
  for template in templates {
    catalog.upsert(template).await;
  }
  let workflow = Arc::new(PurchaseWorkflow::new(orders, catalog.clone()));
  let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(
    TEST_STRIPE_SECRET_KEY.to_string(),
    TEST_WEBHOOK_SECRET.to_string(),
  ));
  let state = AppState {
    workflow,
    gateway,
    config: Arc::new(test_config()),
  };
  TestContext {
    state,
    orders: backing,
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

// --- Gateway doubles for the intent-creation path ---

/// Issues a deterministic intent without any network traffic.
pub struct MockGateway;

#[async_trait]
impl PaymentGateway for MockGateway {
  async fn create_intent(&self, order: &Order) -> till_core::Result<PaymentIntent> {
    Ok(PaymentIntent {
      intent_id: format!("pi_mock_{}", order.id.simple()),
      client_secret: format!("pi_mock_{}_secret", order.id.simple()),
    })
  }

  fn verify_webhook(
    &self,
    _payload: &[u8],
    _signature_header: &str,
  ) -> till_core::Result<PaymentEvent> {
    Err(PurchaseError::InvalidSignature)
  }
}

/// Simulates a provider outage on every call.
pub struct FailingGateway;

#[async_trait]
impl PaymentGateway for FailingGateway {
  async fn create_intent(&self, _order: &Order) -> till_core::Result<PaymentIntent> {
    Err(PurchaseError::GatewayUnavailable(
      "simulated provider outage".to_string(),
    ))
  }

  fn verify_webhook(
    &self,
    _payload: &[u8],
    _signature_header: &str,
  ) -> till_core::Result<PaymentEvent> {
    Err(PurchaseError::InvalidSignature)
  }
}

// --- Store double for the storage-outage path ---

/// Passes reads and creation through to an in-memory store, but answers
/// every status write with a pool timeout.
pub struct FailingOrderStore {
  inner: Arc<InMemoryOrderStore>,
}

#[async_trait]
impl OrderStore for FailingOrderStore {
  async fn create_order(&self, new_order: NewOrder) -> till_core::Result<Order> {
    self.inner.create_order(new_order).await
  }

  async fn get_order(&self, order_id: Uuid, owner: Option<Uuid>) -> till_core::Result<Order> {
    self.inner.get_order(order_id, owner).await
  }

  async fn list_orders(&self, owner: Uuid, page: u32) -> till_core::Result<Page<Order>> {
    self.inner.list_orders(owner, page).await
  }

  async fn transition_status(
    &self,
    _order_id: Uuid,
    _new_status: OrderStatus,
    _payment_reference: Option<&str>,
  ) -> till_core::Result<Order> {
    Err(PurchaseError::Storage(sqlx::Error::PoolTimedOut))
  }
}

// --- Webhook signing ---

type HmacSha256 = Hmac<Sha256>;

/// Builds a `Stripe-Signature` header value for `payload`, signed with
/// `secret` at the current time.
pub fn sign_payload(secret: &str, payload: &str) -> String {
  sign_payload_at(secret, payload, Utc::now().timestamp())
}

pub fn sign_payload_at(secret: &str, payload: &str, timestamp: i64) -> String {
  let mut mac =
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
  mac.update(timestamp.to_string().as_bytes());
  mac.update(b".");
  mac.update(payload.as_bytes());
  let signature = hex::encode(mac.finalize().into_bytes());
  format!("t={},v1={}", timestamp, signature)
}

/// A provider-shaped `payment_intent.succeeded` payload for `order_id`.
pub fn succeeded_event_payload(order_id: Uuid, intent_id: &str) -> String {
  serde_json::json!({
    "id": format!("evt_{}", Uuid::new_v4().simple()),
    "type": "payment_intent.succeeded",
    "data": {
      "object": {
        "id": intent_id,
        "metadata": { "order_id": order_id.to_string() }
      }
    }
  })
  .to_string()
}

pub fn failed_event_payload(order_id: Uuid, intent_id: &str, message: &str) -> String {
  serde_json::json!({
    "id": format!("evt_{}", Uuid::new_v4().simple()),
    "type": "payment_intent.payment_failed",
    "data": {
      "object": {
        "id": intent_id,
        "metadata": { "order_id": order_id.to_string() },
        "last_payment_error": { "message": message }
      }
    }
  })
  .to_string()
}
