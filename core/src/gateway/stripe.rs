// till/core/src/gateway/stripe.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{PurchaseError, Result};
use crate::gateway::{PaymentEvent, PaymentEventKind, PaymentGateway, PaymentIntent};
use crate::models::Order;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// How far a webhook's signed timestamp may drift from our clock before the
/// delivery is treated as a replay.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Stripe-backed implementation of [`PaymentGateway`].
///
/// Credentials come in through the constructor; nothing here touches global
/// provider state, so two differently-keyed gateways can coexist in one
/// process (which is exactly what tests do).
pub struct StripeGateway {
  http: Client,
  api_base: String,
  secret_key: String,
  webhook_secret: String,
}

impl StripeGateway {
  pub fn new(secret_key: String, webhook_secret: String) -> Self {
    Self {
      http: Client::new(),
      api_base: DEFAULT_API_BASE.to_owned(),
      secret_key,
      webhook_secret,
    }
  }

  /// Points the client at a different API host. For Stripe-compatible mocks
  /// and test environments.
  pub fn with_api_base(mut self, api_base: String) -> Self {
    self.api_base = api_base;
    self
  }

  fn expected_signature(&self, timestamp: &str, payload: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
      .map_err(|_| PurchaseError::InvalidSignature)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
  }
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
  id: String,
  client_secret: String,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
  id: String,
  #[serde(rename = "type")]
  event_type: String,
  data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
  object: EventObject,
}

#[derive(Debug, Deserialize)]
struct EventObject {
  id: Option<String>,
  #[serde(default)]
  metadata: HashMap<String, String>,
  last_payment_error: Option<LastPaymentError>,
}

#[derive(Debug, Deserialize)]
struct LastPaymentError {
  message: Option<String>,
}

fn parse_event(payload: &[u8]) -> Result<PaymentEvent> {
  let envelope: EventEnvelope =
    serde_json::from_slice(payload).map_err(|e| PurchaseError::MalformedEvent(e.to_string()))?;

  let object = envelope.data.object;
  let order_id = object
    .metadata
    .get("order_id")
    .and_then(|raw| Uuid::parse_str(raw).ok());
  let failure_message = object.last_payment_error.and_then(|err| err.message);

  Ok(PaymentEvent {
    kind: PaymentEventKind::from_event_type(&envelope.event_type),
    event_id: envelope.id,
    event_type: envelope.event_type,
    payment_reference: object.id,
    order_id,
    failure_message,
  })
}

#[async_trait]
impl PaymentGateway for StripeGateway {
  async fn create_intent(&self, order: &Order) -> Result<PaymentIntent> {
    // Amounts are already integer minor units; they go through unchanged.
    let params = [
      ("amount", order.total_cents.to_string()),
      ("currency", order.currency.clone()),
      ("metadata[order_id]", order.id.to_string()),
      ("automatic_payment_methods[enabled]", "true".to_owned()),
    ];

    let response = self
      .http
      .post(format!("{}/v1/payment_intents", self.api_base))
      .bearer_auth(&self.secret_key)
      .form(&params)
      .send()
      .await
      .map_err(|e| PurchaseError::GatewayUnavailable(format!("request failed: {e}")))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| PurchaseError::GatewayUnavailable(format!("reading response failed: {e}")))?;

    if !status.is_success() {
      return Err(PurchaseError::GatewayUnavailable(format!(
        "provider answered {status}: {body}"
      )));
    }

    let intent: IntentResponse = serde_json::from_str(&body)
      .map_err(|e| PurchaseError::GatewayUnavailable(format!("unparseable response: {e}")))?;

    Ok(PaymentIntent {
      intent_id: intent.id,
      client_secret: intent.client_secret,
    })
  }

  fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> Result<PaymentEvent> {
    // Header shape: "t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]".
    // Multiple v1 entries appear during secret rotation.
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in signature_header.split(',') {
      let mut kv = part.trim().splitn(2, '=');
      match (kv.next(), kv.next()) {
        (Some("t"), Some(value)) => timestamp = Some(value),
        (Some("v1"), Some(value)) => candidates.push(value),
        _ => {}
      }
    }
    let timestamp = timestamp.ok_or(PurchaseError::InvalidSignature)?;
    if candidates.is_empty() {
      return Err(PurchaseError::InvalidSignature);
    }

    let expected = self.expected_signature(timestamp, payload)?;
    let matched = candidates
      .iter()
      .any(|candidate| bool::from(expected.as_bytes().ct_eq(candidate.as_bytes())));
    if !matched {
      return Err(PurchaseError::InvalidSignature);
    }

    // Signed-but-stale deliveries are replays as far as we are concerned.
    let signed_at: i64 = timestamp.parse().map_err(|_| PurchaseError::InvalidSignature)?;
    if (Utc::now().timestamp() - signed_at).abs() > SIGNATURE_TOLERANCE_SECS {
      return Err(PurchaseError::InvalidSignature);
    }

    parse_event(payload)
  }
}
