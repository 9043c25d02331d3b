// till/server/src/state.rs
use crate::config::AppConfig;
use std::sync::Arc;
use till_core::{PaymentGateway, PurchaseWorkflow};

#[derive(Clone)]
pub struct AppState {
  pub workflow: Arc<PurchaseWorkflow>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub config: Arc<AppConfig>, // Share loaded config
}
