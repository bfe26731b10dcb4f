//! Payment collaborator seam.
//!
//! The processor only sees [`ChargeGateway`]; production wires in the
//! HTTP client, tests substitute a scripted gateway. A declined charge is
//! a normal outcome, not an error — only transport-level problems surface
//! as [`GatewayError`], and the processor folds those into the same
//! "charge failed" path.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use client::HttpChargeGateway;

#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub tenant_id: Uuid,
    pub pledge_id: Uuid,
    pub donor_user_id: Option<Uuid>,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum ChargeOutcome {
    Approved { reference: String },
    Declined { reason: String },
}

impl ChargeOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, ChargeOutcome::Approved { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Invalid response from payment gateway: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open - payment gateway unavailable")]
    CircuitBreakerOpen,
}

#[async_trait]
pub trait ChargeGateway: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, GatewayError>;
}
