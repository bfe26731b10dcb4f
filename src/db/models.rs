use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Fund {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub fund_type: String,
    pub visibility: String,
    pub currency: String,
    pub goal_amount_cents: Option<i64>,
    pub allow_anonymous: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit trail row. Charge attempts, automatic pauses/resumes, admin
/// overrides, and dunning notices all land here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PledgeEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub pledge_id: Uuid,
    pub kind: String,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub mod event_kind {
    pub const CHARGE_SUCCEEDED: &str = "charge_succeeded";
    pub const CHARGE_FAILED: &str = "charge_failed";
    pub const AUTO_PAUSED: &str = "auto_paused";
    pub const AUTO_RESUMED: &str = "auto_resumed";
    pub const ADMIN_OVERRIDE: &str = "admin_override";
    pub const DUNNING_NOTICE: &str = "dunning_notice";
}
