//! Request/response bodies for the admin HTTP surface.
//!
//! Keys the admin UI sends (settings, admin overrides) are camelCase;
//! entity rows serialize as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::models::Fund;
use crate::domain::{Frequency, Pledge, PledgeSettings, PledgeStatus};

#[derive(Debug, Serialize)]
pub struct PledgeListResponse {
    pub pledges: Vec<Pledge>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct PledgeResponse {
    pub pledge: Pledge,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PledgesQuery {
    /// active | paused | cancelled | completed | failed
    pub status: Option<String>,
    pub fund_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePledgeRequest {
    pub donor_user_id: Option<Uuid>,
    pub fund_id: Uuid,
    pub amount_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub frequency: Frequency,
    /// Defaults to now, making the pledge immediately due.
    pub next_charge_at: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// `{"adminOverride": {"status": ...}}` or
/// `{"adminOverride": {"nextChargeAt": ...}}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePledgeRequest {
    pub admin_override: AdminOverride,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverride {
    pub status: Option<PledgeStatus>,
    pub next_charge_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PledgeSettingsBody {
    pub max_failures_before_pause: i32,
    pub retry_interval_hours: i32,
    pub grace_period_days: i32,
    pub auto_resume_on_success: bool,
    pub dunning_email_days: Vec<i32>,
}

impl From<PledgeSettings> for PledgeSettingsBody {
    fn from(s: PledgeSettings) -> Self {
        Self {
            max_failures_before_pause: s.max_failures_before_pause,
            retry_interval_hours: s.retry_interval_hours,
            grace_period_days: s.grace_period_days,
            auto_resume_on_success: s.auto_resume_on_success,
            dunning_email_days: s.dunning_email_days,
        }
    }
}

impl From<PledgeSettingsBody> for PledgeSettings {
    fn from(b: PledgeSettingsBody) -> Self {
        Self {
            max_failures_before_pause: b.max_failures_before_pause,
            retry_interval_hours: b.retry_interval_hours,
            grace_period_days: b.grace_period_days,
            auto_resume_on_success: b.auto_resume_on_success,
            dunning_email_days: b.dunning_email_days,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProcessQuery {
    /// process | retry
    pub action: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessResponse {
    pub message: String,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct FundsQuery {
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Serialize)]
pub struct FundListResponse {
    pub funds: Vec<Fund>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFundRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_fund_type")]
    pub fund_type: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub goal_amount_cents: Option<i64>,
    #[serde(default)]
    pub allow_anonymous: bool,
}

fn default_fund_type() -> String {
    "general".to_string()
}

fn default_visibility() -> String {
    "public".to_string()
}
