//! Tenant-scoped queries. Every statement filters on `tenant_id`; handlers
//! and the processor never touch the pool without going through here.

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Result};
use uuid::Uuid;

use crate::db::models::{event_kind, Fund};
use crate::domain::{ChargePlan, Pledge, PledgeSettings, PledgeStatus};

pub async fn get_all_tenant_configs(pool: &PgPool) -> Result<Vec<crate::tenant::TenantConfig>> {
    sqlx::query_as::<_, crate::tenant::TenantConfig>(
        "SELECT tenant_id, name, is_active FROM tenants WHERE is_active = true",
    )
    .fetch_all(pool)
    .await
}

const PLEDGE_COLUMNS: &str = "id, tenant_id, donor_user_id, fund_id, amount_cents, currency, \
     frequency, status, failure_count, next_charge_at, failing_since, \
     total_amount_cents, total_charges_count, created_at, updated_at";

// ---------------------------------------------------------------------------
// Funds
// ---------------------------------------------------------------------------

pub async fn list_funds(pool: &PgPool, tenant_id: Uuid, include_archived: bool) -> Result<Vec<Fund>> {
    sqlx::query_as::<_, Fund>(
        "SELECT * FROM funds
         WHERE tenant_id = $1 AND (is_archived = false OR $2)
         ORDER BY created_at ASC",
    )
    .bind(tenant_id)
    .bind(include_archived)
    .fetch_all(pool)
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_fund(
    pool: &PgPool,
    tenant_id: Uuid,
    name: &str,
    description: Option<&str>,
    fund_type: &str,
    visibility: &str,
    currency: &str,
    goal_amount_cents: Option<i64>,
    allow_anonymous: bool,
) -> Result<Fund> {
    sqlx::query_as::<_, Fund>(
        "INSERT INTO funds (tenant_id, name, description, fund_type, visibility, currency,
                            goal_amount_cents, allow_anonymous)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(tenant_id)
    .bind(name)
    .bind(description)
    .bind(fund_type)
    .bind(visibility)
    .bind(currency)
    .bind(goal_amount_cents)
    .bind(allow_anonymous)
    .fetch_one(pool)
    .await
}

pub async fn get_fund(pool: &PgPool, tenant_id: Uuid, fund_id: Uuid) -> Result<Option<Fund>> {
    sqlx::query_as::<_, Fund>("SELECT * FROM funds WHERE id = $1 AND tenant_id = $2")
        .bind(fund_id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
}

/// Funds referenced by pledges are never deleted, only archived.
pub async fn archive_fund(pool: &PgPool, tenant_id: Uuid, fund_id: Uuid) -> Result<Option<Fund>> {
    sqlx::query_as::<_, Fund>(
        "UPDATE funds SET is_archived = true, updated_at = NOW()
         WHERE id = $1 AND tenant_id = $2
         RETURNING *",
    )
    .bind(fund_id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Pledges
// ---------------------------------------------------------------------------

/// List filter. `Failed` is not a persisted status: it selects active
/// pledges whose failure episode has outlived the tenant's grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Status(PledgeStatus),
    Failed,
}

pub async fn list_pledges(
    pool: &PgPool,
    tenant_id: Uuid,
    status: Option<StatusFilter>,
    fund_id: Option<Uuid>,
    grace_period_days: i32,
) -> Result<Vec<Pledge>> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {PLEDGE_COLUMNS} FROM pledges WHERE tenant_id = "
    ));
    builder.push_bind(tenant_id);

    match status {
        Some(StatusFilter::Status(status)) => {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        Some(StatusFilter::Failed) => {
            let at_risk_cutoff = Utc::now() - Duration::days(grace_period_days as i64);
            builder
                .push(" AND status = 'active' AND failure_count > 0 AND failing_since <= ")
                .push_bind(at_risk_cutoff);
        }
        None => {}
    }

    if let Some(fund_id) = fund_id {
        builder.push(" AND fund_id = ").push_bind(fund_id);
    }

    builder.push(" ORDER BY created_at DESC");

    builder.build_query_as::<Pledge>().fetch_all(pool).await
}

pub async fn insert_pledge(pool: &PgPool, pledge: &Pledge) -> Result<Pledge> {
    sqlx::query_as::<_, Pledge>(&format!(
        "INSERT INTO pledges (id, tenant_id, donor_user_id, fund_id, amount_cents, currency,
                              frequency, status, failure_count, next_charge_at, failing_since,
                              total_amount_cents, total_charges_count, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
         RETURNING {PLEDGE_COLUMNS}"
    ))
    .bind(pledge.id)
    .bind(pledge.tenant_id)
    .bind(pledge.donor_user_id)
    .bind(pledge.fund_id)
    .bind(pledge.amount_cents)
    .bind(&pledge.currency)
    .bind(pledge.frequency)
    .bind(pledge.status)
    .bind(pledge.failure_count)
    .bind(pledge.next_charge_at)
    .bind(pledge.failing_since)
    .bind(pledge.total_amount_cents)
    .bind(pledge.total_charges_count)
    .bind(pledge.created_at)
    .bind(pledge.updated_at)
    .fetch_one(pool)
    .await
}

pub async fn get_pledge(pool: &PgPool, tenant_id: Uuid, pledge_id: Uuid) -> Result<Option<Pledge>> {
    sqlx::query_as::<_, Pledge>(&format!(
        "SELECT {PLEDGE_COLUMNS} FROM pledges WHERE id = $1 AND tenant_id = $2"
    ))
    .bind(pledge_id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await
}

pub async fn select_due_pledges(
    pool: &PgPool,
    tenant_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<Pledge>> {
    sqlx::query_as::<_, Pledge>(&format!(
        "SELECT {PLEDGE_COLUMNS} FROM pledges
         WHERE tenant_id = $1 AND status = 'active' AND next_charge_at <= $2
         ORDER BY next_charge_at ASC"
    ))
    .bind(tenant_id)
    .bind(now)
    .fetch_all(pool)
    .await
}

/// Pledges eligible for a manual retry run: paused or active, with
/// outstanding failures, and not attempted within the retry interval.
/// A paused pledge whose retry already succeeded has `failure_count = 0`
/// and must not be charged again until it is due.
pub async fn select_retry_pledges(
    pool: &PgPool,
    tenant_id: Uuid,
    attempted_before: DateTime<Utc>,
) -> Result<Vec<Pledge>> {
    sqlx::query_as::<_, Pledge>(&format!(
        "SELECT {PLEDGE_COLUMNS} FROM pledges
         WHERE tenant_id = $1
           AND status IN ('paused', 'active')
           AND failure_count > 0
           AND updated_at <= $2
         ORDER BY updated_at ASC"
    ))
    .bind(tenant_id)
    .bind(attempted_before)
    .fetch_all(pool)
    .await
}

/// Claims a pledge for charging with a single conditional update: the row
/// is taken only if `next_charge_at` still matches what the caller
/// observed, so two concurrent runs cannot both charge it. The claim
/// parks `next_charge_at` at the retry time; the post-charge update then
/// overwrites it with the real outcome.
pub async fn claim_pledge_for_charge(
    pool: &PgPool,
    tenant_id: Uuid,
    pledge_id: Uuid,
    observed_next_charge_at: DateTime<Utc>,
    hold_until: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE pledges SET next_charge_at = $4, updated_at = NOW()
         WHERE id = $1 AND tenant_id = $2
           AND status IN ('active', 'paused')
           AND next_charge_at = $3",
    )
    .bind(pledge_id)
    .bind(tenant_id)
    .bind(observed_next_charge_at)
    .bind(hold_until)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Applies a computed [`ChargePlan`]. Totals only ever grow, and only on a
/// successful charge.
pub async fn apply_charge_plan(
    pool: &PgPool,
    tenant_id: Uuid,
    pledge_id: Uuid,
    plan: &ChargePlan,
) -> Result<Pledge> {
    sqlx::query_as::<_, Pledge>(&format!(
        "UPDATE pledges
         SET status = $3,
             failure_count = $4,
             next_charge_at = $5,
             failing_since = $6,
             total_amount_cents = total_amount_cents + $7,
             total_charges_count = total_charges_count + CASE WHEN $7 > 0 THEN 1 ELSE 0 END,
             updated_at = NOW()
         WHERE id = $1 AND tenant_id = $2
         RETURNING {PLEDGE_COLUMNS}"
    ))
    .bind(pledge_id)
    .bind(tenant_id)
    .bind(plan.status)
    .bind(plan.failure_count)
    .bind(plan.next_charge_at)
    .bind(plan.failing_since)
    .bind(plan.charged_cents)
    .fetch_one(pool)
    .await
}

pub async fn override_pledge_status(
    pool: &PgPool,
    tenant_id: Uuid,
    pledge_id: Uuid,
    status: PledgeStatus,
) -> Result<Option<Pledge>> {
    sqlx::query_as::<_, Pledge>(&format!(
        "UPDATE pledges SET status = $3, updated_at = NOW()
         WHERE id = $1 AND tenant_id = $2
         RETURNING {PLEDGE_COLUMNS}"
    ))
    .bind(pledge_id)
    .bind(tenant_id)
    .bind(status)
    .fetch_optional(pool)
    .await
}

pub async fn override_pledge_next_charge_at(
    pool: &PgPool,
    tenant_id: Uuid,
    pledge_id: Uuid,
    next_charge_at: DateTime<Utc>,
) -> Result<Option<Pledge>> {
    sqlx::query_as::<_, Pledge>(&format!(
        "UPDATE pledges SET next_charge_at = $3, updated_at = NOW()
         WHERE id = $1 AND tenant_id = $2
         RETURNING {PLEDGE_COLUMNS}"
    ))
    .bind(pledge_id)
    .bind(tenant_id)
    .bind(next_charge_at)
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub async fn get_settings(pool: &PgPool, tenant_id: Uuid) -> Result<Option<PledgeSettings>> {
    sqlx::query_as::<_, PledgeSettings>(
        "SELECT max_failures_before_pause, retry_interval_hours, grace_period_days,
                auto_resume_on_success, dunning_email_days
         FROM pledge_settings
         WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await
}

pub async fn upsert_settings(
    pool: &PgPool,
    tenant_id: Uuid,
    settings: &PledgeSettings,
) -> Result<PledgeSettings> {
    sqlx::query_as::<_, PledgeSettings>(
        "INSERT INTO pledge_settings (tenant_id, max_failures_before_pause, retry_interval_hours,
                                      grace_period_days, auto_resume_on_success, dunning_email_days)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (tenant_id) DO UPDATE
         SET max_failures_before_pause = EXCLUDED.max_failures_before_pause,
             retry_interval_hours = EXCLUDED.retry_interval_hours,
             grace_period_days = EXCLUDED.grace_period_days,
             auto_resume_on_success = EXCLUDED.auto_resume_on_success,
             dunning_email_days = EXCLUDED.dunning_email_days,
             updated_at = NOW()
         RETURNING max_failures_before_pause, retry_interval_hours, grace_period_days,
                   auto_resume_on_success, dunning_email_days",
    )
    .bind(tenant_id)
    .bind(settings.max_failures_before_pause)
    .bind(settings.retry_interval_hours)
    .bind(settings.grace_period_days)
    .bind(settings.auto_resume_on_success)
    .bind(&settings.dunning_email_days)
    .fetch_one(pool)
    .await
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

pub async fn insert_event(
    pool: &PgPool,
    tenant_id: Uuid,
    pledge_id: Uuid,
    kind: &str,
    detail: serde_json::Value,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO pledge_events (tenant_id, pledge_id, kind, detail)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(tenant_id)
    .bind(pledge_id)
    .bind(kind)
    .bind(detail)
    .execute(pool)
    .await?;

    Ok(())
}

/// Records a dunning notice at most once per offset per failure episode;
/// the partial unique index absorbs re-runs. Returns whether a new notice
/// was recorded.
pub async fn insert_dunning_event(
    pool: &PgPool,
    tenant_id: Uuid,
    pledge_id: Uuid,
    offset_days: i32,
    episode: DateTime<Utc>,
) -> Result<bool> {
    let detail = serde_json::json!({
        "offset_days": offset_days.to_string(),
        "episode": episode.to_rfc3339(),
    });

    let result = sqlx::query(
        "INSERT INTO pledge_events (tenant_id, pledge_id, kind, detail)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT DO NOTHING",
    )
    .bind(tenant_id)
    .bind(pledge_id)
    .bind(event_kind::DUNNING_NOTICE)
    .bind(detail)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_pledge_events(
    pool: &PgPool,
    tenant_id: Uuid,
    pledge_id: Uuid,
) -> Result<Vec<crate::db::models::PledgeEvent>> {
    sqlx::query_as::<_, crate::db::models::PledgeEvent>(
        "SELECT * FROM pledge_events
         WHERE tenant_id = $1 AND pledge_id = $2
         ORDER BY created_at ASC",
    )
    .bind(tenant_id)
    .bind(pledge_id)
    .fetch_all(pool)
    .await
}
