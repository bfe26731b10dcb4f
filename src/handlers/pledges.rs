use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::db::models::event_kind;
use crate::db::queries::{self, StatusFilter};
use crate::domain::{Pledge, PledgeStatus};
use crate::error::{AppError, Result};
use crate::schemas::{
    CreatePledgeRequest, PledgeListResponse, PledgeResponse, PledgesQuery, UpdatePledgeRequest,
};
use crate::tenant::TenantContext;
use crate::AppState;

fn parse_status_filter(raw: &str) -> Result<StatusFilter> {
    match raw {
        "active" => Ok(StatusFilter::Status(PledgeStatus::Active)),
        "paused" => Ok(StatusFilter::Status(PledgeStatus::Paused)),
        "cancelled" => Ok(StatusFilter::Status(PledgeStatus::Cancelled)),
        "completed" => Ok(StatusFilter::Status(PledgeStatus::Completed)),
        "failed" => Ok(StatusFilter::Failed),
        other => Err(AppError::BadRequest(format!(
            "unknown status filter '{other}'"
        ))),
    }
}

pub async fn list_pledges(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(params): Query<PledgesQuery>,
) -> Result<impl IntoResponse> {
    let status = params
        .status
        .as_deref()
        .map(parse_status_filter)
        .transpose()?;

    // The "failed" filter needs the tenant's grace period.
    let settings = queries::get_settings(&state.db, tenant.tenant_id)
        .await?
        .unwrap_or_default();

    let pledges = queries::list_pledges(
        &state.db,
        tenant.tenant_id,
        status,
        params.fund_id,
        settings.grace_period_days,
    )
    .await?;

    let total = pledges.len();
    Ok(Json(PledgeListResponse { pledges, total }))
}

pub async fn create_pledge(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(req): Json<CreatePledgeRequest>,
) -> Result<impl IntoResponse> {
    if req.amount_cents <= 0 {
        return Err(AppError::Validation(
            "amountCents must be positive".to_string(),
        ));
    }

    let fund = queries::get_fund(&state.db, tenant.tenant_id, req.fund_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Fund {} not found", req.fund_id)))?;

    if fund.is_archived {
        return Err(AppError::Validation(
            "cannot pledge to an archived fund".to_string(),
        ));
    }

    let pledge = Pledge::new(
        tenant.tenant_id,
        req.donor_user_id,
        req.fund_id,
        req.amount_cents,
        req.currency,
        req.frequency,
        req.next_charge_at.unwrap_or_else(Utc::now),
    );
    let pledge = queries::insert_pledge(&state.db, &pledge).await?;

    Ok(Json(PledgeResponse { pledge }))
}

/// Admin override: forces a status or a `next_charge_at`, bypassing the
/// processor's transition rules. Every override lands in the audit trail.
pub async fn update_pledge(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path((_tenant_id, pledge_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdatePledgeRequest>,
) -> Result<impl IntoResponse> {
    let existing = queries::get_pledge(&state.db, tenant.tenant_id, pledge_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pledge {} not found", pledge_id)))?;

    let override_req = req.admin_override;
    let updated = match (override_req.status, override_req.next_charge_at) {
        (Some(status), None) => {
            if existing.status.is_terminal() && status != existing.status {
                return Err(AppError::Validation(format!(
                    "pledge is {} and cannot change status",
                    existing.status.as_str()
                )));
            }
            let updated =
                queries::override_pledge_status(&state.db, tenant.tenant_id, pledge_id, status)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Pledge {} not found", pledge_id)))?;
            queries::insert_event(
                &state.db,
                tenant.tenant_id,
                pledge_id,
                event_kind::ADMIN_OVERRIDE,
                json!({
                    "field": "status",
                    "from": existing.status.as_str(),
                    "to": status.as_str(),
                }),
            )
            .await?;
            updated
        }
        (None, Some(next_charge_at)) => {
            if existing.status.is_terminal() {
                return Err(AppError::Validation(format!(
                    "pledge is {} and cannot be rescheduled",
                    existing.status.as_str()
                )));
            }
            let updated = queries::override_pledge_next_charge_at(
                &state.db,
                tenant.tenant_id,
                pledge_id,
                next_charge_at,
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pledge {} not found", pledge_id)))?;
            queries::insert_event(
                &state.db,
                tenant.tenant_id,
                pledge_id,
                event_kind::ADMIN_OVERRIDE,
                json!({
                    "field": "next_charge_at",
                    "from": existing.next_charge_at,
                    "to": next_charge_at,
                }),
            )
            .await?;
            updated
        }
        _ => {
            return Err(AppError::BadRequest(
                "adminOverride must set exactly one of status or nextChargeAt".to_string(),
            ));
        }
    };

    Ok(Json(PledgeResponse { pledge: updated }))
}
