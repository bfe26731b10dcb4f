use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::schemas::{CreateFundRequest, FundListResponse, FundsQuery};
use crate::tenant::TenantContext;
use crate::AppState;

pub async fn list_funds(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(params): Query<FundsQuery>,
) -> Result<impl IntoResponse> {
    let funds = queries::list_funds(&state.db, tenant.tenant_id, params.include_archived).await?;
    let total = funds.len();

    Ok(Json(FundListResponse { funds, total }))
}

pub async fn create_fund(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(req): Json<CreateFundRequest>,
) -> Result<impl IntoResponse> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("fund name must not be empty".to_string()));
    }

    let fund = queries::insert_fund(
        &state.db,
        tenant.tenant_id,
        req.name.trim(),
        req.description.as_deref(),
        &req.fund_type,
        &req.visibility,
        &req.currency,
        req.goal_amount_cents,
        req.allow_anonymous,
    )
    .await?;

    Ok(Json(fund))
}

pub async fn archive_fund(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path((_tenant_id, fund_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let fund = queries::archive_fund(&state.db, tenant.tenant_id, fund_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Fund {} not found", fund_id)))?;

    Ok(Json(fund))
}
