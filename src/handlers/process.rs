use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::schemas::{ProcessQuery, ProcessResponse};
use crate::services::PledgeProcessor;
use crate::tenant::TenantContext;
use crate::AppState;

/// Manual processing trigger behind the admin UI's "Process Due Pledges"
/// and "Retry Failed Pledges" buttons. Runs the whole batch within this
/// request and reports the counts back.
pub async fn trigger(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(params): Query<ProcessQuery>,
) -> Result<impl IntoResponse> {
    let settings = queries::get_settings(&state.db, tenant.tenant_id)
        .await?
        .unwrap_or_default();

    let processor = PledgeProcessor::new(state.db.clone(), state.gateway.clone());

    let report = match params.action.as_str() {
        "process" => processor.process_due(tenant.tenant_id, &settings).await?,
        "retry" => processor.retry_failed(tenant.tenant_id, &settings).await?,
        other => {
            return Err(AppError::BadRequest(format!(
                "unknown action '{other}', expected 'process' or 'retry'"
            )));
        }
    };

    Ok(Json(ProcessResponse {
        message: report.message,
        processed: report.processed,
        succeeded: report.succeeded,
        failed: report.failed,
        skipped: report.skipped,
    }))
}
