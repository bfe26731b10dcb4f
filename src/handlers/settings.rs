use axum::{extract::State, response::IntoResponse, Json};

use crate::db::queries;
use crate::domain::PledgeSettings;
use crate::error::{AppError, Result};
use crate::schemas::PledgeSettingsBody;
use crate::tenant::TenantContext;
use crate::AppState;

/// Returns the tenant's pledge settings, or the defaults when nothing has
/// been saved yet.
#[utoipa::path(
    get,
    path = "/api/tenants/{tenant_id}/donations/pledges/settings",
    params(
        ("tenant_id" = String, Path, description = "Tenant ID")
    ),
    responses(
        (status = 200, description = "Current settings", body = PledgeSettingsBody),
        (status = 404, description = "Tenant not found")
    ),
    tag = "Settings"
)]
pub async fn get_settings(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse> {
    let settings = queries::get_settings(&state.db, tenant.tenant_id)
        .await?
        .unwrap_or_default();

    Ok(Json(PledgeSettingsBody::from(settings)))
}

/// Validates and upserts the tenant's settings. Out-of-range values are
/// rejected, never clamped.
pub async fn save_settings(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(body): Json<PledgeSettingsBody>,
) -> Result<impl IntoResponse> {
    let settings = PledgeSettings::from(body);
    settings
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let saved = queries::upsert_settings(&state.db, tenant.tenant_id, &settings).await?;

    Ok(Json(PledgeSettingsBody::from(saved)))
}
