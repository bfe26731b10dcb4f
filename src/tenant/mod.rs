//! Tenant resolution for the `/api/tenants/{tenant_id}/...` surface.
//!
//! Every handler takes a `TenantContext`; the extractor resolves the path
//! segment, checks the tenant exists and is active, and caches configs so
//! steady-state requests skip the lookup query.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
    RequestPartsExt,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TenantConfig {
    pub tenant_id: Uuid,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub config: TenantConfig,
}

#[async_trait]
impl FromRequestParts<AppState> for TenantContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let tenant_id = resolve_tenant_id(parts).await?;

        let config = match state.get_tenant_config(tenant_id).await {
            Some(config) => config,
            None => {
                let config = fetch_tenant_config(&state.db, tenant_id)
                    .await?
                    .ok_or(AppError::TenantNotFound)?;
                state.cache_tenant_config(config.clone()).await;
                config
            }
        };

        if !config.is_active {
            return Err(AppError::TenantInactive);
        }

        Ok(TenantContext { tenant_id, config })
    }
}

async fn resolve_tenant_id(parts: &mut Parts) -> Result<Uuid> {
    let Path(params) = parts
        .extract::<Path<HashMap<String, String>>>()
        .await
        .map_err(|_| AppError::TenantNotFound)?;

    params
        .get("tenant_id")
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| AppError::BadRequest("invalid tenant id".to_string()))
}

async fn fetch_tenant_config(
    pool: &sqlx::PgPool,
    tenant_id: Uuid,
) -> Result<Option<TenantConfig>> {
    let config = sqlx::query_as::<_, TenantConfig>(
        "SELECT tenant_id, name, is_active FROM tenants WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;

    Ok(config)
}
