pub mod funds;
pub mod pledges;
pub mod process;
pub mod settings;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub uptime_secs: u64,
}

/// Liveness/readiness probe: reports degraded (503) when the database is
/// unreachable.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
    {
        Ok(_) => "up",
        Err(e) => {
            tracing::warn!("health check database ping failed: {}", e);
            "down"
        }
    };

    let response = HealthResponse {
        status: if database == "up" { "healthy" } else { "unhealthy" }.to_string(),
        database: database.to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    };

    let code = if database == "up" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(response))
}
