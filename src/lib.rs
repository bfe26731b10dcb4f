pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod schemas;
pub mod services;
pub mod tenant;

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::gateway::ChargeGateway;
use crate::tenant::TenantConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub gateway: Arc<dyn ChargeGateway>,
    pub tenant_configs: Arc<tokio::sync::RwLock<HashMap<Uuid, TenantConfig>>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(db: PgPool, gateway: Arc<dyn ChargeGateway>) -> Self {
        Self {
            db,
            gateway,
            tenant_configs: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            start_time: Instant::now(),
        }
    }

    /// Warms the tenant cache at startup; misses fall back to the database
    /// in the extractor.
    pub async fn load_tenant_configs(&self) -> crate::error::Result<()> {
        let configs = db::queries::get_all_tenant_configs(&self.db).await?;
        let mut map = self.tenant_configs.write().await;
        map.clear();
        for config in configs {
            map.insert(config.tenant_id, config);
        }
        Ok(())
    }

    pub async fn get_tenant_config(&self, tenant_id: Uuid) -> Option<TenantConfig> {
        self.tenant_configs.read().await.get(&tenant_id).cloned()
    }

    pub async fn cache_tenant_config(&self, config: TenantConfig) {
        self.tenant_configs
            .write()
            .await
            .insert(config.tenant_id, config);
    }
}

pub fn create_app(app_state: AppState) -> Router {
    let donations = Router::new()
        .route(
            "/pledges",
            get(handlers::pledges::list_pledges).post(handlers::pledges::create_pledge),
        )
        .route(
            "/pledges/settings",
            get(handlers::settings::get_settings).put(handlers::settings::save_settings),
        )
        .route("/pledges/process", post(handlers::process::trigger))
        .route("/pledges/:pledge_id", put(handlers::pledges::update_pledge))
        .route(
            "/funds",
            get(handlers::funds::list_funds).post(handlers::funds::create_fund),
        )
        .route("/funds/:fund_id/archive", post(handlers::funds::archive_fund));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/tenants/:tenant_id/donations", donations)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
