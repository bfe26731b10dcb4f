mod cli;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Json;
use clap::Parser;
use sqlx::migrate::Migrator;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

use cli::{Cli, Commands, DbCommands, PledgeCommands};
use parish_core::config::Config;
use parish_core::gateway::HttpChargeGateway;

/// OpenAPI schema for the Parish Core API
#[derive(OpenApi)]
#[openapi(
    paths(
        parish_core::handlers::settings::get_settings,
    ),
    components(
        schemas(
            parish_core::handlers::HealthResponse,
            parish_core::schemas::PledgeSettingsBody,
            parish_core::schemas::ProcessResponse,
        )
    ),
    info(
        title = "Parish Core API",
        version = "0.1.0",
        description = "Recurring pledge and fund management API",
        contact(name = "Parish Team")
    ),
    tags(
        (name = "Settings", description = "Pledge settings endpoints"),
    )
)]
pub struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_info = Config::from_env()?;
    let config = config_info.config.clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Cli::parse();

    if let Some(Commands::Config) = args.command {
        cli::handle_config(&config_info);
        return Ok(());
    }

    let pool = parish_core::db::create_pool(&config).await?;

    match args.command {
        Some(Commands::Db(DbCommands::Migrate)) => {
            return cli::handle_db_migrate(&pool).await;
        }
        Some(Commands::Pledges(PledgeCommands::Process { tenant_id })) => {
            return cli::handle_pledges_process(&pool, &config.gateway_url, tenant_id, false).await;
        }
        Some(Commands::Pledges(PledgeCommands::Retry { tenant_id })) => {
            return cli::handle_pledges_process(&pool, &config.gateway_url, tenant_id, true).await;
        }
        Some(Commands::Serve) | Some(Commands::Config) | None => {}
    }

    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let gateway = Arc::new(HttpChargeGateway::new(config.gateway_url.clone()));
    let app_state = parish_core::AppState::new(pool, gateway);
    app_state.load_tenant_configs().await?;

    let cors = match &config.cors_allowed_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            CorsLayer::new().allow_origin(origins)
        }
        None => CorsLayer::new().allow_origin(Any),
    };

    let app = parish_core::create_app(app_state)
        .route(
            "/api/docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_includes_settings_path() {
        let doc = ApiDoc::openapi();
        assert!(doc
            .paths
            .paths
            .contains_key("/api/tenants/{tenant_id}/donations/pledges/settings"));
    }
}
