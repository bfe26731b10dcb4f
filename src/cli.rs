use clap::{Parser, Subcommand};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use parish_core::db::queries;
use parish_core::gateway::HttpChargeGateway;
use parish_core::services::PledgeProcessor;

#[derive(Parser)]
#[command(name = "parish-core")]
#[command(about = "Parish Core - Recurring Pledge Processor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Pledge management commands
    #[command(subcommand)]
    Pledges(PledgeCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum PledgeCommands {
    /// Process all due pledges for a tenant
    Process {
        /// Tenant UUID
        #[arg(value_name = "TENANT_ID")]
        tenant_id: Uuid,
    },

    /// Retry failed/paused pledges for a tenant
    Retry {
        /// Tenant UUID
        #[arg(value_name = "TENANT_ID")]
        tenant_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_pledges_process(
    pool: &PgPool,
    gateway_url: &str,
    tenant_id: Uuid,
    retry: bool,
) -> anyhow::Result<()> {
    let settings = queries::get_settings(pool, tenant_id)
        .await?
        .unwrap_or_default();

    let gateway = Arc::new(HttpChargeGateway::new(gateway_url.to_string()));
    let processor = PledgeProcessor::new(pool.clone(), gateway);

    let report = if retry {
        processor.retry_failed(tenant_id, &settings).await?
    } else {
        processor.process_due(tenant_id, &settings).await?
    };

    println!("{}", report.message);
    if report.skipped > 0 {
        println!("{} pledge(s) skipped (claimed elsewhere)", report.skipped);
    }

    Ok(())
}

pub async fn handle_db_migrate(pool: &PgPool) -> anyhow::Result<()> {
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new("./migrations")).await?;
    migrator.run(pool).await?;
    println!("Migrations applied");
    Ok(())
}

pub fn handle_config(info: &parish_core::config::ConfigInfo) {
    println!("profile: {}", info.profile.as_str());
    println!("server_port: {}", info.config.server_port);
    println!("gateway_url: {}", info.config.gateway_url);
    if info.overrides.is_empty() {
        println!("overrides: (none)");
    } else {
        println!("overrides: {}", info.overrides.join(", "));
    }
}
