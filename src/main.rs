//! Oracle report management service

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oracle_reports::{
    api::{self, AppState, RequestStats},
    config::Config,
    db::{
        self,
        repositories::{SqlxReportRepository, SqlxUserRepository},
    },
    services::{ReportService, ReportTasks, SqlxTokenValidator},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oracle_reports=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Oracle report service...");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    let report_repo = SqlxReportRepository::boxed(pool.clone());
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let tasks = Arc::new(ReportTasks::new());

    let state = AppState {
        pool: pool.clone(),
        report_service: Arc::new(ReportService::new(report_repo, tasks)),
        token_validator: Arc::new(SqlxTokenValidator::new(user_repo)),
        request_stats: Arc::new(RequestStats::new()),
    };

    let app = api::build_router(state, &config.server.cors_origin)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    pool.close().await;
    Ok(())
}
