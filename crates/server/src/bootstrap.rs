use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tracing::info;

use jansetu_core::config::{AppConfig, ConfigError, LoadOptions};
use jansetu_db::repositories::{
    DocumentStore, IdentityStore, PaymentLedger, ServiceCatalog, SqlCatalogRepository,
    SqlDocumentStore, SqlIdentityStore, SqlPaymentLedger,
};
use jansetu_db::{connect_with_settings, migrations, DbPool, LifecycleEngine, ReportingRepository};

use crate::{admin, citizen, health};

/// Everything the handlers need, built once at startup and cloned per
/// request.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LifecycleEngine>,
    pub catalog: Arc<dyn ServiceCatalog>,
    pub identity: Arc<dyn IdentityStore>,
    pub payments: Arc<dyn PaymentLedger>,
    pub documents: Arc<dyn DocumentStore>,
    pub reporting: Arc<ReportingRepository>,
}

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub fn build_state(pool: DbPool, config: &AppConfig) -> AppState {
    let catalog = Arc::new(SqlCatalogRepository::new(pool.clone()));
    let identity = Arc::new(SqlIdentityStore::new(pool.clone(), config.auth.session_ttl_hours));
    let payments = Arc::new(SqlPaymentLedger::new(pool.clone()));
    let documents = Arc::new(SqlDocumentStore::new(pool.clone()));

    let engine = Arc::new(LifecycleEngine::new(
        pool.clone(),
        catalog.clone(),
        identity.clone(),
        payments.clone(),
        documents.clone(),
        config.auth.superadmin_code.clone(),
    ));

    AppState {
        engine,
        catalog,
        identity,
        payments,
        documents,
        reporting: Arc::new(ReportingRepository::new(pool)),
    }
}

pub fn app_router(state: AppState, db_pool: DbPool) -> Router {
    Router::new()
        .merge(health::router(db_pool))
        .merge(citizen::router(state.clone()))
        .merge(admin::router(state))
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let state = build_state(db_pool.clone(), &config);
    Ok(Application { config, db_pool, state })
}

#[cfg(test)]
mod tests {
    use jansetu_core::config::{ConfigOverrides, LoadOptions};
    use jansetu_db::SeedDataset;

    use super::bootstrap;

    fn memory_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                superadmin_code: Some("setu-elevate-9".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_superadmin_code() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("must fail").to_string();
        assert!(message.contains("superadmin_code"));
    }

    #[tokio::test]
    async fn bootstrap_runs_migrations_and_accepts_seed_data() {
        let app = bootstrap(memory_options()).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type = 'table'
               AND name IN ('service_request', 'request_status_history', 'payment', 'service')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("baseline tables");
        assert_eq!(table_count, 4);

        SeedDataset::load(&app.db_pool).await.expect("seed");
        assert!(SeedDataset::verify(&app.db_pool).await.expect("verify"));

        app.db_pool.close().await;
    }
}
