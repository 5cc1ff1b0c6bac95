use library_lending::{
    adapters::auth::{Argon2Hasher, JwtTokenIssuer},
    adapters::memory::InMemoryStore,
    adapters::postgres::{
        PostgresCatalogStore, PostgresLendingStore, PostgresLoanLedger, PostgresUserRepository,
    },
    api::{handlers::AppState, router::create_router},
    application::{ServiceDependencies, account, loan},
    config::{AppConfig, ConfigError, StorageBackend},
    ports::{CredentialHasher, TokenIssuer},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_lending=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2Hasher::new());
    let tokens: Arc<dyn TokenIssuer> = Arc::new(JwtTokenIssuer::new(
        config.jwt_secret.as_bytes(),
        chrono::Duration::from_std(config.access_token_ttl)?,
        chrono::Duration::from_std(config.refresh_token_ttl)?,
    ));

    let service_deps = match config.storage {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or(ConfigError::Missing {
                    name: "DATABASE_URL",
                })?;

            // Initialize database connection pool
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database migrations applied");

            ServiceDependencies {
                catalog: Arc::new(PostgresCatalogStore::new(pool.clone())),
                ledger: Arc::new(PostgresLoanLedger::new(pool.clone())),
                lending: Arc::new(PostgresLendingStore::new(pool.clone())),
                users: Arc::new(PostgresUserRepository::new(pool)),
                hasher,
                tokens,
            }
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on exit");
            let store = InMemoryStore::new();

            ServiceDependencies {
                catalog: Arc::new(store.clone()),
                ledger: Arc::new(store.clone()),
                lending: Arc::new(store.clone()),
                users: Arc::new(store),
                hasher,
                tokens,
            }
        }
    };

    if let Some(admin) = &config.admin {
        account::create_admin(&service_deps, &admin.email, &admin.password).await?;
    }

    let repaired = loan::reconcile_availability(&service_deps).await?;
    tracing::info!(repaired, "Startup availability reconciliation done");

    if let Some(interval) = config.reconcile_interval {
        let deps = service_deps.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; startup already reconciled.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = loan::reconcile_availability(&deps).await {
                    tracing::error!(error = ?e, "Availability reconciliation failed");
                }
            }
        });
    }

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}
