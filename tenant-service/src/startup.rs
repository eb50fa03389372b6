use service_core::error::AppError;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::TenantConfig;
use crate::db;
use crate::services::{
    AgencyDirectory, CacheStore, Database, InMemoryAgencyDirectory, InMemoryCache,
    InMemoryMembershipDirectory, MembershipDirectory, RedisCache,
};
use crate::{build_router, AppState};

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: TenantConfig) -> Result<Self, AppError> {
        let state = build_state(config).await?;
        let app = build_router(state.clone());

        let addr = state.config.common.bind_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "Listening");

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

/// Connect the directory and cache named by `config`.
///
/// Without `DATABASE_URL` the service runs against empty in-memory
/// directories; without `REDIS_URL` it caches in process.
pub async fn build_state(config: TenantConfig) -> Result<AppState, AppError> {
    let (directory, members): (Arc<dyn AgencyDirectory>, Arc<dyn MembershipDirectory>) =
        match &config.database {
            Some(db_config) => {
                let pool = db::create_pool(db_config).await.map_err(|e| {
                    tracing::error!("Failed to connect to PostgreSQL: {}", e);
                    AppError::DatabaseError(anyhow::Error::new(e))
                })?;

                if config.run_migrations {
                    db::run_migrations(&pool).await.map_err(|e| {
                        tracing::error!("Failed to run migrations: {}", e);
                        AppError::DatabaseError(anyhow::Error::new(e))
                    })?;
                }

                let database = Arc::new(Database::new(pool));
                (
                    database.clone() as Arc<dyn AgencyDirectory>,
                    database as Arc<dyn MembershipDirectory>,
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set, serving from an empty in-memory directory");
                (
                    Arc::new(InMemoryAgencyDirectory::new()) as Arc<dyn AgencyDirectory>,
                    Arc::new(InMemoryMembershipDirectory::new()) as Arc<dyn MembershipDirectory>,
                )
            }
        };

    let cache: Arc<dyn CacheStore> = match &config.redis {
        Some(redis_config) => Arc::new(RedisCache::new(redis_config).await.map_err(|e| {
            tracing::error!("Failed to connect to Redis: {}", e);
            AppError::InternalError(e)
        })?),
        None => {
            tracing::info!("REDIS_URL not set, using in-process cache");
            Arc::new(InMemoryCache::new())
        }
    };

    Ok(AppState::new(config, directory, members, cache))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
