//! Application Startup
//!
//! Application building, shared state and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{middleware, Router};
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;

use crate::application::realtime::{Dispatcher, SubscriptionRegistry};
use crate::application::services::TokenIssuer;
use crate::config::{IdempotencyBackend, Settings};
use crate::infrastructure::cache::{self, IdempotencyStore};
use crate::infrastructure::database;
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{cors, logging};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Present when the Redis idempotency backend is configured
    pub redis: Option<ConnectionManager>,
    pub settings: Arc<Settings>,
    pub snowflake: Arc<SnowflakeGenerator>,
    pub tokens: Arc<TokenIssuer>,
    pub registry: Arc<SubscriptionRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub idempotency: Arc<dyn IdempotencyStore>,
    /// Cancelled once on shutdown; every delivery session holds a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the in-process components around already-connected stores.
    pub fn new(
        settings: Settings,
        db: PgPool,
        redis: Option<ConnectionManager>,
    ) -> Result<Self, AppError> {
        let idempotency = cache::create_idempotency_store(&settings.idempotency, redis.clone())?;
        let registry = Arc::new(SubscriptionRegistry::new(settings.realtime.queue_capacity));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));
        let snowflake = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id as u64,
            settings.snowflake.epoch,
        ));
        let tokens = Arc::new(TokenIssuer::new(&settings.jwt));

        Ok(Self {
            db,
            redis,
            settings: Arc::new(settings),
            snowflake,
            tokens,
            registry,
            dispatcher,
            idempotency,
            shutdown: CancellationToken::new(),
        })
    }

    /// Stop accepting subscriptions and end every live session.
    pub fn begin_shutdown(&self) {
        self.shutdown.cancel();
        self.registry.shutdown();
    }
}

/// Routes plus the HTTP layers every request passes through.
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);

    routes::create_router(state)
        .route_layer(middleware::from_fn(logging::track_metrics))
        .layer(CompressionLayer::new())
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
            tracing::info!("Database migrations applied");
        }

        // Redis only backs the idempotency gate
        let redis = match settings.idempotency.backend {
            IdempotencyBackend::Redis => Some(cache::create_redis_client(&settings.redis).await?),
            IdempotencyBackend::Memory => None,
        };

        handlers::health::init_server_start();

        let addr: SocketAddr = settings.server_addr().parse()?;
        let state = AppState::new(settings, db, redis)?;
        let router = build_router(state.clone());

        // Bind to address
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run_until_stopped(self) -> Result<()> {
        let state = self.state.clone();
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal(state))
            .await?;
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = state.shutdown.cancelled() => {},
    }

    tracing::info!("Shutdown signal received, closing subscriptions");
    state.begin_shutdown();
}
