//! Application startup and lifecycle management.

use crate::config::BillingConfig;
use crate::handlers::{self, bills, properties, readings};
use crate::services::{init_metrics, BillGenerator, BillingStore, Database, InMemoryStore};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: BillingConfig,
    pub store: Arc<dyn BillingStore>,
    pub generator: BillGenerator,
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application, connecting to PostgreSQL when configured.
    pub async fn build(config: BillingConfig) -> Result<Self, AppError> {
        init_metrics();

        let store: Arc<dyn BillingStore> = match &config.database {
            Some(db_config) => {
                let db = Database::new(
                    &db_config.url,
                    db_config.max_connections,
                    db_config.min_connections,
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    e
                })?;

                db.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;

                Arc::new(db)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory store");
                Arc::new(InMemoryStore::new())
            }
        };

        Self::with_store(config, store).await
    }

    /// Build the application on an existing store.
    pub async fn with_store(
        config: BillingConfig,
        store: Arc<dyn BillingStore>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let addr = config.common.bind_address();
        let http_listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Utility billing listener bound");

        let state = AppState {
            config,
            generator: BillGenerator::new(store.clone()),
            store,
        };

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn store(&self) -> Arc<dyn BillingStore> {
        self.state.store.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = router(self.state);

        tracing::info!(
            service = "utility-billing-service",
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        axum::serve(self.http_listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/properties",
            post(properties::create_property).get(properties::list_properties),
        )
        .route(
            "/properties/:property_id",
            get(properties::get_property).put(properties::update_property),
        )
        .route("/units", get(properties::list_units))
        .route("/units/:unit_id/occupancy", put(properties::update_occupancy))
        .route("/units/:unit_id/meter-readings", get(readings::list_readings))
        .route("/meter-readings", post(readings::record_reading))
        .route("/bills", get(bills::list_bills))
        .route("/bills/generate", post(bills::generate_bills))
        .route("/bills/:bill_id/pay", post(bills::pay_bill));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
