//! Axum HTTP surface for project budgets.

pub mod handlers;
pub mod response;

use crate::convert::{CurrencyConverter, TtdAllowlist};
use crate::core::config::{AppConfig, ServerConfig};
use crate::core::currency::RateSource;
use crate::providers::ExchangeRateApiProvider;
use crate::store::{ProjectStore, open_store};
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProjectStore>,
    pub converter: CurrencyConverter,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        rate_source: Arc<dyn RateSource>,
        allowlist: TtdAllowlist,
    ) -> Self {
        AppState {
            store,
            converter: CurrencyConverter::new(rate_source, allowlist),
        }
    }

    /// Wires the configured store, the exchange rate provider and the TTD
    /// allowlist.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        if config.currency.api_key.is_none() {
            tracing::warn!(
                "CURRENCY_API_KEY is not set, TTD conversions will use the fallback rate"
            );
        }
        let rate_source = Arc::new(ExchangeRateApiProvider::new(
            &config.currency.base_url,
            config.currency.api_key.clone(),
        ));
        let allowlist: TtdAllowlist = config.ttd_projects.iter().cloned().collect();
        Ok(Self::new(open_store(config)?, rate_source, allowlist))
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ok", get(handlers::ok))
        .route("/project/budget/ttd", get(handlers::ttd_budgets))
        .route("/project/budget/currency", post(handlers::budget_currency))
        .route("/project/budget", post(handlers::create_project))
        .route(
            "/project/budget/{id}",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes())
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the listener and serves until Ctrl-C.
pub async fn serve(server: &ServerConfig, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
