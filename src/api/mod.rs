//! Read-only HTTP aggregation layer over the store.

pub mod handlers;
pub mod queries;

use crate::error::Result;
use crate::storage::Store;
use axum::routing::get;
use axum::Router;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

pub use handlers::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<Store>>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/county-summary", get(handlers::county_summary))
        .route("/api/county-data/:county", get(handlers::county_data))
        .route("/api/historical/annual-trend", get(handlers::annual_trend))
        .route("/api/historical/annual-map", get(handlers::annual_map))
        .route("/api/historical/seasonal-trend", get(handlers::seasonal_trend))
        .route(
            "/api/historical/monthly-distribution",
            get(handlers::monthly_distribution),
        )
        .route(
            "/api/historical/unhealthy-days-count",
            get(handlers::unhealthy_days_count),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(store: Store, host: &str, port: u16) -> Result<()> {
    let app = router(AppState::new(store));
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("Aggregation API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
