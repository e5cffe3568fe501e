pub mod api;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::{ForecastService, HistoryService, Refresher};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub refresher: Arc<Refresher>,
    pub history: HistoryService,
    pub forecast: ForecastService,
}

/// Start the axum server
pub async fn serve(
    refresher: Arc<Refresher>,
    history: HistoryService,
    forecast: ForecastService,
    port: u16,
) -> crate::error::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting gpwatch server");

    let app_state = AppState {
        refresher,
        history,
        forecast,
    };

    // The dashboard is served from arbitrary origins, keep CORS open
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    tracing::info!("Registering routes:");
    tracing::info!("  GET /stocks");
    tracing::info!("  GET /stock/{{ticker}}/history?period=1y");
    tracing::info!("  GET /stock/{{ticker}}/predict");
    tracing::info!("  GET /update");

    let app = Router::new()
        .route("/stocks", get(api::get_stocks_handler))
        .route("/stock/{ticker}/history", get(api::get_history_handler))
        .route("/stock/{ticker}/predict", get(api::get_predict_handler))
        .route("/update", get(api::update_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
