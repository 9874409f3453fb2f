//! Kiosk web server.

pub mod handlers;

use crate::board::Board;
use crate::error::BoardResult;
use axum::{
    routing::{get, post},
    Router,
};
use handlers::{
    dashboard_handler, health_handler, index_handler, scroll_handler, show_today_handler,
    show_tomorrow_handler, viewport_handler,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Build the router
pub fn router(board: Board) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/dashboard", get(dashboard_handler))
        .route("/api/viewport", post(viewport_handler))
        .route("/api/scroll", post(scroll_handler))
        .route("/api/view/tomorrow", post(show_tomorrow_handler))
        .route("/api/view/today", post(show_today_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(board)
}

/// Serve until `shutdown` is cancelled
pub async fn serve(bind: &str, board: Board, shutdown: CancellationToken) -> BoardResult<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(board))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Web server stopped");
    Ok(())
}
