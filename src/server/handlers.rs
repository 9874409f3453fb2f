use crate::board::{Board, DashboardView, ViewMode};
use crate::layout::ViewportGeometry;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Handler for the kiosk page
pub async fn index_handler() -> impl IntoResponse {
    Html(include_str!("../../assets/dashboard.html"))
}

/// Health check handler
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Everything the page renders
pub async fn dashboard_handler(State(board): State<Board>) -> Json<DashboardView> {
    Json(board.dashboard().await)
}

#[derive(Debug, Serialize)]
pub struct ScrollTargetResponse {
    pub scroll_target: Option<f64>,
}

/// Pane size reported by the page on load and resize
pub async fn viewport_handler(
    State(board): State<Board>,
    Json(geometry): Json<ViewportGeometry>,
) -> Result<Json<ScrollTargetResponse>, (StatusCode, String)> {
    let valid = geometry.container_height.is_finite()
        && geometry.content_height.is_finite()
        && geometry.pixels_per_minute.is_finite()
        && geometry.container_height > 0.0
        && geometry.content_height >= 0.0
        && geometry.pixels_per_minute > 0.0;
    if !valid {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Geometry must be positive and finite".to_string(),
        ));
    }

    debug!("Viewport geometry {:?}", geometry);
    let scroll_target = board.set_geometry(geometry).await;
    Ok(Json(ScrollTargetResponse { scroll_target }))
}

#[derive(Debug, Deserialize)]
pub struct ScrollRequest {
    pub offset: f64,
}

/// A person scrolled the schedule pane
pub async fn scroll_handler(
    State(board): State<Board>,
    Json(request): Json<ScrollRequest>,
) -> StatusCode {
    if !request.offset.is_finite() {
        return StatusCode::UNPROCESSABLE_ENTITY;
    }
    board.manual_scroll(request.offset.max(0.0)).await;
    StatusCode::NO_CONTENT
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub view: ViewMode,
}

pub async fn show_tomorrow_handler(State(board): State<Board>) -> Json<ViewResponse> {
    board.show_tomorrow().await;
    Json(ViewResponse {
        view: board.view_mode().await,
    })
}

pub async fn show_today_handler(State(board): State<Board>) -> Json<ViewResponse> {
    board.show_today().await;
    Json(ViewResponse {
        view: board.view_mode().await,
    })
}
