// rest/mod.rs — HTTP surface for the task board.
//
// Axum server, JSON bodies throughout.
//
// Endpoints:
//   GET    /                 (static board page)
//   GET    /api/tasks
//   POST   /api/tasks
//   PUT    /api/tasks/{id}
//   DELETE /api/tasks/{id}
//   GET    /api/health

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{
    http::StatusCode,
    response::Html,
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn serve(ctx: AppContext) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("task board API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        // Front-end board page
        .route("/", get(index))
        // Health (liveness)
        .route("/api/health", get(routes::health::health))
        // Tasks
        .route(
            "/api/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/api/tasks/{id}",
            put(routes::tasks::update_task_status).delete(routes::tasks::delete_task),
        )
        .fallback(not_found)
        // The board page may be served from elsewhere during development.
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

/// Structured 404 for any undefined resource/path.
async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Recurso não encontrado" })),
    )
}
