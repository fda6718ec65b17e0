use crate::AppContext;
use axum::{extract::State, Json};
use serde_json::{json, Value};

pub async fn health(State(ctx): State<AppContext>) -> Json<Value> {
    let uptime = ctx.started_at.elapsed().as_secs();
    Json(json!({
        "status": "ok",
        "uptime_secs": uptime,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
