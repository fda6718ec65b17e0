pub mod config;
pub mod rest;
pub mod storage;

use std::sync::Arc;

use config::BoardConfig;
use storage::Storage;

/// Shared application state passed to every request handler.
///
/// Constructed once in `main` and injected via axum `State` — handlers never
/// reach for ambient globals.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<BoardConfig>,
    pub storage: Arc<Storage>,
    pub started_at: std::time::Instant,
}
