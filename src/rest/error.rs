// rest/error.rs — Client-facing error taxonomy.
//
// Three buckets: bad input (400), unknown task id (404), everything the
// storage layer throws (500). Every failure body is `{"error": message}`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or empty required field, caught before storage is touched.
    #[error("{0}")]
    Validation(String),
    /// Referenced task id does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Storage fault or any other unhandled failure. Carries the raw
    /// underlying error text.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn missing_field(name: &str) -> Self {
        Self::Validation(format!("campo obrigatório ausente ou vazio: {name}"))
    }

    pub fn task_not_found() -> Self {
        Self::NotFound("Tarefa não encontrada".to_string())
    }
}

// Axum's default extractor rejections answer with text/plain bodies. Route
// them through the taxonomy so a malformed JSON body or a non-integer path
// id still produces the `{"error": ...}` shape.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        let cases = [
            (ApiError::missing_field("status"), StatusCode::BAD_REQUEST),
            (ApiError::task_not_found(), StatusCode::NOT_FOUND),
            (
                ApiError::Internal(anyhow::anyhow!("disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
