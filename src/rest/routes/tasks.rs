// rest/routes/tasks.rs — Task CRUD routes.
//
// Extractors are Result-wrapped so malformed bodies and non-integer path ids
// land in ApiError instead of axum's plain-text default rejections.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::rest::error::ApiError;
use crate::storage::TaskRow;
use crate::AppContext;

/// Reject absent or blank required fields before touching storage.
fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::missing_field(field)),
    }
}

pub async fn list_tasks(State(ctx): State<AppContext>) -> Result<Json<Vec<TaskRow>>, ApiError> {
    Ok(Json(ctx.storage.list_tasks().await?))
}

/// Create payload. A caller-supplied `status` is deliberately absent here —
/// serde drops it on the floor and the store assigns the initial stage.
#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub responsavel: Option<String>,
    pub cliente: Option<String>,
    pub descricao: Option<String>,
    pub data_entrega: Option<String>,
}

pub async fn create_task(
    State(ctx): State<AppContext>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskRow>), ApiError> {
    let Json(body) = body?;
    let responsavel = required("responsavel", body.responsavel.as_deref())?;
    let cliente = required("cliente", body.cliente.as_deref())?;
    let descricao = required("descricao", body.descricao.as_deref())?;
    let data_entrega = required("data_entrega", body.data_entrega.as_deref())?;

    let task = ctx
        .storage
        .create_task(responsavel, cliente, descricao, data_entrega)
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

pub async fn update_task_status(
    State(ctx): State<AppContext>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<TaskRow>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    let status = required("status", body.status.as_deref())?;

    match ctx.storage.update_task_status(id, status).await? {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::task_not_found()),
    }
}

pub async fn delete_task(
    State(ctx): State<AppContext>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    if ctx.storage.delete_task(id).await? {
        Ok(Json(json!({ "message": "Tarefa deletada com sucesso" })))
    } else {
        Err(ApiError::task_not_found())
    }
}
