//! Task API endpoints.
//!
//! Mounted under `/api/v1/internal/task`. Every handler runs the request
//! through a [`CrudController`] for the `TASK` securable before touching
//! the service.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

use super::auth::{Credential, Permission};
use super::crud::{deserialize_i64, CrudController, NoParams, Schema, Validated};
use super::error::ApiError;
use super::routes::{not_found, AppState};
use super::types::{ApiResponse, DeletedTask};
use crate::task::{rules, CreateTaskParams, Task, TaskStatus};

pub const SECURABLE: &str = "TASK";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task).fallback(not_found))
        .route(
            "/:id",
            get(get_task)
                .patch(update_task)
                .delete(delete_task)
                .fallback(not_found),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

impl Schema for CreateTaskParams {
    fn validate(&self) -> Result<(), ApiError> {
        rules::check_fields(self).map_err(ApiError::from)
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskIdParams {
    #[serde(deserialize_with = "deserialize_i64")]
    pub id: i64,
}

impl Schema for TaskIdParams {
    fn validate(&self) -> Result<(), ApiError> {
        check_id(self.id)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusParams {
    #[serde(deserialize_with = "deserialize_i64")]
    pub id: i64,
    pub status: TaskStatus,
}

impl Schema for UpdateStatusParams {
    fn validate(&self) -> Result<(), ApiError> {
        check_id(self.id)
    }
}

fn check_id(id: i64) -> Result<(), ApiError> {
    if id < 1 {
        return Err(ApiError::SchemaValidation {
            message: "id must be a positive integer".to_string(),
            path: Some("id".to_string()),
        });
    }
    Ok(())
}

fn controller(permission: Permission) -> CrudController {
    CrudController::for_securables(&[SECURABLE], permission)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<Credential>,
    body: Bytes,
) -> Result<Json<ApiResponse<Task>>, ApiError> {
    let Validated { credential, params } =
        controller(Permission::Create).create::<CreateTaskParams>(&credential, &body)?;

    let task = state
        .tasks
        .create_task(credential.account_id, credential.user_id, params)
        .await?;
    Ok(Json(ApiResponse::success(task)))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<Credential>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Vec<Task>>>, ApiError> {
    let Validated { credential, .. } =
        controller(Permission::Read).list::<NoParams>(&credential, &query)?;

    let tasks = state.tasks.list_tasks(credential.account_id).await?;
    Ok(Json(ApiResponse::success(tasks)))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<Credential>,
    Path(path): Path<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Task>>, ApiError> {
    let Validated { credential, params } =
        controller(Permission::Read).read::<TaskIdParams>(&credential, &path)?;

    let task = state
        .tasks
        .get_task(credential.account_id, params.id)
        .await?;
    Ok(Json(ApiResponse::success(task)))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<Credential>,
    Path(path): Path<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<ApiResponse<Task>>, ApiError> {
    let Validated { credential, params } = controller(Permission::Update)
        .update::<UpdateStatusParams>(&credential, &path, &body)?;

    let task = state
        .tasks
        .update_status(credential.account_id, params.id, params.status)
        .await?;
    Ok(Json(ApiResponse::success(task)))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<Credential>,
    Path(path): Path<HashMap<String, String>>,
) -> Result<Json<ApiResponse<DeletedTask>>, ApiError> {
    let Validated { credential, params } =
        controller(Permission::Delete).delete::<TaskIdParams>(&credential, &path)?;

    state
        .tasks
        .delete_task(credential.account_id, params.id)
        .await?;
    Ok(Json(ApiResponse::success(DeletedTask { id: params.id })))
}
