use axum::extract::{Path, State};
use axum::Json;

use super::error::ApiError;
use super::AppState;
use crate::api::{
    HealthResponse, LoginRequest, LoginResponse, StartProcessingRequest, StartProcessingResponse,
    StatusResponse,
};
use crate::tasks::TaskId;

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Register a task and return its id without waiting for the pipeline.
pub(super) async fn start_processing(
    State(state): State<AppState>,
    Json(req): Json<StartProcessingRequest>,
) -> Result<Json<StartProcessingResponse>, ApiError> {
    if req.storage_key.trim().is_empty() {
        return Err(ApiError::bad_request("storageKey must not be empty"));
    }
    if req.folder.trim().is_empty() {
        return Err(ApiError::bad_request("folder must not be empty"));
    }
    log::info!("Processing request for {}", req.storage_key);

    let handle = state.tasks.start_task(&req.storage_key, &req.folder)?;
    Ok(Json(StartProcessingResponse {
        task_id: handle.detach(),
    }))
}

pub(super) async fn check_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = TaskId::from(task_id);
    match state.tasks.status(&id) {
        Ok(record) => {
            log::debug!("Status of {id}: {}", record.status);
            Ok(Json(record.into()))
        }
        Err(e) => {
            log::error!("Status lookup failed: {e}");
            Err(e.into())
        }
    }
}

pub(super) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    match state.auth.authenticate(&req.username, &req.password)? {
        Some(token) => Ok(Json(LoginResponse {
            token: token.as_str().to_string(),
        })),
        None => Err(ApiError::unauthorized("Invalid username or password")),
    }
}
