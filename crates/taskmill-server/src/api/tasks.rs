/*
 *  Copyright 2025-2026 Taskmill Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Task lifecycle endpoints: create, claim, progress, complete, inspect.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use taskmill::dal::TaskFilter;
use taskmill::{ClaimRequest, Resolution, SortField, SortOrder, Task};

use super::error::{no_available_task, ApiError};
use super::AppState;

/// Request body for POST /tasks.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    /// Task type name, e.g. "Demo.Echo".
    #[serde(rename = "type")]
    pub type_name: String,
    pub params: serde_json::Value,
    #[serde(default)]
    pub priority: Option<i32>,
}

/// Response body for POST /tasks.
#[derive(Debug, Serialize)]
pub struct CreateTaskResponse {
    pub id: i64,
    pub status: String,
    pub priority: i32,
    pub dedupe_key: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deduplicated: bool,
}

/// POST /tasks
///
/// Creates a task, idempotently: a duplicate submission returns the
/// canonical existing task with `deduplicated: true` and a 200 instead of
/// a 201.
pub async fn create_task(
    State(state): State<AppState>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<Response, ApiError> {
    let created = state
        .queue
        .create_task(&request.type_name, &request.params, request.priority)
        .await?;

    let status = if created.deduplicated {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let body = CreateTaskResponse {
        id: created.task.id,
        status: created.task.status,
        priority: created.task.priority,
        dedupe_key: created.task.dedupe_key,
        deduplicated: created.deduplicated,
    };
    Ok((status, Json(body)).into_response())
}

/// Request body for POST /tasks/claim.
#[derive(Debug, Deserialize)]
pub struct ClaimTaskRequest {
    pub worker_id: String,
    pub task_type_id: i64,
    #[serde(default)]
    pub type_pattern: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

/// Response body for POST /tasks/claim.
#[derive(Debug, Serialize)]
pub struct ClaimTaskResponse {
    pub id: i64,
    /// Task type name.
    #[serde(rename = "type")]
    pub type_name: String,
    pub params: serde_json::Value,
    pub attempts: i32,
    pub priority: i32,
}

/// POST /tasks/claim
///
/// Atomically claims the best available task for the calling worker.
/// Returns 404 with `{"message": "no available task"}` when the candidate
/// pool is empty; pollers treat that as a normal outcome.
pub async fn claim_task(
    State(state): State<AppState>,
    Json(request): Json<ClaimTaskRequest>,
) -> Result<Response, ApiError> {
    if request.worker_id.trim().is_empty() {
        return Err(ApiError::bad_request("worker_id must not be empty"));
    }
    if request.task_type_id <= 0 {
        return Err(ApiError::bad_request(
            "task_type_id must be a positive integer",
        ));
    }

    // Sort parameters come from an allow-list; anything else is a 400 and
    // never reaches the database.
    let sort = match &request.sort_by {
        None => SortField::default(),
        Some(s) => SortField::parse(s)
            .ok_or_else(|| ApiError::bad_request(format!("invalid sort_by '{}'", s)))?,
    };
    let order = match &request.sort_order {
        None => SortOrder::default(),
        Some(s) => SortOrder::parse(s)
            .ok_or_else(|| ApiError::bad_request(format!("invalid sort_order '{}'", s)))?,
    };

    let claim = ClaimRequest {
        worker_id: request.worker_id,
        task_type_id: request.task_type_id,
        type_pattern: request.type_pattern,
        sort,
        order,
    };

    match state.queue.claim_task(&claim).await? {
        None => Ok(no_available_task()),
        Some(claimed) => {
            let params = claimed
                .task
                .params_json()
                .unwrap_or(serde_json::Value::Null);
            let body = ClaimTaskResponse {
                id: claimed.task.id,
                type_name: claimed.type_name,
                params,
                attempts: claimed.task.attempts,
                priority: claimed.task.priority,
            };
            Ok(Json(body).into_response())
        }
    }
}

/// Request body for POST /tasks/{id}/progress.
#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub worker_id: String,
    pub progress: i32,
    #[serde(default)]
    pub message: Option<String>,
}

/// POST /tasks/{id}/progress
pub async fn update_progress(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ProgressRequest>,
) -> Result<Response, ApiError> {
    let task = state
        .queue
        .update_progress(id, &request.worker_id, request.progress, request.message)
        .await?;
    Ok(Json(json!({"id": task.id, "progress": task.progress})).into_response())
}

/// Request body for POST /tasks/{id}/complete.
#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub worker_id: String,
    pub success: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response body for POST /tasks/{id}/complete.
#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub id: i64,
    pub status: String,
    /// True when the failure was recycled for another attempt, so the
    /// reported status is "pending" rather than terminal.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retry_scheduled: bool,
}

/// POST /tasks/{id}/complete
pub async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<CompleteRequest>,
) -> Result<Response, ApiError> {
    let (task, resolution) = state
        .queue
        .complete_task(
            id,
            &request.worker_id,
            request.success,
            request.result.as_ref(),
            request.error,
        )
        .await?;

    let body = CompleteResponse {
        id: task.id,
        status: task.status,
        retry_scheduled: resolution == Resolution::RetryScheduled,
    };
    Ok(Json(body).into_response())
}

/// Full task record returned by GET endpoints.
#[derive(Debug, Serialize)]
pub struct TaskRecord {
    pub id: i64,
    pub task_type_id: i64,
    pub status: String,
    pub params: serde_json::Value,
    pub dedupe_key: String,
    pub priority: i32,
    pub progress: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<String>,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        let params = task.params_json().unwrap_or(serde_json::Value::Null);
        let result = task
            .result
            .as_deref()
            .and_then(|r| serde_json::from_str(r).ok());
        Self {
            id: task.id,
            task_type_id: task.task_type_id,
            status: task.status,
            params,
            dedupe_key: task.dedupe_key,
            priority: task.priority,
            progress: task.progress,
            attempts: task.attempts,
            max_attempts: task.max_attempts,
            claimed_by: task.claimed_by,
            claimed_at: task.claimed_at.map(|t| t.to_string()),
            result,
            error_message: task.error_message,
            completed_at: task.completed_at.map(|t| t.to_string()),
            created_at: task.created_at.to_string(),
            updated_at: task.updated_at.to_string(),
        }
    }
}

/// GET /tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let task = state.queue.get_task(id).await?;
    Ok(Json(TaskRecord::from(task)).into_response())
}

/// GET /tasks/{id}/history
pub async fn get_task_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    // 404 for unknown tasks rather than an empty list.
    state.queue.get_task(id).await?;
    let history = state.queue.task_history(id).await?;

    let entries: Vec<serde_json::Value> = history
        .into_iter()
        .map(|h| {
            json!({
                "status_change": h.status_change,
                "worker_id": h.worker_id,
                "message": h.message,
                "timestamp": h.created_at.to_string(),
            })
        })
        .collect();
    Ok(Json(json!({"task_id": id, "history": entries})).into_response())
}

/// Query parameters for GET /tasks.
#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    #[serde(default)]
    pub status: Option<String>,
    /// Task type name.
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

/// GET /tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Response, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::bad_request("offset must not be negative"));
    }

    let page = state
        .queue
        .list_tasks(TaskFilter {
            status: query.status,
            type_name: query.type_name,
            limit,
            offset,
        })
        .await?;

    let tasks: Vec<TaskRecord> = page.tasks.into_iter().map(TaskRecord::from).collect();
    Ok(Json(json!({
        "tasks": tasks,
        "total": page.total,
        "limit": limit,
        "offset": offset,
    }))
    .into_response())
}
