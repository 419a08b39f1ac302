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

//! Task type registration endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::AppState;

/// Request body for POST /task-types.
#[derive(Debug, Deserialize)]
pub struct RegisterTypeRequest {
    pub name: String,
    pub version: String,
    pub param_schema: serde_json::Value,
}

/// Response body for POST /task-types.
#[derive(Debug, Serialize)]
pub struct RegisterTypeResponse {
    pub id: i64,
    pub name: String,
    pub version: String,
    /// True when a new type was created, false when an existing one was
    /// updated in place.
    pub created: bool,
}

/// POST /task-types
///
/// Upserts a task type. Returns 201 for a new type, 200 for an update.
pub async fn register_type(
    State(state): State<AppState>,
    Json(request): Json<RegisterTypeRequest>,
) -> Result<Response, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }

    let (task_type, created) = state
        .queue
        .register_type(&request.name, &request.version, &request.param_schema)
        .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let body = RegisterTypeResponse {
        id: task_type.id,
        name: task_type.name,
        version: task_type.version,
        created,
    };
    Ok((status, Json(body)).into_response())
}
