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

//! HTTP error mapping.
//!
//! Queue errors map onto status codes; storage-level failures are logged
//! server-side and surfaced as a generic 500 so internal details never
//! reach callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use taskmill::TaskQueueError;
use tracing::error;

/// Error payload returned to API callers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// API-level error that knows its HTTP status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: message.into(),
                details: None,
            },
        }
    }
}

impl From<TaskQueueError> for ApiError {
    fn from(err: TaskQueueError) -> Self {
        let (status, error, details) = match &err {
            TaskQueueError::TypeNotFound(_) | TaskQueueError::TaskNotFound(_) => {
                (StatusCode::NOT_FOUND, err.to_string(), None)
            }
            TaskQueueError::TypeInactive(_) | TaskQueueError::InvalidState { .. } => {
                (StatusCode::CONFLICT, err.to_string(), None)
            }
            TaskQueueError::ValidationFailed(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "parameter validation failed".to_string(),
                Some(errors.clone()),
            ),
            TaskQueueError::Forbidden { .. } => (StatusCode::FORBIDDEN, err.to_string(), None),
            TaskQueueError::InvalidProgress(_) => {
                (StatusCode::BAD_REQUEST, err.to_string(), None)
            }
            TaskQueueError::ConnectionPool(_) | TaskQueueError::Database(_) => {
                error!(error = %err, "storage error while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_string(),
                    None,
                )
            }
        };

        Self {
            status,
            body: ErrorBody { error, details },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// 404 body used when a claim finds no candidate; a distinct shape from
/// [`ErrorBody`] because pollers treat it as a normal outcome.
pub fn no_available_task() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": "no available task"})),
    )
        .into_response()
}
