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

//! Error types for task queue operations.
//!
//! An empty claim result is not an error: `claim` returns `Ok(None)`.
//! Storage-level details are stringified here and surfaced generically by
//! API layers.

use thiserror::Error;

/// Errors returned by queue operations.
#[derive(Debug, Error)]
pub enum TaskQueueError {
    /// No task type registered under the given name.
    #[error("task type '{0}' not found")]
    TypeNotFound(String),

    /// The task type exists but has been deactivated.
    #[error("task type '{0}' is inactive")]
    TypeInactive(String),

    /// No task with the given id.
    #[error("task {0} not found")]
    TaskNotFound(i64),

    /// The parameter payload violated the type's schema. Carries one
    /// message per violation, each with a field path.
    #[error("parameter validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// The task is claimed by a different worker.
    #[error("task {task_id} is claimed by a different worker")]
    Forbidden { task_id: i64 },

    /// The task is not in the status the operation requires.
    #[error("task {task_id} is in status '{status}', not claimable for this operation")]
    InvalidState { task_id: i64, status: String },

    /// Progress values must lie in [0, 100].
    #[error("progress {0} is out of range (expected 0-100)")]
    InvalidProgress(i32),

    /// Failed to obtain a connection from the pool.
    #[error("connection pool error: {0}")]
    ConnectionPool(String),

    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl TaskQueueError {
    /// True when the error stems from the storage layer rather than the
    /// request itself; API layers surface these generically.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            TaskQueueError::ConnectionPool(_) | TaskQueueError::Database(_)
        )
    }
}
