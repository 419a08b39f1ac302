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

//! Task Model
//!
//! A task is one unit of queued work: created `pending`, claimed by exactly
//! one worker at a time, progressed, and resolved to `completed` or `failed`
//! with bounded retry. The status string in the database always corresponds
//! to a [`TaskStatus`] variant.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle states of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Claimed,
    Completed,
    Failed,
}

impl TaskStatus {
    /// The canonical database representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Claimed => "claimed",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Parses a database status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "claimed" => Some(TaskStatus::Claimed),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a task record in the database.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::database::schema::tasks)]
pub struct Task {
    /// Unique identifier for the task
    pub id: i64,
    /// Reference to the owning task type
    pub task_type_id: i64,
    /// Current status ("pending", "claimed", "completed", "failed")
    pub status: String,
    /// Parameter payload (serialized JSON), validated at creation time
    pub params: String,
    /// Deterministic fingerprint of (type name, canonical params); unique
    pub dedupe_key: String,
    /// Caller-supplied priority; higher is more urgent
    pub priority: i32,
    /// Worker-reported progress, 0-100
    pub progress: i32,
    /// Number of times this task has been claimed
    pub attempts: i32,
    /// Retry budget stamped at creation time
    pub max_attempts: i32,
    /// Identity of the worker currently holding the claim
    pub claimed_by: Option<String>,
    /// Timestamp of the current claim
    pub claimed_at: Option<NaiveDateTime>,
    /// Result payload (serialized JSON), set only on success
    pub result: Option<String>,
    /// Most recent failure message
    pub error_message: Option<String>,
    /// Timestamp of terminal completion or failure
    pub completed_at: Option<NaiveDateTime>,
    /// Timestamp when the task was created
    pub created_at: NaiveDateTime,
    /// Timestamp when the task was last updated
    pub updated_at: NaiveDateTime,
}

impl Task {
    /// Parses the stored parameter payload back into a JSON value.
    pub fn params_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.params)
    }
}

/// Represents a new task to be inserted into the database.
#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::tasks)]
pub struct NewTask {
    /// Reference to the owning task type
    pub task_type_id: i64,
    /// Initial status (always "pending")
    pub status: String,
    /// Serialized JSON parameter payload
    pub params: String,
    /// Deterministic dedupe fingerprint
    pub dedupe_key: String,
    /// Caller-supplied priority
    pub priority: i32,
    /// Initial progress (always 0)
    pub progress: i32,
    /// Initial attempt count (always 0)
    pub attempts: i32,
    /// Retry budget
    pub max_attempts: i32,
    /// Creation timestamp
    pub created_at: NaiveDateTime,
    /// Last-update timestamp
    pub updated_at: NaiveDateTime,
}

/// Outcome of resolving a claimed task.
///
/// `resolve` is the single place where the retry policy lives; the DAL
/// applies whichever UPDATE matches the returned variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The worker reported success; the task is terminally completed.
    Completed,
    /// The worker reported failure with retry budget left; the task is
    /// recycled to pending and re-enters the claimable pool.
    RetryScheduled,
    /// The worker reported failure and the retry budget is exhausted.
    FailedTerminal,
}

/// Computes the state transition for a completion report.
///
/// `attempts` is the count already incremented by the claim that handed
/// the task to the reporting worker.
pub fn resolve(attempts: i32, max_attempts: i32, success: bool) -> Resolution {
    if success {
        Resolution::Completed
    } else if attempts < max_attempts {
        Resolution::RetryScheduled
    } else {
        Resolution::FailedTerminal
    }
}
