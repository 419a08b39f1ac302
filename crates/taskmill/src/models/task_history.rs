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

//! Task History Model
//!
//! Append-only audit rows recording task state transitions. History is
//! purely observational: the core never reads it back to make decisions,
//! and it is never mutated or deleted.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// A recorded state transition for a task.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::database::schema::task_history)]
pub struct TaskHistory {
    /// Unique identifier for the history row
    pub id: i64,
    /// The task this transition belongs to
    pub task_id: i64,
    /// Free-form transition label (e.g. "created", "claimed", "retry_scheduled")
    pub status_change: String,
    /// Worker involved in the transition, if any
    pub worker_id: Option<String>,
    /// Optional free-form message
    pub message: Option<String>,
    /// Timestamp of the transition
    pub created_at: NaiveDateTime,
}

/// A new history row to be appended.
#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::task_history)]
pub struct NewTaskHistory {
    /// The task this transition belongs to
    pub task_id: i64,
    /// Free-form transition label
    pub status_change: String,
    /// Worker involved in the transition, if any
    pub worker_id: Option<String>,
    /// Optional free-form message
    pub message: Option<String>,
    /// Timestamp of the transition
    pub created_at: NaiveDateTime,
}
