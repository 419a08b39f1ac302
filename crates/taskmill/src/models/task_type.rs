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

//! Task Type Model
//!
//! A task type names a kind of work (`"Namespace.Action"`), carries the
//! JSON-Schema-like document that parameter payloads are validated against,
//! and gates creation through its `is_active` flag. Types are never
//! deleted, only deactivated.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Represents a registered task type in the database.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::database::schema::task_types)]
pub struct TaskType {
    /// Unique identifier for the task type
    pub id: i64,
    /// Unique human-readable name, e.g. "Demo.Echo"
    pub name: String,
    /// Informational version string
    pub version: String,
    /// JSON-Schema-like document (serialized JSON) describing valid parameter payloads
    pub param_schema: String,
    /// Whether new tasks of this type may be created
    pub is_active: bool,
    /// Timestamp when the type was first registered
    pub created_at: NaiveDateTime,
    /// Timestamp of the most recent registration or deactivation
    pub updated_at: NaiveDateTime,
}

impl TaskType {
    /// Parses the stored parameter schema back into a JSON value.
    pub fn schema(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.param_schema)
    }
}

/// Represents a new task type to be inserted into the database.
#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::task_types)]
pub struct NewTaskType {
    /// Unique human-readable name
    pub name: String,
    /// Informational version string
    pub version: String,
    /// Serialized JSON parameter schema
    pub param_schema: String,
    /// Whether the type accepts new tasks
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: NaiveDateTime,
    /// Last-update timestamp
    pub updated_at: NaiveDateTime,
}
