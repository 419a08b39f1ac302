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

//! Task history DAL with runtime backend selection.
//!
//! History rows are append-only. The queue layer calls `record` outside
//! the primary transaction and swallows failures, so nothing here may be
//! relied on for correctness.

use diesel::prelude::*;

use super::DAL;
use crate::database::schema::task_history;
use crate::database::BackendType;
use crate::error::TaskQueueError;
use crate::models::{NewTaskHistory, TaskHistory};

/// Data access layer for task history operations.
#[derive(Clone)]
pub struct TaskHistoryDAL<'a> {
    dal: &'a DAL,
}

impl<'a> TaskHistoryDAL<'a> {
    /// Creates a new TaskHistoryDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Appends a history row.
    pub async fn record(&self, entry: NewTaskHistory) -> Result<(), TaskQueueError> {
        match self.dal.backend() {
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                let conn = self
                    .dal
                    .database
                    .get_postgres_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                conn.interact(move |conn| {
                    diesel::insert_into(task_history::table)
                        .values(&entry)
                        .execute(conn)
                })
                .await
                .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(())
            }
            #[cfg(feature = "sqlite")]
            BackendType::Sqlite => {
                let conn = self
                    .dal
                    .database
                    .get_sqlite_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                conn.interact(move |conn| {
                    diesel::insert_into(task_history::table)
                        .values(&entry)
                        .execute(conn)
                })
                .await
                .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(())
            }
        }
    }

    /// Lists history rows for a task in the order they were recorded.
    pub async fn list_for_task(&self, task_id: i64) -> Result<Vec<TaskHistory>, TaskQueueError> {
        match self.dal.backend() {
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                let conn = self
                    .dal
                    .database
                    .get_postgres_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                let rows = conn
                    .interact(move |conn| {
                        task_history::table
                            .filter(task_history::task_id.eq(task_id))
                            .order((task_history::created_at.asc(), task_history::id.asc()))
                            .select(TaskHistory::as_select())
                            .load(conn)
                    })
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(rows)
            }
            #[cfg(feature = "sqlite")]
            BackendType::Sqlite => {
                let conn = self
                    .dal
                    .database
                    .get_sqlite_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                let rows = conn
                    .interact(move |conn| {
                        task_history::table
                            .filter(task_history::task_id.eq(task_id))
                            .order((task_history::created_at.asc(), task_history::id.asc()))
                            .select(TaskHistory::as_select())
                            .load(conn)
                    })
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(rows)
            }
        }
    }
}
