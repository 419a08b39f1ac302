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

//! Task type registry DAL with runtime backend selection.
//!
//! Registration is an upsert: re-registering an existing name updates its
//! version and schema and reactivates it. Lookups always read committed
//! state; there is no caching layer here.

use chrono::Utc;
use diesel::prelude::*;

use super::DAL;
use crate::database::schema::task_types;
use crate::database::BackendType;
use crate::error::TaskQueueError;
use crate::models::{NewTaskType, TaskType};

/// Data access layer for task type operations.
#[derive(Clone)]
pub struct TaskTypeDAL<'a> {
    dal: &'a DAL,
}

impl<'a> TaskTypeDAL<'a> {
    /// Creates a new TaskTypeDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Registers a task type, inserting or updating by name.
    ///
    /// Returns the stored row and `true` when a new row was created.
    pub async fn register(
        &self,
        name: &str,
        version: &str,
        param_schema: &str,
    ) -> Result<(TaskType, bool), TaskQueueError> {
        let name = name.to_string();
        let version = version.to_string();
        let param_schema = param_schema.to_string();

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
                    conn.transaction(|conn| register_upsert_postgres(conn, &name, &version, &param_schema))
                })
                .await
                .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?
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
                    conn.immediate_transaction(|conn| {
                        register_upsert_sqlite(conn, &name, &version, &param_schema)
                    })
                })
                .await
                .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?
            }
        }
    }

    /// Retrieves a task type by name, if one exists.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<TaskType>, TaskQueueError> {
        let name = name.to_string();

        match self.dal.backend() {
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                let conn = self
                    .dal
                    .database
                    .get_postgres_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                let result = conn
                    .interact(move |conn| {
                        task_types::table
                            .filter(task_types::name.eq(name))
                            .select(TaskType::as_select())
                            .first(conn)
                            .optional()
                    })
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(result)
            }
            #[cfg(feature = "sqlite")]
            BackendType::Sqlite => {
                let conn = self
                    .dal
                    .database
                    .get_sqlite_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                let result = conn
                    .interact(move |conn| {
                        task_types::table
                            .filter(task_types::name.eq(name))
                            .select(TaskType::as_select())
                            .first(conn)
                            .optional()
                    })
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(result)
            }
        }
    }

    /// Retrieves a task type by id, if one exists.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<TaskType>, TaskQueueError> {
        match self.dal.backend() {
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                let conn = self
                    .dal
                    .database
                    .get_postgres_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                let result = conn
                    .interact(move |conn| {
                        task_types::table
                            .find(id)
                            .select(TaskType::as_select())
                            .first(conn)
                            .optional()
                    })
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(result)
            }
            #[cfg(feature = "sqlite")]
            BackendType::Sqlite => {
                let conn = self
                    .dal
                    .database
                    .get_sqlite_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                let result = conn
                    .interact(move |conn| {
                        task_types::table
                            .find(id)
                            .select(TaskType::as_select())
                            .first(conn)
                            .optional()
                    })
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(result)
            }
        }
    }

    /// Deactivates a task type so new tasks of it are rejected.
    ///
    /// Existing tasks are unaffected. Returns the updated row.
    pub async fn deactivate(&self, name: &str) -> Result<TaskType, TaskQueueError> {
        let name = name.to_string();

        match self.dal.backend() {
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                let conn = self
                    .dal
                    .database
                    .get_postgres_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                conn.interact(move |conn| deactivate_by_name_postgres(conn, &name))
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?
            }
            #[cfg(feature = "sqlite")]
            BackendType::Sqlite => {
                let conn = self
                    .dal
                    .database
                    .get_sqlite_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                conn.interact(move |conn| deactivate_by_name_sqlite(conn, &name))
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?
            }
        }
    }
}

// Both backends support RETURNING (SQLite via the
// returning_clauses_for_sqlite_3_35 feature), so the per-backend bodies
// below are textually identical; they differ only in connection type.

#[cfg(feature = "postgres")]
fn register_upsert_postgres(
    conn: &mut diesel::PgConnection,
    name: &str,
    version: &str,
    param_schema: &str,
) -> Result<(TaskType, bool), TaskQueueError> {
    let now = Utc::now().naive_utc();

    let existing: Option<TaskType> = task_types::table
        .filter(task_types::name.eq(name))
        .select(TaskType::as_select())
        .first(conn)
        .optional()?;

    match existing {
        Some(existing) => {
            let updated: TaskType = diesel::update(task_types::table.find(existing.id))
                .set((
                    task_types::version.eq(version),
                    task_types::param_schema.eq(param_schema),
                    task_types::is_active.eq(true),
                    task_types::updated_at.eq(now),
                ))
                .get_result(conn)?;
            Ok((updated, false))
        }
        None => {
            let inserted: TaskType = diesel::insert_into(task_types::table)
                .values(NewTaskType {
                    name: name.to_string(),
                    version: version.to_string(),
                    param_schema: param_schema.to_string(),
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .get_result(conn)?;
            Ok((inserted, true))
        }
    }
}

#[cfg(feature = "sqlite")]
fn register_upsert_sqlite(
    conn: &mut diesel::SqliteConnection,
    name: &str,
    version: &str,
    param_schema: &str,
) -> Result<(TaskType, bool), TaskQueueError> {
    let now = Utc::now().naive_utc();

    let existing: Option<TaskType> = task_types::table
        .filter(task_types::name.eq(name))
        .select(TaskType::as_select())
        .first(conn)
        .optional()?;

    match existing {
        Some(existing) => {
            let updated: TaskType = diesel::update(task_types::table.find(existing.id))
                .set((
                    task_types::version.eq(version),
                    task_types::param_schema.eq(param_schema),
                    task_types::is_active.eq(true),
                    task_types::updated_at.eq(now),
                ))
                .get_result(conn)?;
            Ok((updated, false))
        }
        None => {
            let inserted: TaskType = diesel::insert_into(task_types::table)
                .values(NewTaskType {
                    name: name.to_string(),
                    version: version.to_string(),
                    param_schema: param_schema.to_string(),
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .get_result(conn)?;
            Ok((inserted, true))
        }
    }
}

#[cfg(feature = "postgres")]
fn deactivate_by_name_postgres(
    conn: &mut diesel::PgConnection,
    name: &str,
) -> Result<TaskType, TaskQueueError> {
    let now = Utc::now().naive_utc();

    diesel::update(task_types::table.filter(task_types::name.eq(name)))
        .set((
            task_types::is_active.eq(false),
            task_types::updated_at.eq(now),
        ))
        .get_result(conn)
        .optional()?
        .ok_or_else(|| TaskQueueError::TypeNotFound(name.to_string()))
}

#[cfg(feature = "sqlite")]
fn deactivate_by_name_sqlite(
    conn: &mut diesel::SqliteConnection,
    name: &str,
) -> Result<TaskType, TaskQueueError> {
    let now = Utc::now().naive_utc();

    diesel::update(task_types::table.filter(task_types::name.eq(name)))
        .set((
            task_types::is_active.eq(false),
            task_types::updated_at.eq(now),
        ))
        .get_result(conn)
        .optional()?
        .ok_or_else(|| TaskQueueError::TypeNotFound(name.to_string()))
}
