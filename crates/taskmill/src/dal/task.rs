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

//! Task lifecycle DAL with runtime backend selection.
//!
//! Covers creation, lookup, listing, progress updates and resolution.
//! Claiming lives in [`super::claiming`] because it carries the
//! backend-specific locking logic.
//!
//! Progress and resolution run their ownership and state checks inside
//! the same transaction as the update, so a reclaim that lands between
//! the check and the write is impossible. On PostgreSQL the loaded row is
//! additionally locked with `FOR UPDATE`; on SQLite the immediate
//! transaction serializes writers.

use chrono::Utc;
use diesel::prelude::*;

use super::DAL;
use crate::database::schema::{task_types, tasks};
use crate::database::BackendType;
use crate::error::TaskQueueError;
use crate::models::{resolve, NewTask, Resolution, Task, TaskStatus};

/// Filters and pagination for task listing.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Restrict to a single status ("pending", "claimed", ...).
    pub status: Option<String>,
    /// Restrict to tasks whose type has this exact name.
    pub type_name: Option<String>,
    /// Page size.
    pub limit: i64,
    /// Page offset.
    pub offset: i64,
}

/// One page of tasks plus the total matching count.
#[derive(Debug, Clone)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: i64,
}

/// Data access layer for task operations.
#[derive(Clone)]
pub struct TaskDAL<'a> {
    pub(super) dal: &'a DAL,
}

impl<'a> TaskDAL<'a> {
    /// Creates a new TaskDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Inserts a new task row.
    ///
    /// A unique violation on `dedupe_key` surfaces as a database error;
    /// the queue layer turns it into a deduplicated-create response.
    pub async fn create(&self, new_task: NewTask) -> Result<Task, TaskQueueError> {
        match self.dal.backend() {
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                let conn = self
                    .dal
                    .database
                    .get_postgres_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                let task = conn
                    .interact(move |conn| {
                        diesel::insert_into(tasks::table)
                            .values(&new_task)
                            .get_result(conn)
                    })
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(task)
            }
            #[cfg(feature = "sqlite")]
            BackendType::Sqlite => {
                let conn = self
                    .dal
                    .database
                    .get_sqlite_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                let task = conn
                    .interact(move |conn| {
                        diesel::insert_into(tasks::table)
                            .values(&new_task)
                            .get_result(conn)
                    })
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(task)
            }
        }
    }

    /// Retrieves a task by id, if one exists.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Task>, TaskQueueError> {
        match self.dal.backend() {
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                let conn = self
                    .dal
                    .database
                    .get_postgres_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                let task = conn
                    .interact(move |conn| {
                        tasks::table
                            .find(id)
                            .select(Task::as_select())
                            .first(conn)
                            .optional()
                    })
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(task)
            }
            #[cfg(feature = "sqlite")]
            BackendType::Sqlite => {
                let conn = self
                    .dal
                    .database
                    .get_sqlite_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                let task = conn
                    .interact(move |conn| {
                        tasks::table
                            .find(id)
                            .select(Task::as_select())
                            .first(conn)
                            .optional()
                    })
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(task)
            }
        }
    }

    /// Retrieves a task by its dedupe key, if one exists.
    pub async fn find_by_dedupe_key(&self, key: &str) -> Result<Option<Task>, TaskQueueError> {
        let key = key.to_string();

        match self.dal.backend() {
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                let conn = self
                    .dal
                    .database
                    .get_postgres_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                let task = conn
                    .interact(move |conn| {
                        tasks::table
                            .filter(tasks::dedupe_key.eq(key))
                            .select(Task::as_select())
                            .first(conn)
                            .optional()
                    })
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(task)
            }
            #[cfg(feature = "sqlite")]
            BackendType::Sqlite => {
                let conn = self
                    .dal
                    .database
                    .get_sqlite_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                let task = conn
                    .interact(move |conn| {
                        tasks::table
                            .filter(tasks::dedupe_key.eq(key))
                            .select(Task::as_select())
                            .first(conn)
                            .optional()
                    })
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))??;
                Ok(task)
            }
        }
    }

    /// Lists tasks matching the filter, newest first, with a total count.
    pub async fn list(&self, filter: TaskFilter) -> Result<TaskPage, TaskQueueError> {
        match self.dal.backend() {
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                let conn = self
                    .dal
                    .database
                    .get_postgres_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                conn.interact(move |conn| list_postgres(conn, &filter))
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
                conn.interact(move |conn| list_sqlite(conn, &filter))
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?
            }
        }
    }

    /// Records worker-reported progress on a claimed task.
    ///
    /// The caller must be the worker recorded in `claimed_by` and the task
    /// must currently be `claimed`; bounds on the progress value itself are
    /// enforced by the queue layer.
    pub async fn set_progress(
        &self,
        task_id: i64,
        worker_id: &str,
        progress: i32,
    ) -> Result<Task, TaskQueueError> {
        let worker_id = worker_id.to_string();

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
                    conn.transaction(|conn| {
                        set_progress_postgres(conn, task_id, &worker_id, progress)
                    })
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
                        set_progress_sqlite(conn, task_id, &worker_id, progress)
                    })
                })
                .await
                .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?
            }
        }
    }

    /// Resolves a claimed task as completed or failed.
    ///
    /// Applies the transition chosen by [`resolve`]: terminal completion,
    /// terminal failure, or recycling back to `pending` for another
    /// attempt. Returns the updated row together with the resolution.
    pub async fn resolve_task(
        &self,
        task_id: i64,
        worker_id: &str,
        success: bool,
        result: Option<String>,
        error_message: Option<String>,
    ) -> Result<(Task, Resolution), TaskQueueError> {
        let worker_id = worker_id.to_string();

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
                    conn.transaction(|conn| {
                        resolve_postgres(conn, task_id, &worker_id, success, result, error_message)
                    })
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
                        resolve_sqlite(conn, task_id, &worker_id, success, result, error_message)
                    })
                })
                .await
                .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?
            }
        }
    }
}

#[cfg(feature = "postgres")]
fn list_postgres(
    conn: &mut diesel::PgConnection,
    filter: &TaskFilter,
) -> Result<TaskPage, TaskQueueError> {
    let mut query = tasks::table.into_boxed();
    let mut count = tasks::table.into_boxed();

    if let Some(status) = &filter.status {
        query = query.filter(tasks::status.eq(status.clone()));
        count = count.filter(tasks::status.eq(status.clone()));
    }
    if let Some(type_name) = &filter.type_name {
        query = query.filter(
            tasks::task_type_id.eq_any(
                task_types::table
                    .filter(task_types::name.eq(type_name.clone()))
                    .select(task_types::id),
            ),
        );
        count = count.filter(
            tasks::task_type_id.eq_any(
                task_types::table
                    .filter(task_types::name.eq(type_name.clone()))
                    .select(task_types::id),
            ),
        );
    }

    let total: i64 = count.count().get_result(conn)?;
    let rows: Vec<Task> = query
        .order((tasks::created_at.desc(), tasks::id.desc()))
        .limit(filter.limit)
        .offset(filter.offset)
        .select(Task::as_select())
        .load(conn)?;

    Ok(TaskPage { tasks: rows, total })
}

#[cfg(feature = "sqlite")]
fn list_sqlite(
    conn: &mut diesel::SqliteConnection,
    filter: &TaskFilter,
) -> Result<TaskPage, TaskQueueError> {
    let mut query = tasks::table.into_boxed();
    let mut count = tasks::table.into_boxed();

    if let Some(status) = &filter.status {
        query = query.filter(tasks::status.eq(status.clone()));
        count = count.filter(tasks::status.eq(status.clone()));
    }
    if let Some(type_name) = &filter.type_name {
        query = query.filter(
            tasks::task_type_id.eq_any(
                task_types::table
                    .filter(task_types::name.eq(type_name.clone()))
                    .select(task_types::id),
            ),
        );
        count = count.filter(
            tasks::task_type_id.eq_any(
                task_types::table
                    .filter(task_types::name.eq(type_name.clone()))
                    .select(task_types::id),
            ),
        );
    }

    let total: i64 = count.count().get_result(conn)?;
    let rows: Vec<Task> = query
        .order((tasks::created_at.desc(), tasks::id.desc()))
        .limit(filter.limit)
        .offset(filter.offset)
        .select(Task::as_select())
        .load(conn)?;

    Ok(TaskPage { tasks: rows, total })
}

// Loads a task and verifies the caller may mutate it. Must run inside the
// caller's transaction so the checks and the update are atomic.
#[cfg(feature = "postgres")]
fn load_claimed_postgres(
    conn: &mut diesel::PgConnection,
    task_id: i64,
    worker_id: &str,
) -> Result<Task, TaskQueueError> {
    let task: Task = tasks::table
        .find(task_id)
        .select(Task::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or(TaskQueueError::TaskNotFound(task_id))?;

    if task.status != TaskStatus::Claimed.as_str() {
        return Err(TaskQueueError::InvalidState {
            task_id,
            status: task.status,
        });
    }
    if task.claimed_by.as_deref() != Some(worker_id) {
        return Err(TaskQueueError::Forbidden { task_id });
    }
    Ok(task)
}

#[cfg(feature = "sqlite")]
fn load_claimed_sqlite(
    conn: &mut diesel::SqliteConnection,
    task_id: i64,
    worker_id: &str,
) -> Result<Task, TaskQueueError> {
    let task: Task = tasks::table
        .find(task_id)
        .select(Task::as_select())
        .first(conn)
        .optional()?
        .ok_or(TaskQueueError::TaskNotFound(task_id))?;

    if task.status != TaskStatus::Claimed.as_str() {
        return Err(TaskQueueError::InvalidState {
            task_id,
            status: task.status,
        });
    }
    if task.claimed_by.as_deref() != Some(worker_id) {
        return Err(TaskQueueError::Forbidden { task_id });
    }
    Ok(task)
}

#[cfg(feature = "postgres")]
fn set_progress_postgres(
    conn: &mut diesel::PgConnection,
    task_id: i64,
    worker_id: &str,
    progress: i32,
) -> Result<Task, TaskQueueError> {
    load_claimed_postgres(conn, task_id, worker_id)?;

    let now = Utc::now().naive_utc();
    let task = diesel::update(tasks::table.find(task_id))
        .set((tasks::progress.eq(progress), tasks::updated_at.eq(now)))
        .get_result(conn)?;
    Ok(task)
}

#[cfg(feature = "sqlite")]
fn set_progress_sqlite(
    conn: &mut diesel::SqliteConnection,
    task_id: i64,
    worker_id: &str,
    progress: i32,
) -> Result<Task, TaskQueueError> {
    load_claimed_sqlite(conn, task_id, worker_id)?;

    let now = Utc::now().naive_utc();
    let task = diesel::update(tasks::table.find(task_id))
        .set((tasks::progress.eq(progress), tasks::updated_at.eq(now)))
        .get_result(conn)?;
    Ok(task)
}

#[cfg(feature = "postgres")]
fn resolve_postgres(
    conn: &mut diesel::PgConnection,
    task_id: i64,
    worker_id: &str,
    success: bool,
    result: Option<String>,
    error_message: Option<String>,
) -> Result<(Task, Resolution), TaskQueueError> {
    let task = load_claimed_postgres(conn, task_id, worker_id)?;
    let resolution = resolve(task.attempts, task.max_attempts, success);
    let now = Utc::now().naive_utc();

    let updated: Task = match resolution {
        Resolution::Completed => diesel::update(tasks::table.find(task_id))
            .set((
                tasks::status.eq(TaskStatus::Completed.as_str()),
                tasks::result.eq(result),
                tasks::completed_at.eq(Some(now)),
                tasks::updated_at.eq(now),
            ))
            .get_result(conn)?,
        // Recycled rows keep the last error for operators but shed the
        // claim and progress so they re-enter the claimable pool clean.
        Resolution::RetryScheduled => diesel::update(tasks::table.find(task_id))
            .set((
                tasks::status.eq(TaskStatus::Pending.as_str()),
                tasks::claimed_by.eq(None::<String>),
                tasks::claimed_at.eq(None::<chrono::NaiveDateTime>),
                tasks::error_message.eq(error_message),
                tasks::completed_at.eq(None::<chrono::NaiveDateTime>),
                tasks::progress.eq(0),
                tasks::updated_at.eq(now),
            ))
            .get_result(conn)?,
        Resolution::FailedTerminal => diesel::update(tasks::table.find(task_id))
            .set((
                tasks::status.eq(TaskStatus::Failed.as_str()),
                tasks::error_message.eq(error_message),
                tasks::completed_at.eq(Some(now)),
                tasks::updated_at.eq(now),
            ))
            .get_result(conn)?,
    };

    Ok((updated, resolution))
}

#[cfg(feature = "sqlite")]
fn resolve_sqlite(
    conn: &mut diesel::SqliteConnection,
    task_id: i64,
    worker_id: &str,
    success: bool,
    result: Option<String>,
    error_message: Option<String>,
) -> Result<(Task, Resolution), TaskQueueError> {
    let task = load_claimed_sqlite(conn, task_id, worker_id)?;
    let resolution = resolve(task.attempts, task.max_attempts, success);
    let now = Utc::now().naive_utc();

    let updated: Task = match resolution {
        Resolution::Completed => diesel::update(tasks::table.find(task_id))
            .set((
                tasks::status.eq(TaskStatus::Completed.as_str()),
                tasks::result.eq(result),
                tasks::completed_at.eq(Some(now)),
                tasks::updated_at.eq(now),
            ))
            .get_result(conn)?,
        Resolution::RetryScheduled => diesel::update(tasks::table.find(task_id))
            .set((
                tasks::status.eq(TaskStatus::Pending.as_str()),
                tasks::claimed_by.eq(None::<String>),
                tasks::claimed_at.eq(None::<chrono::NaiveDateTime>),
                tasks::error_message.eq(error_message),
                tasks::completed_at.eq(None::<chrono::NaiveDateTime>),
                tasks::progress.eq(0),
                tasks::updated_at.eq(now),
            ))
            .get_result(conn)?,
        Resolution::FailedTerminal => diesel::update(tasks::table.find(task_id))
            .set((
                tasks::status.eq(TaskStatus::Failed.as_str()),
                tasks::error_message.eq(error_message),
                tasks::completed_at.eq(Some(now)),
                tasks::updated_at.eq(now),
            ))
            .get_result(conn)?,
    };

    Ok((updated, resolution))
}
