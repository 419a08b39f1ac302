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

//! Task queue lifecycle operations.
//!
//! [`TaskQueue`] is the public face of the crate: it wires the registry,
//! the schema validator, the dedupe key deriver and the DAL together into
//! the create / claim / progress / complete operations. It holds no state
//! between calls; any number of queue instances may serve the same
//! database concurrently.
//!
//! History recording happens after the primary transaction commits and is
//! best-effort: a failed history write is logged and swallowed, never
//! surfaced to the caller.

pub mod config;

pub use config::QueueConfig;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dal::{SortField, SortOrder, TaskFilter, TaskPage, DAL};
use crate::database::Database;
use crate::dedupe::derive_key;
use crate::error::TaskQueueError;
use crate::models::{
    NewTask, NewTaskHistory, Resolution, Task, TaskHistory, TaskStatus, TaskType,
};
use crate::validation::validate;

/// Result of a task creation request.
#[derive(Debug, Clone)]
pub struct CreatedTask {
    pub task: Task,
    /// True when an existing task with the same dedupe key was returned
    /// instead of a new row.
    pub deduplicated: bool,
}

/// Parameters for a claim request.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub worker_id: String,
    pub task_type_id: i64,
    /// Optional SQL LIKE pattern further narrowing candidates by type name.
    pub type_pattern: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
}

/// A successfully claimed task together with its type name.
#[derive(Debug, Clone)]
pub struct ClaimedTask {
    pub task: Task,
    pub type_name: String,
}

/// The task queue core.
#[derive(Clone)]
pub struct TaskQueue {
    dal: DAL,
    config: QueueConfig,
}

impl TaskQueue {
    /// Creates a queue over an existing database pool.
    pub fn new(database: Database, config: QueueConfig) -> Self {
        Self {
            dal: DAL::new(database),
            config,
        }
    }

    /// Returns the queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Registers (or re-registers) a task type.
    ///
    /// Upsert semantics: an existing name gets its version and schema
    /// updated and is reactivated; the returned flag is `true` only when
    /// a new row was created.
    pub async fn register_type(
        &self,
        name: &str,
        version: &str,
        param_schema: &Value,
    ) -> Result<(TaskType, bool), TaskQueueError> {
        let schema_text = param_schema.to_string();
        let (task_type, created) = self
            .dal
            .task_types()
            .register(name, version, &schema_text)
            .await?;
        debug!(type_name = %name, created, "registered task type");
        Ok((task_type, created))
    }

    /// Looks up a task type by name.
    pub async fn get_type(&self, name: &str) -> Result<TaskType, TaskQueueError> {
        self.dal
            .task_types()
            .get_by_name(name)
            .await?
            .ok_or_else(|| TaskQueueError::TypeNotFound(name.to_string()))
    }

    /// Deactivates a task type; subsequent creations of it are rejected.
    pub async fn deactivate_type(&self, name: &str) -> Result<TaskType, TaskQueueError> {
        self.dal.task_types().deactivate(name).await
    }

    /// Creates a task, idempotently.
    ///
    /// Validation collects every schema violation before rejecting. When a
    /// task with the same dedupe key already exists (any status), that
    /// task is returned with `deduplicated = true`; creation never fails
    /// on duplicates.
    pub async fn create_task(
        &self,
        type_name: &str,
        params: &Value,
        priority: Option<i32>,
    ) -> Result<CreatedTask, TaskQueueError> {
        let task_type = self.get_type(type_name).await?;
        if !task_type.is_active {
            return Err(TaskQueueError::TypeInactive(type_name.to_string()));
        }

        let schema = task_type
            .schema()
            .map_err(|e| TaskQueueError::ValidationFailed(vec![format!(
                "stored schema for type '{}' is not valid JSON: {}",
                type_name, e
            )]))?;
        validate(params, &schema).map_err(TaskQueueError::ValidationFailed)?;

        let dedupe_key = derive_key(type_name, params);
        if let Some(existing) = self.dal.tasks().find_by_dedupe_key(&dedupe_key).await? {
            debug!(task_id = existing.id, "creation deduplicated");
            return Ok(CreatedTask {
                task: existing,
                deduplicated: true,
            });
        }

        let now = Utc::now().naive_utc();
        let new_task = NewTask {
            task_type_id: task_type.id,
            status: TaskStatus::Pending.as_str().to_string(),
            params: params.to_string(),
            dedupe_key: dedupe_key.clone(),
            priority: priority.unwrap_or(0),
            progress: 0,
            attempts: 0,
            max_attempts: self.config.max_attempts,
            created_at: now,
            updated_at: now,
        };

        match self.dal.tasks().create(new_task).await {
            Ok(task) => {
                self.record_history(task.id, "created", None, None).await;
                Ok(CreatedTask {
                    task,
                    deduplicated: false,
                })
            }
            // A concurrent creator won the insert race on the dedupe key;
            // return their row.
            Err(TaskQueueError::Database(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ))) => {
                let existing = self
                    .dal
                    .tasks()
                    .find_by_dedupe_key(&dedupe_key)
                    .await?
                    .ok_or(TaskQueueError::ConnectionPool(
                        "dedupe key vanished after unique violation".to_string(),
                    ))?;
                Ok(CreatedTask {
                    task: existing,
                    deduplicated: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Claims the best available task for a worker.
    ///
    /// Returns `Ok(None)` when no candidate is available; pollers treat
    /// that as a normal outcome, not an error.
    pub async fn claim_task(
        &self,
        request: &ClaimRequest,
    ) -> Result<Option<ClaimedTask>, TaskQueueError> {
        let task_type = match self
            .dal
            .task_types()
            .get_by_id(request.task_type_id)
            .await?
        {
            Some(t) => t,
            // An unknown type simply has no candidates.
            None => return Ok(None),
        };

        let now = Utc::now().naive_utc();
        let timeout = chrono::Duration::from_std(self.config.claim_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(300));
        let staleness_threshold = now - timeout;

        let claimed = self
            .dal
            .tasks()
            .claim_one(
                request.task_type_id,
                request.type_pattern.clone(),
                request.sort,
                request.order,
                &request.worker_id,
                staleness_threshold,
                now,
            )
            .await?;

        match claimed {
            None => Ok(None),
            Some(task) => {
                debug!(
                    task_id = task.id,
                    worker_id = %request.worker_id,
                    attempts = task.attempts,
                    "task claimed"
                );
                self.record_history(
                    task.id,
                    "claimed",
                    Some(request.worker_id.clone()),
                    None,
                )
                .await;
                Ok(Some(ClaimedTask {
                    task,
                    type_name: task_type.name,
                }))
            }
        }
    }

    /// Records worker-reported progress on a claimed task.
    pub async fn update_progress(
        &self,
        task_id: i64,
        worker_id: &str,
        progress: i32,
        message: Option<String>,
    ) -> Result<Task, TaskQueueError> {
        if !(0..=100).contains(&progress) {
            return Err(TaskQueueError::InvalidProgress(progress));
        }

        let task = self
            .dal
            .tasks()
            .set_progress(task_id, worker_id, progress)
            .await?;
        self.record_history(
            task_id,
            "progress_update",
            Some(worker_id.to_string()),
            message,
        )
        .await;
        Ok(task)
    }

    /// Resolves a claimed task as completed or failed.
    ///
    /// On failure with retry budget left the task is recycled to
    /// `pending`; the returned [`Resolution`] distinguishes that from a
    /// terminal failure.
    pub async fn complete_task(
        &self,
        task_id: i64,
        worker_id: &str,
        success: bool,
        result: Option<&Value>,
        error_message: Option<String>,
    ) -> Result<(Task, Resolution), TaskQueueError> {
        let (task, resolution) = self
            .dal
            .tasks()
            .resolve_task(
                task_id,
                worker_id,
                success,
                result.map(|v| v.to_string()),
                error_message.clone(),
            )
            .await?;

        let label = match resolution {
            Resolution::Completed => "completed",
            Resolution::RetryScheduled => "retry_scheduled",
            Resolution::FailedTerminal => "failed",
        };
        self.record_history(task_id, label, Some(worker_id.to_string()), error_message)
            .await;

        Ok((task, resolution))
    }

    /// Retrieves a task by id.
    pub async fn get_task(&self, task_id: i64) -> Result<Task, TaskQueueError> {
        self.dal
            .tasks()
            .get_by_id(task_id)
            .await?
            .ok_or(TaskQueueError::TaskNotFound(task_id))
    }

    /// Lists tasks matching the filter with a total count.
    pub async fn list_tasks(&self, filter: TaskFilter) -> Result<TaskPage, TaskQueueError> {
        self.dal.tasks().list(filter).await
    }

    /// Lists the recorded history for a task.
    pub async fn task_history(&self, task_id: i64) -> Result<Vec<TaskHistory>, TaskQueueError> {
        self.dal.task_history().list_for_task(task_id).await
    }

    /// Best-effort history append. Runs after the primary transaction has
    /// committed; failures are logged and swallowed.
    async fn record_history(
        &self,
        task_id: i64,
        status_change: &str,
        worker_id: Option<String>,
        message: Option<String>,
    ) {
        let entry = NewTaskHistory {
            task_id,
            status_change: status_change.to_string(),
            worker_id,
            message,
            created_at: Utc::now().naive_utc(),
        };
        if let Err(e) = self.dal.task_history().record(entry).await {
            warn!(task_id, status_change, error = %e, "failed to record task history");
        }
    }
}
