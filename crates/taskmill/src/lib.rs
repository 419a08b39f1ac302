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

//! # Taskmill
//!
//! A transactional task queue core: register task types with parameter
//! schemas, create tasks idempotently, lease them to workers with an
//! atomic claim, track progress, and resolve completion or failure with
//! bounded retry.
//!
//! The queue is a passive library; it holds no background threads and no
//! state between calls. Any number of processes may operate on the same
//! database concurrently, with all coordination delegated to the store's
//! transaction and locking primitives.
//!
//! ## Backends
//!
//! PostgreSQL and SQLite are supported behind cargo features, selected at
//! runtime from the connection URL. PostgreSQL claims use
//! `FOR UPDATE SKIP LOCKED`; SQLite serializes claimers through immediate
//! transactions.
//!
//! ## Example
//!
//! ```rust,ignore
//! use taskmill::{Database, QueueConfig, TaskQueue};
//! use serde_json::json;
//!
//! let database = Database::new("tasks.db", "taskmill", 1);
//! database.run_migrations().await?;
//! let queue = TaskQueue::new(database, QueueConfig::default());
//!
//! queue.register_type(
//!     "Demo.Echo",
//!     "1.0",
//!     &json!({"type": "object", "required": ["message"]}),
//! ).await?;
//! let created = queue.create_task("Demo.Echo", &json!({"message": "hi"}), None).await?;
//! ```

#[cfg(not(any(feature = "postgres", feature = "sqlite")))]
compile_error!("at least one backend feature must be enabled: 'postgres' or 'sqlite'");

pub mod dal;
pub mod database;
pub mod dedupe;
pub mod error;
pub mod models;
pub mod queue;
pub mod validation;

pub use dal::{SortField, SortOrder, TaskFilter, TaskPage, DAL};
pub use database::{BackendType, Database};
pub use dedupe::derive_key;
pub use error::TaskQueueError;
pub use models::{Resolution, Task, TaskHistory, TaskStatus, TaskType};
pub use queue::{ClaimRequest, ClaimedTask, CreatedTask, QueueConfig, TaskQueue};
pub use validation::validate;

/// Initializes a `tracing` subscriber from the `RUST_LOG` environment
/// variable, defaulting to `info`. Intended for binaries and examples;
/// library users configure their own subscriber.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}
