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

//! Data Access Layer with runtime backend selection
//!
//! Every DAL operation dispatches on the backend type detected from the
//! connection URL, so the same binary can serve PostgreSQL in production
//! and SQLite in tests or single-node deployments. Entity DALs are cheap
//! borrow-handles; the `DAL` itself clones freely and shares one pool.

pub mod claiming;
pub mod task;
pub mod task_history;
pub mod task_type;

pub use claiming::{SortField, SortOrder};
pub use task::{TaskDAL, TaskFilter, TaskPage};
pub use task_history::TaskHistoryDAL;
pub use task_type::TaskTypeDAL;

use crate::database::{AnyPool, BackendType, Database};

/// The unified Data Access Layer struct.
///
/// `DAL` is `Clone` and can be safely shared between tasks; each clone
/// references the same underlying connection pool.
#[derive(Clone, Debug)]
pub struct DAL {
    /// The database instance with connection pool
    pub database: Database,
}

impl DAL {
    /// Creates a new DAL instance.
    pub fn new(database: Database) -> Self {
        DAL { database }
    }

    /// Returns the backend type for this DAL instance.
    pub fn backend(&self) -> BackendType {
        self.database.backend()
    }

    /// Returns the connection pool.
    pub fn pool(&self) -> AnyPool {
        self.database.pool()
    }

    /// Returns a task type DAL for registry operations.
    pub fn task_types(&self) -> TaskTypeDAL {
        TaskTypeDAL::new(self)
    }

    /// Returns a task DAL for lifecycle operations.
    pub fn tasks(&self) -> TaskDAL {
        TaskDAL::new(self)
    }

    /// Returns a task history DAL for audit operations.
    pub fn task_history(&self) -> TaskHistoryDAL {
        TaskHistoryDAL::new(self)
    }
}
