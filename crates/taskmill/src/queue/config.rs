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

//! Queue configuration.

use std::time::Duration;

/// Tunables for queue behavior.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How long a claim may go without completion before the task becomes
    /// reclaimable by other workers.
    pub claim_timeout: Duration,
    /// Retry budget stamped onto each task at creation time. A task that
    /// fails this many claims becomes terminally failed.
    pub max_attempts: i32,
    /// Connection pool size.
    pub db_pool_size: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            claim_timeout: Duration::from_secs(300), // 5 minutes
            max_attempts: 3,
            db_pool_size: {
                #[cfg(feature = "sqlite")]
                {
                    1
                } // SQLite works best with a single connection
                #[cfg(not(feature = "sqlite"))]
                {
                    10
                }
            },
        }
    }
}
