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

//! Server configuration from command line flags and environment.

use std::time::Duration;

use clap::Parser;
use taskmill::QueueConfig;

/// HTTP API server for the taskmill task queue.
#[derive(Parser, Debug, Clone)]
#[command(name = "taskmill-server", version, about)]
pub struct ServerConfig {
    /// Database connection URL (postgres://... or a SQLite path).
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Address to bind the HTTP listener to.
    #[arg(long, env = "TASKMILL_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Retry budget stamped onto newly created tasks.
    #[arg(long, default_value_t = 3)]
    pub max_attempts: i32,

    /// Seconds before an uncompleted claim becomes reclaimable.
    #[arg(long, default_value_t = 300)]
    pub claim_timeout_secs: u64,

    /// Connection pool size (SQLite always uses a single connection).
    #[arg(long, default_value_t = 10)]
    pub db_pool_size: u32,
}

impl ServerConfig {
    /// Derives the queue configuration from the server flags. The pool is
    /// sized from this config, so the flag and the queue always agree.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            claim_timeout: Duration::from_secs(self.claim_timeout_secs),
            max_attempts: self.max_attempts,
            db_pool_size: self.db_pool_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_config_carries_all_flags() {
        let config = ServerConfig::try_parse_from([
            "taskmill-server",
            "--database-url",
            "tasks.db",
            "--max-attempts",
            "5",
            "--claim-timeout-secs",
            "60",
            "--db-pool-size",
            "4",
        ])
        .expect("flags should parse");

        let queue_config = config.queue_config();
        assert_eq!(queue_config.claim_timeout, Duration::from_secs(60));
        assert_eq!(queue_config.max_attempts, 5);
        assert_eq!(queue_config.db_pool_size, 4);
    }
}
