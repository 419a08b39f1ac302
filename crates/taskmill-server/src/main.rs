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

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use taskmill::{Database, TaskQueue};
use tracing::info;

use taskmill_server::api::{router, AppState};
use taskmill_server::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    taskmill::init_logging();

    let queue_config = config.queue_config();
    let database = Database::new(
        &config.database_url,
        "taskmill",
        queue_config.db_pool_size,
    );
    database
        .run_migrations()
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to run database migrations")?;

    let queue = TaskQueue::new(database, queue_config);
    let state = AppState {
        queue: Arc::new(queue),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    info!(bind = %config.bind, "taskmill server listening");

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}
