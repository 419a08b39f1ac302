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

//! HTTP API surface built on axum.
//!
//! Routes, middleware and shared state. Auth is out of scope; deploy
//! behind whatever front door enforces it.

pub mod error;
pub mod task_types;
pub mod tasks;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use taskmill::TaskQueue;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<TaskQueue>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/task-types", post(task_types::register_type))
        .route("/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route("/tasks/claim", post(tasks::claim_task))
        .route("/tasks/{id}", get(tasks::get_task))
        .route("/tasks/{id}/history", get(tasks::get_task_history))
        .route("/tasks/{id}/progress", post(tasks::update_progress))
        .route("/tasks/{id}/complete", post(tasks::complete_task))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
