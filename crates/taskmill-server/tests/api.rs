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

//! HTTP API tests driven through the router with `tower::ServiceExt`.

#![cfg(feature = "sqlite")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use taskmill::{Database, QueueConfig, TaskQueue};
use taskmill_server::api::{router, AppState};

static DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

async fn test_app() -> Router {
    let n = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let url = format!("file:taskmill_api_test_{}?mode=memory&cache=shared", n);
    let database = Database::new(&url, "", 1);
    database
        .run_migrations()
        .await
        .expect("Failed to run migrations");
    let queue = TaskQueue::new(database, QueueConfig::default());
    router(AppState {
        queue: Arc::new(queue),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request"),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request"),
    };

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body was not JSON")
    };
    (status, value)
}

fn echo_type_body() -> Value {
    json!({
        "name": "Demo.Echo",
        "version": "1.0",
        "param_schema": {
            "type": "object",
            "required": ["message"],
            "properties": {"message": {"type": "string"}}
        }
    })
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_create_claim_complete_roundtrip() {
    let app = test_app().await;

    let (status, registered) = send(&app, "POST", "/task-types", Some(echo_type_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registered["name"], "Demo.Echo");
    assert_eq!(registered["created"], true);
    let type_id = registered["id"].as_i64().expect("id must be an integer");
    assert!(type_id > 0);

    // Re-registration is an upsert.
    let (status, updated) = send(&app, "POST", "/task-types", Some(echo_type_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["created"], false);
    assert_eq!(updated["id"].as_i64(), Some(type_id));

    let create_body = json!({"type": "Demo.Echo", "params": {"message": "hi"}});
    let (status, created) = send(&app, "POST", "/tasks", Some(create_body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["priority"], 0);
    assert!(created.get("deduplicated").is_none());
    let task_id = created["id"].as_i64().expect("id must be an integer");

    // Duplicate submission returns the canonical task, not an error.
    let (status, duplicate) = send(&app, "POST", "/tasks", Some(create_body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(duplicate["id"].as_i64(), Some(task_id));
    assert_eq!(duplicate["deduplicated"], true);

    let claim_body = json!({
        "worker_id": "worker-1",
        "task_type_id": type_id,
        "sort_by": "priority",
        "sort_order": "DESC"
    });
    let (status, claimed) = send(&app, "POST", "/tasks/claim", Some(claim_body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claimed["id"].as_i64(), Some(task_id));
    assert_eq!(claimed["type"], "Demo.Echo");
    assert_eq!(claimed["params"]["message"], "hi");
    assert_eq!(claimed["attempts"], 1);

    // The pool is now empty.
    let (status, empty) = send(&app, "POST", "/tasks/claim", Some(claim_body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(empty["message"], "no available task");

    let progress_body = json!({"worker_id": "worker-1", "progress": 40, "message": "working"});
    let (status, progressed) = send(
        &app,
        "POST",
        &format!("/tasks/{}/progress", task_id),
        Some(progress_body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progressed["progress"], 40);

    let complete_body = json!({
        "worker_id": "worker-1",
        "success": true,
        "result": {"echo": "hi"}
    });
    let (status, completed) = send(
        &app,
        "POST",
        &format!("/tasks/{}/complete", task_id),
        Some(complete_body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");
    assert!(completed.get("retry_scheduled").is_none());

    let (status, task) = send(&app, "GET", &format!("/tasks/{}", task_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "completed");
    assert_eq!(task["result"]["echo"], "hi");
    assert_eq!(task["progress"], 40);

    let (status, history) = send(&app, "GET", &format!("/tasks/{}/history", task_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let labels: Vec<&str> = history["history"]
        .as_array()
        .expect("history must be an array")
        .iter()
        .map(|h| h["status_change"].as_str().unwrap_or(""))
        .collect();
    assert_eq!(
        labels,
        vec!["created", "claimed", "progress_update", "completed"]
    );

    let (status, listed) = send(&app, "GET", "/tasks?status=completed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["tasks"][0]["id"].as_i64(), Some(task_id));
}

#[tokio::test]
async fn schema_violations_return_422_with_field_paths() {
    let app = test_app().await;
    send(&app, "POST", "/task-types", Some(echo_type_body())).await;

    let (status, body) = send(
        &app,
        "POST",
        "/tasks",
        Some(json!({"type": "Demo.Echo", "params": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = body["details"].as_array().expect("details must be listed");
    assert!(details
        .iter()
        .any(|d| d.as_str().unwrap_or("").contains("params.message")));
}

#[tokio::test]
async fn unknown_type_and_task_return_404() {
    let app = test_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/tasks",
        Some(json!({"type": "No.Such", "params": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/tasks/12345", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn claim_rejects_bad_parameters() {
    let app = test_app().await;
    let (_, registered) = send(&app, "POST", "/task-types", Some(echo_type_body())).await;
    let type_id = registered["id"].as_i64().expect("id must be an integer");

    for (field, body) in [
        (
            "sort_by",
            json!({"worker_id": "w", "task_type_id": type_id, "sort_by": "claimed_by"}),
        ),
        (
            "sort_order",
            json!({"worker_id": "w", "task_type_id": type_id, "sort_order": "SIDEWAYS"}),
        ),
        (
            "task_type_id",
            json!({"worker_id": "w", "task_type_id": 0}),
        ),
        ("worker_id", json!({"worker_id": "", "task_type_id": type_id})),
    ] {
        let (status, error) = send(&app, "POST", "/tasks/claim", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "field: {}", field);
        assert!(error["error"].as_str().is_some());
    }
}

#[tokio::test]
async fn wrong_worker_gets_403_and_bad_progress_400() {
    let app = test_app().await;
    let (_, registered) = send(&app, "POST", "/task-types", Some(echo_type_body())).await;
    let type_id = registered["id"].as_i64().expect("id must be an integer");

    let (_, created) = send(
        &app,
        "POST",
        "/tasks",
        Some(json!({"type": "Demo.Echo", "params": {"message": "hi"}})),
    )
    .await;
    let task_id = created["id"].as_i64().expect("id must be an integer");

    send(
        &app,
        "POST",
        "/tasks/claim",
        Some(json!({"worker_id": "worker-1", "task_type_id": type_id})),
    )
    .await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/tasks/{}/progress", task_id),
        Some(json!({"worker_id": "intruder", "progress": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/tasks/{}/progress", task_id),
        Some(json!({"worker_id": "worker-1", "progress": 101})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/tasks/{}/complete", task_id),
        Some(json!({"worker_id": "intruder", "success": true})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn failed_completion_reports_retry_scheduled() {
    let app = test_app().await;
    let (_, registered) = send(&app, "POST", "/task-types", Some(echo_type_body())).await;
    let type_id = registered["id"].as_i64().expect("id must be an integer");

    let (_, created) = send(
        &app,
        "POST",
        "/tasks",
        Some(json!({"type": "Demo.Echo", "params": {"message": "hi"}})),
    )
    .await;
    let task_id = created["id"].as_i64().expect("id must be an integer");

    send(
        &app,
        "POST",
        "/tasks/claim",
        Some(json!({"worker_id": "worker-1", "task_type_id": type_id})),
    )
    .await;

    let (status, completed) = send(
        &app,
        "POST",
        &format!("/tasks/{}/complete", task_id),
        Some(json!({"worker_id": "worker-1", "success": false, "error": "boom"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "pending");
    assert_eq!(completed["retry_scheduled"], true);

    let (_, task) = send(&app, "GET", &format!("/tasks/{}", task_id), None).await;
    assert_eq!(task["error_message"], "boom");
    assert_eq!(task["attempts"], 1);
}
