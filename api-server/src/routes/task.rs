//! Task API endpoints
//!
//! RESTful API over the task service.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use todo_core::task::{Task, TaskId};
use todo_core::Error;

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub details: String,
    pub is_completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: TaskId,
    pub title: String,
    pub details: String,
    pub created_at: String,
    pub is_completed: bool,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            details: task.details,
            created_at: task.created_at.to_rfc3339(),
            is_completed: task.is_completed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: Error) -> ApiError {
    let status = match &err {
        Error::TaskNotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        _ => {
            tracing::error!("Task request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/tasks?q= - List tasks, or search when `q` is non-empty
async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let tasks = state.service().search(&query.q).await.map_err(api_error)?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// POST /api/tasks - Create a new task
async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let created = state
        .service()
        .add(req.title, req.details)
        .await
        .map_err(api_error)?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(created))))
}

/// PUT /api/tasks/:id - Replace title, details and completion flag
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let updated = state
        .service()
        .update(id, req.title, req.details, req.is_completed)
        .await
        .map_err(api_error)?;

    Ok(Json(TaskResponse::from(updated)))
}

/// DELETE /api/tasks/:id - Delete a task
async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, ApiError> {
    state.service().delete(id).await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", put(update_task).delete(delete_task))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use todo_core::{service::TaskService, task::InMemoryTaskStore};

    use super::router;
    use crate::state::AppState;

    async fn build_state() -> AppState {
        let service = TaskService::with_repository(Arc::new(InMemoryTaskStore::new()), None);
        service.start().await.unwrap();
        AppState::with_service(Arc::new(service), PathBuf::from("unused"))
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = router()
            .with_state(state.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, payload)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn create_then_list_tasks() {
        let state = build_state().await;

        let (status, created) = send(
            &state,
            json_request("POST", "/api/tasks", json!({ "title": "Test", "details": "Details" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "Test");
        assert_eq!(created["isCompleted"], false);
        assert!(created["id"].is_i64());
        assert!(created["createdAt"].is_string());

        let (status, listed) = send(&state, empty_request("GET", "/api/tasks")).await;
        assert_eq!(status, StatusCode::OK);
        let tasks = listed.as_array().expect("list response should be an array");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["details"], "Details");
    }

    #[tokio::test]
    async fn create_task_rejects_blank_title() {
        let state = build_state().await;

        let (status, payload) =
            send(&state, json_request("POST", "/api/tasks", json!({ "title": "   " }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"].as_str().unwrap().contains("Title"));
    }

    #[tokio::test]
    async fn search_filters_by_query() {
        let state = build_state().await;
        for (title, details) in [("Task 0", ""), ("Task 1", "Special"), ("Task 2", "")] {
            state.service().add(title, details).await.unwrap();
        }

        let (status, found) = send(&state, empty_request("GET", "/api/tasks?q=special")).await;

        assert_eq!(status, StatusCode::OK);
        let tasks = found.as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["title"], "Task 1");
    }

    #[tokio::test]
    async fn update_task_replaces_fields() {
        let state = build_state().await;
        let task = state.service().add("Old", "").await.unwrap();

        let (status, updated) = send(
            &state,
            json_request(
                "PUT",
                &format!("/api/tasks/{}", task.id),
                json!({ "title": "New", "details": "d", "isCompleted": true }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], task.id);
        assert_eq!(updated["title"], "New");
        assert_eq!(updated["isCompleted"], true);
        assert_eq!(updated["createdAt"], task.created_at.to_rfc3339());
    }

    #[tokio::test]
    async fn update_unknown_task_is_not_found() {
        let state = build_state().await;

        let (status, _) = send(
            &state,
            json_request(
                "PUT",
                "/api/tasks/12345",
                json!({ "title": "x", "isCompleted": false }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_task_twice() {
        let state = build_state().await;
        let task = state.service().add("ToDelete", "D").await.unwrap();
        let uri = format!("/api/tasks/{}", task.id);

        let (status, _) = send(&state, empty_request("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&state, empty_request("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, listed) = send(&state, empty_request("GET", "/api/tasks")).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn requests_before_start_are_unavailable() {
        let service = TaskService::with_repository(Arc::new(InMemoryTaskStore::new()), None);
        let state = AppState::with_service(Arc::new(service), PathBuf::from("unused"));

        let (status, _) = send(&state, empty_request("GET", "/api/tasks")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
