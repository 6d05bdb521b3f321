/// HTTP backend tests
///
/// Drives `HttpRemote` and a task store against a small axum server bound
/// to an ephemeral local port.
/// Run with: cargo test --test http_remote_tests

use axum::extract::{Path, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::{Arc, Mutex};
use taskstate::{
    Entity, EntityStore, HttpRemote, HttpRemoteConfig, LoadOutcome, RemoteError, RemoteResource,
    StoreError, Task, TaskDraft, TaskPatch, TaskStatus, TaskStore,
};
use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};

const TOKEN: &str = "secret-token";

struct Backend {
    tasks: Vec<Task>,
    next_id: u64,
}

type Shared = Arc<Mutex<Backend>>;
type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: &str, code: &str) -> ApiError {
    (status, Json(json!({ "error": message, "code": code })))
}

async fn require_token(request: Request, next: Next) -> Response {
    let expected = format!("Bearer {TOKEN}");
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected);
    if !authorized {
        return api_error(StatusCode::UNAUTHORIZED, "missing token", "unauthorized").into_response();
    }
    next.run(request).await
}

async fn list_tasks(State(backend): State<Shared>) -> Json<serde_json::Value> {
    let backend = backend.lock().unwrap();
    Json(json!({ "data": backend.tasks }))
}

async fn create_task(
    State(backend): State<Shared>,
    Json(draft): Json<TaskDraft>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    if draft.title.trim().is_empty() {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "title must not be empty",
            "validation",
        ));
    }
    let mut backend = backend.lock().unwrap();
    let task = Task::from_draft(format!("srv-{}", backend.next_id), &draft);
    backend.next_id += 1;
    backend.tasks.push(task.clone());
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(backend): State<Shared>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let backend = backend.lock().unwrap();
    backend
        .tasks
        .iter()
        .find(|task| task.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "no such task", "not_found"))
}

async fn update_task(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    let mut backend = backend.lock().unwrap();
    let task = backend
        .tasks
        .iter_mut()
        .find(|task| task.id == id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "no such task", "not_found"))?;
    task.apply_patch(&patch);
    Ok(Json(task.clone()))
}

async fn delete_task(State(backend): State<Shared>, Path(id): Path<String>) -> Response {
    if id == "locked" {
        return Json(json!({ "success": false })).into_response();
    }
    let mut backend = backend.lock().unwrap();
    let before = backend.tasks.len();
    backend.tasks.retain(|task| task.id != id);
    if backend.tasks.len() == before {
        return api_error(StatusCode::NOT_FOUND, "no such task", "not_found").into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn spawn_server(tasks: Vec<Task>) -> (String, Shared) {
    let backend = Arc::new(Mutex::new(Backend { tasks, next_id: 1 }));
    let app = Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/:id",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .layer(middleware::from_fn(require_token))
        .with_state(Arc::clone(&backend));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/api"), backend)
}

fn seeded() -> Vec<Task> {
    vec![
        Task::from_draft("1", &TaskDraft::new("Write report")),
        Task::from_draft("locked", &TaskDraft::new("Pinned").status(TaskStatus::Done)),
    ]
}

fn store_for(base_url: &str) -> TaskStore {
    let config = HttpRemoteConfig::new(base_url, "tasks").auth_token(TOKEN);
    EntityStore::new(HttpRemote::<Task>::new(config).unwrap())
}

#[tokio::test]
async fn test_store_round_trip_over_http() {
    let (base_url, backend) = spawn_server(seeded()).await;
    let store = store_for(&base_url);

    assert_eq!(store.load().await, Ok(LoadOutcome::Loaded { count: 2 }));
    assert_eq!(store.count_by_status(TaskStatus::Done).get(), 1);

    let created = assert_ok!(
        store
            .create(TaskDraft::new("Review PR").description("before lunch"))
            .await
    );
    assert_eq!(created.id, "srv-1");
    assert_eq!(created.description.as_deref(), Some("before lunch"));

    let updated = assert_ok!(
        store
            .update("srv-1", TaskPatch::status(TaskStatus::InProgress))
            .await
    );
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert_eq!(
        store.get_by_id("srv-1").map(|task| task.status),
        Some(TaskStatus::InProgress)
    );

    assert_ok!(store.delete("1").await);
    let ids: Vec<String> = store.snapshot().iter().map(|task| task.id.clone()).collect();
    assert_eq!(ids, vec!["locked", "srv-1"]);

    let server_ids: Vec<String> = backend
        .lock()
        .unwrap()
        .tasks
        .iter()
        .map(|task| task.id.clone())
        .collect();
    assert_eq!(server_ids, ids);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (base_url, _backend) = spawn_server(seeded()).await;
    let remote: HttpRemote<Task> = HttpRemote::new(HttpRemoteConfig::new(&base_url, "tasks")).unwrap();

    let error = assert_err!(remote.fetch_all().await);
    assert_eq!(error, RemoteError::Unauthorized);

    let store = EntityStore::new(remote);
    let error = assert_err!(store.load().await);
    assert_eq!(
        error,
        StoreError::LoadFailed("tasks: your session has expired, please sign in again".into())
    );
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_unknown_id_maps_to_not_found() {
    let (base_url, _backend) = spawn_server(seeded()).await;
    let store = store_for(&base_url);

    let error = assert_err!(store.fetch_by_id("nope").await);
    assert_eq!(error, StoreError::NotFound("task 'nope'".into()));

    let fetched = assert_ok!(store.fetch_by_id("1").await);
    assert_eq!(fetched.title, "Write report");
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_validation_error_message_reaches_the_store() {
    let (base_url, backend) = spawn_server(seeded()).await;
    let store = store_for(&base_url);
    assert_ok!(store.load().await);
    let before = store.snapshot().to_vec();

    let error = assert_err!(store.create(TaskDraft::new("   ")).await);
    assert_eq!(
        error,
        StoreError::CreateFailed(
            "task: the server refused the change: title must not be empty".into()
        )
    );
    assert_eq!(store.snapshot().to_vec(), before);
    assert_eq!(backend.lock().unwrap().tasks.len(), 2);
}

#[tokio::test]
async fn test_unconfirmed_delete_rolls_back() {
    let (base_url, _backend) = spawn_server(seeded()).await;
    let store = store_for(&base_url);
    assert_ok!(store.load().await);

    let error = assert_err!(store.delete("locked").await);
    assert!(matches!(error, StoreError::DeleteFailed(_)));
    assert!(error.to_string().contains("did not confirm"));
    assert!(store.get_by_id("locked").is_some());
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = store_for(&format!("http://{addr}/api"));
    let error = assert_err!(store.load().await);
    assert_eq!(
        error,
        StoreError::LoadFailed("tasks: the server could not be reached (connection refused)".into())
    );
    assert!(!store.is_loading().get());
}
