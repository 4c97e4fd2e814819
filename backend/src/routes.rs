//! Route table.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | POST | /tasks | `post_task` |
//! | GET | /tasks | `get_all_tasks` |
//! | GET | /tasks/overdue | `get_task_overdue` |
//! | GET | /tasks/search?title= | `find_tasks_by_title` |
//! | GET | /tasks/today | `get_tasks_for_today` |
//! | GET | /tasks/:id | `get_task_by_id` |
//! | PUT | /tasks/:id | `change_task_by_id` |
//! | DELETE | /tasks/:id | `delete_task_by_id` |
//! | GET | /health | `health` |
//!
//! Static segments win over `:id`, so `/tasks/today` never reaches
//! `get_task_by_id`.

use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::handlers::{
    change_task_by_id, delete_task_by_id, find_tasks_by_title, get_all_tasks, get_task_by_id,
    get_task_overdue, get_tasks_for_today, post_task,
};
use crate::service::TaskService;

pub fn router<S: TaskService>(service: S) -> Router {
    Router::new()
        .route("/tasks", get(get_all_tasks::<S>).post(post_task::<S>))
        .route("/tasks/overdue", get(get_task_overdue::<S>))
        .route("/tasks/search", get(find_tasks_by_title::<S>))
        .route("/tasks/today", get(get_tasks_for_today::<S>))
        .route(
            "/tasks/:id",
            get(get_task_by_id::<S>)
                .put(change_task_by_id::<S>)
                .delete(delete_task_by_id::<S>),
        )
        .route("/health", get(health))
        .with_state(service)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
