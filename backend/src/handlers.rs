use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use shared::{Task, TaskCreateRequest, TaskUpdateRequest};

use crate::error::TaskError;
use crate::service::TaskService;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub title: String,
}

pub async fn post_task<S: TaskService>(
    State(service): State<S>,
    payload: Result<Json<TaskCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), TaskError> {
    let Json(request) = payload?;
    let task = service.post_task(request).await?;
    tracing::info!(id = task.id, "created task");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_all_tasks<S: TaskService>(
    State(service): State<S>,
) -> Result<Json<Vec<Task>>, TaskError> {
    Ok(Json(service.get_all_tasks().await?))
}

pub async fn get_task_overdue<S: TaskService>(
    State(service): State<S>,
) -> Result<Json<Vec<Task>>, TaskError> {
    Ok(Json(service.get_task_overdue().await?))
}

pub async fn get_task_by_id<S: TaskService>(
    Path(id): Path<String>,
    State(service): State<S>,
) -> Result<Json<Task>, TaskError> {
    Ok(Json(service.get_task_by_id(&id).await?))
}

pub async fn change_task_by_id<S: TaskService>(
    Path(id): Path<String>,
    State(service): State<S>,
    payload: Result<Json<TaskUpdateRequest>, JsonRejection>,
) -> Result<Json<Task>, TaskError> {
    let Json(request) = payload?;
    let task = service.change_task_by_id(&id, request).await?;
    tracing::info!(id = task.id, done = task.done, "updated task");
    Ok(Json(task))
}

pub async fn delete_task_by_id<S: TaskService>(
    Path(id): Path<String>,
    State(service): State<S>,
) -> Result<StatusCode, TaskError> {
    service.delete_task_by_id(&id).await?;
    tracing::info!(%id, "deleted task");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn find_tasks_by_title<S: TaskService>(
    Query(params): Query<SearchParams>,
    State(service): State<S>,
) -> Result<Json<Vec<Task>>, TaskError> {
    Ok(Json(service.find_tasks_by_title(&params.title).await?))
}

pub async fn get_tasks_for_today<S: TaskService>(
    State(service): State<S>,
) -> Result<Json<Vec<Task>>, TaskError> {
    Ok(Json(service.get_tasks_for_today().await?))
}
