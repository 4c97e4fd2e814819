use std::future::Future;

use chrono::Utc;
use shared::{Task, TaskCreateRequest, TaskUpdateRequest};

use crate::error::TaskError;
use crate::repository::{NewTask, TaskPatch, TaskRepository};

/// Business rules between the HTTP layer and the repository: defaults,
/// id parsing and the wall-clock reads behind "overdue" and "today".
pub trait TaskService: Clone + Send + Sync + 'static {
    fn post_task(
        &self,
        request: TaskCreateRequest,
    ) -> impl Future<Output = Result<Task, TaskError>> + Send;

    fn get_all_tasks(&self) -> impl Future<Output = Result<Vec<Task>, TaskError>> + Send;

    fn get_task_overdue(&self) -> impl Future<Output = Result<Vec<Task>, TaskError>> + Send;

    fn get_task_by_id(&self, id: &str) -> impl Future<Output = Result<Task, TaskError>> + Send;

    fn change_task_by_id(
        &self,
        id: &str,
        request: TaskUpdateRequest,
    ) -> impl Future<Output = Result<Task, TaskError>> + Send;

    fn delete_task_by_id(&self, id: &str) -> impl Future<Output = Result<(), TaskError>> + Send;

    fn find_tasks_by_title(
        &self,
        title: &str,
    ) -> impl Future<Output = Result<Vec<Task>, TaskError>> + Send;

    fn get_tasks_for_today(&self) -> impl Future<Output = Result<Vec<Task>, TaskError>> + Send;
}

#[derive(Clone)]
pub struct TaskManager<R> {
    repo: R,
}

impl<R: TaskRepository> TaskManager<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }
}

fn parse_id(raw: &str) -> Result<u64, TaskError> {
    raw.parse::<u64>()
        .map_err(|_| TaskError::InvalidId(raw.to_string()))
}

impl From<TaskUpdateRequest> for TaskPatch {
    fn from(request: TaskUpdateRequest) -> Self {
        TaskPatch {
            title: request.title,
            content: request.content,
            deadline: request.deadline,
            done: request.done,
        }
    }
}

impl<R> TaskService for TaskManager<R>
where
    R: TaskRepository + Clone + 'static,
{
    async fn post_task(&self, request: TaskCreateRequest) -> Result<Task, TaskError> {
        let task = NewTask {
            title: request.title,
            content: request.content,
            deadline: request.deadline,
            done: false,
        };
        self.repo.create(task).await
    }

    async fn get_all_tasks(&self) -> Result<Vec<Task>, TaskError> {
        self.repo.list_all().await
    }

    async fn get_task_overdue(&self) -> Result<Vec<Task>, TaskError> {
        self.repo.list_overdue(Utc::now()).await
    }

    async fn get_task_by_id(&self, id: &str) -> Result<Task, TaskError> {
        self.repo.get_by_id(parse_id(id)?).await
    }

    async fn change_task_by_id(
        &self,
        id: &str,
        request: TaskUpdateRequest,
    ) -> Result<Task, TaskError> {
        let id = parse_id(id)?;
        self.repo.update_by_id(id, request.into()).await
    }

    async fn delete_task_by_id(&self, id: &str) -> Result<(), TaskError> {
        self.repo.delete_by_id(parse_id(id)?).await
    }

    async fn find_tasks_by_title(&self, title: &str) -> Result<Vec<Task>, TaskError> {
        self.repo.find_by_title(format!("%{title}%")).await
    }

    async fn get_tasks_for_today(&self) -> Result<Vec<Task>, TaskError> {
        self.repo.find_by_date(Utc::now().date_naive()).await
    }
}
