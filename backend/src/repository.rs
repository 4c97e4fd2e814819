use std::future::Future;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use shared::Task;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::TaskError;

const COLUMNS: &str = "id, title, content, deadline, done, created_at";

/// A task that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub content: String,
    pub deadline: Option<DateTime<Utc>>,
    pub done: bool,
}

/// Sparse update: `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub done: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.deadline.is_none() && self.done.is_none()
    }
}

/// Persistence operations on the `tasks` table. Holds no business rules.
pub trait TaskRepository: Send + Sync {
    fn create(&self, task: NewTask) -> impl Future<Output = Result<Task, TaskError>> + Send;

    fn list_all(&self) -> impl Future<Output = Result<Vec<Task>, TaskError>> + Send;

    /// Open tasks whose deadline is strictly before `as_of`.
    fn list_overdue(
        &self,
        as_of: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Task>, TaskError>> + Send;

    fn get_by_id(&self, id: u64) -> impl Future<Output = Result<Task, TaskError>> + Send;

    /// Applies `patch` to the row with `id`, then reads it back.
    ///
    /// The write and the read are separate statements, so a concurrent writer
    /// can make the returned row newer than the one just written.
    fn update_by_id(
        &self,
        id: u64,
        patch: TaskPatch,
    ) -> impl Future<Output = Result<Task, TaskError>> + Send;

    fn delete_by_id(&self, id: u64) -> impl Future<Output = Result<(), TaskError>> + Send;

    /// `pattern` is handed to `LIKE` as-is; callers add the wildcards.
    fn find_by_title(
        &self,
        pattern: String,
    ) -> impl Future<Output = Result<Vec<Task>, TaskError>> + Send;

    /// Tasks whose deadline falls on `date`, ignoring the time of day.
    fn find_by_date(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<Task>, TaskError>> + Send;
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    content: String,
    deadline: Option<DateTime<Utc>>,
    done: bool,
    created_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            // AUTOINCREMENT keys start at 1
            id: row.id as u64,
            title: row.title,
            content: row.content,
            deadline: row.deadline,
            done: row.done,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct SqlTaskRepository {
    pool: SqlitePool,
}

impl SqlTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_tasks(&self, sql: &str) -> Result<Vec<Task>, TaskError> {
        let rows = sqlx::query_as::<_, TaskRow>(sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }
}

/// Timestamps are stored as fixed-width RFC 3339 text (nanoseconds, `Z`
/// suffix) so that plain text comparison orders them exactly.
fn stored_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Ids beyond `i64::MAX` cannot exist in SQLite.
fn row_id(id: u64) -> Result<i64, TaskError> {
    i64::try_from(id).map_err(|_| TaskError::NotFound(id))
}

impl TaskRepository for SqlTaskRepository {
    async fn create(&self, task: NewTask) -> Result<Task, TaskError> {
        let sql = format!(
            "INSERT INTO tasks (title, content, deadline, done, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(task.title)
            .bind(task.content)
            .bind(task.deadline.map(stored_timestamp))
            .bind(task.done)
            .bind(stored_timestamp(Utc::now()))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn list_all(&self) -> Result<Vec<Task>, TaskError> {
        self.fetch_tasks(&format!("SELECT {COLUMNS} FROM tasks ORDER BY id"))
            .await
    }

    async fn list_overdue(&self, as_of: DateTime<Utc>) -> Result<Vec<Task>, TaskError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM tasks \
             WHERE done = 0 AND deadline IS NOT NULL AND deadline < ? \
             ORDER BY id"
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(stored_timestamp(as_of))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn get_by_id(&self, id: u64) -> Result<Task, TaskError> {
        let sql = format!("SELECT {COLUMNS} FROM tasks WHERE id = ?");
        sqlx::query_as::<_, TaskRow>(&sql)
            .bind(row_id(id)?)
            .fetch_optional(&self.pool)
            .await?
            .map(Task::from)
            .ok_or(TaskError::NotFound(id))
    }

    async fn update_by_id(&self, id: u64, patch: TaskPatch) -> Result<Task, TaskError> {
        if patch.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE tasks SET ");
        let mut fields = builder.separated(", ");
        if let Some(title) = patch.title {
            fields.push("title = ").push_bind_unseparated(title);
        }
        if let Some(content) = patch.content {
            fields.push("content = ").push_bind_unseparated(content);
        }
        if let Some(deadline) = patch.deadline {
            fields
                .push("deadline = ")
                .push_bind_unseparated(stored_timestamp(deadline));
        }
        if let Some(done) = patch.done {
            fields.push("done = ").push_bind_unseparated(done);
        }
        builder.push(" WHERE id = ").push_bind(row_id(id)?);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(TaskError::NotFound(id));
        }
        self.get_by_id(id).await
    }

    async fn delete_by_id(&self, id: u64) -> Result<(), TaskError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(row_id(id)?)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TaskError::NotFound(id));
        }
        Ok(())
    }

    async fn find_by_title(&self, pattern: String) -> Result<Vec<Task>, TaskError> {
        let sql = format!("SELECT {COLUMNS} FROM tasks WHERE title LIKE ? ORDER BY id");
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Task>, TaskError> {
        let sql = format!("SELECT {COLUMNS} FROM tasks WHERE date(deadline) = ? ORDER BY id");
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(date.format("%Y-%m-%d").to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::{Duration, TimeZone};

    async fn repository() -> SqlTaskRepository {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        db::migrate(&pool).await.unwrap();
        SqlTaskRepository::new(pool)
    }

    fn new_task(title: &str, deadline: Option<DateTime<Utc>>, done: bool) -> NewTask {
        NewTask {
            title: title.to_string(),
            content: format!("{title} content"),
            deadline,
            done,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_created_at() {
        let repo = repository().await;
        let deadline = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let before = Utc::now() - Duration::seconds(1);

        let first = repo.create(new_task("first", Some(deadline), false)).await.unwrap();
        let second = repo.create(new_task("second", None, false)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.deadline, Some(deadline));
        assert!(second.deadline.is_none());
        assert!(!first.done);
        assert!(first.created_at >= before);
    }

    #[tokio::test]
    async fn list_all_returns_rows_in_insertion_order() {
        let repo = repository().await;
        for title in ["a", "b", "c"] {
            repo.create(new_task(title, None, false)).await.unwrap();
        }

        let titles: Vec<String> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|task| task.title)
            .collect();
        assert_eq!(titles, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn get_by_id_reports_missing_rows() {
        let repo = repository().await;
        let created = repo.create(new_task("a", None, false)).await.unwrap();

        assert_eq!(repo.get_by_id(created.id).await.unwrap(), created);
        assert!(matches!(repo.get_by_id(99).await, Err(TaskError::NotFound(99))));
        assert!(matches!(
            repo.get_by_id(u64::MAX).await,
            Err(TaskError::NotFound(u64::MAX))
        ));
    }

    #[tokio::test]
    async fn list_overdue_skips_done_and_future_tasks() {
        let repo = repository().await;
        let as_of = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        let late = repo
            .create(new_task("late", Some(as_of - Duration::days(1)), false))
            .await
            .unwrap();
        repo.create(new_task("late but done", Some(as_of - Duration::days(1)), true))
            .await
            .unwrap();
        repo.create(new_task("exactly now", Some(as_of), false)).await.unwrap();
        repo.create(new_task("upcoming", Some(as_of + Duration::hours(1)), false))
            .await
            .unwrap();
        repo.create(new_task("no deadline", None, false)).await.unwrap();

        let overdue = repo.list_overdue(as_of).await.unwrap();
        assert_eq!(overdue, vec![late]);
    }

    #[tokio::test]
    async fn list_overdue_separates_microseconds() {
        let repo = repository().await;
        let as_of = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + Duration::microseconds(300);

        let just_late = repo
            .create(new_task("just late", Some(as_of - Duration::microseconds(1)), false))
            .await
            .unwrap();
        repo.create(new_task("just early", Some(as_of + Duration::microseconds(1)), false))
            .await
            .unwrap();

        assert_eq!(repo.list_overdue(as_of).await.unwrap(), vec![just_late]);
    }

    #[tokio::test]
    async fn timestamps_are_stored_fixed_width() {
        let repo = repository().await;
        let deadline = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let created = repo.create(new_task("a", Some(deadline), false)).await.unwrap();

        let (stored,): (String,) = sqlx::query_as("SELECT deadline FROM tasks WHERE id = ?")
            .bind(created.id as i64)
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(stored, "2025-06-01T12:00:00.000000000Z");
        assert_eq!(created.deadline, Some(deadline));
    }

    #[tokio::test]
    async fn update_changes_only_present_fields() {
        let repo = repository().await;
        let deadline = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let created = repo.create(new_task("a", Some(deadline), false)).await.unwrap();
        let other = repo.create(new_task("b", None, false)).await.unwrap();

        let patch = TaskPatch {
            done: Some(true),
            ..TaskPatch::default()
        };
        let updated = repo.update_by_id(created.id, patch).await.unwrap();

        assert!(updated.done);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.content, created.content);
        assert_eq!(updated.deadline, created.deadline);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(repo.get_by_id(other.id).await.unwrap(), other);
    }

    #[tokio::test]
    async fn update_sets_every_field() {
        let repo = repository().await;
        let created = repo.create(new_task("a", None, false)).await.unwrap();
        let deadline = Utc.with_ymd_and_hms(2030, 3, 4, 5, 6, 7).unwrap();

        let updated = repo
            .update_by_id(
                created.id,
                TaskPatch {
                    title: Some("renamed".to_string()),
                    content: Some("rewritten".to_string()),
                    deadline: Some(deadline),
                    done: Some(true),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.content, "rewritten");
        assert_eq!(updated.deadline, Some(deadline));
        assert!(updated.done);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let repo = repository().await;
        let patch = TaskPatch {
            done: Some(true),
            ..TaskPatch::default()
        };

        assert!(matches!(
            repo.update_by_id(5, patch).await,
            Err(TaskError::NotFound(5))
        ));
        assert!(matches!(
            repo.update_by_id(5, TaskPatch::default()).await,
            Err(TaskError::NotFound(5))
        ));
    }

    #[tokio::test]
    async fn delete_removes_row_once() {
        let repo = repository().await;
        let created = repo.create(new_task("a", None, false)).await.unwrap();

        repo.delete_by_id(created.id).await.unwrap();

        assert!(matches!(repo.get_by_id(created.id).await, Err(TaskError::NotFound(_))));
        assert!(matches!(
            repo.delete_by_id(created.id).await,
            Err(TaskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn find_by_title_uses_like_pattern() {
        let repo = repository().await;
        let hit = repo.create(new_task("xfooy", None, false)).await.unwrap();
        repo.create(new_task("bar", None, false)).await.unwrap();

        assert_eq!(repo.find_by_title("%foo%".to_string()).await.unwrap(), vec![hit]);
        assert!(repo.find_by_title("foo".to_string()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_by_date_ignores_time_of_day() {
        let repo = repository().await;
        let morning = repo
            .create(new_task(
                "morning",
                Some(Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap()),
                false,
            ))
            .await
            .unwrap();
        let evening = repo
            .create(new_task(
                "evening",
                Some(Utc.with_ymd_and_hms(2025, 3, 10, 23, 59, 59).unwrap()),
                true,
            ))
            .await
            .unwrap();
        repo.create(new_task(
            "next day",
            Some(Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap()),
            false,
        ))
        .await
        .unwrap();
        repo.create(new_task("undated", None, false)).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(repo.find_by_date(date).await.unwrap(), vec![morning, evening]);
    }
}
