use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    FromRow, Sqlite, SqlitePool,
    migrate::MigrateDatabase,
    sqlite::SqlitePoolOptions,
};
use tracing::{debug, info};

use crate::core::{NewTodo, StorageError, Todo, TodoChanges, TodoCounts, TodoId};
use crate::storage::TodoRepository;

const MAX_CONNECTIONS: u32 = 10;
const COLUMNS: &str = "id, text, completed, created_at, updated_at";

#[derive(Debug, FromRow)]
struct TodoRow {
    id: String,
    text: String,
    completed: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<TodoRow> for Todo {
    type Error = StorageError;

    fn try_from(row: TodoRow) -> Result<Self, Self::Error> {
        let id = row
            .id
            .parse::<TodoId>()
            .map_err(|e| StorageError::Corrupt(format!("id {}: {e}", row.id)))?;
        Ok(Todo {
            id,
            text: row.text,
            completed: row.completed,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StorageError::Corrupt(format!("timestamp {ms} out of range")))
}

#[derive(Clone)]
pub struct SqliteTodoRepository {
    pool: SqlitePool,
}

impl SqliteTodoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `url` and runs the schema
    /// migration. `acquire_timeout` bounds connection establishment.
    pub async fn connect(url: &str, acquire_timeout: Duration) -> Result<Self, sqlx::Error> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            info!(url, "Creating database");
            Sqlite::create_database(url).await?;
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        migrate(&pool).await?;
        info!(url, "Database connected");
        Ok(Self::new(pool))
    }

    /// A private in-memory database. The pool is pinned to one connection that
    /// never expires, since every SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS todos (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            text TEXT NOT NULL CHECK (length(trim(text)) > 0),
            completed INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL CHECK (updated_at >= created_at)
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[async_trait]
impl TodoRepository for SqliteTodoRepository {
    async fn insert(&self, todo: NewTodo) -> Result<Todo, StorageError> {
        let id = TodoId::new();
        let now = Utc::now().timestamp_millis();
        let row: TodoRow = sqlx::query_as(&format!(
            "INSERT INTO todos (id, text, completed, created_at, updated_at)
             VALUES (?, ?, 0, ?, ?)
             RETURNING {COLUMNS}"
        ))
        .bind(id.to_string())
        .bind(&todo.text)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        debug!(id = %id, "Inserted todo");
        row.try_into()
    }

    async fn find_all(&self) -> Result<Vec<Todo>, StorageError> {
        let rows: Vec<TodoRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM todos ORDER BY seq DESC"))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Todo::try_from).collect()
    }

    async fn find_by_id(&self, id: TodoId) -> Result<Option<Todo>, StorageError> {
        let row: Option<TodoRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM todos WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Todo::try_from).transpose()
    }

    async fn toggle(&self, id: TodoId) -> Result<Option<Todo>, StorageError> {
        let now = Utc::now().timestamp_millis();
        let row: Option<TodoRow> = sqlx::query_as(&format!(
            "UPDATE todos
             SET completed = NOT completed, updated_at = MAX(?, created_at)
             WHERE id = ?
             RETURNING {COLUMNS}"
        ))
        .bind(now)
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Todo::try_from).transpose()
    }

    async fn update(&self, id: TodoId, changes: TodoChanges) -> Result<Option<Todo>, StorageError> {
        let now = Utc::now().timestamp_millis();
        let row: Option<TodoRow> = sqlx::query_as(&format!(
            "UPDATE todos
             SET text = COALESCE(?, text),
                 completed = COALESCE(?, completed),
                 updated_at = MAX(?, created_at)
             WHERE id = ?
             RETURNING {COLUMNS}"
        ))
        .bind(changes.text)
        .bind(changes.completed)
        .bind(now)
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Todo::try_from).transpose()
    }

    async fn delete(&self, id: TodoId) -> Result<Option<Todo>, StorageError> {
        let row: Option<TodoRow> =
            sqlx::query_as(&format!("DELETE FROM todos WHERE id = ? RETURNING {COLUMNS}"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Todo::try_from).transpose()
    }

    async fn counts(&self) -> Result<TodoCounts, StorageError> {
        let (total, completed): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM todos")
                .fetch_one(&self.pool)
                .await?;
        Ok(TodoCounts {
            total: total as u64,
            completed: completed as u64,
        })
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> SqliteTodoRepository {
        SqliteTodoRepository::in_memory().await.unwrap()
    }

    fn new(text: &str) -> NewTodo {
        NewTodo { text: text.into() }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_equal_timestamps() {
        let repo = repo().await;
        let todo = repo.insert(new("buy milk")).await.unwrap();
        assert_eq!(todo.text, "buy milk");
        assert!(!todo.completed);
        assert_eq!(todo.created_at, todo.updated_at);
        assert_eq!(repo.find_by_id(todo.id).await.unwrap(), Some(todo));
    }

    #[tokio::test]
    async fn find_all_is_newest_first_across_deletes() {
        let repo = repo().await;
        let a = repo.insert(new("a")).await.unwrap();
        let b = repo.insert(new("b")).await.unwrap();
        repo.delete(a.id).await.unwrap();
        let c = repo.insert(new("c")).await.unwrap();
        let ids: Vec<_> = repo.find_all().await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![c.id, b.id]);
    }

    #[tokio::test]
    async fn toggle_and_update_refresh_updated_at() {
        let repo = repo().await;
        let todo = repo.insert(new("walk dog")).await.unwrap();

        let toggled = repo.toggle(todo.id).await.unwrap().unwrap();
        assert!(toggled.completed);
        assert!(toggled.updated_at >= toggled.created_at);
        assert_eq!(toggled.created_at, todo.created_at);

        let changes = TodoChanges { text: Some("walk cat".into()), completed: None };
        let updated = repo.update(todo.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.text, "walk cat");
        assert!(updated.completed);
        assert!(updated.updated_at >= toggled.updated_at);
    }

    #[tokio::test]
    async fn missing_ids_yield_none() {
        let repo = repo().await;
        let ghost = TodoId::new();
        assert!(repo.toggle(ghost).await.unwrap().is_none());
        assert!(repo.delete(ghost).await.unwrap().is_none());
        assert!(repo.update(ghost, TodoChanges::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn counts_track_completion() {
        let repo = repo().await;
        assert_eq!(repo.counts().await.unwrap(), TodoCounts::default());
        let a = repo.insert(new("a")).await.unwrap();
        repo.insert(new("b")).await.unwrap();
        repo.toggle(a.id).await.unwrap();
        assert_eq!(repo.counts().await.unwrap(), TodoCounts { total: 2, completed: 1 });
        repo.ping().await.unwrap();
    }

    #[tokio::test]
    async fn connect_creates_the_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("todos.db").display());
        let repo = SqliteTodoRepository::connect(&url, Duration::from_secs(5))
            .await
            .unwrap();
        repo.insert(new("persisted")).await.unwrap();
        repo.close().await;

        let reopened = SqliteTodoRepository::connect(&url, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(reopened.find_all().await.unwrap().len(), 1);
    }
}
