pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::core::{NewTodo, StorageError, Todo, TodoChanges, TodoCounts, TodoId};

/// Persistence port for todos. Every method touches at most one record, except
/// the read-only `find_all` and `counts`.
#[async_trait]
pub trait TodoRepository: Send + Sync + 'static {
    /// Stores a new todo with a fresh id and `created_at == updated_at == now`.
    async fn insert(&self, todo: NewTodo) -> Result<Todo, StorageError>;
    /// All todos, newest-created first.
    async fn find_all(&self) -> Result<Vec<Todo>, StorageError>;
    async fn find_by_id(&self, id: TodoId) -> Result<Option<Todo>, StorageError>;
    async fn toggle(&self, id: TodoId) -> Result<Option<Todo>, StorageError>;
    async fn update(&self, id: TodoId, changes: TodoChanges) -> Result<Option<Todo>, StorageError>;
    /// Returns the removed record, or `None` if nothing matched.
    async fn delete(&self, id: TodoId) -> Result<Option<Todo>, StorageError>;
    async fn counts(&self) -> Result<TodoCounts, StorageError>;
    /// Cheap liveness check used by the health endpoint.
    async fn ping(&self) -> Result<(), StorageError>;
}
