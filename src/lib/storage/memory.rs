use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::core::{NewTodo, StorageError, Todo, TodoChanges, TodoCounts, TodoId};

use super::TodoRepository;

/// Process-local repository. Records are kept in creation order, so listing
/// is a reverse walk.
#[derive(Default)]
pub struct MemoryTodoRepository {
    todos: RwLock<Vec<Todo>>,
}

impl MemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn modify<F>(&self, id: TodoId, f: F) -> Option<Todo>
    where
        F: FnOnce(&mut Todo) + Send,
    {
        let mut todos = self.todos.write().await;
        let todo = todos.iter_mut().find(|t| t.id == id)?;
        f(todo);
        todo.updated_at = Utc::now().max(todo.created_at);
        Some(todo.clone())
    }
}

#[async_trait]
impl TodoRepository for MemoryTodoRepository {
    async fn insert(&self, todo: NewTodo) -> Result<Todo, StorageError> {
        let now = Utc::now();
        let todo = Todo {
            id: TodoId::new(),
            text: todo.text,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        self.todos.write().await.push(todo.clone());
        Ok(todo)
    }

    async fn find_all(&self) -> Result<Vec<Todo>, StorageError> {
        Ok(self.todos.read().await.iter().rev().cloned().collect())
    }

    async fn find_by_id(&self, id: TodoId) -> Result<Option<Todo>, StorageError> {
        Ok(self.todos.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn toggle(&self, id: TodoId) -> Result<Option<Todo>, StorageError> {
        Ok(self.modify(id, |t| t.completed = !t.completed).await)
    }

    async fn update(&self, id: TodoId, changes: TodoChanges) -> Result<Option<Todo>, StorageError> {
        Ok(self
            .modify(id, move |t| {
                if let Some(text) = changes.text {
                    t.text = text;
                }
                if let Some(completed) = changes.completed {
                    t.completed = completed;
                }
            })
            .await)
    }

    async fn delete(&self, id: TodoId) -> Result<Option<Todo>, StorageError> {
        let mut todos = self.todos.write().await;
        let index = todos.iter().position(|t| t.id == id);
        Ok(index.map(|i| todos.remove(i)))
    }

    async fn counts(&self) -> Result<TodoCounts, StorageError> {
        let todos = self.todos.read().await;
        Ok(TodoCounts {
            total: todos.len() as u64,
            completed: todos.iter().filter(|t| t.completed).count() as u64,
        })
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
