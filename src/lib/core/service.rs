use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::core::error::AppError;
use crate::core::validation::{validate_changes, validate_id, validate_new_todo};
use crate::core::{Todo, TodoCounts};
use crate::storage::TodoRepository;

/// Application service: validates requests, then performs exactly one
/// repository call. Validation failures never reach storage.
pub struct TodoService<R: TodoRepository> {
    repo: Arc<R>,
}

impl<R: TodoRepository> Clone for TodoService<R> {
    fn clone(&self) -> Self {
        Self { repo: Arc::clone(&self.repo) }
    }
}

impl<R: TodoRepository> TodoService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo: Arc::new(repo) }
    }

    pub async fn get_all(&self) -> Result<Vec<Todo>, AppError> {
        self.repo
            .find_all()
            .await
            .map_err(|e| AppError::storage("Failed to fetch todos", e))
    }

    pub async fn create(&self, body: &Value) -> Result<Todo, AppError> {
        let new_todo = validate_new_todo(body)?;
        let todo = self
            .repo
            .insert(new_todo)
            .await
            .map_err(|e| AppError::storage("Failed to create todo", e))?;
        info!(id = %todo.id, "Todo created");
        Ok(todo)
    }

    pub async fn delete(&self, raw_id: &str) -> Result<Todo, AppError> {
        let id = validate_id(raw_id)?;
        let todo = self
            .repo
            .delete(id)
            .await
            .map_err(|e| AppError::storage("Failed to delete todo", e))?
            .ok_or(AppError::NotFound)?;
        info!(id = %id, "Todo deleted");
        Ok(todo)
    }

    pub async fn toggle(&self, raw_id: &str) -> Result<Todo, AppError> {
        let id = validate_id(raw_id)?;
        self.repo
            .toggle(id)
            .await
            .map_err(|e| AppError::storage("Failed to update todo", e))?
            .ok_or(AppError::NotFound)
    }

    pub async fn update(&self, raw_id: &str, body: &Value) -> Result<Todo, AppError> {
        let id = validate_id(raw_id)?;
        let changes = validate_changes(body)?;
        self.repo
            .update(id, changes)
            .await
            .map_err(|e| AppError::storage("Failed to update todo", e))?
            .ok_or(AppError::NotFound)
    }

    pub async fn stats(&self) -> Result<TodoCounts, AppError> {
        self.repo
            .counts()
            .await
            .map_err(|e| AppError::storage("Failed to fetch todo stats", e))
    }

    pub async fn database_ready(&self) -> bool {
        self.repo.ping().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ValidationError;
    use crate::storage::memory::MemoryTodoRepository;
    use serde_json::json;

    fn service() -> TodoService<MemoryTodoRepository> {
        TodoService::new(MemoryTodoRepository::new())
    }

    #[tokio::test]
    async fn create_sanitizes_and_persists() {
        let svc = service();
        let todo = svc.create(&json!({"text": "  a <b>c</b>  "})).await.unwrap();
        assert_eq!(todo.text, "a bc/b");
        assert_eq!(svc.get_all().await.unwrap(), vec![todo]);
    }

    #[tokio::test]
    async fn rejected_input_writes_nothing() {
        let svc = service();
        for body in [
            json!({}),
            json!({"text": "   "}),
            json!({"text": "x".repeat(501)}),
            json!({"text": "<script>alert(1)</script>"}),
        ] {
            let err = svc.create(&body).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{body}");
        }
        assert!(svc.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_distinguishes_malformed_and_missing_ids() {
        let svc = service();
        assert!(matches!(
            svc.delete("not-an-id").await,
            Err(AppError::Validation(ValidationError::InvalidId))
        ));
        let absent = crate::core::TodoId::new().to_string();
        assert!(matches!(svc.delete(&absent).await, Err(AppError::NotFound)));

        let todo = svc.create(&json!({"text": "gone soon"})).await.unwrap();
        svc.delete(&todo.id.to_string()).await.unwrap();
        assert!(svc.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_update_and_stats() {
        let svc = service();
        let todo = svc.create(&json!({"text": "read"})).await.unwrap();
        let id = todo.id.to_string();

        assert!(svc.toggle(&id).await.unwrap().completed);
        let updated = svc.update(&id, &json!({"text": "read book"})).await.unwrap();
        assert_eq!(updated.text, "read book");
        assert!(updated.completed);

        let stats = svc.stats().await.unwrap();
        assert_eq!((stats.total, stats.completed, stats.pending()), (1, 1, 0));
        assert!(svc.database_ready().await);
    }
}
