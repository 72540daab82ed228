use std::fmt::Write;

use crate::client::api::TodoApi;
use crate::client::app::TodoApp;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Renders the whole client state as plain text.
pub fn render<A: TodoApi>(app: &TodoApp<A>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📝 Todo List");

    if !app.error().is_empty() {
        let _ = writeln!(out, "❌ {}", app.error());
    }

    let todos = app.todos();
    if app.is_loading() && todos.is_empty() {
        let _ = writeln!(out, "Loading todos...");
        return out;
    }
    if todos.is_empty() {
        let _ = writeln!(out, "No todos yet. Add one above!");
        return out;
    }

    for (i, todo) in todos.iter().enumerate() {
        let mark = if todo.completed { "✓" } else { "○" };
        match app.editing() {
            Some(edit) if edit.id == todo.id => {
                let _ = writeln!(out, "{:>3}. {mark} ✏️  {}", i + 1, edit.text);
            }
            _ => {
                let _ = write!(
                    out,
                    "{:>3}. {mark} {}  (created {}",
                    i + 1,
                    todo.text,
                    todo.created_at.format(DATE_FORMAT)
                );
                if todo.was_edited() {
                    let _ = write!(out, ", updated {}", todo.updated_at.format(DATE_FORMAT));
                }
                let _ = writeln!(out, ")");
            }
        }
    }

    let stats = app.stats();
    let _ = writeln!(
        out,
        "Total: {} | Completed: {} | Pending: {} | {}% done",
        stats.total, stats.completed, stats.pending, stats.completion_rate
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::api::{ClientError, TodoApi};
    use crate::core::{Todo, TodoChanges, TodoId};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    struct Canned(Vec<Todo>);

    #[async_trait]
    impl TodoApi for Canned {
        async fn list(&self) -> Result<Vec<Todo>, ClientError> {
            Ok(self.0.clone())
        }
        async fn create(&self, _: &str) -> Result<Todo, ClientError> {
            unimplemented!()
        }
        async fn delete(&self, _: TodoId) -> Result<(), ClientError> {
            unimplemented!()
        }
        async fn toggle(&self, _: TodoId) -> Result<Todo, ClientError> {
            unimplemented!()
        }
        async fn update(&self, _: TodoId, _: &TodoChanges) -> Result<Todo, ClientError> {
            unimplemented!()
        }
    }

    #[test]
    fn empty_list_shows_placeholder() {
        let app = TodoApp::new(Canned(vec![]));
        assert!(render(&app).contains("No todos yet. Add one above!"));
    }

    #[tokio::test]
    async fn items_are_numbered_with_marks_and_footer() {
        let created = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
        let todos = vec![
            Todo {
                id: TodoId::new(),
                text: "ship it".into(),
                completed: true,
                created_at: created,
                updated_at: created + Duration::days(2),
            },
            Todo {
                id: TodoId::new(),
                text: "write tests".into(),
                completed: false,
                created_at: created,
                updated_at: created,
            },
        ];
        let mut app = TodoApp::new(Canned(todos));
        app.refresh().await.unwrap();
        let screen = render(&app);

        assert!(screen.contains("  1. ✓ ship it  (created 2026-10-01, updated 2026-10-03)"));
        assert!(screen.contains("  2. ○ write tests  (created 2026-10-01)"));
        assert!(screen.contains("Total: 2 | Completed: 1 | Pending: 1 | 50% done"));
    }
}
