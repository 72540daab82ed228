use tracing::debug;

use crate::client::api::{ClientError, TodoApi};
use crate::core::{Todo, TodoChanges, TodoId, TodoStats};

/// A todo whose text is being edited in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    pub id: TodoId,
    pub text: String,
}

/// Marks an action as in flight until dropped, so an action whose future is
/// cancelled midway still releases the client.
struct InFlight<'a>(&'a mut bool);

impl<'a> InFlight<'a> {
    fn start(loading: &'a mut bool) -> Result<Self, ClientError> {
        if *loading {
            return Err(ClientError::Busy);
        }
        *loading = true;
        Ok(Self(loading))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Client state mirrored from the service. The server's answer is always
/// authoritative: local state only changes after a successful call, and a
/// failed call only sets `error`.
pub struct TodoApp<A: TodoApi> {
    api: A,
    todos: Vec<Todo>,
    input: String,
    loading: bool,
    error: String,
    editing: Option<EditBuffer>,
}

impl<A: TodoApi> TodoApp<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            todos: Vec::new(),
            input: String::new(),
            loading: false,
            error: String::new(),
            editing: None,
        }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn editing(&self) -> Option<&EditBuffer> {
        self.editing.as_ref()
    }

    pub fn stats(&self) -> TodoStats {
        TodoStats::of(&self.todos)
    }

    /// 1-based lookup, as items are numbered on screen.
    pub fn id_at(&self, position: usize) -> Result<TodoId, ClientError> {
        position
            .checked_sub(1)
            .and_then(|i| self.todos.get(i))
            .map(|t| t.id)
            .ok_or(ClientError::NoSuchItem(position))
    }

    fn finish<T>(
        &mut self,
        result: Result<T, ClientError>,
        context: &str,
    ) -> Result<T, ClientError> {
        match &result {
            Ok(_) => self.error.clear(),
            Err(e) => {
                debug!(error = %e, "{context}");
                self.error = format!("{context}: {e}");
            }
        }
        result
    }

    fn replace(&mut self, todo: Todo) {
        if let Some(slot) = self.todos.iter_mut().find(|t| t.id == todo.id) {
            *slot = todo;
        }
    }

    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let result = {
            let _in_flight = InFlight::start(&mut self.loading)?;
            self.api.list().await
        };
        self.todos = self.finish(result, "Error fetching todos")?;
        Ok(())
    }

    /// Sends the trimmed input buffer. Blank input is ignored without a call.
    pub async fn submit(&mut self) -> Result<(), ClientError> {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return Ok(());
        }
        let result = {
            let _in_flight = InFlight::start(&mut self.loading)?;
            self.api.create(&text).await
        };
        let created = self.finish(result, "Error creating todo")?;
        self.todos.insert(0, created);
        self.input.clear();
        Ok(())
    }

    pub async fn delete(&mut self, id: TodoId) -> Result<(), ClientError> {
        let result = {
            let _in_flight = InFlight::start(&mut self.loading)?;
            self.api.delete(id).await
        };
        self.finish(result, "Error deleting todo")?;
        self.todos.retain(|t| t.id != id);
        if self.editing.as_ref().is_some_and(|e| e.id == id) {
            self.editing = None;
        }
        Ok(())
    }

    pub async fn toggle(&mut self, id: TodoId) -> Result<(), ClientError> {
        let result = {
            let _in_flight = InFlight::start(&mut self.loading)?;
            self.api.toggle(id).await
        };
        let toggled = self.finish(result, "Error updating todo")?;
        self.replace(toggled);
        Ok(())
    }

    pub fn begin_edit(&mut self, id: TodoId) -> Result<(), ClientError> {
        let todo = self
            .todos
            .iter()
            .find(|t| t.id == id)
            .ok_or(ClientError::NotEditing)?;
        self.editing = Some(EditBuffer {
            id,
            text: todo.text.clone(),
        });
        Ok(())
    }

    pub fn set_edit_text(&mut self, text: impl Into<String>) -> Result<(), ClientError> {
        let buffer = self.editing.as_mut().ok_or(ClientError::NotEditing)?;
        buffer.text = text.into();
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Saves the edit buffer. Blank text is refused locally and leaves the
    /// buffer open.
    pub async fn save_edit(&mut self) -> Result<(), ClientError> {
        let buffer = self.editing.clone().ok_or(ClientError::NotEditing)?;
        let text = buffer.text.trim();
        if text.is_empty() {
            self.error = ClientError::EmptyText.to_string();
            return Err(ClientError::EmptyText);
        }
        let changes = TodoChanges {
            text: Some(text.to_string()),
            completed: None,
        };
        let result = {
            let _in_flight = InFlight::start(&mut self.loading)?;
            self.api.update(buffer.id, &changes).await
        };
        let updated = self.finish(result, "Error updating todo")?;
        self.replace(updated);
        self.editing = None;
        Ok(())
    }
}
