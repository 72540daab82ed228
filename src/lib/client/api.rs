use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::adapters::DeleteConfirmation;
use crate::core::{ErrorBody, Todo, TodoChanges, TodoId, TodoStats};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{message}")]
    Api { status: StatusCode, message: String },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("Todo text cannot be empty")]
    EmptyText,
    #[error("Another request is still in progress")]
    Busy,
    #[error("No todo is being edited")]
    NotEditing,
    #[error("No todo at position {0}")]
    NoSuchItem(usize),
}

/// The operations the client needs from the service.
#[async_trait]
pub trait TodoApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Todo>, ClientError>;
    async fn create(&self, text: &str) -> Result<Todo, ClientError>;
    async fn delete(&self, id: TodoId) -> Result<(), ClientError>;
    async fn toggle(&self, id: TodoId) -> Result<Todo, ClientError>;
    async fn update(&self, id: TodoId, changes: &TodoChanges) -> Result<Todo, ClientError>;
}

#[derive(Clone)]
pub struct HttpTodoApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTodoApi {
    /// `base_url` is the service root, e.g. `http://localhost:3001`.
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn todos_url(&self) -> String {
        format!("{}/api/todos", self.base_url)
    }

    fn todo_url(&self, id: TodoId) -> String {
        format!("{}/api/todos/{id}", self.base_url)
    }

    pub async fn stats(&self) -> Result<TodoStats, ClientError> {
        let response = self.http.get(format!("{}/stats", self.todos_url())).send().await?;
        Ok(check(response).await?.json().await?)
    }
}

/// Turns a non-2xx response into `ClientError::Api`, preferring the server's
/// own error text.
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(ErrorBody { error, details: Some(details) }) if !details.is_empty() => {
            format!("{error}: {}", details.join(", "))
        }
        Ok(ErrorBody { error, .. }) => error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };
    Err(ClientError::Api { status, message })
}

#[async_trait]
impl TodoApi for HttpTodoApi {
    async fn list(&self) -> Result<Vec<Todo>, ClientError> {
        let response = self.http.get(self.todos_url()).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn create(&self, text: &str) -> Result<Todo, ClientError> {
        let response = self
            .http
            .post(self.todos_url())
            .json(&json!({ "text": text }))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn delete(&self, id: TodoId) -> Result<(), ClientError> {
        let response = self.http.delete(self.todo_url(id)).send().await?;
        let _: DeleteConfirmation = check(response).await?.json().await?;
        Ok(())
    }

    async fn toggle(&self, id: TodoId) -> Result<Todo, ClientError> {
        let response = self
            .http
            .patch(format!("{}/toggle", self.todo_url(id)))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn update(&self, id: TodoId, changes: &TodoChanges) -> Result<Todo, ClientError> {
        let mut body = Map::new();
        if let Some(text) = &changes.text {
            body.insert("text".into(), Value::from(text.as_str()));
        }
        if let Some(completed) = changes.completed {
            body.insert("completed".into(), Value::from(completed));
        }
        let response = self
            .http
            .put(self.todo_url(id))
            .json(&Value::Object(body))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}
