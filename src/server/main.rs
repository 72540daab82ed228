use anyhow::Context;
use todo_stack::adapters::HttpServer;
use todo_stack::config::{AppConfig, CONNECT_TIMEOUT, DatabaseConfig};
use todo_stack::core::TodoService;
use todo_stack::storage::memory::MemoryTodoRepository;
use todo_stack::storage::sqlite::SqliteTodoRepository;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        port = config.port,
        environment = config.environment.as_str(),
        "Starting todo service"
    );

    match config.database.clone() {
        DatabaseConfig::Memory => {
            tracing::warn!("Using in-memory storage; todos are lost on exit");
            let service = TodoService::new(MemoryTodoRepository::new());
            let server = HttpServer::new(service, config).await?;
            server.run().await
        }
        DatabaseConfig::Sqlite(url) => {
            let repo = SqliteTodoRepository::connect(&url, CONNECT_TIMEOUT)
                .await
                .with_context(|| format!("could not connect to database {url}"))?;
            let pool_handle = repo.clone();
            let server = HttpServer::new(TodoService::new(repo), config).await?;
            let result = server.run().await;
            pool_handle.close().await;
            tracing::info!("Database connection closed");
            result
        }
    }
}
