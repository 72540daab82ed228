use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, Request, State, rejection::JsonRejection},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::{AppConfig, CONNECT_TIMEOUT, Environment, MAX_BODY_BYTES};
use crate::core::{
    AppError, ErrorBody, InternalDetail, Todo, TodoService, TodoStats, ValidationError,
};
use crate::storage::TodoRepository;
use crate::transport::configure_tls;

pub struct AppState<R: TodoRepository> {
    pub todo_service: TodoService<R>,
    pub started_at: Instant,
    pub environment: Environment,
}

impl<R: TodoRepository> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            todo_service: self.todo_service.clone(),
            started_at: self.started_at,
            environment: self.environment,
        }
    }
}

impl<R: TodoRepository> AppState<R> {
    pub fn new(todo_service: TodoService<R>, environment: Environment) -> Self {
        Self {
            todo_service,
            started_at: Instant::now(),
            environment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConfirmation {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the router was built.
    pub uptime: f64,
    pub environment: String,
    pub database: String,
    pub version: String,
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::from(ValidationError::MalformedBody)
        }
    })
}

pub async fn list_todos<R: TodoRepository>(
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<Todo>>, AppError> {
    Ok(Json(state.todo_service.get_all().await?))
}

pub async fn create_todo<R: TodoRepository>(
    State(state): State<AppState<R>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let body = json_body(body)?;
    let todo = state.todo_service.create(&body).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn delete_todo<R: TodoRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteConfirmation>, AppError> {
    state.todo_service.delete(&id).await?;
    Ok(Json(DeleteConfirmation {
        message: "Todo deleted successfully".into(),
    }))
}

pub async fn toggle_todo<R: TodoRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, AppError> {
    Ok(Json(state.todo_service.toggle(&id).await?))
}

pub async fn update_todo<R: TodoRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Todo>, AppError> {
    let body = json_body(body)?;
    Ok(Json(state.todo_service.update(&id, &body).await?))
}

pub async fn todo_stats<R: TodoRepository>(
    State(state): State<AppState<R>>,
) -> Result<Json<TodoStats>, AppError> {
    Ok(Json(state.todo_service.stats().await?.into()))
}

pub async fn health_route<R: TodoRepository>(
    State(state): State<AppState<R>>,
) -> Json<HealthStatus> {
    let connected = tokio::time::timeout(CONNECT_TIMEOUT, state.todo_service.database_ready())
        .await
        .unwrap_or(false);
    Json(HealthStatus {
        status: "OK".into(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        environment: state.environment.as_str().into(),
        database: if connected { "Connected" } else { "Disconnected" }.into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Unknown paths and unsupported methods on known paths both land here.
async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Endpoint not found")))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Unhandled error");
    AppError::Internal(detail).into_response()
}

/// Development only: copies the internal cause of a 5xx into `details`.
async fn expose_internal_details(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let Some(InternalDetail(detail)) = response.extensions().get::<InternalDetail>().cloned() else {
        return response;
    };
    let status = response.status();
    let bytes = match axum::body::to_bytes(response.into_body(), usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return (status, Json(ErrorBody::new("Internal server error"))).into_response(),
    };
    let mut body = serde_json::from_slice::<ErrorBody>(&bytes)
        .unwrap_or_else(|_| ErrorBody::new("Internal server error"));
    body.details = Some(vec![detail]);
    (status, Json(body)).into_response()
}

fn api_routes<R: TodoRepository>() -> Router<AppState<R>> {
    Router::new()
        .route("/todos", get(list_todos::<R>).post(create_todo::<R>))
        .route("/todos/{id}", put(update_todo::<R>).delete(delete_todo::<R>))
        .route("/todos/stats", get(todo_stats::<R>))
        .route("/todos/{id}/toggle", patch(toggle_todo::<R>))
        .method_not_allowed_fallback(not_found)
}

fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn security_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}

pub fn build_router<R: TodoRepository>(state: AppState<R>, config: &AppConfig) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let uri = request.uri().to_string();
            tracing::info_span!("http_request", method = ?request.method(), uri)
        });

    let mut router = Router::new()
        .route("/health", get(health_route::<R>))
        .nest("/api", api_routes())
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic));

    if config.environment.is_development() {
        router = router.layer(middleware::from_fn(expose_internal_details));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(security_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(security_header(header::X_FRAME_OPTIONS, "DENY"))
        .layer(security_header(header::X_XSS_PROTECTION, "1; mode=block"))
        .layer(security_header(
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=31536000; includeSubDomains",
        ))
        .layer(security_header(header::REFERRER_POLICY, "strict-origin-when-cross-origin"))
        .layer(security_header(
            HeaderName::from_static("permissions-policy"),
            "geolocation=(), microphone=(), camera=()",
        ))
        .layer(cors_layer(config.cors_origin.clone()))
        .layer(trace_layer)
        .with_state(state)
}

pub struct HttpServer {
    router: Router,
    listener: net::TcpListener,
    config: AppConfig,
}

impl HttpServer {
    pub async fn new<R: TodoRepository>(
        todo_service: TodoService<R>,
        config: AppConfig,
    ) -> anyhow::Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to listen on port {}", config.port))?;
        Ok(Self::from_listener(todo_service, config, listener))
    }

    pub fn from_listener<R: TodoRepository>(
        todo_service: TodoService<R>,
        config: AppConfig,
        listener: net::TcpListener,
    ) -> Self {
        let state = AppState::new(todo_service, config.environment);
        let router = build_router(state, &config);
        Self {
            router,
            listener,
            config,
        }
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("listener has no local address")
    }

    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        match self.config.tls.clone() {
            Some(tls) => {
                let rustls = configure_tls(&tls).await?;
                let handle = axum_server::Handle::new();
                let drain = handle.clone();
                tokio::spawn(async move {
                    shutdown.await;
                    drain.graceful_shutdown(Some(Duration::from_secs(10)));
                });
                tracing::info!(%addr, "Serving todos over TLS");
                let std_listener = self.listener.into_std()?;
                axum_server::from_tcp_rustls(std_listener, rustls)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await
                    .context("received error from running server")?;
            }
            None => {
                tracing::info!(%addr, "Serving todos");
                axum::serve(self.listener, self.router)
                    .with_graceful_shutdown(shutdown)
                    .await
                    .context("received error from running server")?;
            }
        }
        Ok(())
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
