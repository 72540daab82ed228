pub mod http;

pub use http::{AppState, DeleteConfirmation, HealthStatus, HttpServer, build_router};
