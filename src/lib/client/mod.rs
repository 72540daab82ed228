pub mod api;
pub mod app;
pub mod command;
pub mod view;

pub use api::{ClientError, HttpTodoApi, TodoApi};
pub use app::{EditBuffer, TodoApp};
pub use command::Command;
pub use view::render;
