pub mod error;
pub mod service;
pub mod todo;
pub mod validation;

pub use error::*;
pub use service::*;
pub use todo::*;
pub use validation::ValidationError;
