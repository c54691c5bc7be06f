pub mod app;
pub mod cli;
pub mod errors;
pub mod inference;
pub mod models;
pub mod prompt;
pub mod repl;

pub use app::create_app;
pub use errors::{ApiError, InferenceError};
pub use inference::SqlGenerator;
