pub mod app;
pub mod capture;
pub mod config;
pub mod error;
pub mod geometry;
pub mod history;
pub mod logging;
pub mod state;
pub mod submission;
pub mod transform;
pub use error::{AppError, AppResult};
