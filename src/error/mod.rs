use crate::capture::CaptureError;
use crate::state::SessionError;
use crate::submission::SubmissionError;
use crate::transform::TransformError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("no async runtime is available to run background work")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
