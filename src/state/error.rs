use super::event::CaptureEventKind;
use super::model::CaptureStateKind;
use crate::transform::TransformError;
use thiserror::Error;

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid state transition: from {from:?} using event {event:?}")]
    InvalidStateTransition {
        from: CaptureStateKind,
        event: CaptureEventKind,
    },
    #[error("no crop area has been selected yet")]
    NoCropSelected,
    #[error("crop area is empty; adjust it and confirm again")]
    InvalidRegion,
    #[error("loaded image has no pixels")]
    EmptyImage,
    #[error("failed to export crop: {0}")]
    Export(#[source] TransformError),
}

impl From<TransformError> for SessionError {
    fn from(error: TransformError) -> Self {
        match error {
            TransformError::InvalidRegion => Self::InvalidRegion,
            other => Self::Export(other),
        }
    }
}
