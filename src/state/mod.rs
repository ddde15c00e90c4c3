pub mod error;
pub mod event;
pub mod machine;
pub mod model;

pub use error::{SessionError, SessionResult};
pub use event::{CaptureEvent, CaptureEventKind, StateTransition};
pub use machine::{CaptureSession, Completion, SubmissionTicket, DEFAULT_CROP_FRACTION};
pub use model::{
    CaptureId, CaptureState, CaptureStateKind, CropSelection, CroppingState, RenderedView,
};
