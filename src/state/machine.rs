use std::collections::VecDeque;

use super::error::{SessionError, SessionResult};
use super::event::{CaptureEventKind, StateTransition};
use super::model::{CaptureId, CaptureState, CroppingState, CropSelection, RenderedView};
use super::CaptureEvent;
use crate::capture::CroppedImage;
use crate::geometry::{CropRect, Display};
use crate::history::{HistoryEntry, HistoryId, HistoryStore};
use crate::submission::SubmissionResult;
use crate::transform;

pub const DEFAULT_CROP_FRACTION: f64 = 0.8;

/// Most recent transitions kept for diagnostics; older records are dropped.
const TRANSITION_LOG_CAPACITY: usize = 64;

/// Work handed to the submission pipeline, tagged with the capture it
/// belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTicket {
    pub capture: CaptureId,
    pub image: CroppedImage,
}

/// What happened to a submission result handed back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied { history_entry: Option<HistoryId> },
    /// The issuing capture was reset or replaced; the result was dropped.
    Stale,
    /// `Pending` is not a resolution; nothing changed.
    StillPending,
}

/// Owns the single active capture and replaces its state wholesale on every
/// transition.
#[derive(Debug)]
pub struct CaptureSession {
    state: CaptureState,
    capture_id: CaptureId,
    default_crop_fraction: f64,
    transition_log: VecDeque<StateTransition>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::with_default_crop(DEFAULT_CROP_FRACTION)
    }

    pub fn with_default_crop(fraction: f64) -> Self {
        Self {
            state: CaptureState::default(),
            capture_id: CaptureId::initial(),
            default_crop_fraction: fraction,
            transition_log: VecDeque::with_capacity(TRANSITION_LOG_CAPACITY),
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub const fn capture_id(&self) -> CaptureId {
        self.capture_id
    }

    pub fn can_transition(&self, event: &CaptureEvent) -> bool {
        self.next_state(event).is_ok()
    }

    /// Computes the replacement state without touching the session.
    pub fn next_state(&self, event: &CaptureEvent) -> SessionResult<CaptureState> {
        match (&self.state, event) {
            (_, CaptureEvent::Load(raw)) => {
                let native = raw.extent().ok_or(SessionError::EmptyImage)?;
                Ok(CaptureState::Cropping(CroppingState {
                    raw: raw.clone(),
                    native,
                    view: None,
                    draft: None,
                    selection: CropSelection::Unset,
                }))
            }
            (_, CaptureEvent::Reset) => Ok(CaptureState::Idle),
            (CaptureState::Cropping(cropping), CaptureEvent::Rendered(display)) => {
                let view = RenderedView::new(cropping.native, *display);
                let draft = cropping
                    .draft
                    .map(|rect| rect.rescale_to(*display))
                    .unwrap_or_else(|| CropRect::centered(*display, self.default_crop_fraction));
                let selection = match cropping.selection {
                    CropSelection::Unset => CropSelection::Unset,
                    CropSelection::Rect(rect) => CropSelection::Rect(rect.rescale_to(*display)),
                };
                Ok(CaptureState::Cropping(CroppingState {
                    view: Some(view),
                    draft: Some(draft),
                    selection,
                    ..cropping.clone()
                }))
            }
            (CaptureState::Cropping(cropping), CaptureEvent::AdjustCrop(rect)) => {
                let (view, rect) = align_to_view(cropping, rect);
                Ok(CaptureState::Cropping(CroppingState {
                    view: Some(view),
                    draft: Some(rect),
                    ..cropping.clone()
                }))
            }
            (CaptureState::Cropping(cropping), CaptureEvent::FinalizeCrop(rect)) => {
                let (view, rect) = align_to_view(cropping, rect);
                Ok(CaptureState::Cropping(CroppingState {
                    view: Some(view),
                    draft: Some(rect),
                    selection: CropSelection::Rect(rect),
                    ..cropping.clone()
                }))
            }
            (CaptureState::Cropping(cropping), CaptureEvent::ConfirmCrop) => {
                let (CropSelection::Rect(rect), Some(view)) = (cropping.selection, cropping.view)
                else {
                    return Err(SessionError::NoCropSelected);
                };
                let native_rect = transform::display_to_native(&rect, view.scale, cropping.native);
                let image = transform::export_crop(&cropping.raw, &native_rect)?;
                Ok(CaptureState::Cropped { image })
            }
            (
                CaptureState::Cropped { image } | CaptureState::Done { image, .. },
                CaptureEvent::Submit,
            ) => Ok(CaptureState::Submitting {
                image: image.clone(),
                capture: self.capture_id,
            }),
            (state, event) => Err(SessionError::InvalidStateTransition {
                from: state.kind(),
                event: event.kind(),
            }),
        }
    }

    pub fn transition(&mut self, event: CaptureEvent) -> SessionResult<&CaptureState> {
        let from = self.state.kind();
        tracing::debug!(?from, event = ?event.kind(), capture = %self.capture_id, "request state transition");

        let next = self.next_state(&event).inspect_err(|err| {
            tracing::warn!(?from, event = ?event.kind(), %err, "state transition rejected");
        })?;

        if matches!(event, CaptureEvent::Load(_) | CaptureEvent::Reset) {
            if let CaptureState::Submitting { capture, .. } = &self.state {
                tracing::info!(%capture, "abandoning in-flight submission");
            }
            self.capture_id = self.capture_id.next();
        }

        self.replace_state(next, event.kind());
        Ok(&self.state)
    }

    /// Moves `Cropped` or `Done` into `Submitting` and returns the work item
    /// for the pipeline.
    pub fn begin_submission(&mut self) -> SessionResult<SubmissionTicket> {
        self.transition(CaptureEvent::Submit)?;
        match &self.state {
            CaptureState::Submitting { image, capture } => Ok(SubmissionTicket {
                capture: *capture,
                image: image.clone(),
            }),
            other => Err(SessionError::InvalidStateTransition {
                from: other.kind(),
                event: CaptureEventKind::Submit,
            }),
        }
    }

    /// Applies a submission result if it still belongs to the current capture.
    /// A success is written to `history` before the session shows it.
    pub fn complete_submission(
        &mut self,
        capture: CaptureId,
        result: SubmissionResult,
        history: &mut HistoryStore,
    ) -> Completion {
        let image = match &self.state {
            CaptureState::Submitting {
                image,
                capture: issued,
            } if *issued == capture && capture == self.capture_id => image.clone(),
            state => {
                tracing::debug!(
                    %capture,
                    current = %self.capture_id,
                    state = ?state.kind(),
                    "dropping stale submission result"
                );
                return Completion::Stale;
            }
        };

        let history_entry = match &result {
            SubmissionResult::Pending => return Completion::StillPending,
            SubmissionResult::Success(text) => {
                let entry = HistoryEntry::new(image.clone(), text.clone());
                let id = entry.id();
                history.append(entry);
                Some(id)
            }
            SubmissionResult::Failure(reason) => {
                tracing::info!(%capture, %reason, "submission failed");
                None
            }
        };

        self.replace_state(CaptureState::Done { image, result }, CaptureEventKind::Complete);
        Completion::Applied { history_entry }
    }

    fn replace_state(&mut self, next: CaptureState, event: CaptureEventKind) {
        let record = StateTransition::new(Some(self.state.kind()), event, next.kind());
        tracing::debug!(from = ?record.from, to = ?record.to, ?event, "state transition applied");
        self.state = next;
        if self.transition_log.len() == TRANSITION_LOG_CAPACITY {
            self.transition_log.pop_front();
        }
        self.transition_log.push_back(record);
    }
}

/// Puts a reported rectangle on the current render size. A rectangle measured
/// against an older size is rescaled first; without a render size yet, the
/// rectangle's own extent becomes the view.
fn align_to_view(
    cropping: &CroppingState,
    rect: &CropRect<Display>,
) -> (RenderedView, CropRect<Display>) {
    match cropping.view {
        Some(view) => (view, rect.rescale_to(view.display)),
        None => (RenderedView::new(cropping.native, rect.extent()), *rect),
    }
}

#[cfg(test)]
impl CaptureSession {
    fn transitions(&self) -> &VecDeque<StateTransition> {
        &self.transition_log
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CaptureState::{:?} ({})", self.state.kind(), self.capture_id)
    }
}
