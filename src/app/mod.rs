//! Capture and history screens wired to the session, pipeline and store.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::capture::{CroppedImage, RawImage};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::geometry::{CropRect, Display, Extent};
use crate::history::{HistoryId, HistoryRow, HistoryStore};
use crate::state::{
    CaptureEvent, CaptureId, CaptureSession, CaptureState, CaptureStateKind, Completion,
    CroppingState, SessionError,
};
use crate::submission::{
    AnalysisTransport, HttpTransport, SubmissionError, SubmissionPipeline, SubmissionResult,
};

mod worker;

use self::worker::spawn_worker_action;

const CROP_READY_MESSAGE: &str = "Image cropped successfully. Ready for AI processing.";
const PROCESSING_MESSAGE: &str = "Processing image...";
const FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";
const EMPTY_HISTORY_MESSAGE: &str = "No saved history yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Capture,
    History,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    LoadImage(RawImage),
    ImageRendered(Extent<Display>),
    AdjustCrop(CropRect<Display>),
    FinalizeCrop(CropRect<Display>),
    ConfirmCrop,
    Analyze,
    SwitchScreen(Screen),
    ToggleHistoryEntry(HistoryId),
}

/// A finished pipeline run, tagged with the capture that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionCompletion {
    pub capture: CaptureId,
    pub result: SubmissionResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureView<'a> {
    pub cropping: Option<&'a CroppingState>,
    pub preview: Option<&'a CroppedImage>,
    pub busy: bool,
    pub can_analyze: bool,
    pub status: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView<'a> {
    pub rows: Vec<HistoryRow<'a>>,
    pub empty_message: Option<&'static str>,
}

pub struct App<T> {
    screen: Screen,
    session: CaptureSession,
    history: HistoryStore,
    pipeline: Arc<SubmissionPipeline<T>>,
    status: Option<String>,
    completions_tx: mpsc::UnboundedSender<SubmissionCompletion>,
    completions_rx: mpsc::UnboundedReceiver<SubmissionCompletion>,
}

impl App<HttpTransport> {
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let endpoint = config
            .endpoint_url
            .as_deref()
            .ok_or(SubmissionError::MissingEndpoint)?;
        let transport = HttpTransport::new(endpoint, config.request_timeout())?;
        tracing::info!(endpoint = %transport.endpoint(), "analysis endpoint configured");

        let pipeline = SubmissionPipeline::with_part_names(
            transport,
            config.upload_field_name.clone(),
            config.upload_file_name.clone(),
        );
        Ok(Self::with_session(
            pipeline,
            CaptureSession::with_default_crop(config.default_crop_fraction()),
        ))
    }
}

impl<T: AnalysisTransport> App<T> {
    pub fn new(pipeline: SubmissionPipeline<T>) -> Self {
        Self::with_session(pipeline, CaptureSession::new())
    }

    pub fn with_session(pipeline: SubmissionPipeline<T>, session: CaptureSession) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            screen: Screen::default(),
            session,
            history: HistoryStore::new(),
            pipeline: Arc::new(pipeline),
            status: None,
            completions_tx,
            completions_rx,
        }
    }

    pub const fn screen(&self) -> Screen {
        self.screen
    }

    pub const fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub const fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Routes one user action. Errors leave the session in an interactive
    /// state and are also reflected in the status line.
    pub fn dispatch(&mut self, action: UserAction) -> AppResult<()> {
        tracing::debug!(screen = ?self.screen, ?action, "dispatch user action");
        match action {
            UserAction::LoadImage(raw) => {
                self.screen = Screen::Capture;
                self.status = None;
                self.apply(CaptureEvent::Load(raw))
            }
            UserAction::ImageRendered(display) => self.apply(CaptureEvent::Rendered(display)),
            UserAction::AdjustCrop(rect) => self.apply(CaptureEvent::AdjustCrop(rect)),
            UserAction::FinalizeCrop(rect) => self.apply(CaptureEvent::FinalizeCrop(rect)),
            UserAction::ConfirmCrop => {
                self.apply(CaptureEvent::ConfirmCrop)?;
                self.status = Some(CROP_READY_MESSAGE.to_string());
                Ok(())
            }
            UserAction::Analyze => self.start_analysis(),
            UserAction::SwitchScreen(screen) => {
                self.switch_screen(screen);
                Ok(())
            }
            UserAction::ToggleHistoryEntry(id) => {
                self.history.toggle_expanded(id);
                Ok(())
            }
        }
    }

    fn apply(&mut self, event: CaptureEvent) -> AppResult<()> {
        if let Err(err) = self.session.transition(event) {
            self.report(&err);
            return Err(err.into());
        }
        Ok(())
    }

    /// Crop problems replace the status line. Events that arrive in the wrong
    /// state are only logged so they never hide progress or an answer.
    fn report(&mut self, err: &SessionError) {
        match err {
            SessionError::InvalidStateTransition { .. } => {
                tracing::debug!(%err, "ignoring out-of-state user action");
            }
            _ => self.status = Some(err.to_string()),
        }
    }

    fn switch_screen(&mut self, screen: Screen) {
        self.screen = screen;
        if screen == Screen::History && self.session.state().kind() != CaptureStateKind::Idle {
            // Leaving the capture screen abandons the current capture.
            if let Err(err) = self.session.transition(CaptureEvent::Reset) {
                tracing::warn!(%err, "failed to reset capture session");
            }
            self.status = None;
        }
    }

    fn start_analysis(&mut self) -> AppResult<()> {
        // Checked before leaving `Cropped` so a missing runtime cannot strand
        // the session in `Submitting`.
        let runtime = Handle::try_current().map_err(|err| {
            tracing::error!(%err, "cannot start submission outside an async runtime");
            AppError::NoRuntime(err)
        })?;
        let ticket = match self.session.begin_submission() {
            Ok(ticket) => ticket,
            Err(err) => {
                self.report(&err);
                return Err(err.into());
            }
        };
        self.status = Some(PROCESSING_MESSAGE.to_string());

        let pipeline = Arc::clone(&self.pipeline);
        spawn_worker_action(
            &runtime,
            async move {
                let result = pipeline.submit(&ticket.image).await;
                SubmissionCompletion {
                    capture: ticket.capture,
                    result,
                }
            },
            self.completions_tx.clone(),
        );
        Ok(())
    }

    /// Waits for the next submission to finish and applies it.
    pub async fn next_completion(&mut self) -> Completion {
        match self.completions_rx.recv().await {
            Some(completion) => self.apply_completion(completion),
            None => Completion::Stale,
        }
    }

    /// Applies every completion that has already arrived without waiting.
    pub fn drain_completions(&mut self) -> Vec<Completion> {
        let mut applied = Vec::new();
        while let Ok(completion) = self.completions_rx.try_recv() {
            applied.push(self.apply_completion(completion));
        }
        applied
    }

    fn apply_completion(&mut self, completion: SubmissionCompletion) -> Completion {
        let SubmissionCompletion { capture, result } = completion;
        let outcome = self
            .session
            .complete_submission(capture, result, &mut self.history);

        if let Completion::Applied { .. } = outcome {
            self.status = match self.session.state() {
                CaptureState::Done {
                    result: SubmissionResult::Success(text),
                    ..
                } => Some(text.clone()),
                CaptureState::Done {
                    result: SubmissionResult::Failure(reason),
                    ..
                } => {
                    tracing::info!(%reason, "showing failure to user");
                    Some(FAILURE_MESSAGE.to_string())
                }
                _ => self.status.take(),
            };
        }
        outcome
    }

    pub fn capture_view(&self) -> CaptureView<'_> {
        let state = self.session.state();
        CaptureView {
            cropping: state.cropping(),
            preview: state.cropped_image(),
            busy: state.kind() == CaptureStateKind::Submitting,
            can_analyze: matches!(
                state.kind(),
                CaptureStateKind::Cropped | CaptureStateKind::Done
            ),
            status: self.status(),
        }
    }

    pub fn history_view(&self) -> HistoryView<'_> {
        HistoryView {
            rows: self.history.rows(),
            empty_message: self.history.is_empty().then_some(EMPTY_HISTORY_MESSAGE),
        }
    }
}

impl<T> std::fmt::Debug for App<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("screen", &self.screen)
            .field("session", &self.session)
            .field("history", &self.history.len())
            .field("status", &self.status)
            .finish()
    }
}
