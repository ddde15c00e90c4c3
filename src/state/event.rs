use crate::capture::RawImage;
use crate::geometry::{CropRect, Display, Extent};

use super::model::CaptureStateKind;

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// A new file arrived from the camera or gallery.
    Load(RawImage),
    /// The image element was laid out at a (possibly new) size.
    Rendered(Extent<Display>),
    /// In-progress drag or resize of the crop rectangle.
    AdjustCrop(CropRect<Display>),
    /// The crop widget finished a gesture.
    FinalizeCrop(CropRect<Display>),
    ConfirmCrop,
    Submit,
    Reset,
}

impl CaptureEvent {
    pub const fn kind(&self) -> CaptureEventKind {
        match self {
            Self::Load(_) => CaptureEventKind::Load,
            Self::Rendered(_) => CaptureEventKind::Rendered,
            Self::AdjustCrop(_) => CaptureEventKind::AdjustCrop,
            Self::FinalizeCrop(_) => CaptureEventKind::FinalizeCrop,
            Self::ConfirmCrop => CaptureEventKind::ConfirmCrop,
            Self::Submit => CaptureEventKind::Submit,
            Self::Reset => CaptureEventKind::Reset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEventKind {
    Load,
    Rendered,
    AdjustCrop,
    FinalizeCrop,
    ConfirmCrop,
    Submit,
    Complete,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: Option<CaptureStateKind>,
    pub event: CaptureEventKind,
    pub to: CaptureStateKind,
}

impl StateTransition {
    pub const fn new(
        from: Option<CaptureStateKind>,
        event: CaptureEventKind,
        to: CaptureStateKind,
    ) -> Self {
        Self { from, event, to }
    }
}
