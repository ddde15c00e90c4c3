use crate::capture::{CroppedImage, RawImage};
use crate::geometry::{CropRect, Display, Extent, Native, ScaleFactor};
use crate::submission::SubmissionResult;

/// Identity of one capture. Bumped whenever a new image is loaded or the
/// session is reset, so late submission results can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureId(u64);

impl CaptureId {
    pub(crate) const fn initial() -> Self {
        Self(0)
    }

    pub(crate) const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for CaptureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "capture-{}", self.0)
    }
}

/// Render size of the image element and the scale derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedView {
    pub display: Extent<Display>,
    pub scale: ScaleFactor,
}

impl RenderedView {
    pub fn new(native: Extent<Native>, display: Extent<Display>) -> Self {
        Self {
            display,
            scale: ScaleFactor::between(native, display),
        }
    }
}

/// Finalized crop rectangle, or nothing yet.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CropSelection {
    #[default]
    Unset,
    Rect(CropRect<Display>),
}

impl CropSelection {
    pub const fn rect(&self) -> Option<&CropRect<Display>> {
        match self {
            Self::Unset => None,
            Self::Rect(rect) => Some(rect),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CroppingState {
    pub raw: RawImage,
    pub native: Extent<Native>,
    pub view: Option<RenderedView>,
    /// Rectangle currently drawn by the crop widget.
    pub draft: Option<CropRect<Display>>,
    pub selection: CropSelection,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Cropping(CroppingState),
    Cropped {
        image: CroppedImage,
    },
    Submitting {
        image: CroppedImage,
        capture: CaptureId,
    },
    Done {
        image: CroppedImage,
        result: SubmissionResult,
    },
}

impl CaptureState {
    pub const fn kind(&self) -> CaptureStateKind {
        match self {
            Self::Idle => CaptureStateKind::Idle,
            Self::Cropping(_) => CaptureStateKind::Cropping,
            Self::Cropped { .. } => CaptureStateKind::Cropped,
            Self::Submitting { .. } => CaptureStateKind::Submitting,
            Self::Done { .. } => CaptureStateKind::Done,
        }
    }

    pub const fn cropped_image(&self) -> Option<&CroppedImage> {
        match self {
            Self::Cropped { image } | Self::Submitting { image, .. } | Self::Done { image, .. } => {
                Some(image)
            }
            Self::Idle | Self::Cropping(_) => None,
        }
    }

    pub const fn cropping(&self) -> Option<&CroppingState> {
        match self {
            Self::Cropping(cropping) => Some(cropping),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<SubmissionResult> {
        match self {
            Self::Submitting { .. } => Some(SubmissionResult::Pending),
            Self::Done { result, .. } => Some(result.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStateKind {
    Idle,
    Cropping,
    Cropped,
    Submitting,
    Done,
}
