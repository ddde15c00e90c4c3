use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, ImageResult};
use thiserror::Error;

use crate::geometry::{Extent, Native};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to read image file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image input is empty")]
    EmptyInput,
    #[error("unreadable image: {message}")]
    UnreadableImage { message: String },
}

pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

/// Encoded image as supplied by the camera or gallery, with its natural size.
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl RawImage {
    /// Trusts the caller's dimensions. Prefer [`RawImage::from_bytes`] for
    /// untrusted input.
    pub fn new(bytes: impl Into<Arc<[u8]>>, width: u32, height: u32) -> Self {
        Self {
            bytes: bytes.into(),
            width,
            height,
        }
    }

    /// Reads the natural dimensions from the image header, as the image is
    /// shown: an EXIF rotation by a quarter turn swaps width and height. The
    /// pixel data is not decoded here; a corrupt body only fails later, at
    /// export.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> CaptureResult<Self> {
        let bytes: Arc<[u8]> = bytes.into();
        if bytes.is_empty() {
            return Err(CaptureError::EmptyInput);
        }

        let (width, height, orientation) = {
            let mut decoder =
                open_decoder(&bytes).map_err(|err| CaptureError::UnreadableImage {
                    message: err.to_string(),
                })?;
            let orientation = read_orientation(&mut decoder);
            let (width, height) = upright_dimensions(decoder.dimensions(), orientation);
            (width, height, orientation)
        };

        if width == 0 || height == 0 {
            return Err(CaptureError::UnreadableImage {
                message: format!("image reports empty dimensions {width}x{height}"),
            });
        }

        tracing::debug!(width, height, ?orientation, size = bytes.len(), "loaded raw image");
        Ok(Self::new(bytes, width, height))
    }

    pub fn open(path: &Path) -> CaptureResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| CaptureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    pub fn extent(&self) -> Option<Extent<Native>> {
        Extent::from_pixels(self.width, self.height)
    }

    /// Decodes every pixel and applies the EXIF orientation, giving the same
    /// pixel grid that [`RawImage::width`] and [`RawImage::height`] describe.
    pub fn decode_upright(&self) -> ImageResult<DynamicImage> {
        let mut decoder = open_decoder(&self.bytes)?;
        let orientation = read_orientation(&mut decoder);
        let mut image = DynamicImage::from_decoder(decoder)?;
        image.apply_orientation(orientation);
        Ok(image)
    }
}

fn open_decoder(bytes: &[u8]) -> ImageResult<impl ImageDecoder + '_> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_decoder()
}

/// Unreadable orientation metadata falls back to the stored pixel layout.
fn read_orientation(decoder: &mut impl ImageDecoder) -> Orientation {
    decoder.orientation().unwrap_or_else(|err| {
        tracing::warn!(%err, "ignoring unreadable orientation metadata");
        Orientation::NoTransforms
    })
}

fn upright_dimensions((width, height): (u32, u32), orientation: Orientation) -> (u32, u32) {
    match orientation {
        Orientation::Rotate90
        | Orientation::Rotate270
        | Orientation::Rotate90FlipH
        | Orientation::Rotate270FlipH => (height, width),
        _ => (width, height),
    }
}

impl std::fmt::Debug for RawImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// JPEG blob holding only the cropped native-resolution region.
#[derive(Clone, PartialEq, Eq)]
pub struct CroppedImage {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl CroppedImage {
    pub const MIME: &'static str = "image/jpeg";

    pub fn new(bytes: impl Into<Arc<[u8]>>, width: u32, height: u32) -> Self {
        Self {
            bytes: bytes.into(),
            width,
            height,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    pub fn save(&self, path: &Path) -> CaptureResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CaptureError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, &self.bytes).map_err(|source| CaptureError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl std::fmt::Debug for CroppedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CroppedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_reads_natural_dimensions() {
        let raw = RawImage::from_bytes(fixtures::png_bytes(64, 48)).expect("png should load");
        assert_eq!((raw.width(), raw.height()), (64, 48));
        assert!(raw.extent().is_some());
    }

    #[test]
    fn from_bytes_reports_dimensions_as_shown_for_rotated_photo() {
        let raw = RawImage::from_bytes(fixtures::oriented_jpeg_bytes(40, 20, 6))
            .expect("jpeg should load");
        assert_eq!((raw.width(), raw.height()), (20, 40));

        let decoded = raw.decode_upright().expect("jpeg should decode");
        assert_eq!((decoded.width(), decoded.height()), (20, 40));
    }

    #[test]
    fn from_bytes_keeps_dimensions_without_quarter_turn() {
        let raw = RawImage::from_bytes(fixtures::oriented_jpeg_bytes(40, 20, 3))
            .expect("jpeg should load");
        assert_eq!((raw.width(), raw.height()), (40, 20));
    }

    #[test]
    fn from_bytes_rejects_empty_input() {
        let err = RawImage::from_bytes(Vec::new()).unwrap_err();
        assert!(matches!(err, CaptureError::EmptyInput));
    }

    #[test]
    fn from_bytes_rejects_unrecognised_data() {
        let err = RawImage::from_bytes(b"definitely not an image".to_vec()).unwrap_err();
        assert!(matches!(err, CaptureError::UnreadableImage { .. }));
    }

    #[test]
    fn open_reads_file_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("photo.png");
        std::fs::write(&path, fixtures::png_bytes(10, 20)).expect("write fixture");

        let raw = RawImage::open(&path).expect("file should load");
        assert_eq!((raw.width(), raw.height()), (10, 20));
    }

    #[test]
    fn open_reports_missing_file_path() {
        let err = RawImage::open(Path::new("/nonexistent/answerlens/photo.png")).unwrap_err();
        match err {
            CaptureError::Io { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/answerlens/photo.png"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cropped_image_save_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested/crop.jpg");
        let image = CroppedImage::new(vec![1_u8, 2, 3], 1, 1);

        image.save(&path).expect("save should succeed");
        assert_eq!(std::fs::read(&path).expect("read back"), vec![1, 2, 3]);
    }
}
