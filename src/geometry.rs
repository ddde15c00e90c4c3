//! Coordinate primitives shared by the transform, session and app modules.
//!
//! Every rectangle is tagged with the coordinate space it lives in. A crop
//! drawn against the on-screen rendering is a `CropRect<Display>`; the same
//! region in source pixels is a `CropRect<Native>`. The two never mix without
//! going through a [`ScaleFactor`].

use std::fmt;
use std::marker::PhantomData;

mod sealed {
    pub trait Sealed {}
}

pub trait CoordinateSpace: sealed::Sealed + Copy + fmt::Debug + PartialEq + 'static {
    const NAME: &'static str;
}

/// Space of the rendered, possibly scaled-down image element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Display;

/// Space of the source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Native;

impl sealed::Sealed for Display {}
impl sealed::Sealed for Native {}

impl CoordinateSpace for Display {
    const NAME: &'static str = "display";
}

impl CoordinateSpace for Native {
    const NAME: &'static str = "native";
}

/// Size of a coordinate space. Always positive and finite.
#[derive(Clone, Copy, PartialEq)]
pub struct Extent<S: CoordinateSpace> {
    width: f64,
    height: f64,
    space: PhantomData<S>,
}

impl<S: CoordinateSpace> Extent<S> {
    pub fn new(width: f64, height: f64) -> Option<Self> {
        let valid = |value: f64| value.is_finite() && value > 0.0;
        if !valid(width) || !valid(height) {
            return None;
        }
        Some(Self {
            width,
            height,
            space: PhantomData,
        })
    }

    pub const fn width(&self) -> f64 {
        self.width
    }

    pub const fn height(&self) -> f64 {
        self.height
    }
}

impl Extent<Native> {
    pub fn from_pixels(width: u32, height: u32) -> Option<Self> {
        Self::new(f64::from(width), f64::from(height))
    }
}

impl<S: CoordinateSpace> fmt::Debug for Extent<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extent<{}>({}x{})", S::NAME, self.width, self.height)
    }
}

/// Rectangle in one coordinate space, remembering the extent it was measured
/// against. Construction clamps into that extent.
#[derive(Clone, Copy, PartialEq)]
pub struct CropRect<S: CoordinateSpace> {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    extent: Extent<S>,
}

impl<S: CoordinateSpace> CropRect<S> {
    pub fn new(x: f64, y: f64, width: f64, height: f64, extent: Extent<S>) -> Self {
        let (x, width) = clamp_axis(x, width, extent.width);
        let (y, height) = clamp_axis(y, height, extent.height);
        Self {
            x,
            y,
            width,
            height,
            extent,
        }
    }

    /// Rectangle covering the central `fraction` of the extent on both axes.
    pub fn centered(extent: Extent<S>, fraction: f64) -> Self {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let width = extent.width * fraction;
        let height = extent.height * fraction;
        Self::new(
            (extent.width - width) / 2.0,
            (extent.height - height) / 2.0,
            width,
            height,
            extent,
        )
    }

    pub const fn x(&self) -> f64 {
        self.x
    }

    pub const fn y(&self) -> f64 {
        self.y
    }

    pub const fn width(&self) -> f64 {
        self.width
    }

    pub const fn height(&self) -> f64 {
        self.height
    }

    pub const fn extent(&self) -> Extent<S> {
        self.extent
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Maps the rectangle proportionally onto another extent of the same space.
    pub fn rescale_to(&self, extent: Extent<S>) -> Self {
        if extent == self.extent {
            return *self;
        }
        let sx = extent.width / self.extent.width;
        let sy = extent.height / self.extent.height;
        Self::new(
            self.x * sx,
            self.y * sy,
            self.width * sx,
            self.height * sy,
            extent,
        )
    }
}

impl<S: CoordinateSpace> fmt::Debug for CropRect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CropRect<{}>(x={}, y={}, w={}, h={} in {}x{})",
            S::NAME,
            self.x,
            self.y,
            self.width,
            self.height,
            self.extent.width,
            self.extent.height
        )
    }
}

fn clamp_axis(origin: f64, length: f64, limit: f64) -> (f64, f64) {
    let origin = if origin.is_finite() { origin } else { 0.0 };
    let length = if length.is_finite() { length } else { 0.0 };
    let start = origin.clamp(0.0, limit);
    let end = (origin + length.max(0.0)).clamp(start, limit);
    (start, end - start)
}

/// Per-axis ratio of native pixels to display units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactor {
    pub fn between(native: Extent<Native>, display: Extent<Display>) -> Self {
        Self {
            x: native.width / display.width,
            y: native.height / display.height,
        }
    }

    pub fn to_native(&self, rect: &CropRect<Display>, native: Extent<Native>) -> CropRect<Native> {
        CropRect::new(
            rect.x * self.x,
            rect.y * self.y,
            rect.width * self.x,
            rect.height * self.y,
            native,
        )
    }

    pub fn to_display(&self, rect: &CropRect<Native>, display: Extent<Display>) -> CropRect<Display> {
        CropRect::new(
            rect.x / self.x,
            rect.y / self.y,
            rect.width / self.x,
            rect.height / self.y,
            display,
        )
    }
}
