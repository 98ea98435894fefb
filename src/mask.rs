//! Alpha-only coverage masks and the pixel geometry they are placed with.

use image::GrayImage;

/// Half-open pixel rectangle `[x, x + width) x [y, y + height)`.
///
/// Masks use it for the region that carries coverage, so compositing can
/// skip the transparent margin around a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RectPx {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RectPx {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns true if the pixel lies inside the rectangle.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }
}

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Scales both dimensions, rounding down.
    pub fn scale_floor(&self, scale: f64) -> Self {
        let scaled = |dim: u32| (f64::from(dim) * scale).floor().max(0.0) as u32;
        Self::new(scaled(self.width), scaled(self.height))
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A canvas-sized, 8-bit coverage map for one icon shape.
///
/// Masks carry no color; the compositor supplies a tint at draw time.
/// Once built they are never mutated, so a single mask is shared by every
/// job that references its icon.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    alpha: GrayImage,
    bounds: RectPx,
}

impl Mask {
    /// Wraps an alpha plane, computing the bounding box of its coverage.
    pub fn from_alpha(alpha: GrayImage) -> Self {
        let bounds = coverage_bounds(&alpha);
        Self { alpha, bounds }
    }

    /// Returns the mask dimensions (always the canvas size).
    pub fn dimensions(&self) -> SizePx {
        SizePx::new(self.alpha.width(), self.alpha.height())
    }

    /// Returns the coverage at the given pixel, or zero outside the mask.
    pub fn coverage(&self, x: u32, y: u32) -> u8 {
        if !self.bounds.contains(x, y) {
            return 0;
        }
        self.alpha.get_pixel(x, y)[0]
    }

    /// The smallest rectangle containing every non-zero coverage value.
    pub fn bounds(&self) -> RectPx {
        self.bounds
    }

    /// Returns true if no pixel has any coverage.
    pub fn is_blank(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Borrows the underlying alpha plane.
    pub fn alpha(&self) -> &GrayImage {
        &self.alpha
    }
}

fn coverage_bounds(alpha: &GrayImage) -> RectPx {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;

    for (x, y, pixel) in alpha.enumerate_pixels() {
        if pixel[0] == 0 {
            continue;
        }
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    if min_x == u32::MAX {
        return RectPx::default();
    }
    RectPx::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}
