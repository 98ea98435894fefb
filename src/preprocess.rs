//! Conversion of decoded icon bitmaps into canvas-sized masks.
//!
//! Every icon is preprocessed once at catalog construction. The bitmap is
//! scaled with a nearest-neighbor kernel, centered on the canvas, and reduced
//! to its alpha channel. Nearest-neighbor keeps edges crisp, which is what the
//! three-entry palette in [`crate::quantize`] expects.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};

use crate::mask::{Mask, SizePx};

/// Where a scaled bitmap lands on the canvas.
///
/// Offsets may be negative when the scaled bitmap is larger than the canvas;
/// the overhang is clipped symmetrically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub offset_x: i64,
    pub offset_y: i64,
    pub size: SizePx,
}

impl Placement {
    /// Computes the centered placement of a `source` bitmap scaled by `scale`.
    ///
    /// The scaled size is `floor(dim * scale)` per axis and the offset is
    /// `(canvas - scaled) / 2` rounded toward negative infinity. Returns
    /// `None` when the scaled size is empty.
    pub fn centered(source: SizePx, scale: f64, canvas_size: u32) -> Option<Self> {
        if !(scale > 0.0) {
            return None;
        }
        let size = source.scale_floor(scale);
        if size.is_empty() {
            return None;
        }
        let offset = |dim: u32| (i64::from(canvas_size) - i64::from(dim)).div_euclid(2);
        Some(Self {
            offset_x: offset(size.width),
            offset_y: offset(size.height),
            size,
        })
    }
}

/// Builds the mask for one icon role.
///
/// Returns `None` if there is no bitmap or if scaling collapses it to
/// nothing. The same `(raw, scale, canvas_size)` always yields a
/// bit-identical mask.
pub fn prepare_mask(raw: Option<&RgbaImage>, scale: f64, canvas_size: u32) -> Option<Mask> {
    let raw = raw?;
    let source = SizePx::new(raw.width(), raw.height());
    let placement = Placement::centered(source, scale, canvas_size)?;

    let scaled;
    let resampled = if placement.size == source {
        raw
    } else {
        scaled = imageops::resize(
            raw,
            placement.size.width,
            placement.size.height,
            FilterType::Nearest,
        );
        &scaled
    };

    let mut alpha = GrayImage::new(canvas_size, canvas_size);
    let canvas = i64::from(canvas_size);

    for (sx, sy, pixel) in resampled.enumerate_pixels() {
        let dx = placement.offset_x + i64::from(sx);
        let dy = placement.offset_y + i64::from(sy);
        if dx < 0 || dy < 0 || dx >= canvas || dy >= canvas {
            continue;
        }
        alpha.put_pixel(dx as u32, dy as u32, Luma([pixel[3]]));
    }

    Some(Mask::from_alpha(alpha))
}
