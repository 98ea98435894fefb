//! Reduction of a composited canvas to an indexed image.
//!
//! Badges only ever contain their two tints and transparency, so the palette
//! is fixed per job rather than derived from the pixels:
//!
//! | Index | Entry                    |
//! |-------|--------------------------|
//! | 0     | fully transparent        |
//! | 1     | color1 (symbol, outline) |
//! | 2     | color2 (border base)     |
//!
//! Each pixel maps to the entry nearest to it in premultiplied RGBA, with
//! ties going to the lower index. Soft edges therefore snap to either the
//! tint or transparency instead of introducing new colors.

use image::RgbaImage;
use palette::{Srgb, Srgba};

/// Palette index reserved for full transparency.
pub const TRANSPARENT_INDEX: u8 = 0;

/// Largest palette an 8-bit index can address.
pub const MAX_PALETTE_SIZE: usize = 256;

// ============================================================================
// PaletteImage
// ============================================================================

/// An indexed image: one palette index per pixel plus the palette itself.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteImage {
    width: u32,
    height: u32,
    palette: Vec<Srgba<u8>>,
    indices: Vec<u8>,
}

impl PaletteImage {
    /// Wraps indices and a palette.
    ///
    /// Returns `None` if the buffer size does not match the dimensions, the
    /// palette is empty or too large, entry 0 is not fully transparent, or an
    /// index points past the palette.
    pub fn new(width: u32, height: u32, palette: Vec<Srgba<u8>>, indices: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize;
        if indices.len() != expected
            || palette.is_empty()
            || palette.len() > MAX_PALETTE_SIZE
            || palette[0].alpha != 0
            || indices.iter().any(|&i| usize::from(i) >= palette.len())
        {
            return None;
        }
        Some(Self {
            width,
            height,
            palette,
            indices,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn palette(&self) -> &[Srgba<u8>] {
        &self.palette
    }

    /// Row-major palette indices.
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Returns the palette index at the given pixel.
    pub fn index_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.indices
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Returns the color at the given pixel.
    pub fn color_at(&self, x: u32, y: u32) -> Option<Srgba<u8>> {
        self.index_at(x, y)
            .map(|index| self.palette[usize::from(index)])
    }
}

// ============================================================================
// TintPalette
// ============================================================================

/// The fixed three-entry palette of one job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TintPalette {
    entries: [Srgba<u8>; 3],
}

impl TintPalette {
    pub fn new(color1: Srgb<u8>, color2: Srgb<u8>) -> Self {
        Self {
            entries: [
                Srgba::new(0, 0, 0, 0),
                Srgba::new(color1.red, color1.green, color1.blue, 255),
                Srgba::new(color2.red, color2.green, color2.blue, 255),
            ],
        }
    }

    pub fn entries(&self) -> &[Srgba<u8>] {
        &self.entries
    }

    /// Index of the entry closest to `pixel` in premultiplied RGBA space.
    pub fn nearest(&self, pixel: [u8; 4]) -> u8 {
        let mut best = TRANSPARENT_INDEX;
        let mut best_distance = u64::MAX;
        for (index, entry) in self.entries.iter().enumerate() {
            let candidate = [entry.red, entry.green, entry.blue, entry.alpha];
            let distance = premultiplied_distance(pixel, candidate);
            if distance < best_distance {
                best = index as u8;
                best_distance = distance;
            }
        }
        best
    }
}

/// Squared distance between two colors after premultiplying by alpha.
///
/// Channels are compared at 255x scale to stay in integers.
fn premultiplied_distance(a: [u8; 4], b: [u8; 4]) -> u64 {
    let (aa, ba) = (i64::from(a[3]), i64::from(b[3]));
    let channel = |x: u8, y: u8| {
        let d = i64::from(x) * aa - i64::from(y) * ba;
        (d * d) as u64
    };
    let alpha = (aa - ba) * 255;
    channel(a[0], b[0]) + channel(a[1], b[1]) + channel(a[2], b[2]) + (alpha * alpha) as u64
}

// ============================================================================
// Quantization
// ============================================================================

/// Maps every canvas pixel onto the job's three-entry palette.
pub fn quantize(canvas: &RgbaImage, color1: Srgb<u8>, color2: Srgb<u8>) -> PaletteImage {
    let palette = TintPalette::new(color1, color2);
    let indices: Vec<u8> = canvas.pixels().map(|p| palette.nearest(p.0)).collect();

    PaletteImage {
        width: canvas.width(),
        height: canvas.height(),
        palette: palette.entries().to_vec(),
        indices,
    }
}
