//! Layered compositing of tinted masks.
//!
//! A badge is built from at most three layers, always drawn back to front:
//!
//! ```text
//! Cleared canvas
//!     │
//!     ▼
//! ┌─────────────┐
//! │ Border base │ ◄── border mask, secondary color
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   Symbol    │ ◄── symbol mask (pre-scaled), primary color
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   Outline   │ ◄── border outline mask, primary color
//! └─────────────┘
//! ```
//!
//! Each layer paints a flat tint through its mask, using the mask's alpha as
//! coverage. Any layer may be absent, in which case it is simply skipped.

use image::{Rgba, RgbaImage};

use crate::catalog::{AssetCatalog, ColorEntry, IconAsset, IconLayer};
use crate::error::{BadgeError, Result};
use crate::job::RenderJob;
use crate::mask::Mask;

// ============================================================================
// Layers
// ============================================================================

/// Position of a layer in the fixed stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayerRole {
    BorderBase,
    Symbol,
    Outline,
}

/// A mask paired with the flat color it is painted in.
#[derive(Debug, Clone, Copy)]
pub struct TintLayer<'a> {
    pub mask: &'a Mask,
    pub tint: Rgba<u8>,
}

impl<'a> TintLayer<'a> {
    pub fn new(mask: &'a Mask, tint: Rgba<u8>) -> Self {
        Self { mask, tint }
    }
}

/// The three optional layers of one badge.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerStack<'a> {
    pub border: Option<TintLayer<'a>>,
    pub symbol: Option<TintLayer<'a>>,
    pub outline: Option<TintLayer<'a>>,
}

impl<'a> LayerStack<'a> {
    /// Assembles the stack for a job from the catalog.
    ///
    /// Fails with a usage error if any index is out of range or an icon is
    /// used on the wrong layer. Missing masks are not errors.
    pub fn for_job(catalog: &'a AssetCatalog, job: &RenderJob) -> Result<Self> {
        let symbol = lookup_icon(catalog, job, job.symbol, IconLayer::Symbol)?;
        let border = lookup_icon(catalog, job, job.border, IconLayer::Border)?;
        let primary = lookup_color(catalog, job, job.color1)?.rgba();
        let secondary = lookup_color(catalog, job, job.color2)?.rgba();

        Ok(Self {
            border: border.mask.as_ref().map(|m| TintLayer::new(m, secondary)),
            symbol: symbol.mask.as_ref().map(|m| TintLayer::new(m, primary)),
            outline: border.outline.as_ref().map(|m| TintLayer::new(m, primary)),
        })
    }

    /// Iterates over the present layers in draw order.
    pub fn layers(&self) -> impl Iterator<Item = (LayerRole, &TintLayer<'a>)> {
        [
            (LayerRole::BorderBase, self.border.as_ref()),
            (LayerRole::Symbol, self.symbol.as_ref()),
            (LayerRole::Outline, self.outline.as_ref()),
        ]
        .into_iter()
        .filter_map(|(role, layer)| layer.map(|l| (role, l)))
    }

    /// Returns true if no layer has a mask.
    pub fn is_empty(&self) -> bool {
        self.layers().next().is_none()
    }

    /// Paints every present layer onto `canvas`, back to front.
    ///
    /// The canvas must already be cleared to transparent.
    pub fn composite(&self, canvas: &mut RgbaImage) {
        for (_, layer) in self.layers() {
            tint_over(canvas, layer.mask, layer.tint);
        }
    }
}

fn lookup_icon<'a>(
    catalog: &'a AssetCatalog,
    job: &RenderJob,
    index: usize,
    layer: IconLayer,
) -> Result<&'a IconAsset> {
    let icon = catalog
        .icon(index)
        .ok_or_else(|| invalid_job(job, format!("icon index {index} is out of range")))?;
    if icon.layer != layer {
        return Err(invalid_job(
            job,
            format!("icon {index} is a {} icon, expected {layer}", icon.layer),
        ));
    }
    Ok(icon)
}

pub(crate) fn lookup_color<'a>(catalog: &'a AssetCatalog, job: &RenderJob, index: usize) -> Result<&'a ColorEntry> {
    catalog
        .color(index)
        .ok_or_else(|| invalid_job(job, format!("color index {index} is out of range")))
}

fn invalid_job(job: &RenderJob, message: String) -> BadgeError {
    BadgeError::InvalidJob {
        input: job.to_string(),
        message,
    }
}

// ============================================================================
// Compositing
// ============================================================================

/// Paints `tint` onto `canvas` through `mask`.
///
/// Only the mask's coverage bounds are visited. Full coverage writes the tint
/// directly; partial coverage is alpha blended (source over destination).
pub fn tint_over(canvas: &mut RgbaImage, mask: &Mask, tint: Rgba<u8>) {
    let bounds = mask.bounds();
    let right = bounds.right().min(canvas.width());
    let bottom = bounds.bottom().min(canvas.height());

    for y in bounds.y..bottom {
        for x in bounds.x..right {
            let coverage = mask.coverage(x, y);
            match coverage {
                0 => continue,
                255 => canvas.put_pixel(x, y, tint),
                _ => {
                    let dst = *canvas.get_pixel(x, y);
                    canvas.put_pixel(x, y, cover(tint, coverage, dst));
                }
            }
        }
    }
}

/// Paints an opaque `tint` at `coverage` over `dst` (straight-alpha source-over).
///
/// Computed in integers at 255 scale.
fn cover(tint: Rgba<u8>, coverage: u8, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = u32::from(coverage);
    let da = u32::from(dst[3]);
    let keep = da * (255 - sa);
    // Output alpha at 255^2 scale
    let out_a = sa * 255 + keep;
    if out_a == 0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |t: u8, d: u8| {
        let num = u32::from(t) * sa * 255 + u32::from(d) * keep;
        ((num + out_a / 2) / out_a) as u8
    };

    Rgba([
        channel(tint[0], dst[0]),
        channel(tint[1], dst[1]),
        channel(tint[2], dst[2]),
        ((out_a + 127) / 255) as u8,
    ])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LayerAffinity;
    use image::{GrayImage, Luma};
    use palette::Srgb;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn square_mask(size: u32, from: u32, to: u32, coverage: u8) -> Mask {
        let mut alpha = GrayImage::new(size, size);
        for y in from..to {
            for x in from..to {
                alpha.put_pixel(x, y, Luma([coverage]));
            }
        }
        Mask::from_alpha(alpha)
    }

    fn catalog() -> AssetCatalog {
        let colors = vec![
            ColorEntry::new(0, Srgb::new(255, 0, 0), LayerAffinity::Primary),
            ColorEntry::new(1, Srgb::new(0, 0, 255), LayerAffinity::Secondary),
        ];
        let icons = vec![
            IconAsset {
                index: 0,
                layer: IconLayer::Symbol,
                mask: Some(square_mask(8, 3, 5, 255)),
                outline: None,
            },
            IconAsset {
                index: 1,
                layer: IconLayer::Border,
                mask: Some(square_mask(8, 0, 8, 255)),
                outline: Some(square_mask(8, 0, 1, 255)),
            },
            IconAsset {
                index: 2,
                layer: IconLayer::Border,
                mask: None,
                outline: None,
            },
        ];
        AssetCatalog::from_parts(8, colors, icons)
    }

    #[test]
    fn full_coverage_writes_tint() {
        let mut canvas = RgbaImage::new(8, 8);
        tint_over(&mut canvas, &square_mask(8, 2, 4, 255), RED);
        assert_eq!(*canvas.get_pixel(2, 2), RED);
        assert_eq!(canvas.get_pixel(4, 4).0, [0, 0, 0, 0]);
    }

    #[test]
    fn partial_coverage_on_empty_canvas_keeps_tint_color() {
        let mut canvas = RgbaImage::new(8, 8);
        tint_over(&mut canvas, &square_mask(8, 0, 8, 128), RED);
        assert_eq!(canvas.get_pixel(0, 0).0, [255, 0, 0, 128]);
    }

    #[test]
    fn partial_coverage_blends_over_lower_layer() {
        let mut canvas = RgbaImage::from_pixel(8, 8, BLUE);
        tint_over(&mut canvas, &square_mask(8, 0, 8, 128), RED);
        let pixel = canvas.get_pixel(0, 0);
        assert!(pixel[0] > 0 && pixel[2] > 0);
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn stack_draws_back_to_front() {
        let catalog = catalog();
        let job = RenderJob::new(0, 1, 0, 1);
        let stack = LayerStack::for_job(&catalog, &job).unwrap();

        let roles: Vec<_> = stack.layers().map(|(role, _)| role).collect();
        assert_eq!(roles, vec![LayerRole::BorderBase, LayerRole::Symbol, LayerRole::Outline]);

        let mut canvas = RgbaImage::new(8, 8);
        stack.composite(&mut canvas);
        // Border base in the secondary color
        assert_eq!(*canvas.get_pixel(7, 7), BLUE);
        // Symbol on top in the primary color
        assert_eq!(*canvas.get_pixel(3, 3), RED);
        // Outline on top of the border
        assert_eq!(*canvas.get_pixel(0, 0), RED);
    }

    #[test]
    fn missing_masks_are_skipped() {
        let catalog = catalog();
        let stack = LayerStack::for_job(&catalog, &RenderJob::new(0, 2, 0, 1)).unwrap();
        assert!(stack.border.is_none());
        assert!(stack.outline.is_none());
        assert!(stack.symbol.is_some());
        assert!(!stack.is_empty());

        let mut canvas = RgbaImage::new(8, 8);
        stack.composite(&mut canvas);
        assert_eq!(canvas.get_pixel(7, 7).0, [0, 0, 0, 0]);
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let catalog = catalog();
        assert!(LayerStack::for_job(&catalog, &RenderJob::new(9, 1, 0, 1)).is_err());
        assert!(LayerStack::for_job(&catalog, &RenderJob::new(0, 1, 0, 5)).is_err());
    }

    #[test]
    fn wrong_layer_is_rejected() {
        let catalog = catalog();
        let err = LayerStack::for_job(&catalog, &RenderJob::new(1, 0, 0, 1)).unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn cover_with_zero_coverage_on_empty_pixel_stays_transparent() {
        assert_eq!(cover(RED, 0, Rgba([0, 0, 0, 0])).0, [0, 0, 0, 0]);
    }

    #[test]
    fn cover_half_red_over_opaque_blue() {
        // 128/255 of red over blue, rounded per channel
        assert_eq!(cover(RED, 128, BLUE).0, [128, 0, 127, 255]);
    }

    #[test]
    fn cover_over_partial_alpha_compounds() {
        let once = cover(RED, 128, Rgba([0, 0, 0, 0]));
        let twice = cover(RED, 128, once);
        assert_eq!(twice.0, [255, 0, 0, 192]);
    }
}
