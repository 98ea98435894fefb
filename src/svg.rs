//! SVG rasterization for vector icon assets using resvg/usvg.
//!
//! Vector icons have no natural pixel size, so they are rendered to fit the
//! canvas and then treated exactly like a decoded raster bitmap.

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};

/// Rasterizes SVG data so its larger dimension equals `size` pixels.
///
/// Aspect ratio is preserved. Returns `None` if the SVG cannot be parsed or
/// has a degenerate size.
pub fn rasterize_svg(svg_data: &[u8], size: u32) -> Option<RgbaImage> {
    let opts = Options::default();
    let tree = Tree::from_data(svg_data, &opts).ok()?;

    let svg_size = tree.size();
    let longest = svg_size.width().max(svg_size.height());
    if longest <= 0.0 || size == 0 {
        return None;
    }
    let scale = size as f32 / longest;
    let width = (svg_size.width() * scale).round().max(1.0) as u32;
    let height = (svg_size.height() * scale).round().max(1.0) as u32;

    let mut pixmap = Pixmap::new(width, height)?;
    let transform = Transform::from_scale(scale, scale);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Some(pixmap_to_rgba_image(&pixmap))
}

/// Copies a premultiplied pixmap into a straight-alpha image.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (pixel, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *pixel = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    img
}
