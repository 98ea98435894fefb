//! Single-job rendering: composite, quantize, encode.

use tracing::trace;

use crate::canvas::CanvasPool;
use crate::catalog::AssetCatalog;
use crate::composite::{LayerStack, lookup_color};
use crate::config::PngCompression;
use crate::encode::encode_png_to_vec;
use crate::error::Result;
use crate::job::RenderJob;
use crate::quantize::{PaletteImage, quantize};

/// Renders jobs against one catalog.
///
/// The renderer owns the canvas pool and is shared by reference between
/// worker threads.
#[derive(Debug)]
pub struct BadgeRenderer<'a> {
    catalog: &'a AssetCatalog,
    pool: CanvasPool,
    compression: PngCompression,
}

impl<'a> BadgeRenderer<'a> {
    pub fn new(catalog: &'a AssetCatalog, compression: PngCompression) -> Self {
        Self {
            catalog,
            pool: CanvasPool::new(catalog.canvas_size()),
            compression,
        }
    }

    pub fn catalog(&self) -> &'a AssetCatalog {
        self.catalog
    }

    pub fn pool(&self) -> &CanvasPool {
        &self.pool
    }

    /// Composites and quantizes one job.
    ///
    /// Fails only on invalid indices; absent masks just leave layers out.
    pub fn render(&self, job: &RenderJob) -> Result<PaletteImage> {
        let stack = LayerStack::for_job(self.catalog, job)?;
        let color1 = lookup_color(self.catalog, job, job.color1)?.rgb;
        let color2 = lookup_color(self.catalog, job, job.color2)?.rgb;

        let mut canvas = self.pool.checkout();
        stack.composite(&mut canvas);
        trace!(job = %job, layers = stack.layers().count(), "Composited");

        Ok(quantize(&canvas, color1, color2))
    }

    /// Renders one job to PNG bytes.
    pub fn render_png(&self, job: &RenderJob) -> Result<Vec<u8>> {
        let image = self.render(job)?;
        encode_png_to_vec(&image, self.compression)
    }
}
