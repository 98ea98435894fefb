//! badge-forge: combinatorial badge generation
//!
//! This crate layers tinted icon masks into small badges and writes each one
//! as a compact indexed PNG. A run covers every combination of symbol icon,
//! border icon, primary color and secondary color in an [`AssetCatalog`].
//!
//! # Example
//!
//! ```no_run
//! use badge_forge::{AssetCatalog, AssetDirectory, OutputDir, RenderConfig, Scheduler};
//! use std::path::Path;
//!
//! let config = RenderConfig::new();
//! let assets = AssetDirectory::scan("assets", config.canvas_size);
//! let catalog = AssetCatalog::load(Path::new("catalog.json"), &assets, &config)?;
//!
//! let summary = Scheduler::new(&catalog, &config, OutputDir::new("out")).run()?;
//! println!("rendered {} of {}", summary.rendered, summary.total);
//! # Ok::<(), badge_forge::BadgeError>(())
//! ```
//!
//! # Rendering One Badge
//!
//! Catalogs can also be built in memory from any [`BitmapSource`]:
//!
//! ```
//! use badge_forge::{
//!     AssetCatalog, BadgeRenderer, CatalogManifest, PngCompression, RenderConfig, RenderJob,
//! };
//! use image::{Rgba, RgbaImage};
//! use std::collections::HashMap;
//!
//! let manifest = CatalogManifest::from_json(r#"{
//!     "colors": [
//!         { "r": 200, "g": 40, "b": 40, "affinity": "primary" },
//!         { "r": 20, "g": 20, "b": 90, "affinity": "secondary" }
//!     ],
//!     "icons": [
//!         { "icon": "dot", "layer": "symbol" },
//!         { "icon": "plate", "layer": "border" }
//!     ]
//! }"#)?;
//!
//! let mut assets = HashMap::new();
//! assets.insert("dot".to_string(), RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 255])));
//! assets.insert("plate".to_string(), RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 255])));
//!
//! let config = RenderConfig::new().with_canvas_size(32);
//! let catalog = AssetCatalog::build(&manifest, &assets, &config);
//!
//! let renderer = BadgeRenderer::new(&catalog, PngCompression::Best);
//! let png = renderer.render_png(&RenderJob::new(0, 1, 0, 1))?;
//! assert_eq!(&png[1..4], b"PNG");
//! # Ok::<(), badge_forge::BadgeError>(())
//! ```

mod assets;
mod canvas;
mod catalog;
mod composite;
mod config;
mod encode;
mod error;
mod job;
mod mask;
mod output;
mod preprocess;
mod progress;
mod quantize;
mod render;
mod scheduler;
mod svg;

pub use assets::AssetDirectory;
pub use canvas::{CanvasPool, PooledCanvas};
pub use catalog::{
    AssetCatalog, BitmapSource, CatalogManifest, ColorEntry, ColorRow, IconAsset, IconLayer,
    IconRow, LayerAffinity,
};
pub use composite::{LayerRole, LayerStack, TintLayer, tint_over};
pub use config::{DEFAULT_CANVAS_SIZE, DEFAULT_SYMBOL_SCALE, PngCompression, RenderConfig};
pub use encode::{bit_depth_for, encode_png, encode_png_to_vec};
pub use error::{BadgeError, Result};
pub use job::{JobSpace, RenderJob, SINGLE_JOB_FILENAME};
pub use mask::{Mask, RectPx, SizePx};
pub use output::OutputDir;
pub use preprocess::{Placement, prepare_mask};
pub use progress::{LogProgress, NoProgress, Progress, ProgressSink, TerminalProgress};
pub use quantize::{MAX_PALETTE_SIZE, PaletteImage, TRANSPARENT_INDEX, TintPalette, quantize};
pub use render::BadgeRenderer;
pub use scheduler::{CancelToken, RunSummary, Scheduler, SchedulerState, run_single};
pub use svg::rasterize_svg;
