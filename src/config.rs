//! Render configuration.
//!
//! A [`RenderConfig`] captures every tunable of a run in a JSON-friendly
//! format. Every field has a default, so an empty object is a valid config:
//!
//! ```json
//! {
//!   "canvasSize": 300,
//!   "symbolScale": 0.7,
//!   "borderScale": 1.0,
//!   "workers": null,
//!   "queueDepthPerWorker": 2,
//!   "progressEvery": 100,
//!   "compression": "best"
//! }
//! ```

use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BadgeError, Result};

/// Default edge length of the square output canvas, in pixels.
pub const DEFAULT_CANVAS_SIZE: u32 = 300;

/// Default scale of the symbol layer relative to its source bitmap.
pub const DEFAULT_SYMBOL_SCALE: f64 = 0.7;

// ============================================================================
// PngCompression
// ============================================================================

/// Deflate effort used when writing output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PngCompression {
    Fast,
    Default,
    #[default]
    Best,
}

impl From<PngCompression> for png::Compression {
    fn from(level: PngCompression) -> Self {
        match level {
            PngCompression::Fast => png::Compression::Fast,
            PngCompression::Default => png::Compression::Default,
            PngCompression::Best => png::Compression::Best,
        }
    }
}

// ============================================================================
// RenderConfig
// ============================================================================

/// All settings that shape a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    /// Edge length of the square canvas in pixels.
    pub canvas_size: u32,

    /// Scale applied to symbol bitmaps before centering (0.0-1.0].
    pub symbol_scale: f64,

    /// Scale applied to border and outline bitmaps (0.0-1.0].
    pub border_scale: f64,

    /// Number of worker threads. `None` uses the available parallelism.
    pub workers: Option<usize>,

    /// Bounded queue slots per worker.
    pub queue_depth_per_worker: usize,

    /// Report progress every this many completed jobs.
    pub progress_every: u64,

    /// PNG deflate effort.
    pub compression: PngCompression,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas_size: DEFAULT_CANVAS_SIZE,
            symbol_scale: DEFAULT_SYMBOL_SCALE,
            border_scale: 1.0,
            workers: None,
            queue_depth_per_worker: 2,
            progress_every: 100,
            compression: PngCompression::default(),
        }
    }
}

impl RenderConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the canvas size.
    pub fn with_canvas_size(mut self, size: u32) -> Self {
        self.canvas_size = size;
        self
    }

    /// Sets a fixed worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Sets the progress reporting cadence.
    pub fn with_progress_every(mut self, every: u64) -> Self {
        self.progress_every = every;
        self
    }

    /// Deserializes a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| BadgeError::io(path, e))?;
        Self::from_json(&json)
    }

    /// Serializes the config to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resolves the worker count, falling back to the hardware parallelism.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    /// Capacity of the job queue between the producer and the workers.
    pub fn queue_capacity(&self) -> usize {
        self.worker_count() * self.queue_depth_per_worker
    }

    /// Checks that every field is usable.
    pub fn validate(&self) -> Result<()> {
        if self.canvas_size == 0 {
            return Err(invalid("canvasSize", "must be greater than zero"));
        }
        check_scale("symbolScale", self.symbol_scale)?;
        check_scale("borderScale", self.border_scale)?;
        if self.workers == Some(0) {
            return Err(invalid("workers", "must be at least one"));
        }
        if self.queue_depth_per_worker == 0 {
            return Err(invalid("queueDepthPerWorker", "must be at least one"));
        }
        if self.progress_every == 0 {
            return Err(invalid("progressEvery", "must be at least one"));
        }
        Ok(())
    }
}

fn check_scale(field: &'static str, scale: f64) -> Result<()> {
    if scale > 0.0 && scale <= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{scale} is outside (0, 1]")))
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> BadgeError {
    BadgeError::InvalidConfig {
        field,
        message: message.into(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config = RenderConfig::from_json("{}").unwrap();
        assert_eq!(config, RenderConfig::default());
        assert_eq!(config.canvas_size, 300);
        assert_eq!(config.symbol_scale, 0.7);
    }

    #[test]
    fn json_is_camel_case() {
        let json = RenderConfig::new().to_json_pretty().unwrap();
        assert!(json.contains("\"canvasSize\""));
        assert!(json.contains("\"queueDepthPerWorker\""));
        assert!(json.contains("\"best\""));
    }

    #[test]
    fn partial_json_overrides() {
        let config =
            RenderConfig::from_json(r#"{"canvasSize": 64, "compression": "fast"}"#).unwrap();
        assert_eq!(config.canvas_size, 64);
        assert_eq!(config.compression, PngCompression::Fast);
        assert_eq!(config.progress_every, 100);
    }

    #[test]
    fn validate_rejects_bad_scale() {
        let mut config = RenderConfig::new();
        config.symbol_scale = 0.0;
        assert!(config.validate().is_err());
        config.symbol_scale = 1.5;
        assert!(config.validate().is_err());
        config.symbol_scale = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_sizes() {
        assert!(RenderConfig::new().with_canvas_size(0).validate().is_err());
        assert!(RenderConfig::new().with_workers(0).validate().is_err());
        assert!(RenderConfig::new().with_progress_every(0).validate().is_err());
    }

    #[test]
    fn queue_capacity_scales_with_workers() {
        let config = RenderConfig::new().with_workers(3);
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.queue_capacity(), 6);
    }

    #[test]
    fn default_workers_is_positive() {
        assert!(RenderConfig::new().worker_count() >= 1);
    }
}
