//! The color and icon tables every job draws from.
//!
//! An [`AssetCatalog`] is built once at startup from a [`CatalogManifest`]
//! and a [`BitmapSource`]. Building it preprocesses every icon into masks, so
//! after construction the catalog is immutable and is shared by reference
//! with every worker.
//!
//! # Manifest Format
//!
//! ```json
//! {
//!   "colors": [
//!     { "r": 200, "g": 40, "b": 40, "affinity": "primary" },
//!     { "r": 20, "g": 20, "b": 90, "affinity": "secondary" }
//!   ],
//!   "icons": [
//!     { "icon": "Star", "layer": "symbol" },
//!     { "icon": "shield", "outline": "shield_outline", "layer": "border" }
//!   ]
//! }
//! ```
//!
//! Row position is the public index of a color or icon. Roles may also be
//! written as the numbers `0` (primary/symbol) and `1` (secondary/border).

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use image::{Rgba, RgbaImage};
use palette::Srgb;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RenderConfig;
use crate::error::{BadgeError, Result};
use crate::mask::Mask;
use crate::preprocess::prepare_mask;

// ============================================================================
// Roles
// ============================================================================

/// Which layer a color may tint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "RoleCode")]
pub enum LayerAffinity {
    /// Tints the symbol and the border outline.
    Primary,
    /// Tints the border base.
    Secondary,
}

/// Which layer an icon is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "RoleCode")]
pub enum IconLayer {
    /// Drawn centered at reduced scale on top of the border.
    Symbol,
    /// Drawn at full scale as the badge background, with an optional outline.
    Border,
}

/// Accepts either a role name or its numeric code.
#[derive(Deserialize)]
#[serde(untagged)]
enum RoleCode {
    Name(String),
    Code(u8),
}

impl RoleCode {
    fn ordinal(&self, names: [&str; 2]) -> std::result::Result<u8, String> {
        match self {
            Self::Code(code @ (0 | 1)) => Ok(*code),
            Self::Code(code) => Err(format!("unknown role code {code}")),
            Self::Name(name) => names
                .iter()
                .position(|n| n.eq_ignore_ascii_case(name))
                .map(|i| i as u8)
                .ok_or_else(|| format!("unknown role '{name}'")),
        }
    }
}

impl TryFrom<RoleCode> for LayerAffinity {
    type Error = String;

    fn try_from(code: RoleCode) -> std::result::Result<Self, String> {
        Ok(match code.ordinal(["primary", "secondary"])? {
            0 => Self::Primary,
            _ => Self::Secondary,
        })
    }
}

impl TryFrom<RoleCode> for IconLayer {
    type Error = String;

    fn try_from(code: RoleCode) -> std::result::Result<Self, String> {
        Ok(match code.ordinal(["symbol", "border"])? {
            0 => Self::Symbol,
            _ => Self::Border,
        })
    }
}

impl fmt::Display for IconLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol => f.write_str("symbol"),
            Self::Border => f.write_str("border"),
        }
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// One row of the color table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRow {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub affinity: LayerAffinity,
}

/// One row of the icon table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconRow {
    /// Asset name of the main shape.
    pub icon: String,

    /// Asset name of the outline drawn over a border shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<String>,

    pub layer: IconLayer,
}

/// The serialized form of the color and icon tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogManifest {
    #[serde(default)]
    pub colors: Vec<ColorRow>,
    #[serde(default)]
    pub icons: Vec<IconRow>,
}

impl CatalogManifest {
    /// Deserializes a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a manifest file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| BadgeError::CatalogRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

// ============================================================================
// Bitmap Loading
// ============================================================================

/// Resolves an asset name to a decoded RGBA bitmap.
///
/// Returning `None` means the asset is missing or undecodable; the catalog
/// then builds the icon without that mask.
pub trait BitmapSource {
    fn load(&self, name: &str) -> Option<RgbaImage>;
}

/// In-memory source keyed by exact asset name.
impl BitmapSource for HashMap<String, RgbaImage> {
    fn load(&self, name: &str) -> Option<RgbaImage> {
        self.get(name).cloned()
    }
}

// ============================================================================
// Catalog Entries
// ============================================================================

/// A tint color and the layer role it may fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorEntry {
    /// Row position in the color table.
    pub index: usize,
    pub rgb: Srgb<u8>,
    pub affinity: LayerAffinity,
}

impl ColorEntry {
    pub fn new(index: usize, rgb: Srgb<u8>, affinity: LayerAffinity) -> Self {
        Self { index, rgb, affinity }
    }

    /// The color as a fully opaque RGBA pixel.
    pub fn rgba(&self) -> Rgba<u8> {
        Rgba([self.rgb.red, self.rgb.green, self.rgb.blue, 255])
    }
}

/// A preprocessed icon.
#[derive(Debug, Clone, PartialEq)]
pub struct IconAsset {
    /// Row position in the icon table.
    pub index: usize,
    pub layer: IconLayer,
    /// Main shape, pre-scaled for its layer.
    pub mask: Option<Mask>,
    /// Outline shape; only set for border icons.
    pub outline: Option<Mask>,
}

// ============================================================================
// AssetCatalog
// ============================================================================

/// Immutable color and icon tables with preprocessed masks.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    canvas_size: u32,
    colors: Vec<ColorEntry>,
    icons: Vec<IconAsset>,
    primary: Vec<usize>,
    secondary: Vec<usize>,
    symbols: Vec<usize>,
    borders: Vec<usize>,
}

impl AssetCatalog {
    /// Loads a manifest file and builds the catalog.
    ///
    /// An unreadable or unparsable manifest is an error; missing bitmaps are
    /// not.
    pub fn load(path: &Path, source: &dyn BitmapSource, config: &RenderConfig) -> Result<Self> {
        let manifest = CatalogManifest::from_file(path)?;
        Ok(Self::build(&manifest, source, config))
    }

    /// Builds the catalog, preprocessing every icon's masks.
    pub fn build(
        manifest: &CatalogManifest,
        source: &dyn BitmapSource,
        config: &RenderConfig,
    ) -> Self {
        let colors: Vec<ColorEntry> = manifest
            .colors
            .iter()
            .enumerate()
            .map(|(index, row)| ColorEntry::new(index, Srgb::new(row.r, row.g, row.b), row.affinity))
            .collect();

        let icons: Vec<IconAsset> = manifest
            .icons
            .iter()
            .enumerate()
            .map(|(index, row)| build_icon(index, row, source, config))
            .collect();

        let catalog = Self::from_parts(config.canvas_size, colors, icons);
        info!(
            colors = catalog.colors.len(),
            icons = catalog.icons.len(),
            symbols = catalog.symbols.len(),
            borders = catalog.borders.len(),
            "Catalog built"
        );
        catalog
    }

    /// Assembles a catalog from already-built entries.
    ///
    /// Row position is the public index, so each entry's `index` field is
    /// overwritten with its position.
    pub fn from_parts(
        canvas_size: u32,
        mut colors: Vec<ColorEntry>,
        mut icons: Vec<IconAsset>,
    ) -> Self {
        for (position, color) in colors.iter_mut().enumerate() {
            if color.index != position {
                debug!(from = color.index, to = position, "Reindexing color entry");
                color.index = position;
            }
        }
        for (position, icon) in icons.iter_mut().enumerate() {
            if icon.index != position {
                debug!(from = icon.index, to = position, "Reindexing icon entry");
                icon.index = position;
            }
        }

        let by_affinity = |affinity| {
            colors
                .iter()
                .filter(|c| c.affinity == affinity)
                .map(|c| c.index)
                .collect::<Vec<_>>()
        };
        let by_layer = |layer| {
            icons
                .iter()
                .filter(|i| i.layer == layer)
                .map(|i| i.index)
                .collect::<Vec<_>>()
        };

        Self {
            canvas_size,
            primary: by_affinity(LayerAffinity::Primary),
            secondary: by_affinity(LayerAffinity::Secondary),
            symbols: by_layer(IconLayer::Symbol),
            borders: by_layer(IconLayer::Border),
            colors,
            icons,
        }
    }

    /// Edge length of the canvas the masks were built for.
    pub fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    pub fn colors(&self) -> &[ColorEntry] {
        &self.colors
    }

    pub fn icons(&self) -> &[IconAsset] {
        &self.icons
    }

    pub fn color(&self, index: usize) -> Option<&ColorEntry> {
        self.colors.get(index)
    }

    pub fn icon(&self, index: usize) -> Option<&IconAsset> {
        self.icons.get(index)
    }

    /// Indices of colors usable on the symbol and outline.
    pub fn primary_colors(&self) -> &[usize] {
        &self.primary
    }

    /// Indices of colors usable on the border base.
    pub fn secondary_colors(&self) -> &[usize] {
        &self.secondary
    }

    /// Indices of symbol-layer icons.
    pub fn symbol_icons(&self) -> &[usize] {
        &self.symbols
    }

    /// Indices of border-layer icons.
    pub fn border_icons(&self) -> &[usize] {
        &self.borders
    }

    /// Size of the full combination space.
    pub fn combination_count(&self) -> u64 {
        [
            self.symbols.len(),
            self.borders.len(),
            self.primary.len(),
            self.secondary.len(),
        ]
        .iter()
        .map(|&n| n as u64)
        .product()
    }
}

fn build_icon(
    index: usize,
    row: &IconRow,
    source: &dyn BitmapSource,
    config: &RenderConfig,
) -> IconAsset {
    let scale = match row.layer {
        IconLayer::Symbol => config.symbol_scale,
        IconLayer::Border => config.border_scale,
    };

    let mask = load_mask(index, &row.icon, source, scale, config.canvas_size);

    let outline = match (row.layer, row.outline.as_deref()) {
        (IconLayer::Border, Some(name)) => load_mask(index, name, source, scale, config.canvas_size),
        (IconLayer::Symbol, Some(name)) if !name.is_empty() => {
            debug!(index, outline = name, "Ignoring outline on symbol icon");
            None
        }
        _ => None,
    };

    IconAsset {
        index,
        layer: row.layer,
        mask,
        outline,
    }
}

fn load_mask(
    index: usize,
    name: &str,
    source: &dyn BitmapSource,
    scale: f64,
    canvas_size: u32,
) -> Option<Mask> {
    if name.is_empty() {
        return None;
    }
    let Some(raw) = source.load(name) else {
        warn!(index, asset = name, "Asset missing or undecodable, layer will be omitted");
        return None;
    };
    let mask = prepare_mask(Some(&raw), scale, canvas_size);
    if mask.is_none() {
        warn!(index, asset = name, scale, "Asset scales to nothing, layer will be omitted");
    }
    mask
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "colors": [
            { "r": 255, "g": 0, "b": 0, "affinity": "primary" },
            { "r": 0, "g": 255, "b": 0, "affinity": 0 },
            { "r": 0, "g": 0, "b": 255, "affinity": "Secondary" },
            { "r": 9, "g": 9, "b": 9, "affinity": 1 }
        ],
        "icons": [
            { "icon": "star", "layer": "symbol" },
            { "icon": "shield", "outline": "shield_line", "layer": 1 },
            { "icon": "ghost", "outline": "", "layer": "border" }
        ]
    }"#;

    fn assets() -> HashMap<String, RgbaImage> {
        let mut assets = HashMap::new();
        assets.insert("star".into(), RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255])));
        assets.insert("shield".into(), RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255])));
        assets.insert("shield_line".into(), RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 200])));
        assets
    }

    fn config() -> RenderConfig {
        RenderConfig::new().with_canvas_size(10)
    }

    #[test]
    fn manifest_accepts_names_and_codes() {
        let manifest = CatalogManifest::from_json(MANIFEST).unwrap();
        assert_eq!(manifest.colors[1].affinity, LayerAffinity::Primary);
        assert_eq!(manifest.colors[2].affinity, LayerAffinity::Secondary);
        assert_eq!(manifest.icons[1].layer, IconLayer::Border);
        assert_eq!(manifest.icons[0].outline, None);
    }

    #[test]
    fn manifest_rejects_unknown_roles() {
        let bad = r#"{ "colors": [ { "r": 1, "g": 2, "b": 3, "affinity": "tertiary" } ] }"#;
        assert!(CatalogManifest::from_json(bad).is_err());
        let bad_code = r#"{ "icons": [ { "icon": "x", "layer": 7 } ] }"#;
        assert!(CatalogManifest::from_json(bad_code).is_err());
    }

    #[test]
    fn manifest_rejects_out_of_range_channel() {
        let bad = r#"{ "colors": [ { "r": 256, "g": 0, "b": 0, "affinity": "primary" } ] }"#;
        assert!(CatalogManifest::from_json(bad).is_err());
    }

    #[test]
    fn build_partitions_roles() {
        let manifest = CatalogManifest::from_json(MANIFEST).unwrap();
        let catalog = AssetCatalog::build(&manifest, &assets(), &config());

        assert_eq!(catalog.primary_colors(), &[0, 1]);
        assert_eq!(catalog.secondary_colors(), &[2, 3]);
        assert_eq!(catalog.symbol_icons(), &[0]);
        assert_eq!(catalog.border_icons(), &[1, 2]);
        assert_eq!(catalog.combination_count(), 8);
        assert_eq!(catalog.color(2).unwrap().rgba(), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn build_bakes_layer_scale_into_masks() {
        let manifest = CatalogManifest::from_json(MANIFEST).unwrap();
        let catalog = AssetCatalog::build(&manifest, &assets(), &config());

        let symbol = catalog.icon(0).unwrap().mask.as_ref().unwrap();
        assert_eq!(symbol.bounds().width, 7);

        let border = catalog.icon(1).unwrap();
        assert_eq!(border.mask.as_ref().unwrap().bounds().width, 10);
        assert_eq!(border.outline.as_ref().unwrap().coverage(5, 5), 200);
    }

    #[test]
    fn missing_assets_leave_masks_absent() {
        let manifest = CatalogManifest::from_json(MANIFEST).unwrap();
        let catalog = AssetCatalog::build(&manifest, &assets(), &config());

        let ghost = catalog.icon(2).unwrap();
        assert!(ghost.mask.is_none());
        assert!(ghost.outline.is_none());
    }

    #[test]
    fn empty_role_means_no_combinations() {
        let manifest = CatalogManifest {
            colors: vec![ColorRow { r: 1, g: 2, b: 3, affinity: LayerAffinity::Primary }],
            icons: vec![],
        };
        let catalog = AssetCatalog::build(&manifest, &assets(), &config());
        assert_eq!(catalog.combination_count(), 0);
    }

    #[test]
    fn from_parts_indexes_by_position() {
        let colors = vec![
            ColorEntry::new(7, Srgb::new(1, 1, 1), LayerAffinity::Secondary),
            ColorEntry::new(3, Srgb::new(2, 2, 2), LayerAffinity::Primary),
        ];
        let icons = vec![IconAsset {
            index: 9,
            layer: IconLayer::Border,
            mask: None,
            outline: None,
        }];
        let catalog = AssetCatalog::from_parts(4, colors, icons);

        assert_eq!(catalog.secondary_colors(), &[0]);
        assert_eq!(catalog.primary_colors(), &[1]);
        assert_eq!(catalog.border_icons(), &[0]);
        assert_eq!(catalog.color(1).unwrap().index, 1);
        assert_eq!(catalog.color(1).unwrap().rgb, Srgb::new(2, 2, 2));
        assert_eq!(catalog.icon(0).unwrap().index, 0);
    }

    #[test]
    fn load_reports_unreadable_manifest() {
        let err = AssetCatalog::load(Path::new("/nonexistent/catalog.json"), &assets(), &config())
            .unwrap_err();
        assert!(matches!(err, BadgeError::CatalogRead { .. }));
    }
}
