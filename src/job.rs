//! Render jobs and the combination space they are drawn from.

use std::fmt;
use std::str::FromStr;

use crate::catalog::AssetCatalog;
use crate::error::BadgeError;

/// Filename used by single-job mode.
pub const SINGLE_JOB_FILENAME: &str = "badge.png";

/// One badge: a symbol on a border, tinted with a primary and a secondary color.
///
/// All four fields are public catalog indices. The output filename is a pure
/// function of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderJob {
    pub symbol: usize,
    pub border: usize,
    /// Primary color, used for the symbol and the outline.
    pub color1: usize,
    /// Secondary color, used for the border base.
    pub color2: usize,
}

impl RenderJob {
    pub fn new(symbol: usize, border: usize, color1: usize, color2: usize) -> Self {
        Self {
            symbol,
            border,
            color1,
            color2,
        }
    }

    /// Canonical output filename: `{symbol}-{border}-{color1}-{color2}.png`.
    pub fn filename(&self) -> String {
        format!("{self}.png")
    }
}

impl fmt::Display for RenderJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.symbol, self.border, self.color1, self.color2
        )
    }
}

/// Parses the single-job quadruple `S_B_C1_C2`.
///
/// Only the shape is checked here; index ranges are checked against the
/// catalog when the job is rendered.
impl FromStr for RenderJob {
    type Err = BadgeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |message: String| BadgeError::InvalidJob {
            input: input.to_string(),
            message,
        };

        let parts: Vec<&str> = input.split('_').collect();
        if parts.len() != 4 {
            return Err(invalid(format!(
                "expected 4 underscore-separated indices, found {}",
                parts.len()
            )));
        }

        let mut indices = [0usize; 4];
        for (slot, part) in indices.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse()
                .map_err(|_| invalid(format!("'{part}' is not a valid index")))?;
        }

        let [symbol, border, color1, color2] = indices;
        Ok(Self::new(symbol, border, color1, color2))
    }
}

/// The Cartesian product of symbols, borders, primary and secondary colors.
#[derive(Debug, Clone, Copy)]
pub struct JobSpace<'a> {
    catalog: &'a AssetCatalog,
}

impl<'a> JobSpace<'a> {
    pub fn new(catalog: &'a AssetCatalog) -> Self {
        Self { catalog }
    }

    /// Number of jobs in the space.
    pub fn len(&self) -> u64 {
        self.catalog.combination_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerates every job.
    ///
    /// Colors vary slowest, so consecutive jobs share a palette.
    pub fn iter(&self) -> impl Iterator<Item = RenderJob> + 'a {
        let catalog = self.catalog;
        catalog.primary_colors().iter().flat_map(move |&color1| {
            catalog.secondary_colors().iter().flat_map(move |&color2| {
                catalog.symbol_icons().iter().flat_map(move |&symbol| {
                    catalog
                        .border_icons()
                        .iter()
                        .map(move |&border| RenderJob::new(symbol, border, color1, color2))
                })
            })
        })
    }
}
