//! Indexed PNG encoding.
//!
//! Output is always PNG color type 3 (indexed) at the smallest bit depth that
//! can address the palette, so a three-color badge is stored at 2 bits per
//! pixel. Transparency goes into a tRNS chunk trimmed after the last entry
//! that is not fully opaque.

use std::io::Write;

use png::{BitDepth, ColorType, Encoder};

use crate::config::PngCompression;
use crate::error::Result;
use crate::quantize::PaletteImage;

/// Smallest PNG bit depth able to index `palette_len` entries.
pub fn bit_depth_for(palette_len: usize) -> BitDepth {
    match palette_len {
        0..=2 => BitDepth::One,
        3..=4 => BitDepth::Two,
        5..=16 => BitDepth::Four,
        _ => BitDepth::Eight,
    }
}

/// Encodes an indexed image as PNG into `writer`.
pub fn encode_png<W: Write>(image: &PaletteImage, writer: W, compression: PngCompression) -> Result<()> {
    let depth = bit_depth_for(image.palette().len());

    let mut encoder = Encoder::new(writer, image.width(), image.height());
    encoder.set_color(ColorType::Indexed);
    encoder.set_depth(depth);
    encoder.set_compression(compression.into());

    // Flatten palette to [R, G, B, R, G, B, ...]
    let rgb: Vec<u8> = image
        .palette()
        .iter()
        .flat_map(|c| [c.red, c.green, c.blue])
        .collect();
    encoder.set_palette(rgb);

    let trns = transparency_table(image);
    if !trns.is_empty() {
        encoder.set_trns(trns);
    }

    let data = pack_indices(image.indices(), image.width() as usize, depth as u8);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(&data)?;
    writer.finish()?;
    Ok(())
}

/// Encodes an indexed image as PNG bytes.
pub fn encode_png_to_vec(image: &PaletteImage, compression: PngCompression) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    encode_png(image, &mut bytes, compression)?;
    Ok(bytes)
}

/// Alpha values up to and including the last non-opaque palette entry.
fn transparency_table(image: &PaletteImage) -> Vec<u8> {
    let alphas: Vec<u8> = image.palette().iter().map(|c| c.alpha).collect();
    let keep = alphas.iter().rposition(|&a| a != 255).map_or(0, |i| i + 1);
    alphas[..keep].to_vec()
}

/// Packs one-byte indices into rows of `bits`-wide samples, MSB first.
///
/// Each row starts on a byte boundary as PNG requires.
fn pack_indices(indices: &[u8], width: usize, bits: u8) -> Vec<u8> {
    if bits == 8 || width == 0 {
        return indices.to_vec();
    }

    let per_byte = usize::from(8 / bits);
    let row_bytes = width.div_ceil(per_byte);
    let mut packed = Vec::with_capacity(row_bytes * (indices.len() / width));

    for row in indices.chunks(width) {
        for group in row.chunks(per_byte) {
            let mut byte = 0u8;
            for (i, &index) in group.iter().enumerate() {
                let shift = 8 - bits * (i as u8 + 1);
                byte |= index << shift;
            }
            packed.push(byte);
        }
    }

    packed
}
