use std::path::Path;

use anyhow::{Context, Result};
use image::{GrayImage, RgbaImage};
use log::info;

use crate::pack::image::GlyphImage;
use crate::pack::page::Page;

/// Saves a page's final texture. 32-bit output keeps all four channels;
/// 8-bit output keeps only the low byte of each pixel, which the channel
/// composition writes identically into every lane.
pub fn save_page(page: &Page, path: &Path, bit_depth: i32) -> Result<()> {
    let composed = page
        .compose_output()
        .with_context(|| format!("failed to compose page {}", page.id()))?;

    if bit_depth == 32 {
        to_rgba(&composed)
            .save(path)
            .with_context(|| format!("failed to write texture {:?}", path))?;
    } else {
        to_gray(&composed)
            .save(path)
            .with_context(|| format!("failed to write texture {:?}", path))?;
    }
    info!(
        "wrote page {} ({} glyphs) to {:?}",
        page.id(),
        page.glyphs().len(),
        path
    );
    Ok(())
}

/// Saves the editor-style preview of one channel, with unused space and
/// spacing borders colored in.
pub fn save_preview(page: &Page, channel: usize, path: &Path) -> Result<()> {
    let composed = page
        .compose_preview(channel)
        .with_context(|| format!("failed to compose preview of page {}", page.id()))?;
    to_rgba(&composed)
        .save(path)
        .with_context(|| format!("failed to write preview {:?}", path))
}

fn to_rgba(img: &GlyphImage) -> RgbaImage {
    let mut out = RgbaImage::new(img.width as u32, img.height as u32);
    for (px, &p) in out.pixels_mut().zip(&img.pixels) {
        px.0 = [
            (p >> 16) as u8,
            (p >> 8) as u8,
            p as u8,
            (p >> 24) as u8,
        ];
    }
    out
}

fn to_gray(img: &GlyphImage) -> GrayImage {
    let mut out = GrayImage::new(img.width as u32, img.height as u32);
    for (px, &p) in out.pixels_mut().zip(&img.pixels) {
        px.0 = [p as u8];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_conversion_splits_lanes() {
        let mut img = GlyphImage::new(2, 1).unwrap();
        img.set(0, 0, 0x8040_2010);
        let rgba = to_rgba(&img);
        assert_eq!(rgba.get_pixel(0, 0).0, [0x40, 0x20, 0x10, 0x80]);
        assert_eq!(rgba.get_pixel(1, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn gray_conversion_keeps_low_byte() {
        let mut img = GlyphImage::new(1, 1).unwrap();
        img.set(0, 0, 0xFFEE_DDCC);
        let gray = to_gray(&img);
        assert_eq!(gray.get_pixel(0, 0).0, [0xCC]);
    }
}
