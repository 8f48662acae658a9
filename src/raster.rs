use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::{debug, info};

use crate::pack::glyph::GlyphRecord;
use crate::pack::image::GlyphImage;

/// Id exported for the invalid-character glyph (.notdef).
pub const INVALID_CHAR_ID: i32 = -1;

/// Rasterizes font glyphs into packable records. This is the seam between
/// the packing core and the font backend; everything downstream only sees
/// `GlyphRecord`s with pixel data and metrics.
pub struct FontRaster {
    font: fontdue::Font,
    size: f32,
    face_name: String,
    base: i32,
    line_height: i32,
}

impl FontRaster {
    pub fn load(path: &Path, size: i32) -> Result<FontRaster> {
        let data = fs::read(path).with_context(|| format!("failed to read font {:?}", path))?;
        let font = fontdue::Font::from_bytes(
            data,
            fontdue::FontSettings {
                scale: size as f32,
                ..fontdue::FontSettings::default()
            },
        )
        .map_err(|e| anyhow!("failed to parse font {:?}: {}", path, e))?;

        let size = size as f32;
        let line = font
            .horizontal_line_metrics(size)
            .ok_or_else(|| anyhow!("font {:?} has no horizontal metrics", path))?;
        let base = line.ascent.round() as i32;
        let line_height = line.new_line_size.ceil() as i32;

        let face_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!(
            "loaded font {:?}: size {:.0}px, base {}, line height {}",
            path, size, base, line_height
        );

        Ok(FontRaster {
            font,
            size,
            face_name,
            base,
            line_height,
        })
    }

    pub fn face_name(&self) -> &str {
        &self.face_name
    }

    /// Distance from the top of a line cell to the baseline, in pixels.
    pub fn base(&self) -> i32 {
        self.base
    }

    pub fn line_height(&self) -> i32 {
        self.line_height
    }

    pub fn has_glyph(&self, id: u32) -> bool {
        char::from_u32(id).is_some_and(|c| self.font.lookup_glyph_index(c) != 0)
    }

    /// Rasterizes one character. Coverage is replicated into all four ARGB
    /// lanes so the low byte carries the value the channel encoder reads
    /// while previews stay viewable.
    pub fn rasterize_char(&self, id: u32) -> Result<GlyphRecord> {
        let c = char::from_u32(id).ok_or_else(|| anyhow!("invalid character code {}", id))?;
        let (metrics, bitmap) = self.font.rasterize(c, self.size);
        self.build_record(id as i32, metrics, &bitmap)
    }

    /// The glyph substituted for characters missing from the font,
    /// exported under the reserved id -1.
    pub fn invalid_glyph(&self) -> Result<GlyphRecord> {
        let (metrics, bitmap) = self.font.rasterize_indexed(0, self.size);
        self.build_record(INVALID_CHAR_ID, metrics, &bitmap)
    }

    fn build_record(
        &self,
        id: i32,
        metrics: fontdue::Metrics,
        bitmap: &[u8],
    ) -> Result<GlyphRecord> {
        let mut img = GlyphImage::new(metrics.width as i32, metrics.height as i32)
            .map_err(|_| anyhow!("out of memory rasterizing glyph {}", id))?;
        for (px, &cov) in img.pixels.iter_mut().zip(bitmap) {
            let c = cov as u32;
            *px = (c << 24) | (c << 16) | (c << 8) | c;
        }

        // Map fontdue's baseline-relative, y-up metrics onto the
        // top-of-cell, y-down convention the descriptor uses.
        let xoffset = metrics.xmin;
        let yoffset = self.base - (metrics.ymin + metrics.height as i32);
        let advance = metrics.advance_width.round() as i32;

        Ok(GlyphRecord::new(id, img, xoffset, yoffset, advance))
    }

    /// Kerning adjustments for every ordered pair of the selected
    /// characters, in pixels; zero-amount pairs are dropped.
    pub fn kerning_pairs(&self, chars: &[u32]) -> Vec<(u32, u32, i32)> {
        let mut pairs = Vec::new();
        for &first in chars {
            let Some(a) = char::from_u32(first) else {
                continue;
            };
            for &second in chars {
                let Some(b) = char::from_u32(second) else {
                    continue;
                };
                if let Some(amount) = self.font.horizontal_kern(a, b, self.size) {
                    let amount = amount.round() as i32;
                    if amount != 0 {
                        pairs.push((first, second, amount));
                    }
                }
            }
        }
        debug!("{} kerning pairs extracted", pairs.len());
        pairs
    }
}
