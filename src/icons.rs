use anyhow::{Context, Result, anyhow};
use log::info;

use crate::config::IconEntry;
use crate::pack::glyph::GlyphRecord;
use crate::pack::image::GlyphImage;

/// Loads an imported icon image as a colored glyph. Icons always write to
/// all four texture channels and are never outlined.
pub fn load_icon(entry: &IconEntry) -> Result<GlyphRecord> {
    let img = image::open(&entry.path)
        .with_context(|| format!("failed to load icon {:?}", entry.path))?
        .to_rgba8();

    let (w, h) = img.dimensions();
    let mut gimg = GlyphImage::new(w as i32, h as i32)
        .map_err(|_| anyhow!("out of memory loading icon {:?}", entry.path))?;
    for (px, rgba) in gimg.pixels.iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = rgba.0;
        *px = ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
    }

    info!("loaded icon {:?} as id {} ({}x{})", entry.path, entry.id, w, h);
    Ok(GlyphRecord::from_image(
        entry.id,
        gimg,
        entry.xoffset,
        entry.yoffset,
        entry.advance,
    ))
}
