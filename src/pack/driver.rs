use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use crate::pack::glyph::GlyphRecord;
use crate::pack::page::Page;
use crate::pack::{PackError, PageFormat};

/// Cooperative abort signal, checked between glyph placements and page
/// creations. Cancelling mid-run discards partially built pages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Page geometry and format shared by every page of one generation run.
#[derive(Debug, Clone, Copy)]
pub struct PackSettings {
    pub page_width: i32,
    pub page_height: i32,
    pub spacing_h: i32,
    pub spacing_v: i32,
    pub padding_left: i32,
    pub padding_up: i32,
    pub padding_right: i32,
    pub padding_down: i32,
    pub format: PageFormat,
}

impl Default for PackSettings {
    fn default() -> PackSettings {
        PackSettings {
            page_width: 256,
            page_height: 256,
            spacing_h: 1,
            spacing_v: 1,
            padding_left: 0,
            padding_up: 0,
            padding_right: 0,
            padding_down: 0,
            format: PageFormat::default(),
        }
    }
}

impl PackSettings {
    /// Whether a glyph's padded footprint can ever fit a page. Glyphs
    /// failing this must be excluded upfront or packing would loop forever.
    pub fn fits_page(&self, glyph: &GlyphRecord) -> bool {
        if glyph.width <= 0 || glyph.height <= 0 {
            return true;
        }
        glyph.height + self.padding_up + self.padding_down
            <= self.page_height - self.spacing_v
            && glyph.width + self.padding_right + self.padding_left
                <= self.page_width - self.spacing_h
    }
}

/// Result of one packing run: the finished pages plus the ids of glyphs
/// whose footprint exceeded page capacity (a warning, not an error).
pub struct PackOutcome {
    pub pages: Vec<Page>,
    pub no_fit: Vec<i32>,
}

/// Packs every glyph onto as many pages as needed.
///
/// Too-large glyphs land in `no_fit`; everything else is guaranteed to be
/// placed on exactly one page. `on_placed` is invoked with the running
/// placement count after every glyph, which is also where the abort flag is
/// polled. Page indices are assigned strictly in creation order.
pub fn pack_all(
    settings: &PackSettings,
    glyphs: Vec<GlyphRecord>,
    cancel: &CancelFlag,
    mut on_placed: impl FnMut(usize),
) -> Result<PackOutcome, PackError> {
    let mut no_fit: Vec<i32> = Vec::new();
    let mut pending: Vec<Option<GlyphRecord>> = Vec::new();

    for glyph in glyphs {
        if settings.fits_page(&glyph) {
            pending.push(Some(glyph));
        } else {
            debug!(
                "glyph {} ({}x{}) is too large for a {}x{} page",
                glyph.id, glyph.width, glyph.height, settings.page_width, settings.page_height
            );
            no_fit.push(glyph.id);
        }
    }

    let total = pending.len();
    info!(
        "packing {} glyphs onto {}x{} pages ({} too large)",
        total,
        settings.page_width,
        settings.page_height,
        no_fit.len()
    );

    let mut pages: Vec<Page> = Vec::new();
    let mut placed = 0usize;

    while !pending.is_empty() {
        if cancel.is_cancelled() {
            // Drop the partial result rather than hold memory for output
            // that will be thrown away.
            drop(pages);
            return Err(PackError::Cancelled);
        }

        let mut page = Page::new(
            pages.len() as i32,
            settings.page_width,
            settings.page_height,
            settings.spacing_h,
            settings.spacing_v,
        )?;
        page.set_padding(
            settings.padding_left,
            settings.padding_up,
            settings.padding_right,
            settings.padding_down,
        );
        page.set_format(settings.format);

        let before = placed;
        page.add_batch(&mut pending, cancel, &mut || {
            placed += 1;
            on_placed(placed);
        })?;

        if placed == before {
            // A fresh page took nothing, so no later page will either.
            // Surface the leftovers as unplaceable instead of spinning.
            warn!(
                "page {} accepted no glyphs; {} remaining glyphs do not fit",
                page.id(),
                pending.iter().flatten().count()
            );
            no_fit.extend(pending.iter().flatten().map(|g| g.id));
            pending.clear();
            break;
        }

        debug!(
            "page {} holds {} glyphs ({} of {} placed)",
            page.id(),
            page.glyphs().len(),
            placed,
            total
        );
        pages.push(page);

        // Compact the pending array, dropping placed entries.
        let mut n = 0;
        while n < pending.len() {
            if pending[n].is_none() {
                pending.swap_remove(n);
            } else {
                n += 1;
            }
        }
    }

    info!("packed {} glyphs onto {} pages", placed, pages.len());
    Ok(PackOutcome { pages, no_fit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::glyph::GlyphRecord;
    use crate::pack::image::GlyphImage;

    fn glyph(id: i32, w: i32, h: i32) -> GlyphRecord {
        let mut img = GlyphImage::new(w, h).unwrap();
        img.clear(0xFFFF_FFFF);
        GlyphRecord::new(id, img, 0, 0, w + 1)
    }

    fn settings(w: i32, h: i32) -> PackSettings {
        PackSettings {
            page_width: w,
            page_height: h,
            spacing_h: 0,
            spacing_v: 0,
            ..PackSettings::default()
        }
    }

    #[test]
    fn cancellation_discards_partial_pages() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let r = pack_all(&settings(64, 64), vec![glyph(65, 8, 8)], &cancel, |_| {});
        assert_eq!(r.err(), Some(PackError::Cancelled));
    }

    #[test]
    fn cancellation_mid_run_is_observed_at_glyph_granularity() {
        let cancel = CancelFlag::new();
        let glyphs: Vec<_> = (0..20).map(|n| glyph(n, 8, 8)).collect();
        let flag = cancel.clone();
        let r = pack_all(&settings(64, 64), glyphs, &cancel, move |count| {
            if count == 3 {
                flag.cancel();
            }
        });
        assert_eq!(r.err(), Some(PackError::Cancelled));
    }

    #[test]
    fn progress_reports_running_count() {
        let mut seen = Vec::new();
        let glyphs: Vec<_> = (0..5).map(|n| glyph(n, 8, 8)).collect();
        pack_all(&settings(64, 64), glyphs, &CancelFlag::new(), |count| {
            seen.push(count)
        })
        .unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn zero_size_glyphs_pack_trivially() {
        let glyphs = vec![glyph(32, 0, 0), glyph(65, 8, 8)];
        let out = pack_all(&settings(64, 64), glyphs, &CancelFlag::new(), |_| {}).unwrap();
        assert_eq!(out.pages.len(), 1);
        assert_eq!(out.pages[0].glyphs().len(), 2);
        assert!(out.no_fit.is_empty());
    }
}
