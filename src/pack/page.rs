use log::{debug, trace};

use crate::pack::driver::CancelFlag;
use crate::pack::glyph::GlyphRecord;
use crate::pack::image::GlyphImage;
use crate::pack::profile::{FreeProfile, Hole};
use crate::pack::{ChannelContent, PackError, PageFormat};

/// Preview fill for space no glyph occupies.
const CLR_UNUSED: u32 = 0x00FF_0000;
/// Preview color for the spacing border around each glyph.
const CLR_BORDER: u32 = 0x0000_7F00;

/// One fixed-size output texture. Owns a free-space profile per channel,
/// the list of glyphs placed on it, and the padding/spacing configuration.
///
/// Placement happens in color-class passes: colored/icon images first
/// (channel-agnostic), then monochrome glyphs into channel 0, and when
/// four-channel packing is on, further monochrome passes into channels 1-3
/// that each start from the post-colored occupancy state.
pub struct Page {
    id: i32,
    width: i32,
    height: i32,
    spacing_h: i32,
    spacing_v: i32,
    padding_left: i32,
    padding_up: i32,
    padding_right: i32,
    padding_down: i32,
    format: PageFormat,
    profiles: Vec<FreeProfile>,
    curr_x: i32,
    chars: Vec<GlyphRecord>,
    holes: Vec<Hole>,
}

impl Page {
    pub fn new(
        id: i32,
        width: i32,
        height: i32,
        spacing_h: i32,
        spacing_v: i32,
    ) -> Result<Page, PackError> {
        let profile = FreeProfile::new(width)?;
        Ok(Page {
            id,
            width,
            height,
            spacing_h,
            spacing_v,
            padding_left: 0,
            padding_up: 0,
            padding_right: 0,
            padding_down: 0,
            format: PageFormat::default(),
            profiles: vec![profile],
            curr_x: 0,
            chars: Vec::new(),
            holes: Vec::new(),
        })
    }

    pub fn set_padding(&mut self, left: i32, up: i32, right: i32, down: i32) {
        self.padding_left = left;
        self.padding_up = up;
        self.padding_right = right;
        self.padding_down = down;
    }

    pub fn set_format(&mut self, format: PageFormat) {
        self.format = format;
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Glyphs placed on this page, in insertion order.
    pub fn glyphs(&self) -> &[GlyphRecord] {
        &self.chars
    }

    /// Widest image that could still start at the current cursor.
    fn next_ideal_width(&self) -> i32 {
        self.width - self.curr_x - self.padding_right - self.padding_left - self.spacing_h
    }

    /// Unconditional placement at a caller-determined position; used by the
    /// hole-filling pass once a hole has been matched. Fills in the glyph's
    /// placement fields, inflates its rect by the padding, and raises the
    /// free-space profile over every covered column (spacing included).
    fn place_at(&mut self, cx: i32, cy: i32, mut ch: GlyphRecord, channel: usize) {
        ch.x = cx;
        ch.y = cy;
        ch.page = self.id;
        ch.width += self.padding_left + self.padding_right;
        ch.height += self.padding_up + self.padding_down;
        ch.xoffset -= self.padding_left;
        ch.yoffset -= self.padding_up;
        ch.chnl = if self.format.packs_channels() {
            if !ch.is_char { 0xF } else { 1 << channel }
        } else {
            0xF
        };

        let img_w = ch.image.width;
        let img_h = ch.image.height;
        let top = cy + img_h + self.spacing_v + self.padding_up + self.padding_down;
        let span = img_w + self.padding_left + self.padding_right + self.spacing_h;
        let profile = &mut self.profiles[channel];
        for x in -self.spacing_h..span {
            let mut tx = x + cx;
            if tx < 0 {
                tx += self.width;
            }
            if tx >= self.width {
                tx -= self.width;
            }
            if top > profile.get(tx) {
                profile.set(tx, top);
            }
        }

        self.chars.push(ch);
    }

    /// Greedy row-fill placement. Scans forward column by column from the
    /// current cursor (wrapping to the left edge when the glyph no longer
    /// fits the remaining width), looking for the first X whose footprint
    /// admits the glyph within the page height. Synthesizes a hole whenever
    /// a shorter neighbor left unused vertical space under the row line.
    ///
    /// Returns the glyph back when no position fits; the page is then
    /// considered unable to take it in this pass and the cursor is restored.
    pub fn try_place(&mut self, ch: GlyphRecord, channel: usize) -> Result<(), GlyphRecord> {
        let orig_x = self.curr_x;
        let img_w = ch.image.width;
        let img_h = ch.image.height;
        let pad_w = img_w + self.padding_left + self.padding_right;
        let pad_h = img_h + self.padding_up + self.padding_down;

        let mut i = 0;
        while i < self.width - img_w - self.padding_right - self.padding_left - self.spacing_h {
            i += 1;

            // Narrow enough to fit at the cursor? Otherwise restart the
            // sweep from the left side.
            if pad_w + self.curr_x > self.width - self.spacing_h {
                self.curr_x = 0;
            }

            let cy = self.profiles[channel].max_over(self.curr_x, pad_w);
            if cy + pad_h <= self.height - self.spacing_v {
                // Would this placement leave a hole under the row line?
                let profile = &self.profiles[channel];
                let mut x = 0;
                while x < pad_w {
                    let hy = profile.get(x + self.curr_x);
                    if cy - self.spacing_v > hy {
                        let mut hole = Hole {
                            x: x + self.curr_x,
                            y: hy,
                            w: 1,
                            h: cy - self.spacing_v - hy,
                            chnl: channel,
                        };
                        // Extend over the columns sharing the same floor.
                        x += 1;
                        while x < pad_w && profile.get(x + self.curr_x) == hole.y {
                            hole.w += 1;
                            x += 1;
                        }
                        trace!(
                            "page {}: hole {}x{} at ({},{}) on channel {}",
                            self.id, hole.w, hole.h, hole.x, hole.y, channel
                        );
                        self.holes.push(hole);
                        break;
                    }
                    x += 1;
                }

                let cx = self.curr_x;
                self.place_at(cx, cy, ch, channel);
                self.curr_x += img_w + self.spacing_h + self.padding_left + self.padding_right;
                return Ok(());
            }

            self.curr_x += 1;
        }

        self.curr_x = orig_x;
        Err(ch)
    }

    /// Packs as much of `pending` onto this page as the heuristic allows:
    /// colored images first, then monochrome glyphs per channel. Placed
    /// glyphs are taken out of `pending`; `notify` fires once per placement.
    pub fn add_batch(
        &mut self,
        pending: &mut [Option<GlyphRecord>],
        cancel: &CancelFlag,
        notify: &mut dyn FnMut(),
    ) -> Result<(), PackError> {
        debug!("page {}: packing colored images", self.id);
        self.add_class(pending, true, 0, cancel, notify)?;

        // Channels 1-3 start from the occupancy the colored pass left.
        while self.profiles.len() < 4 {
            let dup = self.profiles[0].duplicate()?;
            self.profiles.push(dup);
        }
        self.holes.clear();

        debug!("page {}: packing monochrome glyphs into channel 0", self.id);
        self.add_class(pending, false, 0, cancel, notify)?;

        if self.format.packs_channels() {
            for channel in 1..4 {
                debug!(
                    "page {}: packing monochrome glyphs into channel {}",
                    self.id, channel
                );
                self.add_class(pending, false, channel, cancel, notify)?;
            }
        }

        Ok(())
    }

    /// One color-class pass: sorts the candidates largest-first, then
    /// alternates hole filling and row filling until the page takes no more.
    fn add_class(
        &mut self,
        pending: &mut [Option<GlyphRecord>],
        colored: bool,
        channel: usize,
        cancel: &CancelFlag,
        notify: &mut dyn FnMut(),
    ) -> Result<(), PackError> {
        let mut index: Vec<usize> = (0..pending.len())
            .filter(|&n| {
                pending[n]
                    .as_ref()
                    .is_some_and(|g| g.is_char != colored)
            })
            .collect();

        // Taller, then wider, glyphs first; equal sizes keep their input
        // order so packing is deterministic.
        let sort_key = |n: usize| pending[n].as_ref().map_or((0, 0), |g| (g.height, g.width));
        index.sort_by(|&a, &b| sort_key(b).cmp(&sort_key(a)));

        while !index.is_empty() {
            trace!(
                "page {}: {} candidates left, {} holes to fill",
                self.id,
                index.len(),
                self.holes.len()
            );

            // Fill outstanding holes. Every hole gets one fill attempt and
            // is then dropped; unfilled ones are not carried forward.
            let mut h = 0;
            while h < self.holes.len() {
                let hole = self.holes[h];

                let fit = |n: usize| {
                    pending[n].as_ref().map_or((i32::MAX, i32::MAX), |g| {
                        (
                            g.image.width + self.padding_left + self.padding_right,
                            g.image.height + self.padding_up + self.padding_down,
                        )
                    })
                };

                // Exact dimension match wins immediately; otherwise the
                // largest candidate that still fits.
                let mut best: Option<usize> = None;
                for n in 0..index.len() {
                    let (gw, gh) = fit(index[n]);
                    if hole.w == gw && hole.h == gh {
                        best = Some(n);
                        break;
                    }
                    if hole.w >= gw && hole.h >= gh {
                        best = match best {
                            Some(b) => {
                                let (bw, bh) = fit(index[b]);
                                if gw > bw || gh > bh { Some(n) } else { Some(b) }
                            }
                            None => Some(n),
                        };
                    }
                }

                if let Some(b) = best {
                    let (gw, gh) = fit(index[b]);
                    if let Some(g) = pending[index[b]].take() {
                        // Leftover space within the hole becomes child holes
                        // to the right of and below the filled region.
                        if hole.w - self.spacing_h > gw {
                            self.holes.push(Hole {
                                x: hole.x + gw + self.spacing_h,
                                y: hole.y,
                                w: hole.w - gw - self.spacing_h,
                                h: hole.h,
                                chnl: hole.chnl,
                            });
                        }
                        if hole.h - self.spacing_v > gh {
                            self.holes.push(Hole {
                                x: hole.x,
                                y: hole.y + gh + self.spacing_v,
                                w: gw,
                                h: hole.h - gh - self.spacing_v,
                                chnl: hole.chnl,
                            });
                        }

                        trace!(
                            "page {}: glyph fills {}x{} hole at ({},{})",
                            self.id, hole.w, hole.h, hole.x, hole.y
                        );
                        self.place_at(hole.x, hole.y, g, channel);
                        notify();
                        index.remove(b);

                        if cancel.is_cancelled() {
                            return Err(PackError::Cancelled);
                        }
                    }
                }

                self.holes.swap_remove(h);
            }

            if index.is_empty() {
                break;
            }

            // Skip the cursor past densely packed regions when a height
            // discontinuity larger than the tallest pending glyph exists.
            self.curr_x = self.determine_start_x(pending, &index, channel);

            // This can only go negative if earlier allocation failures were
            // missed; treat it the same as running out of memory.
            if self.next_ideal_width() < 0 {
                return Err(PackError::OutOfMemory);
            }

            let mut all_too_wide = true;
            let mut drawn = false;
            let mut carry: Vec<usize> = Vec::with_capacity(index.len());

            // Add one row of glyphs to the page.
            for i in 0..index.len() {
                let n = index[i];
                let mut ok = false;
                let img_w = pending[n].as_ref().map_or(0, |g| g.image.width);
                if img_w <= self.next_ideal_width() {
                    all_too_wide = false;
                    if let Some(g) = pending[n].take() {
                        match self.try_place(g, channel) {
                            Ok(()) => {
                                ok = true;
                                drawn = true;
                                notify();
                                if cancel.is_cancelled() {
                                    return Err(PackError::Cancelled);
                                }
                            }
                            Err(g) => pending[n] = Some(g),
                        }
                    }
                }
                if !ok {
                    carry.push(n);
                }
            }

            index = carry;

            if !all_too_wide && !drawn {
                // Nothing fit anywhere this sweep; leave the rest for the
                // next page.
                break;
            }
        }

        Ok(())
    }

    /// Picks the starting cursor for a fresh row-fill sweep: the first
    /// column after a downward height jump at least as tall as the tallest
    /// pending glyph. Avoids rescanning dense regions when imported images
    /// are far out of proportion to the rest of the glyphs.
    fn determine_start_x(
        &self,
        pending: &[Option<GlyphRecord>],
        index: &[usize],
        channel: usize,
    ) -> i32 {
        let mut thinnest = self.width;
        for &n in index {
            if let Some(g) = pending[n].as_ref() {
                let w = g.width + self.padding_left + self.padding_right + self.spacing_h;
                if w < thinnest {
                    thinnest = w;
                }
            }
        }

        let tallest = index
            .first()
            .and_then(|&n| pending[n].as_ref())
            .map_or(0, |g| g.height)
            + self.padding_up
            + self.padding_down
            + self.spacing_v;

        let profile = &self.profiles[channel];
        for n in 0..(self.width - 1 - thinnest).max(0) {
            if profile.get(n) - profile.get(n + 1) >= tallest {
                return n + 1;
            }
        }

        0
    }

    /// Renders the page for visual inspection: unused space and spacing
    /// borders are drawn in marker colors, and outline glyphs are blended
    /// so the outline region stays visible.
    pub fn compose_preview(&self, channel: usize) -> Result<GlyphImage, PackError> {
        let mut out = GlyphImage::new(self.width, self.height)?;
        out.clear(CLR_UNUSED);

        for ch in &self.chars {
            if ch.chnl & (1 << channel) == 0 {
                continue;
            }

            let cx = ch.x + self.padding_left;
            let cy = ch.y + self.padding_up;
            let img = &ch.image;

            if ch.has_outline() {
                for y in 0..img.height {
                    for x in 0..img.width {
                        let mut p = img.get(x, y);
                        if (p >> 24) < 0xFF {
                            p += 255 - (p >> 24);
                        }
                        out.set(x + cx, y + cy, p);
                    }
                }
            } else {
                for y in 0..img.height {
                    for x in 0..img.width {
                        out.set(x + cx, y + cy, img.get(x, y));
                    }
                }
            }

            if self.spacing_h > 0 {
                let mut cx1 = ch.x - 1;
                if cx1 < 0 {
                    cx1 += self.width;
                }
                let mut cx2 = ch.x + ch.width;
                if cx2 >= self.width {
                    cx2 -= self.width;
                }
                for y in 0..ch.height {
                    out.set(cx1, ch.y + y, CLR_BORDER);
                    out.set(cx2, ch.y + y, CLR_BORDER);
                }
            }

            if self.spacing_v > 0 {
                let mut cy1 = ch.y - 1;
                if cy1 < 0 {
                    cy1 += self.height;
                }
                let mut cy2 = ch.y + ch.height;
                if cy2 >= self.height {
                    cy2 -= self.height;
                }
                for x in 0..ch.width {
                    out.set(ch.x + x, cy1, CLR_BORDER);
                    out.set(ch.x + x, cy2, CLR_BORDER);
                }
            }
        }

        Ok(out)
    }

    /// Renders the exported texture: background from the channel content
    /// assignment, icons copied as-is, monochrome glyphs encoded per
    /// channel (single-lane writes in four-channel packed mode).
    pub fn compose_output(&self) -> Result<GlyphImage, PackError> {
        let f = &self.format;

        let mut color = 0u32;
        if (f.alpha == ChannelContent::One && !f.inv_a) || f.inv_a {
            color = 0xFF << 24;
        }
        if f.four_chnl_packed {
            let a = color >> 24;
            color |= (a << 16) | (a << 8) | a;
        } else {
            if (f.red == ChannelContent::One && !f.inv_r) || f.inv_r {
                color |= 0xFF << 16;
            }
            if (f.green == ChannelContent::One && !f.inv_g) || f.inv_g {
                color |= 0xFF << 8;
            }
            if (f.blue == ChannelContent::One && !f.inv_b) || f.inv_b {
                color |= 0xFF;
            }
        }

        let mut out = GlyphImage::new(self.width, self.height)?;
        out.clear(color);

        for ch in &self.chars {
            let cx = ch.x + self.padding_left;
            let cy = ch.y + self.padding_up;
            let img = &ch.image;

            if !ch.is_char {
                // Colored images are copied as-is.
                for y in 0..img.height {
                    for x in 0..img.width {
                        out.set(x + cx, y + cy, img.get(x, y));
                    }
                }
            } else if f.packs_channels() {
                // The assigned channel alone receives the glyph's content.
                for y in 0..img.height {
                    for x in 0..img.width {
                        let mut p = ch.pixel_value(x, y, f.alpha) as u32;
                        if f.inv_a {
                            p = 255 - p;
                        }
                        let mut c = out.get(x + cx, y + cy);
                        match ch.chnl {
                            1 => c = (c & 0xFFFF_FF00) | p,
                            2 => c = (c & 0xFFFF_00FF) | (p << 8),
                            4 => c = (c & 0xFF00_FFFF) | (p << 16),
                            8 => c = (c & 0x00FF_FFFF) | (p << 24),
                            _ => {}
                        }
                        out.set(x + cx, y + cy, c);
                    }
                }
            } else {
                for y in 0..img.height {
                    for x in 0..img.width {
                        let mut p: u32 = 0;
                        let mut t = ch.pixel_value(x, y, f.blue) as u32;
                        if f.inv_b {
                            t = 255 - t;
                        }
                        p |= t;
                        t = ch.pixel_value(x, y, f.green) as u32;
                        if f.inv_g {
                            t = 255 - t;
                        }
                        p |= t << 8;
                        t = ch.pixel_value(x, y, f.red) as u32;
                        if f.inv_r {
                            t = 255 - t;
                        }
                        p |= t << 16;
                        t = ch.pixel_value(x, y, f.alpha) as u32;
                        if f.inv_a {
                            t = 255 - t;
                        }
                        p |= t << 24;
                        out.set(x + cx, y + cy, p);
                    }
                }
            }
        }

        Ok(out)
    }
}
