use std::collections::TryReserveError;

use crate::pack::ChannelContent;
use crate::pack::image::GlyphImage;

/// One packable unit: a rasterized character or an imported icon, with the
/// metrics the descriptor needs and the placement fields the packer fills in.
///
/// `width`/`height` start as the image dimensions and are inflated by the
/// page padding when the glyph is placed, so the exported rect covers the
/// padded cell. `chnl` is a bitmask over the four texture channels; 0xF
/// means the glyph occupies (or ignores) all of them.
#[derive(Debug, Clone)]
pub struct GlyphRecord {
    pub id: i32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub xoffset: i32,
    pub yoffset: i32,
    pub advance: i32,
    pub page: i32,
    pub chnl: u8,
    /// True for real text characters, false for imported icon images.
    pub is_char: bool,
    /// True when the pixels carry distinct glyph/outline (or full color)
    /// data rather than a single coverage value.
    pub colored: bool,
    pub image: GlyphImage,
}

impl GlyphRecord {
    pub fn new(id: i32, image: GlyphImage, xoffset: i32, yoffset: i32, advance: i32) -> GlyphRecord {
        GlyphRecord {
            id,
            x: 0,
            y: 0,
            width: image.width,
            height: image.height,
            xoffset,
            yoffset,
            advance,
            page: -1,
            chnl: 0xF,
            is_char: true,
            colored: false,
            image,
        }
    }

    /// Builds an icon record from an imported image. Icons pack in the
    /// colored pass and always keep the full channel mask.
    pub fn from_image(
        id: i32,
        image: GlyphImage,
        xoffset: i32,
        yoffset: i32,
        advance_extra: i32,
    ) -> GlyphRecord {
        let advance = image.width + advance_extra;
        let mut rec = GlyphRecord::new(id, image, xoffset, yoffset, advance);
        rec.is_char = false;
        rec.colored = true;
        rec
    }

    pub fn has_outline(&self) -> bool {
        self.is_char && self.colored
    }

    /// Swaps in a replacement pixel buffer, keeping ownership in one place.
    /// Every image-mutating operation (outline, trim) funnels through here.
    pub fn replace_image(&mut self, image: GlyphImage) {
        self.image = image;
    }

    /// The 8-bit value this glyph contributes to an output channel with the
    /// given content assignment. For monochrome glyphs the coverage byte is
    /// stored in the low lane; outlined glyphs keep glyph coverage in the
    /// color lanes and outline intensity in alpha.
    pub fn pixel_value(&self, x: i32, y: i32, content: ChannelContent) -> u8 {
        if !self.is_char {
            return 0;
        }

        match content {
            ChannelContent::One => 255,
            ChannelContent::Zero => 0,
            _ if self.colored => {
                let color = self.image.get(x, y);
                if color as u8 != 0 {
                    match content {
                        ChannelContent::Glyph => color as u8,
                        ChannelContent::Outline => 255,
                        _ => 0x80 | ((color as u8) >> 1),
                    }
                } else {
                    match content {
                        ChannelContent::Glyph => 0,
                        ChannelContent::Outline => (color >> 24) as u8,
                        _ => (color >> 25) as u8,
                    }
                }
            }
            // No outline data: every content mode reads the same coverage.
            _ => self.image.get(x, y) as u8,
        }
    }

    /// Grows the glyph by `thickness` on every side and surrounds the
    /// coverage with an anti-aliased circular outline. Glyph coverage moves
    /// to the color lanes, outline intensity to alpha; the record becomes
    /// `colored` so the channel content encodings can tell the two apart.
    pub fn add_outline(&mut self, thickness: i32) -> Result<(), TryReserveError> {
        if self.image.width == 0 || self.image.height == 0 {
            return Ok(());
        }

        self.colored = true;
        self.width += thickness * 2;
        self.height += thickness * 2;
        self.xoffset -= thickness;
        self.yoffset -= thickness;

        let src = &self.image;
        let mut img = GlyphImage::new(src.width + 2 * thickness, src.height + 2 * thickness)?;

        // Circular kernel with anti-aliased rim.
        let kernel_width = (thickness * 2 + 1) as usize;
        let mut kernel = vec![0.0f32; kernel_width * kernel_width];
        for y in 0..kernel_width as i32 {
            for x in 0..kernel_width as i32 {
                let val = if x == thickness || y == thickness {
                    1.0
                } else {
                    let d2 = (x - thickness) * (x - thickness) + (y - thickness) * (y - thickness);
                    let v = (thickness + 1) as f32
                        - thickness as f32 * d2 as f32 / (thickness * thickness) as f32;
                    v.clamp(0.0, 1.0)
                };
                kernel[(y as usize) * kernel_width + x as usize] = val;
            }
        }

        for y1 in 0..src.height {
            for x1 in 0..src.width {
                let cs = src.get(x1, y1) & 0xFF;
                for y2 in 0..kernel_width as i32 {
                    for x2 in 0..kernel_width as i32 {
                        if x2 == thickness && y2 == thickness {
                            if cs != 0 {
                                img.set(
                                    x1 + x2,
                                    y1 + y2,
                                    0xFF00_0000 | (cs << 16) | (cs << 8) | cs,
                                );
                            }
                        } else {
                            let k = kernel[(y2 as usize) * kernel_width + x2 as usize];
                            let val = ((cs as f32 * k) as u32) << 24;
                            if val > img.get(x1 + x2, y1 + y2) {
                                img.set(x1 + x2, y1 + y2, val);
                            }
                        }
                    }
                }
            }
        }

        self.replace_image(img);
        Ok(())
    }

    /// Removes fully transparent columns on the left and right, shifting
    /// `xoffset` by the amount trimmed from the left.
    pub fn trim_sides(&mut self) -> Result<(), TryReserveError> {
        let src = &self.image;

        let mut left = -1;
        'left: for x in 0..src.width {
            for y in 0..src.height {
                if src.get(x, y) != 0 {
                    left = x;
                    break 'left;
                }
            }
        }

        let mut right = 0;
        'right: for x in (1..src.width).rev() {
            for y in 0..src.height {
                if src.get(x, y) != 0 {
                    right = x;
                    break 'right;
                }
            }
        }

        if left >= 0 {
            let mut img = GlyphImage::new(right - left + 1, self.height)?;
            for y in 0..src.height {
                for x in 0..img.width {
                    img.set(x, y, src.get(x + left, y));
                }
            }
            self.width = img.width;
            self.xoffset += left;
            self.replace_image(img);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_glyph(id: i32, w: i32, h: i32, coverage: u32) -> GlyphRecord {
        let mut img = GlyphImage::new(w, h).unwrap();
        let c = coverage & 0xFF;
        img.clear((c << 24) | (c << 16) | (c << 8) | c);
        GlyphRecord::new(id, img, 0, 0, w + 1)
    }

    #[test]
    fn monochrome_pixel_value_reads_coverage() {
        let g = solid_glyph(65, 2, 2, 0x90);
        assert_eq!(g.pixel_value(0, 0, ChannelContent::Glyph), 0x90);
        assert_eq!(g.pixel_value(1, 1, ChannelContent::Outline), 0x90);
        assert_eq!(g.pixel_value(0, 1, ChannelContent::One), 255);
        assert_eq!(g.pixel_value(1, 0, ChannelContent::Zero), 0);
    }

    #[test]
    fn icons_contribute_nothing_to_channel_encoding() {
        let mut g = solid_glyph(1000, 2, 2, 0xFF);
        g.is_char = false;
        assert_eq!(g.pixel_value(0, 0, ChannelContent::One), 0);
    }

    #[test]
    fn outline_grows_geometry_and_marks_colored() {
        let mut g = solid_glyph(65, 4, 4, 0xFF);
        g.xoffset = 2;
        g.yoffset = 3;
        g.add_outline(2).unwrap();
        assert!(g.colored);
        assert_eq!((g.width, g.height), (8, 8));
        assert_eq!((g.xoffset, g.yoffset), (0, 1));
        assert_eq!((g.image.width, g.image.height), (8, 8));
        // Interior keeps full coverage in the color lanes.
        assert_eq!(g.pixel_value(4, 4, ChannelContent::Glyph), 0xFF);
        // The corner just outside the glyph body is outline-only.
        assert_eq!(g.pixel_value(1, 4, ChannelContent::Glyph), 0);
        assert!(g.pixel_value(1, 4, ChannelContent::Outline) > 0);
    }

    #[test]
    fn trim_drops_empty_side_columns() {
        let mut img = GlyphImage::new(6, 3).unwrap();
        img.set(2, 1, 0xFF);
        img.set(3, 0, 0x80);
        let mut g = GlyphRecord::new(65, img, 1, 0, 7);
        g.trim_sides().unwrap();
        assert_eq!(g.width, 2);
        assert_eq!(g.xoffset, 3);
        assert_eq!(g.image.get(0, 1), 0xFF);
    }
}
