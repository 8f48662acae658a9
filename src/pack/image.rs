use std::collections::TryReserveError;

/// Minimal 2D pixel buffer, 32-bit ARGB, row 0 at the visual top.
///
/// The buffer always holds exactly `width * height` pixels. Zero-size
/// images are valid and own no pixels; callers treat them as empty glyphs.
#[derive(Debug, Clone, Default)]
pub struct GlyphImage {
    pub width: i32,
    pub height: i32,
    pub pixels: Vec<u32>,
}

impl GlyphImage {
    /// Allocates a zeroed image. Allocation failure is reported instead of
    /// aborting, so a huge page size can be surfaced as an out-of-memory run.
    pub fn new(width: i32, height: i32) -> Result<GlyphImage, TryReserveError> {
        let w = width.max(0);
        let h = height.max(0);
        let len = (w as usize) * (h as usize);
        let mut pixels: Vec<u32> = Vec::new();
        pixels.try_reserve_exact(len)?;
        pixels.resize(len, 0);
        Ok(GlyphImage {
            width: w,
            height: h,
            pixels,
        })
    }

    pub fn clear(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    #[inline(always)]
    pub fn get(&self, x: i32, y: i32) -> u32 {
        self.pixels[(y * self.width + x) as usize]
    }

    #[inline(always)]
    pub fn set(&mut self, x: i32, y: i32, color: u32) {
        let w = self.width;
        self.pixels[(y * w + x) as usize] = color;
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_matches_dimensions() {
        let img = GlyphImage::new(7, 3).unwrap();
        assert_eq!(img.pixels.len(), 21);
    }

    #[test]
    fn zero_size_is_valid_and_empty() {
        let img = GlyphImage::new(0, 5).unwrap();
        assert!(img.is_empty());
        let img = GlyphImage::new(4, 0).unwrap();
        assert!(img.is_empty());
    }

    #[test]
    fn clear_fills_every_pixel() {
        let mut img = GlyphImage::new(3, 3).unwrap();
        img.clear(0xFF00_00FF);
        assert!(img.pixels.iter().all(|&p| p == 0xFF00_00FF));
    }
}
