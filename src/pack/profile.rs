use std::collections::TryReserveError;

/// Free-space profile for one channel of a page: for every pixel column,
/// the lowest Y that is still free. Nothing may be placed above that Y in
/// the column without overlapping an earlier glyph (spacing included).
#[derive(Debug, Clone)]
pub struct FreeProfile {
    heights: Vec<i32>,
}

impl FreeProfile {
    pub fn new(width: i32) -> Result<FreeProfile, TryReserveError> {
        let len = width.max(0) as usize;
        let mut heights: Vec<i32> = Vec::new();
        heights.try_reserve_exact(len)?;
        heights.resize(len, 0);
        Ok(FreeProfile { heights })
    }

    /// Copy used when the colored pass finishes and channels 1-3 start
    /// from the same occupancy state as channel 0.
    pub fn duplicate(&self) -> Result<FreeProfile, TryReserveError> {
        let mut heights: Vec<i32> = Vec::new();
        heights.try_reserve_exact(self.heights.len())?;
        heights.extend_from_slice(&self.heights);
        Ok(FreeProfile { heights })
    }

    #[inline(always)]
    pub fn get(&self, x: i32) -> i32 {
        self.heights[x as usize]
    }

    #[inline(always)]
    pub fn set(&mut self, x: i32, y: i32) {
        self.heights[x as usize] = y;
    }

    /// Highest occupied Y over the column span `[x, x + w)`.
    pub fn max_over(&self, x: i32, w: i32) -> i32 {
        let mut cy = 0;
        for n in 0..w {
            let h = self.heights[(x + n) as usize];
            if h > cy {
                cy = h;
            }
        }
        cy
    }
}

/// Rectangular gap of reusable free space, produced when a placement has a
/// shorter neighbor below the row line. `w` and `h` are at least 1.
#[derive(Debug, Clone, Copy)]
pub struct Hole {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub chnl: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_flat() {
        let p = FreeProfile::new(8).unwrap();
        assert_eq!(p.max_over(0, 8), 0);
    }

    #[test]
    fn max_over_picks_tallest_column() {
        let mut p = FreeProfile::new(8).unwrap();
        p.set(3, 12);
        p.set(5, 7);
        assert_eq!(p.max_over(0, 8), 12);
        assert_eq!(p.max_over(4, 4), 7);
        assert_eq!(p.max_over(0, 3), 0);
    }

    #[test]
    fn duplicate_is_independent() {
        let mut p = FreeProfile::new(4).unwrap();
        p.set(0, 5);
        let mut q = p.duplicate().unwrap();
        q.set(0, 9);
        assert_eq!(p.get(0), 5);
        assert_eq!(q.get(0), 9);
    }
}
