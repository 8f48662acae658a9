//! Glyph atlas packing: fixed-size pages, per-channel free-space profiles,
//! greedy row filling with hole reuse. The heuristic is deliberately greedy
//! rather than optimal so page layouts stay compatible with existing
//! BMFont-style tooling.

pub mod driver;
pub mod glyph;
pub mod image;
pub mod page;
pub mod profile;

use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackError {
    /// A page image or free-space profile could not be allocated. Fatal for
    /// the run: partially built pages are released and the caller is told
    /// the output would be incomplete.
    #[error("out of memory while building atlas pages")]
    OutOfMemory,
    /// Cooperative abort observed between placements. Partial pages are
    /// discarded; no result is returned.
    #[error("atlas generation was cancelled")]
    Cancelled,
}

impl From<TryReserveError> for PackError {
    fn from(_: TryReserveError) -> PackError {
        PackError::OutOfMemory
    }
}

/// What an output channel carries. The numeric values match the descriptor
/// encoding (`alphaChnl=` etc. in the .fnt common block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelContent {
    #[default]
    Glyph = 0,
    Outline = 1,
    GlyphOutline = 2,
    Zero = 3,
    One = 4,
}

impl ChannelContent {
    pub fn from_i64(v: i64) -> ChannelContent {
        match v {
            1 => ChannelContent::Outline,
            2 => ChannelContent::GlyphOutline,
            3 => ChannelContent::Zero,
            4 => ChannelContent::One,
            _ => ChannelContent::Glyph,
        }
    }
}

/// Intended output texture format; decides both how glyphs are spread over
/// channels during packing and how the final pixels are composed.
#[derive(Debug, Clone, Copy)]
pub struct PageFormat {
    pub bit_depth: i32,
    pub four_chnl_packed: bool,
    pub alpha: ChannelContent,
    pub red: ChannelContent,
    pub green: ChannelContent,
    pub blue: ChannelContent,
    pub inv_a: bool,
    pub inv_r: bool,
    pub inv_g: bool,
    pub inv_b: bool,
}

impl Default for PageFormat {
    fn default() -> PageFormat {
        PageFormat {
            bit_depth: 8,
            four_chnl_packed: false,
            alpha: ChannelContent::Outline,
            red: ChannelContent::Glyph,
            green: ChannelContent::Glyph,
            blue: ChannelContent::Glyph,
            inv_a: false,
            inv_r: false,
            inv_g: false,
            inv_b: false,
        }
    }
}

impl PageFormat {
    /// True when monochrome glyphs are spread across all four channels
    /// (32-bit output with per-channel packing enabled).
    pub fn packs_channels(&self) -> bool {
        self.bit_depth == 32 && self.four_chnl_packed
    }
}
