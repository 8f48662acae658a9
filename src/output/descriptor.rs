use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::config::{DescriptorFormat, FontConfig};
use crate::output::page_file_name;
use crate::pack::glyph::GlyphRecord;
use crate::pack::page::Page;

/// Everything the font descriptor records about a generated font. The
/// descriptor is what consumers parse at runtime; the texture pages only
/// carry pixels.
pub struct Descriptor<'a> {
    pub config: &'a FontConfig,
    pub face_name: &'a str,
    pub line_height: i32,
    pub base: i32,
    pub pages: &'a [Page],
    pub kerning: &'a [(u32, u32, i32)],
}

impl Descriptor<'_> {
    /// Writes the descriptor next to the texture pages. `path` is the
    /// full descriptor path; the page file names embedded in it are
    /// derived from its stem.
    pub fn save(&self, path: &Path) -> Result<()> {
        let base = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let data = match self.config.font_desc_format {
            DescriptorFormat::Text => self.render_text(&base).into_bytes(),
            DescriptorFormat::Xml => self.render_xml(&base).into_bytes(),
            DescriptorFormat::Binary => self.render_binary(&base),
            DescriptorFormat::Json => self.render_json(&base)?,
        };
        fs::write(path, data).with_context(|| format!("failed to write descriptor {:?}", path))?;

        info!(
            "wrote descriptor {:?}: {} chars on {} pages, {} kerning pairs",
            path,
            self.glyph_count(),
            self.pages.len(),
            self.kerning.len()
        );
        Ok(())
    }

    fn glyphs(&self) -> Vec<&GlyphRecord> {
        let mut glyphs: Vec<&GlyphRecord> =
            self.pages.iter().flat_map(|p| p.glyphs().iter()).collect();
        // Ascending by id; the invalid-character glyph (-1) sorts first.
        glyphs.sort_by_key(|g| g.id);
        glyphs
    }

    fn glyph_count(&self) -> usize {
        self.pages.iter().map(|p| p.glyphs().len()).sum()
    }

    fn page_names(&self, base: &str) -> Vec<String> {
        (0..self.pages.len())
            .map(|n| page_file_name(base, n, self.pages.len(), &self.config.texture_format))
            .collect()
    }

    fn packed(&self) -> bool {
        self.config.four_chnl_packed && self.config.out_bit_depth == 32
    }

    fn render_text(&self, base: &str) -> String {
        let c = self.config;
        let mut out = String::new();
        let _ = write!(
            out,
            "info face=\"{}\" size={} bold={} italic={} charset=\"\" unicode=1 stretchH=100 smooth=1 aa=1 padding={},{},{},{} spacing={},{} outline={}\r\n",
            self.face_name,
            c.font_size,
            c.is_bold as i32,
            c.is_italic as i32,
            c.padding_up,
            c.padding_right,
            c.padding_down,
            c.padding_left,
            c.spacing_horiz,
            c.spacing_vert,
            c.outline_thickness
        );
        let _ = write!(
            out,
            "common lineHeight={} base={} scaleW={} scaleH={} pages={} packed={} alphaChnl={} redChnl={} greenChnl={} blueChnl={}\r\n",
            self.line_height,
            self.base,
            c.out_width,
            c.out_height,
            self.pages.len(),
            self.packed() as i32,
            c.alpha_chnl as i32,
            c.red_chnl as i32,
            c.green_chnl as i32,
            c.blue_chnl as i32
        );
        for (n, file) in self.page_names(base).iter().enumerate() {
            let _ = write!(out, "page id={} file=\"{}\"\r\n", n, file);
        }

        let glyphs = self.glyphs();
        let _ = write!(out, "chars count={}\r\n", glyphs.len());
        for g in &glyphs {
            let _ = write!(
                out,
                "char id={:<4} x={:<5} y={:<5} width={:<5} height={:<5} xoffset={:<5} yoffset={:<5} xadvance={:<5} page={:<2} chnl={:<2}\r\n",
                g.id, g.x, g.y, g.width, g.height, g.xoffset, g.yoffset, g.advance, g.page, g.chnl
            );
        }

        if !self.kerning.is_empty() {
            let _ = write!(out, "kernings count={}\r\n", self.kerning.len());
            for &(first, second, amount) in self.kerning {
                let _ = write!(
                    out,
                    "kerning first={:<3} second={:<3} amount={:<4}\r\n",
                    first, second, amount
                );
            }
        }
        out
    }

    fn render_xml(&self, base: &str) -> String {
        let c = self.config;
        let mut out = String::new();
        let _ = write!(out, "<?xml version=\"1.0\"?>\r\n<font>\r\n");
        let _ = write!(
            out,
            "  <info face=\"{}\" size=\"{}\" bold=\"{}\" italic=\"{}\" charset=\"\" unicode=\"1\" stretchH=\"100\" smooth=\"1\" aa=\"1\" padding=\"{},{},{},{}\" spacing=\"{},{}\" outline=\"{}\"/>\r\n",
            self.face_name,
            c.font_size,
            c.is_bold as i32,
            c.is_italic as i32,
            c.padding_up,
            c.padding_right,
            c.padding_down,
            c.padding_left,
            c.spacing_horiz,
            c.spacing_vert,
            c.outline_thickness
        );
        let _ = write!(
            out,
            "  <common lineHeight=\"{}\" base=\"{}\" scaleW=\"{}\" scaleH=\"{}\" pages=\"{}\" packed=\"{}\" alphaChnl=\"{}\" redChnl=\"{}\" greenChnl=\"{}\" blueChnl=\"{}\"/>\r\n",
            self.line_height,
            self.base,
            c.out_width,
            c.out_height,
            self.pages.len(),
            self.packed() as i32,
            c.alpha_chnl as i32,
            c.red_chnl as i32,
            c.green_chnl as i32,
            c.blue_chnl as i32
        );
        let _ = write!(out, "  <pages>\r\n");
        for (n, file) in self.page_names(base).iter().enumerate() {
            let _ = write!(out, "    <page id=\"{}\" file=\"{}\" />\r\n", n, file);
        }
        let _ = write!(out, "  </pages>\r\n");

        let glyphs = self.glyphs();
        let _ = write!(out, "  <chars count=\"{}\">\r\n", glyphs.len());
        for g in &glyphs {
            let _ = write!(
                out,
                "    <char id=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" xoffset=\"{}\" yoffset=\"{}\" xadvance=\"{}\" page=\"{}\" chnl=\"{}\" />\r\n",
                g.id, g.x, g.y, g.width, g.height, g.xoffset, g.yoffset, g.advance, g.page, g.chnl
            );
        }
        let _ = write!(out, "  </chars>\r\n");

        if !self.kerning.is_empty() {
            let _ = write!(out, "  <kernings count=\"{}\">\r\n", self.kerning.len());
            for &(first, second, amount) in self.kerning {
                let _ = write!(
                    out,
                    "    <kerning first=\"{}\" second=\"{}\" amount=\"{}\" />\r\n",
                    first, second, amount
                );
            }
            let _ = write!(out, "  </kernings>\r\n");
        }
        let _ = write!(out, "</font>\r\n");
        out
    }

    /// Binary BMF version 3. Little-endian throughout; each block is a
    /// one-byte type tag followed by a four-byte payload size.
    fn render_binary(&self, base: &str) -> Vec<u8> {
        let c = self.config;
        let mut out = Vec::new();
        out.extend_from_slice(b"BMF\x03");

        // Block 1: info.
        let name = self.face_name.as_bytes();
        out.push(1);
        out.extend_from_slice(&(14 + name.len() as u32 + 1).to_le_bytes());
        out.extend_from_slice(&(c.font_size as u16).to_le_bytes());
        let mut bits = 0u8;
        bits |= (c.is_bold as u8) << 4;
        bits |= (c.is_italic as u8) << 5;
        bits |= 1 << 6; // unicode
        bits |= 1 << 7; // smooth
        out.push(bits);
        out.push(0); // charset, unused with unicode
        out.extend_from_slice(&100u16.to_le_bytes()); // stretchH
        out.push(1); // aa
        out.push(c.padding_up as u8);
        out.push(c.padding_right as u8);
        out.push(c.padding_down as u8);
        out.push(c.padding_left as u8);
        out.push(c.spacing_horiz as u8);
        out.push(c.spacing_vert as u8);
        out.push(c.outline_thickness as u8);
        out.extend_from_slice(name);
        out.push(0);

        // Block 2: common.
        out.push(2);
        out.extend_from_slice(&15u32.to_le_bytes());
        out.extend_from_slice(&(self.line_height as u16).to_le_bytes());
        out.extend_from_slice(&(self.base as u16).to_le_bytes());
        out.extend_from_slice(&(c.out_width as u16).to_le_bytes());
        out.extend_from_slice(&(c.out_height as u16).to_le_bytes());
        out.extend_from_slice(&(self.pages.len() as u16).to_le_bytes());
        out.push(self.packed() as u8); // bit 0: packed
        out.push(c.alpha_chnl as u8);
        out.push(c.red_chnl as u8);
        out.push(c.green_chnl as u8);
        out.push(c.blue_chnl as u8);

        // Block 3: page names, all null terminated and equal length.
        let names = self.page_names(base);
        out.push(3);
        let size: usize = names.iter().map(|n| n.len() + 1).sum();
        out.extend_from_slice(&(size as u32).to_le_bytes());
        for name in &names {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }

        // Block 4: chars, 20 bytes each.
        let glyphs = self.glyphs();
        out.push(4);
        out.extend_from_slice(&(glyphs.len() as u32 * 20).to_le_bytes());
        for g in &glyphs {
            out.extend_from_slice(&(g.id as u32).to_le_bytes());
            out.extend_from_slice(&(g.x as u16).to_le_bytes());
            out.extend_from_slice(&(g.y as u16).to_le_bytes());
            out.extend_from_slice(&(g.width as u16).to_le_bytes());
            out.extend_from_slice(&(g.height as u16).to_le_bytes());
            out.extend_from_slice(&(g.xoffset as i16).to_le_bytes());
            out.extend_from_slice(&(g.yoffset as i16).to_le_bytes());
            out.extend_from_slice(&(g.advance as i16).to_le_bytes());
            out.push(g.page as u8);
            out.push(g.chnl);
        }

        // Block 5: kerning pairs, 10 bytes each, omitted when empty.
        if !self.kerning.is_empty() {
            out.push(5);
            out.extend_from_slice(&(self.kerning.len() as u32 * 10).to_le_bytes());
            for &(first, second, amount) in self.kerning {
                out.extend_from_slice(&first.to_le_bytes());
                out.extend_from_slice(&second.to_le_bytes());
                out.extend_from_slice(&(amount as i16).to_le_bytes());
            }
        }
        out
    }

    fn render_json(&self, base: &str) -> Result<Vec<u8>> {
        let c = self.config;
        let doc = JsonFont {
            info: JsonInfo {
                face: self.face_name.to_string(),
                size: c.font_size,
                bold: c.is_bold,
                italic: c.is_italic,
                padding: [c.padding_up, c.padding_right, c.padding_down, c.padding_left],
                spacing: [c.spacing_horiz, c.spacing_vert],
                outline: c.outline_thickness,
            },
            common: JsonCommon {
                line_height: self.line_height,
                base: self.base,
                scale_w: c.out_width,
                scale_h: c.out_height,
                pages: self.pages.len(),
                packed: self.packed(),
                alpha_chnl: c.alpha_chnl as i32,
                red_chnl: c.red_chnl as i32,
                green_chnl: c.green_chnl as i32,
                blue_chnl: c.blue_chnl as i32,
            },
            pages: self.page_names(base),
            chars: self
                .glyphs()
                .iter()
                .map(|g| JsonChar {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                    width: g.width,
                    height: g.height,
                    xoffset: g.xoffset,
                    yoffset: g.yoffset,
                    xadvance: g.advance,
                    page: g.page,
                    chnl: g.chnl,
                })
                .collect(),
            kernings: self
                .kerning
                .iter()
                .map(|&(first, second, amount)| JsonKerning {
                    first,
                    second,
                    amount,
                })
                .collect(),
        };
        Ok(serde_json::to_vec_pretty(&doc)?)
    }
}

#[derive(Serialize)]
struct JsonFont {
    info: JsonInfo,
    common: JsonCommon,
    pages: Vec<String>,
    chars: Vec<JsonChar>,
    kernings: Vec<JsonKerning>,
}

#[derive(Serialize)]
struct JsonInfo {
    face: String,
    size: i32,
    bold: bool,
    italic: bool,
    padding: [i32; 4],
    spacing: [i32; 2],
    outline: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonCommon {
    line_height: i32,
    base: i32,
    scale_w: i32,
    scale_h: i32,
    pages: usize,
    packed: bool,
    alpha_chnl: i32,
    red_chnl: i32,
    green_chnl: i32,
    blue_chnl: i32,
}

#[derive(Serialize)]
struct JsonChar {
    id: i32,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    xoffset: i32,
    yoffset: i32,
    xadvance: i32,
    page: i32,
    chnl: u8,
}

#[derive(Serialize)]
struct JsonKerning {
    first: u32,
    second: u32,
    amount: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::glyph::GlyphRecord;
    use crate::pack::image::GlyphImage;

    fn one_glyph_page() -> Page {
        let mut page = Page::new(0, 64, 64, 1, 1).unwrap();
        let img = GlyphImage::new(8, 12).unwrap();
        page.try_place(GlyphRecord::new(65, img, 1, 2, 9), 0)
            .unwrap();
        page
    }

    fn descriptor_for<'a>(config: &'a FontConfig, pages: &'a [Page]) -> Descriptor<'a> {
        Descriptor {
            config,
            face_name: "testface",
            line_height: 16,
            base: 13,
            pages,
            kerning: &[],
        }
    }

    #[test]
    fn text_descriptor_lists_chars_and_pages() {
        let config = FontConfig::default();
        let pages = vec![one_glyph_page()];
        let text = descriptor_for(&config, &pages).render_text("font");

        assert!(text.starts_with("info face=\"testface\" size=32"));
        assert!(text.contains("common lineHeight=16 base=13 scaleW=256 scaleH=256 pages=1"));
        assert!(text.contains("page id=0 file=\"font_0.png\""));
        assert!(text.contains("chars count=1"));
        assert!(text.contains("char id=65"));
        assert!(!text.contains("kernings"));
    }

    #[test]
    fn binary_descriptor_has_magic_and_block_sizes() {
        let config = FontConfig::default();
        let pages = vec![one_glyph_page()];
        let bytes = descriptor_for(&config, &pages).render_binary("font");

        assert_eq!(&bytes[0..4], b"BMF\x03");
        assert_eq!(bytes[4], 1);
        let info_size = u32::from_le_bytes(bytes[5..9].try_into().unwrap()) as usize;
        assert_eq!(info_size, 14 + "testface".len() + 1);

        let common_at = 9 + info_size;
        assert_eq!(bytes[common_at], 2);
        let common_size =
            u32::from_le_bytes(bytes[common_at + 1..common_at + 5].try_into().unwrap());
        assert_eq!(common_size, 15);

        let pages_at = common_at + 5 + 15;
        assert_eq!(bytes[pages_at], 3);
        let pages_size =
            u32::from_le_bytes(bytes[pages_at + 1..pages_at + 5].try_into().unwrap()) as usize;
        assert_eq!(pages_size, "font_0.png".len() + 1);

        let chars_at = pages_at + 5 + pages_size;
        assert_eq!(bytes[chars_at], 4);
        let chars_size = u32::from_le_bytes(bytes[chars_at + 1..chars_at + 5].try_into().unwrap());
        assert_eq!(chars_size, 20);
        assert_eq!(bytes.len(), chars_at + 5 + 20);
    }

    #[test]
    fn binary_char_record_layout() {
        let config = FontConfig::default();
        let pages = vec![one_glyph_page()];
        let bytes = descriptor_for(&config, &pages).render_binary("font");

        let rec = &bytes[bytes.len() - 20..];
        assert_eq!(u32::from_le_bytes(rec[0..4].try_into().unwrap()), 65);
        assert_eq!(u16::from_le_bytes(rec[4..6].try_into().unwrap()), 0); // x
        assert_eq!(u16::from_le_bytes(rec[6..8].try_into().unwrap()), 0); // y
        assert_eq!(u16::from_le_bytes(rec[8..10].try_into().unwrap()), 8);
        assert_eq!(u16::from_le_bytes(rec[10..12].try_into().unwrap()), 12);
        assert_eq!(i16::from_le_bytes(rec[12..14].try_into().unwrap()), 1);
        assert_eq!(i16::from_le_bytes(rec[14..16].try_into().unwrap()), 2);
        assert_eq!(i16::from_le_bytes(rec[16..18].try_into().unwrap()), 9);
        assert_eq!(rec[18], 0); // page
    }

    #[test]
    fn invalid_glyph_sorts_first() {
        let config = FontConfig::default();
        let mut page = Page::new(0, 128, 128, 1, 1).unwrap();
        page.try_place(GlyphRecord::new(65, GlyphImage::new(8, 8).unwrap(), 0, 0, 8), 0)
            .unwrap();
        page.try_place(GlyphRecord::new(-1, GlyphImage::new(8, 8).unwrap(), 0, 0, 8), 0)
            .unwrap();
        let pages = vec![page];

        let desc = descriptor_for(&config, &pages);
        let ids: Vec<i32> = desc.glyphs().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![-1, 65]);
        let text = desc.render_text("font");
        assert!(text.contains("char id=-1"));
    }

    #[test]
    fn kerning_pairs_are_written() {
        let config = FontConfig::default();
        let pages = vec![one_glyph_page()];
        let kerning = vec![(65u32, 86u32, -2i32)];
        let desc = Descriptor {
            kerning: &kerning,
            ..descriptor_for(&config, &pages)
        };

        let text = desc.render_text("font");
        assert!(text.contains("kernings count=1"));
        assert!(text.contains("kerning first=65"));

        let bytes = desc.render_binary("font");
        let tail = &bytes[bytes.len() - 10..];
        assert_eq!(bytes[bytes.len() - 15], 5);
        assert_eq!(u32::from_le_bytes(tail[0..4].try_into().unwrap()), 65);
        assert_eq!(u32::from_le_bytes(tail[4..8].try_into().unwrap()), 86);
        assert_eq!(i16::from_le_bytes(tail[8..10].try_into().unwrap()), -2);
    }
}
