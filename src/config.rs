use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use configparser::ini::Ini;
use log::warn;

use crate::pack::driver::PackSettings;
use crate::pack::{ChannelContent, PageFormat};

/// How the font descriptor is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptorFormat {
    #[default]
    Text = 0,
    Xml = 1,
    Binary = 2,
    Json = 3,
}

/// One imported icon image: packed alongside the glyphs, exported under a
/// character id of its own.
#[derive(Debug, Clone)]
pub struct IconEntry {
    pub path: PathBuf,
    pub id: i32,
    pub xoffset: i32,
    pub yoffset: i32,
    pub advance: i32,
}

/// Generation settings, persisted as a BMFont-style `key=value` text file.
#[derive(Debug, Clone)]
pub struct FontConfig {
    pub font_file: PathBuf,
    pub font_size: i32,
    pub is_bold: bool,
    pub is_italic: bool,
    pub output_invalid_char_glyph: bool,
    pub dont_include_kerning_pairs: bool,
    pub outline_thickness: i32,

    pub padding_down: i32,
    pub padding_up: i32,
    pub padding_right: i32,
    pub padding_left: i32,
    pub spacing_horiz: i32,
    pub spacing_vert: i32,

    pub out_width: i32,
    pub out_height: i32,
    pub out_bit_depth: i32,
    pub four_chnl_packed: bool,
    pub texture_format: String,
    pub font_desc_format: DescriptorFormat,
    pub alpha_chnl: ChannelContent,
    pub red_chnl: ChannelContent,
    pub green_chnl: ChannelContent,
    pub blue_chnl: ChannelContent,
    pub inv_a: bool,
    pub inv_r: bool,
    pub inv_g: bool,
    pub inv_b: bool,

    /// Selected character codes, kept as inclusive ranges.
    pub chars: Vec<(u32, u32)>,
    pub icons: Vec<IconEntry>,
}

impl Default for FontConfig {
    fn default() -> FontConfig {
        FontConfig {
            font_file: PathBuf::new(),
            font_size: 32,
            is_bold: false,
            is_italic: false,
            output_invalid_char_glyph: false,
            dont_include_kerning_pairs: false,
            outline_thickness: 0,
            padding_down: 0,
            padding_up: 0,
            padding_right: 0,
            padding_left: 0,
            spacing_horiz: 1,
            spacing_vert: 1,
            out_width: 256,
            out_height: 256,
            out_bit_depth: 8,
            four_chnl_packed: false,
            texture_format: "png".to_string(),
            font_desc_format: DescriptorFormat::Text,
            alpha_chnl: ChannelContent::Outline,
            red_chnl: ChannelContent::Glyph,
            green_chnl: ChannelContent::Glyph,
            blue_chnl: ChannelContent::Glyph,
            inv_a: false,
            inv_r: false,
            inv_g: false,
            inv_b: false,
            chars: vec![(32, 126)],
            icons: Vec::new(),
        }
    }
}

impl FontConfig {
    pub fn load(path: &Path) -> Result<FontConfig> {
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| anyhow::anyhow!("failed to parse config {:?}: {}", path, e))?;

        let mut cfg = FontConfig::default();
        let getint = |key: &str, fallback: i32| -> i32 {
            ini.getint("default", key)
                .ok()
                .flatten()
                .map_or(fallback, |v| v as i32)
        };
        let getbool = |key: &str, fallback: bool| -> bool { getint(key, fallback as i32) != 0 };

        if let Some(file) = ini.get("default", "fontfile") {
            // Font paths are stored relative to the config file.
            let base = path.parent().unwrap_or(Path::new(""));
            cfg.font_file = base.join(file);
        }
        cfg.font_size = getint("fontsize", cfg.font_size).abs();
        cfg.is_bold = getbool("isbold", cfg.is_bold);
        cfg.is_italic = getbool("isitalic", cfg.is_italic);
        cfg.output_invalid_char_glyph =
            getbool("outputinvalidcharglyph", cfg.output_invalid_char_glyph);
        cfg.dont_include_kerning_pairs =
            getbool("dontincludekerningpairs", cfg.dont_include_kerning_pairs);
        cfg.outline_thickness = getint("outlinethickness", cfg.outline_thickness);

        cfg.padding_down = getint("paddingdown", 0);
        cfg.padding_up = getint("paddingup", 0);
        cfg.padding_right = getint("paddingright", 0);
        cfg.padding_left = getint("paddingleft", 0);
        cfg.spacing_horiz = getint("spacinghoriz", cfg.spacing_horiz);
        cfg.spacing_vert = getint("spacingvert", cfg.spacing_vert);

        cfg.out_width = getint("outwidth", cfg.out_width);
        cfg.out_height = getint("outheight", cfg.out_height);
        cfg.out_bit_depth = getint("outbitdepth", cfg.out_bit_depth);
        cfg.four_chnl_packed = getbool("fourchnlpacked", cfg.four_chnl_packed);
        if let Some(fmt) = ini.get("default", "textureformat") {
            cfg.texture_format = fmt.to_lowercase();
        }
        cfg.font_desc_format = match getint("fontdescformat", 0) {
            1 => DescriptorFormat::Xml,
            2 => DescriptorFormat::Binary,
            3 => DescriptorFormat::Json,
            _ => DescriptorFormat::Text,
        };
        cfg.alpha_chnl = ChannelContent::from_i64(getint("alphachnl", 1) as i64);
        cfg.red_chnl = ChannelContent::from_i64(getint("redchnl", 0) as i64);
        cfg.green_chnl = ChannelContent::from_i64(getint("greenchnl", 0) as i64);
        cfg.blue_chnl = ChannelContent::from_i64(getint("bluechnl", 0) as i64);
        cfg.inv_a = getbool("inva", false);
        cfg.inv_r = getbool("invr", false);
        cfg.inv_g = getbool("invg", false);
        cfg.inv_b = getbool("invb", false);

        if cfg.out_bit_depth != 8 && cfg.out_bit_depth != 32 {
            bail!("outBitDepth must be 8 or 32, got {}", cfg.out_bit_depth);
        }
        match cfg.texture_format.as_str() {
            "png" | "tga" => {}
            other => bail!(
                "unsupported texture format {:?} (png and tga are supported)",
                other
            ),
        }

        // `chars` and `icon` may repeat, which the INI reader collapses, so
        // those lines are collected in a second pass over the raw text.
        cfg.chars = Vec::new();
        let raw =
            fs::read_to_string(path).with_context(|| format!("failed to read config {:?}", path))?;
        for line in raw.lines() {
            let line = line.trim();
            if let Some(ranges) = line.strip_prefix("chars=") {
                parse_char_ranges(ranges, &mut cfg.chars)?;
            } else if let Some(rest) = line.strip_prefix("icon=") {
                match parse_icon_entry(rest, path) {
                    Some(icon) => cfg.icons.push(icon),
                    None => warn!("ignoring malformed icon line: {}", line),
                }
            }
        }
        if cfg.chars.is_empty() {
            cfg.chars = FontConfig::default().chars;
        }

        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        let _ = writeln!(out, "# fontpack configuration file");
        let _ = writeln!(out, "fileVersion=1");
        let _ = writeln!(out);
        let _ = writeln!(out, "# font settings");
        let _ = writeln!(out, "fontFile={}", self.font_file.display());
        let _ = writeln!(out, "fontSize={}", self.font_size);
        let _ = writeln!(out, "isBold={}", self.is_bold as i32);
        let _ = writeln!(out, "isItalic={}", self.is_italic as i32);
        let _ = writeln!(
            out,
            "outputInvalidCharGlyph={}",
            self.output_invalid_char_glyph as i32
        );
        let _ = writeln!(
            out,
            "dontIncludeKerningPairs={}",
            self.dont_include_kerning_pairs as i32
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "# character alignment");
        let _ = writeln!(out, "paddingDown={}", self.padding_down);
        let _ = writeln!(out, "paddingUp={}", self.padding_up);
        let _ = writeln!(out, "paddingRight={}", self.padding_right);
        let _ = writeln!(out, "paddingLeft={}", self.padding_left);
        let _ = writeln!(out, "spacingHoriz={}", self.spacing_horiz);
        let _ = writeln!(out, "spacingVert={}", self.spacing_vert);
        let _ = writeln!(out);
        let _ = writeln!(out, "# output file");
        let _ = writeln!(out, "outWidth={}", self.out_width);
        let _ = writeln!(out, "outHeight={}", self.out_height);
        let _ = writeln!(out, "outBitDepth={}", self.out_bit_depth);
        let _ = writeln!(out, "fontDescFormat={}", self.font_desc_format as i32);
        let _ = writeln!(out, "fourChnlPacked={}", self.four_chnl_packed as i32);
        let _ = writeln!(out, "textureFormat={}", self.texture_format);
        let _ = writeln!(out, "alphaChnl={}", self.alpha_chnl as i32);
        let _ = writeln!(out, "redChnl={}", self.red_chnl as i32);
        let _ = writeln!(out, "greenChnl={}", self.green_chnl as i32);
        let _ = writeln!(out, "blueChnl={}", self.blue_chnl as i32);
        let _ = writeln!(out, "invA={}", self.inv_a as i32);
        let _ = writeln!(out, "invR={}", self.inv_r as i32);
        let _ = writeln!(out, "invG={}", self.inv_g as i32);
        let _ = writeln!(out, "invB={}", self.inv_b as i32);
        let _ = writeln!(out);
        let _ = writeln!(out, "# outline");
        let _ = writeln!(out, "outlineThickness={}", self.outline_thickness);
        let _ = writeln!(out);
        let _ = writeln!(out, "# selected chars");
        let ranges: Vec<String> = self
            .chars
            .iter()
            .map(|&(a, b)| {
                if a == b {
                    format!("{}", a)
                } else {
                    format!("{}-{}", a, b)
                }
            })
            .collect();
        let _ = writeln!(out, "chars={}", ranges.join(","));
        if !self.icons.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "# imported icon images");
            for icon in &self.icons {
                let _ = writeln!(
                    out,
                    "icon=\"{}\",{},{},{},{}",
                    icon.path.display(),
                    icon.id,
                    icon.xoffset,
                    icon.yoffset,
                    icon.advance
                );
            }
        }

        fs::write(path, out).with_context(|| format!("failed to write config {:?}", path))
    }

    /// Flat list of the selected character codes, ascending.
    pub fn selected_chars(&self) -> Vec<u32> {
        let mut chars: Vec<u32> = self.chars.iter().flat_map(|&(a, b)| a..=b).collect();
        chars.sort_unstable();
        chars.dedup();
        chars
    }

    pub fn pack_settings(&self) -> PackSettings {
        PackSettings {
            page_width: self.out_width,
            page_height: self.out_height,
            spacing_h: self.spacing_horiz,
            spacing_v: self.spacing_vert,
            padding_left: self.padding_left,
            padding_up: self.padding_up,
            padding_right: self.padding_right,
            padding_down: self.padding_down,
            format: self.page_format(),
        }
    }

    pub fn page_format(&self) -> PageFormat {
        PageFormat {
            bit_depth: self.out_bit_depth,
            four_chnl_packed: self.four_chnl_packed,
            alpha: self.alpha_chnl,
            red: self.red_chnl,
            green: self.green_chnl,
            blue: self.blue_chnl,
            inv_a: self.inv_a,
            inv_r: self.inv_r,
            inv_g: self.inv_g,
            inv_b: self.inv_b,
        }
    }
}

/// Parses `32-126,160,8216-8222` style range lists.
fn parse_char_ranges(ranges: &str, out: &mut Vec<(u32, u32)>) -> Result<()> {
    for part in ranges.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (lo, hi) = match part.split_once('-') {
            Some((a, b)) => (a.trim().parse::<u32>(), b.trim().parse::<u32>()),
            None => (part.parse::<u32>(), part.parse::<u32>()),
        };
        match (lo, hi) {
            (Ok(lo), Ok(hi)) if lo <= hi => out.push((lo, hi)),
            _ => bail!("invalid character range {:?}", part),
        }
    }
    Ok(())
}

/// Parses `icon="file.png",id,xoffset,yoffset,advance`.
fn parse_icon_entry(rest: &str, config_path: &Path) -> Option<IconEntry> {
    let rest = rest.trim().strip_prefix('"')?;
    let (file, tail) = rest.split_once('"')?;
    let nums: Vec<i32> = tail
        .trim_start_matches(',')
        .split(',')
        .map(|s| s.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .ok()?;
    if nums.len() != 4 {
        return None;
    }
    let base = config_path.parent().unwrap_or(Path::new(""));
    Some(IconEntry {
        path: base.join(file),
        id: nums[0],
        xoffset: nums[1],
        yoffset: nums[2],
        advance: nums[3],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranges_and_singles() {
        let mut out = Vec::new();
        parse_char_ranges("32-126,160,187-190", &mut out).unwrap();
        assert_eq!(out, vec![(32, 126), (160, 160), (187, 190)]);
    }

    #[test]
    fn rejects_backwards_range() {
        let mut out = Vec::new();
        assert!(parse_char_ranges("126-32", &mut out).is_err());
    }

    #[test]
    fn parses_icon_lines() {
        let icon =
            parse_icon_entry("\"icons/coin.png\",128,1,-2,3", Path::new("conf/font.bmfc")).unwrap();
        assert_eq!(icon.path, Path::new("conf/icons/coin.png"));
        assert_eq!(
            (icon.id, icon.xoffset, icon.yoffset, icon.advance),
            (128, 1, -2, 3)
        );
    }

    #[test]
    fn config_round_trips_through_save_and_load() {
        let mut cfg = FontConfig {
            font_size: 48,
            out_width: 512,
            out_height: 512,
            out_bit_depth: 32,
            four_chnl_packed: true,
            font_desc_format: DescriptorFormat::Xml,
            chars: vec![(32, 64), (970, 980)],
            ..FontConfig::default()
        };
        cfg.icons.push(IconEntry {
            path: PathBuf::from("coin.png"),
            id: 200,
            xoffset: 0,
            yoffset: 4,
            advance: 2,
        });

        let dir = std::env::temp_dir().join("fontpack-config-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roundtrip.bmfc");
        cfg.save(&path).unwrap();
        let loaded = FontConfig::load(&path).unwrap();

        assert_eq!(loaded.font_size, 48);
        assert_eq!((loaded.out_width, loaded.out_height), (512, 512));
        assert_eq!(loaded.out_bit_depth, 32);
        assert!(loaded.four_chnl_packed);
        assert_eq!(loaded.font_desc_format, DescriptorFormat::Xml);
        assert_eq!(loaded.chars, vec![(32, 64), (970, 980)]);
        assert_eq!(loaded.icons.len(), 1);
        assert_eq!(loaded.icons[0].id, 200);
    }

    #[test]
    fn selected_chars_flattens_and_dedups() {
        let cfg = FontConfig {
            chars: vec![(65, 67), (66, 68)],
            ..FontConfig::default()
        };
        assert_eq!(cfg.selected_chars(), vec![65, 66, 67, 68]);
    }
}
