use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use fontpack::config::FontConfig;
use fontpack::icons;
use fontpack::output::descriptor::Descriptor;
use fontpack::output::{page_file_name, texture};
use fontpack::pack::driver::{CancelFlag, PackOutcome, pack_all};
use fontpack::pack::glyph::GlyphRecord;
use fontpack::raster::FontRaster;

#[derive(Parser, Debug)]
#[command(
    name = "fontpack",
    version,
    about = "Generates bitmap font atlases and descriptors from TrueType fonts"
)]
struct Args {
    /// Generation settings file (key=value format)
    #[arg(short, long)]
    config: PathBuf,

    /// Output descriptor path; texture pages are written next to it
    #[arg(short, long)]
    output: PathBuf,

    /// Text file whose characters are added to the configured selection
    #[arg(short, long)]
    text_file: Option<PathBuf>,

    /// Also save per-channel preview images of each page
    #[arg(long)]
    preview: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .init();

    let args = Args::parse();

    let config = FontConfig::load(&args.config)?;
    info!(
        "generating {:?} at {}px into {}x{} pages",
        config.font_file, config.font_size, config.out_width, config.out_height
    );

    let raster = FontRaster::load(&config.font_file, config.font_size)?;

    let mut selection = config.selected_chars();
    if let Some(path) = &args.text_file {
        add_chars_from_file(&mut selection, path)?;
    }

    let glyphs = build_glyphs(&config, &raster, &selection)?;
    if glyphs.is_empty() {
        bail!("no characters to generate");
    }

    let total = glyphs.len();
    let outcome = pack_all(&config.pack_settings(), glyphs, &CancelFlag::new(), |n| {
        if n % 256 == 0 {
            debug!("placed {}/{} glyphs", n, total);
        }
    })
    .context("atlas generation failed; reduce the font size or the page dimensions")?;
    report_and_save(&args, &config, &raster, &outcome)
}

fn report_and_save(
    args: &Args,
    config: &FontConfig,
    raster: &FontRaster,
    outcome: &PackOutcome,
) -> Result<()> {
    if !outcome.no_fit.is_empty() {
        warn!(
            "{} characters did not fit within the page size",
            outcome.no_fit.len()
        );
    }
    info!("packed onto {} pages", outcome.pages.len());

    // The descriptor always gets the .fnt extension; page names share
    // its stem.
    let mut desc_path = args.output.clone();
    desc_path.set_extension("fnt");
    let stem = desc_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("invalid output path {:?}", args.output))?;
    let dir = desc_path.parent().unwrap_or(Path::new("")).to_path_buf();

    Descriptor {
        config,
        face_name: raster.face_name(),
        line_height: raster.line_height(),
        base: raster.base(),
        pages: &outcome.pages,
        kerning: &kerning_for_descriptor(config, raster, outcome),
    }
    .save(&desc_path)?;

    for (n, page) in outcome.pages.iter().enumerate() {
        let file = page_file_name(&stem, n, outcome.pages.len(), &config.texture_format);
        texture::save_page(page, &dir.join(file), config.out_bit_depth)?;

        if args.preview {
            let channels = if config.page_format().packs_channels() {
                4
            } else {
                1
            };
            for ch in 0..channels {
                let file = format!("{}_{}_preview{}.png", stem, n, ch);
                texture::save_preview(page, ch, &dir.join(file))?;
            }
        }
    }

    info!("done");
    Ok(())
}

fn kerning_for_descriptor(
    config: &FontConfig,
    raster: &FontRaster,
    outcome: &PackOutcome,
) -> Vec<(u32, u32, i32)> {
    if config.dont_include_kerning_pairs {
        return Vec::new();
    }
    // Only pairs where both characters actually made it onto a page.
    let exported: Vec<u32> = outcome
        .pages
        .iter()
        .flat_map(|p| p.glyphs())
        .filter(|g| g.is_char && g.id >= 0)
        .map(|g| g.id as u32)
        .collect();
    raster.kerning_pairs(&exported)
}

/// Rasterizes the selected characters and loads the configured icons,
/// producing the flat glyph list handed to the packer.
fn build_glyphs(
    config: &FontConfig,
    raster: &FontRaster,
    selection: &[u32],
) -> Result<Vec<GlyphRecord>> {
    let mut glyphs = Vec::new();
    let mut missing = 0usize;
    for &id in selection {
        if !raster.has_glyph(id) {
            missing += 1;
            continue;
        }
        glyphs.push(prepare_glyph(raster.rasterize_char(id)?, config)?);
    }
    if missing > 0 {
        warn!("{} selected characters are missing from the font", missing);
    }

    if config.output_invalid_char_glyph {
        glyphs.push(prepare_glyph(raster.invalid_glyph()?, config)?);
    }

    for entry in &config.icons {
        glyphs.push(icons::load_icon(entry)?);
    }

    info!("rasterized {} glyphs", glyphs.len());
    Ok(glyphs)
}

fn prepare_glyph(mut glyph: GlyphRecord, config: &FontConfig) -> Result<GlyphRecord> {
    if config.outline_thickness > 0 {
        glyph
            .add_outline(config.outline_thickness)
            .map_err(|_| anyhow!("out of memory outlining glyph {}", glyph.id))?;
    }
    glyph
        .trim_sides()
        .map_err(|_| anyhow!("out of memory trimming glyph {}", glyph.id))?;
    Ok(glyph)
}

/// Adds every distinct character of a text file to the selection, the
/// way an asset pipeline pins an atlas to the strings it will render.
fn add_chars_from_file(selection: &mut Vec<u32>, path: &Path) -> Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read text file {:?}", path))?;
    let before = selection.len();
    selection.extend(text.chars().map(|c| c as u32));
    selection.sort_unstable();
    selection.dedup();
    info!(
        "text file {:?} added {} characters to the selection",
        path,
        selection.len() - before
    );
    Ok(())
}
