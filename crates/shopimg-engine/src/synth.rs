use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use rusttype::{point, Font, Scale};
use shopimg_contracts::config::{Color, ColorPalette, LabelConfig, ShopimgConfig};
use shopimg_contracts::images::{NormalizedImage, PLACEHOLDER_QUALITY, TARGET_DIMENSION};

use crate::normalize::encode_jpeg;

const SHADOW_OFFSET: i32 = 1;
const LINE_SPACING: f32 = 4.0;

const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub struct LabelFont {
    font: Font<'static>,
    source: PathBuf,
}

impl LabelFont {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed reading font {}", path.display()))?;
        let font = Font::try_from_vec(bytes)
            .with_context(|| format!("unsupported font file {}", path.display()))?;
        Ok(Self {
            font,
            source: path.to_path_buf(),
        })
    }

    /// Configured font first, then well-known system locations. `None`
    /// means placeholders are rendered without labels.
    pub fn discover(config: &LabelConfig) -> Option<Self> {
        if let Some(path) = config.font_path.as_deref() {
            match Self::load(path) {
                Ok(font) => return Some(font),
                Err(err) => eprintln!("label font unavailable: {err:#}"),
            }
        }
        SYSTEM_FONT_CANDIDATES
            .iter()
            .map(Path::new)
            .filter(|path| path.is_file())
            .find_map(|path| Self::load(path).ok())
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Placeholder generator: a palette-coloured square, optionally labelled
/// with the product name. Never fails.
pub struct Synthesizer {
    palette: ColorPalette,
    font: Option<LabelFont>,
    px: f32,
}

impl Synthesizer {
    pub fn new(palette: ColorPalette, font: Option<LabelFont>, px: f32) -> Self {
        Self { palette, font, px }
    }

    pub fn from_config(config: &ShopimgConfig) -> Self {
        Self::new(
            config.palette.clone(),
            LabelFont::discover(&config.label),
            config.label.px,
        )
    }

    pub fn can_label(&self) -> bool {
        self.font.is_some()
    }

    pub fn font_source(&self) -> Option<&Path> {
        self.font.as_ref().map(LabelFont::source)
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    pub fn synthesize(&self, display_name: &str, category: &str, label: bool) -> NormalizedImage {
        self.synthesize_with_color(display_name, self.palette.color_for(category), label)
    }

    pub fn synthesize_with_color(
        &self,
        display_name: &str,
        color: Color,
        label: bool,
    ) -> NormalizedImage {
        let mut canvas =
            RgbImage::from_pixel(TARGET_DIMENSION, TARGET_DIMENSION, Rgb(color.channels()));
        if let (true, Some(font)) = (label, self.font.as_ref()) {
            draw_label(&mut canvas, &font.font, self.px, &label_lines(display_name));
        }
        let bytes = encode_jpeg(&canvas, PLACEHOLDER_QUALITY)
            .expect("JPEG encoding into an in-memory buffer cannot fail for a fixed-size RGB canvas");
        NormalizedImage::from_encoded(bytes, PLACEHOLDER_QUALITY)
    }
}

/// Names longer than two words wrap after the second word.
pub fn label_lines(name: &str) -> Vec<String> {
    let words = name.split_whitespace().collect::<Vec<&str>>();
    match words.len() {
        0 => Vec::new(),
        1 | 2 => vec![words.join(" ")],
        _ => vec![words[..2].join(" "), words[2..].join(" ")],
    }
}

fn draw_label(canvas: &mut RgbImage, font: &Font<'static>, px: f32, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let scale = Scale::uniform(px);
    let v_metrics = font.v_metrics(scale);
    let line_height = v_metrics.ascent - v_metrics.descent;
    let block_height =
        line_height * lines.len() as f32 + LINE_SPACING * (lines.len() as f32 - 1.0);
    let top = (canvas.height() as f32 - block_height) / 2.0;

    let placed = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let x = (canvas.width() as f32 - text_width(font, scale, line)) / 2.0;
            let y = top + idx as f32 * (line_height + LINE_SPACING) + v_metrics.ascent;
            (line.as_str(), x.round() as i32, y.round() as i32)
        })
        .collect::<Vec<(&str, i32, i32)>>();

    let mut mask = Vec::new();
    for (text, x, baseline) in &placed {
        rasterize(font, scale, *x, *baseline, text, &mut mask);
    }
    stamp_label(canvas, &mask);
}

/// Glyph coverage as `(x, y, alpha)` in canvas coordinates.
type CoverageMask = Vec<(i32, i32, f32)>;

/// Black copy at (+1, +1) first, white copy on top.
fn stamp_label(canvas: &mut RgbImage, mask: &[(i32, i32, f32)]) {
    stamp(canvas, mask, SHADOW_OFFSET, Color::BLACK);
    stamp(canvas, mask, 0, Color::WHITE);
}

fn text_width(font: &Font<'static>, scale: Scale, text: &str) -> f32 {
    font.layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

fn rasterize(
    font: &Font<'static>,
    scale: Scale,
    x: i32,
    baseline: i32,
    text: &str,
    mask: &mut CoverageMask,
) {
    for glyph in font.layout(text, scale, point(x as f32, baseline as f32)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            if coverage > 0.0 {
                mask.push((gx as i32 + bb.min.x, gy as i32 + bb.min.y, coverage.min(1.0)));
            }
        });
    }
}

fn stamp(canvas: &mut RgbImage, mask: &[(i32, i32, f32)], offset: i32, color: Color) {
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);
    for &(x, y, alpha) in mask {
        let (px, py) = (x + offset, y + offset);
        if px < 0 || py < 0 || px >= width || py >= height {
            continue;
        }
        let dst = canvas.get_pixel_mut(px as u32, py as u32);
        for (channel, src) in dst.0.iter_mut().zip(color.channels()) {
            let blended = f32::from(src) * alpha + f32::from(*channel) * (1.0 - alpha);
            *channel = blended.round() as u8;
        }
    }
}
