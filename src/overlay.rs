//! Burning dialogue onto frames.

use crate::error::*;
use crate::subtitles::clean_line;
use fontdue::layout::{
    CoordinateSystem, HorizontalAlign, Layout, LayoutSettings, TextStyle, VerticalAlign, WrapStyle,
};
use fontdue::{Font, FontSettings};
use image::RgbImage;
use std::path::Path;

const MAX_LINES: usize = 2;
const MIN_FONT_SIZE: f32 = 12.0;

pub trait Captioner {
    fn draw_quote(&self, image: RgbImage, text: &str) -> Result<RgbImage>;
}

/// Leaves frames untouched. Used when no caption font is configured.
pub struct Uncaptioned;

impl Captioner for Uncaptioned {
    fn draw_quote(&self, image: RgbImage, _text: &str) -> Result<RgbImage> {
        Ok(image)
    }
}

/// Caption renderer: white text with a dark outline, centered at the bottom.
pub struct FontCaptioner {
    font: Font,
}

impl FontCaptioner {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| Error::context(format!("failed to parse font: {}", e)))?;
        Ok(FontCaptioner { font })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .context_kind(ErrorKind::Io, format!("failed to read font `{}`", path.display()))?;
        Self::from_bytes(bytes)
    }

    fn layout(&self, text: &str, font_size: f32, max_width: f32) -> Layout {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: 0.0,
            y: 0.0,
            max_width: Some(max_width),
            max_height: None,
            horizontal_align: HorizontalAlign::Center,
            vertical_align: VerticalAlign::Top,
            line_height: 1.0,
            wrap_style: WrapStyle::Word,
            wrap_hard_breaks: true,
        });
        layout.append(&[&self.font], &TextStyle::new(text, font_size, 0));
        layout
    }

    /// Shrink the font until the quote fits in [`MAX_LINES`].
    fn fit(&self, text: &str, width: u32, height: u32) -> (Layout, f32) {
        let max_width = width as f32 * 0.9;
        let mut font_size = font_size_for(height);

        loop {
            let layout = self.layout(text, font_size, max_width);
            let lines = layout.lines().map_or(0, Vec::len);
            if lines <= MAX_LINES || font_size <= MIN_FONT_SIZE {
                return (layout, font_size);
            }
            font_size = (font_size * 0.9).max(MIN_FONT_SIZE);
        }
    }
}

impl Captioner for FontCaptioner {
    fn draw_quote(&self, mut image: RgbImage, text: &str) -> Result<RgbImage> {
        let text = clean_line(text);
        if text.is_empty() {
            return Ok(image);
        }

        let (width, height) = image.dimensions();
        let (layout, font_size) = self.fit(&text, width, height);

        let margin = height as f32 * 0.06;
        let offset_x = width as f32 * 0.05;
        let offset_y = height as f32 - margin - layout.height();
        let stroke = (font_size / 18.0).round().max(1.0) as i32;

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (_, coverage) = self.font.rasterize_config(glyph.key);
            let x = (glyph.x + offset_x).round() as i32;
            let y = (glyph.y + offset_y).round() as i32;
            let bitmap = Bitmap {
                width: glyph.width,
                height: glyph.height,
                coverage: &coverage,
            };

            for dy in -stroke..=stroke {
                for dx in -stroke..=stroke {
                    if dx != 0 || dy != 0 {
                        blend(&mut image, x + dx, y + dy, &bitmap, [16, 16, 16]);
                    }
                }
            }
            blend(&mut image, x, y, &bitmap, [255, 255, 255]);
        }

        Ok(image)
    }
}

/// Caption size relative to the frame height.
pub fn font_size_for(height: u32) -> f32 {
    (height as f32 / 15.0).max(MIN_FONT_SIZE)
}

struct Bitmap<'a> {
    width: usize,
    height: usize,
    coverage: &'a [u8],
}

fn blend(image: &mut RgbImage, x: i32, y: i32, bitmap: &Bitmap, color: [u8; 3]) {
    let (width, height) = image.dimensions();

    for row in 0..bitmap.height {
        let py = y + row as i32;
        if py < 0 || py >= height as i32 {
            continue;
        }
        for column in 0..bitmap.width {
            let px = x + column as i32;
            if px < 0 || px >= width as i32 {
                continue;
            }
            let alpha = u32::from(bitmap.coverage[row * bitmap.width + column]);
            if alpha == 0 {
                continue;
            }

            let pixel = image.get_pixel_mut(px as u32, py as u32);
            for (channel, value) in pixel.0.iter_mut().zip(color.iter()) {
                *channel =
                    ((u32::from(*value) * alpha + u32::from(*channel) * (255 - alpha)) / 255) as u8;
            }
        }
    }
}
