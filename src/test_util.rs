use std::sync::Arc;

use image::{Rgba, RgbaImage};
use ttf_parser::OutlineBuilder;

use crate::font::{FontRef, FontSource, ScaledFont, Typeface};
use crate::layout::LayoutError;

/// Monospaced face whose glyphs are solid boxes: 1000 units per em, 800 up,
/// 200 down, 600 advance, glyph box x 50..550 and y 0..700. Whitespace draws
/// nothing.
pub(crate) struct BlockFace;

impl Typeface for BlockFace {
    fn units_per_em(&self) -> f32 {
        1000.0
    }

    fn ascender(&self) -> f32 {
        800.0
    }

    fn descender(&self) -> f32 {
        200.0
    }

    fn text_advance(&self, text: &str) -> f32 {
        text.chars().filter(|ch| *ch != '\n').count() as f32 * 600.0
    }

    fn outline_text(&self, text: &str, builder: &mut dyn OutlineBuilder) {
        for (index, ch) in text.chars().filter(|ch| *ch != '\n').enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let left = index as f32 * 600.0 + 50.0;
            let right = left + 500.0;
            builder.move_to(left, 0.0);
            builder.line_to(right, 0.0);
            builder.line_to(right, 700.0);
            builder.line_to(left, 700.0);
            builder.close();
        }
    }
}

/// Serves [`BlockFace`] for every reference.
pub(crate) struct BlockFonts;

impl FontSource for BlockFonts {
    fn font(&self, _reference: &FontRef, size: f32) -> Result<ScaledFont, LayoutError> {
        Ok(ScaledFont::new(Arc::new(BlockFace), size))
    }
}

pub(crate) fn blank_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))
}

/// Inclusive `(left, top, right, bottom)` of pixels that differ from
/// `background`.
pub(crate) fn changed_bounds(image: &RgbaImage, background: Rgba<u8>) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if *pixel == background {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((left, top, right, bottom)) => {
                (left.min(x), top.min(y), right.max(x), bottom.max(y))
            }
        });
    }
    bounds
}
