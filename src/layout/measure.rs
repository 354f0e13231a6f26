use crate::font::ScaledFont;

/// Pixel extent of a wrapped block before rotation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlockSize {
    pub width: f32,
    pub height: f32,
}

impl BlockSize {
    pub fn fits(&self, width: f32, height: f32) -> bool {
        self.width <= width && self.height <= height
    }
}

/// Widest line and `lines × (ascent + descent + leading_offset)`.
pub fn measure_block(lines: &[String], font: &ScaledFont, leading_offset: f32) -> BlockSize {
    let width = lines
        .iter()
        .map(|line| font.measure(line))
        .fold(0.0, f32::max);
    BlockSize {
        width,
        height: lines.len() as f32 * font.line_height(leading_offset),
    }
}
