use image::{Rgba, RgbaImage};

use super::fill_rects;

const BORDER_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const CROSS_COLOR: Rgba<u8> = Rgba([0, 160, 0, 255]);
const ANCHOR_COLOR: Rgba<u8> = Rgba([0, 64, 255, 255]);
const CROSS_SIZE: i32 = 5;
const CROSS_SPAN: u32 = 2 * CROSS_SIZE as u32 + 1;

/// Diagnostic drawing for a box; off unless a caller asks for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugOverlay {
    /// Region outline.
    pub borders: bool,
    /// Crosses at the top-left corner, centre, bottom-right corner, plus the
    /// resolved anchor.
    pub anchors: bool,
}

impl DebugOverlay {
    pub fn all() -> Self {
        Self {
            borders: true,
            anchors: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.borders || self.anchors
    }
}

pub fn draw_debug_overlay(
    target: &mut RgbaImage,
    region: (i32, i32, i32, i32),
    anchor: (i32, i32),
    overlay: DebugOverlay,
) {
    let (x, y, width, height) = region;
    let (width, height) = (width.max(0), height.max(0));
    if overlay.borders {
        let (span_x, span_y) = (width as u32 + 1, height as u32 + 1);
        fill_rects(
            target,
            &[
                (x, y, span_x, 1),
                (x, y + height, span_x, 1),
                (x, y, 1, span_y),
                (x + width, y, 1, span_y),
            ],
            BORDER_COLOR,
        );
    }
    if overlay.anchors {
        let mut crosses = Vec::with_capacity(6);
        for (cx, cy) in [(x, y), (x + width / 2, y + height / 2), (x + width, y + height)] {
            crosses.push((cx, cy - CROSS_SIZE, 1, CROSS_SPAN));
            crosses.push((cx - CROSS_SIZE, cy, CROSS_SPAN, 1));
        }
        fill_rects(target, &crosses, CROSS_COLOR);
        fill_rects(target, &[(anchor.0 - 1, anchor.1 - 1, 3, 3)], ANCHOR_COLOR);
    }
}
