use image::{GrayImage, Rgba, RgbaImage, imageops};
use tiny_skia::{FilterQuality, Mask, Paint, Pixmap, PixmapMut, PixmapPaint, Rect, Transform};

use super::{HAlign, LayoutError};
use crate::font::ScaledFont;

/// Draws `lines` onto a scratch mask and crops it to the block.
///
/// The scratch canvas is the block plus one line height of margin on every
/// side. Its reference point sits `margin` from the top and, horizontally,
/// `margin` from the left edge (left aligned), at the centre, or `margin`
/// from the right edge (right aligned). Each line is placed against that
/// point by `h_align`; blank lines only advance. The crop spans the widest
/// line horizontally and, vertically, from the reference point to the end
/// of the last line minus `leading_offset`.
pub(super) fn draw_block(
    lines: &[String],
    font: &ScaledFont,
    h_align: HAlign,
    leading_offset: f32,
) -> Result<GrayImage, LayoutError> {
    let widths: Vec<f32> = lines.iter().map(|line| font.measure(line)).collect();
    let max_width = widths.iter().copied().fold(0.0, f32::max);
    if max_width <= 0.0 {
        return Ok(GrayImage::new(0, 0));
    }

    let line_height = font.line_height(leading_offset);
    let glyph_height = font.ascent() + font.descent();
    let block_height = lines.len() as f32 * line_height - leading_offset;
    let margin = glyph_height.ceil().max(1.0);
    let canvas_width = (max_width.ceil() + margin * 2.0) as u32;
    let canvas_height = (block_height.max(glyph_height).ceil() + margin * 2.0) as u32;
    let mut mask = Mask::new(canvas_width, canvas_height).ok_or(LayoutError::Canvas {
        width: canvas_width,
        height: canvas_height,
    })?;

    let reference_x = match h_align {
        HAlign::Left => margin,
        HAlign::Center => canvas_width as f32 / 2.0,
        HAlign::Right => canvas_width as f32 - margin,
    };
    let top = margin;

    let mut y = top;
    for (line, width) in lines.iter().zip(&widths) {
        if !line.is_empty() {
            let x = aligned_start(reference_x, *width, h_align);
            font.draw_line(&mut mask, line, x, y);
        }
        y += line_height;
    }

    let left = aligned_start(reference_x, max_width, h_align);
    let right = left + max_width;
    let bottom = y - leading_offset;

    let x0 = left.floor().max(0.0) as u32;
    let x1 = (right.ceil() as u32).min(canvas_width);
    let y0 = top.floor() as u32;
    let y1 = (bottom.ceil().max(top) as u32).min(canvas_height);

    let scratch = GrayImage::from_raw(canvas_width, canvas_height, mask.data().to_vec()).ok_or(
        LayoutError::Canvas {
            width: canvas_width,
            height: canvas_height,
        },
    )?;
    Ok(imageops::crop_imm(&scratch, x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0)).to_image())
}

fn aligned_start(reference_x: f32, width: f32, h_align: HAlign) -> f32 {
    match h_align {
        HAlign::Left => reference_x,
        HAlign::Center => reference_x - width / 2.0,
        HAlign::Right => reference_x - width,
    }
}

/// Rotates counter-clockwise, growing the canvas so nothing is clipped.
pub(super) fn rotate(layer: GrayImage, degrees: i32) -> Result<GrayImage, LayoutError> {
    if layer.width() == 0 || layer.height() == 0 {
        return Ok(layer);
    }
    match degrees.rem_euclid(360) {
        0 => Ok(layer),
        90 => Ok(imageops::rotate270(&layer)),
        180 => Ok(imageops::rotate180(&layer)),
        270 => Ok(imageops::rotate90(&layer)),
        other => rotate_resampled(&layer, other as f32),
    }
}

fn rotate_resampled(layer: &GrayImage, degrees: f32) -> Result<GrayImage, LayoutError> {
    let (width, height) = layer.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (w, h) = (width as f32, height as f32);
    let out_width = (w * cos.abs() + h * sin.abs()).ceil() as u32;
    let out_height = (w * sin.abs() + h * cos.abs()).ceil() as u32;

    let mut source = Pixmap::new(width, height).ok_or(LayoutError::Canvas { width, height })?;
    for (pixel, value) in source.data_mut().chunks_exact_mut(4).zip(layer.as_raw()) {
        pixel.fill(*value);
    }
    let mut rotated = Pixmap::new(out_width, out_height).ok_or(LayoutError::Canvas {
        width: out_width,
        height: out_height,
    })?;
    // y points down, so a negative angle turns counter-clockwise on screen.
    let transform = Transform::from_rotate(-degrees)
        .pre_translate(-w / 2.0, -h / 2.0)
        .post_translate(out_width as f32 / 2.0, out_height as f32 / 2.0);
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    rotated.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);

    let alpha: Vec<u8> = rotated.data().chunks_exact(4).map(|pixel| pixel[3]).collect();
    GrayImage::from_raw(out_width, out_height, alpha).ok_or(LayoutError::Canvas {
        width: out_width,
        height: out_height,
    })
}

/// Blends `layer` into `target` at `origin`, tinting from white towards
/// `color` by coverage and using the same coverage as alpha. Pixels that
/// fall outside the target are dropped.
pub(super) fn composite(target: &mut RgbaImage, layer: &GrayImage, origin: (i64, i64), color: Rgba<u8>) {
    let (target_width, target_height) = (target.width() as i64, target.height() as i64);
    for (lx, ly, coverage) in layer.enumerate_pixels() {
        let value = coverage[0];
        if value == 0 {
            continue;
        }
        let tx = origin.0 + lx as i64;
        let ty = origin.1 + ly as i64;
        if tx < 0 || ty < 0 || tx >= target_width || ty >= target_height {
            continue;
        }
        let alpha = value as f32 / 255.0;
        let dst = target.get_pixel_mut(tx as u32, ty as u32);
        for channel in 0..3 {
            let tinted = 255.0 + (color[channel] as f32 - 255.0) * alpha;
            let blended = tinted * alpha + dst[channel] as f32 * (1.0 - alpha);
            dst[channel] = blended.round().clamp(0.0, 255.0) as u8;
        }
        let blended_alpha = 255.0 * alpha + dst[3] as f32 * (1.0 - alpha);
        dst[3] = blended_alpha.round().clamp(0.0, 255.0) as u8;
    }
}

/// Fills each `(x, y, width, height)` rect of `target` with `color`, clipped
/// to the image. Edges are pixel aligned, so no anti-aliasing is applied.
pub(crate) fn fill_rects(target: &mut RgbaImage, rects: &[(i32, i32, u32, u32)], color: Rgba<u8>) {
    let (width, height) = target.dimensions();
    let Some(mut pixmap) = PixmapMut::from_bytes(target, width, height) else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = false;
    for &(x, y, w, h) in rects {
        if let Some(rect) = Rect::from_xywh(x as f32, y as f32, w as f32, h as f32) {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }
}
