//! Text boxes on template images.
//!
//! A [`LayoutBox`] is a fixed region of a card template with its own font,
//! alignment, rotation and wrapping policy. Rendering wraps the text greedily
//! against the wrap axis (or searches for the largest point size that fits
//! when the box shrinks to fit), rasterizes the lines into a coverage mask,
//! crops the mask to the block, rotates it, and blends it onto the target so
//! that the block's aligned edge lands on the region's anchor point.

mod anchor;
mod debug;
mod error;
mod fit;
mod measure;
mod raster;
mod wrap;

use std::str::FromStr;

use image::{Rgba, RgbaImage};
use tracing::trace;

pub use anchor::resolve_anchor;
pub use debug::{DebugOverlay, draw_debug_overlay};
pub use error::LayoutError;
pub use fit::{FitRequest, FittedText, shrink_to_fit};
pub use measure::{BlockSize, measure_block};
pub use wrap::wrap_lines;

pub(crate) use raster::fill_rects;

use crate::font::{FontRef, FontSource, ScaledFont};

pub const DEFAULT_FONT_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Region dimension that limits line length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapAxis {
    #[default]
    Width,
    Height,
}

impl FromStr for HAlign {
    type Err = LayoutError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(HAlign::Left),
            "center" | "centre" => Ok(HAlign::Center),
            "right" => Ok(HAlign::Right),
            _ => Err(LayoutError::InvalidAlignment {
                axis: "horizontal",
                value: value.to_string(),
            }),
        }
    }
}

impl FromStr for VAlign {
    type Err = LayoutError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(VAlign::Top),
            "center" | "centre" => Ok(VAlign::Center),
            "bottom" => Ok(VAlign::Bottom),
            _ => Err(LayoutError::InvalidAlignment {
                axis: "vertical",
                value: value.to_string(),
            }),
        }
    }
}

impl FromStr for WrapAxis {
    type Err = LayoutError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "width" => Ok(WrapAxis::Width),
            "height" => Ok(WrapAxis::Height),
            _ => Err(LayoutError::InvalidWrapAxis(value.to_string())),
        }
    }
}

/// Per-call rendering inputs.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub color: Rgba<u8>,
    /// Extra pixels added to every line height.
    pub leading_offset: f32,
    /// Multiplies the region size and the font size.
    pub scale: f32,
    pub debug: DebugOverlay,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: Rgba([0, 0, 0, 255]),
            leading_offset: 0.0,
            scale: 1.0,
            debug: DebugOverlay::default(),
        }
    }
}

/// What one render placed on the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderResult {
    /// Placed layer size after cropping and rotation.
    pub width: u32,
    pub height: u32,
    /// Wrapped block before rotation.
    pub block: BlockSize,
    /// Pixel size of the font that was drawn.
    pub font_size: f32,
    pub line_count: usize,
}

struct LaidOut {
    font: ScaledFont,
    lines: Vec<String>,
    block: BlockSize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    h_align: HAlign,
    v_align: VAlign,
    rotation: i32,
    font: FontRef,
    font_size: u32,
    wrap_axis: WrapAxis,
    shrink_to_fit: bool,
}

impl LayoutBox {
    /// A centred, unrotated box at the default size that wraps on its width.
    pub fn new(x: i32, y: i32, width: u32, height: u32, font: FontRef) -> Self {
        Self {
            x,
            y,
            width,
            height,
            h_align: HAlign::default(),
            v_align: VAlign::default(),
            rotation: 0,
            font,
            font_size: DEFAULT_FONT_SIZE,
            wrap_axis: WrapAxis::default(),
            shrink_to_fit: false,
        }
    }

    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_align(mut self, h_align: HAlign, v_align: VAlign) -> Self {
        self.h_align = h_align;
        self.v_align = v_align;
        self
    }

    pub fn with_font(mut self, font: FontRef) -> Self {
        self.font = font;
        self
    }

    /// Sizes below one point are raised to one.
    pub fn with_font_size(mut self, size: u32) -> Self {
        self.font_size = size.max(1);
        self
    }

    pub fn with_rotation(mut self, degrees: i32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_wrap_axis(mut self, axis: WrapAxis) -> Self {
        self.wrap_axis = axis;
        self
    }

    pub fn with_shrink_to_fit(mut self, shrink: bool) -> Self {
        self.shrink_to_fit = shrink;
        self
    }

    pub fn origin(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn h_align(&self) -> HAlign {
        self.h_align
    }

    pub fn v_align(&self) -> VAlign {
        self.v_align
    }

    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    pub fn font(&self) -> &FontRef {
        &self.font
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn wrap_axis(&self) -> WrapAxis {
        self.wrap_axis
    }

    pub fn shrinks_to_fit(&self) -> bool {
        self.shrink_to_fit
    }

    /// Origin with the size multiplied by `scale`; the origin itself is not
    /// scaled.
    pub fn region(&self, scale: f32) -> (i32, i32, i32, i32) {
        (
            self.x,
            self.y,
            (self.width as f32 * scale).round() as i32,
            (self.height as f32 * scale).round() as i32,
        )
    }

    pub fn anchor(&self, scale: f32) -> (i32, i32) {
        let (x, y, width, height) = self.region(scale);
        resolve_anchor(x, y, width, height, self.h_align, self.v_align)
    }

    fn wrap_extent(&self, scale: f32) -> f32 {
        match self.wrap_axis {
            WrapAxis::Width => self.width as f32 * scale,
            WrapAxis::Height => self.height as f32 * scale,
        }
    }

    fn layout_text(
        &self,
        text: &str,
        fonts: &dyn FontSource,
        options: &RenderOptions,
    ) -> Result<LaidOut, LayoutError> {
        let scale = options.scale;
        let wrap_extent = self.wrap_extent(scale);
        if self.shrink_to_fit {
            let (width, height) = (self.width as f32 * scale, self.height as f32 * scale);
            // Lines run along the wrap axis, so the block is compared in that frame.
            let (max_width, max_height) = match self.wrap_axis {
                WrapAxis::Width => (width, height),
                WrapAxis::Height => (height, width),
            };
            let fitted = shrink_to_fit(
                fonts,
                &FitRequest {
                    text,
                    font: &self.font,
                    start_size: self.font_size,
                    scale,
                    max_width,
                    max_height,
                    wrap_extent,
                    leading_offset: options.leading_offset,
                },
            )?;
            return Ok(LaidOut {
                font: fitted.font,
                lines: fitted.lines,
                block: fitted.block,
            });
        }

        let font = fonts.font(&self.font, self.font_size as f32 * scale)?;
        let lines = wrap_lines(text, wrap_extent, |line| font.measure(line));
        let block = measure_block(&lines, &font, options.leading_offset);
        Ok(LaidOut { font, lines, block })
    }

    /// Size of the wrapped block `text` would occupy, without drawing.
    pub fn measure(
        &self,
        text: &str,
        fonts: &dyn FontSource,
        options: &RenderOptions,
    ) -> Result<BlockSize, LayoutError> {
        Ok(self.layout_text(text, fonts, options)?.block)
    }

    /// Draws `text` into this box on `target`.
    ///
    /// Boxes that do not shrink may spill outside their region; boxes that
    /// shrink fail with [`LayoutError::TextOverflow`] instead.
    pub fn render(
        &self,
        target: &mut RgbaImage,
        text: &str,
        fonts: &dyn FontSource,
        options: &RenderOptions,
    ) -> Result<RenderResult, LayoutError> {
        let laid_out = self.layout_text(text, fonts, options)?;
        let layer = raster::draw_block(
            &laid_out.lines,
            &laid_out.font,
            self.h_align,
            options.leading_offset,
        )?;
        let layer = raster::rotate(layer, self.rotation)?;
        let (layer_width, layer_height) = layer.dimensions();

        let region = self.region(options.scale);
        let anchor_point = self.anchor(options.scale);
        if layer_width > 0 && layer_height > 0 {
            let offset = anchor::paste_offset(
                anchor_point,
                layer_width,
                layer_height,
                self.h_align,
                self.v_align,
            );
            trace!(x = offset.0, y = offset.1, layer_width, layer_height, "paste text layer");
            raster::composite(target, &layer, offset, options.color);
        }
        if options.debug.is_enabled() {
            draw_debug_overlay(target, region, anchor_point, options.debug);
        }

        Ok(RenderResult {
            width: layer_width,
            height: layer_height,
            block: laid_out.block,
            font_size: laid_out.font.size(),
            line_count: laid_out.lines.len(),
        })
    }
}
