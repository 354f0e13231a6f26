use tracing::trace;

use super::error::preview;
use super::{BlockSize, LayoutError, measure_block, wrap_lines};
use crate::font::{FontRef, FontSource, ScaledFont};

pub struct FitRequest<'a> {
    pub text: &'a str,
    pub font: &'a FontRef,
    /// Largest point size to try.
    pub start_size: u32,
    /// Pixels per point.
    pub scale: f32,
    pub max_width: f32,
    pub max_height: f32,
    /// Line extent handed to the wrapper at every size.
    pub wrap_extent: f32,
    pub leading_offset: f32,
}

pub struct FittedText {
    pub point_size: u32,
    pub font: ScaledFont,
    pub lines: Vec<String>,
    pub block: BlockSize,
}

/// Largest point size in `1..=start_size` whose wrapped block fits the
/// target, searched downwards one point at a time.
pub fn shrink_to_fit(
    fonts: &dyn FontSource,
    request: &FitRequest<'_>,
) -> Result<FittedText, LayoutError> {
    for point_size in (1..=request.start_size).rev() {
        let font = fonts.font(request.font, point_size as f32 * request.scale)?;
        let lines = wrap_lines(request.text, request.wrap_extent, |line| font.measure(line));
        let block = measure_block(&lines, &font, request.leading_offset);
        trace!(
            point_size,
            width = block.width,
            height = block.height,
            "shrink candidate"
        );
        if block.fits(request.max_width, request.max_height) {
            return Ok(FittedText {
                point_size,
                font,
                lines,
                block,
            });
        }
    }
    Err(LayoutError::TextOverflow {
        preview: preview(request.text),
        width: request.max_width,
        height: request.max_height,
        start_size: request.start_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::BlockFonts;

    fn request<'a>(text: &'a str, font: &'a FontRef, width: f32, height: f32) -> FitRequest<'a> {
        FitRequest {
            text,
            font,
            start_size: 50,
            scale: 1.0,
            max_width: width,
            max_height: height,
            wrap_extent: width,
            leading_offset: 0.0,
        }
    }

    #[test]
    fn keeps_the_start_size_when_it_fits() {
        let font = FontRef::file("block");
        let fitted = shrink_to_fit(&BlockFonts, &request("Ki", &font, 500.0, 500.0)).expect("fit");
        assert_eq!(fitted.point_size, 50);
        assert_eq!(fitted.lines, vec!["Ki"]);
    }

    #[test]
    fn finds_the_largest_size_that_fits() {
        let font = FontRef::file("block");
        // "Patient Defense" is 15 chars at 0.6 em, so one line needs 9 px per point.
        let fitted = shrink_to_fit(&BlockFonts, &request("Patient Defense", &font, 180.0, 82.0))
            .expect("fit");
        assert!(fitted.point_size <= 50);
        assert!(fitted.block.fits(180.0, 82.0));

        let bigger = FitRequest {
            start_size: fitted.point_size + 1,
            ..request("Patient Defense", &font, 180.0, 82.0)
        };
        let again = shrink_to_fit(&BlockFonts, &bigger).expect("fit");
        assert_eq!(again.point_size, fitted.point_size);
    }

    #[test]
    fn wraps_at_each_candidate_size() {
        let font = FontRef::file("block");
        let fitted =
            shrink_to_fit(&BlockFonts, &request("aaaa bbbb cccc", &font, 100.0, 60.0)).expect("fit");
        assert_eq!(fitted.point_size, 20);
        assert_eq!(fitted.lines, vec!["aaaa", "bbbb", "cccc"]);
    }

    #[test]
    fn fails_when_nothing_fits() {
        let font = FontRef::file("block");
        let err = match shrink_to_fit(&BlockFonts, &request("Hello", &font, 1.0, 1.0)) {
            Ok(_) => panic!("expected overflow"),
            Err(err) => err,
        };
        assert!(err.is_overflow());
        assert!(err.to_string().contains("Hello"));
    }
}
