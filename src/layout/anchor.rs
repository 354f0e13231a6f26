use super::{HAlign, VAlign};

/// Reference point of a region for the given alignment.
pub fn resolve_anchor(
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    h_align: HAlign,
    v_align: VAlign,
) -> (i32, i32) {
    let anchor_x = match h_align {
        HAlign::Left => x,
        HAlign::Center => x + width / 2,
        HAlign::Right => x + width,
    };
    let anchor_y = match v_align {
        VAlign::Top => y,
        VAlign::Center => y + height / 2,
        VAlign::Bottom => y + height,
    };
    (anchor_x, anchor_y)
}

/// Top-left corner that puts the matching edge or centre of a
/// `width × height` layer on `anchor`.
pub(super) fn paste_offset(
    anchor: (i32, i32),
    width: u32,
    height: u32,
    h_align: HAlign,
    v_align: VAlign,
) -> (i64, i64) {
    let (anchor_x, anchor_y) = (anchor.0 as i64, anchor.1 as i64);
    let (width, height) = (width as i64, height as i64);
    let x = match h_align {
        HAlign::Left => anchor_x,
        HAlign::Center => anchor_x - width / 2,
        HAlign::Right => anchor_x - width,
    };
    let y = match v_align {
        VAlign::Top => anchor_y,
        VAlign::Center => anchor_y - height / 2,
        VAlign::Bottom => anchor_y - height,
    };
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_corners_and_centre() {
        let anchor = |h, v| resolve_anchor(10, 20, 100, 50, h, v);
        assert_eq!(anchor(HAlign::Left, VAlign::Top), (10, 20));
        assert_eq!(anchor(HAlign::Center, VAlign::Center), (60, 45));
        assert_eq!(anchor(HAlign::Right, VAlign::Bottom), (110, 70));
        assert_eq!(anchor(HAlign::Right, VAlign::Top), (110, 20));
    }

    #[test]
    fn centre_uses_integer_halves() {
        assert_eq!(
            resolve_anchor(0, 0, 101, 51, HAlign::Center, VAlign::Center),
            (50, 25)
        );
    }

    #[test]
    fn paste_offset_aligns_the_matching_edge() {
        let anchor = (200, 120);
        assert_eq!(
            paste_offset(anchor, 132, 20, HAlign::Center, VAlign::Center),
            (134, 110)
        );
        assert_eq!(
            paste_offset(anchor, 132, 20, HAlign::Left, VAlign::Top),
            (200, 120)
        );
        assert_eq!(
            paste_offset(anchor, 132, 20, HAlign::Right, VAlign::Bottom),
            (68, 100)
        );
    }
}
