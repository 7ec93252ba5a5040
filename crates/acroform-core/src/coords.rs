//! Coordinate transformation between rendered page images and PDF space
//!
//! Page images are rasterized at a zoom factor with the origin at the top
//! left; PDF user space is unscaled with the origin at the bottom left.

use serde::{Deserialize, Serialize};

/// Zoom the designer renders page images at
pub const DEFAULT_RENDER_ZOOM: f64 = 2.0;

/// Rectangle in PDF user space; (x, y) is the bottom-left corner
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PdfRect {
    /// As a PDF `/Rect` array: [llx lly urx ury]
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }
}

/// Page box as `[x, y, width, height]`: the lower-left origin and the size
pub type MediaBox = [f64; 4];

/// Convert a pixel position on a rendered page into a PDF rectangle
///
/// `px`/`py` are the top-left corner of the region in image pixels; the
/// region's width and height are already in document units. The image shows
/// the page's media box, so its origin offsets the result.
pub fn pixel_to_pdf(
    px: f64,
    py: f64,
    width: f64,
    height: f64,
    media_box: MediaBox,
    zoom: f64,
) -> PdfRect {
    let [mb_x, mb_y, _, mb_height] = media_box;
    let page_x = px / zoom;
    let page_y = py / zoom;

    PdfRect {
        x: mb_x + page_x,
        y: mb_y + mb_height - page_y - height,
        width,
        height,
    }
}

/// Convert a PDF rectangle back to the pixel position of its top-left corner
pub fn pdf_to_pixel(rect: &PdfRect, media_box: MediaBox, zoom: f64) -> (f64, f64) {
    let [mb_x, mb_y, _, mb_height] = media_box;
    let page_y = mb_height - (rect.y - mb_y) - rect.height;
    ((rect.x - mb_x) * zoom, page_y * zoom)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..2000.0
    }

    fn zoom() -> impl Strategy<Value = f64> {
        0.25f64..8.0
    }

    proptest! {
        /// Property: pixel→PDF→pixel returns the original position
        #[test]
        fn roundtrip_pixel_pdf_pixel(
            page_h in dimension(),
            px in 0.0f64..4000.0,
            py in 0.0f64..4000.0,
            w in dimension(),
            h in dimension(),
            z in zoom(),
            mb_x in -500.0f64..500.0,
            mb_y in -500.0f64..500.0,
        ) {
            let media_box = [mb_x, mb_y, 600.0, page_h];
            let rect = pixel_to_pdf(px, py, w, h, media_box, z);
            let (back_x, back_y) = pdf_to_pixel(&rect, media_box, z);

            let tolerance = 1e-6;
            prop_assert!((back_x - px).abs() < tolerance, "X: {} vs {}", back_x, px);
            prop_assert!((back_y - py).abs() < tolerance, "Y: {} vs {}", back_y, py);
        }

        /// Property: the rectangle's lower edge sits at H - py/z - h
        #[test]
        fn lower_edge_formula(
            page_h in dimension(),
            py in 0.0f64..4000.0,
            h in dimension(),
            z in zoom(),
        ) {
            let rect = pixel_to_pdf(0.0, py, 10.0, h, [0.0, 0.0, 600.0, page_h], z);
            prop_assert!((rect.y - (page_h - py / z - h)).abs() < 1e-9);
            prop_assert!((rect.to_array()[3] - rect.y - h).abs() < 1e-9);
        }

        /// Property: moving down in the image moves down on the page
        #[test]
        fn y_is_monotonic_decreasing(
            page_h in dimension(),
            py in 0.0f64..2000.0,
            delta in 1.0f64..500.0,
            z in zoom(),
        ) {
            let upper = pixel_to_pdf(0.0, py, 10.0, 10.0, [0.0, 0.0, 600.0, page_h], z);
            let lower = pixel_to_pdf(0.0, py + delta, 10.0, 10.0, [0.0, 0.0, 600.0, page_h], z);
            prop_assert!(lower.y < upper.y);
        }
    }
}
