// THEORY:
// The `compositor` lays the puzzle out side by side: original on the left, a
// solid separator bar with equal spacing on both sides, annotated image on
// the right. The canvas is as tall as the taller input and starts out white,
// so any area not covered by an image stays white. The bar runs the full
// canvas height.

use image::{Rgb, RgbImage, imageops};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Gap on each side of the separator.
    pub spacing: u32,
    pub separator_thickness: u32,
    pub separator_color: Rgb<u8>,
}

impl LayoutOptions {
    /// Horizontal space between the two images.
    pub fn gutter(&self) -> u32 {
        self.spacing * 2 + self.separator_thickness
    }
}

pub fn compose(left: &RgbImage, right: &RgbImage, layout: &LayoutOptions) -> RgbImage {
    let width = left.width() + layout.gutter() + right.width();
    let height = left.height().max(right.height());
    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

    imageops::replace(&mut canvas, left, 0, 0);

    let separator_start = left.width() + layout.spacing;
    for x in separator_start..separator_start + layout.separator_thickness {
        for y in 0..height {
            canvas.put_pixel(x, y, layout.separator_color);
        }
    }

    let right_start = separator_start + layout.separator_thickness + layout.spacing;
    imageops::replace(&mut canvas, right, right_start as i64, 0);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> LayoutOptions {
        LayoutOptions {
            spacing: 10,
            separator_thickness: 2,
            separator_color: Rgb([135, 206, 235]),
        }
    }

    #[test]
    fn canvas_dimensions_follow_inputs() {
        let left = RgbImage::from_pixel(30, 20, Rgb([1, 1, 1]));
        let right = RgbImage::from_pixel(40, 50, Rgb([2, 2, 2]));
        let combined = compose(&left, &right, &layout());
        assert_eq!(combined.dimensions(), (30 + 22 + 40, 50));
    }

    #[test]
    fn images_separator_and_padding_land_in_place() {
        let left = RgbImage::from_pixel(30, 20, Rgb([1, 1, 1]));
        let right = RgbImage::from_pixel(40, 50, Rgb([2, 2, 2]));
        let combined = compose(&left, &right, &layout());

        assert_eq!(combined.get_pixel(0, 0).0, [1, 1, 1]);
        assert_eq!(combined.get_pixel(29, 19).0, [1, 1, 1]);
        // Below the shorter left image.
        assert_eq!(combined.get_pixel(10, 30).0, [255, 255, 255]);
        // Spacing, then the bar over the whole height.
        assert_eq!(combined.get_pixel(35, 5).0, [255, 255, 255]);
        assert_eq!(combined.get_pixel(40, 0).0, [135, 206, 235]);
        assert_eq!(combined.get_pixel(41, 49).0, [135, 206, 235]);
        assert_eq!(combined.get_pixel(45, 5).0, [255, 255, 255]);
        assert_eq!(combined.get_pixel(52, 0).0, [2, 2, 2]);
        assert_eq!(combined.get_pixel(91, 49).0, [2, 2, 2]);
    }

    #[test]
    fn zero_spacing_and_thickness_butt_images_together() {
        let left = RgbImage::from_pixel(3, 3, Rgb([9, 9, 9]));
        let right = RgbImage::from_pixel(3, 3, Rgb([7, 7, 7]));
        let flush = LayoutOptions { spacing: 0, separator_thickness: 0, ..layout() };
        let combined = compose(&left, &right, &flush);
        assert_eq!(combined.dimensions(), (6, 3));
        assert_eq!(combined.get_pixel(2, 0).0, [9, 9, 9]);
        assert_eq!(combined.get_pixel(3, 0).0, [7, 7, 7]);
    }
}
