// THEORY:
// Group labels are rendered with an embedded TrueType face (DejaVu Sans Bold)
// through `ab_glyph` and `imageproc`'s text drawing. Placement follows the
// `putText` convention the annotation layer is written against: the origin is
// the bottom-left corner of the text, i.e. a point on the baseline, and the
// reported size is the inked extent of the string, not the full line box.

use crate::error::Result;
use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans-Bold.ttf");

/// Pixel height of the face; puts digits at roughly 16x17 px, the size of a
/// 0.8-scale Hershey label.
pub const LABEL_PX_HEIGHT: f32 = 26.0;

#[derive(Debug, Clone)]
pub struct LabelFont {
    font: FontRef<'static>,
    scale: PxScale,
}

impl LabelFont {
    pub fn new(px_height: f32) -> Result<Self> {
        Ok(Self {
            font: FontRef::try_from_slice(FONT_DATA)?,
            scale: PxScale::from(px_height),
        })
    }

    /// The face at the default label size.
    pub fn embedded() -> Result<Self> {
        Self::new(LABEL_PX_HEIGHT)
    }

    /// `(width, height)` of `text` in pixels.
    pub fn text_size(&self, text: &str) -> (u32, u32) {
        text_size(self.scale, &self.font, text)
    }

    /// Draws `text` with its baseline starting at `origin`.
    pub fn draw(&self, canvas: &mut RgbImage, text: &str, origin: (i32, i32), color: Rgb<u8>) {
        let ascent = self.font.as_scaled(self.scale).ascent();
        let top = origin.1 - ascent.round() as i32;
        draw_text_mut(canvas, color, origin.0, top, self.scale, &self.font, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dark(p: &Rgb<u8>) -> bool {
        p.0.iter().all(|&c| c < 100)
    }

    #[test]
    fn wider_labels_measure_wider() {
        let font = LabelFont::embedded().unwrap();
        let (w1, h1) = font.text_size("7");
        let (w2, h2) = font.text_size("12");
        assert!(w1 > 0 && h1 > 0);
        assert!(w2 > w1);
        assert!((10..=24).contains(&h1), "digit height {h1}");
        assert!(h2.abs_diff(h1) <= 2);
        assert_eq!(font.text_size(""), (0, 0));
    }

    #[test]
    fn ink_sits_on_the_baseline_inside_the_text_box() {
        let font = LabelFont::embedded().unwrap();
        let mut canvas = RgbImage::from_pixel(80, 60, Rgb([255, 255, 255]));
        let (w, h) = font.text_size("10");
        let origin = (10, 40);
        font.draw(&mut canvas, "10", origin, Rgb([0, 0, 0]));

        let mut inked = 0;
        for (x, y, p) in canvas.enumerate_pixels() {
            if dark(p) {
                inked += 1;
                assert!(x as i32 >= origin.0 - 2 && x as i32 <= origin.0 + w as i32 + 2, "x {x}");
                assert!(y as i32 >= origin.1 - h as i32 - 2 && y as i32 <= origin.1 + 2, "y {y}");
            }
        }
        assert!(inked > 0);
    }

    #[test]
    fn every_digit_draws_something() {
        let font = LabelFont::embedded().unwrap();
        for d in 0..10 {
            let mut canvas = RgbImage::new(40, 40);
            font.draw(&mut canvas, &d.to_string(), (8, 30), Rgb([255, 0, 0]));
            assert!(canvas.pixels().any(|p| p.0[0] > 200), "digit {d} left no ink");
        }
    }
}
