// THEORY:
// The `annotate` module is the Annotation Renderer: it paints the "answer"
// image. For every group it draws one ring around the minimum enclosing
// circle of ALL the group's contour points, then a white disc at the ring's
// center and the group's 1-based number inside that disc. An optional
// translucent wash over every mask pixel is applied first, so the rings and
// labels always sit on top of it.

use crate::core_modules::geometry::min_enclosing_circle;
use crate::core_modules::grouping::DifferenceGroup;
use crate::core_modules::label_font::LabelFont;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};
use tracing::debug;

/// Padding between the label text and the edge of its background disc.
const LABEL_PADDING: u32 = 5;
const LABEL_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_INK: Rgb<u8> = Rgb([0, 0, 0]);

/// How the answer image is decorated.
#[derive(Debug, Clone)]
pub struct AnnotationStyle {
    pub circle_color: Rgb<u8>,
    pub circle_thickness: u32,
    pub overlay_color: Rgb<u8>,
    /// `0` disables the overlay entirely.
    pub overlay_opacity: u8,
    pub font: LabelFont,
}

/// Blends `color` over every pixel where `mask` is non-zero, with weight `opacity / 255`.
pub fn blend_overlay(canvas: &mut RgbImage, mask: &GrayImage, color: Rgb<u8>, opacity: u8) {
    if opacity == 0 {
        return;
    }
    let alpha = opacity as f32 / 255.0;
    for (x, y, m) in mask.enumerate_pixels() {
        if m[0] == 0 || x >= canvas.width() || y >= canvas.height() {
            continue;
        }
        let pixel = canvas.get_pixel_mut(x, y);
        for (channel, tint) in pixel.0.iter_mut().zip(color.0) {
            let blended = tint as f32 * alpha + *channel as f32 * (1.0 - alpha);
            *channel = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Draws a ring of the given stroke thickness centred on `radius`.
pub fn draw_ring(canvas: &mut RgbImage, center: (i32, i32), radius: i32, thickness: u32, color: Rgb<u8>) {
    let thickness = thickness.max(1) as i32;
    let inner = radius - (thickness - 1) / 2;
    for r in inner..inner + thickness {
        if r >= 0 {
            draw_hollow_circle_mut(canvas, center, r, color);
        }
    }
}

/// Rings and numbers every group in emission order. Returns the number of circles drawn
/// (ring + label background per group).
pub fn annotate_groups(canvas: &mut RgbImage, groups: &[DifferenceGroup], style: &AnnotationStyle) -> usize {
    let mut circles_created = 0;
    for (index, group) in groups.iter().enumerate() {
        let Some(circle) = min_enclosing_circle(&group.points()) else {
            continue;
        };
        let center = (circle.center.0 as i32, circle.center.1 as i32);
        draw_ring(canvas, center, circle.radius as i32, style.circle_thickness, style.circle_color);
        circles_created += 1;

        let label = (index + 1).to_string();
        let (text_width, text_height) = style.font.text_size(&label);
        let background_radius = text_width.max(text_height) / 2 + LABEL_PADDING;
        draw_filled_circle_mut(canvas, center, background_radius as i32, LABEL_BACKGROUND);
        circles_created += 1;

        let origin = (
            (circle.center.0 - text_width as f64 / 2.0) as i32,
            (circle.center.1 + text_height as f64 / 2.0) as i32,
        );
        style.font.draw(canvas, &label, origin, LABEL_INK);

        debug!(
            label = index + 1,
            members = group.len(),
            area = group.total_area(),
            x = center.0,
            y = center.1,
            radius = circle.radius,
            "annotated difference"
        );
    }
    circles_created
}

/// Overlay (if enabled) followed by the rings and labels.
pub fn render_answer(canvas: &mut RgbImage, mask: &GrayImage, groups: &[DifferenceGroup], style: &AnnotationStyle) -> usize {
    blend_overlay(canvas, mask, style.overlay_color, style.overlay_opacity);
    annotate_groups(canvas, groups, style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::geometry::{BoundingBox, Contour};
    use crate::core_modules::region::DifferenceRegion;
    use imageproc::point::Point;

    fn style() -> AnnotationStyle {
        AnnotationStyle {
            circle_color: Rgb([255, 0, 0]),
            circle_thickness: 2,
            overlay_color: Rgb([0, 0, 255]),
            overlay_opacity: 0,
            font: LabelFont::embedded().unwrap(),
        }
    }

    fn group_around(points: Vec<Point<i32>>) -> DifferenceGroup {
        let contour = Contour::new(points);
        let bbox = contour.bounding_box();
        DifferenceGroup {
            regions: vec![DifferenceRegion {
                source_index: 0,
                center: bbox.center(),
                bbox,
                area: contour.area(),
                perimeter: contour.perimeter(),
                contour,
                intensity: 0.0,
                shape_complexity: 1.0,
                edge_density: 0.0,
                texture_signature: Vec::new(),
                texture_histogram: None,
            }],
        }
    }

    #[test]
    fn zero_opacity_leaves_canvas_untouched() {
        let mut canvas = RgbImage::from_pixel(10, 10, Rgb([10, 20, 30]));
        let before = canvas.clone();
        let mask = GrayImage::from_pixel(10, 10, image::Luma([255]));
        blend_overlay(&mut canvas, &mask, Rgb([255, 0, 0]), 0);
        assert_eq!(canvas, before);
    }

    #[test]
    fn overlay_only_touches_masked_pixels() {
        let mut canvas = RgbImage::from_pixel(4, 1, Rgb([0, 0, 0]));
        let mut mask = GrayImage::new(4, 1);
        mask.put_pixel(1, 0, image::Luma([255]));
        blend_overlay(&mut canvas, &mask, Rgb([255, 255, 255]), 255);
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(canvas.get_pixel(1, 0).0, [255, 255, 255]);

        let mut half = RgbImage::from_pixel(1, 1, Rgb([0, 100, 200]));
        let full = GrayImage::from_pixel(1, 1, image::Luma([1]));
        blend_overlay(&mut half, &full, Rgb([200, 100, 0]), 51);
        assert_eq!(half.get_pixel(0, 0).0, [40, 100, 160]);
    }

    #[test]
    fn each_group_gets_a_ring_and_a_label_disc() {
        let mut canvas = RgbImage::from_pixel(200, 100, Rgb([200, 200, 200]));
        let groups = vec![
            group_around(vec![Point::new(20, 20), Point::new(20, 60), Point::new(60, 60), Point::new(60, 20)]),
            group_around(vec![Point::new(120, 20), Point::new(120, 60), Point::new(160, 60), Point::new(160, 20)]),
        ];
        let circles = annotate_groups(&mut canvas, &groups, &style());
        assert_eq!(circles, 4);

        // Ring passes through the corners' circle: center (40, 40), radius ~28.
        assert!((66..=70).any(|x| canvas.get_pixel(x, 40).0 == [255, 0, 0]));
        // Label discs are white near their rim and carry black ink inside.
        assert_eq!(canvas.get_pixel(40 + 12, 40).0, [255, 255, 255]);
        let inked = |xs: std::ops::Range<u32>| (25..55).any(|y| xs.clone().any(|x| canvas.get_pixel(x, y).0.iter().all(|&c| c < 60)));
        assert!(inked(25..55));
        assert!(inked(125..155));
        assert_eq!(canvas.get_pixel(140 + 12, 40).0, [255, 255, 255]);
    }

    #[test]
    fn no_groups_draws_nothing() {
        let mut canvas = RgbImage::from_pixel(20, 20, Rgb([1, 2, 3]));
        let before = canvas.clone();
        let mask = GrayImage::new(20, 20);
        assert_eq!(render_answer(&mut canvas, &mask, &[], &style()), 0);
        assert_eq!(canvas, before);
    }
}
