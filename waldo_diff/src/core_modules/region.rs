// THEORY:
// The `region` module is the Region Analyzer. It turns each raw contour coming
// out of the raster stage into a `DifferenceRegion`: a "dumb" data container
// summarising the contour's geometry (box, center, area, irregularity), how
// strongly the two images disagree under it, and optionally what the original
// picture looks like there (edge density + texture fingerprint).
//
// Key architectural principles:
// 1.  **Stateless & Independent**: every region is a pure function of its own
//     contour and the two images. No region knows about any other, which makes
//     the per-contour analysis trivially parallel (see `parallel_pipeline`).
// 2.  **Clamped Crops**: a contour's box is intersected with both images before
//     any pixel is read. A box hanging off the edge yields the narrower crop;
//     one entirely outside yields an empty crop (intensity 0, no texture).
// 3.  **Degenerate Awareness**: a zero-area contour reports an infinite shape
//     complexity so no downstream comparison can mistake it for "close".

use crate::core_modules::geometry::{BoundingBox, Contour};
use crate::core_modules::texture::{self, TextureHistogram};
use image::{GrayImage, ImageBuffer, Pixel};

/// One physical cluster of differing pixels, before grouping.
#[derive(Debug, Clone)]
pub struct DifferenceRegion {
    /// Position of the source contour in the analyzer's input.
    pub source_index: usize,
    pub contour: Contour,
    pub bbox: BoundingBox,
    /// Center of `bbox`, truncating.
    pub center: (i32, i32),
    pub area: f64,
    pub perimeter: f64,
    /// Mean absolute per-channel difference inside the (clamped) box, roughly `0..=255`.
    pub intensity: f64,
    /// `perimeter² / (4π·area)`: 1.0 for a circle, larger when jagged or elongated,
    /// `+inf` when the area is zero.
    pub shape_complexity: f64,
    /// Mean Sobel magnitude of the original image under the box.
    pub edge_density: f64,
    pub texture_signature: Vec<u8>,
    /// Histogram of `texture_signature`, `None` when the signature is empty.
    pub texture_histogram: Option<TextureHistogram>,
}

pub fn shape_complexity(area: f64, perimeter: f64) -> f64 {
    if area > 0.0 {
        perimeter * perimeter / (4.0 * std::f64::consts::PI * area)
    } else {
        f64::INFINITY
    }
}

/// Builds the descriptor for a single contour.
pub fn analyze_region<P>(
    source_index: usize,
    contour: &Contour,
    original: &ImageBuffer<P, Vec<u8>>,
    modified: &ImageBuffer<P, Vec<u8>>,
) -> DifferenceRegion
where
    P: Pixel<Subpixel = u8>,
{
    let bbox = contour.bounding_box();
    let area = contour.area();
    let perimeter = contour.perimeter();

    let width = original.width().min(modified.width());
    let height = original.height().min(modified.height());
    let roi = bbox.clamp_to(width, height);

    let intensity = roi.map_or(0.0, |roi| mean_abs_difference(original, modified, &roi));
    let gray_roi = roi.map_or_else(|| GrayImage::new(0, 0), |roi| gray_crop(original, &roi));
    let texture_signature = texture::texture_signature(&gray_roi);

    DifferenceRegion {
        source_index,
        contour: contour.clone(),
        bbox,
        center: bbox.center(),
        area,
        perimeter,
        intensity,
        shape_complexity: shape_complexity(area, perimeter),
        edge_density: texture::edge_density(&gray_roi),
        texture_histogram: texture::histogram(&texture_signature),
        texture_signature,
    }
}

/// One region per contour, input order preserved.
pub fn analyze_regions<P>(
    contours: &[Contour],
    original: &ImageBuffer<P, Vec<u8>>,
    modified: &ImageBuffer<P, Vec<u8>>,
) -> Vec<DifferenceRegion>
where
    P: Pixel<Subpixel = u8>,
{
    contours
        .iter()
        .enumerate()
        .map(|(i, contour)| analyze_region(i, contour, original, modified))
        .collect()
}

fn mean_abs_difference<P>(a: &ImageBuffer<P, Vec<u8>>, b: &ImageBuffer<P, Vec<u8>>, roi: &BoundingBox) -> f64
where
    P: Pixel<Subpixel = u8>,
{
    let mut total = 0u64;
    let mut samples = 0u64;
    for y in roi.y as u32..roi.y as u32 + roi.height {
        for x in roi.x as u32..roi.x as u32 + roi.width {
            let pa = a.get_pixel(x, y);
            let pb = b.get_pixel(x, y);
            for (ca, cb) in pa.channels().iter().zip(pb.channels()) {
                total += ca.abs_diff(*cb) as u64;
                samples += 1;
            }
        }
    }
    if samples == 0 { 0.0 } else { total as f64 / samples as f64 }
}

fn gray_crop<P>(image: &ImageBuffer<P, Vec<u8>>, roi: &BoundingBox) -> GrayImage
where
    P: Pixel<Subpixel = u8>,
{
    GrayImage::from_fn(roi.width, roi.height, |x, y| {
        image.get_pixel(roi.x as u32 + x, roi.y as u32 + y).to_luma()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};
    use imageproc::point::Point;

    fn rect_contour(x: i32, y: i32, w: i32, h: i32) -> Contour {
        Contour::new(vec![
            Point::new(x, y),
            Point::new(x, y + h - 1),
            Point::new(x + w - 1, y + h - 1),
            Point::new(x + w - 1, y),
        ])
    }

    #[test]
    fn geometry_fields_follow_the_contour() {
        let a = GrayImage::new(50, 50);
        let region = analyze_region(3, &rect_contour(10, 10, 11, 11), &a, &a);
        assert_eq!(region.source_index, 3);
        assert_eq!(region.bbox, BoundingBox { x: 10, y: 10, width: 11, height: 11 });
        assert_eq!(region.center, (15, 15));
        assert!((region.area - 100.0).abs() < 1e-9);
        assert!((region.shape_complexity - 1600.0 / (400.0 * std::f64::consts::PI)).abs() < 1e-9);
    }

    #[test]
    fn intensity_is_mean_channel_difference() {
        let a = RgbImage::from_pixel(20, 20, Rgb([100, 100, 100]));
        let mut b = a.clone();
        for y in 0..10 {
            for x in 0..10 {
                b.put_pixel(x, y, Rgb([160, 100, 100]));
            }
        }
        let region = analyze_region(0, &rect_contour(0, 0, 10, 10), &a, &b);
        assert!((region.intensity - 20.0).abs() < 1e-9);
    }

    #[test]
    fn zero_area_contour_is_infinitely_complex() {
        let a = GrayImage::new(10, 10);
        let dot = Contour::new(vec![Point::new(4, 4)]);
        let region = analyze_region(0, &dot, &a, &a);
        assert_eq!(region.area, 0.0);
        assert!(region.shape_complexity.is_infinite());
    }

    #[test]
    fn box_outside_the_images_is_clamped() {
        let a = GrayImage::from_pixel(20, 20, Luma([0]));
        let b = GrayImage::from_pixel(20, 20, Luma([90]));

        let partial = analyze_region(0, &rect_contour(15, 15, 10, 10), &a, &b);
        assert!((partial.intensity - 90.0).abs() < 1e-9);
        assert_eq!(partial.texture_signature.len(), 25);

        let outside = analyze_region(1, &rect_contour(40, 40, 5, 5), &a, &b);
        assert_eq!(outside.intensity, 0.0);
        assert_eq!(outside.edge_density, 0.0);
        assert!(outside.texture_signature.is_empty());
        assert!(outside.texture_histogram.is_none());
    }

    #[test]
    fn analyze_regions_preserves_order() {
        let a = GrayImage::new(100, 100);
        let contours = vec![rect_contour(60, 60, 5, 5), rect_contour(0, 0, 20, 20), rect_contour(30, 0, 3, 3)];
        let regions = analyze_regions(&contours, &a, &a);
        let indices: Vec<usize> = regions.iter().map(|r| r.source_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(regions[1].contour, contours[1]);
    }
}
