// THEORY:
// The `raster` module is the first stage of the engine: it turns a pair of
// same-sized colour images into a binary "where do they disagree" mask and the
// outer contours of the blobs in that mask. It plays the role the
// `GridManager` plays for a video stream, i.e. it is an orchestrator of
// low-level primitives (all supplied by `image`/`imageproc`) rather than an
// analyzer itself.
//
// Steps:
// 1.  Grayscale both images and take the per-pixel absolute difference.
// 2.  Blur with the 3x3 binomial kernel ([1,2,1] outer [1,2,1] / 16) to knock
//     out sensor noise and JPEG ringing.
// 3.  Binarize: anything strictly above `threshold` is a difference pixel.
// 4.  Dilate with a 5x5 square, `dilation_iter` times, so fragments of one
//     edit fuse into fewer blobs.
// 5.  Trace the outer borders of the blobs and drop those smaller than
//     `min_area`.

use crate::core_modules::geometry::Contour;
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use tracing::debug;

/// Separable [1, 2, 1] / 4 in both directions.
#[rustfmt::skip]
const BLUR_KERNEL: [f32; 9] = [
    1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0,
    2.0 / 16.0, 4.0 / 16.0, 2.0 / 16.0,
    1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0,
];
/// Half the side of the square structuring element (5x5).
const DILATION_RADIUS: u32 = 2;

/// Parameters of the raw-difference stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskOptions {
    pub threshold: u8,
    pub dilation_iter: u32,
    pub min_area: f64,
}

/// The binary difference mask and the contours that survived the area filter.
#[derive(Debug, Clone)]
pub struct DiffMask {
    pub mask: GrayImage,
    pub contours: Vec<Contour>,
}

impl DiffMask {
    pub fn is_clean(&self) -> bool {
        self.contours.is_empty()
    }
}

pub fn grayscale(image: &RgbImage) -> GrayImage {
    image::imageops::grayscale(image)
}

/// Per-pixel `|a - b|`. Both images must have the same dimensions.
pub fn abs_diff(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0].abs_diff(b.get_pixel(x, y)[0])])
    })
}

/// Pixels strictly above `threshold` become 255, everything else 0.
pub fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    let mut binary = image.clone();
    for p in binary.pixels_mut() {
        *p = if p[0] > threshold { Luma([255]) } else { Luma([0]) };
    }
    binary
}

/// `iterations` passes of a 5x5 square dilation, done as one L∞ dilation of the combined radius.
pub fn dilate_square(binary: &GrayImage, iterations: u32) -> GrayImage {
    if iterations == 0 {
        return binary.clone();
    }
    let radius = (DILATION_RADIUS * iterations).min(u8::MAX as u32) as u8;
    imageproc::morphology::dilate(binary, Norm::LInf, radius)
}

/// 3x3 Gaussian blur; edge pixels are replicated.
pub fn blur3x3(image: &GrayImage) -> GrayImage {
    imageproc::filter::filter3x3::<_, f32, u8>(image, &BLUR_KERNEL)
}

/// Outer borders of the top-level blobs only; holes and nested blobs are ignored.
pub fn external_contours(binary: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect()
}

/// Runs the whole raw-difference stage on two same-sized grayscale images.
pub fn difference_mask(gray_original: &GrayImage, gray_modified: &GrayImage, options: &MaskOptions) -> DiffMask {
    let diff = abs_diff(gray_original, gray_modified);
    let blurred = blur3x3(&diff);
    let binary = binarize(&blurred, options.threshold);
    let mask = dilate_square(&binary, options.dilation_iter);

    let raw = external_contours(&mask);
    let raw_count = raw.len();
    let contours: Vec<Contour> = raw.into_iter().filter(|c| c.area() >= options.min_area).collect();

    debug!(
        raw_contours = raw_count,
        kept_contours = contours.len(),
        min_area = options.min_area,
        "difference mask computed"
    );
    DiffMask { mask, contours }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> MaskOptions {
        MaskOptions {
            threshold: 30,
            dilation_iter: 0,
            min_area: 1.0,
        }
    }

    fn with_block(base: &GrayImage, x0: u32, y0: u32, side: u32, value: u8) -> GrayImage {
        let mut img = base.clone();
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                img.put_pixel(x, y, Luma([value]));
            }
        }
        img
    }

    #[test]
    fn identical_images_give_a_clean_mask() {
        let a = GrayImage::from_fn(64, 64, |x, y| Luma([((x * 3 + y * 5) % 256) as u8]));
        let result = difference_mask(&a, &a, &options());
        assert!(result.is_clean());
        assert!(result.mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn binarize_is_strictly_greater_than() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[29, 30, 31][x as usize]]));
        let out = binarize(&img, 30);
        assert_eq!(out.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn blur_spreads_a_step_by_exactly_one_pixel() {
        let img = GrayImage::from_fn(7, 3, |x, _| Luma([if x >= 3 { 160 } else { 0 }]));
        let row: Vec<u8> = (0..7).map(|x| blur3x3(&img).get_pixel(x, 1)[0]).collect();
        assert_eq!(row, vec![0, 0, 40, 120, 160, 160, 160]);

        let flat = GrayImage::from_pixel(5, 5, Luma([77]));
        assert_eq!(blur3x3(&flat), flat);
    }

    #[test]
    fn dilation_grows_by_two_pixels_per_iteration() {
        let mut img = GrayImage::new(21, 21);
        img.put_pixel(10, 10, Luma([255]));
        let once = dilate_square(&img, 1);
        assert_eq!(once.pixels().filter(|p| p[0] == 255).count(), 25);
        let twice = dilate_square(&img, 2);
        assert_eq!(twice.pixels().filter(|p| p[0] == 255).count(), 81);
        assert_eq!(dilate_square(&img, 0), img);
    }

    #[test]
    fn two_separate_blocks_give_two_contours() {
        let a = GrayImage::from_pixel(200, 100, Luma([20]));
        let b = with_block(&with_block(&a, 20, 20, 10, 220), 150, 60, 10, 220);
        let result = difference_mask(&a, &b, &options());
        assert_eq!(result.contours.len(), 2);
    }

    #[test]
    fn small_blobs_are_dropped_by_min_area() {
        let a = GrayImage::from_pixel(100, 100, Luma([0]));
        let b = with_block(&with_block(&a, 10, 10, 20, 255), 70, 70, 4, 255);
        let mut opts = options();
        opts.min_area = 100.0;
        let result = difference_mask(&a, &b, &opts);
        assert_eq!(result.contours.len(), 1);
        assert!(result.contours[0].area() >= 100.0);
    }

    #[test]
    fn nested_blobs_only_report_the_outer_border() {
        // A ring with a dot inside its hole.
        let mut mask = GrayImage::new(40, 40);
        for y in 5..35 {
            for x in 5..35 {
                let on_ring = !(10..30).contains(&x) || !(10..30).contains(&y);
                if on_ring {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
        mask.put_pixel(20, 20, Luma([255]));
        assert_eq!(external_contours(&mask).len(), 1);
    }
}
