// THEORY:
// The `texture` module gives a region a coarse "what does the underlying
// picture look like here" fingerprint, used by the textured similarity
// profile to tell apart two nearby differences that sit on different
// surfaces. Two lenses are provided:
// 1.  **Edge density**: the mean Sobel gradient magnitude over the region's
//     crop of the original image. Busy, detailed surfaces score high.
// 2.  **Texture signature**: a per-pixel code recording which of the four
//     orthogonal neighbours is brighter than the pixel itself. Codes live in
//     `0..16`, so a 16-bin histogram summarises a whole crop, and two crops
//     are compared by the correlation of their histograms.
//
// Like `SmartPixel`, this is purely comparative: a signature is meaningless on
// its own, its value is in `histogram_correlation` against another one.

use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

pub const TEXTURE_BINS: usize = 16;

pub type TextureHistogram = [f64; TEXTURE_BINS];

/// Mean gradient magnitude of the crop. `0.0` for an empty crop.
pub fn edge_density(roi: &GrayImage) -> f64 {
    let pixel_count = roi.width() as usize * roi.height() as usize;
    if pixel_count == 0 {
        return 0.0;
    }
    let gx = horizontal_sobel(roi);
    let gy = vertical_sobel(roi);
    let total: f64 = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(h, v)| {
            let (h, v) = (h[0] as f64, v[0] as f64);
            (h * h + v * v).sqrt()
        })
        .sum();
    total / pixel_count as f64
}

/// Row-major neighbour-comparison codes for every pixel of the crop.
///
/// Bit 0: pixel above is brighter, bit 1: below, bit 2: left, bit 3: right.
/// The one-pixel border has no full neighbourhood and keeps code 0.
pub fn texture_signature(roi: &GrayImage) -> Vec<u8> {
    let (width, height) = roi.dimensions();
    let mut codes = vec![0u8; width as usize * height as usize];
    if width < 3 || height < 3 {
        return codes;
    }
    let at = |x: u32, y: u32| roi.get_pixel(x, y)[0];
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = at(x, y);
            let mut code = 0u8;
            code |= (at(x, y - 1) > center) as u8;
            code |= ((at(x, y + 1) > center) as u8) << 1;
            code |= ((at(x - 1, y) > center) as u8) << 2;
            code |= ((at(x + 1, y) > center) as u8) << 3;
            codes[(y * width + x) as usize] = code;
        }
    }
    codes
}

/// Counts of each code. `None` for an empty signature.
pub fn histogram(signature: &[u8]) -> Option<TextureHistogram> {
    if signature.is_empty() {
        return None;
    }
    let mut bins = [0.0; TEXTURE_BINS];
    for &code in signature {
        if let Some(bin) = bins.get_mut(code as usize) {
            *bin += 1.0;
        }
    }
    Some(bins)
}

/// Pearson correlation of two histograms, in `[-1, 1]`.
///
/// Two flat histograms have nothing to correlate and count as identical (`1.0`);
/// a missing histogram never matches anything (`0.0`).
pub fn histogram_correlation(a: Option<&TextureHistogram>, b: Option<&TextureHistogram>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    let n = TEXTURE_BINS as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let (da, db) = (x - mean_a, y - mean_b);
        covariance += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denominator = var_a * var_b;
    if denominator.abs() <= f64::EPSILON {
        return 1.0;
    }
    covariance / denominator.sqrt()
}
