// THEORY:
// `should_group` is the single question the Grouping Engine keeps asking:
// "do these two regions look like parts of the same visual change?". Two
// independent rules can say yes:
// 1.  **Proximity**: the centers are within the touch distance and the two
//     regions are of comparable size and comparable difference strength.
// 2.  **Alignment**: the centers are close relative to the regions' own size
//     and lie roughly along a horizontal or vertical axis, as pieces of a
//     broken-up edit (a stripe, a row of dots) usually do.
//
// Which extra sub-checks each rule applies is carried by a `SimilarityProfile`
// so the plain detector and the texture-aware detector share one engine.
// Every quantity the predicate compares is symmetric in its two arguments, and
// every ratio is guarded so zero-area regions are simply "not similar".

use crate::core_modules::region::DifferenceRegion;
use crate::core_modules::texture::histogram_correlation;
use serde::{Deserialize, Serialize};

pub const MAX_SIZE_RATIO: f64 = 3.0;
pub const MAX_INTENSITY_DELTA: f64 = 30.0;
pub const MAX_COMPLEXITY_DELTA: f64 = 1.0;
pub const MAX_EDGE_DENSITY_DELTA: f64 = 0.3;
pub const MAX_RELATIVE_DISTANCE: f64 = 2.0;
pub const MIN_TEXTURE_CORRELATION: f64 = 0.7;

/// Which sub-checks the two grouping rules apply on top of their core tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarityProfile {
    /// Proximity additionally requires similar shape complexity.
    pub proximity_complexity: bool,
    /// Proximity additionally requires similar edge density.
    pub proximity_edges: bool,
    /// Alignment requires similar shape complexity.
    pub alignment_complexity: bool,
    /// Alignment requires correlated texture histograms.
    pub alignment_texture: bool,
}

impl SimilarityProfile {
    /// Distance, size and intensity only; alignment checks shape complexity.
    pub const fn basic() -> Self {
        Self {
            proximity_complexity: false,
            proximity_edges: false,
            alignment_complexity: true,
            alignment_texture: false,
        }
    }

    /// Every sub-check enabled.
    pub const fn textured() -> Self {
        Self {
            proximity_complexity: true,
            proximity_edges: true,
            alignment_complexity: true,
            alignment_texture: true,
        }
    }
}

/// Named profiles, as accepted in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMode {
    Basic,
    #[default]
    Textured,
}

impl From<SimilarityMode> for SimilarityProfile {
    fn from(mode: SimilarityMode) -> Self {
        match mode {
            SimilarityMode::Basic => SimilarityProfile::basic(),
            SimilarityMode::Textured => SimilarityProfile::textured(),
        }
    }
}

impl std::str::FromStr for SimilarityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(SimilarityMode::Basic),
            "textured" => Ok(SimilarityMode::Textured),
            other => Err(format!("unknown similarity mode `{other}` (expected `basic` or `textured`)")),
        }
    }
}

fn center_distance(a: &DifferenceRegion, b: &DifferenceRegion) -> f64 {
    let dx = (b.center.0 - a.center.0) as f64;
    let dy = (b.center.1 - a.center.1) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// True when the direction from `a` to `b` lies strictly within 45° of 0°, 90°, 180° or 270°.
///
/// With integer centers that is exactly "the offset is not a perfect diagonal",
/// which reads the same from either region. Coincident centers count as aligned.
pub fn centers_axis_aligned(a: &DifferenceRegion, b: &DifferenceRegion) -> bool {
    let dx = (b.center.0 - a.center.0).unsigned_abs();
    let dy = (b.center.1 - a.center.1).unsigned_abs();
    (dx == 0 && dy == 0) || dx != dy
}

fn similar_complexity(a: &DifferenceRegion, b: &DifferenceRegion) -> bool {
    a.shape_complexity.is_finite()
        && b.shape_complexity.is_finite()
        && (a.shape_complexity - b.shape_complexity).abs() < MAX_COMPLEXITY_DELTA
}

fn proximity_rule(a: &DifferenceRegion, b: &DifferenceRegion, touch_distance: f64, profile: &SimilarityProfile) -> bool {
    // Size ratio is undefined for an empty region.
    if a.area <= 0.0 || b.area <= 0.0 {
        return false;
    }
    let is_close = center_distance(a, b) <= touch_distance;
    let size_ratio = a.area.max(b.area) / a.area.min(b.area);
    let similar_intensity = (a.intensity - b.intensity).abs() < MAX_INTENSITY_DELTA;

    if !(is_close && size_ratio < MAX_SIZE_RATIO && similar_intensity) {
        return false;
    }
    if profile.proximity_complexity && !similar_complexity(a, b) {
        return false;
    }
    if profile.proximity_edges && (a.edge_density - b.edge_density).abs() >= MAX_EDGE_DENSITY_DELTA {
        return false;
    }
    true
}

fn alignment_rule(a: &DifferenceRegion, b: &DifferenceRegion, profile: &SimilarityProfile) -> bool {
    let average_area = (a.area + b.area) / 2.0;
    if average_area <= 0.0 {
        return false;
    }
    let relative_distance = center_distance(a, b) / average_area.sqrt();
    if relative_distance >= MAX_RELATIVE_DISTANCE || !centers_axis_aligned(a, b) {
        return false;
    }
    if profile.alignment_complexity && !similar_complexity(a, b) {
        return false;
    }
    if profile.alignment_texture
        && histogram_correlation(a.texture_histogram.as_ref(), b.texture_histogram.as_ref()) <= MIN_TEXTURE_CORRELATION
    {
        return false;
    }
    true
}

/// Whether `a` and `b` belong to the same logical difference. Symmetric in `a` and `b`.
pub fn should_group(a: &DifferenceRegion, b: &DifferenceRegion, touch_distance: f64, profile: &SimilarityProfile) -> bool {
    proximity_rule(a, b, touch_distance, profile) || alignment_rule(a, b, profile)
}
