// THEORY:
// The `pipeline` module is the top-level API of the engine. It wires the
// stages together into one synchronous call:
//
//   decode -> normalise size -> raw difference mask -> region analysis ->
//   grouping -> answer rendering -> side-by-side composite -> encode
//
// Every call is independent: nothing survives from one pair of images to the
// next, so a single `DiffPipeline` can be shared freely (it only holds the
// validated settings and the per-stage options derived from them).

use crate::config::DiffSettings;
use crate::core_modules::annotate::{AnnotationStyle, render_answer};
use crate::core_modules::compositor::{LayoutOptions, compose};
use crate::core_modules::grouping::{DifferenceGroup, GroupingEngine, GroupingStats};
use crate::core_modules::raster::{self, DiffMask};
use crate::core_modules::region::{DifferenceRegion, analyze_region};
use crate::core_modules::similarity::SimilarityMode;
use crate::core_modules::utils::codec::{self, OutputFormat};
use crate::error::{ImageSlot, Result};
use image::{GrayImage, RgbImage};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::ops::Range;
use tracing::{debug, info};

/// Everything one diff operation produces.
#[derive(Debug, Clone)]
pub struct DiffReport {
    /// Original | separator | annotated answer.
    pub combined: RgbImage,
    /// The (possibly resized) modified image with overlay, rings and labels.
    pub answer: RgbImage,
    /// Number of groups, i.e. distinct differences.
    pub diff_count: usize,
    /// Rings plus label backgrounds drawn.
    pub circles_created: usize,
    pub groups: Vec<DifferenceGroup>,
    pub stats: GroupingStats,
}

/// A report with both images encoded to bytes.
///
/// Serialises as the web tool's JSON response: both images become
/// `data:<mime>;base64,...` strings and `format` is implied by their mime type.
#[derive(Debug, Clone)]
pub struct EncodedReport {
    pub format: OutputFormat,
    pub combined_image: Vec<u8>,
    pub answer_image: Vec<u8>,
    pub diff_count: usize,
    pub circles_created: usize,
}

impl Serialize for EncodedReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("EncodedReport", 4)?;
        state.serialize_field("combined_image", &codec::bytes_to_data_url(&self.combined_image, self.format))?;
        state.serialize_field("answer_image", &codec::bytes_to_data_url(&self.answer_image, self.format))?;
        state.serialize_field("diff_count", &self.diff_count)?;
        state.serialize_field("circles_created", &self.circles_created)?;
        state.end()
    }
}

/// A decoded, size-matched image pair and its raw difference mask.
#[derive(Debug, Clone)]
pub(crate) struct PreparedPair {
    pub original: RgbImage,
    pub modified: RgbImage,
    pub gray_original: GrayImage,
    pub gray_modified: GrayImage,
    pub diff: DiffMask,
}

impl PreparedPair {
    /// Analyzes the contours in `range`. The plain detector measures intensity on the
    /// grayscale pair, the textured one on the full-colour pair.
    pub fn analyze_range(&self, range: Range<usize>, mode: SimilarityMode) -> Vec<DifferenceRegion> {
        let contours = &self.diff.contours[range.clone()];
        match mode {
            SimilarityMode::Basic => contours
                .iter()
                .zip(range)
                .map(|(c, i)| analyze_region(i, c, &self.gray_original, &self.gray_modified))
                .collect(),
            SimilarityMode::Textured => contours
                .iter()
                .zip(range)
                .map(|(c, i)| analyze_region(i, c, &self.original, &self.modified))
                .collect(),
        }
    }

    pub fn contour_count(&self) -> usize {
        self.diff.contours.len()
    }
}

/// The synchronous spot-the-difference engine.
#[derive(Debug, Clone)]
pub struct DiffPipeline {
    settings: DiffSettings,
    engine: GroupingEngine,
    style: AnnotationStyle,
    layout: LayoutOptions,
}

impl DiffPipeline {
    pub fn new(settings: DiffSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            engine: GroupingEngine::new(settings.touch_distance, settings.similarity_profile()),
            style: settings.annotation_style()?,
            layout: settings.layout_options()?,
            settings,
        })
    }

    pub fn settings(&self) -> &DiffSettings {
        &self.settings
    }

    pub fn grouping_engine(&self) -> &GroupingEngine {
        &self.engine
    }

    /// Stage 1: size normalisation and the raw difference mask.
    pub(crate) fn prepare(&self, original: &RgbImage, modified: &RgbImage) -> PreparedPair {
        let modified = if original.dimensions() != modified.dimensions() {
            debug!(
                from = ?modified.dimensions(),
                to = ?original.dimensions(),
                "resizing modified image to match original"
            );
            codec::resize_to_match(modified, original.dimensions())
        } else {
            modified.clone()
        };
        let gray_original = raster::grayscale(original);
        let gray_modified = raster::grayscale(&modified);
        let diff = raster::difference_mask(&gray_original, &gray_modified, &self.settings.mask_options());

        PreparedPair {
            original: original.clone(),
            modified,
            gray_original,
            gray_modified,
            diff,
        }
    }

    /// Stages 3-5: grouping, answer rendering and compositing.
    pub(crate) fn finish(&self, prepared: PreparedPair, regions: Vec<DifferenceRegion>) -> DiffReport {
        let (groups, stats) = self.engine.group(regions);

        let mut answer = prepared.modified;
        let circles_created = render_answer(&mut answer, &prepared.diff.mask, &groups, &self.style);
        let combined = compose(&prepared.original, &answer, &self.layout);

        info!(
            differences = groups.len(),
            circles = circles_created,
            capped = stats.capped_expansions,
            "diff complete"
        );
        DiffReport {
            combined,
            answer,
            diff_count: groups.len(),
            circles_created,
            groups,
            stats,
        }
    }

    /// Runs the whole engine on two decoded images.
    pub fn process_images(&self, original: &RgbImage, modified: &RgbImage) -> DiffReport {
        let prepared = self.prepare(original, modified);
        let regions = prepared.analyze_range(0..prepared.contour_count(), self.settings.similarity);
        self.finish(prepared, regions)
    }

    /// Decodes both inputs, runs the engine and encodes both outputs.
    pub fn process_bytes(&self, original: &[u8], modified: &[u8], format: OutputFormat) -> Result<EncodedReport> {
        let original = codec::decode(original, ImageSlot::Original)?;
        let modified = codec::decode(modified, ImageSlot::Modified)?;
        let report = self.process_images(&original, &modified);
        encode_report(&report, format)
    }

    /// The web endpoint: two data URLs in, a JPEG report out (serialise it for the response body).
    pub fn process_data_urls(&self, original: &str, modified: &str) -> Result<EncodedReport> {
        let original = codec::decode_data_url(original, ImageSlot::Original)?;
        let modified = codec::decode_data_url(modified, ImageSlot::Modified)?;
        let report = self.process_images(&original, &modified);
        encode_report(&report, OutputFormat::Jpeg)
    }
}

pub fn encode_report(report: &DiffReport, format: OutputFormat) -> Result<EncodedReport> {
    Ok(EncodedReport {
        format,
        combined_image: codec::encode(&report.combined, format)?,
        answer_image: codec::encode(&report.answer, format)?,
        diff_count: report.diff_count,
        circles_created: report.circles_created,
    })
}
