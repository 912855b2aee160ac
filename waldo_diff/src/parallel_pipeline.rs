// THEORY:
// The `parallel_pipeline` runs the same engine as `DiffPipeline` on a tokio
// runtime. Only the region analysis is split up: every contour is analyzed
// independently, so the contour list is cut into one contiguous range per
// worker and each range runs on the blocking pool. Ranges are joined back in
// order, so the regions (and therefore the groups and the rendered pixels)
// are exactly what the sequential pipeline would produce. Grouping stays on a
// single task: each expansion step depends on the group built so far.

use crate::config::DiffSettings;
use crate::core_modules::utils::codec::{self, OutputFormat};
use crate::error::{DiffError, ImageSlot, Result};
use crate::pipeline::{DiffPipeline, DiffReport, EncodedReport, encode_report};
use futures::future::try_join_all;
use image::RgbImage;
use std::ops::Range;
use std::sync::Arc;
use tokio::task::{JoinError, spawn_blocking};
use tracing::debug;

fn worker_error(err: JoinError) -> DiffError {
    DiffError::Worker(err.to_string())
}

/// Splits `0..len` into at most `workers` contiguous, non-empty ranges.
pub fn chunk_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let chunk = len.div_ceil(workers.max(1));
    (0..len).step_by(chunk).map(|start| start..(start + chunk).min(len)).collect()
}

pub struct ParallelDiffPipeline {
    pipeline: Arc<DiffPipeline>,
    workers: usize,
}

impl ParallelDiffPipeline {
    /// One analysis worker per logical CPU.
    pub fn new(settings: DiffSettings) -> Result<Self> {
        Self::with_workers(settings, num_cpus::get())
    }

    pub fn with_workers(settings: DiffSettings, workers: usize) -> Result<Self> {
        Ok(Self {
            pipeline: Arc::new(DiffPipeline::new(settings)?),
            workers: workers.max(1),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn settings(&self) -> &DiffSettings {
        self.pipeline.settings()
    }

    pub async fn process_images(&self, original: RgbImage, modified: RgbImage) -> Result<DiffReport> {
        let pipeline = Arc::clone(&self.pipeline);
        let prepared = spawn_blocking(move || pipeline.prepare(&original, &modified))
            .await
            .map_err(worker_error)?;

        let prepared = Arc::new(prepared);
        let mode = self.pipeline.settings().similarity;
        let ranges = chunk_ranges(prepared.contour_count(), self.workers);
        debug!(contours = prepared.contour_count(), tasks = ranges.len(), "dispatching region analysis");

        let tasks = ranges.into_iter().map(|range| {
            let prepared = Arc::clone(&prepared);
            spawn_blocking(move || prepared.analyze_range(range, mode))
        });
        let chunks = try_join_all(tasks).await.map_err(worker_error)?;
        let regions: Vec<_> = chunks.into_iter().flatten().collect();

        let prepared = Arc::try_unwrap(prepared).unwrap_or_else(|shared| (*shared).clone());
        let pipeline = Arc::clone(&self.pipeline);
        spawn_blocking(move || pipeline.finish(prepared, regions))
            .await
            .map_err(worker_error)
    }

    pub async fn process_bytes(&self, original: Vec<u8>, modified: Vec<u8>, format: OutputFormat) -> Result<EncodedReport> {
        let (original, modified) = spawn_blocking(move || -> Result<(RgbImage, RgbImage)> {
            Ok((
                codec::decode(&original, ImageSlot::Original)?,
                codec::decode(&modified, ImageSlot::Modified)?,
            ))
        })
        .await
        .map_err(worker_error)??;

        let report = self.process_images(original, modified).await?;
        spawn_blocking(move || encode_report(&report, format))
            .await
            .map_err(worker_error)?
    }

    /// Processes independent pairs concurrently; reports come back in input order.
    pub async fn process_batch(&self, pairs: Vec<(RgbImage, RgbImage)>) -> Result<Vec<DiffReport>> {
        try_join_all(pairs.into_iter().map(|(original, modified)| self.process_images(original, modified))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_cover_everything_in_order() {
        assert!(chunk_ranges(0, 4).is_empty());
        assert_eq!(chunk_ranges(10, 4), vec![0..3, 3..6, 6..9, 9..10]);
        assert_eq!(chunk_ranges(3, 8), vec![0..1, 1..2, 2..3]);
        assert_eq!(chunk_ranges(5, 0), vec![0..5]);
    }
}
