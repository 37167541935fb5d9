// batch.rs - Grouped, bounded-concurrency compression of many images

use crate::compression::{CompressionEngine, CompressionStatus, ImageResult};
use crate::error::CompressionError;
use crate::settings::CompressionSettings;
use crate::source::SourceImage;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// Aggregated outcome of a run, results in input order
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    results: Vec<ImageResult>,
    pub groups: usize,
    pub skipped: usize,
    pub compressed: usize,
    pub failed: usize,
    /// Images that were over the target when the run started
    pub need_compression: usize,
    pub total_original: u64,
    pub total_final: u64,
}

impl RunSummary {
    fn from_results(results: Vec<ImageResult>, groups: usize, target: u64) -> Self {
        let mut summary = Self {
            groups,
            ..Self::default()
        };
        for result in &results {
            match result.status {
                CompressionStatus::Skipped => summary.skipped += 1,
                CompressionStatus::Compressed => summary.compressed += 1,
                CompressionStatus::Failed => summary.failed += 1,
            }
            if result.original_size > target {
                summary.need_compression += 1;
            }
            summary.total_original += result.original_size;
            summary.total_final += result.final_size();
        }
        summary.results = results;
        summary
    }

    pub fn results(&self) -> &[ImageResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Saved bytes as a percentage of the original total
    pub fn savings_percent(&self) -> f64 {
        if self.total_original == 0 {
            return 0.0;
        }
        (1.0 - self.total_final as f64 / self.total_original as f64) * 100.0
    }

    /// `(name, bytes)` pairs for packaging, every input represented once
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.results.iter().map(|r| (r.name.as_str(), &r.data[..]))
    }
}

/// Runs the engine over a collection, `group_width` images at a time.
///
/// A group must fully settle before the next one starts, which caps the
/// number of decoded rasters alive at once.
pub struct BatchRunner {
    engine: Arc<CompressionEngine>,
    group_width: usize,
}

impl BatchRunner {
    pub fn new(engine: CompressionEngine) -> Self {
        let group_width = engine.config().group_width.max(1);
        Self {
            engine: Arc::new(engine),
            group_width,
        }
    }

    pub fn group_width(&self) -> usize {
        self.group_width
    }

    pub async fn run(&self, images: Vec<SourceImage>, settings: CompressionSettings) -> RunSummary {
        let total = images.len();
        let mut slots: Vec<Option<ImageResult>> = (0..total).map(|_| None).collect();
        let mut groups = 0;

        for (group_index, group) in images.chunks(self.group_width).enumerate() {
            groups += 1;
            let offset = group_index * self.group_width;

            let tasks = group.iter().cloned().enumerate().map(|(i, source)| {
                let engine = Arc::clone(&self.engine);
                async move {
                    let fallback = source.clone();
                    let handle = tokio::task::spawn_blocking(move || {
                        engine.compress_or_keep(&source, &settings)
                    });
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(e) => {
                            let error = CompressionError::Aborted(e.to_string());
                            warn!(name = fallback.name(), error = %error, "task failed, keeping original");
                            ImageResult::failed(&fallback, error.to_string())
                        }
                    };
                    (offset + i, result)
                }
            });

            for (index, result) in join_all(tasks).await {
                slots[index] = Some(result);
            }
        }

        let results: Vec<ImageResult> = slots
            .into_iter()
            .zip(images.iter())
            .map(|(slot, source)| {
                slot.unwrap_or_else(|| ImageResult::failed(source, "no result recorded"))
            })
            .collect();

        let summary = RunSummary::from_results(results, groups, settings.target_bytes());
        info!(
            images = total,
            groups,
            compressed = summary.compressed,
            skipped = summary.skipped,
            failed = summary.failed,
            total_original = summary.total_original,
            total_final = summary.total_final,
            "run finished"
        );
        summary
    }
}
