// estimate.rs - Cheap size projections for previews, no encoder involved

use crate::settings::CompressionSettings;
use crate::source::SourceImage;

/// Predicted size after compressing `original_size` bytes down by `ratio`.
///
/// `ratio` is `target / original`. A ratio of one or more means the file
/// already fits and is left alone.
pub fn estimate(original_size: u64, ratio: f64) -> u64 {
    if ratio < 1.0 {
        (original_size as f64 * ratio).ceil() as u64
    } else {
        original_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStatus {
    NoCompressionNeeded,
    WillCompress,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewEntry {
    pub name: String,
    pub original_size: u64,
    pub projected_size: u64,
    pub status: PreviewStatus,
}

/// Projection for a whole run, shown before any real encoding happens
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunPreview {
    pub entries: Vec<PreviewEntry>,
    pub need_compression: usize,
    pub total_original: u64,
    pub total_projected: u64,
}

impl RunPreview {
    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    /// Projected saving as a percentage of the original total
    pub fn savings_percent(&self) -> f64 {
        if self.total_original == 0 {
            return 0.0;
        }
        (1.0 - self.total_projected as f64 / self.total_original as f64) * 100.0
    }
}

pub fn preview(images: &[SourceImage], settings: &CompressionSettings) -> RunPreview {
    let target = settings.target_bytes();
    let mut run = RunPreview::default();

    for image in images {
        let original_size = image.size();
        let (projected_size, status) = if original_size > target {
            run.need_compression += 1;
            (
                estimate(original_size, target as f64 / original_size as f64),
                PreviewStatus::WillCompress,
            )
        } else {
            (original_size, PreviewStatus::NoCompressionNeeded)
        };

        run.total_original += original_size;
        run.total_projected += projected_size;
        run.entries.push(PreviewEntry {
            name: image.name().to_string(),
            original_size,
            projected_size,
            status,
        });
    }

    run
}
