// compression.rs - Size-targeted compression of a single image

use crate::candidate::{CandidateEncoder, SearchStep};
use crate::codec::{Codec, ImageCodec};
use crate::error::{CompressionError, EncodeError, Result};
use crate::settings::{CompressionSettings, SearchConfig};
use crate::source::SourceImage;
use crate::strategy::{run_search, strategy_for, SearchPlan};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionStatus {
    /// Already under the target, original kept
    Skipped,
    Compressed,
    /// Something went wrong, original kept
    Failed,
}

impl fmt::Display for CompressionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => write!(f, "no compression needed"),
            Self::Compressed => write!(f, "compressed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Final outcome for one image
#[derive(Debug, Clone)]
pub struct ImageResult {
    pub name: String,
    pub status: CompressionStatus,
    pub data: Arc<[u8]>,
    pub original_size: u64,
    /// Step that produced `data`, for compressed images
    pub step: Option<SearchStep>,
    /// Codec encode calls spent on this image
    pub encoder_calls: usize,
    /// Failure reason, for failed images
    pub message: String,
}

impl ImageResult {
    pub fn skipped(source: &SourceImage) -> Self {
        Self {
            name: source.name().to_string(),
            status: CompressionStatus::Skipped,
            data: Arc::clone(source.bytes()),
            original_size: source.size(),
            step: None,
            encoder_calls: 0,
            message: String::new(),
        }
    }

    /// Keep the original bytes after a failure
    pub fn failed(source: &SourceImage, message: impl Into<String>) -> Self {
        Self {
            name: source.name().to_string(),
            status: CompressionStatus::Failed,
            data: Arc::clone(source.bytes()),
            original_size: source.size(),
            step: None,
            encoder_calls: 0,
            message: message.into(),
        }
    }

    pub fn final_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Final size over original size
    pub fn compression_ratio(&self) -> f32 {
        if self.original_size > 0 {
            self.final_size() as f32 / self.original_size as f32
        } else {
            0.0
        }
    }

    /// Percentage of bytes saved
    pub fn reduction_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (1.0 - self.final_size() as f64 / self.original_size as f64) * 100.0
    }
}

/// Drives the search for one image at a time.
///
/// Holds no per-image state, so one engine is shared by every task in a
/// batch.
pub struct CompressionEngine {
    codec: Arc<dyn Codec>,
    config: SearchConfig,
}

impl Default for CompressionEngine {
    fn default() -> Self {
        Self::new(Arc::new(ImageCodec::new()))
    }
}

impl CompressionEngine {
    pub fn new(codec: Arc<dyn Codec>) -> Self {
        Self::with_config(codec, SearchConfig::default())
    }

    pub fn with_config(codec: Arc<dyn Codec>, config: SearchConfig) -> Self {
        Self { codec, config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn compress(
        &self,
        source: &SourceImage,
        settings: &CompressionSettings,
    ) -> Result<ImageResult> {
        let target = settings.target_bytes();
        if source.size() <= target {
            debug!(name = source.name(), size = source.size(), target, "already under target");
            return Ok(ImageResult::skipped(source));
        }

        let plan = SearchPlan::new(source.size(), settings, &self.config);
        debug!(
            name = source.name(),
            ratio = target as f64 / source.size() as f64,
            initial_scale = plan.initial_scale,
            "compressing"
        );

        let raster = self.codec.decode(source.bytes(), source.mime())?;
        let strategy = strategy_for(source.family(), &self.config);
        let mut encoder = CandidateEncoder::new(self.codec.as_ref(), &raster, source.mime());
        let outcome = run_search(strategy.as_ref(), &plan, |step| encoder.encode(step));
        let calls = encoder.calls();

        let best = match outcome.best {
            Some(best) if best.size() > 0 => best,
            _ => {
                return Err(CompressionError::NoViableCandidate {
                    calls,
                    last: outcome.last_error.unwrap_or(EncodeError::EmptyOutput),
                })
            }
        };
        if best.size() > source.size() {
            return Err(CompressionError::NotSmaller {
                candidate: best.size(),
                original: source.size(),
            });
        }

        let result = ImageResult {
            name: source.name().to_string(),
            status: CompressionStatus::Compressed,
            original_size: source.size(),
            step: Some(best.step),
            encoder_calls: calls,
            message: String::new(),
            data: best.data.into(),
        };
        info!(
            name = %result.name,
            original = result.original_size,
            compressed = result.final_size(),
            accepted = outcome.accepted,
            calls,
            "compressed {:.1}%",
            result.reduction_percent()
        );
        Ok(result)
    }

    /// Like [`compress`](Self::compress) but never fails: errors become a
    /// `Failed` result carrying the original bytes.
    pub fn compress_or_keep(&self, source: &SourceImage, settings: &CompressionSettings) -> ImageResult {
        match self.compress(source, settings) {
            Ok(result) => result,
            Err(e) => {
                warn!(name = source.name(), error = %e, "compression failed, keeping original");
                ImageResult::failed(source, e.to_string())
            }
        }
    }
}
