//! Re-encode images so each lands just under a byte-size target.
//!
//! The search trades resolution against encoder quality with a small,
//! fixed grid of encoder calls per image:
//!
//! - palette codecs (PNG) walk an 8-step ladder that lowers quality first
//!   and resolution last
//! - lossy codecs (JPEG, WebP) sweep 10 qualities at each of 6 scales,
//!   moving to the next scale as soon as a step undershoots
//!
//! Images already under the target are passed through untouched, and any
//! failure keeps the original bytes.
//!
//! ```no_run
//! use size_target::{BatchRunner, CompressionEngine, CompressionSettings, TargetPreset};
//!
//! # async fn demo(images: Vec<size_target::SourceImage>) {
//! let runner = BatchRunner::new(CompressionEngine::default());
//! let summary = runner.run(images, CompressionSettings::from(TargetPreset::TwoMb)).await;
//! println!("saved {:.1}%", summary.savings_percent());
//! # }
//! ```

pub mod batch;
pub mod candidate;
pub mod codec;
pub mod compression;
pub mod error;
pub mod estimate;
pub mod output;
pub mod settings;
pub mod source;
pub mod strategy;

pub use batch::{BatchRunner, RunSummary};
pub use candidate::{Candidate, CandidateEncoder, SearchStep};
pub use codec::{Codec, ImageCodec};
pub use compression::{CompressionEngine, CompressionStatus, ImageResult};
pub use error::{CompressionError, DecodeError, EncodeError, IngestError, OutputError, SettingsError};
pub use estimate::{estimate, preview, RunPreview};
pub use settings::{CompressionSettings, SearchConfig, TargetPreset};
pub use source::{CodecFamily, MimeType, SourceImage};
pub use strategy::{LossyStrategy, PaletteStrategy, SearchPlan, SearchStrategy};
