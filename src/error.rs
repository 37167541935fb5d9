// error.rs - Error types for size-targeted compression

use thiserror::Error;

/// Result type for compression operations
pub type Result<T> = std::result::Result<T, CompressionError>;

/// Input bytes could not be turned into a raster
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The codec rejected the bytes
    #[error("Malformed {format} data: {source}")]
    Malformed {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },

    /// The payload was empty
    #[error("Empty input")]
    Empty,
}

/// A single encoder invocation failed
#[derive(Error, Debug)]
pub enum EncodeError {
    /// Scaling collapsed one of the axes to zero pixels
    #[error("Scaled dimensions degenerate to {width}x{height} at scale {scale:.3}")]
    DegenerateDimensions { width: u32, height: u32, scale: f64 },

    /// The `image` crate encoder failed
    #[error("Encoder failed: {0}")]
    Image(#[from] image::ImageError),

    /// libwebp refused the raster
    #[error("WebP encoder failed: {0}")]
    Webp(String),

    /// The encoder produced no bytes
    #[error("Encoder produced an empty payload")]
    EmptyOutput,
}

/// No usable result could be produced for an image
#[derive(Error, Debug)]
pub enum CompressionError {
    /// Decoding the source failed
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// Every step of the search failed to encode
    #[error("No viable candidate after {calls} encoder calls (last error: {last})")]
    NoViableCandidate { calls: usize, last: EncodeError },

    /// The best candidate is larger than the original file
    #[error("Best candidate ({candidate} bytes) is not smaller than the original ({original} bytes)")]
    NotSmaller { candidate: u64, original: u64 },

    /// The encode task itself died
    #[error("Compression task aborted: {0}")]
    Aborted(String),
}

/// Errors raised while validating settings
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Target size must be a positive number of bytes")]
    ZeroTarget,

    #[error("Unknown target preset: {0}. Use 1, 2 or 5 (MB)")]
    UnknownPreset(String),
}

/// Errors raised while reading images from disk
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported image type: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("No supported images found under {0}")]
    NothingFound(String),
}

/// Errors raised while writing results
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Refusing to write outside the output folder: {0}")]
    InvalidName(String),

    #[error("Two images map to the same output file: {0}")]
    DuplicateName(String),
}
