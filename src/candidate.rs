// candidate.rs - One scale + encode attempt against a decoded raster

use crate::codec::Codec;
use crate::error::EncodeError;
use crate::source::MimeType;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// One encoder invocation: a linear scale and a quality, both in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchStep {
    pub scale: f64,
    pub quality: f64,
}

impl SearchStep {
    pub fn new(scale: f64, quality: f64) -> Self {
        Self { scale, quality }
    }
}

/// Output of one [`SearchStep`]
#[derive(Debug, Clone)]
pub struct Candidate {
    pub data: Vec<u8>,
    pub step: SearchStep,
    pub width: u32,
    pub height: u32,
}

impl Candidate {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Output dimensions for a scale factor, rounding down
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    (
        (width as f64 * scale).floor() as u32,
        (height as f64 * scale).floor() as u32,
    )
}

/// Runs single encoder attempts for one image.
///
/// The last resized raster is kept so consecutive steps at the same
/// scale only resample once. The source raster is never modified.
pub struct CandidateEncoder<'a> {
    codec: &'a dyn Codec,
    source: &'a DynamicImage,
    mime: MimeType,
    scaled: Option<DynamicImage>,
    calls: usize,
}

impl<'a> CandidateEncoder<'a> {
    pub fn new(codec: &'a dyn Codec, source: &'a DynamicImage, mime: MimeType) -> Self {
        Self {
            codec,
            source,
            mime,
            scaled: None,
            calls: 0,
        }
    }

    /// Number of codec encode calls made so far
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn encode(&mut self, step: SearchStep) -> Result<Candidate, EncodeError> {
        let (src_width, src_height) = self.source.dimensions();
        let (width, height) = scaled_dimensions(src_width, src_height, step.scale);
        if width == 0 || height == 0 {
            return Err(EncodeError::DegenerateDimensions {
                width,
                height,
                scale: step.scale,
            });
        }

        let codec = self.codec;
        let mime = self.mime;
        self.calls += 1;
        let raster = self.raster_at(width, height);
        let data = codec.encode(raster, mime, step.quality)?;
        if data.is_empty() {
            return Err(EncodeError::EmptyOutput);
        }

        Ok(Candidate {
            data,
            step,
            width,
            height,
        })
    }

    fn raster_at(&mut self, width: u32, height: u32) -> &DynamicImage {
        if (width, height) == self.source.dimensions() {
            return self.source;
        }
        let stale = self
            .scaled
            .as_ref()
            .map_or(true, |s| s.dimensions() != (width, height));
        if stale {
            self.scaled = Some(self.source.resize_exact(width, height, FilterType::Lanczos3));
        }
        match &self.scaled {
            Some(scaled) => scaled,
            None => self.source,
        }
    }
}
