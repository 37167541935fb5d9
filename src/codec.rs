// codec.rs - Decode/encode primitives behind a swappable trait

use crate::error::{DecodeError, EncodeError};
use crate::source::MimeType;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;
use std::io::Cursor;

/// Opaque codec calls used by the search.
///
/// `quality` is in `0.0..=1.0`, higher keeps more detail.
pub trait Codec: Send + Sync {
    fn decode(&self, bytes: &[u8], mime: MimeType) -> Result<DynamicImage, DecodeError>;

    fn encode(
        &self,
        raster: &DynamicImage,
        mime: MimeType,
        quality: f64,
    ) -> Result<Vec<u8>, EncodeError>;
}

/// Codec backed by the `image` crate, with libwebp for lossy WebP
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }

    fn encode_jpeg(&self, raster: &DynamicImage, quality: f64) -> Result<Vec<u8>, EncodeError> {
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(raster.to_rgb8());
        let mut buffer = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality));
        rgb.write_with_encoder(encoder)?;
        Ok(buffer.into_inner())
    }

    fn encode_png(&self, raster: &DynamicImage, quality: f64) -> Result<Vec<u8>, EncodeError> {
        let mut buffer = Cursor::new(Vec::new());
        let encoder = PngEncoder::new_with_quality(
            &mut buffer,
            CompressionType::Best,
            FilterType::Adaptive,
        );

        if quality >= 1.0 {
            raster.write_with_encoder(encoder)?;
        } else {
            posterize(raster, posterize_levels(quality)).write_with_encoder(encoder)?;
        }
        Ok(buffer.into_inner())
    }

    fn encode_webp(&self, raster: &DynamicImage, quality: f64) -> Result<Vec<u8>, EncodeError> {
        let rgba = raster.to_rgba8();
        let (width, height) = rgba.dimensions();
        let encoder = webp::Encoder::from_rgba(rgba.as_raw(), width, height);
        let memory = encoder
            .encode_simple(false, (quality.clamp(0.0, 1.0) * 100.0) as f32)
            .map_err(|e| EncodeError::Webp(format!("{:?}", e)))?;
        Ok(memory.to_vec())
    }
}

impl Codec for ImageCodec {
    fn decode(&self, bytes: &[u8], mime: MimeType) -> Result<DynamicImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        image::load_from_memory_with_format(bytes, mime.image_format()).map_err(|source| {
            DecodeError::Malformed {
                format: mime.extension(),
                source,
            }
        })
    }

    fn encode(
        &self,
        raster: &DynamicImage,
        mime: MimeType,
        quality: f64,
    ) -> Result<Vec<u8>, EncodeError> {
        let data = match mime {
            MimeType::Jpeg => self.encode_jpeg(raster, quality)?,
            MimeType::Png => self.encode_png(raster, quality)?,
            MimeType::Webp => self.encode_webp(raster, quality)?,
        };

        if data.is_empty() {
            return Err(EncodeError::EmptyOutput);
        }
        Ok(data)
    }
}

/// Map `0.0..=1.0` onto the JPEG encoder's `1..=100` scale
pub fn jpeg_quality(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Number of levels kept per channel for a PNG quality setting
pub fn posterize_levels(quality: f64) -> u32 {
    (2.0 + quality.clamp(0.0, 1.0) * 254.0).round() as u32
}

/// Reduce every colour channel to `levels` evenly spaced values.
///
/// Fewer distinct values make the PNG filters and deflate far more
/// effective. Alpha is left untouched.
pub fn posterize(image: &DynamicImage, levels: u32) -> DynamicImage {
    let levels = levels.clamp(2, 256);
    let step = 255.0 / (levels - 1) as f32;
    let quantize = |v: u8| ((v as f32 / step).round() * step).round().min(255.0) as u8;

    if image.color().has_alpha() {
        let mut rgba = image.to_rgba8();
        for pixel in rgba.pixels_mut() {
            pixel[0] = quantize(pixel[0]);
            pixel[1] = quantize(pixel[1]);
            pixel[2] = quantize(pixel[2]);
        }
        DynamicImage::ImageRgba8(rgba)
    } else {
        let mut rgb = image.to_rgb8();
        for pixel in rgb.pixels_mut() {
            pixel[0] = quantize(pixel[0]);
            pixel[1] = quantize(pixel[1]);
            pixel[2] = quantize(pixel[2]);
        }
        DynamicImage::ImageRgb8(rgb)
    }
}
