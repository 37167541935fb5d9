// common/mod.rs - Shared helpers for integration tests

#![allow(dead_code)]

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use size_target::{Codec, DecodeError, EncodeError, MimeType, SourceImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Deterministic stand-in for a real codec.
///
/// Every source decodes to `width x height`; an encode produces
/// `pixels * bytes_per_pixel * quality` bytes. Calls are counted and
/// either side can be forced to fail.
pub struct ModelCodec {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: f64,
    pub fail_decode: bool,
    pub fail_encode: bool,
    pub decode_delay: Duration,
    pub decodes: AtomicUsize,
    pub encodes: AtomicUsize,
    pub sizes: Mutex<Vec<u64>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// (first byte of the source, decode start, decode end)
    pub decode_spans: Mutex<Vec<(u8, Instant, Instant)>>,
}

impl ModelCodec {
    pub fn new(width: u32, height: u32, bytes_per_pixel: f64) -> Self {
        Self {
            width,
            height,
            bytes_per_pixel,
            fail_decode: false,
            fail_encode: false,
            decode_delay: Duration::ZERO,
            decodes: AtomicUsize::new(0),
            encodes: AtomicUsize::new(0),
            sizes: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            decode_spans: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_decode(mut self) -> Self {
        self.fail_decode = true;
        self
    }

    pub fn failing_encode(mut self) -> Self {
        self.fail_encode = true;
        self
    }

    pub fn with_decode_delay(mut self, delay: Duration) -> Self {
        self.decode_delay = delay;
        self
    }

    pub fn encode_calls(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }

    pub fn decode_calls(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn produced_sizes(&self) -> Vec<u64> {
        self.sizes.lock().unwrap().clone()
    }
}

impl Codec for ModelCodec {
    fn decode(&self, bytes: &[u8], _mime: MimeType) -> Result<DynamicImage, DecodeError> {
        let start = Instant::now();
        self.decodes.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.decode_delay.is_zero() {
            thread::sleep(self.decode_delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.decode_spans
            .lock()
            .unwrap()
            .push((bytes.first().copied().unwrap_or(0), start, Instant::now()));

        if self.fail_decode {
            return Err(DecodeError::Empty);
        }
        Ok(DynamicImage::new_rgb8(self.width, self.height))
    }

    fn encode(
        &self,
        raster: &DynamicImage,
        _mime: MimeType,
        quality: f64,
    ) -> Result<Vec<u8>, EncodeError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        if self.fail_encode {
            return Err(EncodeError::Webp("forced failure".to_string()));
        }
        let (w, h) = raster.dimensions();
        let size = ((w as f64 * h as f64) * self.bytes_per_pixel * quality) as usize;
        self.sizes.lock().unwrap().push(size as u64);
        Ok(vec![0xAB; size])
    }
}

/// A source of `size` bytes whose first byte is `tag`
pub fn model_source(name: &str, mime: MimeType, size: usize, tag: u8) -> SourceImage {
    let mut bytes = vec![1u8; size.max(1)];
    bytes[0] = tag;
    SourceImage::from_parts(name, mime, bytes, 0, 0)
}

/// Smooth gradient with deterministic grain, compresses like a photo
pub fn photo_like(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let grain = (x.wrapping_mul(1_103_515_245).wrapping_add(y.wrapping_mul(12_345)) >> 7) & 0x1F;
        Rgb([
            ((x * 255 / width.max(1)) as u8).saturating_add(grain as u8),
            ((y * 255 / height.max(1)) as u8).saturating_add(grain as u8 / 2),
            (((x + y) * 127 / (width + height).max(1)) as u8).saturating_add(grain as u8),
        ])
    }))
}
