// source.rs - Ingested images and the supported-type filter

use crate::error::{DecodeError, IngestError};
use image::{ImageFormat, ImageReader};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// How a format's output size responds to the quality knob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecFamily {
    /// Size follows quality closely (JPEG, WebP)
    Lossy,
    /// Filter/palette based, barely reacts to quality (PNG)
    Palette,
}

/// The image types accepted for compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeType {
    Jpeg,
    Png,
    Webp,
}

impl MimeType {
    pub const SUPPORTED: [MimeType; 3] = [Self::Jpeg, Self::Png, Self::Webp];

    pub fn from_mime_str(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    pub fn family(&self) -> CodecFamily {
        match self {
            Self::Png => CodecFamily::Palette,
            Self::Jpeg | Self::Webp => CodecFamily::Lossy,
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Webp => ImageFormat::WebP,
        }
    }
}

/// An encoded image as it arrived, never modified afterwards
#[derive(Debug, Clone)]
pub struct SourceImage {
    name: String,
    mime: MimeType,
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl SourceImage {
    /// Build from raw bytes, reading the dimensions from the header.
    pub fn from_bytes(
        name: impl Into<String>,
        mime: MimeType,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self, DecodeError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let (width, height) = ImageReader::with_format(Cursor::new(&bytes[..]), mime.image_format())
            .into_dimensions()
            .map_err(|source| DecodeError::Malformed {
                format: mime.extension(),
                source,
            })?;
        Ok(Self::from_parts(name, mime, bytes, width, height))
    }

    /// Build with dimensions already known to the caller.
    pub fn from_parts(
        name: impl Into<String>,
        mime: MimeType,
        bytes: impl Into<Arc<[u8]>>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            name: name.into(),
            mime,
            bytes: bytes.into(),
            width,
            height,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> MimeType {
        self.mime
    }

    pub fn family(&self) -> CodecFamily {
        self.mime.family()
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Find every supported image at `path` (a single file or a folder tree).
pub fn collect_images(path: &Path) -> Vec<PathBuf> {
    let mut images = Vec::new();

    if path.is_file() {
        if is_image_file(path) {
            images.push(path.to_path_buf());
        }
    } else if path.is_dir() {
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if is_image_file(path) {
                images.push(path.to_path_buf());
            } else {
                debug!(path = %path.display(), "skipping unsupported file");
            }
        }
    }

    images
}

fn is_image_file(path: &Path) -> bool {
    MimeType::from_path(path).is_some()
}

/// Read one file into a [`SourceImage`] named by its path relative to `root`.
///
/// A header that fails to parse does not drop the file: it is kept with
/// unknown dimensions so the engine reports it as failed and the original
/// bytes survive into the output.
pub fn load_image(path: &Path, root: &Path) -> Result<SourceImage, IngestError> {
    let mime = MimeType::from_path(path)
        .ok_or_else(|| IngestError::Unsupported(path.display().to_string()))?;
    let bytes: Arc<[u8]> = fs::read(path)
        .map_err(|source| IngestError::Io {
            path: path.display().to_string(),
            source,
        })?
        .into();
    let name = relative_name(path, root);

    match SourceImage::from_bytes(name.clone(), mime, Arc::clone(&bytes)) {
        Ok(image) => Ok(image),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable header, keeping as-is");
            Ok(SourceImage::from_parts(name, mime, bytes, 0, 0))
        }
    }
}

/// `/`-separated path of `path` below `root`, or its file name when
/// `root` is the file itself.
pub fn relative_name(path: &Path, root: &Path) -> String {
    let relative = match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        _ => path.file_name().map(Path::new).unwrap_or(path),
    };
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Load every supported image under `path`.
///
/// Files that cannot be read at all are skipped with a warning.
pub fn load_images(path: &Path) -> Result<Vec<SourceImage>, IngestError> {
    let images: Vec<SourceImage> = collect_images(path)
        .iter()
        .filter_map(|image_path| match load_image(image_path, path) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(path = %image_path.display(), error = %e, "skipping unreadable file");
                None
            }
        })
        .collect();

    if images.is_empty() {
        return Err(IngestError::NothingFound(path.display().to_string()));
    }
    Ok(images)
}

/// Display name of the input, used to name the output folder.
pub fn folder_name(path: &Path) -> String {
    let name = if path.is_file() {
        path.file_stem()
    } else {
        path.file_name()
    };
    name.map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "images".to_string())
}
