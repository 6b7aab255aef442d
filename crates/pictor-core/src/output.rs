//! Writing generated images to the output directory

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Image encodings pictor accepts from a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl ImageFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }

    /// Get MIME type for this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }

    /// Parse a MIME type, ignoring parameters such as `; charset=...`
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Some(Self::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP") {
            Some(Self::WebP)
        } else {
            None
        }
    }
}

/// Image payload as returned by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    /// Content type reported by the backend, if any
    pub mime_type: Option<String>,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>, mime_type: Option<String>) -> Self {
        Self { bytes, mime_type }
    }

    /// Resolve the format from the reported content type, sniffing the
    /// bytes when none was reported
    pub fn format(&self) -> Result<ImageFormat> {
        match self.mime_type.as_deref().filter(|m| !m.is_empty()) {
            Some(mime) => ImageFormat::from_mime(mime).ok_or_else(|| {
                if mime.starts_with("text/plain") {
                    warn!(text = %String::from_utf8_lossy(&self.bytes), "Backend returned text instead of an image");
                }
                Error::UnsupportedImageType(mime.to_string())
            }),
            None => ImageFormat::detect(&self.bytes).ok_or_else(|| {
                Error::UnsupportedImageType("application/octet-stream".to_string())
            }),
        }
    }
}

/// Writes one generation's images into a directory
#[derive(Debug, Clone)]
pub struct ImageWriter {
    dir: PathBuf,
}

impl ImageWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write all images stamped with the current time
    pub fn write_all(&self, images: &[RawImage]) -> Result<Vec<PathBuf>> {
        self.write_all_at(Local::now(), images)
    }

    /// Write all images as `<timestamp>_<index>.<ext>`.
    ///
    /// Every format is resolved before the first file is written, so an
    /// unsupported payload leaves nothing behind.
    pub fn write_all_at(&self, at: DateTime<Local>, images: &[RawImage]) -> Result<Vec<PathBuf>> {
        let formats = images
            .iter()
            .map(RawImage::format)
            .collect::<Result<Vec<_>>>()?;

        fs::create_dir_all(&self.dir)?;

        let stamp = at.format("%Y-%m-%dT%H-%M-%S%.3f");
        let mut paths = Vec::with_capacity(images.len());
        for (index, (image, format)) in images.iter().zip(formats).enumerate() {
            let path = self
                .dir
                .join(format!("{}_{}.{}", stamp, index, format.extension()));
            fs::write(&path, &image.bytes)?;
            info!(path = %path.display(), size_bytes = image.bytes.len(), "Image saved");
            paths.push(path);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];

    #[test]
    fn test_detect_image_format() {
        assert_eq!(ImageFormat::detect(PNG), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::detect(JPEG), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::detect(b"GIF89a...."), Some(ImageFormat::Gif));

        let mut webp = vec![0u8; 12];
        webp[0..4].copy_from_slice(b"RIFF");
        webp[8..12].copy_from_slice(b"WEBP");
        assert_eq!(ImageFormat::detect(&webp), Some(ImageFormat::WebP));

        assert_eq!(ImageFormat::detect(&[0, 1, 2, 3]), None);
    }

    #[test]
    fn test_from_mime() {
        assert_eq!(ImageFormat::from_mime("image/png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_mime("IMAGE/JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime("text/plain; charset=utf-8"), None);
    }

    #[test]
    fn test_reported_type_wins_over_sniffing() {
        let image = RawImage::new(PNG.to_vec(), Some("image/jpeg".to_string()));
        assert_eq!(image.format().unwrap(), ImageFormat::Jpeg);

        let image = RawImage::new(PNG.to_vec(), None);
        assert_eq!(image.format().unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_write_all_names_files_by_timestamp_and_index() {
        let dir = TempDir::new().unwrap();
        let writer = ImageWriter::new(dir.path().join("out"));
        let at = Local.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap();

        let paths = writer
            .write_all_at(
                at,
                &[
                    RawImage::new(PNG.to_vec(), Some("image/png".to_string())),
                    RawImage::new(JPEG.to_vec(), None),
                ],
            )
            .unwrap();

        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            ["2025-03-14T15-09-26.000_0.png", "2025-03-14T15-09-26.000_1.jpg"]
        );
        assert_eq!(fs::read(&paths[1]).unwrap(), JPEG);
    }

    #[test]
    fn test_unsupported_type_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let writer = ImageWriter::new(dir.path());

        let err = writer
            .write_all(&[
                RawImage::new(PNG.to_vec(), Some("image/png".to_string())),
                RawImage::new(b"hello".to_vec(), Some("text/plain; charset=utf-8".to_string())),
            ])
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedImageType(mime) if mime.starts_with("text/plain")));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
