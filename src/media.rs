use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Image processing failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// Image files picked by the user, before any processing.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Build from a file on disk, guessing the content type from its extension.
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let content_type = mime_guess::from_path(path).first_or_octet_stream();
        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            content_type: content_type.essence_str().to_string(),
            data: data.into(),
        })
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

pub trait ImageResizer: Send + Sync {
    /// Re-encode `data` as JPEG no wider than the configured maximum.
    fn resize(&self, data: &[u8]) -> Result<Bytes, MediaError>;
}

pub type DynImageResizer = Arc<dyn ImageResizer>;

pub struct JpegResizer {
    max_width: u32,
    quality: u8,
}

impl JpegResizer {
    pub fn new(max_width: u32, quality: u8) -> Self {
        Self {
            max_width: max_width.max(1),
            quality: quality.clamp(1, 100),
        }
    }
}

impl ImageResizer for JpegResizer {
    fn resize(&self, data: &[u8]) -> Result<Bytes, MediaError> {
        let img = image::load_from_memory(data)?;
        let (w, h) = (img.width(), img.height());

        let img = if w > self.max_width {
            let scaled_h = ((h as f64) * (self.max_width as f64) / (w as f64)).round() as u32;
            img.resize_exact(self.max_width, scaled_h.max(1), FilterType::Triangle)
        } else {
            img
        };

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut out = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, self.quality))?;
        Ok(Bytes::from(out))
    }
}
