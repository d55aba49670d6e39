//! Image loading for vehicle artwork.

use std::{fmt, path::Path, sync::Arc};

use image::RgbaImage;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while decoding an image file.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The file does not exist.
    #[error("image file not found: {0}")]
    Missing(String),
    /// The file exists but could not be decoded.
    #[error("failed to decode {path}: {source}")]
    Decode {
        /// Offending path.
        path: String,
        /// Decoder error.
        #[source]
        source: image::ImageError,
    },
}

/// Shared, immutable decoded RGBA image.
#[derive(Clone)]
pub struct ImageHandle {
    pixels: Arc<RgbaImage>,
}

impl ImageHandle {
    /// Wrap an already decoded image.
    pub fn new(image: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(image),
        }
    }

    /// Pixel width.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Pixel height.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// RGBA value at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(self.pixels.get_pixel(x, y).0)
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

/// Turns a path into a decoded image. Failure is a sentinel, not an error:
/// callers fall back to rendering without an image.
pub trait ImageLoader {
    /// Decode `path`, returning a typed error on failure.
    fn try_load(&self, path: &Path) -> Result<ImageHandle, AssetError>;

    /// Decode `path`, logging and swallowing failures.
    fn load(&self, path: &Path) -> Option<ImageHandle> {
        match self.try_load(path) {
            Ok(handle) => {
                debug!(
                    path = %path.display(),
                    width = handle.width(),
                    height = handle.height(),
                    "Loaded image"
                );
                Some(handle)
            }
            Err(err) => {
                warn!("Failed to load {}: {err}", path.display());
                None
            }
        }
    }
}

/// Loader that decodes files from disk with the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageLoader;

impl ImageLoader for FsImageLoader {
    fn try_load(&self, path: &Path) -> Result<ImageHandle, AssetError> {
        if !path.is_file() {
            return Err(AssetError::Missing(path.display().to_string()));
        }
        let decoded = image::open(path).map_err(|source| AssetError::Decode {
            path: path.display().to_string(),
            source,
        })?;
        Ok(ImageHandle::new(decoded.to_rgba8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use image::Rgba;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn decodes_png_from_disk() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("car.png");
        let mut source = RgbaImage::new(4, 2);
        source.put_pixel(3, 1, Rgba([10, 20, 30, 255]));
        source.save(&path)?;

        let handle = FsImageLoader.load(&path).expect("png should decode");
        assert_eq!((handle.width(), handle.height()), (4, 2));
        assert_eq!(handle.pixel(3, 1), Some([10, 20, 30, 255]));
        assert_eq!(handle.pixel(4, 0), None);
        Ok(())
    }

    #[test]
    fn missing_and_corrupt_files_are_sentinels() -> Result<()> {
        let dir = tempdir()?;
        assert!(FsImageLoader.load(&dir.path().join("nope.png")).is_none());

        let junk = dir.path().join("truck.png");
        fs::write(&junk, b"not a png")?;
        assert!(matches!(
            FsImageLoader.try_load(&junk),
            Err(AssetError::Decode { .. })
        ));
        assert!(FsImageLoader.load(&junk).is_none());
        Ok(())
    }
}
