//! Track raster and line classification
//!
//! Pixel (0, 0) is the top-left corner. A pixel is line when it is
//! visible (alpha at or above the cutoff) and dark (mean RGB below the
//! threshold). Out-of-bounds pixels, and every pixel of an empty surface,
//! are background.

use std::path::Path;

use image::RgbaImage;

use crate::consts::{ALPHA_CUTOFF, LINE_THRESHOLD};
use crate::error::{Result, SimError};

/// Track raster with its classification thresholds
#[derive(Debug, Clone)]
pub struct TrackSurface {
    image: Option<RgbaImage>,
    line_threshold: u8,
    alpha_cutoff: u8,
}

impl Default for TrackSurface {
    fn default() -> Self {
        Self::empty()
    }
}

impl TrackSurface {
    /// Surface with no raster; nothing is ever on line
    pub fn empty() -> Self {
        Self {
            image: None,
            line_threshold: LINE_THRESHOLD,
            alpha_cutoff: ALPHA_CUTOFF,
        }
    }

    /// Wrap an already decoded raster
    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            image: Some(image),
            ..Self::empty()
        }
    }

    /// Decode an encoded raster (PNG etc.)
    ///
    /// On failure the previous raster is kept.
    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        match image::load_from_memory(bytes) {
            Ok(img) => {
                let img = img.to_rgba8();
                log::info!("Track loaded: {}x{} px", img.width(), img.height());
                self.image = Some(img);
                Ok(())
            }
            Err(e) => {
                log::warn!("Track load failed, keeping previous surface: {}", e);
                Err(SimError::TrackLoad(e.to_string()))
            }
        }
    }

    /// Read and decode a raster file
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            log::warn!("Failed to read track {}: {}", path.display(), e);
            SimError::TrackLoad(format!("{}: {}", path.display(), e))
        })?;
        self.load(&bytes)
    }

    /// Replace the raster with a rendered one
    pub fn set_image(&mut self, image: RgbaImage) {
        self.image = Some(image);
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// Width in pixels (0 when empty)
    pub fn width(&self) -> u32 {
        self.image.as_ref().map_or(0, |i| i.width())
    }

    /// Height in pixels (0 when empty)
    pub fn height(&self) -> u32 {
        self.image.as_ref().map_or(0, |i| i.height())
    }

    pub fn line_threshold(&self) -> u8 {
        self.line_threshold
    }

    pub fn set_line_threshold(&mut self, threshold: u8) {
        self.line_threshold = threshold;
    }

    pub fn alpha_cutoff(&self) -> u8 {
        self.alpha_cutoff
    }

    pub fn set_alpha_cutoff(&mut self, cutoff: u8) {
        self.alpha_cutoff = cutoff;
    }

    /// Classify a pixel
    pub fn is_on_line(&self, px: i64, py: i64) -> bool {
        let Some(img) = &self.image else {
            return false;
        };
        if px < 0 || py < 0 || px >= img.width() as i64 || py >= img.height() as i64 {
            return false;
        }
        let [r, g, b, a] = img.get_pixel(px as u32, py as u32).0;
        if a < self.alpha_cutoff {
            return false;
        }
        let mean = (r as u32 + g as u32 + b as u32) / 3;
        mean < self.line_threshold as u32
    }
}
