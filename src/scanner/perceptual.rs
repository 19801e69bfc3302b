//! Perceptual hashing for similarity detection.
//!
//! Images and video frames are reduced to a 9-wide by 8-tall grayscale grid
//! and hashed with the 64-bit average hash (aHash) used throughout this
//! crate: for each row, each of the first 8 samples is compared against its
//! right neighbour, and bit = 1 when the left sample is darker. The 64 bits
//! are packed row-major, left to right, most significant bit first.
//!
//! The result is similarity-preserving, not collision-resistant. It flags
//! likely duplicates and says nothing about content integrity.

use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

/// Grid width in samples.
pub const GRID_WIDTH: usize = 9;
/// Grid height in samples.
pub const GRID_HEIGHT: usize = 8;
/// Total samples in a grid.
pub const GRID_SAMPLES: usize = GRID_WIDTH * GRID_HEIGHT;

/// Errors that can occur while producing a grayscale grid.
#[derive(Debug, Error)]
pub enum PerceptualError {
    /// Failed to open or decode the image.
    #[error("Failed to load image {0}: {1}")]
    LoadError(String, #[source] image::ImageError),

    /// Raw sample buffer has the wrong length.
    #[error("Expected {GRID_SAMPLES} grayscale samples, got {0}")]
    BadSampleCount(usize),
}

/// A 9x8 grid of 8-bit brightness samples, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayGrid {
    samples: [u8; GRID_SAMPLES],
}

impl GrayGrid {
    /// Build a grid from exactly 72 row-major samples.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::BadSampleCount`] for any other length.
    pub fn from_raw(samples: &[u8]) -> Result<Self, PerceptualError> {
        let samples: [u8; GRID_SAMPLES] = samples
            .try_into()
            .map_err(|_| PerceptualError::BadSampleCount(samples.len()))?;
        Ok(Self { samples })
    }

    /// Downsample a decoded image to the grid.
    #[must_use]
    pub fn from_image(img: &DynamicImage) -> Self {
        let gray = img.to_luma8();
        let small = image::imageops::resize(
            &gray,
            GRID_WIDTH as u32,
            GRID_HEIGHT as u32,
            FilterType::Triangle,
        );
        let mut samples = [0u8; GRID_SAMPLES];
        samples.copy_from_slice(small.as_raw());
        Self { samples }
    }

    /// Decode the image at `path` and downsample it.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::LoadError`] when the file cannot be decoded.
    pub fn from_image_path(path: &Path) -> Result<Self, PerceptualError> {
        let img = image::open(path)
            .map_err(|e| PerceptualError::LoadError(path.display().to_string(), e))?;
        Ok(Self::from_image(&img))
    }

    /// Brightness at column `x`, row `y`.
    #[must_use]
    pub fn brightness(&self, x: usize, y: usize) -> u8 {
        self.samples[y * GRID_WIDTH + x]
    }

    /// Compute the 64-bit aHash of this grid.
    #[must_use]
    pub fn ahash(&self) -> PerceptualHash {
        let mut value = 0u64;
        for y in 0..GRID_HEIGHT {
            for x in 0..GRID_WIDTH - 1 {
                let bit = self.brightness(x, y) < self.brightness(x + 1, y);
                value = (value << 1) | u64::from(bit);
            }
        }
        PerceptualHash(value)
    }
}

/// A 64-bit perceptual hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PerceptualHash(pub u64);

impl PerceptualHash {
    /// Render as 16 lowercase hex digits.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }

    /// Parse exactly 16 hex digits.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 16 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(hex, 16).ok().map(Self)
    }

    /// Number of differing bits.
    #[must_use]
    pub fn distance(self, other: Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Combine several hashes by per-bit majority.
    ///
    /// Bit i of the result is set when at least half of the inputs have it
    /// set. Returns `None` for an empty input.
    #[must_use]
    pub fn majority(hashes: &[Self]) -> Option<Self> {
        if hashes.is_empty() {
            return None;
        }
        let mut combined = 0u64;
        for bit in (0..64).rev() {
            let set = hashes.iter().filter(|h| h.0 & (1 << bit) != 0).count();
            combined = (combined << 1) | u64::from(set * 2 >= hashes.len());
        }
        Some(Self(combined))
    }
}

impl std::fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
