//! # Image Scaling Module
//!
//! Upscales small photos so that glyph strokes are wide enough for the
//! recognition engine.

use image::{DynamicImage, GenericImageView};
use tracing;

use super::types::{PreprocessingError, ScaledImageResult};
use crate::ocr_config::{MIN_DIMENSION, UPSCALE_FACTOR};

/// Resizes both dimensions by `factor` with cubic (Catmull-Rom) interpolation.
///
/// A factor of 1.0 or below returns an unchanged copy; this stage never
/// shrinks an image.
///
/// # Examples
///
/// ```
/// use image::{DynamicImage, GenericImageView, RgbImage};
/// use pindai_ocr::preprocessing::upscale;
///
/// let img = DynamicImage::ImageRgb8(RgbImage::new(40, 30));
/// assert_eq!(upscale(&img, 2.0).dimensions(), (80, 60));
/// assert_eq!(upscale(&img, 0.5).dimensions(), (40, 30));
/// ```
pub fn upscale(image: &DynamicImage, factor: f32) -> DynamicImage {
    if !factor.is_finite() || factor <= 1.0 {
        return image.clone();
    }

    let (width, height) = image.dimensions();
    let new_width = (width as f32 * factor).round() as u32;
    let new_height = (height as f32 * factor).round() as u32;

    image.resize_exact(
        new_width,
        new_height,
        image::imageops::FilterType::CatmullRom,
    )
}

/// Decides whether an image is too small for reliable recognition and
/// upscales it when it is.
#[derive(Debug, Clone)]
pub struct ImageScaler {
    /// Upscale when width or height is below this many pixels
    min_dimension: u32,
    /// Factor applied to both dimensions
    factor: f32,
}

impl ImageScaler {
    /// Creates a scaler with the default threshold (1500 px) and factor (2.0).
    ///
    /// # Examples
    ///
    /// ```
    /// use pindai_ocr::preprocessing::ImageScaler;
    ///
    /// let scaler = ImageScaler::new();
    /// assert_eq!(scaler.min_dimension(), 1500);
    /// assert_eq!(scaler.factor(), 2.0);
    /// ```
    pub fn new() -> Self {
        Self {
            min_dimension: MIN_DIMENSION,
            factor: UPSCALE_FACTOR,
        }
    }

    /// Creates a scaler with a custom threshold and factor.
    ///
    /// # Errors
    ///
    /// Returns `PreprocessingError::InvalidParameter` if the factor is not a
    /// finite number.
    pub fn with_params(min_dimension: u32, factor: f32) -> Result<Self, PreprocessingError> {
        if !factor.is_finite() {
            return Err(PreprocessingError::InvalidParameter {
                message: format!("upscale factor {} is not finite", factor),
            });
        }

        Ok(Self {
            min_dimension,
            factor,
        })
    }

    pub fn min_dimension(&self) -> u32 {
        self.min_dimension
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Whether an image with these dimensions would be upscaled
    pub fn needs_upscaling(&self, width: u32, height: u32) -> bool {
        self.factor > 1.0 && (width < self.min_dimension || height < self.min_dimension)
    }

    /// Upscales the image when either side is below the threshold.
    ///
    /// # Arguments
    ///
    /// * `image` - The decoded source photo
    ///
    /// # Returns
    ///
    /// A [`ScaledImageResult`] with the (possibly untouched) image and the
    /// factor actually applied, which callers use to map coordinates back to
    /// the original image.
    pub fn scale_for_ocr(&self, image: &DynamicImage) -> ScaledImageResult {
        let start_time = std::time::Instant::now();
        let (width, height) = image.dimensions();

        let (scaled, applied) = if self.needs_upscaling(width, height) {
            (upscale(image, self.factor), self.factor)
        } else {
            (image.clone(), 1.0)
        };
        let new_dimensions = scaled.dimensions();
        let processing_time = start_time.elapsed();

        tracing::debug!(
            target: "ocr_preprocessing",
            "Scaling completed in {:.2}ms: {}x{} -> {}x{} (factor {})",
            processing_time.as_millis(),
            width,
            height,
            new_dimensions.0,
            new_dimensions.1,
            applied
        );

        ScaledImageResult {
            image: scaled,
            original_dimensions: (width, height),
            new_dimensions,
            scale_factor: applied,
            processing_time_ms: processing_time.as_millis() as u32,
        }
    }
}

impl Default for ImageScaler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
    }

    #[test]
    fn test_new_scaler() {
        let scaler = ImageScaler::new();
        assert_eq!(scaler.min_dimension(), 1500);
        assert_eq!(scaler.factor(), 2.0);
    }

    #[test]
    fn test_with_invalid_factor() {
        assert!(matches!(
            ImageScaler::with_params(1500, f32::NAN),
            Err(PreprocessingError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_small_image_is_doubled() {
        let scaler = ImageScaler::new();
        let result = scaler.scale_for_ocr(&create_test_image(800, 600));

        assert_eq!(result.original_dimensions, (800, 600));
        assert_eq!(result.new_dimensions, (1600, 1200));
        assert_eq!(result.scale_factor, 2.0);
    }

    #[test]
    fn test_one_short_side_triggers_upscaling() {
        let scaler = ImageScaler::with_params(100, 2.0).unwrap();
        let result = scaler.scale_for_ocr(&create_test_image(150, 99));
        assert_eq!(result.new_dimensions, (300, 198));
    }

    #[test]
    fn test_large_image_is_untouched() {
        let scaler = ImageScaler::with_params(100, 2.0).unwrap();
        let result = scaler.scale_for_ocr(&create_test_image(100, 120));

        assert_eq!(result.new_dimensions, (100, 120));
        assert_eq!(result.scale_factor, 1.0);
    }

    #[test]
    fn test_factor_at_or_below_one_is_noop() {
        let img = create_test_image(30, 20);
        assert_eq!(upscale(&img, 1.0).dimensions(), (30, 20));
        assert_eq!(upscale(&img, 0.25).dimensions(), (30, 20));

        let scaler = ImageScaler::with_params(1500, 0.5).unwrap();
        assert!(!scaler.needs_upscaling(30, 20));
        assert_eq!(scaler.scale_for_ocr(&img).scale_factor, 1.0);
    }

    #[test]
    fn test_factor_at_or_below_one_keeps_pixels() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(17, 11, |x, y| {
            image::Rgb([(x * 15) as u8, (y * 23) as u8, ((x + y) * 7) as u8])
        }));

        for factor in [1.0, 0.5, f32::NAN] {
            let result = upscale(&img, factor);
            assert_eq!(result.color(), img.color(), "factor {factor}");
            assert_eq!(result.to_rgb8(), img.to_rgb8(), "factor {factor}");
        }
    }
}
