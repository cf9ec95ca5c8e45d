//! # Shared Types for Image Preprocessing
//!
//! This module contains all the shared types, structs, and enums used across
//! the preprocessing sub-modules.

use image::{DynamicImage, GrayImage};

/// Errors that can occur during image preprocessing operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessingError {
    /// A parameter was outside its accepted range
    InvalidParameter { message: String },
    /// Image processing operation failed
    ProcessingFailed { message: String },
    /// Every binarization strategy failed
    NoVariants,
}

impl std::fmt::Display for PreprocessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessingError::InvalidParameter { message } => {
                write!(f, "Invalid preprocessing parameter: {}", message)
            }
            PreprocessingError::ProcessingFailed { message } => {
                write!(f, "Image processing failed: {}", message)
            }
            PreprocessingError::NoVariants => {
                write!(f, "No binarization strategy produced a usable image")
            }
        }
    }
}

impl std::error::Error for PreprocessingError {}

/// Thresholding policy that produced a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// Otsu threshold over the whole image
    GlobalThreshold,
    /// Local mean threshold
    AdaptiveThreshold,
    /// CLAHE followed by Otsu
    ContrastEqualizedThreshold,
    /// Blur, Otsu, opening and closing (standard mode)
    OtsuMorphology,
}

impl VariantKind {
    /// Stable name used in logs and debug artifact file names
    pub fn name(&self) -> &'static str {
        match self {
            VariantKind::GlobalThreshold => "global-threshold",
            VariantKind::AdaptiveThreshold => "adaptive-threshold",
            VariantKind::ContrastEqualizedThreshold => "contrast-equalized-threshold",
            VariantKind::OtsuMorphology => "otsu-morphology",
        }
    }
}

impl std::fmt::Display for VariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A named binarized rendering of the source image.
///
/// Pixels are always 0 or 255.
#[derive(Debug, Clone)]
pub struct PreprocessingVariant {
    pub kind: VariantKind,
    pub image: GrayImage,
}

impl PreprocessingVariant {
    pub fn new(kind: VariantKind, image: GrayImage) -> Self {
        Self { kind, image }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// True when every pixel is either 0 or 255
    pub fn is_binary(&self) -> bool {
        self.image.pixels().all(|p| p[0] == 0 || p[0] == 255)
    }
}

/// Result of the OCR upscaling check.
#[derive(Debug, Clone)]
pub struct ScaledImageResult {
    /// The (possibly) scaled image
    pub image: DynamicImage,
    /// Original image dimensions (width, height)
    pub original_dimensions: (u32, u32),
    /// New image dimensions (width, height)
    pub new_dimensions: (u32, u32),
    /// Scale factor applied (1.0 when untouched)
    pub scale_factor: f32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of image thresholding operation.
#[derive(Debug, Clone)]
pub struct ThresholdedImageResult {
    /// The thresholded binary image
    pub image: GrayImage,
    /// Threshold value found by Otsu's method; `None` for local thresholds
    pub threshold: Option<u8>,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of morphological operations on binary images.
#[derive(Debug, Clone)]
pub struct MorphologicalImageResult {
    /// The morphologically processed image
    pub image: GrayImage,
    /// Type of morphological operation applied
    pub operation: MorphologicalOperation,
    /// Kernel size used (e.g., 3 for 3x3 kernel)
    pub kernel_size: u32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Types of morphological operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MorphologicalOperation {
    /// Erosion operation (shrinks bright regions)
    Erosion,
    /// Dilation operation (expands bright regions)
    Dilation,
    /// Opening operation (erosion followed by dilation - removes noise)
    Opening,
    /// Closing operation (dilation followed by erosion - fills gaps)
    Closing,
}

/// Result of CLAHE contrast enhancement operation.
#[derive(Debug, Clone)]
pub struct ClaheImageResult {
    /// The contrast-enhanced image
    pub image: GrayImage,
    /// Clip limit used for histogram clipping
    pub clip_limit: f32,
    /// Tile grid used for local histogram equalization (columns, rows)
    pub grid: (u32, u32),
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}
