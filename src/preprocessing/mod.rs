//! # Image Preprocessing Module
//!
//! This module turns a photographed document into binarized images that the
//! recognition engine reads reliably.
//!
//! The module is organized into focused sub-modules:
//! - `scaling`: Upscaling of low-resolution photos
//! - `normalization`: Grayscale, unsharp mask, contrast stretch and bilateral smoothing
//! - `thresholding`: Otsu and local mean binarization
//! - `filtering`: Noise reduction, morphology, CLAHE and the bilateral filter
//! - `variants`: The ordered set of binarization strategies
//! - `types`: Shared types and error definitions

pub mod filtering;
pub mod normalization;
pub mod scaling;
pub mod thresholding;
pub mod types;
pub mod variants;

// Re-export commonly used types and functions for convenience
pub use types::{
    ClaheImageResult, MorphologicalImageResult, MorphologicalOperation, PreprocessingError,
    PreprocessingVariant, ScaledImageResult, ThresholdedImageResult, VariantKind,
};

// Re-export main functions from sub-modules
pub use filtering::{
    apply_bilateral_filter, apply_clahe, apply_morphological_operation, reduce_noise,
};
pub use normalization::{normalize_tone, stretch_contrast, unsharp_mask};
pub use scaling::{upscale, ImageScaler};
pub use thresholding::{apply_adaptive_threshold, apply_otsu_threshold, binarize};
pub use variants::{build_standard_variant, build_variants, build_variants_with, ENHANCED_STRATEGIES};
