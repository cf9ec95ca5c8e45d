//! # Binarization Strategy Set
//!
//! Produces the ordered list of black/white renderings that the recognizer is
//! run against. Each strategy is independent; one that fails is logged and
//! left out, and only an empty result is an error.

use image::{DynamicImage, GrayImage};
use tracing::{info, warn};

use super::filtering::{apply_clahe, apply_morphological_operation, reduce_noise};
use super::thresholding::{apply_adaptive_threshold, apply_otsu_threshold};
use super::types::{MorphologicalOperation, PreprocessingError, PreprocessingVariant, VariantKind};
use crate::errors::error_logging;
use crate::ocr_config::PreprocessingParams;

/// Strategies used in enhanced mode, primary first.
pub const ENHANCED_STRATEGIES: [VariantKind; 3] = [
    VariantKind::GlobalThreshold,
    VariantKind::AdaptiveThreshold,
    VariantKind::ContrastEqualizedThreshold,
];

impl VariantKind {
    /// Binarize a normalized grayscale image with this strategy.
    pub fn apply(
        &self,
        gray: &GrayImage,
        params: &PreprocessingParams,
    ) -> Result<GrayImage, PreprocessingError> {
        match self {
            VariantKind::GlobalThreshold => Ok(apply_otsu_threshold(gray)?.image),
            VariantKind::AdaptiveThreshold => Ok(apply_adaptive_threshold(
                gray,
                params.adaptive_block_size,
                params.adaptive_bias,
            )?
            .image),
            VariantKind::ContrastEqualizedThreshold => {
                let equalized = apply_clahe(gray, params.clahe_clip_limit, params.clahe_grid)?;
                Ok(apply_otsu_threshold(&equalized.image)?.image)
            }
            VariantKind::OtsuMorphology => {
                let blurred = reduce_noise(gray, params.standard_blur_sigma)?;
                let binary = apply_otsu_threshold(&blurred)?.image;
                let opened =
                    apply_morphological_operation(&binary, MorphologicalOperation::Opening)?;
                Ok(apply_morphological_operation(&opened.image, MorphologicalOperation::Closing)?
                    .image)
            }
        }
    }
}

/// Builds the enhanced-mode variant set from a tonally normalized image.
///
/// # Errors
///
/// `PreprocessingError::NoVariants` when every strategy failed.
pub fn build_variants(
    normalized: &GrayImage,
    params: &PreprocessingParams,
) -> Result<Vec<PreprocessingVariant>, PreprocessingError> {
    build_variants_with(normalized, params, &ENHANCED_STRATEGIES)
}

/// Runs `strategies` in order, keeping every one that succeeds.
pub fn build_variants_with(
    gray: &GrayImage,
    params: &PreprocessingParams,
    strategies: &[VariantKind],
) -> Result<Vec<PreprocessingVariant>, PreprocessingError> {
    let start_time = std::time::Instant::now();
    let mut variants = Vec::with_capacity(strategies.len());

    for kind in strategies {
        match kind.apply(gray, params) {
            Ok(image) => variants.push(PreprocessingVariant::new(*kind, image)),
            Err(e) => {
                warn!(strategy = %kind, error = %e, "Binarization strategy failed, skipping");
                error_logging::log_preprocessing_error(
                    &e,
                    "build_variants",
                    kind.name(),
                    Some(gray.dimensions()),
                );
            }
        }
    }

    if variants.is_empty() {
        return Err(PreprocessingError::NoVariants);
    }

    info!(
        variants = variants.len(),
        requested = strategies.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Binarization variants ready"
    );

    Ok(variants)
}

/// Single-variant pipeline of standard mode: grayscale, blur, Otsu, opening
/// then closing.
pub fn build_standard_variant(
    image: &DynamicImage,
    params: &PreprocessingParams,
) -> Result<Vec<PreprocessingVariant>, PreprocessingError> {
    build_variants_with(&image.to_luma8(), params, &[VariantKind::OtsuMorphology])
}
