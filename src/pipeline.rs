//! # OCR Pipeline
//!
//! Wires the stages together for one image:
//!
//! ```text
//! original -> [upscale] -> normalize -> variants -> orchestrator -> corrector -> text
//!                                          \-> primary variant -> annotation mapper -> image
//! ```
//!
//! Standard mode replaces the first three stages with the single
//! blur/Otsu/morphology variant and recognizes it with one profile.
//!
//! When the engine is unavailable the orchestrator and the annotation mapper
//! are replaced as a unit by the fallback banner, and the text is empty.

use ab_glyph::FontVec;
use image::{DynamicImage, RgbImage};
use tracing::{info, warn};

use crate::annotation::{load_font, render_fallback, AnnotationMapper};
use crate::engine::RecognitionEngine;
use crate::error_correction::TextCorrector;
use crate::errors::{error_logging, AppResult};
use crate::ocr_config::{OcrConfig, PreprocessingMode, RecognitionProfile};
use crate::ocr_errors::OcrError;
use crate::preprocessing::{
    build_standard_variant, build_variants, normalize_tone, ImageScaler, PreprocessingVariant,
};
use crate::recognition::{LanguageSet, RecognitionOrchestrator, Transcription};

/// Banner text used when no localized message is supplied
pub const DEFAULT_FALLBACK_MESSAGE: &str = "Fallback: Tesseract tidak tersedia - OCR dilewati";

/// Everything a run produced, before anything is written to disk.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub mode: PreprocessingMode,
    /// Corrected text; empty in fallback runs
    pub text: String,
    /// Annotated or fallback image, same size as the original
    pub image: RgbImage,
    pub boxes: usize,
    /// Why the run fell back, when it did
    pub fallback_reason: Option<String>,
    pub transcription: Option<Transcription>,
    /// Binarized variants, primary first
    pub variants: Vec<PreprocessingVariant>,
    /// Upscale factor applied before normalization (1.0 when none)
    pub scale_factor: f32,
}

impl PipelineOutcome {
    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// One configured pipeline bound to an engine.
pub struct OcrPipeline<'a> {
    engine: &'a dyn RecognitionEngine,
    config: &'a OcrConfig,
    corrector: TextCorrector,
    font: Option<FontVec>,
    fallback_message: String,
}

impl<'a> OcrPipeline<'a> {
    /// Pipeline with the default correction table and a font found on the system.
    pub fn new(engine: &'a dyn RecognitionEngine, config: &'a OcrConfig) -> Self {
        Self {
            engine,
            config,
            corrector: TextCorrector::default(),
            font: load_font(config.font_path.as_deref()),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }

    pub fn with_corrector(mut self, corrector: TextCorrector) -> Self {
        self.corrector = corrector;
        self
    }

    /// Override the font; `None` disables label and banner text
    pub fn with_font(mut self, font: Option<FontVec>) -> Self {
        self.font = font;
        self
    }

    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }

    fn languages(&self) -> LanguageSet {
        LanguageSet::new(
            self.config.languages.clone(),
            self.config.fallback_languages.clone(),
        )
    }

    /// Build the variants and the profile list for a mode.
    fn prepare(
        &self,
        original: &DynamicImage,
        mode: PreprocessingMode,
    ) -> AppResult<(Vec<PreprocessingVariant>, Vec<RecognitionProfile>, f32)> {
        let params = &self.config.preprocessing;
        match mode {
            PreprocessingMode::Standard => Ok((
                build_standard_variant(original, params)?,
                vec![self.config.annotation_profile.clone()],
                1.0,
            )),
            PreprocessingMode::Enhanced => {
                let scaler =
                    ImageScaler::with_params(self.config.min_dimension, self.config.upscale_factor)?;
                let scaled = scaler.scale_for_ocr(original);
                let normalized = normalize_tone(&scaled.image, params)?;
                Ok((
                    build_variants(&normalized, params)?,
                    self.config.profiles.clone(),
                    scaled.scale_factor,
                ))
            }
        }
    }

    /// Run every stage on a decoded image.
    ///
    /// # Errors
    ///
    /// Only preprocessing failures (no usable variant) are returned; engine
    /// trouble ends in a fallback outcome instead.
    pub fn run(&self, original: &DynamicImage, mode: PreprocessingMode) -> AppResult<PipelineOutcome> {
        let start_time = std::time::Instant::now();

        let (variants, profiles, scale_factor) = self.prepare(original, mode).inspect_err(|e| {
            error_logging::log_preprocessing_error(
                e,
                "prepare",
                mode.as_str(),
                Some((original.width(), original.height())),
            );
        })?;

        let languages = self.languages();
        let orchestrator = RecognitionOrchestrator::new(self.engine, languages.clone());

        let transcription = match orchestrator.recognize(&variants, &profiles) {
            Ok(transcription) => transcription,
            Err(e) => return Ok(self.fallback(original, mode, variants, scale_factor, e)),
        };

        let text = self.corrector.correct(&transcription.text);

        let mapper = AnnotationMapper::new(
            self.engine,
            languages,
            self.config.confidence_threshold,
            self.config.label_max_chars,
            self.font.as_ref(),
        );
        // Variants are never empty here: preprocessing fails otherwise
        let primary = &variants[0];
        let (image, boxes) =
            match mapper.annotate(original, primary, &self.config.annotation_profile) {
                Ok(annotation) => (annotation.image, annotation.boxes),
                Err(e) if e.is_engine_unavailable() => {
                    return Ok(self.fallback(original, mode, variants, scale_factor, e));
                }
                Err(e) => {
                    warn!(error = %e, "Token recognition failed, saving image without boxes");
                    (original.to_rgb8(), 0)
                }
            };

        info!(
            mode = %mode,
            variants = variants.len(),
            chars = text.chars().count(),
            boxes,
            duration_ms = start_time.elapsed().as_millis(),
            "Pipeline finished"
        );

        Ok(PipelineOutcome {
            mode,
            text,
            image,
            boxes,
            fallback_reason: None,
            transcription: Some(transcription),
            variants,
            scale_factor,
        })
    }

    fn fallback(
        &self,
        original: &DynamicImage,
        mode: PreprocessingMode,
        variants: Vec<PreprocessingVariant>,
        scale_factor: f32,
        error: OcrError,
    ) -> PipelineOutcome {
        warn!(error = %error, "Recognition engine unavailable, switching to fallback output");

        PipelineOutcome {
            mode,
            text: String::new(),
            image: render_fallback(original, &self.fallback_message, self.font.as_ref()),
            boxes: 0,
            fallback_reason: Some(error.to_string()),
            transcription: None,
            variants,
            scale_factor,
        }
    }
}
