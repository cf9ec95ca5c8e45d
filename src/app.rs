//! # Application Runner
//!
//! One complete run: load the image, execute the pipeline, write the
//! artifacts. Output failures are reported per file and never abort the
//! remaining writes.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::engine::RecognitionEngine;
use crate::errors::{AppError, AppResult};
use crate::input::load_image;
use crate::observability::{output_span, pipeline_span};
use crate::ocr_config::{OcrConfig, PreprocessingMode, IMAGE_OUTPUT_FILE, TEXT_OUTPUT_FILE};
use crate::output::{save_debug_variants, save_image_jpeg, save_text};
use crate::pipeline::{OcrPipeline, PipelineOutcome, DEFAULT_FALLBACK_MESSAGE};

/// What the user asked for
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub image_path: PathBuf,
    pub mode: PreprocessingMode,
}

/// Result of writing one output file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutputStatus {
    Saved { path: String },
    Failed { error: String },
}

impl OutputStatus {
    fn from_result(result: AppResult<PathBuf>) -> Self {
        match result {
            Ok(path) => OutputStatus::Saved {
                path: path.display().to_string(),
            },
            Err(e) => OutputStatus::Failed {
                error: e.to_string(),
            },
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, OutputStatus::Saved { .. })
    }
}

/// Debug image written for one variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugOutput {
    pub variant: String,
    #[serde(flatten)]
    pub status: OutputStatus,
}

/// Summary of a finished run, printable as JSON
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub image: String,
    pub mode: String,
    pub text: String,
    pub boxes: usize,
    pub fallback: bool,
    pub fallback_reason: Option<String>,
    /// Variant and profile that produced the text
    pub selected_variant: Option<String>,
    pub selected_profile: Option<String>,
    pub text_output: OutputStatus,
    pub image_output: OutputStatus,
    pub debug_outputs: Vec<DebugOutput>,
}

impl RunReport {
    /// True when every requested file was written
    pub fn all_outputs_saved(&self) -> bool {
        self.text_output.is_saved()
            && self.image_output.is_saved()
            && self.debug_outputs.iter().all(|d| d.status.is_saved())
    }
}

/// Run the pipeline for one request and write its outputs to `config.output_dir`.
///
/// # Errors
///
/// Returns [`AppError::Validation`] when the image cannot be read and
/// [`AppError::Preprocessing`] when no variant could be built. Nothing is
/// written in either case.
pub fn run(
    request: &RunRequest,
    engine: &dyn RecognitionEngine,
    config: &OcrConfig,
    fallback_message: Option<&str>,
) -> AppResult<RunReport> {
    let image_display = request.image_path.display().to_string();
    let span = pipeline_span(request.mode.as_str(), &image_display);
    let _guard = span.enter();

    let original = load_image(&request.image_path)?;

    let pipeline = OcrPipeline::new(engine, config)
        .with_fallback_message(fallback_message.unwrap_or(DEFAULT_FALLBACK_MESSAGE));
    let outcome = pipeline.run(&original, request.mode)?;

    let report = write_outputs(&image_display, &outcome, &config.output_dir);
    info!(
        fallback = report.fallback,
        boxes = report.boxes,
        all_saved = report.all_outputs_saved(),
        "Run finished"
    );
    Ok(report)
}

/// Write text, annotated image and, for enhanced non-fallback runs, debug images.
pub fn write_outputs(image: &str, outcome: &PipelineOutcome, output_dir: &Path) -> RunReport {
    let span = output_span(&output_dir.display().to_string());
    let _guard = span.enter();

    let text_output = OutputStatus::from_result(save_text(
        &output_dir.join(TEXT_OUTPUT_FILE),
        &outcome.text,
    ));
    let image_output = OutputStatus::from_result(save_image_jpeg(
        &output_dir.join(IMAGE_OUTPUT_FILE),
        &outcome.image,
    ));

    let debug_outputs = if outcome.mode == PreprocessingMode::Enhanced && !outcome.is_fallback() {
        save_debug_variants(output_dir, &outcome.variants)
            .into_iter()
            .map(|(variant, result)| {
                if let Err(e) = &result {
                    warn!(variant = %variant, error = %e, "Debug image not saved");
                }
                DebugOutput {
                    variant,
                    status: OutputStatus::from_result(result),
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    let selected = outcome
        .transcription
        .as_ref()
        .and_then(|t| t.selected_attempt());

    RunReport {
        image: image.to_string(),
        mode: outcome.mode.as_str().to_string(),
        text: outcome.text.clone(),
        boxes: outcome.boxes,
        fallback: outcome.is_fallback(),
        fallback_reason: outcome.fallback_reason.clone(),
        selected_variant: selected.map(|a| a.variant.clone()),
        selected_profile: selected.map(|a| a.profile.clone()),
        text_output,
        image_output,
        debug_outputs,
    }
}

/// Whether an error should end the process with a failure exit code
pub fn is_input_error(error: &AppError) -> bool {
    matches!(
        error,
        AppError::Validation(_) | AppError::Config(_) | AppError::Preprocessing(_)
    )
}

