//! # Pindai OCR
//!
//! Reads text from a photographed or scanned image with the Tesseract
//! engine. The image is normalized and binarized several ways, every
//! variant is recognized with several page-segmentation profiles and the
//! best transcription is corrected and saved. Recognized words are drawn
//! as boxes on a copy of the original image.
//!
//! When Tesseract cannot be found the run still completes: the text file
//! is empty and the image carries a fallback banner.

pub mod annotation;
pub mod app;
pub mod engine;
pub mod error_correction;
pub mod errors;
pub mod input;
pub mod localization;
pub mod observability;
pub mod ocr_config;
pub mod ocr_errors;
pub mod output;
pub mod pipeline;
pub mod preprocessing;
pub mod recognition;

// Re-export types for easier access
pub use app::{run, RunReport, RunRequest};
pub use engine::{RecognitionEngine, TesseractEngine, Token};
pub use errors::{AppError, AppResult};
pub use ocr_config::{OcrConfig, PreprocessingMode};
pub use pipeline::{OcrPipeline, PipelineOutcome};
