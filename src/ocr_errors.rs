//! # OCR Error Types Module
//!
//! This module defines the error types raised by the recognition engine and the
//! stages that call it. The split between [`OcrError::EngineUnavailable`] and the
//! other variants drives the pipeline's recovery policy: the former ends the
//! recognition phase of a run, every other variant is local to one attempt.

/// Custom error types for OCR operations
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// The engine executable cannot be located or started at all
    EngineUnavailable(String),
    /// The engine ran but the requested language data is not installed
    UnsupportedLanguage(String),
    /// Image could not be handed to the engine
    ImageLoad(String),
    /// Text extraction failed for one request
    Extraction(String),
    /// Engine output could not be parsed
    Parse(String),
}

impl OcrError {
    /// Whether this error makes every further engine call pointless for the run
    pub fn is_engine_unavailable(&self) -> bool {
        matches!(self, OcrError::EngineUnavailable(_))
    }

    /// Whether the engine rejected the requested language data
    pub fn is_unsupported_language(&self) -> bool {
        matches!(self, OcrError::UnsupportedLanguage(_))
    }
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::EngineUnavailable(msg) => {
                write!(f, "[OCR_UNAVAILABLE] Recognition engine is not available: {}", msg)
            }
            OcrError::UnsupportedLanguage(msg) => {
                write!(f, "[OCR_LANGUAGE] Language data not supported by the engine: {}", msg)
            }
            OcrError::ImageLoad(msg) => {
                write!(f, "[IMAGE_LOAD] Failed to load image for OCR processing: {}", msg)
            }
            OcrError::Extraction(msg) => {
                write!(f, "[OCR_EXTRACT] Text extraction from image failed: {}", msg)
            }
            OcrError::Parse(msg) => write!(f, "[OCR_PARSE] Engine output could not be parsed: {}", msg),
        }
    }
}

impl std::error::Error for OcrError {}
