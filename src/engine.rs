//! # Recognition Engine Module
//!
//! This module defines the two-operation contract the pipeline needs from a
//! text recognizer and its Tesseract implementation.
//!
//! ## Engine contract
//!
//! - [`RecognitionEngine::recognize_text`]: plain text for a whole image
//! - [`RecognitionEngine::recognize_tokens`]: word-level boxes with confidences
//!
//! Both receive an opaque configuration string (for Tesseract:
//! `"-l ind+eng --oem 3 --psm 6"`). An engine that cannot be started at all
//! reports [`OcrError::EngineUnavailable`]; every other failure is local to
//! the call.
//!
//! ## Tesseract
//!
//! [`TesseractEngine`] drives the `tesseract` executable: each call writes the
//! image to a temporary PNG, runs `tesseract <png> stdout <config> [tsv]` and
//! parses standard output.

use image::GrayImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::ocr_config::OcrConfig;
use crate::ocr_errors::OcrError;

/// One word reported by the engine in token mode, in the coordinate space of
/// the image that was recognized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub text: String,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    /// Confidence in 0-100; `None` when the engine declined to score the token
    pub confidence: Option<f32>,
}

/// Text recognizer consumed by the pipeline.
pub trait RecognitionEngine {
    /// Recognize the whole image as plain text.
    fn recognize_text(&self, image: &GrayImage, config: &str) -> Result<String, OcrError>;

    /// Recognize the image word by word with bounding boxes.
    fn recognize_tokens(&self, image: &GrayImage, config: &str) -> Result<Vec<Token>, OcrError>;
}

/// Well-known install locations checked when `tesseract` is not on the search path
const WELL_KNOWN_LOCATIONS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

/// Finds the tesseract executable.
///
/// Lookup order: the explicit path (when it exists), the search path, then
/// [`WELL_KNOWN_LOCATIONS`].
pub fn locate_tesseract(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        debug!(path = %path.display(), "Configured tesseract path does not exist");
    }

    if let Ok(path) = which::which("tesseract") {
        return Some(path);
    }

    WELL_KNOWN_LOCATIONS
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.is_file())
}

/// Tesseract command-line engine.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: PathBuf,
    located: bool,
}

impl TesseractEngine {
    /// Engine bound to a specific executable.
    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            located: true,
        }
    }

    /// Engine resolved from `config.tesseract_cmd` and the usual locations.
    ///
    /// When nothing is found the engine still runs plain `tesseract`, so the
    /// first call reports [`OcrError::EngineUnavailable`] and the run falls
    /// back instead of aborting early.
    pub fn from_config(config: &OcrConfig) -> Self {
        match locate_tesseract(config.tesseract_cmd.as_deref()) {
            Some(command) => {
                info!(command = %command.display(), "Using tesseract executable");
                Self {
                    command,
                    located: true,
                }
            }
            None => Self {
                command: PathBuf::from("tesseract"),
                located: false,
            },
        }
    }

    /// Whether an executable was found during discovery
    pub fn is_located(&self) -> bool {
        self.located
    }

    /// Run tesseract on `image` with the given config and optional output format.
    fn run(&self, image: &GrayImage, config: &str, format: Option<&str>) -> Result<String, OcrError> {
        let start_time = std::time::Instant::now();

        let temp = tempfile::Builder::new()
            .prefix("pindai-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::ImageLoad(format!("cannot create temporary image: {e}")))?;
        image
            .save_with_format(temp.path(), image::ImageFormat::Png)
            .map_err(|e| OcrError::ImageLoad(format!("cannot write temporary image: {e}")))?;

        let mut command = Command::new(&self.command);
        command.arg(temp.path()).arg("stdout");
        command.args(config.split_whitespace());
        if let Some(format) = format {
            command.arg(format);
        }

        let output = match command.output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::EngineUnavailable(format!(
                    "{} not found (install tesseract-ocr)",
                    self.command.display()
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(OcrError::EngineUnavailable(format!(
                    "{} cannot be executed: {e}",
                    self.command.display()
                )));
            }
            Err(e) => return Err(OcrError::Extraction(format!("failed to run tesseract: {e}"))),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(stderr.trim()));
        }

        debug!(
            config = %config,
            format = ?format,
            duration_ms = start_time.elapsed().as_millis(),
            "tesseract call finished"
        );

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Map tesseract's stderr on a non-zero exit to an error kind.
fn classify_failure(stderr: &str) -> OcrError {
    if stderr.contains("Failed loading language") || stderr.contains("Error opening data file") {
        OcrError::UnsupportedLanguage(stderr.to_string())
    } else {
        OcrError::Extraction(format!("tesseract failed: {stderr}"))
    }
}

impl RecognitionEngine for TesseractEngine {
    fn recognize_text(&self, image: &GrayImage, config: &str) -> Result<String, OcrError> {
        self.run(image, config, None)
    }

    fn recognize_tokens(&self, image: &GrayImage, config: &str) -> Result<Vec<Token>, OcrError> {
        let tsv = self.run(image, config, Some("tsv"))?;
        parse_tsv(&tsv)
    }
}

/// Parse tesseract TSV output into word tokens.
///
/// Only word rows (level 5) are kept. A confidence of -1 becomes `None`.
/// Rows with fewer than 11 columns are skipped; text may be missing on
/// rows where tesseract found nothing.
pub fn parse_tsv(tsv: &str) -> Result<Vec<Token>, OcrError> {
    let mut lines = tsv.lines();
    match lines.next() {
        Some(header) if header.starts_with("level") => {}
        Some(other) if !other.trim().is_empty() => {
            return Err(OcrError::Parse(format!("unexpected TSV header: {other}")));
        }
        _ => return Ok(Vec::new()),
    }

    let mut tokens = Vec::new();
    for row in lines {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 11 {
            continue;
        }
        if cols[0].trim() != "5" {
            continue;
        }

        let number = |idx: usize| -> Result<u32, OcrError> {
            cols[idx]
                .trim()
                .parse::<u32>()
                .map_err(|_| OcrError::Parse(format!("bad coordinate '{}' in row: {row}", cols[idx])))
        };
        let confidence = cols[10]
            .trim()
            .parse::<f32>()
            .map_err(|_| OcrError::Parse(format!("bad confidence '{}' in row: {row}", cols[10])))?;

        tokens.push(Token {
            text: cols.get(11).map(|t| t.to_string()).unwrap_or_default(),
            left: number(6)?,
            top: number(7)?,
            width: number(8)?,
            height: number(9)?,
            confidence: (confidence >= 0.0).then_some(confidence),
        });
    }

    Ok(tokens)
}
