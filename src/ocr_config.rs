//! # OCR Configuration Module
//!
//! This module defines configuration structures for the recognition pipeline,
//! including engine profiles, preprocessing constants and output locations.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

// Constants for OCR configuration
pub const DEFAULT_LANGUAGES: &str = "ind+eng";
pub const DEFAULT_FALLBACK_LANGUAGES: &str = "eng";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 60.0;
pub const MIN_DIMENSION: u32 = 1500; // Upscale when either side is below this
pub const UPSCALE_FACTOR: f32 = 2.0;
pub const LABEL_MAX_CHARS: usize = 25;
pub const TEXT_OUTPUT_FILE: &str = "hasil_teks.txt";
pub const IMAGE_OUTPUT_FILE: &str = "hasil_deteksi.jpg";
pub const DEFAULT_LOCALE: &str = "id";

/// Tesseract OCR engine mode 3: whatever the installed language data supports
pub const DEFAULT_ENGINE_MODE: &str = "3";

/// Page layout assumptions the recognition profiles are built from
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSegMode {
    /// Fully automatic page segmentation
    #[default]
    Auto = 3,
    /// Assume a single column of text
    SingleColumn = 4,
    /// Assume a single uniform block of text
    SingleBlock = 6,
}

impl PageSegMode {
    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
        }
    }

    /// Short layout description used as the profile name
    pub fn layout_name(&self) -> &'static str {
        match self {
            PageSegMode::Auto => "auto-layout",
            PageSegMode::SingleColumn => "single-column",
            PageSegMode::SingleBlock => "single-block",
        }
    }
}

/// Engine configuration string paired with a readable name.
///
/// The `config` string is handed to the engine untouched, so alternative
/// engines may use any syntax they understand.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RecognitionProfile {
    pub name: String,
    pub config: String,
}

impl RecognitionProfile {
    /// Build a Tesseract profile for a layout assumption
    pub fn tesseract(psm: PageSegMode) -> Self {
        Self {
            name: psm.layout_name().to_string(),
            config: format!("--oem {} --psm {}", DEFAULT_ENGINE_MODE, psm.as_str()),
        }
    }

    /// Single uniform block of text, used for annotation and standard mode
    pub fn single_block() -> Self {
        Self::tesseract(PageSegMode::SingleBlock)
    }

    /// The fixed, ordered profile list tried for every variant
    pub fn default_profiles() -> Vec<Self> {
        vec![
            Self::tesseract(PageSegMode::Auto),
            Self::tesseract(PageSegMode::SingleBlock),
            Self::tesseract(PageSegMode::SingleColumn),
        ]
    }
}

/// Preprocessing mode selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreprocessingMode {
    /// Single Otsu + morphology variant, single profile
    Standard,
    /// Upscaling, tonal normalization, three variants, all profiles
    #[default]
    Enhanced,
}

impl PreprocessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreprocessingMode::Standard => "standard",
            PreprocessingMode::Enhanced => "enhanced",
        }
    }
}

impl std::fmt::Display for PreprocessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreprocessingMode {
    type Err = crate::errors::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "standar" | "std" | "1" | "s" => Ok(PreprocessingMode::Standard),
            "enhanced" | "2" | "e" | "" => Ok(PreprocessingMode::Enhanced),
            other => Err(crate::errors::AppError::Config(format!(
                "unknown preprocessing mode '{}', expected 'standard' or 'enhanced'",
                other
            ))),
        }
    }
}

/// Fixed image-processing constants
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingParams {
    /// Gaussian sigma for the unsharp mask
    pub unsharp_sigma: f32,
    /// Weight of the original image in the unsharp blend
    pub unsharp_amount: f32,
    /// Bilateral window radius (window is 2r+1)
    pub bilateral_radius: u32,
    /// Bilateral intensity sigma
    pub bilateral_sigma_color: f32,
    /// Bilateral spatial sigma
    pub bilateral_sigma_space: f32,
    /// Side of the square neighbourhood for adaptive thresholding (odd)
    pub adaptive_block_size: u32,
    /// Constant subtracted from the local mean
    pub adaptive_bias: i32,
    /// CLAHE clip limit
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid (columns, rows)
    pub clahe_grid: (u32, u32),
    /// Gaussian sigma used by the standard mode before Otsu
    pub standard_blur_sigma: f32,
}

impl Default for PreprocessingParams {
    fn default() -> Self {
        Self {
            unsharp_sigma: 1.0,
            unsharp_amount: 1.5, // blurred copy gets 1.0 - amount
            bilateral_radius: 4,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
            adaptive_block_size: 31,
            adaptive_bias: 10,
            clahe_clip_limit: 2.0,
            clahe_grid: (8, 8),
            standard_blur_sigma: 1.1, // roughly a 5x5 kernel
        }
    }
}

impl PreprocessingParams {
    pub fn validate(&self) -> crate::errors::AppResult<()> {
        if self.unsharp_sigma <= 0.0 {
            return Err(crate::errors::AppError::Config(
                "unsharp_sigma must be greater than 0".to_string(),
            ));
        }
        if self.unsharp_amount < 1.0 {
            return Err(crate::errors::AppError::Config(format!(
                "unsharp_amount ({}) must be >= 1.0",
                self.unsharp_amount
            )));
        }
        if self.bilateral_sigma_color <= 0.0 || self.bilateral_sigma_space <= 0.0 {
            return Err(crate::errors::AppError::Config(
                "bilateral sigmas must be greater than 0".to_string(),
            ));
        }
        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            return Err(crate::errors::AppError::Config(format!(
                "adaptive_block_size ({}) must be an odd number >= 3",
                self.adaptive_block_size
            )));
        }
        if self.clahe_clip_limit <= 0.0 {
            return Err(crate::errors::AppError::Config(
                "clahe_clip_limit must be greater than 0".to_string(),
            ));
        }
        if self.clahe_grid.0 == 0 || self.clahe_grid.1 == 0 {
            return Err(crate::errors::AppError::Config(
                "clahe_grid dimensions must be greater than 0".to_string(),
            ));
        }
        if self.standard_blur_sigma <= 0.0 {
            return Err(crate::errors::AppError::Config(
                "standard_blur_sigma must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration structure for OCR processing
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// OCR language codes (e.g., "eng", "ind+eng")
    pub languages: String,
    /// Narrower language set retried when an attempt fails
    pub fallback_languages: Option<String>,
    /// Profiles tried for every variant in enhanced mode
    pub profiles: Vec<RecognitionProfile>,
    /// Profile used for token extraction and standard mode
    pub annotation_profile: RecognitionProfile,
    /// Minimum token confidence (0-100, inclusive) for a box to be drawn
    pub confidence_threshold: f32,
    /// Upscale when either dimension is below this many pixels
    pub min_dimension: u32,
    /// Scale factor used when upscaling
    pub upscale_factor: f32,
    /// Maximum characters of a box label
    pub label_max_chars: usize,
    /// Image-processing constants
    pub preprocessing: PreprocessingParams,
    /// Directory receiving the output files
    pub output_dir: PathBuf,
    /// Font used for labels and the fallback banner
    pub font_path: Option<PathBuf>,
    /// Explicit tesseract executable
    pub tesseract_cmd: Option<PathBuf>,
    /// Console message locale ("id" or "en")
    pub locale: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.to_string(),
            fallback_languages: Some(DEFAULT_FALLBACK_LANGUAGES.to_string()),
            profiles: RecognitionProfile::default_profiles(),
            annotation_profile: RecognitionProfile::single_block(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            min_dimension: MIN_DIMENSION,
            upscale_factor: UPSCALE_FACTOR,
            label_max_chars: LABEL_MAX_CHARS,
            preprocessing: PreprocessingParams::default(),
            output_dir: PathBuf::from("."),
            font_path: None,
            tesseract_cmd: None,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl OcrConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let fallback_languages = match std::env::var("OCR_FALLBACK_LANGUAGES") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value.trim().to_string()),
            Err(_) => defaults.fallback_languages.clone(),
        };

        Self {
            languages: std::env::var("OCR_LANGUAGES")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.languages),
            fallback_languages,
            confidence_threshold: env_or(
                "OCR_CONFIDENCE_THRESHOLD",
                defaults.confidence_threshold,
            ),
            min_dimension: env_or("OCR_MIN_DIMENSION", defaults.min_dimension),
            upscale_factor: env_or("OCR_UPSCALE_FACTOR", defaults.upscale_factor),
            output_dir: std::env::var("OCR_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            font_path: std::env::var("OCR_FONT_PATH").ok().map(PathBuf::from),
            tesseract_cmd: std::env::var("TESSERACT_CMD").ok().map(PathBuf::from),
            locale: std::env::var("OCR_LOCALE").unwrap_or(defaults.locale),
            ..defaults
        }
    }

    /// Validate OCR configuration parameters
    pub fn validate(&self) -> crate::errors::AppResult<()> {
        if self.languages.trim().is_empty() {
            return Err(crate::errors::AppError::Config(
                "languages cannot be empty".to_string(),
            ));
        }
        if let Some(fallback) = &self.fallback_languages {
            if fallback.trim().is_empty() {
                return Err(crate::errors::AppError::Config(
                    "fallback_languages cannot be blank when set".to_string(),
                ));
            }
        }
        if self.profiles.is_empty() {
            return Err(crate::errors::AppError::Config(
                "at least one recognition profile is required".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.confidence_threshold) {
            return Err(crate::errors::AppError::Config(format!(
                "confidence_threshold ({}) must be within 0-100",
                self.confidence_threshold
            )));
        }
        if !self.upscale_factor.is_finite() || self.upscale_factor < 1.0 {
            return Err(crate::errors::AppError::Config(format!(
                "upscale_factor ({}) must be >= 1.0",
                self.upscale_factor
            )));
        }
        if self.label_max_chars == 0 {
            return Err(crate::errors::AppError::Config(
                "label_max_chars must be greater than 0".to_string(),
            ));
        }

        self.preprocessing.validate()?;

        Ok(())
    }
}

/// Parse an environment variable, keeping the default when unset or invalid
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid value '{raw}' for {key}, using default {default}");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profiles_order() {
        let profiles = RecognitionProfile::default_profiles();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].config, "--oem 3 --psm 3");
        assert_eq!(profiles[1].config, "--oem 3 --psm 6");
        assert_eq!(profiles[2].config, "--oem 3 --psm 4");
        assert_eq!(profiles[0].name, "auto-layout");
        assert_eq!(profiles[1].name, "single-block");
        assert_eq!(profiles[2].name, "single-column");
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = OcrConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.languages, "ind+eng");
        assert_eq!(config.fallback_languages.as_deref(), Some("eng"));
        assert_eq!(config.confidence_threshold, 60.0);
        assert_eq!(config.min_dimension, 1500);
        assert_eq!(config.upscale_factor, 2.0);
        assert_eq!(config.label_max_chars, 25);
    }

    #[test]
    #[allow(unused_assignments)]
    fn test_ocr_config_validation() {
        let mut config = OcrConfig::default();

        config.languages = "  ".to_string();
        assert!(config.validate().is_err());
        config.languages = "eng".to_string();

        config.confidence_threshold = 101.0;
        assert!(config.validate().is_err());
        config.confidence_threshold = -1.0;
        assert!(config.validate().is_err());
        config.confidence_threshold = 0.0;
        assert!(config.validate().is_ok());

        config.upscale_factor = 0.5;
        assert!(config.validate().is_err());
        config.upscale_factor = 2.0;

        config.profiles.clear();
        assert!(config.validate().is_err());
        config.profiles = RecognitionProfile::default_profiles();

        config.fallback_languages = Some(String::new());
        assert!(config.validate().is_err());
        config.fallback_languages = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    #[allow(unused_assignments)]
    fn test_preprocessing_params_validation() {
        let mut params = PreprocessingParams::default();
        assert!(params.validate().is_ok());

        params.adaptive_block_size = 30;
        assert!(params.validate().is_err());
        params.adaptive_block_size = 31;

        params.clahe_grid = (0, 8);
        assert!(params.validate().is_err());
        params.clahe_grid = (8, 8);

        params.unsharp_amount = 0.5;
        assert!(params.validate().is_err());
        params.unsharp_amount = 1.5;

        params.clahe_clip_limit = 0.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_preprocessing_mode_parsing() {
        assert_eq!(
            "standard".parse::<PreprocessingMode>().unwrap(),
            PreprocessingMode::Standard
        );
        assert_eq!(
            " Enhanced ".parse::<PreprocessingMode>().unwrap(),
            PreprocessingMode::Enhanced
        );
        assert_eq!(
            "".parse::<PreprocessingMode>().unwrap(),
            PreprocessingMode::Enhanced
        );
        assert!("turbo".parse::<PreprocessingMode>().is_err());
    }

    #[test]
    fn test_preprocessing_mode_accepts_prompt_wording() {
        // The Indonesian prompt offers "[1] standar, [2] enhanced"
        for answer in ["standar", "Standar", "std", "1", "s"] {
            assert_eq!(
                answer.parse::<PreprocessingMode>().unwrap(),
                PreprocessingMode::Standard,
                "answer {answer:?}"
            );
        }
        for answer in ["enhanced", "2", "e"] {
            assert_eq!(
                answer.parse::<PreprocessingMode>().unwrap(),
                PreprocessingMode::Enhanced,
                "answer {answer:?}"
            );
        }
    }

    #[test]
    fn test_page_seg_mode_strings() {
        assert_eq!(PageSegMode::default(), PageSegMode::Auto);
        assert_eq!(PageSegMode::SingleBlock.as_str(), "6");
        assert_eq!(PageSegMode::SingleColumn.as_str(), "4");
        assert_eq!(PageSegMode::Auto.layout_name(), "auto-layout");
    }
}
