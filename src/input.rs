//! # Input Validation Module
//!
//! Checks the user-supplied image path and decodes the image. Every failure
//! here is an input error: the run stops before any output is written.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::errors::{error_logging, AppError, AppResult};

/// Remove whitespace and one layer of surrounding quotes from a typed path.
///
/// Paths pasted from a file manager often arrive as `"C:\scan\nota.jpg"`.
///
/// # Examples
///
/// ```
/// use pindai_ocr::input::clean_path_input;
///
/// assert_eq!(clean_path_input("  \"nota.jpg\" \n"), "nota.jpg");
/// assert_eq!(clean_path_input("'teks.png'"), "teks.png");
/// ```
pub fn clean_path_input(raw: &str) -> String {
    raw.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim()
        .to_string()
}

/// Validate that `path` names a readable, non-empty regular file.
pub fn validate_image_path(path: &Path) -> AppResult<PathBuf> {
    let display = path.display().to_string();

    if display.trim().is_empty() {
        let err = AppError::Validation("no image path given".to_string());
        error_logging::log_validation_error(&err, "validate_image_path", "image_path", None);
        return Err(err);
    }

    // Check if file exists
    if !path.exists() {
        let err = AppError::Validation(format!("file does not exist ({})", display));
        error_logging::log_validation_error(&err, "validate_image_path", "image_path", Some(&display));
        return Err(err);
    }

    // Check if it's actually a file (not a directory)
    if !path.is_file() {
        let err = AppError::Validation(format!("path is not a file ({})", display));
        error_logging::log_validation_error(&err, "validate_image_path", "image_path", Some(&display));
        return Err(err);
    }

    match path.metadata() {
        Ok(metadata) if metadata.len() == 0 => {
            let err = AppError::Validation(format!("file is empty ({})", display));
            error_logging::log_validation_error(&err, "validate_image_path", "image_path", Some(&display));
            Err(err)
        }
        Ok(_) => Ok(path.to_path_buf()),
        Err(e) => {
            let err = AppError::Validation(format!(
                "cannot read file metadata ({}) - {}",
                display, e
            ));
            error_logging::log_validation_error(&err, "validate_image_path", "image_path", Some(&display));
            Err(err)
        }
    }
}

/// Validate and decode an image file.
pub fn load_image(path: &Path) -> AppResult<DynamicImage> {
    let path = validate_image_path(path)?;
    let start_time = std::time::Instant::now();

    let image = image::open(&path).map_err(|e| {
        let err = AppError::Validation(format!(
            "cannot decode image {} - {}",
            path.display(),
            e
        ));
        error_logging::log_validation_error(
            &err,
            "load_image",
            "image_file",
            Some(&path.display().to_string()),
        );
        err
    })?;

    if image.width() == 0 || image.height() == 0 {
        return Err(AppError::Validation(format!(
            "image has no pixels ({})",
            path.display()
        )));
    }

    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        duration_ms = start_time.elapsed().as_millis(),
        "Image loaded"
    );

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_clean_path_input() {
        assert_eq!(clean_path_input("nota.jpg"), "nota.jpg");
        assert_eq!(clean_path_input(" \"a b.png\" "), "a b.png");
        assert_eq!(clean_path_input(""), "");
    }

    #[test]
    fn test_missing_file() {
        let err = validate_image_path(Path::new("/nonexistent/pindai/nota.jpg")).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("does not exist")));
    }

    #[test]
    fn test_directory_rejected() {
        let dir = TempDir::new().unwrap();
        let err = validate_image_path(dir.path()).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("not a file")));
    }

    #[test]
    fn test_empty_file_rejected() {
        let file = NamedTempFile::new().unwrap();
        let err = validate_image_path(file.path()).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("empty")));
    }

    #[test]
    fn test_undecodable_file_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"this is not an image").unwrap();
        let err = load_image(file.path()).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("cannot decode")));
    }

    #[test]
    fn test_load_valid_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ok.png");
        image::RgbImage::from_pixel(8, 6, image::Rgb([1, 2, 3]))
            .save(&path)
            .unwrap();

        let image = load_image(&path).unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
    }
}
