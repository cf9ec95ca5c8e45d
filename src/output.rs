//! # Output Writer Module
//!
//! Writes the run's artifacts. Each file is written to a temporary file in
//! the destination directory and then renamed over the target, so a file is
//! either complete or absent.

use image::{DynamicImage, ImageFormat};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::errors::{error_logging, AppError, AppResult};
use crate::preprocessing::PreprocessingVariant;

/// Write to `path` atomically through `write`.
fn write_atomic(
    path: &Path,
    operation: &str,
    write: impl FnOnce(&mut BufWriter<&mut std::fs::File>) -> AppResult<()>,
) -> AppResult<PathBuf> {
    let result = persist_with(path, write);
    if let Err(e) = &result {
        error_logging::log_filesystem_error(e, operation, Some(&path.display().to_string()), None);
    }
    result
}

fn persist_with(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<&mut std::fs::File>) -> AppResult<()>,
) -> AppResult<PathBuf> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| {
        AppError::FileSystem(format!("cannot replace {}: {}", path.display(), e.error))
    })?;

    Ok(path.to_path_buf())
}

/// Save the corrected text as UTF-8. Empty text produces an empty file.
pub fn save_text(path: &Path, text: &str) -> AppResult<PathBuf> {
    let saved = write_atomic(path, "save_text", |writer| {
        writer.write_all(text.as_bytes())?;
        Ok(())
    })?;
    info!(path = %saved.display(), bytes = text.len(), "Text saved");
    Ok(saved)
}

/// Encode an image into `path` in the given format.
pub fn save_image(path: &Path, image: &DynamicImage, format: ImageFormat) -> AppResult<PathBuf> {
    let saved = write_atomic(path, "save_image", |writer| {
        image
            .write_to(writer, format)
            .map_err(|e| AppError::FileSystem(format!("cannot encode {}: {}", path.display(), e)))
    })?;
    info!(path = %saved.display(), format = ?format, "Image saved");
    Ok(saved)
}

/// Save the annotated (or fallback) image as JPEG.
pub fn save_image_jpeg(path: &Path, image: &image::RgbImage) -> AppResult<PathBuf> {
    save_image(path, &DynamicImage::ImageRgb8(image.clone()), ImageFormat::Jpeg)
}

/// File name of the debug image for a variant
pub fn debug_file_name(variant: &PreprocessingVariant) -> String {
    format!("debug_{}.png", variant.name())
}

/// Save every variant as `debug_<name>.png` in `dir`.
///
/// Failures are independent: each entry reports its own result.
pub fn save_debug_variants(
    dir: &Path,
    variants: &[PreprocessingVariant],
) -> Vec<(String, AppResult<PathBuf>)> {
    variants
        .iter()
        .map(|variant| {
            let path = dir.join(debug_file_name(variant));
            let result = save_image(
                &path,
                &DynamicImage::ImageLuma8(variant.image.clone()),
                ImageFormat::Png,
            );
            (variant.name().to_string(), result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::VariantKind;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn test_save_text_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hasil_teks.txt");

        save_text(&path, "pertama").unwrap();
        save_text(&path, "kedua").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "kedua");
    }

    #[test]
    fn test_save_empty_text_creates_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hasil_teks.txt");
        save_text(&path, "").unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_save_into_missing_directory_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("hasil_teks.txt");
        let err = save_text(&path, "x").unwrap_err();
        assert!(matches!(err, AppError::FileSystem(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_image_jpeg_decodes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hasil_deteksi.jpg");
        save_image_jpeg(&path, &RgbImage::from_pixel(12, 9, Rgb([10, 200, 10]))).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 9));
    }

    #[test]
    fn test_save_debug_variants_names() {
        let dir = TempDir::new().unwrap();
        let variants = vec![
            PreprocessingVariant::new(VariantKind::GlobalThreshold, GrayImage::from_pixel(4, 4, Luma([0]))),
            PreprocessingVariant::new(VariantKind::AdaptiveThreshold, GrayImage::from_pixel(4, 4, Luma([255]))),
        ];

        let results = save_debug_variants(dir.path(), &variants);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert!(dir.path().join("debug_global-threshold.png").exists());
        assert!(dir.path().join("debug_adaptive-threshold.png").exists());
    }
}
