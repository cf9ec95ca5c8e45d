//! # Image Thresholding Module
//!
//! This module provides binary thresholding functionality for OCR preprocessing.
//! It includes Otsu's method for automatic global threshold selection and a
//! local mean threshold that tolerates uneven illumination.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use tracing;

use super::types::{PreprocessingError, ThresholdedImageResult};

/// Applies Otsu's thresholding algorithm to convert an image to binary (black/white).
///
/// This function automatically determines the optimal threshold value using Otsu's method,
/// which maximizes the between-class variance (equivalently, minimizes the intra-class
/// variance). Pixels brighter than the threshold become white (255), all others black (0).
///
/// # Arguments
///
/// * `gray` - The grayscale input image
///
/// # Returns
///
/// Returns a `Result` containing the thresholded image and metadata, or a `PreprocessingError`
///
/// # Examples
///
/// ```no_run
/// use pindai_ocr::preprocessing::apply_otsu_threshold;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gray = image::open("nota.jpg")?.to_luma8();
/// let thresholded = apply_otsu_threshold(&gray)?;
/// println!("Optimal threshold: {:?}", thresholded.threshold);
/// # Ok(())
/// # }
/// ```
pub fn apply_otsu_threshold(gray: &GrayImage) -> Result<ThresholdedImageResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    if gray.width() == 0 || gray.height() == 0 {
        return Err(PreprocessingError::ProcessingFailed {
            message: "cannot threshold an empty image".to_string(),
        });
    }

    // Calculate histogram
    let mut histogram = [0u32; 256];
    let total_pixels = (gray.width() as f64) * (gray.height() as f64);

    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let optimal_threshold = find_otsu_threshold(&histogram, total_pixels)?;
    let binary_img = binarize(gray, optimal_threshold);

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "ocr_preprocessing",
        "Otsu thresholding completed in {:.2}ms: threshold={}, dimensions={}x{}",
        processing_time.as_millis(),
        optimal_threshold,
        gray.width(),
        gray.height()
    );

    Ok(ThresholdedImageResult {
        image: binary_img,
        threshold: Some(optimal_threshold),
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

/// Maps every pixel strictly above `threshold` to 255 and the rest to 0.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Finds the optimal threshold using Otsu's method by maximizing between-class variance.
///
/// Returns 128 when the histogram holds a single class (no split has any variance).
fn find_otsu_threshold(histogram: &[u32; 256], total_pixels: f64) -> Result<u8, PreprocessingError> {
    if total_pixels <= 0.0 {
        return Err(PreprocessingError::ProcessingFailed {
            message: "histogram is empty".to_string(),
        });
    }

    let mut cumulative_sum = 0f64;
    let mut cumulative_weighted_sum = 0f64;
    let mut cumulative_sums = [0f64; 256];
    let mut cumulative_weighted_sums = [0f64; 256];

    for i in 0..256 {
        let pixel_count = histogram[i] as f64;
        cumulative_sum += pixel_count;
        cumulative_weighted_sum += (i as f64) * pixel_count;

        cumulative_sums[i] = cumulative_sum;
        cumulative_weighted_sums[i] = cumulative_weighted_sum;
    }

    let mut max_variance = 0f64;
    let mut optimal_threshold = 128u8;

    let total_weighted_sum = cumulative_weighted_sums[255];

    for threshold in 0..255usize {
        // Weight of background class (pixels <= threshold)
        let w0 = cumulative_sums[threshold] / total_pixels;
        // Weight of foreground class (pixels > threshold)
        let w1 = 1.0 - w0;

        if w0 == 0.0 || w1 <= 0.0 {
            continue;
        }

        let mu0 = cumulative_weighted_sums[threshold] / cumulative_sums[threshold];
        let mu1 = (total_weighted_sum - cumulative_weighted_sums[threshold])
            / (cumulative_sums[255] - cumulative_sums[threshold]);

        let variance = w0 * w1 * (mu0 - mu1).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    Ok(optimal_threshold)
}

/// Applies a local mean threshold.
///
/// Each pixel is compared with the mean of the `block_size` x `block_size`
/// neighbourhood around it (clipped at the borders) minus `bias`; brighter
/// pixels become 255, the rest 0. The neighbourhood means come from an integral
/// image, so the cost does not depend on the block size.
///
/// # Errors
///
/// `InvalidParameter` when `block_size` is even or smaller than 3.
pub fn apply_adaptive_threshold(
    gray: &GrayImage,
    block_size: u32,
    bias: i32,
) -> Result<ThresholdedImageResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    if block_size < 3 || block_size % 2 == 0 {
        return Err(PreprocessingError::InvalidParameter {
            message: format!("block size {} must be odd and >= 3", block_size),
        });
    }

    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(PreprocessingError::ProcessingFailed {
            message: "cannot threshold an empty image".to_string(),
        });
    }

    let integral: Image<Luma<u64>> = integral_image(gray);
    let radius = block_size / 2;

    let output = GrayImage::from_fn(width, height, |x, y| {
        let left = x.saturating_sub(radius);
        let top = y.saturating_sub(radius);
        let right = (x + radius).min(width - 1);
        let bottom = (y + radius).min(height - 1);

        let sum = sum_image_pixels(&integral, left, top, right, bottom)[0];
        let count = f64::from((right - left + 1) * (bottom - top + 1));
        let mean = sum as f64 / count;

        if f64::from(gray.get_pixel(x, y)[0]) > mean - f64::from(bias) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "ocr_preprocessing",
        "Adaptive thresholding completed in {:.2}ms: block_size={}, bias={}, dimensions={}x{}",
        processing_time.as_millis(),
        block_size,
        bias,
        width,
        height
    );

    Ok(ThresholdedImageResult {
        image: output,
        threshold: None,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}
