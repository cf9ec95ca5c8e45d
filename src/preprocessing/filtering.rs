//! # Image Filtering Module
//!
//! This module provides noise reduction, morphological operations and local
//! contrast equalization for OCR preprocessing.

use image::{GrayImage, Luma};
use tracing;

use super::types::{
    ClaheImageResult, MorphologicalImageResult, MorphologicalOperation, PreprocessingError,
};

/// Applies Gaussian blur to reduce image noise while preserving text edges.
///
/// # Arguments
///
/// * `gray` - The grayscale image to denoise
/// * `sigma` - Standard deviation for Gaussian kernel (recommended: 1.0-1.5)
///
/// # Errors
///
/// `InvalidParameter` when sigma is outside (0, 5].
pub fn reduce_noise(gray: &GrayImage, sigma: f32) -> Result<GrayImage, PreprocessingError> {
    let start_time = std::time::Instant::now();

    if sigma <= 0.0 || sigma > 5.0 {
        return Err(PreprocessingError::InvalidParameter {
            message: format!(
                "Invalid sigma value: {}. Must be between 0.1 and 5.0",
                sigma
            ),
        });
    }

    let blurred = imageproc::filter::gaussian_blur_f32(gray, sigma);

    tracing::debug!(
        target: "ocr_preprocessing",
        "Noise reduction completed in {:.2}ms: sigma={:.2}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        sigma,
        blurred.width(),
        blurred.height()
    );

    Ok(blurred)
}

/// Applies morphological operations to clean up binary images.
///
/// Uses a 3x3 square kernel. Border pixels see a neighbourhood clamped to the
/// image, so a clean page never grows a dark frame.
///
/// # Examples
///
/// ```no_run
/// use pindai_ocr::preprocessing::{apply_morphological_operation, MorphologicalOperation};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let binary = image::open("binary.png")?.to_luma8();
/// let cleaned = apply_morphological_operation(&binary, MorphologicalOperation::Opening)?;
/// # Ok(())
/// # }
/// ```
pub fn apply_morphological_operation(
    gray: &GrayImage,
    operation: MorphologicalOperation,
) -> Result<MorphologicalImageResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    if gray.width() == 0 || gray.height() == 0 {
        return Err(PreprocessingError::ProcessingFailed {
            message: "cannot apply morphology to an empty image".to_string(),
        });
    }

    let processed = match operation {
        MorphologicalOperation::Erosion => apply_erosion(gray),
        MorphologicalOperation::Dilation => apply_dilation(gray),
        MorphologicalOperation::Opening => apply_dilation(&apply_erosion(gray)),
        MorphologicalOperation::Closing => apply_erosion(&apply_dilation(gray)),
    };

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "ocr_preprocessing",
        "Morphological operation completed in {:.2}ms: operation={:?}, dimensions={}x{}",
        processing_time.as_millis(),
        operation,
        processed.width(),
        processed.height()
    );

    Ok(MorphologicalImageResult {
        image: processed,
        operation,
        kernel_size: 3,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

/// 3x3 neighbourhood reduction with clamped borders.
fn neighbourhood_fold(image: &GrayImage, init: u8, fold: fn(u8, u8) -> u8) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let mut acc = init;
        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                acc = fold(acc, image.get_pixel(nx, ny)[0]);
            }
        }
        Luma([acc])
    })
}

/// Erosion shrinks bright regions (min over the 3x3 neighbourhood).
fn apply_erosion(image: &GrayImage) -> GrayImage {
    neighbourhood_fold(image, u8::MAX, u8::min)
}

/// Dilation expands bright regions (max over the 3x3 neighbourhood).
fn apply_dilation(image: &GrayImage) -> GrayImage {
    neighbourhood_fold(image, u8::MIN, u8::max)
}

/// Applies Contrast Limited Adaptive Histogram Equalization (CLAHE).
///
/// The image is divided into a `grid` of tiles; each tile gets its own clipped
/// equalization curve and every pixel is mapped by bilinear interpolation of
/// the curves of the four nearest tile centres, which avoids visible seams.
///
/// # Arguments
///
/// * `gray` - The grayscale image to enhance
/// * `clip_limit` - Histogram clip limit relative to a flat histogram (recommended: 2.0-4.0)
/// * `grid` - Number of tiles (columns, rows)
pub fn apply_clahe(
    gray: &GrayImage,
    clip_limit: f32,
    grid: (u32, u32),
) -> Result<ClaheImageResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    if clip_limit <= 0.0 {
        return Err(PreprocessingError::InvalidParameter {
            message: format!("Invalid clip limit: {}. Must be > 0.0", clip_limit),
        });
    }
    if grid.0 == 0 || grid.1 == 0 {
        return Err(PreprocessingError::InvalidParameter {
            message: "Invalid tile grid: dimensions must be > 0".to_string(),
        });
    }

    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(PreprocessingError::ProcessingFailed {
            message: "cannot equalize an empty image".to_string(),
        });
    }

    let tile_width = width.div_ceil(grid.0.min(width));
    let tile_height = height.div_ceil(grid.1.min(height));
    let tiles_x = width.div_ceil(tile_width);
    let tiles_y = height.div_ceil(tile_height);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for tile_y in 0..tiles_y {
        for tile_x in 0..tiles_x {
            let x0 = tile_x * tile_width;
            let y0 = tile_y * tile_height;
            let x1 = (x0 + tile_width).min(width);
            let y1 = (y0 + tile_height).min(height);
            luts.push(tile_lut(gray, (x0, y0, x1, y1), clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    let output = GrayImage::from_fn(width, height, |x, y| {
        let (tx0, tx1, ax) = interpolation_cell(x, tile_width, tiles_x);
        let (ty0, ty1, ay) = interpolation_cell(y, tile_height, tiles_y);
        let value = gray.get_pixel(x, y)[0] as usize;

        let top = lut_at(tx0, ty0)[value] * (1.0 - ax) + lut_at(tx1, ty0)[value] * ax;
        let bottom = lut_at(tx0, ty1)[value] * (1.0 - ax) + lut_at(tx1, ty1)[value] * ax;
        let mapped = top * (1.0 - ay) + bottom * ay;

        Luma([mapped.round().clamp(0.0, 255.0) as u8])
    });

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "ocr_preprocessing",
        "CLAHE applied in {:.2}ms: clip_limit={}, grid={:?}, tile={}x{}",
        processing_time.as_millis(),
        clip_limit,
        grid,
        tile_width,
        tile_height
    );

    Ok(ClaheImageResult {
        image: output,
        clip_limit,
        grid,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

/// Neighbouring tile indices and the weight of the second one along one axis.
fn interpolation_cell(coord: u32, tile_size: u32, tiles: u32) -> (u32, u32, f32) {
    let position = (coord as f32 + 0.5) / tile_size as f32 - 0.5;
    if position <= 0.0 {
        return (0, 0, 0.0);
    }
    let first = (position.floor() as u32).min(tiles - 1);
    let second = (first + 1).min(tiles - 1);
    let weight = if first == second {
        0.0
    } else {
        (position - first as f32).clamp(0.0, 1.0)
    };
    (first, second, weight)
}

/// Clipped equalization curve of one tile.
fn tile_lut(gray: &GrayImage, bounds: (u32, u32, u32, u32), clip_limit: f32) -> [f32; 256] {
    let (x0, y0, x1, y1) = bounds;
    let total_pixels = ((x1 - x0) * (y1 - y0)) as f32;

    let mut histogram = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            histogram[gray.get_pixel(x, y)[0] as usize] += 1;
        }
    }

    let clip_limit_pixels = ((clip_limit * (total_pixels / 256.0)).round() as u32).max(1);
    let mut excess_pixels = 0u32;

    for count in &mut histogram {
        if *count > clip_limit_pixels {
            excess_pixels += *count - clip_limit_pixels;
            *count = clip_limit_pixels;
        }
    }

    // Redistribute excess pixels uniformly
    let uniform_increment = excess_pixels / 256;
    let mut remainder = excess_pixels % 256;

    for count in &mut histogram {
        *count += uniform_increment;
        if remainder > 0 {
            *count += 1;
            remainder -= 1;
        }
    }

    let mut lut = [0.0f32; 256];
    let mut cumulative = 0.0f32;
    for (i, count) in histogram.iter().enumerate() {
        cumulative += *count as f32 / total_pixels;
        lut[i] = (cumulative * 255.0).min(255.0);
    }

    lut
}

/// Edge-preserving smoothing.
///
/// Each output pixel is a weighted mean of its `(2 * radius + 1)^2`
/// neighbourhood where the weight falls off with both spatial distance
/// (`sigma_space`) and intensity difference (`sigma_color`), so flat regions
/// are smoothed while strong stroke edges survive.
pub fn apply_bilateral_filter(
    gray: &GrayImage,
    radius: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> Result<GrayImage, PreprocessingError> {
    let start_time = std::time::Instant::now();

    if sigma_color <= 0.0 || sigma_space <= 0.0 {
        return Err(PreprocessingError::InvalidParameter {
            message: format!(
                "bilateral sigmas must be > 0 (color={}, space={})",
                sigma_color, sigma_space
            ),
        });
    }

    if gray.width() == 0 || gray.height() == 0 {
        return Ok(gray.clone());
    }

    let output = imageproc::filter::bilateral_filter(gray, 2 * radius + 1, sigma_color, sigma_space);

    tracing::debug!(
        target: "ocr_preprocessing",
        "Bilateral filter completed in {:.2}ms: radius={}, sigma_color={}, sigma_space={}",
        start_time.elapsed().as_millis(),
        radius,
        sigma_color,
        sigma_space
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x * 3 + y) % 256) as u8]))
    }

    #[test]
    fn test_reduce_noise_invalid_sigma() {
        let img = gradient(20, 20);
        assert!(reduce_noise(&img, 0.0).is_err());
        assert!(reduce_noise(&img, 6.0).is_err());
        let blurred = reduce_noise(&img, 1.0).unwrap();
        assert_eq!(blurred.dimensions(), (20, 20));
    }

    #[test]
    fn test_apply_erosion_basic() {
        let img = GrayImage::from_fn(5, 5, |x, y| {
            if x == 2 && y == 2 {
                Luma([0])
            } else {
                Luma([255])
            }
        });

        let eroded = apply_erosion(&img);

        // Dark region expands to the 3x3 block around the centre
        assert_eq!(eroded.get_pixel(2, 2)[0], 0);
        assert_eq!(eroded.get_pixel(1, 1)[0], 0);
        assert_eq!(eroded.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_apply_dilation_basic() {
        let img = GrayImage::from_fn(5, 5, |x, y| {
            if x == 2 && y == 2 {
                Luma([255])
            } else {
                Luma([0])
            }
        });

        let dilated = apply_dilation(&img);

        for (x, y) in [(1, 2), (3, 2), (2, 1), (2, 3)] {
            assert_eq!(dilated.get_pixel(x, y)[0], 255);
        }
        assert_eq!(dilated.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_morphology_keeps_white_page_white() {
        let img = GrayImage::from_pixel(8, 8, Luma([255]));
        for operation in [
            MorphologicalOperation::Erosion,
            MorphologicalOperation::Dilation,
            MorphologicalOperation::Opening,
            MorphologicalOperation::Closing,
        ] {
            let result = apply_morphological_operation(&img, operation).unwrap();
            assert_eq!(result.operation, operation);
            assert_eq!(result.kernel_size, 3);
            assert!(result.image.pixels().all(|p| p[0] == 255), "{operation:?}");
        }
    }

    #[test]
    fn test_opening_removes_isolated_speck() {
        let img = GrayImage::from_fn(7, 7, |x, y| {
            if x == 3 && y == 3 {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let result = apply_morphological_operation(&img, MorphologicalOperation::Opening).unwrap();
        assert!(result.image.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_apply_clahe_invalid_parameters() {
        let img = gradient(50, 50);
        assert!(apply_clahe(&img, 0.0, (8, 8)).is_err());
        assert!(apply_clahe(&img, 3.0, (0, 8)).is_err());
        assert!(apply_clahe(&img, 3.0, (8, 0)).is_err());
    }

    #[test]
    fn test_apply_clahe_preserves_dimensions() {
        for grid in [(1, 1), (4, 4), (8, 8), (64, 64)] {
            let img = gradient(37, 23);
            let result = apply_clahe(&img, 2.0, grid).unwrap();
            assert_eq!(result.grid, grid);
            assert_eq!(result.image.dimensions(), (37, 23));
        }
    }

    #[test]
    fn test_apply_clahe_stretches_low_contrast() {
        let img = GrayImage::from_fn(32, 32, |x, y| Luma([100 + ((x + y) % 7) as u8]));
        let result = apply_clahe(&img, 4.0, (2, 2)).unwrap();

        let (min_in, max_in) = (100u8, 106u8);
        let min_out = result.image.pixels().map(|p| p[0]).min().unwrap();
        let max_out = result.image.pixels().map(|p| p[0]).max().unwrap();
        assert!(max_out - min_out > max_in - min_in);
    }

    #[test]
    fn test_interpolation_cell_edges() {
        assert_eq!(interpolation_cell(0, 10, 4), (0, 0, 0.0));
        let (first, second, weight) = interpolation_cell(39, 10, 4);
        assert_eq!((first, second), (3, 3));
        assert_eq!(weight, 0.0);
        let (first, second, weight) = interpolation_cell(10, 10, 4);
        assert_eq!((first, second), (0, 1));
        assert!((weight - 0.55).abs() < 1e-5);
    }

    #[test]
    fn test_bilateral_filter_keeps_flat_image() {
        let img = GrayImage::from_pixel(12, 12, Luma([140]));
        let filtered = apply_bilateral_filter(&img, 4, 75.0, 75.0).unwrap();
        assert!(filtered.pixels().all(|p| p[0] == 140));
    }

    #[test]
    fn test_bilateral_filter_preserves_strong_edge() {
        let img = GrayImage::from_fn(20, 20, |x, _| if x < 10 { Luma([10]) } else { Luma([245]) });
        let filtered = apply_bilateral_filter(&img, 3, 20.0, 10.0).unwrap();
        assert!(filtered.get_pixel(9, 10)[0] < 40);
        assert!(filtered.get_pixel(10, 10)[0] > 215);
    }

    #[test]
    fn test_bilateral_filter_empty_image() {
        let img = GrayImage::new(0, 0);
        let filtered = apply_bilateral_filter(&img, 2, 10.0, 10.0).unwrap();
        assert_eq!(filtered.dimensions(), (0, 0));
    }

    #[test]
    fn test_bilateral_filter_rejects_bad_sigma() {
        let img = GrayImage::from_pixel(4, 4, Luma([1]));
        assert!(apply_bilateral_filter(&img, 2, 0.0, 1.0).is_err());
    }
}
