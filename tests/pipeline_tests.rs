//! # Pipeline Tests
//!
//! End-to-end runs with stub engines: text selection, annotation, fallback
//! output and the files written for each mode.


use image::{GenericImageView, Rgb};
use pindai_ocr::app::{self, is_input_error, OutputStatus, RunRequest};
use pindai_ocr::errors::AppError;
use pindai_ocr::ocr_config::{PreprocessingMode, IMAGE_OUTPUT_FILE, TEXT_OUTPUT_FILE};
use pindai_ocr::ocr_errors::OcrError;
use pindai_ocr::pipeline::OcrPipeline;
use tempfile::TempDir;
use test_helpers::*;

#[test]
fn test_longest_transcription_is_selected() {
    let engine = StubEngine::with_text(|config| {
        Ok(if config.contains("--psm 4") {
            "Nomor 12 Jumlah 3".to_string()
        } else {
            "Nomor 12".to_string()
        })
    });
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = OcrPipeline::new(&engine, &config).with_font(None);

    let outcome = pipeline
        .run(&document_image(90, 60), PreprocessingMode::Enhanced)
        .unwrap();

    assert_eq!(outcome.text, "Nomor 12 Jumlah 3");
    let transcription = outcome.transcription.unwrap();
    assert_eq!(transcription.attempts.len(), 9);
    let selected = transcription.selected_attempt().unwrap();
    // First variant, third profile
    assert_eq!(selected.variant, "global-threshold");
    assert_eq!(selected.profile, "single-column");
}

#[test]
fn test_corrections_applied_to_selected_text() {
    let engine = StubEngine::fixed("Tanggai: 12.O3.2024\n\nTotai  Rp 5.000");
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = OcrPipeline::new(&engine, &config).with_font(None);

    let outcome = pipeline
        .run(&document_image(60, 40), PreprocessingMode::Standard)
        .unwrap();

    assert!(outcome.text.contains("Tanggal:"));
    assert!(outcome.text.contains("Total Rp 5.000"));
}

#[test]
fn test_standard_mode_uses_single_variant_and_profile() {
    let engine = StubEngine::fixed("Nomor 7");
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let path = write_png(dir.path(), "nota.png", &document_image(80, 50));

    let report = app::run(
        &RunRequest {
            image_path: path,
            mode: PreprocessingMode::Standard,
        },
        &engine,
        &config,
        None,
    )
    .unwrap();

    assert_eq!(report.mode, "standard");
    assert_eq!(report.selected_variant.as_deref(), Some("otsu-morphology"));
    assert_eq!(report.selected_profile.as_deref(), Some("single-block"));
    assert_eq!(engine.text_calls(), 1);
    assert!(report.debug_outputs.is_empty());
    assert_eq!(
        file_names(dir.path()),
        vec![IMAGE_OUTPUT_FILE, TEXT_OUTPUT_FILE, "nota.png"]
    );
}

#[test]
fn test_solid_image_gives_empty_text_file() {
    let engine = StubEngine::fixed("");
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let path = write_png(dir.path(), "kosong.png", &solid_image(100, 100, 255));

    let report = app::run(
        &RunRequest {
            image_path: path,
            mode: PreprocessingMode::Enhanced,
        },
        &engine,
        &config,
        None,
    )
    .unwrap();

    assert!(!report.fallback);
    assert_eq!(report.text, "");
    assert_eq!(report.boxes, 0);
    assert!(report.all_outputs_saved());
    assert_eq!(
        std::fs::metadata(dir.path().join(TEXT_OUTPUT_FILE)).unwrap().len(),
        0
    );

    let annotated = image::open(dir.path().join(IMAGE_OUTPUT_FILE)).unwrap();
    assert_eq!(annotated.dimensions(), (100, 100));

    let debug: Vec<_> = report.debug_outputs.iter().map(|d| d.variant.as_str()).collect();
    assert_eq!(
        debug,
        vec![
            "global-threshold",
            "adaptive-threshold",
            "contrast-equalized-threshold"
        ]
    );
    for name in debug {
        assert!(dir.path().join(format!("debug_{}.png", name)).exists());
    }
}

#[test]
fn test_engine_unavailable_falls_back() {
    let engine = StubEngine::unavailable();
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let path = write_png(dir.path(), "nota.png", &document_image(120, 90));

    let report = app::run(
        &RunRequest {
            image_path: path,
            mode: PreprocessingMode::Enhanced,
        },
        &engine,
        &config,
        Some("Fallback: Tesseract unavailable"),
    )
    .unwrap();

    assert!(report.fallback);
    assert!(report
        .fallback_reason
        .as_deref()
        .unwrap()
        .contains("OCR_UNAVAILABLE"));
    assert_eq!(report.boxes, 0);
    assert!(report.debug_outputs.is_empty());
    // The first call already reports the engine missing
    assert_eq!(engine.calls.borrow().len(), 1);

    assert_eq!(
        std::fs::metadata(dir.path().join(TEXT_OUTPUT_FILE)).unwrap().len(),
        0
    );
    let banner = image::open(dir.path().join(IMAGE_OUTPUT_FILE)).unwrap().to_rgb8();
    assert_eq!(banner.dimensions(), (120, 90));
    // Top row is tinted red, the bottom keeps the page colour
    let top = banner.get_pixel(2, 2);
    assert!(top[0] > 200 && top[1] < 160, "banner pixel {:?}", top);
    let bottom = banner.get_pixel(2, 88);
    assert!(bottom[1] > 200, "page pixel {:?}", bottom);
}

#[test]
fn test_engine_lost_during_annotation_falls_back() {
    let engine = StubEngine::fixed("Nomor 1")
        .with_token_error(OcrError::EngineUnavailable("killed".into()));
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = OcrPipeline::new(&engine, &config).with_font(None);

    let outcome = pipeline
        .run(&document_image(60, 40), PreprocessingMode::Standard)
        .unwrap();

    assert!(outcome.is_fallback());
    assert_eq!(outcome.text, "");
    assert!(outcome.transcription.is_none());
}

#[test]
fn test_annotation_failure_keeps_text() {
    let engine =
        StubEngine::fixed("Nomor 1").with_token_error(OcrError::Extraction("bad tsv".into()));
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.fallback_languages = None;
    let pipeline = OcrPipeline::new(&engine, &config).with_font(None);
    let original = document_image(60, 40);

    let outcome = pipeline.run(&original, PreprocessingMode::Standard).unwrap();

    assert!(!outcome.is_fallback());
    assert_eq!(outcome.text, "Nomor 1");
    assert_eq!(outcome.boxes, 0);
    assert_eq!(outcome.image, original.to_rgb8());
}

#[test]
fn test_boxes_follow_confidence_threshold() {
    let engine = StubEngine::fixed("Nomor 1 2").with_tokens(vec![
        token("Nomor", 20, 20, 40, Some(60.0)),
        token("1", 80, 20, 20, Some(59.9)),
        token("2", 80, 80, 20, None),
        token("   ", 120, 120, 20, Some(99.0)),
    ]);
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = OcrPipeline::new(&engine, &config).with_font(None);
    let original = solid_image(100, 100, 255);

    let outcome = pipeline.run(&original, PreprocessingMode::Enhanced).unwrap();

    assert_eq!(outcome.scale_factor, 2.0);
    assert_eq!(outcome.boxes, 1);
    // Variant space (20, 20, 40x40) maps to (10, 10, 20x20) on the original
    assert_eq!(*outcome.image.get_pixel(10, 15), Rgb([0, 255, 0]));
    assert_eq!(*outcome.image.get_pixel(29, 15), Rgb([0, 255, 0]));
    assert_eq!(*outcome.image.get_pixel(20, 20), Rgb([255, 255, 255]));
    // Rejected tokens leave no trace
    assert_eq!(*outcome.image.get_pixel(40, 10), Rgb([255, 255, 255]));
}

#[test]
fn test_missing_image_is_input_error() {
    let engine = StubEngine::fixed("tidak dipakai");
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let err = app::run(
        &RunRequest {
            image_path: dir.path().join("tidak_ada.jpg"),
            mode: PreprocessingMode::Enhanced,
        },
        &engine,
        &config,
        None,
    )
    .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(is_input_error(&err));
    assert!(engine.calls.borrow().is_empty());
    assert!(file_names(dir.path()).is_empty());
}

#[test]
fn test_unwritable_output_is_reported_per_file() {
    let engine = StubEngine::fixed("Nomor 3");
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("belum_ada"));
    let path = write_png(dir.path(), "nota.png", &document_image(60, 40));

    let report = app::run(
        &RunRequest {
            image_path: path,
            mode: PreprocessingMode::Standard,
        },
        &engine,
        &config,
        None,
    )
    .unwrap();

    assert_eq!(report.text, "Nomor 3");
    assert!(matches!(report.text_output, OutputStatus::Failed { .. }));
    assert!(matches!(report.image_output, OutputStatus::Failed { .. }));
    assert!(!report.all_outputs_saved());
}

#[test]
fn test_report_serializes_to_json() {
    let engine = StubEngine::fixed("Nomor 4");
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let path = write_png(dir.path(), "nota.png", &document_image(60, 40));

    let report = app::run(
        &RunRequest {
            image_path: path,
            mode: PreprocessingMode::Standard,
        },
        &engine,
        &config,
        None,
    )
    .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["mode"], "standard");
    assert_eq!(json["text"], "Nomor 4");
    assert_eq!(json["text_output"]["status"], "saved");
    assert_eq!(json["fallback"], false);
}
