//! # Engine Tests
//!
//! Behaviour of the tesseract engine that does not need tesseract itself:
//! discovery, missing executables and TSV parsing.


use image::{GrayImage, Luma};
use pindai_ocr::app::{self, RunRequest};
use pindai_ocr::engine::{locate_tesseract, parse_tsv, RecognitionEngine, TesseractEngine};
use pindai_ocr::ocr_config::{PreprocessingMode, TEXT_OUTPUT_FILE};
use pindai_ocr::ocr_errors::OcrError;
use tempfile::{NamedTempFile, TempDir};
use test_helpers::*;

const MISSING_TESSERACT: &str = "/nonexistent/pindai/bin/tesseract";

#[test]
fn test_explicit_path_wins() {
    let fake = NamedTempFile::new().unwrap();
    assert_eq!(locate_tesseract(Some(fake.path())), Some(fake.path().to_path_buf()));
}

#[test]
fn test_missing_executable_is_engine_unavailable() {
    let engine = TesseractEngine::with_command(MISSING_TESSERACT);
    let image = GrayImage::from_pixel(8, 8, Luma([255]));

    let err = engine.recognize_text(&image, "-l eng --psm 6").unwrap_err();
    assert!(err.is_engine_unavailable(), "got {err}");

    let err = engine.recognize_tokens(&image, "-l eng --psm 6").unwrap_err();
    assert!(matches!(err, OcrError::EngineUnavailable(_)));
}

#[test]
fn test_run_without_tesseract_completes_in_fallback() {
    let engine = TesseractEngine::with_command(MISSING_TESSERACT);
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let path = write_png(dir.path(), "teks.png", &document_image(80, 60));

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

    assert!(report.fallback);
    assert_eq!(report.text, "");
    assert!(report.all_outputs_saved());
    assert_eq!(
        std::fs::metadata(dir.path().join(TEXT_OUTPUT_FILE)).unwrap().len(),
        0
    );
}

#[test]
fn test_parse_tsv_words_only() {
    let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
               1\t1\t0\t0\t0\t0\t0\t0\t300\t200\t-1\t\n\
               5\t1\t1\t1\t1\t1\t12\t30\t70\t22\t88.25\tJumlah\n\
               5\t1\t1\t1\t1\t2\t90\t30\t40\t22\t61\t12.000\n";

    let tokens = parse_tsv(tsv).unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].text, "Jumlah");
    assert_eq!((tokens[0].left, tokens[0].top), (12, 30));
    assert_eq!(tokens[0].confidence, Some(88.25));
    assert_eq!(tokens[1].text, "12.000");
}

#[test]
fn test_parse_tsv_rejects_other_output() {
    assert!(matches!(
        parse_tsv("Tesseract Open Source OCR Engine"),
        Err(OcrError::Parse(_))
    ));
    assert!(parse_tsv("").unwrap().is_empty());
}
