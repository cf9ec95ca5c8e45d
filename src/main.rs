use anyhow::Result;
use clap::Parser;
use pindai_ocr::app::{self, is_input_error, OutputStatus, RunReport, RunRequest};
use pindai_ocr::engine::TesseractEngine;
use pindai_ocr::errors::{error_logging, AppError};
use pindai_ocr::input::clean_path_input;
use pindai_ocr::localization::LocalizationManager;
use pindai_ocr::observability;
use pindai_ocr::ocr_config::{OcrConfig, PreprocessingMode};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pindai")]
#[command(about = "Read text from an image with Tesseract OCR and mark the detected words")]
#[command(version)]
struct Cli {
    /// Image to read; asked for interactively when omitted
    #[arg(short, long, env = "PINDAI_IMAGE")]
    image: Option<PathBuf>,

    /// Preprocessing mode: standard or enhanced
    #[arg(short, long)]
    mode: Option<String>,

    /// Directory receiving hasil_teks.txt, hasil_deteksi.jpg and debug images
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Minimum word confidence (0-100) for a box to be drawn
    #[arg(short, long)]
    confidence: Option<f32>,

    /// Tesseract language codes, e.g. "ind+eng"
    #[arg(short, long)]
    lang: Option<String>,

    /// Console language: id or en
    #[arg(long)]
    locale: Option<String>,

    /// Print the run report as JSON instead of the console report
    #[arg(long)]
    json: bool,
}

/// Apply command line overrides on top of the environment configuration
fn build_config(cli: &Cli) -> OcrConfig {
    let mut config = OcrConfig::from_env();
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(confidence) = cli.confidence {
        config.confidence_threshold = confidence;
    }
    if let Some(lang) = &cli.lang {
        config.languages = lang.trim().to_string();
    }
    if let Some(locale) = &cli.locale {
        config.locale = locale.clone();
    }
    config
}

/// Print a prompt and read one trimmed line from stdin
fn prompt(message: &str) -> Result<String> {
    print!("{} ", message);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_report(report: &RunReport, messages: &LocalizationManager) {
    if report.fallback {
        println!("{}", messages.t("fallback-notice"));
    }

    println!();
    println!("{}", messages.t("result-header"));
    if report.text.trim().is_empty() {
        println!("{}", messages.t("result-empty"));
    } else {
        println!("{}", report.text);
    }
    println!();

    match &report.text_output {
        OutputStatus::Saved { path } => println!("{}", messages.t_args("text-saved", &[("path", path.as_str())])),
        OutputStatus::Failed { error } => {
            println!("{}", messages.t_args("text-save-failed", &[("error", error.as_str())]))
        }
    }

    match &report.image_output {
        OutputStatus::Saved { path } if report.fallback => {
            println!("{}", messages.t_args("image-saved-fallback", &[("path", path.as_str())]))
        }
        OutputStatus::Saved { path } => {
            let boxes = report.boxes.to_string();
            println!(
                "{}",
                messages.t_args("image-saved", &[("path", path.as_str()), ("boxes", boxes.as_str())])
            )
        }
        OutputStatus::Failed { error } => {
            println!("{}", messages.t_args("image-save-failed", &[("error", error.as_str())]))
        }
    }

    for debug in &report.debug_outputs {
        match &debug.status {
            OutputStatus::Saved { path } => {
                println!("{}", messages.t_args("debug-saved", &[("path", path.as_str())]))
            }
            OutputStatus::Failed { error } => println!(
                "{}",
                messages.t_args(
                    "debug-save-failed",
                    &[("variant", debug.variant.as_str()), ("error", error.as_str())]
                )
            ),
        }
    }
}

/// Localized console line for an error that stops the run
fn describe_error(error: &AppError, image: &std::path::Path, messages: &LocalizationManager) -> String {
    match error {
        AppError::Validation(_) if !image.is_file() => {
            let path = image.display().to_string();
            format!(
                "{}\n{}",
                messages.t_args("error-file-not-found", &[("path", path.as_str())]),
                messages.t("error-file-hint")
            )
        }
        AppError::Validation(_) => messages.t("error-image-unreadable"),
        AppError::Preprocessing(msg) => messages.t_args("error-preprocessing", &[("error", msg.as_str())]),
        other => messages.t_args("error-config", &[("error", other.to_string().as_str())]),
    }
}

fn main() -> Result<ExitCode> {
    // Load .env when present; real environment variables win
    dotenvy::dotenv().ok();
    observability::init_tracing()?;

    let cli = Cli::parse();
    let config = build_config(&cli);
    let messages = LocalizationManager::new(Some(&config.locale))?;

    if let Err(e) = config.validate() {
        error_logging::log_config_error(&e, "OcrConfig", "validate");
        eprintln!("{}", messages.t_args("error-config", &[("error", e.to_string().as_str())]));
        return Ok(ExitCode::FAILURE);
    }

    if !cli.json {
        println!("{}", messages.t("app-title"));
    }

    let image_path = match &cli.image {
        Some(path) => PathBuf::from(clean_path_input(&path.to_string_lossy())),
        None => {
            println!("{}", messages.t("prompt-image-hint"));
            PathBuf::from(clean_path_input(&prompt(&messages.t("prompt-image"))?))
        }
    };

    let mode_input = match &cli.mode {
        Some(mode) => mode.clone(),
        None => prompt(&messages.t("prompt-mode"))?,
    };
    let mode: PreprocessingMode = match mode_input.parse() {
        Ok(mode) => mode,
        Err(e) => {
            error_logging::log_config_error(&e, "mode", "parse_mode");
            eprintln!("{}", messages.t_args("error-invalid-mode", &[("mode", mode_input.as_str())]));
            return Ok(ExitCode::FAILURE);
        }
    };
    if !cli.json {
        println!("{}", messages.t_args("mode-selected", &[("mode", mode.as_str())]));
    }

    let engine = TesseractEngine::from_config(&config);
    if !engine.is_located() {
        eprintln!("{}", messages.t("warn-engine-missing"));
        eprintln!("{}", messages.t("warn-engine-missing-hint"));
    }

    let request = RunRequest {
        image_path: image_path.clone(),
        mode,
    };
    let banner = messages.t("fallback-banner");

    match app::run(&request, &engine, &config, Some(&banner)) {
        Ok(report) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, &messages);
            }
            info!(fallback = report.fallback, "Finished");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if is_input_error(&e) => {
            eprintln!("{}", describe_error(&e, &image_path, &messages));
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}
