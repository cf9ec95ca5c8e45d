//! Observability module for logging setup.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - Span helpers for pipeline runs and stages
//!
//! Logs go to stderr so that stdout stays reserved for the recognized text
//! and the run report.

use anyhow::Result;
use tracing_subscriber::prelude::*;

/// Log output format selected through `LOG_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value; anything unknown means compact
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

/// Default filter directive for a `LOG_LEVEL` value
pub fn default_directive(level: Option<&str>) -> String {
    let level = match level.map(|l| l.trim().to_lowercase()).as_deref() {
        Some(l @ ("trace" | "debug" | "info" | "warn" | "error" | "off")) => l.to_string(),
        _ => "warn".to_string(),
    };
    format!("pindai_ocr={level},pindai={level}")
}

/// Initialize structured logging with tracing.
///
/// `RUST_LOG` wins over the `LOG_LEVEL` default. Calling this twice is
/// harmless; the second subscriber is simply not installed.
pub fn init_tracing() -> Result<()> {
    let log_format = LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref());
    let directive = default_directive(std::env::var("LOG_LEVEL").ok().as_deref());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&directive))?;

    let installed = match log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(log_format = ?log_format, directive = %directive, "Tracing initialized");
    }
    Ok(())
}

/// Create a span covering one pipeline run
pub fn pipeline_span(mode: &str, image: &str) -> tracing::Span {
    tracing::info_span!("pipeline_run", mode = mode, image = image, component = "ocr")
}

/// Create a span for writing output files
pub fn output_span(directory: &str) -> tracing::Span {
    tracing::info_span!("write_outputs", directory = directory, component = "output")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_env_value(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some(" Pretty ")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(Some("xml")), LogFormat::Compact);
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Compact);
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(None), "pindai_ocr=warn,pindai=warn");
        assert_eq!(default_directive(Some("DEBUG")), "pindai_ocr=debug,pindai=debug");
        assert_eq!(default_directive(Some("loud")), "pindai_ocr=warn,pindai=warn");
    }

    #[test]
    fn test_default_directive_enables_crate_spans() {
        let filter = tracing_subscriber::EnvFilter::try_new(default_directive(Some("debug")))
            .expect("default directive should parse");
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let span = pipeline_span("enhanced", "nota.jpg");
            assert!(!span.is_disabled());
            let _guard = span.enter();
            tracing::debug!("inside pipeline span");
        });
    }
}
