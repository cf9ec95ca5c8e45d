//! # Recognition Orchestrator
//!
//! Runs every binarized variant through every recognition profile and keeps
//! the best transcription.
//!
//! ## Selection
//!
//! Raw engine output is normalized (form-feed page breaks removed, outer
//! whitespace trimmed) and empty results are discarded. The remaining
//! candidates are ranked by a [`TranscriptionScorer`]; the default
//! [`LongestTranscription`] prefers the result with the most characters, and
//! on equal scores the first candidate in variant-major, profile-minor order
//! wins.
//!
//! ## Failures
//!
//! An attempt rejected with [`OcrError::UnsupportedLanguage`] is repeated with
//! the fallback language set, which every later attempt then uses directly.
//! Other failed attempts are skipped. [`OcrError::EngineUnavailable`] stops
//! orchestration and is returned to the caller.

use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::engine::RecognitionEngine;
use crate::errors::error_logging;
use crate::ocr_config::RecognitionProfile;
use crate::ocr_errors::OcrError;
use crate::preprocessing::PreprocessingVariant;

/// Ranks candidate transcriptions; higher is better.
pub trait TranscriptionScorer {
    fn score(&self, text: &str) -> f64;
}

/// Scores a transcription by its character count.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestTranscription;

impl TranscriptionScorer for LongestTranscription {
    fn score(&self, text: &str) -> f64 {
        text.chars().count() as f64
    }
}

/// Strip form-feed page breaks and surrounding whitespace from engine output
pub fn normalize_transcription(raw: &str) -> String {
    raw.replace('\x0c', "").trim().to_string()
}

/// Primary language set plus the narrower set used when the engine lacks
/// data for the primary one.
///
/// Once the primary set has been rejected, every later call goes straight to
/// the fallback set. Clones share that memory, so the orchestrator and the
/// annotation mapper of one run learn it only once.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageSet {
    pub primary: String,
    pub fallback: Option<String>,
    primary_unsupported: Rc<Cell<bool>>,
}

impl LanguageSet {
    pub fn new(primary: impl Into<String>, fallback: Option<String>) -> Self {
        let primary = primary.into();
        // Retrying with the same languages cannot help
        let fallback = fallback.filter(|f| f.trim() != primary.trim());
        Self {
            primary,
            fallback,
            primary_unsupported: Rc::new(Cell::new(false)),
        }
    }

    /// Full engine configuration for one language set and profile
    pub fn engine_config(languages: &str, profile: &RecognitionProfile) -> String {
        format!("-l {} {}", languages, profile.config).trim().to_string()
    }

    /// Whether a previous call found the primary languages unsupported
    pub fn primary_unsupported(&self) -> bool {
        self.primary_unsupported.get()
    }

    /// Run `call` with the primary languages, switching to the fallback set
    /// when the engine reports [`OcrError::UnsupportedLanguage`].
    ///
    /// Any other error is returned as is. Returns the value and whether the
    /// fallback set produced it.
    pub fn run_with_fallback<T>(
        &self,
        profile: &RecognitionProfile,
        mut call: impl FnMut(&str) -> Result<T, OcrError>,
    ) -> Result<(T, bool), OcrError> {
        if let Some(fallback) = self.fallback.as_deref().filter(|_| self.primary_unsupported()) {
            return call(&Self::engine_config(fallback, profile)).map(|value| (value, true));
        }

        match call(&Self::engine_config(&self.primary, profile)) {
            Ok(value) => Ok((value, false)),
            Err(e) if e.is_unsupported_language() => match &self.fallback {
                Some(fallback) => {
                    debug!(
                        error = %e,
                        languages = %fallback,
                        "Primary languages unsupported, switching to fallback languages"
                    );
                    self.primary_unsupported.set(true);
                    call(&Self::engine_config(fallback, profile)).map(|value| (value, true))
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

/// Outcome of one variant x profile combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionAttempt {
    pub variant: String,
    pub profile: String,
    /// Normalized text; empty when the attempt failed or found nothing
    pub text: String,
    pub used_fallback_languages: bool,
    pub error: Option<String>,
}

/// Selected text together with every attempt that was made.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcription {
    pub text: String,
    /// Index into `attempts` of the winning attempt
    pub selected: Option<usize>,
    pub attempts: Vec<RecognitionAttempt>,
}

impl Transcription {
    pub fn selected_attempt(&self) -> Option<&RecognitionAttempt> {
        self.selected.and_then(|i| self.attempts.get(i))
    }
}

/// Runs variants x profiles against an engine and picks the best text.
pub struct RecognitionOrchestrator<'a> {
    engine: &'a dyn RecognitionEngine,
    languages: LanguageSet,
    scorer: Box<dyn TranscriptionScorer + 'a>,
}

impl<'a> RecognitionOrchestrator<'a> {
    /// Orchestrator using the [`LongestTranscription`] scorer.
    pub fn new(engine: &'a dyn RecognitionEngine, languages: LanguageSet) -> Self {
        Self {
            engine,
            languages,
            scorer: Box::new(LongestTranscription),
        }
    }

    /// Replace the selection heuristic
    pub fn with_scorer(mut self, scorer: impl TranscriptionScorer + 'a) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    /// Recognize every variant with every profile.
    ///
    /// # Arguments
    ///
    /// * `variants` - Binarized images, primary first
    /// * `profiles` - Engine configurations tried for each variant
    ///
    /// # Returns
    ///
    /// The best [`Transcription`]; its text is empty when no attempt produced
    /// any.
    ///
    /// # Errors
    ///
    /// [`OcrError::EngineUnavailable`] as soon as any call reports it.
    pub fn recognize(
        &self,
        variants: &[PreprocessingVariant],
        profiles: &[RecognitionProfile],
    ) -> Result<Transcription, OcrError> {
        let start_time = std::time::Instant::now();
        let mut transcription = Transcription::default();
        let mut best_score = f64::NEG_INFINITY;

        for variant in variants {
            for profile in profiles {
                let attempt_start = std::time::Instant::now();
                let result = self.languages.run_with_fallback(profile, |config| {
                    self.engine.recognize_text(&variant.image, config)
                });

                let attempt = match result {
                    Ok((raw, used_fallback)) => RecognitionAttempt {
                        variant: variant.name().to_string(),
                        profile: profile.name.clone(),
                        text: normalize_transcription(&raw),
                        used_fallback_languages: used_fallback,
                        error: None,
                    },
                    Err(e) if e.is_engine_unavailable() => {
                        error_logging::log_ocr_error(
                            &e,
                            "recognize_text",
                            Some(variant.name()),
                            Some(&profile.name),
                            Some(attempt_start.elapsed()),
                        );
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(
                            variant = %variant.name(),
                            profile = %profile.name,
                            error = %e,
                            "Recognition attempt failed, skipping"
                        );
                        RecognitionAttempt {
                            variant: variant.name().to_string(),
                            profile: profile.name.clone(),
                            text: String::new(),
                            used_fallback_languages: self.languages.primary_unsupported(),
                            error: Some(e.to_string()),
                        }
                    }
                };

                debug!(
                    variant = %attempt.variant,
                    profile = %attempt.profile,
                    chars = attempt.text.chars().count(),
                    duration_ms = attempt_start.elapsed().as_millis(),
                    "Recognition attempt finished"
                );

                if !attempt.text.is_empty() {
                    let score = self.scorer.score(&attempt.text);
                    if score > best_score {
                        best_score = score;
                        transcription.text = attempt.text.clone();
                        transcription.selected = Some(transcription.attempts.len());
                    }
                }
                transcription.attempts.push(attempt);
            }
        }

        info!(
            attempts = transcription.attempts.len(),
            selected_variant = ?transcription.selected_attempt().map(|a| a.variant.as_str()),
            selected_profile = ?transcription.selected_attempt().map(|a| a.profile.as_str()),
            chars = transcription.text.chars().count(),
            duration_ms = start_time.elapsed().as_millis(),
            "Recognition finished"
        );

        Ok(transcription)
    }
}
