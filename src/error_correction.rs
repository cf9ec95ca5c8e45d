//! # OCR Error Correction Module
//!
//! This module repairs recognition mistakes that follow fixed patterns.
//! It implements two deterministic correction passes:
//!
//! - Exact substring substitutions from an immutable [`CorrectionTable`],
//!   applied line by line, followed by whitespace collapsing
//! - Numeric shape repair: `O`/`o` read in place of zero inside dotted-quad
//!   numbers (`192.O68.1.1`) and a missing space after a list number
//!   (`23.Selesai`)
//!
//! Nothing else is normalized. A literal `O` outside the dotted-quad shape is
//! left alone even when it was meant to be a zero.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace};

use crate::errors::{AppError, AppResult};

lazy_static! {
    /// Four groups of one to three digit-like characters separated by periods
    static ref DOTTED_QUAD_REGEX: Regex =
        Regex::new(r"\b[0-9Oo]{1,3}(?:\.[0-9Oo]{1,3}){3}\b").expect("Invalid dotted quad regex pattern");
    /// A number immediately followed by a period and a capital letter
    static ref NUMBERED_ITEM_REGEX: Regex =
        Regex::new(r"([0-9]+)\.([A-Z])").expect("Invalid numbered item regex pattern");
}

/// One exact-substring substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionRule {
    pub pattern: String,
    pub replacement: String,
}

impl CorrectionRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Built-in substitutions, applied in this order.
const DEFAULT_RULES: &[(&str, &str)] = &[
    // Typographic ligatures and punctuation
    ("\u{fb01}", "fi"),
    ("\u{fb02}", "fl"),
    ("\u{201c}", "\""),
    ("\u{201d}", "\""),
    ("\u{201e}", "\""),
    ("\u{2018}", "'"),
    ("\u{2019}", "'"),
    ("\u{2014}", "-"),
    ("\u{2013}", "-"),
    // l read as i in common Indonesian form words
    ("Selesal", "Selesai"),
    ("Tanggai", "Tanggal"),
    ("Jumiah", "Jumlah"),
    ("Totai", "Total"),
    ("Aiamat", "Alamat"),
    // m read as rn
    ("Nornor", "Nomor"),
    ("Jurnlah", "Jumlah"),
];

/// Immutable, ordered list of substitutions handed to a [`TextCorrector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionTable {
    rules: Vec<CorrectionRule>,
}

impl CorrectionTable {
    /// Build a table from explicit rules.
    ///
    /// # Errors
    ///
    /// `AppError::Config` when a rule has an empty pattern.
    pub fn new(rules: Vec<CorrectionRule>) -> AppResult<Self> {
        if let Some(position) = rules.iter().position(|r| r.pattern.is_empty()) {
            return Err(AppError::Config(format!(
                "correction rule {} has an empty pattern",
                position
            )));
        }
        Ok(Self { rules })
    }

    /// Table without any substitutions
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[CorrectionRule] {
        &self.rules
    }
}

impl Default for CorrectionTable {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES
                .iter()
                .map(|(from, to)| CorrectionRule::new(*from, *to))
                .collect(),
        }
    }
}

/// Applies a [`CorrectionTable`] and the numeric repairs to recognized text.
#[derive(Debug, Clone, Default)]
pub struct TextCorrector {
    table: CorrectionTable,
}

impl TextCorrector {
    pub fn new(table: CorrectionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CorrectionTable {
        &self.table
    }

    /// Correct recognized text.
    ///
    /// Line structure is preserved; each line has its table substitutions
    /// applied, inner whitespace runs collapsed to one space and outer
    /// whitespace removed. The numeric repairs then run on the whole text.
    ///
    /// # Examples
    ///
    /// ```
    /// use pindai_ocr::error_correction::TextCorrector;
    ///
    /// let corrector = TextCorrector::default();
    /// assert_eq!(corrector.correct("IP 192.O68.1.1"), "IP 192.068.1.1");
    /// assert_eq!(corrector.correct("23.Selesai"), "23. Selesai");
    /// ```
    pub fn correct(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        debug!("Starting OCR error correction on {} chars", text.chars().count());

        let substituted = text
            .lines()
            .map(|line| self.correct_line(line))
            .collect::<Vec<_>>()
            .join("\n");

        let corrected = repair_numeric_patterns(&substituted);

        debug!(
            "OCR error correction completed: '{}' -> '{}'",
            text, corrected
        );
        corrected
    }

    fn correct_line(&self, line: &str) -> String {
        let mut corrected = line.to_string();

        for rule in &self.table.rules {
            if corrected.contains(&rule.pattern) {
                let before = corrected.clone();
                corrected = corrected.replace(&rule.pattern, &rule.replacement);
                trace!(
                    "Table correction: '{}' -> '{}' in '{}'",
                    rule.pattern,
                    rule.replacement,
                    before
                );
            }
        }

        corrected.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Fix `O`/`o` zeros in dotted quads, then space out `<number>.<Capital>`.
pub fn repair_numeric_patterns(text: &str) -> String {
    let quads_fixed = DOTTED_QUAD_REGEX.replace_all(text, |caps: &regex::Captures| {
        let matched = &caps[0];
        if matched.chars().any(|c| c.is_ascii_digit()) {
            matched.replace(['O', 'o'], "0")
        } else {
            matched.to_string()
        }
    });

    NUMBERED_ITEM_REGEX
        .replace_all(&quads_fixed, "${1}. ${2}")
        .into_owned()
}
