//! Machine translation output validation.
//!
//! Replacement placeholders (`:name` and `{name}`) are substituted by the
//! presentation layer after lookup, so a machine translation that drops or
//! renames one silently breaks interpolation. This module reports those cases.

use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Critical errors that indicate translation issues
    pub errors: Vec<String>,

    /// Non-critical warnings about potential issues
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if the report is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

/// Validator for machine translation output.
pub struct TranslationValidator;

static COLON_PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
static BRACE_PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Validate a machine translation against its source text.
    ///
    /// Checks that:
    /// - the translation is not blank
    /// - `:name` placeholders are preserved
    /// - `{name}` placeholders are preserved
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        if translated.trim().is_empty() && !original.trim().is_empty() {
            report
                .errors
                .push("Translation is empty but the original is not".to_string());
        }

        let orig_colon = Self::extract_colon_placeholders(original);
        let trans_colon = Self::extract_colon_placeholders(translated);
        if orig_colon != trans_colon {
            report.warnings.push(format!(
                "Placeholder mismatch: original has {:?}, translation has {:?}",
                orig_colon, trans_colon
            ));
        }

        let orig_brace = Self::extract_brace_placeholders(original);
        let trans_brace = Self::extract_brace_placeholders(translated);
        if orig_brace != trans_brace {
            report.warnings.push(format!(
                "Brace placeholder mismatch: original has {:?}, translation has {:?}",
                orig_brace, trans_brace
            ));
        }

        report
    }

    /// Extract `:name` placeholders, sorted
    fn extract_colon_placeholders(text: &str) -> Vec<String> {
        let regex = COLON_PLACEHOLDER_REGEX.get_or_init(|| {
            Regex::new(r"(?:^|[^\w:/]):([A-Za-z_][A-Za-z0-9_]*)").expect("valid placeholder regex")
        });
        Self::collect_sorted(regex, text)
    }

    /// Extract `{name}` placeholders, sorted
    fn extract_brace_placeholders(text: &str) -> Vec<String> {
        let regex = BRACE_PLACEHOLDER_REGEX.get_or_init(|| {
            Regex::new(r"\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}").expect("valid placeholder regex")
        });
        Self::collect_sorted(regex, text)
    }

    fn collect_sorted(regex: &Regex, text: &str) -> Vec<String> {
        let mut found: Vec<String> = regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .collect();
        found.sort();
        found
    }
}
