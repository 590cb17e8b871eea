//! Locale registry: the configured set of supported locale codes.
//!
//! The registry is the static configuration surface consulted before a locale
//! row is ever created. A code that is not registered here is rejected with
//! `TranslationError::InvalidLocaleCode`, so no row is written for it.

use crate::error::{Result, TranslationError};

/// Configuration for a supported locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConfig {
    /// Locale code (e.g., "en", "fr", "pt-BR")
    pub code: String,

    /// Display name of the locale (e.g., "English", "French")
    pub name: String,
}

impl LocaleConfig {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Registry of all supported locales, in configuration order.
#[derive(Debug, Clone)]
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
}

impl LocaleRegistry {
    pub fn new(locales: Vec<LocaleConfig>) -> Self {
        Self { locales }
    }

    /// Get a locale configuration by its code.
    ///
    /// # Returns
    /// * `Some(&LocaleConfig)` if the locale is registered
    /// * `None` otherwise
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales.iter().find(|locale| locale.code == code)
    }

    /// Resolve the display name for a code.
    ///
    /// # Errors
    /// `InvalidLocaleCode` if the code has no entry in the registry.
    pub fn display_name(&self, code: &str) -> Result<&str> {
        self.get_by_code(code)
            .map(|locale| locale.name.as_str())
            .ok_or_else(|| TranslationError::InvalidLocaleCode(code.to_string()))
    }

    /// Check if a locale code is supported.
    pub fn is_supported(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }

    /// Get all registered locales.
    pub fn list_all(&self) -> &[LocaleConfig] {
        &self.locales
    }
}
