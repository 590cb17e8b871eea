use crate::i18n::LocaleConfig;
use anyhow::{bail, Context, Result};
use std::time::Duration;

const DEFAULT_SUPPORTED_LOCALES: &str = "en:English,fr:French,es:Spanish,de:German";

#[derive(Debug, Clone)]
pub struct Config {
    // Locales
    pub default_locale: String,
    pub locales: Vec<LocaleConfig>,

    // Auto-translation
    pub auto_translate: bool,
    pub auto_translate_ucfirst: bool,
    pub auto_translate_fallback: bool,

    // Cache
    pub cache_ttl: Duration,

    // Storage
    pub database_path: String,

    // OpenAI
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,
    pub translator_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let locales = parse_locales(
            &std::env::var("SUPPORTED_LOCALES")
                .unwrap_or_else(|_| DEFAULT_SUPPORTED_LOCALES.to_string()),
        )
        .context("Invalid SUPPORTED_LOCALES")?;

        let config = Self {
            // Locales
            default_locale: std::env::var("DEFAULT_LOCALE").unwrap_or_else(|_| "en".to_string()),
            locales,

            // Auto-translation
            auto_translate: env_flag("AUTO_TRANSLATE", false)?,
            auto_translate_ucfirst: env_flag("AUTO_TRANSLATE_UCFIRST", false)?,
            auto_translate_fallback: env_flag("AUTO_TRANSLATE_FALLBACK", false)?,

            // Cache
            cache_ttl: match std::env::var("TRANSLATION_CACHE_MINUTES") {
                Ok(value) => parse_cache_minutes(&value)
                    .context("Invalid TRANSLATION_CACHE_MINUTES")?,
                Err(_) => Duration::from_secs(30 * 60),
            },

            // Storage
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "translations.db".to_string()),

            // OpenAI
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            translator_timeout: Duration::from_secs(
                std::env::var("TRANSLATOR_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that individual variables can't express
    pub fn validate(&self) -> Result<()> {
        if !self.locales.iter().any(|l| l.code == self.default_locale) {
            bail!(
                "DEFAULT_LOCALE '{}' is not listed in SUPPORTED_LOCALES",
                self.default_locale
            );
        }
        if self.auto_translate && self.openai_api_key.is_none() {
            bail!("AUTO_TRANSLATE is enabled but OPENAI_API_KEY is not set");
        }
        Ok(())
    }
}

/// Parse a `code:Display Name` list separated by commas
///
/// Example: `en:English,fr:French`
pub fn parse_locales(raw: &str) -> Result<Vec<LocaleConfig>> {
    let mut locales: Vec<LocaleConfig> = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (code, name) = entry
            .split_once(':')
            .with_context(|| format!("Expected code:name, got '{}'", entry))?;
        let (code, name) = (code.trim(), name.trim());

        if code.is_empty() || name.is_empty() {
            bail!("Locale code and name must not be empty in '{}'", entry);
        }
        if locales.iter().any(|l| l.code == code) {
            bail!("Duplicate locale code '{}'", code);
        }

        locales.push(LocaleConfig::new(code, name));
    }

    if locales.is_empty() {
        bail!("At least one locale must be configured");
    }

    Ok(locales)
}

/// Parse a boolean flag value ("true"/"false", "1"/"0", "yes"/"no")
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Parse a cache lifetime given in whole minutes.
///
/// Values too large to express in seconds saturate instead of overflowing.
pub fn parse_cache_minutes(value: &str) -> Result<Duration> {
    let minutes: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("Expected a number of minutes, got '{}'", value))?;
    Ok(Duration::from_secs(minutes.saturating_mul(60)))
}

fn env_flag(name: &str, default: bool) -> Result<bool> {
    match std::env::var(name) {
        Ok(value) => parse_flag(&value)
            .with_context(|| format!("{} must be a boolean, got '{}'", name, value)),
        Err(_) => Ok(default),
    }
}
