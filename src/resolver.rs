//! Translation resolver: cache, then store, then machine translation.
//!
//! A lookup first resolves the root translation of the source text in the
//! default locale, then the rendering of that root in the target locale. Rows
//! missing from the store are created on the way, and every row that is read
//! or created is written to the cache with write-once semantics.

use crate::cache::{locale_key, translation_key, CachedRecord, KeyValueCache};
use crate::config::Config;
use crate::db::{LocaleStore, TranslationStore};
use crate::error::{Result, TranslationError, TranslatorError};
use crate::i18n::{
    LocaleConfig, LocaleRegistry, MetricsReport, TranslationMetrics, TranslationValidator,
};
use crate::models::{Locale, NewLocale, NewTranslation, Translation};
use crate::session::SessionLocale;
use crate::translator::MachineTranslator;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Substitution variables passed along with a lookup.
///
/// The resolver returns the translated template; replacing `:name` style
/// variables is left to the presentation layer.
pub type Replacements = HashMap<String, String>;

/// Default cache lifetime for locale and translation entries
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Application-scoped resolver settings
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub default_locale: String,
    pub locales: LocaleRegistry,
    pub auto_translate: bool,
    pub auto_translate_ucfirst: bool,
    /// Return the untranslated text instead of failing when the translator errors
    pub auto_translate_fallback: bool,
    pub cache_ttl: Duration,
}

impl ResolverSettings {
    pub fn new(default_locale: impl Into<String>, locales: Vec<LocaleConfig>) -> Self {
        Self {
            default_locale: default_locale.into(),
            locales: LocaleRegistry::new(locales),
            auto_translate: false,
            auto_translate_ucfirst: false,
            auto_translate_fallback: false,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            default_locale: config.default_locale.clone(),
            locales: LocaleRegistry::new(config.locales.clone()),
            auto_translate: config.auto_translate,
            auto_translate_ucfirst: config.auto_translate_ucfirst,
            auto_translate_fallback: config.auto_translate_fallback,
            cache_ttl: config.cache_ttl,
        }
    }

    pub fn with_auto_translate(mut self, enabled: bool) -> Self {
        self.auto_translate = enabled;
        self
    }

    pub fn with_ucfirst(mut self, enabled: bool) -> Self {
        self.auto_translate_ucfirst = enabled;
        self
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.auto_translate_fallback = enabled;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

/// Request-scoped state: the session of the user being served.
#[derive(Clone, Copy)]
pub struct RequestContext<'a> {
    session: &'a dyn SessionLocale,
}

impl<'a> RequestContext<'a> {
    pub fn new(session: &'a dyn SessionLocale) -> Self {
        Self { session }
    }
}

/// A translation together with the locale it is written in
#[derive(Debug, Clone, Copy)]
pub struct ParentTranslation<'a> {
    pub translation: &'a Translation,
    pub locale: &'a Locale,
}

pub struct TranslationResolver {
    settings: ResolverSettings,
    locales: Arc<dyn LocaleStore>,
    translations: Arc<dyn TranslationStore>,
    cache: Arc<dyn KeyValueCache>,
    translator: Option<Arc<dyn MachineTranslator>>,
    metrics: TranslationMetrics,
}

impl TranslationResolver {
    /// Create a resolver.
    ///
    /// # Errors
    /// `InvalidLocaleCode` if the default locale is not in the registry.
    pub fn new(
        settings: ResolverSettings,
        locales: Arc<dyn LocaleStore>,
        translations: Arc<dyn TranslationStore>,
        cache: Arc<dyn KeyValueCache>,
    ) -> Result<Self> {
        settings.locales.display_name(&settings.default_locale)?;

        Ok(Self {
            settings,
            locales,
            translations,
            cache,
            translator: None,
            metrics: TranslationMetrics::new(),
        })
    }

    /// Attach the machine translator used when auto-translation is enabled
    pub fn with_translator(mut self, translator: Arc<dyn MachineTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn default_locale(&self) -> &str {
        &self.settings.default_locale
    }

    /// Change the default locale used for root translations.
    pub fn set_default_locale(&mut self, code: &str) -> Result<()> {
        self.settings.locales.display_name(code)?;
        self.settings.default_locale = code.to_string();
        Ok(())
    }

    /// All configured locales, in configuration order
    pub fn supported_locales(&self) -> &[LocaleConfig] {
        self.settings.locales.list_all()
    }

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    /// Current session locale.
    ///
    /// A session without a locale is initialized with the default locale,
    /// which is stored and returned.
    pub fn get_locale(&self, ctx: &RequestContext<'_>) -> String {
        match ctx.session.get() {
            Some(code) => code,
            None => {
                let code = self.settings.default_locale.clone();
                ctx.session.set(&code);
                code
            }
        }
    }

    /// Store `code` as the session locale.
    pub fn set_locale(&self, ctx: &RequestContext<'_>, code: &str) -> Result<()> {
        self.settings.locales.display_name(code)?;
        ctx.session.set(code);
        Ok(())
    }

    /// Translate `text` into the session locale.
    pub async fn translate(
        &self,
        ctx: &RequestContext<'_>,
        text: &str,
        data: &Replacements,
    ) -> Result<String> {
        debug!(replacements = data.len(), "Translating for session locale");

        let default_translation = self.get_default_translation(text).await?;
        let target_code = self.get_locale(ctx);
        self.resolve(default_translation, &target_code).await
    }

    /// Translate `text` into an explicit locale, leaving the session untouched.
    pub async fn translate_to(&self, text: &str, code: &str) -> Result<String> {
        let default_translation = self.get_default_translation(text).await?;
        self.resolve(default_translation, code).await
    }

    /// Root translation of `text` in the default locale, created if missing
    pub async fn get_default_translation(&self, text: &str) -> Result<Translation> {
        let default_locale = self.first_or_create_locale(&self.settings.default_locale)?;
        self.first_or_create_translation(&default_locale, text, None)
            .await
    }

    /// Locale row for `code`, served from cache or created from configuration.
    pub fn first_or_create_locale(&self, code: &str) -> Result<Locale> {
        let key = locale_key(code);

        if let Some(locale) = self.cache.get(&key).and_then(CachedRecord::into_locale) {
            self.metrics.record_cache_hit();
            debug!(code, "Locale cache hit");
            return Ok(locale);
        }
        self.metrics.record_cache_miss();

        let name = self.settings.locales.display_name(code)?;
        let (locale, created) = self
            .locales
            .get_or_create_locale(&NewLocale { code, name })
            .map_err(TranslationError::Store)?;

        if created {
            self.metrics.record_row_created();
        }

        self.cache_put(&key, CachedRecord::Locale(locale.clone()));
        Ok(locale)
    }

    /// Translation of `text` in `locale`, served from cache or created.
    ///
    /// With a parent and auto-translation enabled, the stored text is the
    /// machine translation of `text` from the parent's locale. Otherwise `text`
    /// is stored as-is, which for a derived row is a copy of the parent's text.
    pub async fn first_or_create_translation(
        &self,
        locale: &Locale,
        text: &str,
        parent: Option<ParentTranslation<'_>>,
    ) -> Result<Translation> {
        let key = translation_key(&locale.code, text, parent.map(|p| p.translation.id));

        if let Some(translation) = self.cached_translation(&key) {
            return Ok(translation);
        }

        self.create_translation(&key, locale, text, parent).await
    }

    /// Store-side half of `first_or_create_translation`, for callers that
    /// have already missed the cache under `key`.
    async fn create_translation(
        &self,
        key: &str,
        locale: &Locale,
        text: &str,
        parent: Option<ParentTranslation<'_>>,
    ) -> Result<Translation> {
        let stored_text = match parent {
            Some(parent) if self.settings.auto_translate => {
                self.machine_translate(text, &parent.locale.code, &locale.code)
                    .await?
            }
            _ => text.to_string(),
        };

        let (translation, created) = self
            .translations
            .get_or_create_translation(&NewTranslation {
                locale_id: locale.id,
                parent_id: parent.map(|p| p.translation.id),
                text: &stored_text,
            })
            .map_err(TranslationError::Store)?;

        if created {
            self.metrics.record_row_created();
            if parent.is_some() {
                info!(
                    locale = %locale.code,
                    id = translation.id,
                    "Created translation"
                );
            }
        }

        self.cache_put(key, CachedRecord::Translation(translation.clone()));
        Ok(translation)
    }

    async fn resolve(&self, default_translation: Translation, target_code: &str) -> Result<String> {
        let default_locale = self.first_or_create_locale(&self.settings.default_locale)?;
        let target = self.first_or_create_locale(target_code)?;

        if target.id == default_locale.id {
            let existing = self
                .translations
                .find_by_locale_and_parent(target.id, default_translation.id)
                .map_err(TranslationError::Store)?;
            return Ok(existing.map_or(default_translation.text, |t| t.text));
        }

        let key = translation_key(
            &target.code,
            &default_translation.text,
            Some(default_translation.id),
        );
        if let Some(translation) = self.cached_translation(&key) {
            return Ok(translation.text);
        }

        let existing = self
            .translations
            .find_by_locale_and_parent(target.id, default_translation.id)
            .map_err(TranslationError::Store)?;
        if let Some(translation) = existing {
            self.cache_put(&key, CachedRecord::Translation(translation.clone()));
            return Ok(translation.text);
        }

        let parent = ParentTranslation {
            translation: &default_translation,
            locale: &default_locale,
        };
        match self
            .create_translation(&key, &target, &default_translation.text, Some(parent))
            .await
        {
            Ok(translation) => Ok(translation.text),
            Err(TranslationError::Translator(e)) if self.settings.auto_translate_fallback => {
                warn!(
                    locale = %target.code,
                    error = %e,
                    "Machine translation failed, serving untranslated text"
                );
                Ok(default_translation.text)
            }
            Err(e) => Err(e),
        }
    }

    async fn machine_translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        let translator = self
            .translator
            .as_ref()
            .ok_or(TranslatorError::NotConfigured)?;

        self.metrics.record_api_call();
        let translated = match translator.translate(text, from, to).await {
            Ok(translated) => translated,
            Err(e) => {
                self.metrics.record_api_failure();
                warn!(from, to, error = %e, "Machine translation failed");
                return Err(e.into());
            }
        };

        let translated = if self.settings.auto_translate_ucfirst {
            capitalize_first(&translated)
        } else {
            translated
        };

        let validation = TranslationValidator::validate(text, &translated);
        if validation.has_warnings() {
            warn!("Translation validation warnings for {}: {:?}", to, validation.warnings);
        }
        if validation.has_errors() {
            warn!("Translation validation errors for {}: {:?}", to, validation.errors);
        }

        Ok(translated)
    }

    fn cached_translation(&self, key: &str) -> Option<Translation> {
        match self.cache.get(key).and_then(CachedRecord::into_translation) {
            Some(translation) => {
                self.metrics.record_cache_hit();
                debug!(key, "Translation cache hit");
                Some(translation)
            }
            None => {
                self.metrics.record_cache_miss();
                None
            }
        }
    }

    fn cache_put(&self, key: &str, record: CachedRecord) {
        if !self.cache.put_if_absent(key, record, self.settings.cache_ttl) {
            debug!(key, "Cache entry already present, not overwriting");
        }
    }
}

/// Uppercase the first character of `text`
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
