//! Integration tests for the translation resolver
//!
//! These tests drive the resolver end-to-end with the SQLite store, the
//! in-memory cache and either a stub or a mocked HTTP translator.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use locale_translations::cache::{translation_key, CachedRecord, KeyValueCache, MemoryCache};
use locale_translations::db::{Database, LocaleStore, TranslationStore};
use locale_translations::i18n::LocaleConfig;
use locale_translations::models::{Locale, NewLocale, NewTranslation, Translation};
use locale_translations::retry::RetryConfig;
use locale_translations::session::{MemorySession, SessionLocale};
use locale_translations::translator::{MachineTranslator, OpenAiTranslator};
use locale_translations::{
    RequestContext, Replacements, ResolverSettings, TranslationError, TranslationResolver,
    TranslatorError,
};

// ==================== Test Helpers ====================

/// Store wrapper counting get-or-create calls
struct CountingStore {
    inner: Database,
    locale_creates: AtomicUsize,
    translation_creates: AtomicUsize,
}

impl CountingStore {
    fn new(inner: Database) -> Self {
        Self {
            inner,
            locale_creates: AtomicUsize::new(0),
            translation_creates: AtomicUsize::new(0),
        }
    }
}

impl LocaleStore for CountingStore {
    fn get_or_create_locale(&self, new: &NewLocale<'_>) -> anyhow::Result<(Locale, bool)> {
        self.locale_creates.fetch_add(1, Ordering::SeqCst);
        self.inner.get_or_create_locale(new)
    }
}

impl TranslationStore for CountingStore {
    fn get_or_create_translation(
        &self,
        new: &NewTranslation<'_>,
    ) -> anyhow::Result<(Translation, bool)> {
        self.translation_creates.fetch_add(1, Ordering::SeqCst);
        self.inner.get_or_create_translation(new)
    }

    fn find_by_locale_and_parent(
        &self,
        locale_id: i64,
        parent_id: i64,
    ) -> anyhow::Result<Option<Translation>> {
        self.inner.find_by_locale_and_parent(locale_id, parent_id)
    }
}

/// Translator stub mapping source text to a fixed output
struct StubTranslator {
    mapping: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StubTranslator {
    fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            mapping: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MachineTranslator for StubTranslator {
    async fn translate(&self, text: &str, _from: &str, _to: &str) -> Result<String, TranslatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.mapping
            .get(text)
            .cloned()
            .ok_or(TranslatorError::Timeout)
    }
}

fn locales() -> Vec<LocaleConfig> {
    vec![
        LocaleConfig::new("en", "English"),
        LocaleConfig::new("fr", "French"),
        LocaleConfig::new("es", "Spanish"),
    ]
}

fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("translations.db");
    let db = Database::new(db_path.to_str().unwrap()).expect("Failed to create database");
    (db, temp_dir)
}

fn build_resolver(
    settings: ResolverSettings,
    store: Arc<CountingStore>,
    cache: Arc<MemoryCache>,
) -> TranslationResolver {
    TranslationResolver::new(settings, store.clone(), store, cache).expect("valid settings")
}

// ==================== Example Scenario ====================

#[tokio::test]
async fn test_first_translation_is_machine_translated_persisted_and_cached() {
    let (db, _temp_dir) = create_test_db();
    let store = Arc::new(CountingStore::new(db.clone()));
    let cache = Arc::new(MemoryCache::new());
    let translator = Arc::new(StubTranslator::new(&[("Hello", "bonjour")]));

    let settings = ResolverSettings::new("en", locales())
        .with_auto_translate(true)
        .with_ucfirst(true);
    let resolver = build_resolver(settings, store, cache.clone()).with_translator(translator);

    let session = MemorySession::with_locale("fr");
    let ctx = RequestContext::new(&session);

    let result = resolver
        .translate(&ctx, "Hello", &Replacements::new())
        .await
        .unwrap();
    assert_eq!(result, "Bonjour");

    // Persisted under fr with the en/"Hello" row as parent
    let en = db.find_locale("en").unwrap().unwrap();
    let fr = db.find_locale("fr").unwrap().unwrap();
    let root = &db.translations_for(en.id).unwrap()[0];
    let derived = &db.translations_for(fr.id).unwrap()[0];

    assert_eq!(root.text, "Hello");
    assert!(root.is_root());
    assert_eq!(derived.text, "Bonjour");
    assert_eq!(derived.parent_id, Some(root.id));

    // And cached under the fr key for the source text and its parent
    let cached = cache
        .get(&translation_key("fr", "Hello", Some(root.id)))
        .and_then(CachedRecord::into_translation)
        .unwrap();
    assert_eq!(cached.id, derived.id);
    assert!(cache.get(&translation_key("fr", "Hello", None)).is_none());
}

// ==================== Idempotence ====================

#[tokio::test]
async fn test_locale_creation_reaches_store_once() {
    let (db, _temp_dir) = create_test_db();
    let store = Arc::new(CountingStore::new(db.clone()));
    let resolver = build_resolver(
        ResolverSettings::new("en", locales()),
        store.clone(),
        Arc::new(MemoryCache::new()),
    );

    let first = resolver.first_or_create_locale("es").unwrap();
    let second = resolver.first_or_create_locale("es").unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(store.locale_creates.load(Ordering::SeqCst), 1);
    assert_eq!(db.locale_count().unwrap(), 1);
}

#[tokio::test]
async fn test_repeated_translation_yields_one_row() {
    let (db, _temp_dir) = create_test_db();
    let store = Arc::new(CountingStore::new(db.clone()));
    let resolver = build_resolver(
        ResolverSettings::new("en", locales()),
        store.clone(),
        Arc::new(MemoryCache::new()),
    );

    for _ in 0..5 {
        assert_eq!(resolver.translate_to("Save", "fr").await.unwrap(), "Save");
    }

    // One root row and one derived row
    assert_eq!(db.translation_count().unwrap(), 2);
    assert_eq!(store.translation_creates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_resolvers_with_separate_caches_share_rows() {
    let (db, _temp_dir) = create_test_db();
    let translator = Arc::new(StubTranslator::new(&[("Cancel", "annuler")]));

    let make = || {
        build_resolver(
            ResolverSettings::new("en", locales()).with_auto_translate(true),
            Arc::new(CountingStore::new(db.clone())),
            Arc::new(MemoryCache::new()),
        )
        .with_translator(translator.clone())
    };
    let first = make();
    let second = make();

    assert_eq!(first.translate_to("Cancel", "fr").await.unwrap(), "annuler");
    // Second resolver has a cold cache but finds the stored row
    assert_eq!(second.translate_to("Cancel", "fr").await.unwrap(), "annuler");

    assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(db.translation_count().unwrap(), 2);
}

// ==================== Fallback Chain ====================

#[tokio::test]
async fn test_default_locale_target_creates_no_derived_row() {
    let (db, _temp_dir) = create_test_db();
    let translator = Arc::new(StubTranslator::new(&[("Hello", "should not be used")]));
    let resolver = build_resolver(
        ResolverSettings::new("en", locales()).with_auto_translate(true),
        Arc::new(CountingStore::new(db.clone())),
        Arc::new(MemoryCache::new()),
    )
    .with_translator(translator.clone());

    let session = MemorySession::new();
    let ctx = RequestContext::new(&session);
    let result = resolver
        .translate(&ctx, "Hello", &Replacements::new())
        .await
        .unwrap();

    assert_eq!(result, "Hello");
    assert_eq!(db.translation_count().unwrap(), 1);
    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.get().as_deref(), Some("en"));
}

#[tokio::test]
async fn test_locale_switch_within_session() {
    let (db, _temp_dir) = create_test_db();
    let translator = Arc::new(StubTranslator::new(&[("Yes", "oui")]));
    let resolver = build_resolver(
        ResolverSettings::new("en", locales()).with_auto_translate(true),
        Arc::new(CountingStore::new(db)),
        Arc::new(MemoryCache::new()),
    )
    .with_translator(translator);

    let session = MemorySession::new();
    let ctx = RequestContext::new(&session);
    let data = Replacements::new();

    assert_eq!(resolver.translate(&ctx, "Yes", &data).await.unwrap(), "Yes");
    resolver.set_locale(&ctx, "fr").unwrap();
    assert_eq!(resolver.translate(&ctx, "Yes", &data).await.unwrap(), "oui");
}

// ==================== Cache Write-Once ====================

#[tokio::test]
async fn test_existing_cache_entry_is_not_overwritten() {
    let (db, _temp_dir) = create_test_db();
    let cache = Arc::new(MemoryCache::new());
    let resolver = build_resolver(
        ResolverSettings::new("en", locales()),
        Arc::new(CountingStore::new(db.clone())),
        cache.clone(),
    );

    // Seed the fr locale key with a stale record
    let stale = Locale {
        id: 42,
        code: "fr".to_string(),
        name: "Stale".to_string(),
        created_at: String::new(),
    };
    cache.put(
        "locale:fr",
        CachedRecord::Locale(stale.clone()),
        Duration::from_secs(60),
    );

    let resolved = resolver.first_or_create_locale("fr").unwrap();
    assert_eq!(resolved, stale);

    // A different value for the same key does not replace it
    let fresh = db
        .get_or_create_locale(&NewLocale {
            code: "fr",
            name: "French",
        })
        .unwrap()
        .0;
    assert!(!cache.put_if_absent(
        "locale:fr",
        CachedRecord::Locale(fresh),
        Duration::from_secs(60)
    ));
    let cached = cache.get("locale:fr").and_then(CachedRecord::into_locale).unwrap();
    assert_eq!(cached.id, 42);
}

#[tokio::test]
async fn test_expired_cache_falls_back_to_store() {
    let (db, _temp_dir) = create_test_db();
    let store = Arc::new(CountingStore::new(db));
    let resolver = build_resolver(
        ResolverSettings::new("en", locales()).with_cache_ttl(Duration::ZERO),
        store.clone(),
        Arc::new(MemoryCache::new()),
    );

    let first = resolver.first_or_create_locale("fr").unwrap();
    let second = resolver.first_or_create_locale("fr").unwrap();

    // Nothing stays cached, so both lookups reach the store; the row is shared
    assert_eq!(first.id, second.id);
    assert_eq!(store.locale_creates.load(Ordering::SeqCst), 2);
    assert_eq!(resolver.metrics().rows_created, 1);
}

// ==================== Auto-Translate Gating ====================

#[tokio::test]
async fn test_disabled_auto_translate_stores_placeholder() {
    let (db, _temp_dir) = create_test_db();
    let translator = Arc::new(StubTranslator::new(&[("Welcome", "bienvenue")]));
    let resolver = build_resolver(
        ResolverSettings::new("en", locales()),
        Arc::new(CountingStore::new(db.clone())),
        Arc::new(MemoryCache::new()),
    )
    .with_translator(translator.clone());

    assert_eq!(resolver.translate_to("Welcome", "fr").await.unwrap(), "Welcome");
    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);

    let fr = db.find_locale("fr").unwrap().unwrap();
    assert_eq!(db.translations_for(fr.id).unwrap()[0].text, "Welcome");
}

#[tokio::test]
async fn test_auto_translate_without_ucfirst_keeps_case() {
    let (db, _temp_dir) = create_test_db();
    let resolver = build_resolver(
        ResolverSettings::new("en", locales()).with_auto_translate(true),
        Arc::new(CountingStore::new(db)),
        Arc::new(MemoryCache::new()),
    )
    .with_translator(Arc::new(StubTranslator::new(&[("Welcome", "bienvenue")])));

    assert_eq!(resolver.translate_to("Welcome", "fr").await.unwrap(), "bienvenue");
}

// ==================== Invalid Locale ====================

#[tokio::test]
async fn test_invalid_locale_creates_no_row() {
    let (db, _temp_dir) = create_test_db();
    let store = Arc::new(CountingStore::new(db.clone()));
    let resolver = build_resolver(
        ResolverSettings::new("en", locales()),
        store.clone(),
        Arc::new(MemoryCache::new()),
    );

    let err = resolver.translate_to("Hello", "klingon").await.unwrap_err();
    assert!(matches!(err, TranslationError::InvalidLocaleCode(ref code) if code == "klingon"));

    assert!(db.find_locale("klingon").unwrap().is_none());
    // Only the default locale reached the store
    assert_eq!(store.locale_creates.load(Ordering::SeqCst), 1);
}

// ==================== Translator Failure ====================

#[tokio::test]
async fn test_translator_failure_is_retried_on_next_request_with_fallback() {
    let (db, _temp_dir) = create_test_db();
    let resolver = build_resolver(
        ResolverSettings::new("en", locales())
            .with_auto_translate(true)
            .with_fallback(true),
        Arc::new(CountingStore::new(db.clone())),
        Arc::new(MemoryCache::new()),
    )
    .with_translator(Arc::new(StubTranslator::new(&[])));

    assert_eq!(resolver.translate_to("Hello", "es").await.unwrap(), "Hello");
    assert_eq!(resolver.translate_to("Hello", "es").await.unwrap(), "Hello");

    // Nothing was persisted for es, so each request asked the translator again
    let es = db.find_locale("es").unwrap().unwrap();
    assert!(db.translations_for(es.id).unwrap().is_empty());
    assert_eq!(resolver.metrics().api_calls, 2);
    assert_eq!(resolver.metrics().api_failures, 2);
}

// ==================== HTTP Translator ====================

#[tokio::test]
async fn test_resolver_with_http_translator() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "hola, :name" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let translator = OpenAiTranslator::new(
        "test-openai-key",
        "gpt-4o-mini",
        format!("{}/v1/chat/completions", server.uri()),
        Duration::from_secs(5),
    )
    .unwrap()
    .with_retry(RetryConfig::no_retry());

    let (db, _temp_dir) = create_test_db();
    let resolver = build_resolver(
        ResolverSettings::new("en", locales())
            .with_auto_translate(true)
            .with_ucfirst(true),
        Arc::new(CountingStore::new(db)),
        Arc::new(MemoryCache::new()),
    )
    .with_translator(Arc::new(translator));

    let session = MemorySession::with_locale("es");
    let ctx = RequestContext::new(&session);
    let data: Replacements = [("name".to_string(), "Ana".to_string())].into_iter().collect();

    let first = resolver.translate(&ctx, "hello, :name", &data).await.unwrap();
    let second = resolver.translate(&ctx, "hello, :name", &data).await.unwrap();

    // Placeholders are left for the presentation layer
    assert_eq!(first, "Hola, :name");
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_http_translator_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let translator = OpenAiTranslator::new(
        "test-openai-key",
        "gpt-4o-mini",
        server.uri(),
        Duration::from_secs(5),
    )
    .unwrap();

    let (db, _temp_dir) = create_test_db();
    let resolver = build_resolver(
        ResolverSettings::new("en", locales()).with_auto_translate(true),
        Arc::new(CountingStore::new(db)),
        Arc::new(MemoryCache::new()),
    )
    .with_translator(Arc::new(translator));

    let err = resolver.translate_to("Hello", "fr").await.unwrap_err();
    assert!(matches!(
        err,
        TranslationError::Translator(TranslatorError::Api { status: 400, .. })
    ));
}
