//! Translate strings from the command line against the local translation store.
//!
//! Usage:
//!   locale-translations [--locale CODE] TEXT...
//!   locale-translations --list-locales
//!
//! Configuration is read from the environment (see `Config::from_env`).

use anyhow::{bail, Context, Result};
use locale_translations::cache::MemoryCache;
use locale_translations::config::Config;
use locale_translations::db::Database;
use locale_translations::session::MemorySession;
use locale_translations::translator::OpenAiTranslator;
use locale_translations::{RequestContext, Replacements, ResolverSettings, TranslationResolver};
use std::sync::Arc;
use tracing::info;

struct Args {
    locale: Option<String>,
    list_locales: bool,
    texts: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        locale: None,
        list_locales: false,
        texts: Vec::new(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--locale" | "-l" => {
                args.locale = Some(iter.next().context("--locale requires a value")?);
            }
            "--list-locales" => args.list_locales = true,
            _ => args.texts.push(arg),
        }
    }

    if !args.list_locales && args.texts.is_empty() {
        bail!("Usage: locale-translations [--locale CODE] TEXT... | --list-locales");
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("locale_translations=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let config = Config::from_env()?;

    let db = Database::new(&config.database_path)?;
    let mut resolver = TranslationResolver::new(
        ResolverSettings::from_config(&config),
        Arc::new(db.clone()),
        Arc::new(db),
        Arc::new(MemoryCache::new()),
    )?;

    if config.auto_translate {
        let translator = OpenAiTranslator::from_config(&config)?;
        resolver = resolver.with_translator(Arc::new(translator));
        info!("Auto-translation enabled (model: {})", config.openai_model);
    }

    if args.list_locales {
        for locale in resolver.supported_locales() {
            let marker = if locale.code == resolver.default_locale() { " (default)" } else { "" };
            println!("{}\t{}{}", locale.code, locale.name, marker);
        }
        return Ok(());
    }

    let session = MemorySession::new();
    let ctx = RequestContext::new(&session);
    if let Some(code) = &args.locale {
        resolver.set_locale(&ctx, code)?;
    }

    for text in &args.texts {
        let translated = resolver.translate(&ctx, text, &Replacements::new()).await?;
        println!("{}", translated);
    }

    let report = resolver.metrics();
    info!(
        "Done: {} cache hits, {} misses, {} rows created, {} translator calls",
        report.cache_hits, report.cache_misses, report.rows_created, report.api_calls
    );
    Ok(())
}
