//! Runtime translation lookup for application text.
//!
//! Given a string in the default locale and a target locale, the resolver
//! returns the best available rendering: from the cache, from the store, or by
//! creating a new row (machine-translated when auto-translation is enabled).

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod i18n;
pub mod models;
pub mod resolver;
pub mod retry;
pub mod session;
pub mod translator;

pub use error::{TranslationError, TranslatorError};
pub use resolver::{RequestContext, Replacements, ResolverSettings, TranslationResolver};
