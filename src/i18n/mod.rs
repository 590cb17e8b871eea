//! Locale metadata and translation quality support.
//!
//! # Architecture
//!
//! - `registry`: the configured set of supported locale codes and display names
//! - `validator`: placeholder checks on machine-translated output
//! - `metrics`: cache and translator counters for a resolver instance

mod metrics;
mod registry;
mod validator;

pub use metrics::{MetricsReport, TranslationMetrics};
pub use registry::{LocaleConfig, LocaleRegistry};
pub use validator::{TranslationValidator, ValidationReport};
