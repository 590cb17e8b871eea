//! Session-backed storage for the active locale code.

use std::sync::Mutex;
use tracing::warn;

/// Holds the active locale code for one user session.
pub trait SessionLocale: Send + Sync {
    /// Current locale code, if one has been stored
    fn get(&self) -> Option<String>;

    /// Store the locale code for the rest of the session
    fn set(&self, code: &str);
}

/// Session locale held in process memory.
#[derive(Debug, Default)]
pub struct MemorySession {
    locale: Mutex<Option<String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session that already has a locale stored
    pub fn with_locale(code: &str) -> Self {
        Self {
            locale: Mutex::new(Some(code.to_string())),
        }
    }
}

impl SessionLocale for MemorySession {
    fn get(&self) -> Option<String> {
        match self.locale.lock() {
            Ok(locale) => locale.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, code: &str) {
        match self.locale.lock() {
            Ok(mut locale) => *locale = Some(code.to_string()),
            Err(poisoned) => {
                warn!("Session lock poisoned, recovering");
                *poisoned.into_inner() = Some(code.to_string());
            }
        }
    }
}
