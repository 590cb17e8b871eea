use serde::{Deserialize, Serialize};

/// A language/region code with a human-readable display name.
///
/// Rows are created on first request for a code and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    pub id: i64,
    /// Unique code (e.g., "en", "fr")
    pub code: String,
    /// Display name taken from configuration (e.g., "English")
    pub name: String,
    pub created_at: String,
}

/// A stored rendering of text in a given locale.
///
/// A translation without a parent is a root translation: the original text in
/// the default locale. A translation with a parent renders the parent's text
/// in another locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: i64,
    pub locale_id: i64,
    pub text: String,
    pub parent_id: Option<i64>,
    pub created_at: String,
}

impl Translation {
    /// Check if this is a root (default-locale original) translation
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Attributes for a locale row that may not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLocale<'a> {
    pub code: &'a str,
    pub name: &'a str,
}

/// Attributes for a translation row that may not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTranslation<'a> {
    pub locale_id: i64,
    pub parent_id: Option<i64>,
    pub text: &'a str,
}
