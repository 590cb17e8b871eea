use thiserror::Error;

/// Errors surfaced by the translation resolver.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// The locale code has no entry in the configured locale map
    #[error("Invalid locale code: '{0}'")]
    InvalidLocaleCode(String),

    /// The persistent store failed (constraint violation, connectivity, ...)
    #[error("Translation store error: {0:#}")]
    Store(#[source] anyhow::Error),

    /// The machine translator failed
    #[error("Machine translation failed: {0}")]
    Translator(#[from] TranslatorError),
}

/// Errors returned by a machine translation backend.
#[derive(Debug, Error)]
pub enum TranslatorError {
    /// Non-success HTTP status from the translation API
    #[error("Translation API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Transport-level failure (connection refused, TLS, ...)
    #[error("Translation request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Translation request timed out")]
    Timeout,

    #[error("Translation API returned no text")]
    EmptyResponse,

    #[error("Malformed translation response: {0}")]
    MalformedResponse(String),

    /// Auto-translation is enabled but no translator backend was configured
    #[error("No machine translator configured")]
    NotConfigured,
}

impl TranslatorError {
    /// Determine if an error is retryable (5xx errors, 429 rate limit, network errors)
    /// Other 4xx client errors should not be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslatorError::Api { status, .. } => *status == 429 || *status >= 500,
            TranslatorError::Http(_) | TranslatorError::Timeout => true,
            TranslatorError::EmptyResponse
            | TranslatorError::MalformedResponse(_)
            | TranslatorError::NotConfigured => false,
        }
    }
}

impl From<reqwest::Error> for TranslatorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TranslatorError::Timeout
        } else if err.is_decode() {
            TranslatorError::MalformedResponse(err.to_string())
        } else {
            TranslatorError::Http(err)
        }
    }
}

pub type Result<T, E = TranslationError> = std::result::Result<T, E>;
