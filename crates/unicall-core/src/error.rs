//! Error types for the Unicall core library
//!
//! Every failure a subscriber can observe is funneled through [`Error`],
//! using thiserror for the definitions and anyhow for opaque configuration sources.

use thiserror::Error;

use crate::http::ErrorModel;

/// Main error type for Unicall operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configured URL could not be percent-encoded or parsed
    #[error("Bad URL: {url}")]
    BadUrl {
        url: String,
        #[source]
        source: Option<url::ParseError>,
    },

    /// A classified failure: soft transport failure or hard HTTP status
    #[error("API error [{}]: {}", .0.status, .0.message)]
    Api(ErrorModel),

    /// Transport could not be constructed or failed outside classification
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// The subscription ended without a terminal emission
    #[error("Request cancelled")]
    Cancelled,
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The classified error model, if this is an API failure
    pub fn model(&self) -> Option<&ErrorModel> {
        match self {
            Error::Api(model) => Some(model),
            _ => None,
        }
    }

    pub fn is_bad_url(&self) -> bool {
        matches!(self, Error::BadUrl { .. })
    }
}

impl From<ErrorModel> for Error {
    fn from(model: ErrorModel) -> Self {
        Error::Api(model)
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}
