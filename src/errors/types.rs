//! Error type definitions for m3u-export

use thiserror::Error;

/// Errors that can abort the processing of a single source
///
/// Uses `thiserror` to provide automatic error trait implementations and
/// proper error chaining.
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP client errors (connection, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from an upstream feed
    #[error("failed to fetch {url}: HTTP status {status}")]
    FetchStatus { url: String, status: u16 },

    /// Filesystem errors (import/export folders, temp files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A filter or transformation pattern that is not a valid regex.
    /// Pattern errors are configuration errors, not per-entry errors.
    #[error("invalid pattern '{pattern}' for field '{field}': {source}")]
    InvalidPattern {
        field: String,
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    /// XML syntax errors while streaming a guide document
    #[error("guide parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Structural guide errors quick-xml does not surface itself
    #[error("malformed guide document: {message}")]
    MalformedGuide { message: String },
}

impl SourceError {
    pub fn invalid_pattern<F: Into<String>, P: Into<String>>(
        field: F,
        pattern: P,
        source: regex::Error,
    ) -> Self {
        Self::InvalidPattern {
            field: field.into(),
            pattern: pattern.into(),
            source: Box::new(source),
        }
    }

    pub fn malformed_guide<S: Into<String>>(message: S) -> Self {
        Self::MalformedGuide {
            message: message.into(),
        }
    }
}
