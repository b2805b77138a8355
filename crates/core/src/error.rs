//! Error types for webclip operations.
//!
//! This module defines the main error type [`WebclipError`] which represents
//! all possible errors that can occur while fetching a page, downloading its
//! images, packaging an EPUB, or writing artifacts to disk.
//!
//! Content extraction deliberately has no error variant: it always degrades
//! to placeholder values instead of failing.

use thiserror::Error;

/// Main error type for article fetch-and-save operations.
///
/// Failures are scoped to a single article. Batch callers are expected to
/// report the error and continue with the next article.
#[derive(Error, Debug)]
pub enum WebclipError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps network errors, DNS failures, connection issues, and other
    /// HTTP-level problems.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    ///
    /// Returned when an HTTP request exceeds the configured timeout duration.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The page responded with a non-success status code.
    ///
    /// Treated as page-unavailable: fatal to this article, harmless to the
    /// rest of a batch.
    #[error("Page unavailable (HTTP status {status})")]
    PageUnavailable { status: u16 },

    /// EPUB packaging failed in both the delegate and the fallback tier.
    ///
    /// Carries the fallback tier's error detail verbatim.
    #[error("EPUB packaging failed: {0}")]
    PackagingError(String),

    /// File and directory I/O errors.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for WebclipError.
pub type Result<T> = std::result::Result<T, WebclipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WebclipError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_page_unavailable_error() {
        let err = WebclipError::PageUnavailable { status: 404 };
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_timeout_error() {
        let err = WebclipError::Timeout { timeout: 30 };
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_packaging_error_carries_detail() {
        let err = WebclipError::PackagingError("zip finish failed".to_string());
        assert!(err.to_string().contains("zip finish failed"));
    }
}
