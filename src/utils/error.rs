//! Error types for vendor checks and the product catalog
//!
//! This module defines custom error types used throughout the application.

use thiserror::Error;

/// Errors that can occur while probing a vendor API
#[derive(Error, Debug)]
pub enum CheckError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Vendor answered with a non-success status code
    #[error("Unexpected status: {0}")]
    Status(u16),

    /// Response body was not the JSON we expected
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Vendor reported a failure inside an otherwise valid response
    #[error("Vendor API error: {0}")]
    Api(String),

    /// Credentials or endpoints required for this vendor are missing
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Request signature could not be computed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl CheckError {
    /// Map a transport error, separating timeouts from other failures
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }

    /// Whether this error is a configuration absence rather than a failure
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }
}

/// Errors raised while loading the product catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// No data source configured
    #[error("Catalog source not configured: {0}")]
    NotConfigured(String),

    /// Connection pool could not be created or a connection acquired
    #[error("Catalog connection failed: {0}")]
    Connection(String),

    /// Connecting or loading did not finish in time
    #[error("Catalog load timed out after {0}s")]
    Timeout(u64),

    /// Query failed
    #[error("Catalog query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Catalog file could not be read
    #[error("Catalog file error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog file did not contain a product list
    #[error("Catalog file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_is_configuration() {
        assert!(CheckError::NotConfigured("amazon".to_string()).is_configuration());
        assert!(!CheckError::Status(500).is_configuration());
        assert!(!CheckError::Timeout.is_configuration());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(CheckError::Status(503).to_string(), "Unexpected status: 503");
        assert_eq!(
            CatalogError::NotConfigured("DATABASE_URL".to_string()).to_string(),
            "Catalog source not configured: DATABASE_URL"
        );
        assert_eq!(
            CatalogError::Timeout(30).to_string(),
            "Catalog load timed out after 30s"
        );
    }
}
