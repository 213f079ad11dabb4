//! Unified error handling for the stockwatch crate
//!
//! Domain-specific errors ([`CheckError`], [`CatalogError`], [`ChannelError`])
//! are wrapped by a single [`Error`] enum so module boundaries can share one
//! `Result` type while keeping the original error available.
//!
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors

use thiserror::Error;

pub use crate::notifications::channels::ChannelError;
pub use crate::utils::error::{CatalogError, CheckError};

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Vendor or Telegram request failures
    Network,
    /// Vendor payload did not decode
    Parsing,
    /// Catalog source failures
    Storage,
    /// Missing or invalid configuration
    Config,
    /// A store task could not be joined
    Scheduler,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Scheduler => "scheduler",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the stockwatch crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Check error: {0}")]
    Check(#[from] CheckError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// A store task was cancelled or could not be joined
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Whether the next cycle may succeed without operator action
    ///
    /// The daemon cools down either way; unrecoverable failures are logged
    /// louder so a missing `DATABASE_URL` does not look like an outage.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Check(e) => !e.is_configuration(),
            Self::Catalog(CatalogError::NotConfigured(_) | CatalogError::Format(_)) => false,
            Self::Catalog(_) => true,
            Self::Channel(ChannelError::InvalidConfig(_)) => false,
            Self::Channel(_) => true,
            Self::Task(_) => true,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Check(CheckError::Decode(_)) => ErrorCategory::Parsing,
            Self::Check(CheckError::NotConfigured(_)) => ErrorCategory::Config,
            Self::Check(_) | Self::Channel(_) => ErrorCategory::Network,
            Self::Catalog(CatalogError::NotConfigured(_)) => ErrorCategory::Config,
            Self::Catalog(_) => ErrorCategory::Storage,
            Self::Task(_) => ErrorCategory::Scheduler,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let check_err = Error::Check(CheckError::Timeout);
        assert_eq!(check_err.category(), ErrorCategory::Network);

        let decode_err = Error::Check(CheckError::Decode("bad json".to_string()));
        assert_eq!(decode_err.category(), ErrorCategory::Parsing);

        let catalog_err = Error::Catalog(CatalogError::Connection("refused".to_string()));
        assert_eq!(catalog_err.category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_is_recoverable() {
        let outage = Error::Catalog(CatalogError::Connection("refused".to_string()));
        assert!(outage.is_recoverable());

        let missing = Error::Check(CheckError::NotConfigured("amazon".to_string()));
        assert!(!missing.is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let catalog_err = CatalogError::NotConfigured("DATABASE_URL".to_string());
        let unified: Error = catalog_err.into();
        assert!(matches!(unified, Error::Catalog(_)));
        assert_eq!(unified.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_timeout_is_recoverable_storage() {
        let err = Error::Catalog(CatalogError::Timeout(30));
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Storage);
    }

    #[tokio::test]
    async fn test_cancelled_task_is_scheduler_error() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let err: Error = handle.await.unwrap_err().into();

        assert_eq!(err.category(), ErrorCategory::Scheduler);
        assert!(err.is_recoverable());
    }
}
