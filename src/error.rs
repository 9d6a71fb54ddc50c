//! Error types shared by the store providers and the browser core.
use thiserror::Error;

/// Failure reported by an object store provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The key does not exist (or vanished since it was listed)
    #[error("No such key: {0}")]
    NotFound(String),

    /// Any other failure, carrying the store's error code and message
    #[error("{code} - {message}")]
    Service { code: String, message: String },
}

impl StoreError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> StoreError {
        StoreError::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            StoreError::NotFound(_) => "NoSuchKey",
            StoreError::Service { code, .. } => code,
        }
    }
}

/// Failure of a browser operation, tagged with the operation that failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrowseError {
    /// Transport or auth failure while listing a prefix
    #[error("Couldn't list '{prefix}': {source}")]
    Listing { prefix: String, source: StoreError },

    /// The store refused to sign an access URL
    #[error("Couldn't access '{key}': {source}")]
    Access { key: String, source: StoreError },

    /// The key disappeared between listing and access
    #[error("'{key}' no longer exists")]
    NotFound { key: String },

    /// The store rejected a delete
    #[error("Couldn't delete '{key}': {source}")]
    Delete { key: String, source: StoreError },
}

impl BrowseError {
    pub(crate) fn access(key: &str, source: StoreError) -> BrowseError {
        match source {
            StoreError::NotFound(_) => BrowseError::NotFound {
                key: key.to_owned(),
            },
            source => BrowseError::Access {
                key: key.to_owned(),
                source,
            },
        }
    }

    /// `NotFound` counts as an access failure.
    pub fn is_access_error(&self) -> bool {
        matches!(self, BrowseError::Access { .. } | BrowseError::NotFound { .. })
    }

    pub fn code(&self) -> &str {
        match self {
            BrowseError::Listing { source, .. }
            | BrowseError::Access { source, .. }
            | BrowseError::Delete { source, .. } => source.code(),
            BrowseError::NotFound { .. } => "NoSuchKey",
        }
    }
}
