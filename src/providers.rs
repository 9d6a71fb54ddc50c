use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

pub mod filesystem;
#[cfg(test)]
pub mod mock;
pub mod s3;

/// One object reported under the listed prefix
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Single page of a delimiter-grouped listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectListing {
    pub common_prefixes: Vec<String>,
    pub contents: Vec<ObjectSummary>,
}

/// The operations the browser needs from an object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists one level under `prefix`, grouping deeper keys by `delimiter`.
    /// Only the first page of results is returned.
    async fn list_objects(&self, prefix: &str, delimiter: &str)
        -> Result<ObjectListing, StoreError>;

    /// Issues a credential-free GET URL for `key`, valid for `ttl`
    async fn generate_signed_url(&self, key: &str, ttl: Duration) -> Result<String, StoreError>;

    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;

    /// Name of the bucket or resource being browsed
    fn resource_name(&self) -> &str;
}
