//! In-memory object store used by the unit tests
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{ObjectListing, ObjectStore, ObjectSummary};
use crate::{
    clock::{Clock, ManualClock},
    error::StoreError,
};

#[derive(Default)]
struct Calls {
    lists: Vec<String>,
    signs: Vec<String>,
    deletes: Vec<String>,
}

/// Store that serves canned listings and issues TTL-stamped tokens
pub struct MockStore {
    clock: Arc<ManualClock>,
    listings: Mutex<HashMap<String, ObjectListing>>,
    failing_lists: Mutex<HashSet<String>>,
    missing_keys: Mutex<HashSet<String>>,
    denied_keys: Mutex<HashSet<String>>,
    fail_deletes: Mutex<bool>,
    issued: Mutex<HashMap<u64, DateTime<Utc>>>,
    calls: Mutex<Calls>,
}

pub fn epoch() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-01T12:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub fn object(key: &str, size: u64) -> ObjectSummary {
    ObjectSummary {
        key: key.to_owned(),
        size,
        last_modified: Some(epoch()),
    }
}

impl MockStore {
    pub fn new(clock: Arc<ManualClock>) -> MockStore {
        MockStore {
            clock,
            listings: Mutex::new(HashMap::new()),
            failing_lists: Mutex::new(HashSet::new()),
            missing_keys: Mutex::new(HashSet::new()),
            denied_keys: Mutex::new(HashSet::new()),
            fail_deletes: Mutex::new(false),
            issued: Mutex::new(HashMap::new()),
            calls: Mutex::new(Calls::default()),
        }
    }

    fn lock_calls(&self) -> MutexGuard<Calls> {
        self.calls.lock().expect("Couldn't lock calls mutex")
    }

    pub fn with_listing(
        self,
        prefix: &str,
        common_prefixes: &[&str],
        contents: Vec<ObjectSummary>,
    ) -> MockStore {
        self.listings.lock().unwrap().insert(
            prefix.to_owned(),
            ObjectListing {
                common_prefixes: common_prefixes.iter().map(|p| p.to_string()).collect(),
                contents,
            },
        );
        self
    }

    pub fn fail_listing(&self, prefix: &str) {
        self.failing_lists.lock().unwrap().insert(prefix.to_owned());
    }

    pub fn heal_listing(&self, prefix: &str) {
        self.failing_lists.lock().unwrap().remove(prefix);
    }

    pub fn mark_missing(&self, key: &str) {
        self.missing_keys.lock().unwrap().insert(key.to_owned());
    }

    pub fn deny_signing(&self, key: &str) {
        self.denied_keys.lock().unwrap().insert(key.to_owned());
    }

    pub fn fail_deletes(&self, fail: bool) {
        *self.fail_deletes.lock().unwrap() = fail;
    }

    pub fn list_calls(&self) -> Vec<String> {
        self.lock_calls().lists.clone()
    }

    pub fn list_calls_for(&self, prefix: &str) -> usize {
        self.lock_calls().lists.iter().filter(|p| *p == prefix).count()
    }

    pub fn sign_calls(&self) -> Vec<String> {
        self.lock_calls().signs.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.lock_calls().deletes.clone()
    }

    /// Whether the store would honour `url` right now
    pub fn accepts(&self, url: &str) -> bool {
        let token = match query_param(url, "token").and_then(|t| t.parse::<u64>().ok()) {
            Some(token) => token,
            None => return false,
        };
        match self.issued.lock().unwrap().get(&token) {
            Some(expires_at) => self.clock.now() < *expires_at,
            None => false,
        }
    }
}

fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn list_objects(
        &self,
        prefix: &str,
        _delimiter: &str,
    ) -> Result<ObjectListing, StoreError> {
        self.lock_calls().lists.push(prefix.to_owned());
        if self.failing_lists.lock().unwrap().contains(prefix) {
            return Err(StoreError::service("Request Error", "connection refused"));
        }
        Ok(self
            .listings
            .lock()
            .unwrap()
            .get(prefix)
            .cloned()
            .unwrap_or_default())
    }

    async fn generate_signed_url(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        self.lock_calls().signs.push(key.to_owned());
        if self.missing_keys.lock().unwrap().contains(key) {
            return Err(StoreError::NotFound(key.to_owned()));
        }
        if self.denied_keys.lock().unwrap().contains(key) {
            return Err(StoreError::service("AccessDenied", "Access Denied"));
        }
        let expires_at = self.clock.now()
            + chrono::Duration::from_std(ttl).expect("ttl out of range");
        let mut issued = self.issued.lock().unwrap();
        let token = issued.len() as u64 + 1;
        issued.insert(token, expires_at);
        Ok(format!(
            "https://mock.store/bucket/{}?token={}&expires={}",
            key,
            token,
            expires_at.timestamp()
        ))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        self.lock_calls().deletes.push(key.to_owned());
        if *self.fail_deletes.lock().unwrap() {
            return Err(StoreError::service("AccessDenied", "Access Denied"));
        }
        for listing in self.listings.lock().unwrap().values_mut() {
            listing.contents.retain(|o| o.key != key);
        }
        Ok(())
    }

    fn resource_name(&self) -> &str {
        "bucket"
    }
}
