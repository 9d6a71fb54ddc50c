//! Signed preview URLs and the preview session that shows them.
use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    clock::Clock,
    config::BrowserConfig,
    error::BrowseError,
    listing::{Entry, EntryKind},
    providers::ObjectStore,
};

/// Time-limited URL granting read access to one object
#[derive(Debug, Clone, PartialEq)]
pub struct SignedUrl {
    pub url: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SignedUrl {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Time left before expiry, zero once expired
    pub fn remaining(&self, now: DateTime<Utc>) -> chrono::Duration {
        (self.expires_at - now).max(chrono::Duration::zero())
    }
}

/// How a selected file is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Video,
    Image,
    /// No overlay, the file is handed to the shell for download
    Download,
}

impl PreviewKind {
    pub fn for_kind(kind: EntryKind) -> Option<PreviewKind> {
        match kind {
            EntryKind::Folder => None,
            EntryKind::Video => Some(PreviewKind::Video),
            EntryKind::Image => Some(PreviewKind::Image),
            EntryKind::Document => Some(PreviewKind::Download),
        }
    }
}

/// Issues signed URLs and deletes objects on behalf of the view
pub struct PreviewUrlResolver {
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl PreviewUrlResolver {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
        config: &BrowserConfig,
    ) -> PreviewUrlResolver {
        PreviewUrlResolver {
            store,
            clock,
            ttl: config.url_ttl,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Signs a fresh URL for `key`; every call asks the store again
    pub async fn resolve(&self, key: &str) -> Result<SignedUrl, BrowseError> {
        let issued_at = self.clock.now();
        let url = self
            .store
            .generate_signed_url(key, self.ttl)
            .await
            .map_err(|e| BrowseError::access(key, e))?;
        debug!(key, "Resolved preview URL");
        Ok(SignedUrl {
            url,
            issued_at,
            expires_at: issued_at
                + chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::zero()),
        })
    }

    /// Deletes `key`. Cached listings are left for the caller to refresh.
    pub async fn remove(&self, key: &str) -> Result<(), BrowseError> {
        self.store
            .delete_object(key)
            .await
            .map_err(|source| BrowseError::Delete {
                key: key.to_owned(),
                source,
            })?;
        info!(key, "Deleted object");
        Ok(())
    }
}

/// Hides the preview key hints after a stretch without input
#[derive(Debug, Clone, PartialEq)]
pub struct ControlsTimer {
    last_activity: DateTime<Utc>,
    hide_after: chrono::Duration,
}

impl ControlsTimer {
    pub fn new(now: DateTime<Utc>, hide_after: Duration) -> ControlsTimer {
        ControlsTimer {
            last_activity: now,
            hide_after: chrono::Duration::from_std(hide_after)
                .unwrap_or_else(|_| chrono::Duration::zero()),
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    pub fn visible(&self, now: DateTime<Utc>) -> bool {
        now - self.last_activity < self.hide_after
    }
}

/// The single open preview overlay
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSession {
    pub entry: Entry,
    pub url: SignedUrl,
    pub kind: PreviewKind,
    pub controls: ControlsTimer,
}
