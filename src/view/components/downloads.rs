use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crossterm::event::KeyEvent;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use super::err::Notification;
use crate::{
    listing::Entry,
    preview::SignedUrl,
    providers::{
        filesystem::{create_download_file, write_file_from_stream},
        s3::S3Provider,
    },
    view::{browser::Shell, event::Event},
};

/// Saves documents into a local directory on a background task
pub struct DownloadShell {
    client: Arc<S3Provider>,
    dir: PathBuf,
    events: UnboundedSender<Event<KeyEvent>>,
}

impl DownloadShell {
    pub fn new(
        client: Arc<S3Provider>,
        dir: PathBuf,
        events: UnboundedSender<Event<KeyEvent>>,
    ) -> DownloadShell {
        DownloadShell {
            client,
            dir,
            events,
        }
    }

    /// Fetches `key` and writes it under a fresh name in `dir`
    async fn save(
        client: &S3Provider,
        dir: &Path,
        key: &str,
        name: &str,
    ) -> Result<(PathBuf, u64), String> {
        let stream = client.download_object(key).await.map_err(|e| e.to_string())?;
        let (target, file) = create_download_file(dir, name).map_err(|e| e.to_string())?;
        let written = write_file_from_stream(&target, file, stream)
            .await
            .map_err(|e| e.to_string())?;
        Ok((target, written))
    }
}

impl Shell for DownloadShell {
    fn needs_signed_url(&self) -> bool {
        false
    }

    fn trigger_download(&self, entry: &Entry, url: Option<&SignedUrl>) {
        let client = self.client.clone();
        let events = self.events.clone();
        let dir = self.dir.clone();
        let key = entry.key.clone();
        let name = entry.name.clone();
        info!(
            key = %key,
            url_expires_at = ?url.map(|u| u.expires_at),
            dir = %dir.display(),
            "Starting download"
        );

        tokio::spawn(async move {
            let notification = match Self::save(&client, &dir, &key, &name).await {
                Ok((target, bytes)) => {
                    info!(key = %key, bytes, target = %target.display(), "Download finished");
                    Notification::info(
                        "Download",
                        format!("Saved {} to {}", key, target.display()),
                    )
                }
                Err(message) => {
                    warn!(key = %key, error = %message, "Download failed");
                    Notification::new(
                        String::from("Download"),
                        format!("(File: {}) {}", key, message),
                        String::from("Download Error"),
                    )
                }
            };
            // The loop may already be gone on shutdown
            let _ = events.send(Event::Notify(notification));
        });
    }
}
