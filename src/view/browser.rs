//! State machine behind the browser screen.
//!
//! The view owns the current path, the entries of the current directory, the
//! open preview and the notification stack. Listing work is handed out as
//! [`ListingRequest`]s so it can run off the UI task; a completed request is
//! only applied while it is still the latest one for the current path.
use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::components::err::Notification;
use crate::{
    config::BrowserConfig,
    error::BrowseError,
    listing::{Entry, ListingProjector},
    preview::{ControlsTimer, PreviewKind, PreviewSession, PreviewUrlResolver, SignedUrl},
    utils::DirectoryPath,
};

/// Capabilities the surrounding shell provides to the view
pub trait Shell {
    /// Whether documents are handed over with a signed URL. Shells that read
    /// the object through the store client themselves return false and get
    /// `None`, so no URL is signed for them.
    fn needs_signed_url(&self) -> bool {
        true
    }

    /// Hands a file to the user outside of the preview overlay
    fn trigger_download(&self, entry: &Entry, url: Option<&SignedUrl>);
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle(DirectoryPath),
    Loading(DirectoryPath),
    Loaded {
        path: DirectoryPath,
        entries: Arc<Vec<Entry>>,
    },
    Error {
        path: DirectoryPath,
        message: String,
    },
}

impl ViewState {
    pub fn path(&self) -> &DirectoryPath {
        match self {
            ViewState::Idle(path) | ViewState::Loading(path) => path,
            ViewState::Loaded { path, .. } | ViewState::Error { path, .. } => path,
        }
    }
}

/// A listing the view is waiting for
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRequest {
    path: DirectoryPath,
    generation: u64,
}

impl ListingRequest {
    pub fn path(&self) -> &DirectoryPath {
        &self.path
    }

    pub fn prefix(&self) -> String {
        self.path.prefix()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    /// A folder was selected; the request must be loaded
    Navigate(ListingRequest),
    /// The preview overlay is open
    Previewing(PreviewKind),
    /// The file was handed to the shell
    Downloading,
    /// The URL couldn't be resolved, a notification was raised
    Failed,
}

pub struct BrowserView {
    projector: Arc<ListingProjector>,
    resolver: Arc<PreviewUrlResolver>,
    state: ViewState,
    generation: u64,
    preview: Option<PreviewSession>,
    resolved_urls: HashMap<String, SignedUrl>,
    pending_delete: Option<Entry>,
    notifications: Vec<Notification>,
    controls_hide_after: Duration,
}

impl BrowserView {
    pub fn new(
        projector: Arc<ListingProjector>,
        resolver: Arc<PreviewUrlResolver>,
        config: &BrowserConfig,
    ) -> BrowserView {
        BrowserView {
            projector,
            resolver,
            state: ViewState::Idle(DirectoryPath::root()),
            generation: 0,
            preview: None,
            resolved_urls: HashMap::new(),
            pending_delete: None,
            notifications: Vec::new(),
            controls_hide_after: config.controls_hide_after,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn path(&self) -> &DirectoryPath {
        self.state.path()
    }

    /// Entries of the current directory, if it has loaded
    pub fn entries(&self) -> Option<&Arc<Vec<Entry>>> {
        match &self.state {
            ViewState::Loaded { entries, .. } => Some(entries),
            _ => None,
        }
    }

    pub fn preview(&self) -> Option<&PreviewSession> {
        self.preview.as_ref()
    }

    pub fn pending_delete(&self) -> Option<&Entry> {
        self.pending_delete.as_ref()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn resource_name(&self) -> &str {
        self.projector.resource_name()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.resolver.now()
    }

    pub fn projector(&self) -> Arc<ListingProjector> {
        self.projector.clone()
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn dismiss_notifications(&mut self) {
        self.notifications.clear();
    }

    fn begin_loading(&mut self, path: DirectoryPath) -> ListingRequest {
        self.generation += 1;
        debug!(prefix = %path.prefix(), generation = self.generation, "Loading listing");
        self.state = ViewState::Loading(path.clone());
        ListingRequest {
            path,
            generation: self.generation,
        }
    }

    /// Loads the root directory
    pub fn start(&mut self) -> ListingRequest {
        self.begin_loading(DirectoryPath::root())
    }

    /// Descends into `segment`, superseding any listing still in flight
    pub fn navigate(&mut self, segment: &str) -> ListingRequest {
        let path = self.path().child(segment);
        info!(path = %path.display(), "Navigating");
        self.preview = None;
        self.begin_loading(path)
    }

    /// Goes one level up; `None` at the root
    pub fn back(&mut self) -> Option<ListingRequest> {
        if self.path().is_root() {
            return None;
        }
        let path = self.path().parent();
        info!(path = %path.display(), "Navigating back");
        self.preview = None;
        Some(self.begin_loading(path))
    }

    /// Reloads the current directory, dropping its entries immediately
    pub fn refresh(&mut self) -> ListingRequest {
        let path = self.path().clone();
        self.begin_loading(path)
    }

    /// Applies a finished listing. Returns false when the result was stale
    /// and has been dropped.
    pub fn complete_listing(
        &mut self,
        request: ListingRequest,
        result: Result<Vec<Entry>, BrowseError>,
    ) -> bool {
        if request.generation != self.generation || request.path != *self.path() {
            debug!(
                prefix = %request.prefix(),
                generation = request.generation,
                "Dropping stale listing"
            );
            return false;
        }
        self.resolved_urls.clear();
        self.state = match result {
            Ok(entries) => ViewState::Loaded {
                path: request.path,
                entries: Arc::new(entries),
            },
            Err(e) => {
                warn!(error = %e, "Listing failed");
                ViewState::Error {
                    path: request.path,
                    message: e.to_string(),
                }
            }
        };
        true
    }

    /// Runs `request` against the store and applies the result
    pub async fn load(&mut self, request: ListingRequest) -> bool {
        let result = self.projector.list(&request.prefix()).await;
        self.complete_listing(request, result)
    }

    /// Previously issued URL for `entry` that hasn't expired yet
    fn known_url(&self, entry: &Entry) -> Option<SignedUrl> {
        let now = self.resolver.now();
        entry
            .preview_url
            .iter()
            .chain(self.resolved_urls.get(&entry.key))
            .find(|url| url.is_valid_at(now))
            .cloned()
    }

    async fn url_for(&mut self, entry: &Entry) -> Result<SignedUrl, BrowseError> {
        if let Some(url) = self.known_url(entry) {
            return Ok(url);
        }
        let url = self.resolver.resolve(&entry.key).await?;
        self.resolved_urls.insert(entry.key.clone(), url.clone());
        Ok(url)
    }

    /// Opens a folder, previews a video or image, or hands a document to the shell
    pub async fn select(&mut self, entry: &Entry, shell: &dyn Shell) -> SelectOutcome {
        let kind = match PreviewKind::for_kind(entry.kind) {
            None => return SelectOutcome::Navigate(self.navigate(&entry.name)),
            Some(kind) => kind,
        };
        if kind == PreviewKind::Download && !shell.needs_signed_url() {
            shell.trigger_download(entry, None);
            return SelectOutcome::Downloading;
        }
        let url = match self.url_for(entry).await {
            Ok(url) => url,
            Err(e) => {
                warn!(key = %entry.key, error = %e, "Couldn't resolve preview URL");
                self.notifications.push(Notification::from(&e));
                return SelectOutcome::Failed;
            }
        };
        match kind {
            PreviewKind::Download => {
                shell.trigger_download(entry, Some(&url));
                SelectOutcome::Downloading
            }
            kind => {
                let now = self.resolver.now();
                self.preview = Some(PreviewSession {
                    entry: entry.clone(),
                    url,
                    kind,
                    controls: ControlsTimer::new(now, self.controls_hide_after),
                });
                SelectOutcome::Previewing(kind)
            }
        }
    }

    pub fn close_preview(&mut self) {
        self.preview = None;
    }

    /// Pointer or key activity while previewing
    pub fn preview_activity(&mut self) {
        let now = self.resolver.now();
        if let Some(preview) = self.preview.as_mut() {
            preview.controls.touch(now);
        }
    }

    pub fn controls_visible(&self) -> bool {
        self.preview
            .as_ref()
            .map(|p| p.controls.visible(self.resolver.now()))
            .unwrap_or(false)
    }

    /// Asks for confirmation before deleting `entry`. Folders are refused.
    pub fn request_delete(&mut self, entry: &Entry) -> bool {
        if entry.kind.is_folder() {
            self.notifications.push(Notification::info(
                "Delete",
                format!("'{}' is a folder and can't be deleted", entry.name),
            ));
            return false;
        }
        self.pending_delete = Some(entry.clone());
        true
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Deletes the entry awaiting confirmation, if any
    pub async fn confirm_delete(&mut self) -> Option<ListingRequest> {
        let entry = self.pending_delete.take()?;
        self.delete(&entry).await
    }

    /// Deletes a confirmed entry. On success the directory is refreshed; on
    /// failure the entries stay as they are and one notification is raised.
    pub async fn delete(&mut self, entry: &Entry) -> Option<ListingRequest> {
        match self.resolver.remove(&entry.key).await {
            Ok(()) => {
                self.resolved_urls.remove(&entry.key);
                if self.preview.as_ref().map(|p| &p.entry.key) == Some(&entry.key) {
                    self.preview = None;
                }
                Some(self.refresh())
            }
            Err(e) => {
                warn!(key = %entry.key, error = %e, "Delete failed");
                self.notifications.push(Notification::from(&e));
                None
            }
        }
    }
}
