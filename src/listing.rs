//! Projection of flat object listings onto one level of a folder hierarchy.
//!
//! Folders come only from the common prefixes the store reports. Content keys
//! are always files, typed by their extension, and are never turned into
//! folders no matter what their name looks like.
use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use tracing::{debug, warn};

use crate::{
    config::BrowserConfig,
    error::BrowseError,
    preview::{PreviewUrlResolver, SignedUrl},
    providers::{ObjectStore, ObjectSummary},
    utils::{ensure_trailing_separator, strip_prefix, SEPARATOR},
};

const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "webm", "mov", "avi", "mkv"];
const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "svg", "webp"];
const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Folder,
    Video,
    Image,
    Document,
}

impl EntryKind {
    pub fn is_folder(&self) -> bool {
        matches!(self, EntryKind::Folder)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Folder => "folder",
            EntryKind::Video => "video",
            EntryKind::Image => "image",
            EntryKind::Document => "document",
        }
    }
}

/// Classifies a file name by its extension, ignoring case.
///
/// Names without a known extension are documents. This never yields
/// `Folder`.
pub fn file_kind(file_name: &str) -> EntryKind {
    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => return EntryKind::Document,
    };
    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        EntryKind::Video
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        EntryKind::Image
    } else {
        EntryKind::Document
    }
}

/// Human readable size using 1024 multiples, at most two decimals
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return String::from("0 Bytes");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Key with the current prefix and any trailing separator removed
    pub name: String,
    pub kind: EntryKind,
    /// Full object key, or the full common prefix for folders
    pub key: String,
    pub size: Option<String>,
    pub size_bytes: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
    pub preview_url: Option<SignedUrl>,
}

impl Entry {
    pub fn folder(name: impl Into<String>, key: impl Into<String>) -> Entry {
        Entry {
            name: name.into(),
            kind: EntryKind::Folder,
            key: key.into(),
            size: None,
            size_bytes: None,
            modified_at: None,
            preview_url: None,
        }
    }

    pub fn file(name: impl Into<String>, object: &ObjectSummary) -> Entry {
        let name = name.into();
        Entry {
            kind: file_kind(&name),
            name,
            key: object.key.clone(),
            size: Some(format_bytes(object.size)),
            size_bytes: Some(object.size),
            modified_at: object.last_modified,
            preview_url: None,
        }
    }
}

/// Turns a common prefix into a folder entry, if it really is a child of `prefix`
fn folder_entry(prefix: &str, common_prefix: &str) -> Option<Entry> {
    // Only the delimiter itself is dropped, so the name maps back onto the key
    let rest = strip_prefix(common_prefix, prefix)?;
    let name = rest.strip_suffix(SEPARATOR).unwrap_or(rest);
    if name.is_empty() {
        return None;
    }
    Some(Entry::folder(name, common_prefix))
}

/// Turns a content key into a file entry, if it sits directly under `prefix`
fn file_entry(prefix: &str, object: &ObjectSummary) -> Option<Entry> {
    if object.key == prefix {
        return None;
    }
    let name = strip_prefix(&object.key, prefix)?;
    // Deeper or malformed keys; folders only come from common prefixes
    if name.is_empty() || name.contains(SEPARATOR) {
        return None;
    }
    Some(Entry::file(name, object))
}

/// Lists one directory level of a bucket as entries
pub struct ListingProjector {
    store: Arc<dyn ObjectStore>,
    resolver: Arc<PreviewUrlResolver>,
    eager_preview_urls: bool,
    max_concurrent_resolves: usize,
}

impl ListingProjector {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        resolver: Arc<PreviewUrlResolver>,
        config: &BrowserConfig,
    ) -> ListingProjector {
        ListingProjector {
            store,
            resolver,
            eager_preview_urls: config.eager_preview_urls,
            max_concurrent_resolves: config.max_concurrent_resolves.max(1),
        }
    }

    pub fn resource_name(&self) -> &str {
        self.store.resource_name()
    }

    /// Lists the folders and files directly under `prefix`.
    ///
    /// Only the first page the store returns is reflected.
    pub async fn list(&self, prefix: &str) -> Result<Vec<Entry>, BrowseError> {
        let prefix = ensure_trailing_separator(prefix);
        let listing = self
            .store
            .list_objects(&prefix, &SEPARATOR.to_string())
            .await
            .map_err(|source| BrowseError::Listing {
                prefix: prefix.clone(),
                source,
            })?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut entries: Vec<Entry> = listing
            .common_prefixes
            .iter()
            .filter_map(|p| folder_entry(&prefix, p))
            .chain(listing.contents.iter().filter_map(|o| file_entry(&prefix, o)))
            .filter(|e| seen.insert(e.key.clone()))
            .collect();
        debug!(
            prefix = %prefix,
            entries = entries.len(),
            "Projected listing"
        );

        if self.eager_preview_urls {
            self.resolve_all(&mut entries).await;
        }
        Ok(entries)
    }

    /// Signs a URL for every file, keeping at most `max_concurrent_resolves` requests in flight
    async fn resolve_all(&self, entries: &mut [Entry]) {
        let keys: Vec<(usize, String)> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.kind.is_folder())
            .map(|(i, e)| (i, e.key.clone()))
            .collect();
        let resolver = self.resolver.clone();
        let resolved: Vec<(usize, Result<SignedUrl, BrowseError>)> = stream::iter(keys)
            .map(move |(i, key)| {
                let resolver = resolver.clone();
                async move { (i, resolver.resolve(&key).await) }
            })
            .buffered(self.max_concurrent_resolves)
            .collect()
            .await;

        for (i, result) in resolved {
            match result {
                Ok(url) => entries[i].preview_url = Some(url),
                Err(e) => warn!(key = %entries[i].key, error = %e, "Eager preview URL failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        clock::ManualClock,
        error::StoreError,
        providers::{
            mock::{epoch, object, MockStore},
            ObjectListing,
        },
    };

    fn projector(
        store: Arc<MockStore>,
        clock: Arc<ManualClock>,
        config: BrowserConfig,
    ) -> ListingProjector {
        let resolver = Arc::new(PreviewUrlResolver::new(
            store.clone(),
            clock,
            &config,
        ));
        ListingProjector::new(store, resolver, &config)
    }

    fn lazy(store: MockStore, clock: Arc<ManualClock>) -> (Arc<MockStore>, ListingProjector) {
        let store = Arc::new(store);
        let projector = projector(store.clone(), clock, BrowserConfig::new());
        (store, projector)
    }

    #[test]
    fn format_bytes_ladder() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(1), "1 Bytes");
        assert_eq!(format_bytes(1023), "1023 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_048_576), "1 MB");
        assert_eq!(format_bytes(25_690_112), "24.5 MB");
        assert_eq!(format_bytes(1_073_741_824), "1 GB");
        assert_eq!(format_bytes(1_099_511_627_776), "1 TB");
        assert_eq!(format_bytes(1_099_511_627_776 * 2048), "2048 TB");
    }

    #[test]
    fn format_bytes_rounds_to_two_decimals() {
        assert_eq!(format_bytes(1234), "1.21 KB");
        assert_eq!(format_bytes(2_202_010), "2.1 MB");
    }

    #[test]
    fn file_kind_by_extension() {
        assert_eq!(file_kind("movie.MP4"), EntryKind::Video);
        assert_eq!(file_kind("clip.webm"), EntryKind::Video);
        assert_eq!(file_kind("pic.png"), EntryKind::Image);
        assert_eq!(file_kind("photo.JpEg"), EntryKind::Image);
        assert_eq!(file_kind("report.pdf"), EntryKind::Document);
        assert_eq!(file_kind("archive.tar.gz"), EntryKind::Document);
    }

    #[test]
    fn file_kind_never_yields_folder() {
        assert_eq!(file_kind("noext"), EntryKind::Document);
        assert_eq!(file_kind("trailing."), EntryKind::Document);
        assert_eq!(file_kind(""), EntryKind::Document);
    }

    #[tokio::test]
    async fn root_listing_with_folder_and_file() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = MockStore::new(clock.clone())
            .with_listing("", &["Docs/"], vec![object("a.pdf", 1536)]);
        let (_, projector) = lazy(store, clock);

        let entries = projector.list("").await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], Entry::folder("Docs", "Docs/"));
        assert_eq!(entries[1].name, "a.pdf");
        assert_eq!(entries[1].kind, EntryKind::Document);
        assert_eq!(entries[1].key, "a.pdf");
        assert_eq!(entries[1].size.as_deref(), Some("1.5 KB"));
        assert_eq!(entries[1].modified_at, Some(epoch()));
        assert!(entries[1].preview_url.is_none());
    }

    #[tokio::test]
    async fn nested_prefix_names_are_relative() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = MockStore::new(clock.clone()).with_listing(
            "Docs/",
            &["Docs/2024/"],
            vec![object("Docs/", 0), object("Docs/clip.mov", 10)],
        );
        let (store, projector) = lazy(store, clock);

        let entries = projector.list("Docs").await.unwrap();

        assert_eq!(store.list_calls(), vec!["Docs/".to_owned()]);
        assert_eq!(
            entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            vec!["2024", "clip.mov"]
        );
        assert_eq!(entries[0].key, "Docs/2024/");
        assert_eq!(entries[1].kind, EntryKind::Video);
    }

    #[tokio::test]
    async fn folder_names_keep_inner_separators() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = MockStore::new(clock.clone()).with_listing(
            "",
            &["/x/", "a//"],
            Vec::new(),
        );
        let (_, projector) = lazy(store, clock);

        let entries = projector.list("").await.unwrap();

        assert_eq!(entries[0], Entry::folder("/x", "/x/"));
        assert_eq!(entries[1], Entry::folder("a/", "a//"));
    }

    #[tokio::test]
    async fn eager_listing_runs_on_a_spawned_task() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = Arc::new(
            MockStore::new(clock.clone())
                .with_listing("", &["Docs/"], vec![object("a.mp4", 1), object("b.pdf", 1)]),
        );
        let projector = Arc::new(projector(
            store.clone(),
            clock,
            BrowserConfig::new().with_eager_preview_urls(true),
        ));

        let task = {
            let projector = projector.clone();
            tokio::spawn(async move { projector.list("").await })
        };
        let entries = task.await.expect("listing task panicked").unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(store.sign_calls(), vec!["a.mp4".to_owned(), "b.pdf".to_owned()]);
    }

    #[tokio::test]
    async fn self_marker_and_deep_keys_are_skipped() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = MockStore::new(clock.clone()).with_listing(
            "Docs/",
            &[],
            vec![
                object("Docs/", 0),
                object("Docs/deeper/file.txt", 5),
                object("Docs/sub/", 0),
                object("Elsewhere/x.png", 5),
            ],
        );
        let (_, projector) = lazy(store, clock);

        let entries = projector.list("Docs/").await.unwrap();

        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn extensionless_content_key_is_a_document() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = MockStore::new(clock.clone()).with_listing(
            "",
            &[],
            vec![object("LICENSE", 3)],
        );
        let (_, projector) = lazy(store, clock);

        let entries = projector.list("").await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Document);
        assert!(entries[0].size.is_some());
    }

    #[tokio::test]
    async fn keys_are_pairwise_distinct() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = MockStore::new(clock.clone()).with_listing(
            "",
            &["Docs/", "Docs/", "/"],
            vec![object("a.pdf", 1), object("a.pdf", 1), object("b.png", 2)],
        );
        let (_, projector) = lazy(store, clock);

        let entries = projector.list("").await.unwrap();

        let keys: HashSet<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys.len(), entries.len());
        for entry in entries.iter().filter(|e| e.kind.is_folder()) {
            assert!(!entry.name.is_empty());
            assert!(entry.size.is_none() && entry.modified_at.is_none());
        }
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn listing_failure_is_a_listing_error() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = MockStore::new(clock.clone());
        store.fail_listing("Docs/");
        let (_, projector) = lazy(store, clock);

        let err = projector.list("Docs/").await.unwrap_err();

        assert!(matches!(err, BrowseError::Listing { ref prefix, .. } if prefix == "Docs/"));
    }

    #[tokio::test]
    async fn lazy_mode_signs_nothing() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = MockStore::new(clock.clone())
            .with_listing("", &[], vec![object("a.mp4", 1), object("b.png", 1)]);
        let (store, projector) = lazy(store, clock);

        projector.list("").await.unwrap();

        assert!(store.sign_calls().is_empty());
    }

    #[tokio::test]
    async fn eager_mode_signs_every_file_but_not_folders() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = Arc::new(
            MockStore::new(clock.clone()).with_listing(
                "",
                &["Docs/"],
                vec![object("a.mp4", 1), object("b.png", 1), object("gone.pdf", 1)],
            ),
        );
        store.mark_missing("gone.pdf");
        let projector = projector(
            store.clone(),
            clock,
            BrowserConfig::new().with_eager_preview_urls(true),
        );

        let entries = projector.list("").await.unwrap();

        assert_eq!(store.sign_calls().len(), 3);
        assert!(entries[0].preview_url.is_none());
        assert!(store.accepts(&entries[1].preview_url.as_ref().unwrap().url));
        assert!(store.accepts(&entries[2].preview_url.as_ref().unwrap().url));
        // A failed eager resolve falls back to lazy resolution
        assert!(entries[3].preview_url.is_none());
    }

    struct CountingStore {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        files: usize,
    }

    #[async_trait]
    impl ObjectStore for CountingStore {
        async fn list_objects(&self, _: &str, _: &str) -> Result<ObjectListing, StoreError> {
            Ok(ObjectListing {
                common_prefixes: Vec::new(),
                contents: (0..self.files)
                    .map(|i| object(&format!("clip{}.mp4", i), 1))
                    .collect(),
            })
        }

        async fn generate_signed_url(&self, key: &str, _: Duration) -> Result<String, StoreError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("https://signed/{}", key))
        }

        async fn delete_object(&self, _: &str) -> Result<(), StoreError> {
            Ok(())
        }

        fn resource_name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn eager_resolution_is_bounded_and_ordered() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let store = Arc::new(CountingStore {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            files: 20,
        });
        let config = BrowserConfig::new()
            .with_eager_preview_urls(true)
            .with_max_concurrent_resolves(3);
        let resolver = Arc::new(PreviewUrlResolver::new(
            store.clone(),
            clock,
            &config,
        ));
        let projector = ListingProjector::new(store.clone(), resolver, &config);

        let entries = projector.list("").await.unwrap();

        assert!(store.peak.load(Ordering::SeqCst) <= 3);
        assert!(store.peak.load(Ordering::SeqCst) >= 2);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(
                entry.preview_url.as_ref().unwrap().url,
                format!("https://signed/clip{}.mp4", i)
            );
        }
    }
}
