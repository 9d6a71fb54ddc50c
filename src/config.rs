//! Explicit configuration for the store client and the browser core.
//!
//! Nothing here reads the environment; the binary resolves arguments and
//! credentials at its boundary and hands the finished structs to constructors.
use std::fmt;
use std::time::Duration;

pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_MAX_CONCURRENT_RESOLVES: usize = 4;
pub const DEFAULT_CONTROLS_HIDE_AFTER: Duration = Duration::from_secs(3);

/// Static access keys for the store
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Credentials {
        Credentials {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Credentials {
        self.session_token = Some(token.into());
        self
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Where the bucket lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub bucket: String,
    /// Custom endpoint for S3-compatible services; `None` means AWS
    pub endpoint: Option<String>,
    pub region: String,
    pub path_style: bool,
    /// `None` falls back to the AWS profile file
    pub credentials: Option<Credentials>,
}

impl StoreConfig {
    pub fn new(bucket: impl Into<String>) -> StoreConfig {
        StoreConfig {
            bucket: bucket.into(),
            endpoint: None,
            region: String::from("us-east-1"),
            path_style: true,
            credentials: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> StoreConfig {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> StoreConfig {
        self.region = region.into();
        self
    }

    pub fn with_path_style(mut self, path_style: bool) -> StoreConfig {
        self.path_style = path_style;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> StoreConfig {
        self.credentials = Some(credentials);
        self
    }
}

/// Behaviour of the listing, preview and view layers.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserConfig {
    /// Sign a preview URL for every file while listing instead of on selection
    pub eager_preview_urls: bool,
    pub url_ttl: Duration,
    /// Upper bound on signing calls in flight during an eager listing
    pub max_concurrent_resolves: usize,
    /// Idle time before the preview key hints are hidden
    pub controls_hide_after: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            eager_preview_urls: false,
            url_ttl: DEFAULT_URL_TTL,
            max_concurrent_resolves: DEFAULT_MAX_CONCURRENT_RESOLVES,
            controls_hide_after: DEFAULT_CONTROLS_HIDE_AFTER,
        }
    }
}

impl BrowserConfig {
    pub fn new() -> BrowserConfig {
        BrowserConfig::default()
    }

    pub fn with_eager_preview_urls(mut self, eager: bool) -> BrowserConfig {
        self.eager_preview_urls = eager;
        self
    }

    pub fn with_url_ttl(mut self, ttl: Duration) -> BrowserConfig {
        self.url_ttl = ttl;
        self
    }

    pub fn with_max_concurrent_resolves(mut self, max: usize) -> BrowserConfig {
        self.max_concurrent_resolves = max.max(1);
        self
    }

    pub fn with_controls_hide_after(mut self, after: Duration) -> BrowserConfig {
        self.controls_hide_after = after;
        self
    }
}
