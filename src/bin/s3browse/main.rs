use clap::Parser;
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEvent},
    execute,
    terminal::{enable_raw_mode, EnterAlternateScreen},
};
use s3browse::{
    browser::BrowserView,
    clock::{Clock, SystemClock},
    components::DownloadShell,
    config::{BrowserConfig, Credentials, StoreConfig},
    event::Event,
    listing::ListingProjector,
    preview::PreviewUrlResolver,
    providers::s3::S3Provider,
    screens::BrowserScreen,
};
use std::{
    env,
    error::Error,
    fs::OpenOptions,
    io::{self, Stdout},
    path::{Path, PathBuf},
    process,
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, Level};
use tui::{backend::CrosstermBackend, Terminal};

fn spawn_sender(tx: UnboundedSender<Event<KeyEvent>>) {
    let tick_rate = Duration::from_millis(200);

    thread::spawn(move || {
        let mut last_tick = Instant::now();

        loop {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));

            match event::poll(timeout) {
                Ok(true) => {
                    if let Ok(CEvent::Key(key)) = event::read() {
                        let sent = if key.code == KeyCode::Esc {
                            tx.send(Event::Shutdown)
                        } else {
                            tx.send(Event::Input(key))
                        };
                        if sent.is_err() {
                            break;
                        }
                    }
                }
                Ok(false) => (),
                Err(e) => {
                    error!(error = %e, "Couldn't poll terminal events");
                    let _ = tx.send(Event::Shutdown);
                    break;
                }
            }

            if last_tick.elapsed() >= tick_rate {
                if tx.send(Event::Tick).is_err() {
                    break;
                }
                last_tick = Instant::now();
            }
        }
    });
}

fn capture_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

/// Logs go to a file, the terminal belongs to the UI
fn init_logging(path: &Path, level: Level) -> Result<(), Box<dyn Error>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

/// Static keys from the standard AWS variables, if both are set
fn credentials_from_env() -> Option<Credentials> {
    let access_key = env::var("AWS_ACCESS_KEY_ID").ok()?;
    let secret_key = env::var("AWS_SECRET_ACCESS_KEY").ok()?;
    let credentials = Credentials::new(access_key, secret_key);
    Some(match env::var("AWS_SESSION_TOKEN") {
        Ok(token) => credentials.with_session_token(token),
        Err(_) => credentials,
    })
}

impl Args {
    fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::new(&self.bucket)
            .with_region(&self.region)
            .with_path_style(self.path_style);
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint);
        }
        if let Some(credentials) = credentials_from_env() {
            config = config.with_credentials(credentials);
        }
        config
    }

    fn browser_config(&self) -> BrowserConfig {
        BrowserConfig::new()
            .with_eager_preview_urls(self.eager_preview_urls)
            .with_url_ttl(Duration::from_secs(self.url_ttl_secs))
            .with_max_concurrent_resolves(self.max_concurrent_resolves)
    }
}

async fn event_loop(
    mut screen: BrowserScreen<CrosstermBackend<Stdout>>,
    mut input_channel: UnboundedReceiver<Event<KeyEvent>>,
) -> Result<(), Box<dyn Error>> {
    screen.start();
    screen.render()?;
    while let Some(event) = input_channel.recv().await {
        match event {
            Event::Input(event) => {
                screen.handle_event(event).await;
                screen.render()?;
            }
            Event::Shutdown => break,
            Event::Tick => screen.render()?,
            Event::Listed(request, result) => {
                screen.handle_listing(request, result);
                screen.render()?;
            }
            Event::Notify(notification) => screen.handle_notification(notification),
        }
    }
    screen.shutdown()?;
    Ok(())
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args.log_file, args.log_level)?;

    let store_config = args.store_config();
    let browser_config = args.browser_config();
    info!(bucket = %store_config.bucket, endpoint = ?store_config.endpoint, "Starting");
    let client = match S3Provider::new(&store_config).await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            println!("Error: Couldn't connect to the bucket: {}", e);
            process::exit(1);
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let resolver = Arc::new(PreviewUrlResolver::new(
        client.clone(),
        clock,
        &browser_config,
    ));
    let projector = Arc::new(ListingProjector::new(
        client.clone(),
        resolver.clone(),
        &browser_config,
    ));
    let view = BrowserView::new(projector, resolver, &browser_config);

    let (tx, rx) = mpsc::unbounded_channel();
    let shell = DownloadShell::new(client, args.download_dir.clone(), tx.clone());
    let terminal = capture_terminal()?;
    let screen = BrowserScreen::new(terminal, view, Box::new(shell), tx.clone());

    spawn_sender(tx);
    event_loop(screen, rx).await
}

/// s3browse - browse and preview an S3 bucket from the terminal
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about=None)]
struct Args {
    /// Name of the bucket you want to browse
    #[clap(long, env = "S3BROWSE_BUCKET")]
    bucket: String,
    /// Endpoint of an S3-compatible service (defaults to AWS)
    #[clap(long, env = "S3BROWSE_ENDPOINT")]
    endpoint: Option<String>,
    /// Region to sign requests for
    #[clap(long, env = "S3BROWSE_REGION", default_value = "us-east-1")]
    region: String,
    /// Address buckets in the URL path rather than the host name
    #[clap(long, env = "S3BROWSE_PATH_STYLE", default_value = "true", parse(try_from_str))]
    path_style: bool,
    /// Sign preview links for every file while listing
    #[clap(long, env = "S3BROWSE_EAGER_PREVIEW_URLS", default_value = "false", parse(try_from_str))]
    eager_preview_urls: bool,
    /// How long signed links stay valid, in seconds
    #[clap(long, env = "S3BROWSE_URL_TTL_SECS", default_value = "3600")]
    url_ttl_secs: u64,
    /// Maximum signing requests in flight while listing eagerly
    #[clap(long, env = "S3BROWSE_MAX_CONCURRENT_RESOLVES", default_value = "4")]
    max_concurrent_resolves: usize,
    /// Directory documents are downloaded into
    #[clap(long, env = "S3BROWSE_DOWNLOAD_DIR", default_value = ".", parse(from_os_str))]
    download_dir: PathBuf,
    /// File the log is written to
    #[clap(long, env = "S3BROWSE_LOG_FILE", default_value = "s3browse.log", parse(from_os_str))]
    log_file: PathBuf,
    /// Log verbosity (trace, debug, info, warn, error)
    #[clap(long, env = "S3BROWSE_LOG_LEVEL", default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    run().await?;
    Ok(())
}
