use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indexnow_notify::{
    router::DEFAULT_ROUTE_TEMPLATE, ArticleStore, IndexNowOutcome, JsonArticleStore,
    MemoryArticleStore, Message, MessageLevel, MessageSink, Notifier, NotifierConfig,
    NotificationRequest, SiteRouter,
};
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "indexnowctl",
    about = "indexnowctl — push CMS content changes to IndexNow",
    version
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Settings {
    /// IndexNow API key (default: $INDEXNOW_API_KEY)
    #[arg(long, env = "INDEXNOW_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,
    /// IndexNow endpoint host
    #[arg(long, env = "INDEXNOW_SEARCH_ENGINE", default_value = indexnow_notify::config::DEFAULT_SEARCH_ENGINE)]
    search_engine: String,
    /// Only notify on save when the article is published
    #[arg(long, env = "INDEXNOW_NOTIFY_ON_PUBLISH_ONLY", default_value_t = true, action = clap::ArgAction::Set)]
    notify_on_publish_only: bool,
    /// Notify when articles are unpublished, trashed or deleted
    #[arg(long, env = "INDEXNOW_NOTIFY_ON_REMOVE", default_value_t = true, action = clap::ArgAction::Set)]
    notify_on_remove: bool,
    /// Print debug lines as operator messages
    #[arg(long, env = "INDEXNOW_DEBUG")]
    debug: bool,
    /// Public document root where the key file is written
    #[arg(long, env = "INDEXNOW_SITE_ROOT", default_value = ".")]
    site_root: PathBuf,
    /// Public base URL of the site, e.g. https://www.example.org
    #[arg(long, env = "INDEXNOW_SITE_URL")]
    site_url: Option<String>,
    /// Article route template ({id} {alias} {catid} {category_alias} {slug} {catslug})
    #[arg(long, env = "INDEXNOW_ROUTE_TEMPLATE", default_value = DEFAULT_ROUTE_TEMPLATE)]
    route_template: String,
    /// JSON array of articles used to look up current state
    #[arg(long, env = "INDEXNOW_ARTICLES")]
    articles: Option<PathBuf>,
    /// HTTP timeout, e.g. 10s or 1m
    #[arg(long, env = "INDEXNOW_TIMEOUT", default_value = "10s", value_parser = humantime::parse_duration)]
    timeout: Duration,
    /// Full endpoint URL, overriding https://<search-engine>/indexnow
    #[arg(long, env = "INDEXNOW_ENDPOINT")]
    endpoint: Option<String>,
    /// Log level: error, warn, info, debug, verbose (default: $INDEXNOW_LOG_LEVEL or warn)
    #[arg(long, env = "INDEXNOW_LOG_LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one content event, e.g. onContentAfterSave
    Dispatch {
        /// Event name
        event: String,
        /// JSON payload file, or - for stdin
        #[arg(long, default_value = "-")]
        payload: String,
    },
    /// Submit a single URL
    Submit {
        url: String,
        /// Announce the URL as removed
        #[arg(long)]
        removal: bool,
    },
    /// Create the key file in the site root if it is missing
    EnsureKey,
    /// Print a new random API key
    GenerateKey,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let raw = cli
        .settings
        .log_level
        .clone()
        .unwrap_or_else(|| "warn".into());
    let effective_log_level = if raw.eq_ignore_ascii_case("verbose") {
        "debug".to_owned()
    } else {
        raw
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&effective_log_level))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Dispatch { event, payload } => cmd_dispatch(&cli.settings, &event, &payload).await,
        Commands::Submit { url, removal } => cmd_submit(&cli.settings, url, removal).await,
        Commands::EnsureKey => cmd_ensure_key(&cli.settings),
        Commands::GenerateKey => {
            println!("{}", indexnow_notify::generate_api_key());
            Ok(())
        }
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_dispatch(settings: &Settings, event: &str, payload: &str) -> Result<()> {
    let notifier = build_notifier(settings)?;
    let body = read_payload(payload)?;
    let value: serde_json::Value =
        serde_json::from_str(&body).context("event payload is not valid JSON")?;

    let results = notifier
        .dispatch(event, value, &ConsoleSink)
        .await
        .with_context(|| format!("dispatch {event}"))?;

    if results.is_empty() {
        tracing::info!(event, "no IndexNow notification needed");
    }
    Ok(())
}

async fn cmd_submit(settings: &Settings, url: String, removal: bool) -> Result<()> {
    let notifier = build_notifier(settings)?;
    let request = if removal {
        NotificationRequest::removal(url)
    } else {
        NotificationRequest::submit(url)
    };

    match notifier.notify(&request, &ConsoleSink).await {
        outcome if outcome.is_success() => Ok(()),
        IndexNowOutcome::TransportError(failure) => {
            anyhow::bail!("submission failed: {failure}")
        }
        outcome => anyhow::bail!("submission rejected: {outcome:?}"),
    }
}

fn cmd_ensure_key(settings: &Settings) -> Result<()> {
    if settings.api_key.is_empty() {
        anyhow::bail!("no API key configured; set INDEXNOW_API_KEY or pass --api-key");
    }
    let config = notifier_config(settings);
    let manager = indexnow_notify::KeyFileManager::new(config.site_root);
    let path = manager.key_file_path(&settings.api_key);
    if !manager.ensure_key_file(&settings.api_key) {
        anyhow::bail!("could not create or verify {}", path.display());
    }
    println!("{}", path.display());
    Ok(())
}

// ── Wiring ────────────────────────────────────────────────────────────────────

fn notifier_config(settings: &Settings) -> NotifierConfig {
    NotifierConfig {
        api_key: settings.api_key.clone(),
        search_engine_host: settings.search_engine.clone(),
        notify_on_publish_only: settings.notify_on_publish_only,
        notify_on_remove: settings.notify_on_remove,
        debug_mode: settings.debug,
        site_root: settings.site_root.clone(),
        timeout: settings.timeout,
        endpoint: settings.endpoint.clone(),
    }
}

fn build_notifier(settings: &Settings) -> Result<Notifier> {
    let site_url = settings
        .site_url
        .as_deref()
        .context("no site URL configured; set INDEXNOW_SITE_URL or pass --site-url")?;
    let router = SiteRouter::new(site_url, settings.route_template.clone())
        .context("build site router")?;

    let store: Box<dyn ArticleStore> = match &settings.articles {
        Some(path) => Box::new(
            JsonArticleStore::open(path)
                .with_context(|| format!("read articles from {}", path.display()))?,
        ),
        None => Box::new(MemoryArticleStore::new()),
    };

    Notifier::new(notifier_config(settings), Box::new(router), store).context("build notifier")
}

fn read_payload(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read payload from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("read payload {source}"))
    }
}

/// Prints operator messages; errors and warnings go to stderr.
struct ConsoleSink;

impl MessageSink for ConsoleSink {
    fn enqueue(&self, message: Message) {
        let line = format!("[{}] {}", message.level.as_str(), message.text);
        match message.level {
            MessageLevel::Success | MessageLevel::Info => println!("{line}"),
            MessageLevel::Warning | MessageLevel::Error => eprintln!("{line}"),
        }
    }
}
