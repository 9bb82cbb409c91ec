use std::path::PathBuf;

use thiserror::Error;

/// Errors raised inside the notifier.
///
/// The outward-facing operations ([`KeyFileManager::ensure_key_file`],
/// [`IndexNowClient::submit`], [`resolve_article_url`]) fold these into a
/// bool, an outcome or `None`; the variants surface through the store,
/// router and event decoding APIs.
///
/// [`KeyFileManager::ensure_key_file`]: crate::keyfile::KeyFileManager::ensure_key_file
/// [`IndexNowClient::submit`]: crate::client::IndexNowClient::submit
/// [`resolve_article_url`]: crate::router::resolve_article_url
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Key does not match `^[A-Za-z0-9_-]{8,128}$`.
    #[error("invalid API key format: only 8-128 alphanumeric, '-' or '_' characters are allowed")]
    InvalidApiKey,

    #[error("key file path {} is outside the site root", .0.display())]
    OutsideSiteRoot(PathBuf),

    #[error("cannot build route: {0}")]
    Route(String),

    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

pub type Result<T> = std::result::Result<T, Error>;
