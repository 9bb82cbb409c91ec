use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SEARCH_ENGINE: &str = "api.indexnow.org";

/// Plugin settings, read once per invocation.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// IndexNow key. Empty disables notifications.
    pub api_key: String,
    /// Host of the IndexNow endpoint, e.g. `api.indexnow.org` or `www.bing.com`.
    pub search_engine_host: String,
    /// Only notify on save when the item is published.
    pub notify_on_publish_only: bool,
    /// Send removal notifications on unpublish, trash and delete.
    pub notify_on_remove: bool,
    /// Mirror debug lines into the operator message sink.
    pub debug_mode: bool,
    /// Public document root, where `<api_key>.txt` is written.
    pub site_root: PathBuf,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Full endpoint URL overriding `https://<search_engine_host>/indexnow`.
    pub endpoint: Option<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            search_engine_host: DEFAULT_SEARCH_ENGINE.into(),
            notify_on_publish_only: true,
            notify_on_remove: true,
            debug_mode: false,
            site_root: PathBuf::from("."),
            timeout: Duration::from_secs(10),
            endpoint: None,
        }
    }
}

impl NotifierConfig {
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(e) => e.clone(),
            None => format!("https://{}/indexnow", self.search_engine_host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = NotifierConfig::default();
        assert!(cfg.api_key.is_empty());
        assert_eq!(cfg.search_engine_host, "api.indexnow.org");
        assert!(cfg.notify_on_publish_only);
        assert!(cfg.notify_on_remove);
        assert!(!cfg.debug_mode);
        assert_eq!(cfg.endpoint_url(), "https://api.indexnow.org/indexnow");
    }

    #[test]
    fn endpoint_override_wins() {
        let cfg = NotifierConfig {
            search_engine_host: "www.bing.com".into(),
            endpoint: Some("http://127.0.0.1:9000/indexnow".into()),
            ..Default::default()
        };
        assert_eq!(cfg.endpoint_url(), "http://127.0.0.1:9000/indexnow");
    }
}
