use serde::Deserialize;
use tracing::debug;

use crate::client::{IndexNowClient, IndexNowOutcome, TransportFailure};
use crate::config::NotifierConfig;
use crate::error::{Error, Result};
use crate::messages::{Message, MessageSink};
use crate::model::{ContentItem, ContentState, DeletedRecord, NotificationRequest};
use crate::policy::{NotificationPolicy, Skip};
use crate::router::Router;
use crate::store::ArticleStore;

// ── Event payloads ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Saved,
    StateChanged,
    Deleted,
}

/// Event names this notifier subscribes to.
pub static SUBSCRIPTIONS: &[(&str, EventKind)] = &[
    ("onContentAfterSave", EventKind::Saved),
    ("onContentChangeState", EventKind::StateChanged),
    ("onContentAfterDelete", EventKind::Deleted),
];

pub fn event_kind(name: &str) -> Option<EventKind> {
    SUBSCRIPTIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, kind)| *kind)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SavedEvent {
    pub context: String,
    pub item: ContentItem,
    #[serde(default, rename = "isNew")]
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StateChangedEvent {
    pub context: String,
    #[serde(rename = "pks")]
    pub item_ids: Vec<i64>,
    #[serde(rename = "value")]
    pub new_state: ContentState,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeletedEvent {
    pub context: String,
    #[serde(rename = "table")]
    pub record: DeletedRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentEvent {
    Saved(SavedEvent),
    StateChanged(StateChangedEvent),
    Deleted(DeletedEvent),
}

impl ContentEvent {
    /// Decode the payload of a subscribed event.
    pub fn from_named(name: &str, payload: serde_json::Value) -> Result<Self> {
        let kind = event_kind(name).ok_or_else(|| Error::UnknownEvent(name.to_owned()))?;
        Ok(match kind {
            EventKind::Saved => Self::Saved(serde_json::from_value(payload)?),
            EventKind::StateChanged => Self::StateChanged(serde_json::from_value(payload)?),
            EventKind::Deleted => Self::Deleted(serde_json::from_value(payload)?),
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Saved(_) => EventKind::Saved,
            Self::StateChanged(_) => EventKind::StateChanged,
            Self::Deleted(_) => EventKind::Deleted,
        }
    }
}

// ── Notifier ─────────────────────────────────────────────────────────────────

/// Ties policy, router, store and client together for the three lifecycle
/// events. Every event is processed to completion before `handle` returns.
pub struct Notifier {
    config: NotifierConfig,
    client: IndexNowClient,
    router: Box<dyn Router>,
    store: Box<dyn ArticleStore>,
}

impl Notifier {
    pub fn new(
        config: NotifierConfig,
        router: Box<dyn Router>,
        store: Box<dyn ArticleStore>,
    ) -> Result<Self> {
        let client = IndexNowClient::new()?;
        Ok(Self {
            config,
            client,
            router,
            store,
        })
    }

    /// Decode and handle a named event.
    pub async fn dispatch(
        &self,
        name: &str,
        payload: serde_json::Value,
        sink: &dyn MessageSink,
    ) -> Result<Vec<(NotificationRequest, IndexNowOutcome)>> {
        let event = ContentEvent::from_named(name, payload)?;
        Ok(self.handle(&event, sink).await)
    }

    /// Run policy for `event` and submit whatever it asks for, in order.
    pub async fn handle(
        &self,
        event: &ContentEvent,
        sink: &dyn MessageSink,
    ) -> Vec<(NotificationRequest, IndexNowOutcome)> {
        let policy = NotificationPolicy::new(&self.config, self.router.as_ref());

        let requests = match event {
            ContentEvent::Saved(e) => match policy.on_saved(&e.context, &e.item, e.is_new) {
                Ok(req) => vec![req],
                Err(skip) => {
                    self.log_skip(sink, skip);
                    Vec::new()
                }
            },
            ContentEvent::StateChanged(e) => {
                match policy.on_state_changed(
                    &e.context,
                    &e.item_ids,
                    e.new_state,
                    self.store.as_ref(),
                ) {
                    Ok(decision) => {
                        for (_id, skip) in &decision.skipped {
                            self.log_skip(sink, *skip);
                        }
                        decision.requests
                    }
                    Err(skip) => {
                        debug!(%skip, "state change ignored");
                        Vec::new()
                    }
                }
            }
            ContentEvent::Deleted(e) => match policy.on_deleted(&e.context, &e.record) {
                Ok(req) => vec![req],
                Err(skip) => {
                    debug!(%skip, "delete ignored");
                    Vec::new()
                }
            },
        };

        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let outcome = self.notify(&request, sink).await;
            results.push((request, outcome));
        }
        results
    }

    /// Submit one request and report the outcome to `sink`.
    pub async fn notify(
        &self,
        request: &NotificationRequest,
        sink: &dyn MessageSink,
    ) -> IndexNowOutcome {
        let submission = self.client.submit_detailed(request, &self.config).await;
        let outcome = submission.outcome;
        let body = submission.body.unwrap_or_default();

        if let Some(message) = Message::for_outcome(request, &outcome) {
            sink.enqueue(message);
        }

        let detail = match &outcome {
            IndexNowOutcome::Success => {
                Some(format!("Successfully notified IndexNow for URL: {}", request.url))
            }
            IndexNowOutcome::Accepted => None,
            IndexNowOutcome::BadRequest => Some(format!("Bad request (400): {body}")),
            IndexNowOutcome::Forbidden => Some(format!(
                "Forbidden (403): Key not found or invalid. Response: {body}"
            )),
            IndexNowOutcome::Unprocessable => Some(format!("Unprocessable Entity (422): {body}")),
            IndexNowOutcome::RateLimited => {
                Some("Too Many Requests (429): Rate limit exceeded".to_owned())
            }
            IndexNowOutcome::UnknownStatus(code) => {
                Some(format!("Unexpected response code {code}: {body}"))
            }
            IndexNowOutcome::TransportError(TransportFailure::NotConfigured) => {
                Some("IndexNow API key is not configured".to_owned())
            }
            IndexNowOutcome::TransportError(TransportFailure::KeyFileUnavailable) => {
                Some("Could not create or verify key file".to_owned())
            }
            IndexNowOutcome::TransportError(TransportFailure::Request(e)) => {
                Some(format!("IndexNow notification exception: {e}"))
            }
        };
        if let Some(detail) = detail {
            self.log_debug(sink, &detail);
        }
        outcome
    }

    fn log_skip(&self, sink: &dyn MessageSink, skip: Skip) {
        // Context mismatches are routine and never surface.
        if skip == Skip::NotArticle {
            debug!(%skip, "event ignored");
            return;
        }
        self.log_debug(sink, &format!("{skip}, skipping IndexNow notification"));
    }

    fn log_debug(&self, sink: &dyn MessageSink, text: &str) {
        debug!("{text}");
        if self.config.debug_mode {
            sink.enqueue(Message::debug(text));
        }
    }
}
