use std::sync::{Mutex, MutexGuard};

use crate::client::IndexNowOutcome;
use crate::model::NotificationRequest;

/// Prefix for debug lines mirrored into the sink.
pub const DEBUG_PREFIX: &str = "[IndexNow] ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl MessageLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Operator-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

impl Message {
    pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn debug(text: &str) -> Self {
        Self::new(MessageLevel::Info, format!("{DEBUG_PREFIX}{text}"))
    }

    /// Message for a submission outcome. Precondition failures have none:
    /// a missing key means the feature is off.
    pub fn for_outcome(request: &NotificationRequest, outcome: &IndexNowOutcome) -> Option<Self> {
        let url = &request.url;
        let msg = match outcome {
            IndexNowOutcome::Success if request.is_removal => Self::new(
                MessageLevel::Success,
                format!("IndexNow notified of removed URL: {url}"),
            ),
            IndexNowOutcome::Success => Self::new(
                MessageLevel::Success,
                format!("IndexNow notified for URL: {url}"),
            ),
            IndexNowOutcome::Accepted if request.is_removal => Self::new(
                MessageLevel::Success,
                format!("IndexNow accepted removal of URL: {url}"),
            ),
            IndexNowOutcome::Accepted => Self::new(
                MessageLevel::Success,
                format!("IndexNow accepted URL: {url}"),
            ),
            IndexNowOutcome::BadRequest => Self::new(
                MessageLevel::Error,
                "IndexNow rejected the request as malformed (400)",
            ),
            IndexNowOutcome::Forbidden => Self::new(
                MessageLevel::Error,
                "IndexNow key not valid: key file not found or content mismatch (403)",
            ),
            IndexNowOutcome::Unprocessable => Self::new(
                MessageLevel::Error,
                "IndexNow could not process the URL: it does not belong to the host or the key does not match (422)",
            ),
            IndexNowOutcome::RateLimited => Self::new(
                MessageLevel::Warning,
                "IndexNow rate limit reached, try again later (429)",
            ),
            IndexNowOutcome::UnknownStatus(code) => Self::new(
                MessageLevel::Warning,
                format!("IndexNow returned an unexpected response code: {code}"),
            ),
            IndexNowOutcome::TransportError(failure) if failure.is_precondition() => return None,
            IndexNowOutcome::TransportError(failure) => Self::new(
                MessageLevel::Error,
                format!("IndexNow notification failed: {failure}"),
            ),
        };
        Some(msg)
    }
}

/// Where operator messages go. Supplied by the host application.
pub trait MessageSink: Send + Sync {
    fn enqueue(&self, message: Message);
}

/// Collects messages in memory, in order.
#[derive(Debug, Default)]
pub struct MessageQueue {
    messages: Mutex<Vec<Message>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn drain(&self) -> Vec<Message> {
        std::mem::take(&mut *self.lock())
    }
}

impl MessageSink for MessageQueue {
    fn enqueue(&self, message: Message) {
        self.lock().push(message);
    }
}
