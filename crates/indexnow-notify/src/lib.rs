//! Push CMS content changes to IndexNow.
//!
//! An event (save, state change, delete) goes through [`NotificationPolicy`],
//! the article URL is built by a host-supplied [`Router`], and
//! [`IndexNowClient`] submits it after making sure the key file is in place.
//! [`Notifier`] wires these together and reports to a [`MessageSink`].

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod keyfile;
pub mod messages;
pub mod model;
pub mod noindex;
pub mod policy;
pub mod router;
pub mod store;

pub use client::{IndexNowClient, IndexNowOutcome, Submission, TransportFailure};
pub use config::NotifierConfig;
pub use error::{Error, Result};
pub use events::{ContentEvent, EventKind, Notifier, SUBSCRIPTIONS};
pub use keyfile::{generate_api_key, KeyFileManager};
pub use messages::{Message, MessageLevel, MessageQueue, MessageSink};
pub use model::{ContentItem, ContentState, DeletedRecord, Metadata, NotificationRequest};
pub use noindex::is_noindex;
pub use policy::{NotificationPolicy, Skip, ARTICLE_CONTEXT};
pub use router::{resolve_article_url, ArticleRoute, Router, SiteRouter};
pub use store::{ArticleStore, JsonArticleStore, MemoryArticleStore};
