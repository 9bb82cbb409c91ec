use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Integer publication state as stored by the CMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentState(pub i32);

impl ContentState {
    pub const PUBLISHED: ContentState = ContentState(1);
    pub const UNPUBLISHED: ContentState = ContentState(0);
    pub const TRASHED: ContentState = ContentState(-2);
    pub const ARCHIVED: ContentState = ContentState(2);

    pub fn is_published(self) -> bool {
        self == Self::PUBLISHED
    }

    /// States that take a page out of public view.
    pub fn is_removal(self) -> bool {
        self == Self::UNPUBLISHED || self == Self::TRASHED
    }
}

impl From<i32> for ContentState {
    fn from(v: i32) -> Self {
        ContentState(v)
    }
}

/// Item metadata, either the raw JSON column or an already decoded mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metadata {
    RawJson(String),
    Parsed(Map<String, Value>),
}

impl Metadata {
    /// Collapse both representations into a mapping.
    ///
    /// Empty strings, invalid JSON and JSON that is not an object resolve to
    /// `None`.
    pub fn resolve(&self) -> Option<Map<String, Value>> {
        match self {
            Metadata::RawJson(raw) if raw.trim().is_empty() => None,
            Metadata::RawJson(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            },
            Metadata::Parsed(map) => Some(map.clone()),
        }
    }
}

/// A content item as delivered with an event or loaded from the store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    #[serde(default)]
    pub alias: String,
    #[serde(default, rename = "catid")]
    pub category_id: i64,
    #[serde(default)]
    pub category_alias: String,
    #[serde(default)]
    pub state: ContentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// The table row handed over after a delete. Every column may be missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeletedRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub catid: Option<i64>,
    #[serde(default)]
    pub category_alias: Option<String>,
}

impl DeletedRecord {
    /// Minimal item used for URL building. Metadata is gone after a delete.
    ///
    /// Returns `None` when the record carries no usable identifier.
    pub fn projection(&self) -> Option<ContentItem> {
        let id = self.id.filter(|id| *id != 0)?;
        Some(ContentItem {
            id,
            alias: self.alias.clone().unwrap_or_default(),
            category_id: self.catid.unwrap_or(0),
            category_alias: self.category_alias.clone().unwrap_or_default(),
            state: ContentState::TRASHED,
            metadata: None,
        })
    }
}

/// One URL to push to IndexNow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub url: String,
    pub is_removal: bool,
}

impl NotificationRequest {
    pub fn submit(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_removal: false,
        }
    }

    pub fn removal(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_removal: true,
        }
    }
}
