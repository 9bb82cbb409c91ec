use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::model::ContentItem;

/// Loads the current, persisted version of an item.
pub trait ArticleStore: Send + Sync {
    fn load(&self, id: i64) -> Option<ContentItem>;
}

/// Map-backed store.
#[derive(Debug, Clone, Default)]
pub struct MemoryArticleStore {
    items: HashMap<i64, ContentItem>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: ContentItem) {
        self.items.insert(item.id, item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<ContentItem> for MemoryArticleStore {
    fn from_iter<I: IntoIterator<Item = ContentItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(|i| (i.id, i)).collect(),
        }
    }
}

impl ArticleStore for MemoryArticleStore {
    fn load(&self, id: i64) -> Option<ContentItem> {
        self.items.get(&id).cloned()
    }
}

/// Store read from a JSON array of items, e.g. an export of the articles table.
#[derive(Debug, Clone, Default)]
pub struct JsonArticleStore {
    inner: MemoryArticleStore,
}

impl JsonArticleStore {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let items: Vec<ContentItem> = serde_json::from_slice(&bytes)?;
        Ok(Self {
            inner: items.into_iter().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ArticleStore for JsonArticleStore {
    fn load(&self, id: i64) -> Option<ContentItem> {
        self.inner.load(id)
    }
}
