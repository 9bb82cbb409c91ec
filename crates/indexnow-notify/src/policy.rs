use std::fmt;

use tracing::debug;

use crate::config::NotifierConfig;
use crate::model::{ContentItem, ContentState, DeletedRecord, NotificationRequest};
use crate::noindex::is_noindex;
use crate::router::{resolve_article_url, Router};
use crate::store::ArticleStore;

/// The only event context that is processed.
pub const ARTICLE_CONTEXT: &str = "article";

/// Why an event or item produced no notification. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    NotArticle,
    NotPublished,
    Noindex,
    NoUrl,
    RemovalDisabled,
    MissingId,
    /// State change is neither a publish nor a notified removal.
    NoIntent,
    ItemMissing,
    /// Persisted state no longer matches the requested change.
    StateMismatch,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Skip::NotArticle => "not an article",
            Skip::NotPublished => "article is not published",
            Skip::Noindex => "article is marked with noindex",
            Skip::NoUrl => "could not generate article URL",
            Skip::RemovalDisabled => "removal notifications are disabled",
            Skip::MissingId => "deleted record has no id",
            Skip::NoIntent => "state change does not need a notification",
            Skip::ItemMissing => "article could not be loaded",
            Skip::StateMismatch => "current article state does not match the change",
        };
        f.write_str(reason)
    }
}

pub type Decision = Result<NotificationRequest, Skip>;

/// Outcome of a state change over several items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateChangeDecision {
    pub requests: Vec<NotificationRequest>,
    pub skipped: Vec<(i64, Skip)>,
}

/// Decides whether, and how, each lifecycle event is announced.
pub struct NotificationPolicy<'a> {
    config: &'a NotifierConfig,
    router: &'a dyn Router,
}

impl<'a> NotificationPolicy<'a> {
    pub fn new(config: &'a NotifierConfig, router: &'a dyn Router) -> Self {
        Self { config, router }
    }

    pub fn on_saved(&self, context: &str, item: &ContentItem, is_new: bool) -> Decision {
        if context != ARTICLE_CONTEXT {
            return Err(Skip::NotArticle);
        }
        if self.config.notify_on_publish_only && !item.state.is_published() {
            return Err(Skip::NotPublished);
        }
        if is_noindex(item) {
            return Err(Skip::Noindex);
        }
        let url = resolve_article_url(self.router, item).ok_or(Skip::NoUrl)?;
        debug!(id = item.id, is_new, %url, "article saved");
        Ok(NotificationRequest::submit(url))
    }

    pub fn on_state_changed(
        &self,
        context: &str,
        ids: &[i64],
        new_state: ContentState,
        store: &dyn ArticleStore,
    ) -> Result<StateChangeDecision, Skip> {
        if context != ARTICLE_CONTEXT {
            return Err(Skip::NotArticle);
        }

        let is_publish = new_state.is_published();
        let is_removal = self.config.notify_on_remove && new_state.is_removal();
        if !is_publish && !is_removal {
            return Err(Skip::NoIntent);
        }

        let mut decision = StateChangeDecision::default();
        for &id in ids {
            match self.decide_state_item(id, is_publish, is_removal, store) {
                Ok(req) => decision.requests.push(req),
                Err(skip) => decision.skipped.push((id, skip)),
            }
        }
        Ok(decision)
    }

    fn decide_state_item(
        &self,
        id: i64,
        is_publish: bool,
        is_removal: bool,
        store: &dyn ArticleStore,
    ) -> Decision {
        let item = store.load(id).ok_or(Skip::ItemMissing)?;

        if is_publish && is_noindex(&item) {
            return Err(Skip::Noindex);
        }

        let url = resolve_article_url(self.router, &item).ok_or(Skip::NoUrl)?;

        // Re-check against the persisted state: at most one notification per
        // item, and none when neither condition holds.
        if is_publish && item.state.is_published() {
            Ok(NotificationRequest::submit(url))
        } else if is_removal && !item.state.is_published() {
            Ok(NotificationRequest::removal(url))
        } else {
            Err(Skip::StateMismatch)
        }
    }

    pub fn on_deleted(&self, context: &str, record: &DeletedRecord) -> Decision {
        if context != ARTICLE_CONTEXT {
            return Err(Skip::NotArticle);
        }
        if !self.config.notify_on_remove {
            return Err(Skip::RemovalDisabled);
        }
        let item = record.projection().ok_or(Skip::MissingId)?;
        let url = resolve_article_url(self.router, &item).ok_or(Skip::NoUrl)?;
        Ok(NotificationRequest::removal(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;
    use crate::router::SiteRouter;
    use crate::store::MemoryArticleStore;

    fn router() -> SiteRouter {
        SiteRouter::new("https://example.com", "/{id}-{alias}").unwrap()
    }

    fn article(id: i64, state: ContentState) -> ContentItem {
        ContentItem {
            id,
            alias: format!("article-{id}"),
            category_id: 2,
            category_alias: "news".into(),
            state,
            metadata: None,
        }
    }

    fn noindex(mut item: ContentItem) -> ContentItem {
        item.metadata = Some(Metadata::RawJson(r#"{"robots":"noindex, follow"}"#.into()));
        item
    }

    // ── on_saved ─────────────────────────────────────────────────────────

    #[test]
    fn saved_published_article_is_submitted() {
        let cfg = NotifierConfig::default();
        let router = router();
        let policy = NotificationPolicy::new(&cfg, &router);

        let req = policy
            .on_saved(ARTICLE_CONTEXT, &article(5, ContentState::PUBLISHED), true)
            .unwrap();
        assert_eq!(req, NotificationRequest::submit("https://example.com/5-article-5"));
    }

    #[test]
    fn saved_ignores_other_contexts() {
        let cfg = NotifierConfig::default();
        let router = router();
        let policy = NotificationPolicy::new(&cfg, &router);
        let item = article(5, ContentState::PUBLISHED);

        assert_eq!(policy.on_saved("category", &item, false), Err(Skip::NotArticle));
        assert_eq!(policy.on_saved("com_users.user", &item, false), Err(Skip::NotArticle));
    }

    #[test]
    fn saved_unpublished_skipped_when_publish_only() {
        let cfg = NotifierConfig::default();
        let router = router();
        let policy = NotificationPolicy::new(&cfg, &router);

        for state in [
            ContentState::UNPUBLISHED,
            ContentState::TRASHED,
            ContentState::ARCHIVED,
            ContentState(42),
        ] {
            assert_eq!(
                policy.on_saved(ARTICLE_CONTEXT, &article(5, state), false),
                Err(Skip::NotPublished)
            );
        }
    }

    #[test]
    fn saved_unpublished_submitted_without_publish_only() {
        let cfg = NotifierConfig {
            notify_on_publish_only: false,
            ..Default::default()
        };
        let router = router();
        let policy = NotificationPolicy::new(&cfg, &router);

        let req = policy
            .on_saved(ARTICLE_CONTEXT, &article(5, ContentState::UNPUBLISHED), false)
            .unwrap();
        assert!(!req.is_removal);
    }

    #[test]
    fn saved_noindex_never_submitted() {
        let router = router();
        for publish_only in [true, false] {
            let cfg = NotifierConfig {
                notify_on_publish_only: publish_only,
                ..Default::default()
            };
            let policy = NotificationPolicy::new(&cfg, &router);
            let item = noindex(article(5, ContentState::PUBLISHED));
            assert_eq!(policy.on_saved(ARTICLE_CONTEXT, &item, true), Err(Skip::Noindex));
        }
    }

    #[test]
    fn saved_without_id_has_no_url() {
        let cfg = NotifierConfig::default();
        let router = router();
        let policy = NotificationPolicy::new(&cfg, &router);
        assert_eq!(
            policy.on_saved(ARTICLE_CONTEXT, &article(0, ContentState::PUBLISHED), true),
            Err(Skip::NoUrl)
        );
    }

    // ── on_state_changed ─────────────────────────────────────────────────

    #[test]
    fn unpublish_notifies_only_items_no_longer_published() {
        let cfg = NotifierConfig::default();
        let router = router();
        let policy = NotificationPolicy::new(&cfg, &router);
        let store: MemoryArticleStore = [
            article(5, ContentState::UNPUBLISHED),
            article(9, ContentState::PUBLISHED),
        ]
        .into_iter()
        .collect();

        let decision = policy
            .on_state_changed(ARTICLE_CONTEXT, &[5, 9], ContentState::UNPUBLISHED, &store)
            .unwrap();

        assert_eq!(
            decision.requests,
            vec![NotificationRequest::removal("https://example.com/5-article-5")]
        );
        assert_eq!(decision.skipped, vec![(9, Skip::StateMismatch)]);
    }

    #[test]
    fn trash_counts_as_removal() {
        let cfg = NotifierConfig::default();
        let router = router();
        let policy = NotificationPolicy::new(&cfg, &router);
        let store: MemoryArticleStore = [article(3, ContentState::TRASHED)].into_iter().collect();

        let decision = policy
            .on_state_changed(ARTICLE_CONTEXT, &[3], ContentState::TRASHED, &store)
            .unwrap();
        assert_eq!(decision.requests.len(), 1);
        assert!(decision.requests[0].is_removal);
    }

    #[test]
    fn removal_disabled_or_archive_has_no_intent() {
        let router = router();
        let store = MemoryArticleStore::new();

        let cfg = NotifierConfig {
            notify_on_remove: false,
            ..Default::default()
        };
        let policy = NotificationPolicy::new(&cfg, &router);
        assert_eq!(
            policy.on_state_changed(ARTICLE_CONTEXT, &[1], ContentState::UNPUBLISHED, &store),
            Err(Skip::NoIntent)
        );

        let cfg = NotifierConfig::default();
        let policy = NotificationPolicy::new(&cfg, &router);
        assert_eq!(
            policy.on_state_changed(ARTICLE_CONTEXT, &[1], ContentState::ARCHIVED, &store),
            Err(Skip::NoIntent)
        );
    }

    #[test]
    fn publish_submits_published_and_skips_noindex_and_missing() {
        let cfg = NotifierConfig::default();
        let router = router();
        let policy = NotificationPolicy::new(&cfg, &router);
        let store: MemoryArticleStore = [
            article(1, ContentState::PUBLISHED),
            noindex(article(2, ContentState::PUBLISHED)),
            article(0, ContentState::PUBLISHED),
        ]
        .into_iter()
        .collect();

        let decision = policy
            .on_state_changed(ARTICLE_CONTEXT, &[1, 2, 3, 0], ContentState::PUBLISHED, &store)
            .unwrap();
        assert_eq!(
            decision.requests,
            vec![NotificationRequest::submit("https://example.com/1-article-1")]
        );
        assert_eq!(
            decision.skipped,
            vec![(2, Skip::Noindex), (3, Skip::ItemMissing), (0, Skip::NoUrl)]
        );
    }

    // Publishing an item whose stored state is still unpublished sends
    // nothing: the persisted state wins over the requested one.
    #[test]
    fn publish_with_stale_state_sends_nothing() {
        let cfg = NotifierConfig::default();
        let router = router();
        let policy = NotificationPolicy::new(&cfg, &router);
        let store: MemoryArticleStore =
            [article(7, ContentState::UNPUBLISHED)].into_iter().collect();

        let decision = policy
            .on_state_changed(ARTICLE_CONTEXT, &[7], ContentState::PUBLISHED, &store)
            .unwrap();
        assert!(decision.requests.is_empty());
        assert_eq!(decision.skipped, vec![(7, Skip::StateMismatch)]);
    }

    #[test]
    fn removal_does_not_check_noindex() {
        let cfg = NotifierConfig::default();
        let router = router();
        let policy = NotificationPolicy::new(&cfg, &router);
        let store: MemoryArticleStore =
            [noindex(article(4, ContentState::UNPUBLISHED))].into_iter().collect();

        let decision = policy
            .on_state_changed(ARTICLE_CONTEXT, &[4], ContentState::UNPUBLISHED, &store)
            .unwrap();
        assert_eq!(decision.requests.len(), 1);
    }

    // ── on_deleted ───────────────────────────────────────────────────────

    #[test]
    fn delete_sends_removal() {
        let cfg = NotifierConfig::default();
        let router = router();
        let policy = NotificationPolicy::new(&cfg, &router);
        let record = DeletedRecord {
            id: Some(11),
            alias: Some("old".into()),
            catid: Some(2),
            category_alias: Some("news".into()),
        };

        assert_eq!(
            policy.on_deleted(ARTICLE_CONTEXT, &record),
            Ok(NotificationRequest::removal("https://example.com/11-old"))
        );
    }

    #[test]
    fn delete_guards() {
        let router = router();
        let record = DeletedRecord {
            id: Some(11),
            ..Default::default()
        };

        let cfg = NotifierConfig::default();
        let policy = NotificationPolicy::new(&cfg, &router);
        assert_eq!(policy.on_deleted("tag", &record), Err(Skip::NotArticle));
        assert_eq!(
            policy.on_deleted(ARTICLE_CONTEXT, &DeletedRecord::default()),
            Err(Skip::MissingId)
        );

        let cfg = NotifierConfig {
            notify_on_remove: false,
            ..Default::default()
        };
        let policy = NotificationPolicy::new(&cfg, &router);
        assert_eq!(policy.on_deleted(ARTICLE_CONTEXT, &record), Err(Skip::RemovalDisabled));
    }
}
