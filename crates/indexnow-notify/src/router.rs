use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::model::ContentItem;

/// Default route template: the CMS's internal "view article" link.
pub const DEFAULT_ROUTE_TEMPLATE: &str =
    "index.php?option=com_content&view=article&id={slug}&catid={catslug}";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(slug|catslug|id|alias|catid|category_alias)\}").expect("static placeholder pattern")
});

/// The canonical "view article" route for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRoute {
    pub id: i64,
    pub alias: String,
    pub category_id: i64,
    pub category_alias: String,
}

impl ArticleRoute {
    pub fn for_item(item: &ContentItem) -> Self {
        Self {
            id: item.id,
            alias: item.alias.clone(),
            category_id: item.category_id,
            category_alias: item.category_alias.clone(),
        }
    }

    /// `id:alias`
    pub fn slug(&self) -> String {
        format!("{}:{}", self.id, self.alias)
    }

    /// `catid:category_alias`
    pub fn category_slug(&self) -> String {
        format!("{}:{}", self.category_id, self.category_alias)
    }

    /// Fill a template's placeholders with this route's values in one pass,
    /// so placeholder text inside an alias is left alone.
    pub fn render(&self, template: &str) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
                "slug" => self.slug(),
                "catslug" => self.category_slug(),
                "id" => self.id.to_string(),
                "alias" => self.alias.clone(),
                "catid" => self.category_id.to_string(),
                _ => self.category_alias.clone(),
            })
            .into_owned()
    }
}

/// Builds public links for routes. Implemented by the host application.
pub trait Router: Send + Sync {
    /// Build the link for `route`. With `absolute`, the result must include
    /// scheme and host. The scheme is left as the site is configured.
    fn link(&self, route: &ArticleRoute, absolute: bool) -> Result<String>;
}

/// Resolve the absolute public URL of `item`.
///
/// `None` when the item has no id or the router cannot produce a link.
pub fn resolve_article_url(router: &dyn Router, item: &ContentItem) -> Option<String> {
    if item.id <= 0 {
        return None;
    }

    let route = ArticleRoute::for_item(item);
    match router.link(&route, true) {
        Ok(link) if !link.is_empty() => Some(link),
        Ok(_) => None,
        Err(e) => {
            debug!(id = item.id, error = %e, "router could not build article url");
            None
        }
    }
}

/// Template-driven router rooted at the site's base URL.
#[derive(Debug, Clone)]
pub struct SiteRouter {
    base: Url,
    template: String,
}

impl SiteRouter {
    pub fn new(base_url: &str, template: impl Into<String>) -> Result<Self> {
        let mut base =
            Url::parse(base_url).map_err(|e| Error::Route(format!("invalid site url: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Route(format!("{base_url} cannot be a base url")));
        }
        // Keep the last path segment when joining relative links.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            template: template.into(),
        })
    }

    pub fn with_default_template(base_url: &str) -> Result<Self> {
        Self::new(base_url, DEFAULT_ROUTE_TEMPLATE)
    }
}

impl Router for SiteRouter {
    fn link(&self, route: &ArticleRoute, absolute: bool) -> Result<String> {
        let rendered = route.render(&self.template);
        let url = self
            .base
            .join(rendered.trim_start_matches('/'))
            .map_err(|e| Error::Route(format!("{rendered}: {e}")))?;

        if absolute {
            Ok(url.to_string())
        } else {
            let mut relative = url.path().to_owned();
            if let Some(q) = url.query() {
                relative.push('?');
                relative.push_str(q);
            }
            Ok(relative)
        }
    }
}
