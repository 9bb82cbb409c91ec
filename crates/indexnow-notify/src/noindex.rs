use serde_json::Value;

use crate::model::ContentItem;

/// True when the item's `robots` metadata contains `noindex` (any case).
///
/// Other robots directives are ignored.
pub fn is_noindex(item: &ContentItem) -> bool {
    let Some(metadata) = item.metadata.as_ref().and_then(|m| m.resolve()) else {
        return false;
    };

    let robots = match metadata.get("robots") {
        None | Some(Value::Null) => return false,
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    robots.to_ascii_lowercase().contains("noindex")
}
