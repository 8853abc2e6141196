//! Page descriptor (page.json)

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Name of the per-directory descriptor file
pub const DESCRIPTOR_FILE: &str = "page.json";

/// `requiredUsers` entry that admits any user with valid credentials
pub const VALID_USER: &str = "valid-user";

/// Configuration of one page, loaded from its descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_users: Option<Vec<String>>,
    #[serde(default)]
    pub prevent_delivery: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Descriptor keys without a meaning to the server (`title`, `metaTags`, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order: None,
            required_users: None,
            prevent_delivery: Vec::new(),
            preprocessor: None,
            index: None,
            template: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl PageConfig {
    /// Parse a descriptor's JSON text
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// True when the page declares `requiredUsers`, even an empty list
    pub fn is_protected(&self) -> bool {
        self.required_users.is_some()
    }
}

/// Sibling ordering key: descriptors may use numbers or strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderKey {
    Number(f64),
    Text(String),
}

/// Compare two optional order keys.
///
/// Numbers sort before strings, and pages without a key sort last. Two
/// missing keys compare equal so a stable sort keeps discovery order.
pub fn compare_order(a: &Option<OrderKey>, b: &Option<OrderKey>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(OrderKey::Number(x)), Some(OrderKey::Number(y))) => x.total_cmp(y),
        (Some(OrderKey::Text(x)), Some(OrderKey::Text(y))) => x.cmp(y),
        (Some(OrderKey::Number(_)), Some(OrderKey::Text(_))) => Ordering::Less,
        (Some(OrderKey::Text(_)), Some(OrderKey::Number(_))) => Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PageConfig::parse("{}").unwrap();
        assert!(config.enabled);
        assert!(config.prevent_delivery.is_empty());
        assert_eq!(config.order, None);
        assert!(!config.is_protected());
    }

    #[test]
    fn test_parse_full_descriptor() {
        let config = PageConfig::parse(
            r#"{
                "title": "About",
                "enabled": false,
                "order": 2,
                "requiredUsers": ["alice", "valid-user"],
                "preventDelivery": ["\\.secret$"],
                "preprocessor": "data.js",
                "index": "main.md",
                "template": "../layout.html"
            }"#,
        )
        .unwrap();

        assert!(!config.enabled);
        assert_eq!(config.order, Some(OrderKey::Number(2.0)));
        assert_eq!(
            config.required_users,
            Some(vec!["alice".to_string(), VALID_USER.to_string()])
        );
        assert_eq!(config.prevent_delivery, vec!["\\.secret$".to_string()]);
        assert_eq!(config.preprocessor.as_deref(), Some("data.js"));
        assert_eq!(config.index.as_deref(), Some("main.md"));
        assert_eq!(config.template.as_deref(), Some("../layout.html"));
        assert_eq!(
            config.extra.get("title"),
            Some(&serde_json::Value::String("About".to_string()))
        );
    }

    #[test]
    fn test_empty_required_users_is_still_protected() {
        let config = PageConfig::parse(r#"{"requiredUsers": []}"#).unwrap();
        assert!(config.is_protected());
    }

    #[test]
    fn test_string_order_key() {
        let config = PageConfig::parse(r#"{"order": "b"}"#).unwrap();
        assert_eq!(config.order, Some(OrderKey::Text("b".to_string())));
    }

    #[test]
    fn test_compare_order() {
        let one = Some(OrderKey::Number(1.0));
        let two = Some(OrderKey::Number(2.0));
        let text = Some(OrderKey::Text("a".to_string()));

        assert_eq!(compare_order(&one, &two), Ordering::Less);
        assert_eq!(compare_order(&two, &one), Ordering::Greater);
        assert_eq!(compare_order(&one, &text), Ordering::Less);
        assert_eq!(compare_order(&text, &None), Ordering::Less);
        assert_eq!(compare_order(&None, &one), Ordering::Greater);
        assert_eq!(compare_order(&None, &None), Ordering::Equal);
    }
}
