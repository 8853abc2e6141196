//! Page tree nodes

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::handler::{PageHandler, Preprocessor};
use super::PageConfig;

/// How a page's index file is turned into a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    /// The index file is itself a template
    Html,
    /// Converted to HTML and wrapped in the declared template
    Markdown,
    /// Loaded as data and handed to the declared template
    Json,
    /// Served by a registered [`PageHandler`]
    Js,
}

impl PageType {
    /// Derive the page type from the index file's extension
    pub fn from_index(index: &str) -> Self {
        match Path::new(index).extension().and_then(|e| e.to_str()) {
            Some("md") => PageType::Markdown,
            Some("json") => PageType::Json,
            Some("js") => PageType::Js,
            _ => PageType::Html,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Html => "html",
            PageType::Markdown => "markdown",
            PageType::Json => "json",
            PageType::Js => "js",
        }
    }
}

/// One page of the site: a directory with a descriptor and an index file.
///
/// Built once at startup and never mutated; requests only read it.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNode {
    /// Distance from the root, which has depth 0
    pub depth: usize,
    pub full_path: PathBuf,
    /// This page's URL segment; `/` for the root
    pub route_part: String,
    /// Route from the root, without trailing slash (except the root itself)
    pub route: String,
    pub page_config: PageConfig,
    pub page_index: String,
    /// Children, ordered by `pageConfig.order`
    pub child_pages: Vec<PageNode>,
    pub template: Option<String>,
    #[serde(rename = "type")]
    pub page_type: PageType,

    #[serde(skip)]
    pub(crate) child_pages_by_route: IndexMap<String, usize>,
    #[serde(skip)]
    pub(crate) delivery_filters: Vec<Regex>,
    #[serde(skip)]
    pub(crate) preprocessor: Option<Arc<dyn Preprocessor>>,
    #[serde(skip)]
    pub(crate) handler: Option<Arc<dyn PageHandler>>,
}

impl PageNode {
    /// Path of the index file on disk
    pub fn index_path(&self) -> PathBuf {
        self.full_path.join(&self.page_index)
    }

    /// Look up a direct child by its route
    pub fn child_by_route(&self, route: &str) -> Option<&PageNode> {
        self.child_pages_by_route
            .get(route)
            .and_then(|&i| self.child_pages.get(i))
    }

    /// Compiled `preventDelivery` patterns
    pub fn delivery_filters(&self) -> &[Regex] {
        &self.delivery_filters
    }

    pub fn preprocessor(&self) -> Option<&Arc<dyn Preprocessor>> {
        self.preprocessor.as_ref()
    }

    pub fn handler(&self) -> Option<&Arc<dyn PageHandler>> {
        self.handler.as_ref()
    }

    /// Depth-first iterator over this page and all of its descendants
    pub fn iter(&self) -> impl Iterator<Item = &PageNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.child_pages.iter().rev());
            Some(node)
        })
    }

    /// Rebuild the route lookup after `child_pages` changed order
    pub(crate) fn index_children(&mut self) {
        self.child_pages_by_route = self
            .child_pages
            .iter()
            .enumerate()
            .map(|(i, child)| (child.route.clone(), i))
            .collect();
    }

    /// A bare html page, used by tests that need a node without a directory
    #[cfg(test)]
    pub(crate) fn synthetic(route: &str) -> Self {
        let route_part = if route == "/" {
            "/".to_string()
        } else {
            route.rsplit('/').next().unwrap_or_default().to_string()
        };
        Self {
            depth: route.matches('/').count().saturating_sub(usize::from(route == "/")),
            full_path: PathBuf::from(route),
            route_part,
            route: route.to_string(),
            page_config: PageConfig::default(),
            page_index: "index.html".to_string(),
            child_pages: Vec::new(),
            template: Some("index.html".to_string()),
            page_type: PageType::Html,
            child_pages_by_route: IndexMap::new(),
            delivery_filters: Vec::new(),
            preprocessor: None,
            handler: None,
        }
    }
}

impl fmt::Debug for PageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageNode")
            .field("route", &self.route)
            .field("type", &self.page_type)
            .field("page_index", &self.page_index)
            .field("template", &self.template)
            .field("children", &self.child_pages.len())
            .finish()
    }
}
