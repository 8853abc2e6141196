//! Request path normalisation and page matching

use percent_encoding::percent_decode_str;
use std::ptr;

use crate::page::{PageNode, DESCRIPTOR_FILE};

/// A page matched for a request, plus whatever part of the path lies beyond it
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub node: &'a PageNode,
    /// Path below the page (`img/logo.png`); `None` when the page itself was requested
    pub tail: Option<String>,
}

impl PartialEq for RouteMatch<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.node, other.node) && self.tail == other.tail
    }
}

/// Normalise a request path into a route relative to the webroot.
///
/// Each segment is percent-decoded exactly once. Empty and `.` segments are
/// dropped; the empty route becomes `/`. Returns `None` when the path does
/// not live under `webroot`, contains a `..` segment, or decodes to a
/// segment holding a separator.
pub fn normalize_route(path: &str, webroot: &str) -> Option<String> {
    let mut segments = Vec::new();
    for raw in path.split('/').filter(|s| !s.is_empty()) {
        let segment = percent_decode_str(raw).decode_utf8().ok()?.into_owned();
        if segment == "." {
            continue;
        }
        if segment == ".." || segment.contains(&['/', '\\', '\0'][..]) {
            return None;
        }
        segments.push(segment);
    }

    let prefix: Vec<&str> = webroot.split('/').filter(|s| !s.is_empty()).collect();
    let under_webroot = segments.len() >= prefix.len()
        && segments.iter().zip(&prefix).all(|(s, p)| s.as_str() == *p);
    if !under_webroot {
        return None;
    }
    Some(format!("/{}", segments[prefix.len()..].join("/")))
}

/// True when a normalised route asks for a descriptor file, which is never delivered
pub fn is_descriptor_request(route: &str) -> bool {
    route.rsplit('/').next() == Some(DESCRIPTOR_FILE)
}

/// Find the deepest page matching a normalised route
pub fn find_page<'a>(root: &'a PageNode, route: &str) -> Option<RouteMatch<'a>> {
    let mut segments = vec!["/"];
    segments.extend(route.split('/').filter(|s| !s.is_empty()));
    match_segments(root, &segments)
}

fn match_segments<'a>(node: &'a PageNode, segments: &[&str]) -> Option<RouteMatch<'a>> {
    let (first, rest) = segments.split_first()?;
    if node.route_part != *first {
        return None;
    }

    let tail = rest.join("/");
    // `/page/index.html` is the page itself, not a file below it
    if tail == node.page_index {
        return Some(RouteMatch { node, tail: None });
    }

    if !rest.is_empty() {
        for child in &node.child_pages {
            if let Some(found) = match_segments(child, rest) {
                return Some(found);
            }
        }
    }

    Some(RouteMatch {
        node,
        tail: (!tail.is_empty()).then_some(tail),
    })
}
