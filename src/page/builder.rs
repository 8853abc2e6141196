//! Page tree construction
//!
//! Walks the content directory once at startup. A directory is a page when
//! it holds a `page.json` descriptor and a readable index file; anything else
//! is left out of the tree together with its subdirectories.

use indexmap::IndexMap;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::config::{compare_order, PageConfig, DESCRIPTOR_FILE};
use super::handler::HandlerRegistry;
use super::index::resolve_index;
use super::node::{PageNode, PageType};

/// Errors that abort tree construction, and with it server startup
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid page descriptor {path:?}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid preventDelivery pattern {pattern:?} in {path:?}: {source}")]
    InvalidPattern {
        path: PathBuf,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Preprocessor {name:?} declared in {path:?} is not registered")]
    UnknownPreprocessor { path: PathBuf, name: String },

    #[error("Page {route} needs a template for its index file")]
    MissingTemplate { route: String },

    #[error("Template {template:?} of page {route} points outside the template roots")]
    TemplateOutsideSite { route: String, template: String },

    #[error("No root page found in {path:?} (needs page.json and an index file)")]
    MissingRoot { path: PathBuf },
}

/// Builds the page tree below a content directory
pub struct PageTreeBuilder<'a> {
    site_dir: PathBuf,
    registry: &'a HandlerRegistry,
}

impl<'a> PageTreeBuilder<'a> {
    pub fn new<P: AsRef<Path>>(site_dir: P, registry: &'a HandlerRegistry) -> Self {
        Self {
            site_dir: site_dir.as_ref().to_path_buf(),
            registry,
        }
    }

    /// Build the tree, failing when the content directory itself is not a page
    pub fn build(&self) -> Result<PageNode, BuildError> {
        let root = self
            .build_page(&self.site_dir, 0)?
            .ok_or_else(|| BuildError::MissingRoot {
                path: self.site_dir.clone(),
            })?;
        tracing::info!("Page tree complete: {} pages", root.iter().count());
        Ok(root)
    }

    /// Build the page for `dir`, or `None` if the directory is not a page
    pub fn build_page(&self, dir: &Path, depth: usize) -> Result<Option<PageNode>, BuildError> {
        let descriptor_path = dir.join(DESCRIPTOR_FILE);
        let descriptor = match fs::read_to_string(&descriptor_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Skipping {:?}: no {}", dir, DESCRIPTOR_FILE);
                return Ok(None);
            }
            Err(source) => {
                return Err(BuildError::Io {
                    path: descriptor_path,
                    source,
                })
            }
        };
        let mut config =
            PageConfig::parse(&descriptor).map_err(|source| BuildError::Descriptor {
                path: descriptor_path.clone(),
                source,
            })?;

        let rel_dir = self.relative_dir(dir);
        let route = format!("/{}", rel_dir);
        let route_part = if depth == 0 {
            "/".to_string()
        } else {
            dir.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        };

        let preprocessor = match config.preprocessor.clone() {
            Some(name) => {
                let resolved = self
                    .registry
                    .preprocessor(&join_relative(&rel_dir, &name), &name)
                    .ok_or_else(|| BuildError::UnknownPreprocessor {
                        path: descriptor_path.clone(),
                        name: name.clone(),
                    })?;
                config
                    .prevent_delivery
                    .push(format!("^{}$", regex::escape(&name)));
                Some(resolved)
            }
            None => None,
        };

        let delivery_filters = config
            .prevent_delivery
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| BuildError::InvalidPattern {
                    path: descriptor_path.clone(),
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let Some(page_index) = resolve_index(dir, config.index.as_deref()) else {
            tracing::debug!("Skipping {:?}: no index file", dir);
            return Ok(None);
        };

        let page_type = PageType::from_index(&page_index);
        let template = match page_type {
            PageType::Html => Some(join_relative(&rel_dir, &page_index)),
            PageType::Markdown | PageType::Json => {
                let reference = config
                    .template
                    .as_deref()
                    .ok_or_else(|| BuildError::MissingTemplate {
                        route: route.clone(),
                    })?;
                let name = resolve_template_ref(&rel_dir, reference).ok_or_else(|| {
                    BuildError::TemplateOutsideSite {
                        route: route.clone(),
                        template: reference.to_string(),
                    }
                })?;
                Some(name)
            }
            PageType::Js => None,
        };
        let handler = match page_type {
            PageType::Js => self
                .registry
                .handler(&join_relative(&rel_dir, &page_index), &page_index),
            _ => None,
        };

        tracing::debug!("Page found: {} ({})", route, page_type.as_str());

        let mut child_pages = Vec::new();
        for child_dir in subdirectories(dir)? {
            if let Some(child) = self.build_page(&child_dir, depth + 1)? {
                child_pages.push(child);
            }
        }
        // stable: equal keys keep discovery order
        child_pages.sort_by(|a, b| compare_order(&a.page_config.order, &b.page_config.order));

        let mut node = PageNode {
            depth,
            full_path: dir.to_path_buf(),
            route_part,
            route,
            page_config: config,
            page_index,
            child_pages,
            template,
            page_type,
            child_pages_by_route: IndexMap::new(),
            delivery_filters,
            preprocessor,
            handler,
        };
        node.index_children();
        Ok(Some(node))
    }

    /// `/`-separated path of `dir` below the content directory; empty for the root
    fn relative_dir(&self, dir: &Path) -> String {
        dir.strip_prefix(&self.site_dir)
            .unwrap_or(dir)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Immediate subdirectories of `dir`, sorted by name
fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let entries = fs::read_dir(dir).map_err(|source| BuildError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| BuildError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn join_relative(rel_dir: &str, name: &str) -> String {
    if rel_dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", rel_dir, name)
    }
}

/// Resolve a descriptor's template reference to a template name.
///
/// References are relative to the page directory, or to the template roots
/// when they start with `/`. Returns `None` if the result would leave the root.
pub fn resolve_template_ref(rel_dir: &str, reference: &str) -> Option<String> {
    let segments: Vec<&str> = match reference.strip_prefix('/') {
        Some(absolute) => absolute.split('/').collect(),
        None => rel_dir.split('/').chain(reference.split('/')).collect(),
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            part => parts.push(part),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
