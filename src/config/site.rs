//! Site configuration (site-config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    /// URL prefix all pages live under, e.g. `/docs`. Empty for the server root.
    pub webroot: String,

    // Extensions
    pub theme: String,

    // Server
    pub listen: String,
    pub port: u16,

    /// Username to bcrypt hash. Never handed to templates.
    #[serde(skip_serializing)]
    pub users: BTreeMap<String, String>,

    #[serde(default)]
    pub markdown: MarkdownConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "pcms".to_string(),
            webroot: String::new(),
            theme: "default".to_string(),
            listen: "127.0.0.1".to_string(),
            port: 3000,
            users: BTreeMap::new(),
            markdown: MarkdownConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: SiteConfig = serde_yaml::from_str(&content)?;
        config.webroot = normalize_webroot(&config.webroot);
        Ok(config)
    }

    /// Resolve the directories this configuration points at, relative to `base_dir`
    pub fn paths<P: AsRef<Path>>(&self, base_dir: P) -> SitePaths {
        let base_dir = base_dir.as_ref();
        let theme_dir = base_dir.join("themes").join(&self.theme);
        SitePaths {
            site_dir: base_dir.join("site"),
            theme_templates_dir: theme_dir.join("templates"),
            theme_static_dir: theme_dir.join("static"),
            theme_dir,
        }
    }
}

/// Markdown conversion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    pub highlight_theme: String,
    pub line_numbers: bool,
    /// Expand the Markdown source as a template before converting it
    pub templating: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            highlight_theme: "base16-ocean.dark".to_string(),
            line_numbers: false,
            templating: false,
        }
    }
}

/// Directories derived from the site configuration
#[derive(Debug, Clone)]
pub struct SitePaths {
    /// Content tree root
    pub site_dir: PathBuf,
    pub theme_dir: PathBuf,
    pub theme_templates_dir: PathBuf,
    pub theme_static_dir: PathBuf,
}

/// Strip trailing slashes and make sure a non-empty webroot starts with one.
fn normalize_webroot(webroot: &str) -> String {
    let trimmed = webroot.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
