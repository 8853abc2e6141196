//! pcms: a small dynamic CMS serving a directory tree of pages
//!
//! Every directory below `site/` that carries a `page.json` descriptor and an
//! index file becomes a page. Pages are rendered on request through Tera
//! templates, may be protected by HTTP basic authentication and can delegate
//! to preprocessors and request handlers registered in Rust.

pub mod commands;
pub mod config;
pub mod content;
pub mod page;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

use page::{HandlerRegistry, PageNode, PageTreeBuilder};

/// Name of the site configuration file in the base directory
pub const CONFIG_FILE: &str = "site-config.yml";

/// The main application: a site configuration and where its files live
#[derive(Clone)]
pub struct Pcms {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content and theme directories
    pub paths: config::SitePaths,
}

impl Pcms {
    /// Create a new instance from a directory. A missing config file means defaults.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No {} in {:?}, using defaults", CONFIG_FILE, base_dir);
            config::SiteConfig::default()
        };
        let paths = config.paths(&base_dir);

        Ok(Self {
            config,
            base_dir,
            paths,
        })
    }

    /// Build the page tree of the content directory
    pub fn build_tree(&self, registry: &HandlerRegistry) -> Result<PageNode> {
        let root = PageTreeBuilder::new(&self.paths.site_dir, registry).build()?;
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_config_file() {
        let base = TempDir::new().unwrap();
        let pcms = Pcms::new(base.path()).unwrap();
        assert_eq!(pcms.config.theme, "default");
        assert_eq!(pcms.paths.site_dir, base.path().join("site"));
    }

    #[test]
    fn test_build_tree_from_config() {
        let base = TempDir::new().unwrap();
        fs::write(base.path().join(CONFIG_FILE), "title: Mine\ntheme: plain\n").unwrap();
        fs::create_dir_all(base.path().join("site/blog")).unwrap();
        fs::write(base.path().join("site/page.json"), "{}").unwrap();
        fs::write(base.path().join("site/index.html"), "home").unwrap();
        fs::write(base.path().join("site/blog/page.json"), "{}").unwrap();
        fs::write(base.path().join("site/blog/index.html"), "blog").unwrap();

        let pcms = Pcms::new(base.path()).unwrap();
        assert_eq!(pcms.config.title, "Mine");
        assert_eq!(
            pcms.paths.theme_templates_dir,
            base.path().join("themes/plain/templates")
        );

        let root = pcms.build_tree(&HandlerRegistry::new()).unwrap();
        let routes: Vec<&str> = root.iter().map(|p| p.route.as_str()).collect();
        assert_eq!(routes, vec!["/", "/blog"]);
    }
}
