//! Template rendering using the Tera template engine
//!
//! Templates come from two roots: the theme's `templates` directory and the
//! content directory itself. Both are loaded once at startup; when a name
//! exists in both, the content directory wins.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Template, Tera};
use walkdir::WalkDir;

use crate::page::{PageNode, PageType};

/// Template used by the error presenter
pub const ERROR_TEMPLATE: &str = "error.html";

/// Template renderer over the theme and content directories
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Load every `.html` template below the theme templates and content directories.
    ///
    /// Theme templates must all parse. Content files that do not parse are
    /// plain assets and are left out with a warning.
    pub fn load(site_dir: &Path, theme_templates_dir: &Path) -> Result<Self> {
        let mut tera = Tera::default();

        // Pages produce HTML on purpose; page data must not be escaped
        tera.autoescape_on(vec![]);

        let mut files = collect_templates(theme_templates_dir);
        files.extend(
            collect_templates(site_dir)
                .into_iter()
                .filter(|(path, name)| name.as_deref().is_some_and(|n| parses(path, n))),
        );
        tracing::debug!("Loading {} templates", files.len());
        tera.add_template_files(files)?;

        Ok(Self { tera })
    }

    /// Register html page indexes that do not carry an `.html` extension
    pub fn add_page_templates(&mut self, root: &PageNode) -> Result<()> {
        let files: Vec<(PathBuf, Option<String>)> = root
            .iter()
            .filter(|page| page.page_type == PageType::Html)
            .filter_map(|page| {
                let name = page.template.as_ref()?;
                (!self.has_template(name)).then(|| (page.index_path(), Some(name.clone())))
            })
            .collect();

        if !files.is_empty() {
            self.tera.add_template_files(files)?;
        }
        Ok(())
    }

    /// Check if a template exists
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Templates referenced by pages of the tree that were not loaded
    pub fn missing_templates(&self, root: &PageNode) -> Vec<String> {
        root.iter()
            .filter_map(|page| page.template.as_ref())
            .filter(|name| !self.has_template(name))
            .cloned()
            .collect()
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> tera::Result<String> {
        self.tera.render(template_name, context)
    }

    /// Render a string as a standalone template
    pub fn render_str(&self, source: &str, context: &Context) -> tera::Result<String> {
        Tera::one_off(source, context, false)
    }
}

/// Check that a content file is a valid template
fn parses(path: &Path, name: &str) -> bool {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!("Not loading {:?} as template: {}", path, e);
            return false;
        }
    };
    match Template::new(name, None, &source) {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Not loading {:?} as template: {}", path, e);
            false
        }
    }
}

/// `.html` files below `root`, named by their `/`-separated relative path
fn collect_templates(root: &Path) -> Vec<(PathBuf, Option<String>)> {
    if !root.is_dir() {
        tracing::debug!("Template directory {:?} does not exist", root);
        return Vec::new();
    }

    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "html" || ext == "htm")
                .unwrap_or(false)
        })
        .filter_map(|e| {
            let relative = e.path().strip_prefix(root).ok()?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/");
            Some((e.path().to_path_buf(), Some(name)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_loads_both_roots() {
        let site = TempDir::new().unwrap();
        let theme = TempDir::new().unwrap();
        write(&site.path().join("about/index.html"), "About {{ route }}");
        write(&theme.path().join("layout.html"), "<main>{{ content }}</main>");
        write(&site.path().join("about/notes.txt"), "{{ not a template");

        let renderer = TemplateRenderer::load(site.path(), theme.path()).unwrap();
        assert!(renderer.has_template("about/index.html"));
        assert!(renderer.has_template("layout.html"));
        assert!(!renderer.has_template("about/notes.txt"));

        let mut context = Context::new();
        context.insert("content", "<p>hi</p>");
        assert_eq!(
            renderer.render("layout.html", &context).unwrap(),
            "<main><p>hi</p></main>"
        );
    }

    #[test]
    fn test_unparsable_content_file_is_skipped() {
        let site = TempDir::new().unwrap();
        let theme = TempDir::new().unwrap();
        write(&site.path().join("pub/index.html"), "Pub");
        write(
            &site.path().join("pub/widget.html"),
            "<script>var t = '{{ x |';</script>",
        );

        let renderer = TemplateRenderer::load(site.path(), theme.path()).unwrap();
        assert!(renderer.has_template("pub/index.html"));
        assert!(!renderer.has_template("pub/widget.html"));
    }

    #[test]
    fn test_unparsable_theme_template_is_an_error() {
        let site = TempDir::new().unwrap();
        let theme = TempDir::new().unwrap();
        write(&theme.path().join("layout.html"), "{{ content |");
        assert!(TemplateRenderer::load(site.path(), theme.path()).is_err());
    }

    #[test]
    fn test_site_overrides_theme() {
        let site = TempDir::new().unwrap();
        let theme = TempDir::new().unwrap();
        write(&theme.path().join("error.html"), "theme");
        write(&site.path().join("error.html"), "site");

        let renderer = TemplateRenderer::load(site.path(), theme.path()).unwrap();
        assert_eq!(
            renderer.render(ERROR_TEMPLATE, &Context::new()).unwrap(),
            "site"
        );
    }

    #[test]
    fn test_site_template_extends_theme_layout() {
        let site = TempDir::new().unwrap();
        let theme = TempDir::new().unwrap();
        write(
            &theme.path().join("base.html"),
            "<body>{% block body %}{% endblock %}</body>",
        );
        write(
            &site.path().join("index.html"),
            r#"{% extends "base.html" %}{% block body %}Home{% endblock %}"#,
        );

        let renderer = TemplateRenderer::load(site.path(), theme.path()).unwrap();
        assert_eq!(
            renderer.render("index.html", &Context::new()).unwrap(),
            "<body>Home</body>"
        );
    }

    #[test]
    fn test_missing_theme_dir_is_not_an_error() {
        let site = TempDir::new().unwrap();
        let renderer =
            TemplateRenderer::load(site.path(), &site.path().join("nothing")).unwrap();
        assert!(!renderer.has_template(ERROR_TEMPLATE));
    }

    #[test]
    fn test_render_str() {
        let site = TempDir::new().unwrap();
        let renderer = TemplateRenderer::load(site.path(), site.path()).unwrap();
        let mut context = Context::new();
        context.insert("name", "pcms");
        assert_eq!(
            renderer.render_str("Hello {{ name }}", &context).unwrap(),
            "Hello pcms"
        );
    }

    #[test]
    fn test_page_templates_with_other_extensions() {
        let site = TempDir::new().unwrap();
        write(&site.path().join("start.tpl"), "Start");
        let mut root = PageNode::synthetic("/");
        root.full_path = site.path().to_path_buf();
        root.page_index = "start.tpl".to_string();
        root.template = Some("start.tpl".to_string());

        let mut renderer = TemplateRenderer::load(site.path(), site.path()).unwrap();
        assert_eq!(renderer.missing_templates(&root), vec!["start.tpl"]);

        renderer.add_page_templates(&root).unwrap();
        assert!(renderer.missing_templates(&root).is_empty());
        assert_eq!(renderer.render("start.tpl", &Context::new()).unwrap(), "Start");
    }
}
