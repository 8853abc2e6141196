//! Page rendering: one strategy per page type

use axum::body::Body;
use axum::http::Request;
use axum::response::{Html, IntoResponse};
use chrono::{DateTime, Local};
use serde::Serialize;
use tera::Context;

use super::error::PageError;
use crate::config::SiteConfig;
use crate::content::MarkdownRenderer;
use crate::page::{ContextMap, HandlerOutcome, PageNode, PageType};
use crate::templates::TemplateRenderer;

/// Variables every page and error template can use
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseContext<'a> {
    pub site: &'a SiteConfig,
    /// The site's webroot
    pub base: &'a str,
    /// Route of the page, without index file
    pub route: &'a str,
    /// Route as requested, e.g. including `index.html`
    pub full_route: &'a str,
    pub page: Option<&'a PageNode>,
    pub root_page: &'a PageNode,
    pub now: DateTime<Local>,
}

impl BaseContext<'_> {
    pub fn into_context(self) -> tera::Result<Context> {
        Context::from_serialize(&self)
    }
}

/// Renders matched, authorised pages
pub struct PageRenderer<'a> {
    pub site: &'a SiteConfig,
    pub templates: &'a TemplateRenderer,
    pub markdown: &'a MarkdownRenderer,
    pub root: &'a PageNode,
}

impl PageRenderer<'_> {
    /// Render `page` for a request whose route had no tail.
    ///
    /// `js` pages hand the request to their handler, which may decide to
    /// let asset delivery continue instead of answering itself.
    pub async fn render(
        &self,
        page: &PageNode,
        full_route: &str,
        request: Request<Body>,
    ) -> Result<HandlerOutcome, PageError> {
        tracing::debug!("Page found: {} {:?}", page.route, page.full_path);

        let extra = match page.preprocessor() {
            Some(preprocessor) => preprocessor
                .process(page, self.root)
                .await
                .map_err(PageError::Preprocessor)?,
            None => ContextMap::new(),
        };
        let mut context = self.context(page, full_route, extra)?;

        let body = match page.page_type {
            PageType::Html => self.templates.render(template_of(page)?, &context)?,
            PageType::Markdown => {
                let mut source = tokio::fs::read_to_string(page.index_path()).await?;
                if self.site.markdown.templating {
                    source = self.templates.render_str(&source, &context)?;
                }
                let html = self.markdown.render(&source).map_err(PageError::Markdown)?;
                context.insert("content", &html);
                self.templates.render(template_of(page)?, &context)?
            }
            PageType::Json => {
                let raw = tokio::fs::read_to_string(page.index_path()).await?;
                let content: serde_json::Value = serde_json::from_str(&raw)?;
                context.insert("content", &content);
                self.templates.render(template_of(page)?, &context)?
            }
            PageType::Js => {
                let handler = page
                    .handler()
                    .ok_or_else(|| PageError::HandlerNotCallable(page.route.clone()))?;
                return handler
                    .handle(request, context)
                    .await
                    .map_err(PageError::Handler);
            }
        };

        Ok(HandlerOutcome::Respond(Html(body).into_response()))
    }

    /// Base context with preprocessor output merged over it
    fn context(
        &self,
        page: &PageNode,
        full_route: &str,
        extra: ContextMap,
    ) -> Result<Context, PageError> {
        let mut context = BaseContext {
            site: self.site,
            base: &self.site.webroot,
            route: &page.route,
            full_route,
            page: Some(page),
            root_page: self.root,
            now: Local::now(),
        }
        .into_context()?;

        for (key, value) in extra {
            context.insert(key, &value);
        }
        Ok(context)
    }
}

fn template_of(page: &PageNode) -> Result<&str, PageError> {
    page.template.as_deref().ok_or_else(|| PageError::Status {
        status: axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("Page {} has no template", page.route),
    })
}
