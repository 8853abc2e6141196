//! HTTP server: routes every request through the page tree
//!
//! Each request is matched against the tree, checked by the access gate and
//! then either rendered as a page or handed to asset delivery. Failures at
//! any stage end in the error page.

mod auth;
mod error;
mod render;
mod route;
mod static_files;

pub use auth::{Access, AccessGate, CredentialStore, Credentials};
pub use error::{ErrorPresenter, PageError};
pub use render::{BaseContext, PageRenderer};
pub use route::{find_page, is_descriptor_request, normalize_route, RouteMatch};
pub use static_files::StaticFiles;

use anyhow::{anyhow, Result};
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::SiteConfig;
use crate::content::MarkdownRenderer;
use crate::page::{HandlerOutcome, HandlerRegistry, PageNode};
use crate::templates::{TemplateRenderer, ERROR_TEMPLATE};
use crate::Pcms;

/// Everything a request needs; built once and shared read-only
pub struct AppState {
    pub config: SiteConfig,
    pub root: PageNode,
    pub templates: TemplateRenderer,
    pub markdown: MarkdownRenderer,
    pub gate: AccessGate,
    pub static_files: StaticFiles,
}

impl AppState {
    /// Build the page tree and load templates. Any failure here is fatal.
    pub fn new(pcms: &Pcms, registry: &HandlerRegistry) -> Result<Self> {
        tracing::info!("Building page tree ...");
        let root = pcms.build_tree(registry)?;

        let mut templates =
            TemplateRenderer::load(&pcms.paths.site_dir, &pcms.paths.theme_templates_dir)?;
        templates.add_page_templates(&root)?;
        if !templates.has_template(ERROR_TEMPLATE) {
            return Err(anyhow!(
                "No {} template found in {:?} or {:?}",
                ERROR_TEMPLATE,
                pcms.paths.site_dir,
                pcms.paths.theme_templates_dir
            ));
        }
        let missing = templates.missing_templates(&root);
        if !missing.is_empty() {
            return Err(anyhow!("Page templates not found: {}", missing.join(", ")));
        }

        let gate = AccessGate::new(CredentialStore::new(pcms.config.users.clone())?);

        Ok(Self {
            markdown: MarkdownRenderer::from_config(&pcms.config.markdown),
            static_files: StaticFiles::new(&pcms.paths.site_dir, &pcms.paths.theme_static_dir),
            config: pcms.config.clone(),
            root,
            templates,
            gate,
        })
    }

    pub fn renderer(&self) -> PageRenderer<'_> {
        PageRenderer {
            site: &self.config,
            templates: &self.templates,
            markdown: &self.markdown,
            root: &self.root,
        }
    }

    pub fn error_presenter(&self) -> ErrorPresenter<'_> {
        ErrorPresenter {
            site: &self.config,
            templates: &self.templates,
            root: &self.root,
        }
    }
}

/// Create the router serving `state`
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(page_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(pcms: &Pcms, registry: &HandlerRegistry, ip: &str, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(pcms, registry)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "Server listening on http://{}:{}{}",
        ip,
        port,
        pcms.config.webroot
    );
    axum::serve(listener, app).await?;

    Ok(())
}

/// Fallback handler running the page pipeline for every request
async fn page_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();
    match serve(&state, request).await {
        Ok(response) => response,
        Err(error) => state.error_presenter().present(&error, &path),
    }
}

async fn serve(state: &AppState, request: Request<Body>) -> Result<Response, PageError> {
    let route =
        normalize_route(request.uri().path(), &state.config.webroot).ok_or(PageError::NotFound)?;
    if is_descriptor_request(&route) {
        return Err(PageError::NotFound);
    }

    let Some(found) = find_page(&state.root, &route) else {
        return state.static_files.deliver(request, &route).await;
    };

    let credentials = Credentials::from_headers(request.headers());
    match state
        .gate
        .authorize(found.node, found.tail.as_deref(), credentials)
        .await
    {
        Access::Allow => {}
        Access::Forbidden(reason) => return Err(PageError::Unavailable(reason)),
        Access::Deny(reason) => return Err(PageError::Unauthorized(reason)),
    }

    if found.tail.is_some() {
        return state.static_files.deliver(request, &route).await;
    }

    match state.renderer().render(found.node, &route, request).await? {
        HandlerOutcome::Respond(response) => Ok(response),
        HandlerOutcome::Continue(request) => state.static_files.deliver(request, &route).await,
    }
}
