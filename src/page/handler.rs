//! Page-local capabilities: preprocessors and request handlers.
//!
//! A descriptor refers to these by name (`"preprocessor": "list.js"`, or an
//! index file ending in `.js`). Names are resolved once while the tree is
//! built, against a [`HandlerRegistry`] filled in by the embedding program.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::PageNode;

/// Extra template context, merged over the base render context
pub type ContextMap = serde_json::Map<String, serde_json::Value>;

/// Produces additional render context for a page before it is templated
#[async_trait]
pub trait Preprocessor: Send + Sync {
    async fn process(&self, page: &PageNode, root: &PageNode) -> anyhow::Result<ContextMap>;
}

/// What a [`PageHandler`] decided to do with a request
pub enum HandlerOutcome {
    /// The handler produced the response
    Respond(Response),
    /// Hand the request on to asset delivery
    Continue(Request<Body>),
}

/// Serves a page directly, bypassing templating
#[async_trait]
pub trait PageHandler: Send + Sync {
    async fn handle(
        &self,
        request: Request<Body>,
        context: tera::Context,
    ) -> anyhow::Result<HandlerOutcome>;
}

/// Named preprocessors and handlers available to descriptors.
///
/// Lookups try the content-relative path first (`blog/list.js`), then the
/// bare declared name (`list.js`), so one registration can serve many pages.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    preprocessors: HashMap<String, Arc<dyn Preprocessor>>,
    handlers: HashMap<String, Arc<dyn PageHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a preprocessor under `name`
    pub fn with_preprocessor<P>(mut self, name: &str, preprocessor: P) -> Self
    where
        P: Preprocessor + 'static,
    {
        self.preprocessors
            .insert(name.to_string(), Arc::new(preprocessor));
        self
    }

    /// Register a page handler under `name`
    pub fn with_handler<H>(mut self, name: &str, handler: H) -> Self
    where
        H: PageHandler + 'static,
    {
        self.handlers.insert(name.to_string(), Arc::new(handler));
        self
    }

    pub fn preprocessor(&self, relative_path: &str, name: &str) -> Option<Arc<dyn Preprocessor>> {
        self.preprocessors
            .get(relative_path)
            .or_else(|| self.preprocessors.get(name))
            .cloned()
    }

    pub fn handler(&self, relative_path: &str, name: &str) -> Option<Arc<dyn PageHandler>> {
        self.handlers
            .get(relative_path)
            .or_else(|| self.handlers.get(name))
            .cloned()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("preprocessors", &self.preprocessors.keys().collect::<Vec<_>>())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
