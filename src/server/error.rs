//! Request errors and the error page

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use super::render::BaseContext;
use crate::config::SiteConfig;
use crate::page::PageNode;
use crate::templates::{TemplateRenderer, ERROR_TEMPLATE};

/// Anything that stops a request from being answered with its page
#[derive(Error, Debug)]
pub enum PageError {
    #[error("Page not found")]
    NotFound,

    /// Disabled page or prevented sub-path; presented exactly like `NotFound`
    #[error("Page not available: {0}")]
    Unavailable(String),

    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON content: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Markdown conversion failed: {0}")]
    Markdown(#[source] anyhow::Error),

    #[error("Preprocessor failed: {0}")]
    Preprocessor(#[source] anyhow::Error),

    #[error("Request handler failed: {0}")]
    Handler(#[source] anyhow::Error),

    #[error("Page {0} does not define a request handler")]
    HandlerNotCallable(String),

    #[error("{message}")]
    Status { status: StatusCode, message: String },
}

impl PageError {
    /// HTTP status presented for this error
    pub fn status(&self) -> StatusCode {
        match self {
            PageError::NotFound | PageError::Unavailable(_) => StatusCode::NOT_FOUND,
            PageError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PageError::Status { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Not-found conditions all read the same.
    pub fn public_message(&self) -> String {
        match self.status() {
            StatusCode::NOT_FOUND => "Page not found".to_string(),
            StatusCode::UNAUTHORIZED => "Access denied".to_string(),
            _ => self.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorInfo {
    message: String,
    status_code: u16,
}

/// Renders any [`PageError`] through the `error.html` template
pub struct ErrorPresenter<'a> {
    pub site: &'a SiteConfig,
    pub templates: &'a TemplateRenderer,
    pub root: &'a PageNode,
}

impl ErrorPresenter<'_> {
    pub fn present(&self, error: &PageError, request_path: &str) -> Response {
        let status = error.status();
        if status.is_server_error() {
            tracing::error!("{} {}: {}", status.as_u16(), request_path, error_chain(error));
        } else {
            tracing::debug!("{} {}: {}", status.as_u16(), request_path, error);
        }

        let info = ErrorInfo {
            message: error.public_message(),
            status_code: status.as_u16(),
        };
        let mut response = match self.render(&info, request_path) {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                tracing::error!(
                    "Error template {} cannot be rendered: {}",
                    ERROR_TEMPLATE,
                    error_chain(&e)
                );
                (status, format!("{} {}\n", status.as_u16(), info.message)).into_response()
            }
        };

        if status == StatusCode::UNAUTHORIZED {
            let challenge = format!(r#"Basic realm="{}", charset="UTF-8""#, self.site.title);
            let value = HeaderValue::from_str(&challenge)
                .unwrap_or_else(|_| HeaderValue::from_static(r#"Basic realm="pcms""#));
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }

    fn render(&self, info: &ErrorInfo, request_path: &str) -> tera::Result<String> {
        let mut context = BaseContext {
            site: self.site,
            base: &self.site.webroot,
            route: request_path,
            full_route: request_path,
            page: None,
            root_page: self.root,
            now: chrono::Local::now(),
        }
        .into_context()?;
        context.insert("error", info);
        context.insert("statusCode", &info.status_code);
        self.templates.render(ERROR_TEMPLATE, &context)
    }
}

/// An error's message followed by the messages of its sources
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PageError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            PageError::Unavailable("disabled".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PageError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            PageError::HandlerNotCallable("/api".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            PageError::Status {
                status: StatusCode::IM_A_TEAPOT,
                message: "tea".into()
            }
            .status(),
            StatusCode::IM_A_TEAPOT
        );
    }

    #[test]
    fn test_error_chain() {
        let error = PageError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(error_chain(&error), "IO error: disk: disk");
    }

    #[test]
    fn test_not_found_conditions_read_the_same() {
        assert_eq!(PageError::NotFound.public_message(), "Page not found");
        assert_eq!(
            PageError::Unavailable("page /x is disabled".into()).public_message(),
            "Page not found"
        );
    }
}
