//! Asset delivery for everything that is not a rendered page

use axum::body::Body;
use axum::http::{Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Path, PathBuf};
use tower_http::services::ServeDir;

use super::error::PageError;

/// Route prefix of the theme's static assets
const THEME_STATIC_PREFIX: &str = "/theme/static/";

/// Characters left unescaped when a decoded route is turned back into a URI path
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Serves files from the content directory and the theme's `static` directory
pub struct StaticFiles {
    site_dir: PathBuf,
    theme_static_dir: PathBuf,
}

impl StaticFiles {
    pub fn new(site_dir: &Path, theme_static_dir: &Path) -> Self {
        Self {
            site_dir: site_dir.to_path_buf(),
            theme_static_dir: theme_static_dir.to_path_buf(),
        }
    }

    /// Deliver the file addressed by `route`, a normalised route relative to the webroot
    pub async fn deliver(&self, request: Request<Body>, route: &str) -> Result<Response, PageError> {
        let (dir, path) = match route.strip_prefix(THEME_STATIC_PREFIX) {
            Some(rest) => (&self.theme_static_dir, rest),
            None => (&self.site_dir, route),
        };

        let uri: Uri = encode_path(path).parse().map_err(|_| PageError::NotFound)?;
        let (mut parts, body) = request.into_parts();
        parts.uri = uri;
        let request = Request::from_parts(parts, body);

        let mut service = ServeDir::new(dir).append_index_html_on_directories(false);
        let response = service.try_call(request).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PageError::NotFound);
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(PageError::Status {
                status,
                message: status.canonical_reason().unwrap_or("Request failed").to_string(),
            });
        }
        Ok(response.into_response())
    }
}

/// Percent-encode each segment of a decoded route
fn encode_path(route: &str) -> String {
    let encoded: Vec<String> = route
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| utf8_percent_encode(s, SEGMENT).to_string())
        .collect();
    format!("/{}", encoded.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_deliver_site_and_theme_files() {
        let site = TempDir::new().unwrap();
        let theme = TempDir::new().unwrap();
        fs::create_dir_all(site.path().join("about")).unwrap();
        fs::write(site.path().join("about/logo.txt"), "logo").unwrap();
        fs::write(theme.path().join("style.css"), "body{}").unwrap();
        let files = StaticFiles::new(site.path(), theme.path());

        let response = files
            .deliver(get("/x"), "/about/logo.txt")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = files
            .deliver(get("/x"), "/theme/static/style.css")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("/about/my logo.png"), "/about/my%20logo.png");
        assert_eq!(encode_path("/a%2e/b"), "/a%252e/b");
        assert_eq!(encode_path("/"), "/");
    }

    #[tokio::test]
    async fn test_decoded_names_are_delivered() {
        let site = TempDir::new().unwrap();
        fs::write(site.path().join("my notes.txt"), "notes").unwrap();
        let files = StaticFiles::new(site.path(), site.path());

        let response = files.deliver(get("/x"), "/my notes.txt").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_other_methods_are_errors() {
        let site = TempDir::new().unwrap();
        fs::write(site.path().join("logo.txt"), "logo").unwrap();
        let files = StaticFiles::new(site.path(), site.path());

        let request = Request::builder()
            .method("POST")
            .uri("/x")
            .body(Body::empty())
            .unwrap();
        match files.deliver(request, "/logo.txt").await {
            Err(PageError::Status { status, message }) => {
                assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
                assert_eq!(message, "Method Not Allowed");
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.status())),
        }
    }

    #[tokio::test]
    async fn test_missing_file_and_directory_are_not_found() {
        let site = TempDir::new().unwrap();
        fs::create_dir_all(site.path().join("about")).unwrap();
        fs::write(site.path().join("about/index.html"), "x").unwrap();
        let files = StaticFiles::new(site.path(), site.path());

        assert!(matches!(
            files.deliver(get("/x"), "/missing.png").await,
            Err(PageError::NotFound)
        ));
        assert!(matches!(
            files.deliver(get("/x"), "/about").await,
            Err(PageError::NotFound)
        ));
    }
}
