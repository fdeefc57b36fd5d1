//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: matches method and path, runs the
//! handler, and writes the access log line.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH, REFERER, USER_AGENT};
use hyper::service::Service;
use hyper::{Method, Request, Response, Version};

use super::chirp::handle_validate_chirp;
use super::health::handle_healthz;
use super::metrics::{handle_metrics, handle_reset};
use super::middleware::{CountHits, StripPrefix};
use super::static_files::FileServer;
use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};

/// Mount point of the file server
pub const APP_PREFIX: &str = "/app/";

/// Registered endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    App,
    AppRedirect,
    Metrics,
    Reset,
    ValidateChirp,
    Healthz,
}

impl Route {
    fn match_path(path: &str) -> Option<Self> {
        match path {
            "/app" => Some(Self::AppRedirect),
            "/metrics" => Some(Self::Metrics),
            "/reset" => Some(Self::Reset),
            "/validate_chirp" => Some(Self::ValidateChirp),
            "/healthz" => Some(Self::Healthz),
            p if p.starts_with(APP_PREFIX) => Some(Self::App),
            _ => None,
        }
    }

    /// Value of the `Allow` header for this route
    const fn allow(self) -> &'static str {
        match self {
            Self::Reset | Self::ValidateChirp => "POST",
            Self::App | Self::AppRedirect | Self::Metrics | Self::Healthz => "GET, HEAD",
        }
    }

    fn accepts(self, method: &Method) -> bool {
        match self.allow() {
            "POST" => method == Method::POST,
            _ => method == Method::GET || method == Method::HEAD,
        }
    }
}

/// Dispatches requests to the endpoint handlers
pub struct Router {
    state: Arc<AppState>,
    files: CountHits<StripPrefix<FileServer>>,
}

impl Router {
    pub fn new(state: Arc<AppState>) -> Self {
        let files = CountHits::new(
            Arc::clone(&state.hits),
            StripPrefix::new(APP_PREFIX, FileServer::new(state.file_root())),
        );
        Self { state, files }
    }

    /// Main entry point for HTTP request handling
    pub async fn handle<B>(
        &self,
        req: Request<B>,
        remote_addr: Option<SocketAddr>,
    ) -> Result<Response<Full<Bytes>>, Infallible>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let started = Instant::now();
        let is_head = req.method() == Method::HEAD;
        let entry = self
            .state
            .access_log()
            .then(|| start_access_entry(&req, remote_addr));

        let mut response = self.route(req).await;
        if is_head {
            strip_body(&mut response);
        }

        if let Some(mut entry) = entry {
            entry.status = response.status().as_u16();
            entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
            entry.request_time_us =
                u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            logger::log_access(&entry, &self.state.config.logging.access_log_format);
        }

        Ok(response)
    }

    async fn route<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let cleaned = http::path::clean_path(req.uri().path());
        if req.method() != Method::CONNECT && cleaned != req.uri().path() {
            return match req.uri().query() {
                Some(q) => http::build_redirect_response(&format!("{cleaned}?{q}")),
                None => http::build_redirect_response(&cleaned),
            };
        }

        let Some(route) = Route::match_path(req.uri().path()) else {
            return http::build_404_response();
        };

        if !route.accepts(req.method()) {
            return http::build_405_response(route.allow());
        }

        match route {
            Route::App => self
                .files
                .call(req)
                .await
                .unwrap_or_else(|never| match never {}),
            Route::AppRedirect => match req.uri().query() {
                Some(q) => http::build_redirect_response(&format!("{APP_PREFIX}?{q}")),
                None => http::build_redirect_response(APP_PREFIX),
            },
            Route::Metrics => handle_metrics(&self.state.hits),
            Route::Reset => handle_reset(&self.state.hits),
            Route::ValidateChirp => {
                handle_validate_chirp(req.into_body(), self.state.config.http.max_body_size).await
            }
            Route::Healthz => handle_healthz(),
        }
    }
}

/// HEAD gets the GET headers, including the length, and no body
fn strip_body(response: &mut Response<Full<Bytes>>) {
    if let Some(len) = response.body().size_hint().exact() {
        response
            .headers_mut()
            .entry(CONTENT_LENGTH)
            .or_insert_with(|| HeaderValue::from(len));
    }
    *response.body_mut() = Full::new(Bytes::new());
}

fn start_access_entry<B>(req: &Request<B>, remote_addr: Option<SocketAddr>) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        remote_addr.map_or_else(|| "-".to_string(), |a| a.ip().to_string()),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use hyper::header::{ALLOW, CONTENT_TYPE, LOCATION};
    use hyper::StatusCode;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_router(root: &Path) -> (Router, Arc<AppState>) {
        let mut config = Config::load_from("chirpy-test-no-such-config").unwrap();
        config.files.root = root.display().to_string();
        config.logging.access_log = false;
        let state = Arc::new(AppState::new(config));
        (Router::new(Arc::clone(&state)), state)
    }

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Chirpy</h1>").unwrap();
        std::fs::write(dir.path().join("logo.png"), [1, 2, 3]).unwrap();
        dir
    }

    async fn send(router: &Router, method: Method, path: &str, body: &str) -> Response<Full<Bytes>> {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap();
        router.handle(req, None).await.unwrap()
    }

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let dir = site();
        let (router, _) = test_router(dir.path());

        let resp = send(&router, Method::GET, "/healthz", "").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(body_string(resp).await, "OK");
    }

    #[tokio::test]
    async fn test_metrics_after_file_requests() {
        let dir = site();
        let (router, state) = test_router(dir.path());

        let resp = send(&router, Method::GET, "/app/", "").await;
        assert_eq!(body_string(resp).await, "<h1>Chirpy</h1>");
        send(&router, Method::GET, "/app/logo.png", "").await;
        let resp = send(&router, Method::GET, "/app/missing.css", "").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        assert_eq!(state.hits.load(), 3);
        let resp = send(&router, Method::GET, "/metrics", "").await;
        assert_eq!(body_string(resp).await, "Hits: 3");
    }

    #[tokio::test]
    async fn test_non_file_routes_do_not_count() {
        let dir = site();
        let (router, state) = test_router(dir.path());

        send(&router, Method::GET, "/healthz", "").await;
        send(&router, Method::GET, "/metrics", "").await;
        send(&router, Method::POST, "/validate_chirp", r#"{"body":"hi"}"#).await;
        send(&router, Method::GET, "/nowhere", "").await;
        send(&router, Method::POST, "/app/logo.png", "").await;

        assert_eq!(state.hits.load(), 0);
    }

    #[tokio::test]
    async fn test_reset() {
        let dir = site();
        let (router, state) = test_router(dir.path());

        send(&router, Method::GET, "/app/logo.png", "").await;
        send(&router, Method::GET, "/app/logo.png", "").await;
        assert_eq!(state.hits.load(), 2);

        let resp = send(&router, Method::POST, "/reset", "").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "Hits reset to 0");

        let resp = send(&router, Method::GET, "/metrics", "").await;
        assert_eq!(body_string(resp).await, "Hits: 0");
    }

    #[tokio::test]
    async fn test_validate_chirp_scenarios() {
        let dir = site();
        let (router, _) = test_router(dir.path());

        let resp = send(&router, Method::POST, "/validate_chirp", r#"{"body":"hello"}"#).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "{\"valid\":true}\n");

        let long = format!(r#"{{"body":"{}"}}"#, "a".repeat(141));
        let resp = send(&router, Method::POST, "/validate_chirp", &long).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(resp).await, "{\"error\":\"Chirp is too long\"}\n");

        let exact = format!(r#"{{"body":"{}"}}"#, "a".repeat(140));
        let resp = send(&router, Method::POST, "/validate_chirp", &exact).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "{\"valid\":true}\n");

        let resp = send(&router, Method::POST, "/validate_chirp", "not json").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(resp).await, "{\"error\":\"Invalid request body\"}\n");
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let dir = site();
        let (router, _) = test_router(dir.path());

        let resp = send(&router, Method::POST, "/metrics", "").await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()[ALLOW], "GET, HEAD");

        let resp = send(&router, Method::GET, "/reset", "").await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()[ALLOW], "POST");

        let resp = send(&router, Method::GET, "/validate_chirp", "").await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let dir = site();
        let (router, _) = test_router(dir.path());

        let resp = send(&router, Method::GET, "/index.html", "").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(resp).await, "404 page not found\n");
    }

    #[tokio::test]
    async fn test_app_without_slash_redirects() {
        let dir = site();
        let (router, state) = test_router(dir.path());

        let resp = send(&router, Method::GET, "/app", "").await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[LOCATION], "/app/");
        assert_eq!(state.hits.load(), 0);
    }

    #[tokio::test]
    async fn test_head_keeps_length_drops_body() {
        let dir = site();
        let (router, _) = test_router(dir.path());

        let resp = send(&router, Method::HEAD, "/healthz", "").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_LENGTH], "2");
        assert_eq!(body_string(resp).await, "");

        let resp = send(&router, Method::HEAD, "/app/logo.png", "").await;
        assert_eq!(resp.headers()[CONTENT_LENGTH], "3");
        assert_eq!(body_string(resp).await, "");
    }

    #[tokio::test]
    async fn test_unclean_paths_redirect_to_canonical() {
        let dir = site();
        let (router, state) = test_router(dir.path());

        let resp = send(&router, Method::GET, "/app/../healthz", "").await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[LOCATION], "/healthz");

        let resp = send(&router, Method::GET, "/app//logo.png?v=1", "").await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[LOCATION], "/app/logo.png?v=1");

        let resp = send(&router, Method::POST, "/./validate_chirp", "").await;
        assert_eq!(resp.headers()[LOCATION], "/validate_chirp");

        assert_eq!(state.hits.load(), 0);
    }

    #[test]
    fn test_route_matching() {
        assert_eq!(Route::match_path("/app/"), Some(Route::App));
        assert_eq!(Route::match_path("/app/a/b.css"), Some(Route::App));
        assert_eq!(Route::match_path("/app"), Some(Route::AppRedirect));
        assert_eq!(Route::match_path("/apple"), None);
        assert_eq!(Route::match_path("/metrics/"), None);
        assert!(Route::Healthz.accepts(&Method::HEAD));
        assert!(!Route::Reset.accepts(&Method::GET));
    }
}
