//! Static file serving module
//!
//! [`FileServer`] resolves a request path below its root directory and
//! answers with the file, an `index.html`, a directory listing, or a
//! redirect that normalises trailing slashes. It is a plain [`Service`], so
//! the router mounts it behind the counting and prefix-stripping decorators.

use std::convert::Infallible;
use std::fmt::Write;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use html_escape::{encode_double_quoted_attribute, encode_text};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, IF_MODIFIED_SINCE, RANGE};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use tokio::fs;

use super::middleware::BoxFuture;
use crate::http::{self, cache, mime, path, RangeParseResult};
use crate::logger;

const INDEX_FILE: &str = "index.html";

/// The parts of a request the file server looks at
#[derive(Debug, Clone)]
struct FileRequest {
    /// Raw (percent-encoded) path, always starting with `/`
    path: String,
    query: Option<String>,
    if_modified_since: Option<String>,
    range: Option<String>,
}

impl FileRequest {
    fn from_request<B>(req: &Request<B>) -> Self {
        let header = |name: HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        Self {
            path: req.uri().path().to_string(),
            query: req.uri().query().map(ToString::to_string),
            if_modified_since: header(IF_MODIFIED_SINCE),
            range: header(RANGE),
        }
    }

    /// Redirect relative to the current URL, keeping the query string
    fn redirect(&self, target: &str) -> Response<Full<Bytes>> {
        match &self.query {
            Some(q) => http::build_redirect_response(&format!("{target}?{q}")),
            None => http::build_redirect_response(target),
        }
    }
}

/// Serves files below a root directory
#[derive(Debug, Clone)]
pub struct FileServer {
    root: Arc<PathBuf>,
}

impl FileServer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    async fn serve(&self, req: FileRequest) -> Response<Full<Bytes>> {
        if req.path.ends_with("/index.html") {
            return req.redirect("./");
        }

        let Some(decoded) = path::decode_path(&req.path) else {
            return http::build_text_response(StatusCode::BAD_REQUEST, "400 Bad Request\n");
        };
        let segments = path::clean_segments(&decoded);
        let file_path = segments
            .iter()
            .fold(self.root.to_path_buf(), |acc, s| acc.join(s));

        let metadata = match fs::metadata(&file_path).await {
            Ok(m) => m,
            Err(e) => return stat_error_response(&e, &file_path),
        };

        if !self.is_within_root(&file_path).await {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {} -> {}",
                req.path,
                file_path.display()
            ));
            return http::build_404_response();
        }

        let wants_dir = decoded.ends_with('/');
        let name = segments.last().copied().unwrap_or_default();

        if metadata.is_dir() {
            if !wants_dir {
                return req.redirect(&format!("{}/", path::encode_path(name)));
            }
            let index = file_path.join(INDEX_FILE);
            return match fs::metadata(&index).await {
                Ok(m) if m.is_file() => serve_file(&index, &m, &req).await,
                _ => list_directory(&file_path).await,
            };
        }

        if wants_dir {
            return req.redirect(&format!("../{}", path::encode_path(name)));
        }

        serve_file(&file_path, &metadata, &req).await
    }

    /// Symlinks may point anywhere; only serve what resolves inside the root
    async fn is_within_root(&self, file_path: &Path) -> bool {
        let (root, target) = tokio::join!(
            fs::canonicalize(self.root.as_path()),
            fs::canonicalize(file_path)
        );
        match (root, target) {
            (Ok(root), Ok(target)) => target.starts_with(root),
            _ => false,
        }
    }
}

impl<B> Service<Request<B>> for FileServer {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let file_req = FileRequest::from_request(&req);
        let server = self.clone();
        Box::pin(async move { Ok(server.serve(file_req).await) })
    }
}

/// Serve a regular file, honouring `If-Modified-Since` and `Range`
async fn serve_file(
    file_path: &Path,
    metadata: &Metadata,
    req: &FileRequest,
) -> Response<Full<Bytes>> {
    let modified = metadata.modified().ok();
    let last_modified = modified.map(cache::format_last_modified);

    if let (Some(modified), Some(header)) = (modified, last_modified.as_deref()) {
        if cache::is_not_modified(req.if_modified_since.as_deref(), modified) {
            return http::build_304_response(header);
        }
    }

    let content = match fs::read(file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {}",
                file_path.display(),
                e
            ));
            return http::build_500_response();
        }
    };

    let content_type = mime::content_type_for(file_path);
    let total = content.len() as u64;

    match http::parse_range_header(req.range.as_deref(), total) {
        RangeParseResult::Valid(range) => {
            let body = Bytes::from(content).slice(span(range.start)..=span(range.end));
            http::build_file_response(
                body,
                content_type,
                last_modified.as_deref(),
                Some((range.start, range.end, total)),
            )
        }
        RangeParseResult::NotSatisfiable => http::build_416_response(total),
        RangeParseResult::None => http::build_file_response(
            Bytes::from(content),
            content_type,
            last_modified.as_deref(),
            None,
        ),
    }
}

/// Range offsets come from a file already held in memory, so they fit in usize
fn span(offset: u64) -> usize {
    usize::try_from(offset).unwrap_or(usize::MAX)
}

/// Render an HTML index of a directory, entries sorted by name
async fn list_directory(dir: &Path) -> Response<Full<Bytes>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(e) => e,
        Err(e) => {
            if e.kind() == io::ErrorKind::PermissionDenied {
                return forbidden();
            }
            logger::log_error(&format!(
                "Failed to read directory '{}': {}",
                dir.display(),
                e
            ));
            return http::build_500_response();
        }
    };

    let mut names = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let mut name = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                    name.push('/');
                }
                names.push(name);
            }
            Ok(None) => break,
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to list directory '{}': {}",
                    dir.display(),
                    e
                ));
                return http::build_500_response();
            }
        }
    }
    names.sort();

    let mut html = String::from(
        "<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n",
    );
    for name in &names {
        let _ = writeln!(
            html,
            "<a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(&path::encode_path(name)),
            encode_text(name)
        );
    }
    html.push_str("</pre>\n");

    http::build_html_response(html)
}

/// Map a failed lookup to the response the client sees
///
/// Anything but a permission problem reads as "not there": a missing entry,
/// or a path that runs through a regular file.
fn stat_error_response(err: &io::Error, file_path: &Path) -> Response<Full<Bytes>> {
    match err.kind() {
        io::ErrorKind::PermissionDenied => forbidden(),
        io::ErrorKind::NotFound => http::build_404_response(),
        _ => {
            logger::log_warning(&format!(
                "Cannot stat '{}': {}",
                file_path.display(),
                err
            ));
            http::build_404_response()
        }
    }
}

fn forbidden() -> Response<Full<Bytes>> {
    http::build_text_response(StatusCode::FORBIDDEN, "403 Forbidden\n")
}
