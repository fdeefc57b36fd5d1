//! Handler decorators
//!
//! Each decorator wraps an inner [`Service`] and is itself a `Service`, so
//! they nest: `CountHits::new(hits, StripPrefix::new("/app/", files))`.

use std::convert::Infallible;
use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode, Uri};

use crate::counter::HitCounter;
use crate::http;
use crate::logger;

/// A boxed, sendable response future
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Counts every request before handing it to the inner service
#[derive(Debug, Clone)]
pub struct CountHits<S> {
    hits: Arc<HitCounter>,
    inner: S,
}

impl<S> CountHits<S> {
    pub const fn new(hits: Arc<HitCounter>, inner: S) -> Self {
        Self { hits, inner }
    }
}

impl<S, R> Service<R> for CountHits<S>
where
    S: Service<R>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn call(&self, req: R) -> Self::Future {
        self.hits.increment();
        self.inner.call(req)
    }
}

/// Removes a fixed prefix from the request path before delegating
///
/// Requests outside the prefix get a 404 without reaching the inner service.
/// The stripped path keeps a leading `/` and the original query string.
#[derive(Debug, Clone)]
pub struct StripPrefix<S> {
    prefix: &'static str,
    inner: S,
}

impl<S> StripPrefix<S> {
    pub const fn new(prefix: &'static str, inner: S) -> Self {
        Self { prefix, inner }
    }
}

impl<S, B> Service<Request<B>> for StripPrefix<S>
where
    S: Service<Request<B>, Response = Response<Full<Bytes>>, Error = Infallible>,
    S::Future: Send + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn call(&self, mut req: Request<B>) -> Self::Future {
        let Some(rest) = req.uri().path().strip_prefix(self.prefix) else {
            return Box::pin(future::ready(Ok(http::build_404_response())));
        };

        let rest = rest.trim_start_matches('/');
        let stripped = match req.uri().query() {
            Some(q) => format!("/{rest}?{q}"),
            None => format!("/{rest}"),
        };

        match stripped.parse::<Uri>() {
            Ok(uri) => *req.uri_mut() = uri,
            Err(e) => {
                logger::log_warning(&format!("Cannot rewrite path '{stripped}': {e}"));
                return Box::pin(future::ready(Ok(http::build_text_response(
                    StatusCode::BAD_REQUEST,
                    "400 Bad Request\n",
                ))));
            }
        }

        Box::pin(self.inner.call(req))
    }
}
