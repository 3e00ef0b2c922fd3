//! Incoming HTTP request type.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri, Version};
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;

use crate::cache::Identity;
use crate::error::{BoxError, Error};

/// An incoming HTTP request.
///
/// The body arrives as a stream and is buffered the first time it is read;
/// after that, [`Request::body`] hands out cheap clones of the same bytes.
pub struct Request {
    pub(crate) head: Parts,
    pub(crate) body: Body,
    pub(crate) params: HashMap<String, String>,
    pub(crate) scope: RequestScope,
}

pub(crate) enum Body {
    Buffered(Bytes),
    Streaming(UnsyncBoxBody<Bytes, BoxError>),
}

impl Request {
    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn path(&self) -> &str { self.head.uri.path() }
    pub fn version(&self) -> Version { self.head.version }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.head.headers }

    /// Header lookup; `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The handle identifying this request for as long as it is in flight.
    pub fn scope(&self) -> &RequestScope { &self.scope }

    /// Reads the whole body.
    ///
    /// The first call drains the stream; later calls return the buffered
    /// bytes. If draining fails the body is left empty.
    pub async fn body(&mut self) -> Result<Bytes, Error> {
        let stream = match std::mem::replace(&mut self.body, Body::Buffered(Bytes::new())) {
            Body::Buffered(bytes) => {
                self.body = Body::Buffered(bytes.clone());
                return Ok(bytes);
            }
            Body::Streaming(stream) => stream,
        };

        let bytes = stream.collect().await.map_err(Error::Body)?.to_bytes();
        self.body = Body::Buffered(bytes.clone());
        Ok(bytes)
    }
}

impl<B> From<http::Request<B>> for Request
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn from(req: http::Request<B>) -> Self {
        let (head, body) = req.into_parts();
        Self {
            head,
            body: Body::Streaming(body.map_err(Into::<BoxError>::into).boxed_unsync()),
            params: HashMap::new(),
            scope: RequestScope::new(),
        }
    }
}

impl Identity for Request {
    fn identity(&self) -> Option<usize> {
        self.scope.identity()
    }
}

// ── RequestScope ──────────────────────────────────────────────────────────────

/// Shared handle to a request's lifetime.
///
/// Every request owns one heap allocation; its address is the request's
/// identity for per-request caches, and stays put however often the
/// [`Request`] itself is moved. Cloning the handle keeps the address
/// reserved, so it cannot be handed to another request while any clone is
/// alive.
#[derive(Clone, Debug)]
pub struct RequestScope(Arc<ScopeInner>);

#[derive(Debug)]
struct ScopeInner {
    received: Instant,
}

impl RequestScope {
    pub(crate) fn new() -> Self {
        Self(Arc::new(ScopeInner { received: Instant::now() }))
    }

    /// Time since the request was received.
    pub fn elapsed(&self) -> Duration {
        self.0.received.elapsed()
    }
}

impl Identity for RequestScope {
    fn identity(&self) -> Option<usize> {
        self.0.identity()
    }
}

impl Identity for ScopeInner {
    fn identity(&self) -> Option<usize> {
        Some(self as *const Self as usize)
    }
}

impl Drop for ScopeInner {
    // Last handle gone: the address may be reused, so no entry may outlive it.
    fn drop(&mut self) {
        crate::log::forget(&*self);
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::{Empty, Full};

    use super::*;
    use crate::test_util::FailingBody;

    #[tokio::test]
    async fn body_is_buffered_once() {
        let mut req: Request = http::Request::post("/upload")
            .body(Full::new(Bytes::from_static(b"TEST")))
            .unwrap()
            .into();

        assert_eq!(req.body().await.unwrap(), "TEST");
        assert_eq!(req.body().await.unwrap(), "TEST");
    }

    #[tokio::test]
    async fn empty_body() {
        let mut req: Request = http::Request::get("/").body(Empty::<Bytes>::new()).unwrap().into();
        assert!(req.body().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_body_surfaces_error_then_reads_empty() {
        let mut req: Request = http::Request::post("/").body(FailingBody).unwrap().into();
        let err = req.body().await.unwrap_err();
        assert!(err.to_string().contains("peer went away"));
        assert!(req.body().await.unwrap().is_empty());
    }

    #[test]
    fn accessors() {
        let req: Request = http::Request::get("/users/42?full=1")
            .header("x-thing", "yes")
            .body(Empty::<Bytes>::new())
            .unwrap()
            .into();

        assert_eq!(*req.method(), Method::GET);
        assert_eq!(req.path(), "/users/42");
        assert_eq!(req.uri().query(), Some("full=1"));
        assert_eq!(req.header("X-Thing"), Some("yes"));
        assert_eq!(req.param("id"), None);
    }

    #[test]
    fn identity_survives_moves_and_differs_between_requests() {
        let a: Request = http::Request::get("/").body(Empty::<Bytes>::new()).unwrap().into();
        let b: Request = http::Request::get("/").body(Empty::<Bytes>::new()).unwrap().into();

        let id = a.identity();
        let scope = a.scope().clone();
        let moved = Box::new(a);

        assert!(id.is_some());
        assert_eq!((*moved).identity(), id);
        assert_eq!(scope.identity(), id);
        assert_ne!(b.identity(), id);
    }
}
