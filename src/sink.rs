//! Response sinks.
//!
//! A [`ResponseSink`] is where a response is written: a status line, a
//! mutable header map, and body bytes. Services write into one; middleware
//! may hand an inner service a decorated sink instead of the real one.

use std::io;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

/// The write side of an HTTP response.
pub trait ResponseSink: Send {
    /// Response headers, mutable until the response is sent.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Appends body bytes. A write before any status commits `200 OK`.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Sets the response status.
    fn write_status(&mut self, status: StatusCode);
}

/// Buffers a response in memory until it is handed to hyper.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, if any has been written yet.
    pub fn status(&self) -> Option<StatusCode> { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Converts the buffered response into a hyper response. A response
    /// nothing was written to is an empty `200 OK`.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for ResponseWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(data);
        Ok(data.len())
    }

    fn write_status(&mut self, status: StatusCode) {
        if let Some(committed) = self.status {
            tracing::warn!(%committed, ignored = %status, "superfluous write_status call");
            return;
        }
        self.status = Some(status);
    }
}
