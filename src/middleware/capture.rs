//! Response capture.

use std::io;

use bytes::BytesMut;
use http::{HeaderMap, StatusCode};

use crate::sink::ResponseSink;

/// A [`ResponseSink`] decorator that remembers what was written.
///
/// Every call is forwarded to the wrapped sink unchanged; the status and a
/// copy of the body bytes are kept for inspection after the handler returns.
pub struct CaptureSink<'a> {
    inner: &'a mut dyn ResponseSink,
    status: Option<StatusCode>,
    body: BytesMut,
}

impl<'a> CaptureSink<'a> {
    pub fn new(inner: &'a mut dyn ResponseSink) -> Self {
        Self { inner, status: None, body: BytesMut::new() }
    }

    /// First status written, or `200 OK` if the body was written first.
    pub fn status(&self) -> Option<StatusCode> { self.status }

    /// Every byte written so far.
    pub fn body(&self) -> &[u8] { &self.body }
}

impl ResponseSink for CaptureSink<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.status.get_or_insert(StatusCode::OK);
        let written = self.inner.write(data);
        self.body.extend_from_slice(data);
        written
    }

    fn write_status(&mut self, status: StatusCode) {
        self.inner.write_status(status);
        self.status.get_or_insert(status);
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;
    use crate::sink::ResponseWriter;

    #[test]
    fn body_without_status_records_ok() {
        let mut writer = ResponseWriter::new();
        let mut capture = CaptureSink::new(&mut writer);

        assert_eq!(capture.write(b"OK").unwrap(), 2);
        assert_eq!(capture.status(), Some(StatusCode::OK));
        assert_eq!(capture.body(), b"OK");

        drop(capture);
        assert_eq!(writer.status(), Some(StatusCode::OK));
        assert_eq!(writer.body(), b"OK");
    }

    #[test]
    fn explicit_status_and_chunks_are_forwarded() {
        let mut writer = ResponseWriter::new();
        let mut capture = CaptureSink::new(&mut writer);

        capture.write_status(StatusCode::NOT_FOUND);
        capture.write(b"not ").unwrap();
        capture.write(b"here").unwrap();

        assert_eq!(capture.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(capture.body(), b"not here");

        drop(capture);
        assert_eq!(writer.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(writer.body(), b"not here");
    }

    #[test]
    fn headers_go_to_the_wrapped_sink() {
        let mut writer = ResponseWriter::new();
        let mut capture = CaptureSink::new(&mut writer);

        capture.headers_mut().insert("x-served-by", HeaderValue::from_static("edge-1"));
        drop(capture);

        assert_eq!(writer.headers()["x-served-by"], "edge-1");
    }

    #[test]
    fn nothing_written_records_nothing() {
        let mut writer = ResponseWriter::new();
        let capture = CaptureSink::new(&mut writer);
        assert_eq!(capture.status(), None);
        assert!(capture.body().is_empty());
    }
}
