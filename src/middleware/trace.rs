//! Trace-context middleware.

use std::sync::Arc;

use http::HeaderValue;
use tracing::Level;

use crate::handler::{ServeFuture, Service};
use crate::log::{self, trace_context};
use crate::middleware::capture::CaptureSink;
use crate::middleware::dump;
use crate::request::Request;
use crate::sink::ResponseSink;
use crate::traceparent::{self, HEADER, IdSource, RandomIds};

/// Target whose `TRACE` level switches on [`Dump::Verbose`] transcripts,
/// e.g. `RUST_LOG=info,tsu_trace::dump=trace`.
pub const DUMP_TARGET: &str = "tsu_trace::dump";

/// When to log full request/response transcripts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dump {
    Never,
    /// Only while [`DUMP_TARGET`] is enabled at `TRACE` level.
    #[default]
    Verbose,
    Always,
}

impl Dump {
    fn enabled(self) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::Verbose => tracing::enabled!(target: DUMP_TARGET, Level::TRACE),
        }
    }
}

/// Wraps `inner` in the trace middleware with default settings.
pub fn trace<S: Service>(inner: S) -> Trace<S> {
    Trace::new(inner)
}

/// Establishes a `traceparent` for every request that passes through.
///
/// Per request:
///
/// 1. A request without a `traceparent` header (or with an empty one) gets a
///    freshly generated value written onto its headers, so handlers and
///    [`log_with_trace!`](crate::log_with_trace) see the same ids.
/// 2. When dumping is on, the request is logged and the sink is wrapped in a
///    [`CaptureSink`].
/// 3. The inner service runs.
/// 4. When dumping is on, the captured response is logged.
/// 5. The request's cached trace context is dropped.
///
/// Tracing never fails a request: an id source error leaves the request
/// untraced, and a body that cannot be read is noted in the transcript.
pub struct Trace<S> {
    inner: S,
    dump: Dump,
    ids: Arc<dyn IdSource>,
}

impl<S: Service> Trace<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, dump: Dump::default(), ids: Arc::new(RandomIds) }
    }

    pub fn dump(mut self, dump: Dump) -> Self {
        self.dump = dump;
        self
    }

    /// Source of fresh trace and parent ids.
    pub fn id_source(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    fn ensure_header(&self, req: &mut Request) {
        if req.headers().get(HEADER).is_some_and(|v| !v.is_empty()) {
            return;
        }

        let generated = traceparent::generate_with(self.ids.as_ref());
        if generated.is_empty() {
            return;
        }
        match HeaderValue::try_from(generated) {
            Ok(value) => { req.headers_mut().insert(HEADER, value); }
            Err(e) => tracing::warn!("generated traceparent is not a header value: {e}"),
        }
    }
}

impl<S: Service> Service for Trace<S> {
    fn serve<'a>(&'a self, mut req: Request, sink: &'a mut dyn ResponseSink) -> ServeFuture<'a> {
        Box::pin(async move {
            self.ensure_header(&mut req);
            let scope = req.scope().clone();

            if self.dump.enabled() {
                let ctx = trace_context(&req);
                dump::request(&ctx, &mut req).await;

                let mut capture = CaptureSink::new(sink);
                self.inner.serve(req, &mut capture).await;
                dump::response(&ctx, &scope, &capture);
            } else {
                self.inner.serve(req, sink).await;
            }

            log::forget(&scope);
        })
    }
}
