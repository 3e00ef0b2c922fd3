//! Trace-correlated logging.
//!
//! [`log_with_trace`] (and the [`log_with_trace!`](crate::log_with_trace)
//! macro) prefix every line with the request's trace and parent id:
//!
//! ```text
//! [T:4bf92f3577b34da6a3ce929d0e0e4736] [P:00f067aa0ba902b7] user 42 loaded
//! ```
//!
//! The ids are parsed from the request's `traceparent` header on the first
//! call and cached against the request's identity for the rest of the
//! request. The [trace middleware](crate::middleware::trace) drops the entry
//! once the handler returns.

use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::cache::{Identity, IdentityCache};
use crate::request::Request;
use crate::traceparent::{HEADER, TraceContext};

static CONTEXTS: LazyLock<IdentityCache<Arc<TraceContext>>> = LazyLock::new(IdentityCache::new);

/// The trace context of `req`, parsed on first access.
///
/// A missing or malformed header yields the `ERR`/`ERR` placeholder.
pub fn trace_context(req: &Request) -> Arc<TraceContext> {
    CONTEXTS.get_or_compute(req, |req| {
        Arc::new(TraceContext::from_header(req.headers().get(HEADER)))
    })
}

/// Emits one info-level line for `req`, prefixed with its trace ids.
pub fn log_with_trace(req: &Request, args: fmt::Arguments<'_>) {
    let ctx = trace_context(req);
    tracing::info!("[T:{}] [P:{}] {}", ctx.trace_id(), ctx.parent_id(), args);
}

/// `[T:<trace id>] [P:<parent id>] <message>`
pub fn format_line(ctx: &TraceContext, args: fmt::Arguments<'_>) -> String {
    format!("[T:{}] [P:{}] {}", ctx.trace_id(), ctx.parent_id(), args)
}

/// Drops the cached context for `obj`'s identity.
pub(crate) fn forget<K: Identity + ?Sized>(obj: &K) {
    CONTEXTS.delete(obj);
}

#[cfg(test)]
pub(crate) fn is_cached<K: Identity + ?Sized>(obj: &K) -> bool {
    CONTEXTS.contains(obj)
}

/// Logs a formatted message for a request, prefixed with its trace ids.
///
/// ```rust,no_run
/// # use tsu_trace::{Request, Response, log_with_trace};
/// async fn get_user(req: Request) -> Response {
///     let id = req.param("id").unwrap_or("unknown");
///     log_with_trace!(req, "loading user {}", id);
///     Response::text("ok")
/// }
/// ```
#[macro_export]
macro_rules! log_with_trace {
    ($req:expr, $($arg:tt)+) => {
        $crate::log::log_with_trace(&$req, ::std::format_args!($($arg)+))
    };
}
