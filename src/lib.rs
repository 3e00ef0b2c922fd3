//! # tsu-trace
//!
//! W3C trace-context propagation and trace-correlated logging for tsu HTTP
//! services.
//!
//! Every request that passes through [`middleware::trace`] carries a
//! `traceparent` header by the time your handler runs: the caller's, if it
//! sent one, or a freshly generated one otherwise. Anything the handler logs
//! through [`log_with_trace!`] is prefixed with the request's trace and
//! parent id, so one grep follows a request through every service it touched:
//!
//! ```text
//! [T:0af7651916cd43dd8448eb211c80319c] [P:b7ad6b7169203331] loading user 42
//! ```
//!
//! With `RUST_LOG=info,tsu_trace::dump=trace` (or [`Dump::Always`](middleware::Dump))
//! the middleware also logs a full transcript of each request and response,
//! bodies included as hex dumps.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tsu_trace::{Request, Response, Router, Server, log_with_trace, middleware};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new().get("/users/{id}", get_user);
//!
//!     Server::bind("0.0.0.0:3000")
//!         .serve(middleware::trace(app))
//!         .await
//!         .unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     log_with_trace!(req, "loading user {}", id);
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//! ```
//!
//! ## How the ids find the log call
//!
//! Handlers never pass the trace around. [`log::trace_context`] parses the
//! request's header on first use and caches the result against the request's
//! identity (see [`cache`]); the middleware drops the entry when the handler
//! returns.

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod sink;

pub mod cache;
pub mod log;
pub mod middleware;
pub mod traceparent;

#[cfg(test)]
mod test_util;

pub use error::{BoxError, Error};
pub use http::{Method, StatusCode};
pub use handler::{Handler, ServeFuture, Service};
pub use request::{Request, RequestScope};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use sink::{ResponseSink, ResponseWriter};
pub use traceparent::TraceContext;
