//! Middleware layer.
//!
//! Middleware wraps a [`Service`](crate::Service) and sees every request and
//! response that passes through it.
//!
//! - [`trace`]: W3C `traceparent` propagation, trace-correlated request
//!   logging, and optional request/response transcripts.
//!
//! ```rust,no_run
//! use tsu_trace::{Request, Router, Server, log_with_trace, middleware};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new().get("/", |req: Request| async move {
//!         log_with_trace!(req, "hello from {}", req.path());
//!         "hi"
//!     });
//!
//!     Server::bind("0.0.0.0:3000").serve(middleware::trace(app)).await.unwrap();
//! }
//! ```

mod capture;
mod dump;
mod trace;

pub use capture::CaptureSink;
pub use trace::{DUMP_TARGET, Dump, Trace, trace};
