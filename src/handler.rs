//! Services and route handlers.
//!
//! The server drives a [`Service`]: `serve(request, sink)`. A service writes
//! its response into a [`ResponseSink`] instead of returning it, so a
//! middleware can hand the service it wraps a decorated sink and see
//! everything that was written.
//!
//! Application code rarely implements `Service` by hand. A route handler is
//! any `async fn(Request) -> impl IntoResponse`; [`Handler`] turns it into a
//! service that awaits the function and writes the returned response.
//!
//! ```text
//! Server ─serve(req, sink)─▶ Trace ─serve(req, capture)─▶ Router ─serve(req, capture)─▶ route
//!                                                                                         │
//!                                                             handler(req).await.write_to(capture)
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::IntoResponse;
use crate::sink::ResponseSink;

/// Future returned by [`Service::serve`], borrowing the service and the sink.
pub type ServeFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Something that answers a request by writing into a response sink.
pub trait Service: Send + Sync + 'static {
    fn serve<'a>(&'a self, req: Request, sink: &'a mut dyn ResponseSink) -> ServeFuture<'a>;
}

/// Implemented for every valid route handler.
///
/// Satisfied by any `async fn` with the signature
/// `async fn name(req: Request) -> impl IntoResponse`, and sealed so nothing
/// else can implement it.
pub trait Handler: sealed::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_service(self) -> Arc<dyn Service>;
}

mod sealed {
    pub trait Sealed {}
}

impl<F, Fut, R> sealed::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_service(self) -> Arc<dyn Service> {
        Arc::new(HandlerService(self))
    }
}

struct HandlerService<F>(F);

impl<F, Fut, R> Service for HandlerService<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn serve<'a>(&'a self, req: Request, sink: &'a mut dyn ResponseSink) -> ServeFuture<'a> {
        let fut = (self.0)(req);
        Box::pin(async move {
            if let Err(e) = fut.await.into_response().write_to(sink) {
                tracing::error!("response write error: {e}");
            }
        })
    }
}
