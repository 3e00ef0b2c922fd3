//! Unified error type.

/// Boxed error produced by request body streams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by tsu-trace's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding a port, reading a request body, or
/// drawing a fresh unique id. Nothing on the tracing path propagates it to
/// the client; it is logged and the request carries on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("body: {0}")]
    Body(#[source] BoxError),

    #[error("unique id source: {0}")]
    IdSource(String),
}
