//! TCP listener, per-connection tasks and graceful shutdown.
//!
//! Every accepted connection runs on its own task. On SIGTERM or Ctrl-C the
//! listener closes and [`Server::serve`] waits for the open connections to
//! finish before returning.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::Error;
use crate::handler::Service;
use crate::request::Request;
use crate::sink::ResponseWriter;

/// Serves a [`Service`] over HTTP/1.1 and HTTP/2.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Remembers `addr`; nothing is bound until [`serve`](Server::serve).
    ///
    /// # Panics
    ///
    /// Panics if `addr` does not parse as `host:port`.
    pub fn bind(addr: &str) -> Self {
        let addr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Runs until a shutdown signal arrives and every open connection has
    /// closed.
    pub async fn serve<S: Service>(self, service: S) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "tsu-trace listening");

        accept_loop(listener, service, shutdown_signal()).await;

        info!("tsu-trace stopped");
        Ok(())
    }
}

/// Accepts connections on `listener` until `shutdown` resolves, then waits
/// for the open ones to finish.
async fn accept_loop<S, F>(listener: TcpListener, service: S, shutdown: F)
where
    S: Service,
    F: Future<Output = ()>,
{
    let service = Arc::new(service);
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!(open = connections.len(), "shutting down, waiting for connections");
                break;
            }

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(connection(Arc::clone(&service), stream, peer));
                }
                Err(e) => error!("accept error: {e}"),
            },

            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    while connections.join_next().await.is_some() {}
}

/// Drives one connection until the peer goes away.
async fn connection<S: Service>(service: Arc<S>, stream: TcpStream, peer: SocketAddr) {
    let per_request = service_fn(move |req| dispatch(Arc::clone(&service), req));

    let served = ConnBuilder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), per_request)
        .await;

    if let Err(e) = served {
        error!(%peer, "connection error: {e}");
    }
}

/// Serves one request into a [`ResponseWriter`] and converts it for hyper.
async fn dispatch<S: Service>(
    service: Arc<S>,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let mut writer = ResponseWriter::new();
    service.serve(Request::from(req), &mut writer).await;
    Ok(writer.into_response())
}

/// SIGTERM or Ctrl-C, whichever comes first. Ctrl-C only off Unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => { sigterm.recv().await; }
            Err(e) => {
                error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    use super::*;
    use crate::middleware;
    use crate::response::Response;
    use crate::router::Router;
    use crate::traceparent::{HEADER, HEADER_LEN};

    const TRACEPARENT: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-00";

    async fn echo(mut req: Request) -> Response {
        let body = req.body().await.unwrap_or_default();
        let seen = req.header(HEADER).unwrap_or("").to_owned();
        Response::text(format!("{seen}|{}", String::from_utf8_lossy(&body)))
    }

    /// Sends one HTTP/1.1 POST over a fresh connection and returns the raw
    /// response.
    async fn post(addr: SocketAddr, traceparent: Option<&str>, body: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let extra = traceparent.map(|v| format!("{HEADER}: {v}\r\n")).unwrap_or_default();
        let head = format!(
            "POST /echo HTTP/1.1\r\nhost: localhost\r\n{extra}content-length: {}\r\nconnection: close\r\n\r\n",
            body.len(),
        );
        stream.write_all(head.as_bytes()).await.unwrap();
        stream.write_all(body.as_bytes()).await.unwrap();

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        String::from_utf8(raw).unwrap()
    }

    fn body_of(response: &str) -> &str {
        response.split_once("\r\n\r\n").map_or("", |(_, body)| body)
    }

    #[tokio::test]
    async fn traced_post_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let app = middleware::trace(Router::new().post("/echo", echo));
        let server = tokio::spawn(accept_loop(listener, app, async move {
            let _ = stopped.await;
        }));

        let kept = post(addr, Some(TRACEPARENT), "TEST").await;
        assert!(kept.starts_with("HTTP/1.1 200 OK"), "{kept}");
        assert_eq!(body_of(&kept), format!("{TRACEPARENT}|TEST"));

        let generated = post(addr, None, "hello").await;
        let (seen, body) = body_of(&generated).split_once('|').unwrap();
        assert_eq!(seen.len(), HEADER_LEN);
        assert_ne!(seen, TRACEPARENT);
        assert_eq!(body, "hello");

        stop.send(()).unwrap();
        server.await.unwrap();
    }
}
