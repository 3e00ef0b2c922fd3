//! Minimal traced service: JSON endpoints with trace-correlated logs.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Full request/response transcripts:
//!   RUST_LOG=info,tsu_trace::dump=trace cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -H 'traceparent: 00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-00' \
//!        http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'

use tracing_subscriber::EnvFilter;
use tsu_trace::{Request, Response, Router, Server, StatusCode, log_with_trace, middleware};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = Router::new()
        .get("/users/{id}",    get_user)
        .post("/users",        create_user)
        .delete("/users/{id}", delete_user);

    Server::bind("0.0.0.0:3000")
        .serve(middleware::trace(app))
        .await
        .expect("server error");
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    log_with_trace!(req, "loading user {}", id);
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// POST /users
async fn create_user(mut req: Request) -> Response {
    let body = match req.body().await {
        Ok(body) if !body.is_empty() => body,
        Ok(_) => return Response::status(StatusCode::BAD_REQUEST),
        Err(e) => {
            log_with_trace!(req, "could not read body: {}", e);
            return Response::status(StatusCode::BAD_REQUEST);
        }
    };

    log_with_trace!(req, "creating user from {} bytes", body.len());
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(br#"{"id":"99","name":"new_user"}"#.to_vec())
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(req: Request) -> StatusCode {
    log_with_trace!(req, "deleting user {}", req.param("id").unwrap_or("unknown"));
    StatusCode::NO_CONTENT
}
