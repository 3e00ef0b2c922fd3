//! Request/response transcripts.
//!
//! Transcript lines carry the same `[T:…] [P:…]` prefix as
//! [`log_with_trace!`](crate::log_with_trace) but are logged under
//! [`DUMP_TARGET`], so the filter that switches dumping on also lets them
//! through:
//!
//! ```text
//! [T:…] [P:…] --- REQUEST
//! [T:…] [P:…] POST /upload HTTP/1.1
//! [T:…] [P:…] content-length: 4
//! [T:…] [P:…] 00000000  54 45 53 54                                       |TEST|
//! ```

use std::fmt::{self, Write};

use crate::middleware::capture::CaptureSink;
use crate::middleware::trace::DUMP_TARGET;
use crate::request::{Request, RequestScope};
use crate::traceparent::TraceContext;

const BYTES_PER_LINE: usize = 16;

/// One transcript line, logged under [`DUMP_TARGET`].
fn emit(ctx: &TraceContext, args: fmt::Arguments<'_>) {
    tracing::info!(target: DUMP_TARGET, "[T:{}] [P:{}] {}", ctx.trace_id(), ctx.parent_id(), args);
}

/// Logs the request line, headers and body of `req`.
///
/// The body is drained and put back, so the handler still sees all of it.
pub(crate) async fn request(ctx: &TraceContext, req: &mut Request) {
    emit(ctx, format_args!("--- REQUEST"));
    emit(ctx, format_args!(""));

    let target = req.uri().path_and_query().map_or("/", |pq| pq.as_str());
    emit(ctx, format_args!("{} {} {:?}", req.method(), target, req.version()));
    emit(ctx, format_args!(""));

    for (name, value) in req.headers() {
        emit(ctx, format_args!("{}: {}", name, String::from_utf8_lossy(value.as_bytes())));
    }

    match req.body().await {
        Ok(body) => {
            emit(ctx, format_args!(""));
            for line in hex_dump(&body) {
                emit(ctx, format_args!("{line}"));
            }
        }
        Err(e) => emit(ctx, format_args!("can't copy body: {e}")),
    }
}

/// Logs the captured status and body.
pub(crate) fn response(ctx: &TraceContext, scope: &RequestScope, capture: &CaptureSink<'_>) {
    emit(ctx, format_args!("--- RESPONSE"));
    emit(ctx, format_args!(""));

    match capture.status() {
        Some(status) => emit(ctx, format_args!("{}", status.as_u16())),
        None => emit(ctx, format_args!("(nothing written)")),
    }
    emit(ctx, format_args!("elapsed: {:?}", scope.elapsed()));

    emit(ctx, format_args!(""));
    for line in hex_dump(capture.body()) {
        emit(ctx, format_args!("{line}"));
    }
}

/// Canonical hex+ASCII dump, 16 bytes per line.
///
/// `00000000  4f 4b                                             |OK|`
pub(crate) fn hex_dump(data: &[u8]) -> Vec<String> {
    data.chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(n, chunk)| {
            let mut line = format!("{:08x}  ", n * BYTES_PER_LINE);
            for i in 0..BYTES_PER_LINE {
                match chunk.get(i) {
                    Some(b) => { let _ = write!(line, "{b:02x} "); }
                    None => line.push_str("   "),
                }
                if i == 7 || i == 15 {
                    line.push(' ');
                }
            }
            line.push('|');
            line.extend(chunk.iter().map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' }));
            line.push('|');
            line
        })
        .collect()
}
