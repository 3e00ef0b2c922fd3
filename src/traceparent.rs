//! W3C trace-context (`traceparent`) header codec.
//!
//! Wire form: `00-<32 hex trace id>-<16 hex parent id>-00`, exactly 55 bytes.
//! See <https://www.w3.org/TR/trace-context/>.
//!
//! Parsing is deliberately shallow: a value of the right length is sliced at
//! fixed offsets without checking hyphen positions or hex digits. Headers
//! that other services accept are therefore never rejected here.

use http::HeaderValue;
use rand::Rng;
use uuid::Uuid;

use crate::error::Error;

/// Header carrying the trace context.
pub const HEADER: &str = "traceparent";

pub const VERSION: &str = "00";
pub const FLAGS: &str = "00";

/// `2 + 1 + 32 + 1 + 16 + 1 + 2`
pub const HEADER_LEN: usize = 55;
pub const TRACE_ID_LEN: usize = 32;
pub const PARENT_ID_LEN: usize = 16;

/// Placeholder id for requests whose header is absent or malformed.
pub const INVALID: &str = "ERR";

const HEX: &[u8; 16] = b"0123456789abcdef";

// ── Id source ─────────────────────────────────────────────────────────────────

/// Where fresh trace and parent ids come from.
pub trait IdSource: Send + Sync {
    /// A globally unique 128-bit value, used as the trace id.
    fn unique_id(&self) -> Result<Uuid, Error>;

    /// `len` random characters from the lowercase hex alphabet.
    fn random_hex(&self, len: usize) -> String;
}

/// Random v4 UUIDs and thread-local RNG hex strings.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn unique_id(&self) -> Result<Uuid, Error> {
        Ok(Uuid::new_v4())
    }

    fn random_hex(&self, len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len).map(|_| HEX[rng.gen_range(0..HEX.len())] as char).collect()
    }
}

// ── Generation ────────────────────────────────────────────────────────────────

/// A fresh `traceparent` value from [`RandomIds`].
pub fn generate() -> String {
    generate_with(&RandomIds)
}

/// A fresh `traceparent` value from `ids`.
///
/// Returns an empty string if `ids` cannot produce a unique id; the request
/// then goes untraced and its log lines carry the `ERR` placeholder.
pub fn generate_with(ids: &dyn IdSource) -> String {
    let trace_id = match ids.unique_id() {
        Ok(id) => id,
        Err(e) => {
            tracing::info!("could not generate trace id: {e}");
            return String::new();
        }
    };
    let parent_id = ids.random_hex(PARENT_ID_LEN);

    format!("{VERSION}-{}-{parent_id}-{FLAGS}", trace_id.simple())
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Trace and parent id extracted from a `traceparent` value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceContext {
    trace_id: String,
    parent_id: String,
}

impl TraceContext {
    pub fn new(trace_id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self { trace_id: trace_id.into(), parent_id: parent_id.into() }
    }

    /// The `("ERR", "ERR")` placeholder.
    pub fn invalid() -> Self {
        Self::new(INVALID, INVALID)
    }

    /// Slices a header value at the fixed W3C offsets.
    ///
    /// Anything that is not exactly [`HEADER_LEN`] bytes, or whose id ranges
    /// are not valid UTF-8, yields [`TraceContext::invalid`].
    pub fn parse(value: &str) -> Self {
        Self::parse_bytes(value.as_bytes())
    }

    /// Parses an optional raw header. Bytes outside the id ranges are not
    /// inspected, so obs-text in the version or flags is accepted.
    pub fn from_header(value: Option<&HeaderValue>) -> Self {
        value.map_or_else(Self::invalid, |v| Self::parse_bytes(v.as_bytes()))
    }

    fn parse_bytes(value: &[u8]) -> Self {
        if value.len() != HEADER_LEN {
            return Self::invalid();
        }
        match (std::str::from_utf8(&value[3..35]), std::str::from_utf8(&value[36..52])) {
            (Ok(trace_id), Ok(parent_id)) => Self::new(trace_id, parent_id),
            _ => Self::invalid(),
        }
    }

    pub fn trace_id(&self) -> &str { &self.trace_id }
    pub fn parent_id(&self) -> &str { &self.parent_id }

    pub fn is_valid(&self) -> bool {
        self.trace_id != INVALID
    }

    /// Serialised `traceparent` value for this context.
    pub fn header_value(&self) -> String {
        format!("{VERSION}-{}-{}-{FLAGS}", self.trace_id, self.parent_id)
    }
}
