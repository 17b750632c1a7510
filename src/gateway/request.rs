use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;

use crate::ids::{RequestId, RequestSeq};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage shared by requests and responses.
///
/// Names are `Arc<str>` since the same few names repeat on every request.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Request as seen by the gateway filters.
///
/// Cloning yields a new request: the copy gets its own [`RequestSeq`].
#[derive(Debug)]
pub struct GatewayRequest {
    pub request_id: RequestId,
    seq: RequestSeq,
    pub method: Method,
    /// Request path, without the query string
    pub path: String,
    /// Id of the gateway route the request was matched to
    pub route_id: String,
    pub headers: HeaderVec,
}

impl GatewayRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, route_id: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            seq: RequestSeq::next(),
            method,
            path: path.into(),
            route_id: route_id.into(),
            headers: HeaderVec::new(),
        }
    }

    /// Build a request from incoming headers, keeping a valid `x-request-id`.
    #[must_use]
    pub fn from_parts(
        method: Method,
        path: impl Into<String>,
        route_id: impl Into<String>,
        headers: HeaderVec,
    ) -> Self {
        Self {
            request_id: RequestId::from_headers(&headers),
            seq: RequestSeq::next(),
            method,
            path: path.into(),
            route_id: route_id.into(),
            headers,
        }
    }

    /// In-process sequence number keying per-request filter state.
    #[inline]
    #[must_use]
    pub fn seq(&self) -> RequestSeq {
        self.seq
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl Clone for GatewayRequest {
    fn clone(&self) -> Self {
        Self {
            request_id: self.request_id,
            seq: RequestSeq::next(),
            method: self.method.clone(),
            path: self.path.clone(),
            route_id: self.route_id.clone(),
            headers: self.headers.clone(),
        }
    }
}
