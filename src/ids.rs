//! Identifiers carried by gateway requests.
//!
//! [`RequestId`] is the correlation id shown in logs and propagated through
//! `x-request-id`; callers may supply it, so it is not unique. [`RequestSeq`]
//! is minted in-process for every request and is what per-request filter
//! state is keyed by.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Header used to propagate request ids through the gateway.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// ULID correlation id, reused from the caller when it sent a valid one.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Take the id from an `x-request-id` header when it holds a ULID.
    #[must_use]
    pub fn from_headers(headers: &[(Arc<str>, String)]) -> Self {
        headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(REQUEST_ID_HEADER))
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(Self)
    }
}

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Process-unique request number. Never read from the wire.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct RequestSeq(u64);

impl RequestSeq {
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_id_is_reused() {
        let id = RequestId::new();
        let headers: [(Arc<str>, String); 1] = [(Arc::from("X-Request-Id"), id.to_string())];
        assert_eq!(RequestId::from_headers(&headers), id);
    }

    #[test]
    fn test_garbage_header_mints_new_id() {
        let headers: [(Arc<str>, String); 1] = [(Arc::from(REQUEST_ID_HEADER), "not-a-ulid".to_string())];
        let a = RequestId::from_headers(&headers);
        let b = RequestId::from_headers(&[]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_seq_is_increasing() {
        let a = RequestSeq::next();
        let b = RequestSeq::next();
        assert!(b > a);
    }
}
