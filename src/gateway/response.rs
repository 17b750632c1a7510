use std::sync::Arc;

use serde::Serialize;

use super::HeaderVec;
use crate::fallback::{BlockResponse, FallbackProvider};

/// Response produced by the upstream or by a short-circuiting filter.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayResponse {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: String,
}

impl GatewayResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Render a block response with the provider's content type.
    #[must_use]
    pub fn from_block(block: &BlockResponse, provider: &dyn FallbackProvider) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((
            Arc::from("content-type"),
            provider.content_type().to_string(),
        ));
        Self {
            status: block.code,
            headers,
            body: block.to_json(),
        }
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}
