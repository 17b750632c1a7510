use std::fmt;

use serde::{Deserialize, Serialize};

/// Substitute response returned to the client when a route is blocked.
///
/// Serializes as `{"code":429,"message":"...","route":"..."}`, which is also
/// what [`Display`](fmt::Display) renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockResponse {
    /// HTTP status code
    pub code: u16,
    pub message: String,
    /// Route the response was produced for
    pub route: String,
}

impl BlockResponse {
    #[must_use]
    pub fn new(code: u16, message: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            route: route.into(),
        }
    }

    /// Render the JSON body sent to the client.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "code": self.code,
            "message": self.message,
            "route": self.route,
        })
        .to_string()
    }
}

impl fmt::Display for BlockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}
