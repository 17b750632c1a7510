use super::GatewayRequest;

/// Default header carrying the caller's origin.
pub const DEFAULT_ORIGIN_HEADER: &str = "S-Origin";

/// Extracts the caller origin that authority rules are checked against.
pub trait RequestOriginParser: Send + Sync {
    /// Origin of `req`; an empty string means unknown.
    fn parse_origin(&self, req: &GatewayRequest) -> String;
}

/// Reads the origin from a request header.
#[derive(Debug, Clone)]
pub struct HeaderOriginParser {
    header: String,
}

impl HeaderOriginParser {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl Default for HeaderOriginParser {
    fn default() -> Self {
        Self::new(DEFAULT_ORIGIN_HEADER)
    }
}

impl RequestOriginParser for HeaderOriginParser {
    fn parse_origin(&self, req: &GatewayRequest) -> String {
        req.get_header(&self.header)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_missing_header_is_empty_origin() {
        let parser = HeaderOriginParser::default();
        let req = GatewayRequest::new(Method::GET, "/", "r");
        assert_eq!(parser.parse_origin(&req), "");
        let req = req.with_header("s-origin", " app-a ");
        assert_eq!(parser.parse_origin(&req), "app-a");
    }
}
