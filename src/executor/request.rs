//! Request and response values passed through the executor chain

use reqwest::header::HeaderMap;

/// One header to attach to an outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub key: String,
    pub value: String,
}

impl RequestHeader {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An outgoing GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub headers: Vec<RequestHeader>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(RequestHeader::new(key, value));
        self
    }
}

/// A fully received response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    /// None when the body was empty
    pub body: Option<Vec<u8>>,
}

impl Response {
    /// Returns a header value if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, CACHE_CONTROL};

    #[test]
    fn test_request_builder() {
        let request = Request::get("https://example.com/").with_header("Accept", "text/turtle");
        assert_eq!(request.headers, vec![RequestHeader::new("Accept", "text/turtle")]);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
        let response = Response {
            status: 200,
            headers,
            body: None,
        };

        assert_eq!(response.header("Cache-Control"), Some("max-age=60"));
        assert_eq!(response.header("location"), None);
        assert!(!response.is_server_error());
    }
}
