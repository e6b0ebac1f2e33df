//! Plain and API-key request execution
//!
//! Both variants share one reqwest client configuration; the API key is
//! installed as a default header so it rides along on every request.

use crate::executor::{Request, RequestExecutor, Response};
use crate::{LdesError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// Redirects are never followed; the fetcher interprets them itself.
pub fn build_http_client(default_headers: HeaderMap) -> Result<Client> {
    let user_agent = format!("ldes-client/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .default_headers(default_headers)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .build()
        .map_err(LdesError::ClientBuild)
}

/// Sends a GET request and reads the full response
///
/// Transport failures, including failures while reading the body, surface as
/// `LdesError::Http`.
pub(crate) async fn send_request(
    client: &Client,
    request: &Request,
    bearer_token: Option<&str>,
) -> Result<Response> {
    let mut builder = client.get(&request.url);
    for header in &request.headers {
        builder = builder.header(header.key.as_str(), header.value.as_str());
    }
    if let Some(token) = bearer_token {
        builder = builder.bearer_auth(token);
    }

    let http_error = |source| LdesError::Http {
        url: request.url.clone(),
        source,
    };

    let response = builder.send().await.map_err(http_error)?;
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let bytes = response.bytes().await.map_err(http_error)?;

    tracing::debug!("GET {} -> {}", request.url, status);

    Ok(Response {
        status,
        headers,
        body: if bytes.is_empty() {
            None
        } else {
            Some(bytes.to_vec())
        },
    })
}

/// Executes requests without authentication, or with a static API key header
pub struct DefaultRequestExecutor {
    client: Client,
}

impl DefaultRequestExecutor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_http_client(HeaderMap::new())?,
        })
    }

    /// Creates an executor that sends `header: key` on every request
    pub fn with_api_key(header: &str, key: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| LdesError::InvalidHeader(format!("{}: {}", header, e)))?;
        let mut value = HeaderValue::from_str(key)
            .map_err(|e| LdesError::InvalidHeader(format!("{}: {}", header, e)))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(name, value);

        Ok(Self {
            client: build_http_client(headers)?,
        })
    }
}

#[async_trait]
impl RequestExecutor for DefaultRequestExecutor {
    async fn execute(&self, request: &Request) -> Result<Response> {
        send_request(&self.client, request, None).await
    }
}
