//! Request executors
//!
//! Every outgoing fragment request goes through a `RequestExecutor`. The
//! variant is chosen by the auth configuration, optionally wrapped in a
//! `RetryExecutor`.

mod client_credentials;
mod default;
mod request;
mod retry;

pub use client_credentials::{CachedToken, ClientCredentialsRequestExecutor, TokenService};
pub use default::{build_http_client, DefaultRequestExecutor};
pub use request::{Request, RequestHeader, Response};
pub use retry::{RetryExecutor, RetryPolicy};

use crate::config::{AuthConfig, Config};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Executes one HTTP request and returns the full response
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: &Request) -> Result<Response>;
}

/// Builds the executor chain described by the configuration
pub fn build_request_executor(config: &Config) -> Result<Arc<dyn RequestExecutor>> {
    let executor: Box<dyn RequestExecutor> = match &config.auth {
        AuthConfig::NoAuth => Box::new(DefaultRequestExecutor::new()?),
        AuthConfig::ApiKey { header, key } => {
            Box::new(DefaultRequestExecutor::with_api_key(header, key)?)
        }
        AuthConfig::ClientCredentials {
            client_id,
            client_secret,
            token_endpoint,
            scope,
        } => {
            let tokens =
                TokenService::new(token_endpoint, client_id, client_secret, scope.clone())?;
            Box::new(ClientCredentialsRequestExecutor::new(tokens)?)
        }
    };

    if config.retry.enabled {
        tracing::debug!(
            "Retrying failed requests up to {} attempts",
            config.retry.max_attempts
        );
        Ok(Arc::new(RetryExecutor::new(
            executor,
            RetryPolicy::from_config(&config.retry),
        )))
    } else {
        Ok(Arc::from(executor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_factory_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let config = parse_config(&format!(
            r#"
[client]
urls = ["{}"]

[retry]
enabled = false
"#,
            server.uri()
        ))
        .unwrap();

        let executor = build_request_executor(&config).unwrap();
        let response = executor.execute(&Request::get(server.uri())).await.unwrap();
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_factory_with_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&server)
            .await;

        let config = parse_config(&format!(
            r#"
[client]
urls = ["{}"]

[retry]
max-attempts = 2
delay = 1
"#,
            server.uri()
        ))
        .unwrap();

        let executor = build_request_executor(&config).unwrap();
        let response = executor.execute(&Request::get(server.uri())).await.unwrap();
        assert_eq!(response.status, 502);
    }
}
