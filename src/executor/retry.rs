//! Retry decorator for request executors

use crate::config::RetryConfig;
use crate::executor::{Request, RequestExecutor, Response};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

/// When and how often to retry
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub statuses_to_retry: HashSet<u16>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.delay),
            statuses_to_retry: config.statuses_to_retry.iter().copied().collect(),
        }
    }

    /// Returns true if the outcome of an attempt warrants another one
    ///
    /// Server errors, listed statuses and transport failures are retried.
    /// Other errors, such as a rejected token, are not.
    pub fn should_retry(&self, outcome: &Result<Response>) -> bool {
        match outcome {
            Ok(response) => {
                response.is_server_error() || self.statuses_to_retry.contains(&response.status)
            }
            Err(error) => error.is_transport(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Wraps another executor and retries failed attempts with a fixed delay
///
/// After the last attempt the outcome is returned unchanged, so a final 5xx
/// reaches the caller as a response, not as an error.
pub struct RetryExecutor {
    inner: Box<dyn RequestExecutor>,
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(inner: Box<dyn RequestExecutor>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl RequestExecutor for RetryExecutor {
    async fn execute(&self, request: &Request) -> Result<Response> {
        let mut attempt = 1;
        loop {
            let outcome = self.inner.execute(request).await;
            if attempt >= self.policy.max_attempts || !self.policy.should_retry(&outcome) {
                return outcome;
            }

            match &outcome {
                Ok(response) => tracing::warn!(
                    "Attempt {}/{} for {} returned {}, retrying in {:?}",
                    attempt,
                    self.policy.max_attempts,
                    request.url,
                    response.status,
                    self.policy.delay
                ),
                Err(e) => tracing::warn!(
                    "Attempt {}/{} for {} failed: {}, retrying in {:?}",
                    attempt,
                    self.policy.max_attempts,
                    request.url,
                    e,
                    self.policy.delay
                ),
            }

            tokio::time::sleep(self.policy.delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::DefaultRequestExecutor;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn retrying(statuses: Vec<u16>) -> RetryExecutor {
        RetryExecutor::new(
            Box::new(DefaultRequestExecutor::new().unwrap()),
            RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(10),
                statuses_to_retry: statuses.into_iter().collect(),
            },
        )
    }

    #[tokio::test]
    async fn test_server_error_retried_up_to_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/node"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let response = retrying(vec![])
            .execute(&Request::get(format!("{}/node", server.uri())))
            .await
            .unwrap();

        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_success_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let response = retrying(vec![])
            .execute(&Request::get(server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_listed_status_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let response = retrying(vec![429])
            .execute(&Request::get(server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 429);
    }

    #[tokio::test]
    async fn test_unlisted_client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let response = retrying(vec![429])
            .execute(&Request::get(server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let response = retrying(vec![])
            .execute(&Request::get(server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            enabled: true,
            max_attempts: 5,
            delay: 250,
            statuses_to_retry: vec![429, 408],
        });

        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(250));
        assert!(policy.statuses_to_retry.contains(&408));
    }
}
