//! OAuth2 client-credentials authentication
//!
//! The token service caches one bearer token per process. Callers that find
//! the cache empty wait on the cache lock while a single acquisition runs,
//! then all of them reuse the fresh token.

use crate::executor::default::{build_http_client, send_request};
use crate::executor::{Request, RequestExecutor, Response};
use crate::{LdesError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// A bearer token and when it stops being valid
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| now >= expiry)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Acquires and caches tokens from a client-credentials token endpoint
pub struct TokenService {
    client: Client,
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
    cache: Mutex<Option<CachedToken>>,
    acquisitions: AtomicU64,
}

impl TokenService {
    pub fn new(
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(HeaderMap::new())?,
            token_endpoint: token_endpoint.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope,
            cache: Mutex::new(None),
            acquisitions: AtomicU64::new(0),
        })
    }

    /// Returns the cached token, acquiring a new one if none is usable
    pub async fn token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;

        if let Some(token) = cache.as_ref() {
            if !token.is_expired(Utc::now()) {
                return Ok(token.value.clone());
            }
            tracing::debug!("Cached access token expired");
        }

        let token = self.acquire().await?;
        let value = token.value.clone();
        *cache = Some(token);
        Ok(value)
    }

    /// Drops the cached token if it is still the rejected one
    ///
    /// A token cached by another caller after `rejected` was handed out is
    /// kept. Returns true if the cache was cleared.
    pub async fn invalidate(&self, rejected: &str) -> bool {
        let mut cache = self.cache.lock().await;
        if cache.as_ref().is_some_and(|token| token.value == rejected) {
            *cache = None;
            tracing::warn!("Access token rejected, invalidated cached token");
            true
        } else {
            tracing::debug!("Rejected access token already replaced");
            false
        }
    }

    /// Number of token requests sent so far
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    async fn acquire(&self) -> Result<CachedToken> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }

        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Requesting access token from {}", self.token_endpoint);

        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| LdesError::TokenAcquisition(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LdesError::TokenAcquisition(format!(
                "token endpoint {} returned {}",
                self.token_endpoint, status
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| LdesError::TokenAcquisition(e.to_string()))?;

        Ok(CachedToken {
            value: body.access_token,
            expires_at: body
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
        })
    }
}

/// Attaches a bearer token to every request and refreshes it once on 401
pub struct ClientCredentialsRequestExecutor {
    client: Client,
    tokens: TokenService,
}

impl ClientCredentialsRequestExecutor {
    pub fn new(tokens: TokenService) -> Result<Self> {
        Ok(Self {
            client: build_http_client(HeaderMap::new())?,
            tokens,
        })
    }

    pub fn token_service(&self) -> &TokenService {
        &self.tokens
    }
}

#[async_trait]
impl RequestExecutor for ClientCredentialsRequestExecutor {
    async fn execute(&self, request: &Request) -> Result<Response> {
        let token = self.tokens.token().await?;
        let response = send_request(&self.client, request, Some(&token)).await?;
        if response.status != StatusCode::UNAUTHORIZED.as_u16() {
            return Ok(response);
        }

        self.tokens.invalidate(&token).await;
        let token = self.tokens.token().await?;
        let response = send_request(&self.client, request, Some(&token)).await?;
        if response.status == StatusCode::UNAUTHORIZED.as_u16() {
            return Err(LdesError::Unauthorized {
                url: request.url.clone(),
            });
        }
        Ok(response)
    }
}
