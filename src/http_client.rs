use anyhow::{Context, Result};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{endpoint_url, SessionManager};
use crate::error::ApiError;

/// HTTP client for the listings API
///
/// Attaches the stored access token to every request and, on a 401,
/// refreshes it and resends the request once.
pub struct ApiHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Credential owner
    session: Arc<SessionManager>,
}

/// An outgoing request plus its one-shot retry marker
struct PendingRequest {
    request: Request,
    retried: bool,
}

impl PendingRequest {
    fn new(request: Request) -> Self {
        Self {
            request,
            retried: false,
        }
    }

    /// Copy of the request for the next attempt
    fn attempt(&self) -> Result<Request, ApiError> {
        self.request.try_clone().ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("Request body is not cloneable"))
        })
    }

    fn set_bearer(&mut self, token: &str) -> Result<(), ApiError> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Invalid access token: {}", e)))?;
        self.request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

impl ApiHttpClient {
    /// Create a new HTTP client
    pub fn new(
        session: Arc<SessionManager>,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, session })
    }

    /// Start a request against `path` under the API base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, endpoint_url(self.session.base_url(), path))
    }

    /// Execute a request through the auth interceptors
    ///
    /// - request phase: bearer token from the store, if any
    /// - 401 (first time): refresh, swap the header, resend once
    /// - anything else: returned unchanged
    pub async fn execute(&self, request: Request) -> Result<Response, ApiError> {
        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(method = %method, url = %url, "Sending HTTP request");

        let mut pending = PendingRequest::new(request);
        match self.session.access_token() {
            Ok(Some(token)) => pending.set_bearer(&token)?,
            Ok(None) => tracing::debug!("No access token stored, sending unauthenticated"),
            Err(e) => tracing::warn!("Failed to read access token: {:#}", e),
        }

        loop {
            let attempt = pending.attempt()?;

            match self.dispatch(attempt).await {
                Ok(response) => return Ok(response),

                Err(err) if err.is_unauthorized() && !pending.retried => {
                    pending.retried = true;
                    tracing::warn!(url = %url, "Received 401, refreshing token and retrying...");

                    match self.session.recover().await {
                        Some(token) => pending.set_bearer(&token)?,
                        None => return Err(err),
                    }
                }

                Err(err) => return Err(err),
            }
        }
    }

    /// Send a single attempt and map error statuses
    async fn dispatch(&self, request: Request) -> Result<Response, ApiError> {
        let url = request.url().clone();

        let response = self.client.execute(request).await.map_err(|e| {
            tracing::warn!(error = %e, url = %url, "HTTP request error");
            ApiError::Http(e)
        })?;

        let status = response.status();
        tracing::debug!(status = %status, "Received HTTP response");

        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        tracing::debug!(
            status = status.as_u16(),
            url = %url,
            response_body = %error_text,
            "HTTP request failed with error response"
        );

        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_text,
        })
    }

    /// GET `path` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path).build()?;
        Ok(self.execute(request).await?.json().await?)
    }

    /// GET `path` with query parameters and decode the JSON body
    pub async fn get_json_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.request(Method::GET, path).query(query).build()?;
        Ok(self.execute(request).await?.json().await?)
    }

    /// Send a JSON body with `method` and decode the JSON response
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(method, path).json(body).build()?;
        Ok(self.execute(request).await?.json().await?)
    }

    /// DELETE `path`, discarding the body
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, path).build()?;
        self.execute(request).await?;
        Ok(())
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }
}
