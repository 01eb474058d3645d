// Token exchange calls against the listings backend

use anyhow::{Context, Result};
use reqwest::Client;

use super::types::{CredentialPair, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};

/// Join the API base URL with an endpoint path
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Exchange a refresh token for a new access token
///
/// Sent on a bare client so the exchange never goes through the
/// authenticated interceptor.
pub async fn refresh_access_token(
    client: &Client,
    base_url: &str,
    refresh_token: &str,
) -> Result<String> {
    tracing::info!("Refreshing access token...");

    let url = endpoint_url(base_url, "auth/refresh");
    let request = RefreshRequest {
        refresh_token: refresh_token.to_string(),
    };

    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .context("Failed to send refresh request")?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Token refresh failed: {} - {}", status, error_text);
    }

    let data: RefreshResponse = response
        .json()
        .await
        .context("Failed to parse refresh response")?;

    if data.data.access_token.is_empty() {
        anyhow::bail!("Refresh response does not contain accessToken");
    }

    tracing::info!("Access token refreshed");

    Ok(data.data.access_token)
}

/// Authenticate with email and password
pub async fn login(
    client: &Client,
    base_url: &str,
    email: &str,
    password: &str,
) -> Result<CredentialPair> {
    tracing::info!("Logging in as {}...", email);

    let url = endpoint_url(base_url, "auth/login");
    let request = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    };

    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .context("Failed to send login request")?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Login failed: {} - {}", status, error_text);
    }

    let data: LoginResponse = response
        .json()
        .await
        .context("Failed to parse login response")?;

    if data.data.access_token.is_empty() || data.data.refresh_token.is_empty() {
        anyhow::bail!("Login response does not contain both tokens");
    }

    Ok(data.data)
}
