// MercadoLibre OAuth and REST calls

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::config::MercadoLibreConfig;
use crate::error::ApiError;

/// Token returned by `POST /oauth/token`
#[derive(Debug, Clone, Deserialize)]
pub struct MeliToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    pub user_id: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Authorization page the user is sent to
pub fn authorization_url(config: &MercadoLibreConfig, state: &str) -> Result<Url> {
    Url::parse_with_params(
        &format!("{}/authorization", config.auth_url.trim_end_matches('/')),
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("state", state),
        ],
    )
    .context("Failed to build MercadoLibre authorization URL")
}

/// Exchange an authorization code for a token
pub async fn exchange_code(
    client: &Client,
    config: &MercadoLibreConfig,
    code: &str,
) -> Result<MeliToken> {
    tracing::info!("Exchanging MercadoLibre authorization code...");

    let url = format!("{}/oauth/token", config.api_url.trim_end_matches('/'));
    let form = [
        ("grant_type", "authorization_code"),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];

    let response = client
        .post(&url)
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await
        .context("Failed to send MercadoLibre token request")?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();

        if let Ok(error_json) = serde_json::from_str::<Value>(&error_text) {
            if let (Some(error_code), Some(message)) = (
                error_json.get("error").and_then(|v| v.as_str()),
                error_json.get("message").and_then(|v| v.as_str()),
            ) {
                tracing::error!(
                    "MercadoLibre token error details: error={}, message={}",
                    error_code,
                    message
                );
            }
        }

        anyhow::bail!("MercadoLibre token exchange failed: {} - {}", status, error_text);
    }

    let token: MeliToken = response
        .json()
        .await
        .context("Failed to parse MercadoLibre token response")?;

    if token.access_token.is_empty() {
        anyhow::bail!("MercadoLibre response does not contain access_token");
    }

    tracing::info!("MercadoLibre token issued for user {}", token.user_id);
    Ok(token)
}

/// Frontend page that receives the token
pub fn frontend_redirect_url(
    config: &MercadoLibreConfig,
    token: &MeliToken,
    state: Option<&str>,
) -> Result<Url> {
    let mut url = Url::parse(&config.frontend_callback_url)
        .context("Invalid FRONTEND_CALLBACK_URL")?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("access_token", &token.access_token);
        if let Some(ref refresh_token) = token.refresh_token {
            query.append_pair("refresh_token", refresh_token);
        }
        query.append_pair("user_id", &token.user_id.to_string());
        if let Some(expires_in) = token.expires_in {
            query.append_pair("expires_in", &expires_in.to_string());
        }
        if let Some(state) = state {
            query.append_pair("state", state);
        }
    }
    Ok(url)
}

/// Frontend page told that authorization failed
pub fn frontend_error_url(config: &MercadoLibreConfig, error: &str) -> Result<Url> {
    let mut url = Url::parse(&config.frontend_callback_url)
        .context("Invalid FRONTEND_CALLBACK_URL")?;
    url.query_pairs_mut().append_pair("error", error);
    Ok(url)
}

/// GET a MercadoLibre resource on behalf of the caller
///
/// Upstream error statuses are passed through as [`ApiError::Status`].
pub async fn fetch(
    client: &Client,
    config: &MercadoLibreConfig,
    path: &str,
    access_token: &str,
) -> Result<Value, ApiError> {
    let url = format!(
        "{}/{}",
        config.api_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    tracing::debug!(url = %url, "Proxying MercadoLibre request");

    let response = client.get(&url).bearer_auth(access_token).send().await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), url = %url, "MercadoLibre request failed");
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_text,
        });
    }

    Ok(response.json().await?)
}
