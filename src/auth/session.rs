use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;

use super::redirect::{LoginRedirect, NavigateToLogin};
use super::refresh;
use super::store::CredentialStore;
use super::types::{access_token_ttl, token_prefix, CredentialPair, ACCESS_TOKEN_COOKIE};

/// Login page used when the host application supplies no redirect
pub const DEFAULT_LOGIN_URL: &str = "/login";

/// Session manager
/// Owns the credential pair and decides between refresh and teardown
pub struct SessionManager {
    /// Cookie storage for the credential pair
    store: Arc<dyn CredentialStore>,

    /// What to do when the session cannot be recovered
    redirect: Arc<dyn LoginRedirect>,

    /// Bare HTTP client for login/refresh exchanges
    client: Client,

    /// Listings API base URL
    base_url: String,
}

impl SessionManager {
    /// Create a session over `store`, redirecting to [`DEFAULT_LOGIN_URL`] on teardown
    pub fn new(base_url: impl Into<String>, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            store,
            redirect: Arc::new(NavigateToLogin::new(DEFAULT_LOGIN_URL)),
            client,
            base_url: base_url.into(),
        })
    }

    /// Replace the login redirect
    pub fn with_login_redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
        self.redirect = redirect;
        self
    }

    /// Keep the default navigation but point it at `login_url`
    pub fn with_login_url(self, login_url: impl Into<String>) -> Self {
        self.with_login_redirect(Arc::new(NavigateToLogin::new(login_url)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current access token, if a live cookie exists
    pub fn access_token(&self) -> Result<Option<String>> {
        self.store.access_token()
    }

    /// True if either credential cookie is still present
    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.store.access_token()?.is_some() || self.store.refresh_token()?.is_some())
    }

    /// Persist an externally obtained credential pair
    pub fn establish(&self, pair: &CredentialPair) -> Result<()> {
        self.store
            .store_pair(pair)
            .context("Failed to persist credentials")?;
        tracing::info!("Session established");
        Ok(())
    }

    /// Log in with email and password and persist the issued pair
    pub async fn login(&self, email: &str, password: &str) -> Result<CredentialPair> {
        let pair = refresh::login(&self.client, &self.base_url, email, password).await?;
        self.establish(&pair)?;
        Ok(pair)
    }

    /// Drop both credential cookies
    pub fn logout(&self) -> Result<()> {
        self.store.clear().context("Failed to clear credentials")?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Try to obtain a fresh access token after a 401
    ///
    /// Returns `None` once the session has been torn down; in that case the
    /// login redirect has fired exactly once.
    pub async fn recover(&self) -> Option<String> {
        let refresh_token = match self.store.refresh_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::warn!("No refresh token stored, ending session");
                self.teardown();
                return None;
            }
            Err(e) => {
                tracing::error!("Failed to read refresh token: {:#}", e);
                self.teardown();
                return None;
            }
        };

        match refresh::refresh_access_token(&self.client, &self.base_url, &refresh_token).await {
            Ok(token) => {
                if let Err(e) = self
                    .store
                    .set(ACCESS_TOKEN_COOKIE, &token, access_token_ttl())
                {
                    tracing::warn!("Failed to persist refreshed access token: {:#}", e);
                }
                tracing::debug!("Using refreshed token {}...", token_prefix(&token));
                Some(token)
            }
            Err(e) => {
                tracing::error!("Token refresh failed: {:#}", e);
                self.teardown();
                None
            }
        }
    }

    /// Delete both cookies and send the user to the login page
    fn teardown(&self) {
        if let Err(e) = self.store.clear() {
            tracing::error!("Failed to clear credentials: {:#}", e);
        }
        self.redirect.redirect_to_login();
    }
}
