// Blog posts

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{Envelope, Page};
use crate::error::{ApiError, Result};
use crate::http_client::ApiHttpClient;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: i64,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

pub struct BlogApi<'a> {
    http: &'a ApiHttpClient,
}

impl<'a> BlogApi<'a> {
    pub fn new(http: &'a ApiHttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self, page: u32) -> Result<Page<BlogPost>> {
        let envelope: Envelope<Page<BlogPost>> = self
            .http
            .get_json_with_query("/blog", &[("page", page)])
            .await?;
        Ok(envelope.data)
    }

    pub async fn get(&self, slug: &str) -> Result<BlogPost> {
        validate_slug(slug)?;
        let envelope: Envelope<BlogPost> = self.http.get_json(&format!("/blog/{}", slug)).await?;
        Ok(envelope.data)
    }
}

/// Slugs are a single path segment of ASCII letters, digits, `-` and `_`
fn validate_slug(slug: &str) -> Result<()> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ApiError::ValidationError(format!("Invalid blog slug: {}", slug)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryCookieJar, SessionManager};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_post() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/blog/como-tasar-tu-casa")
            .with_status(200)
            .with_body(r#"{"data":{"id":1,"slug":"como-tasar-tu-casa","title":"Cómo tasar tu casa","publishedAt":"2024-05-02T12:00:00Z"}}"#)
            .create_async()
            .await;

        let session =
            SessionManager::new(server.url(), Arc::new(MemoryCookieJar::new())).unwrap();
        let client = ApiHttpClient::new(Arc::new(session), 5, 10).unwrap();

        let post = BlogApi::new(&client).get("como-tasar-tu-casa").await.unwrap();
        assert_eq!(post.title, "Cómo tasar tu casa");
        assert!(post.published_at.is_some());
        assert!(post.content.is_none());
    }

    #[tokio::test]
    async fn test_get_rejects_slug_outside_one_segment() {
        let mut server = mockito::Server::new_async().await;
        let any = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let session =
            SessionManager::new(server.url(), Arc::new(MemoryCookieJar::new())).unwrap();
        let client = ApiHttpClient::new(Arc::new(session), 5, 10).unwrap();
        let api = BlogApi::new(&client);

        for slug in ["", "../properties", "post?draft=1", "post#top", "a/b"] {
            assert!(matches!(
                api.get(slug).await,
                Err(ApiError::ValidationError(_))
            ));
        }
        any.assert_async().await;
    }
}
