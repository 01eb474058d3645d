// Contact inquiries

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Envelope, Page};
use crate::error::{ApiError, Result};
use crate::http_client::ApiHttpClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    New,
    Read,
    Answered,
    Archived,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
    #[serde(default)]
    pub property_id: Option<i64>,
    pub status: InquiryStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Inquiry submitted from the public site
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInquiry {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<i64>,
}

impl NewInquiry {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ApiError::ValidationError("name is required".to_string()));
        }
        if !self.email.contains('@') {
            return Err(ApiError::ValidationError(format!(
                "invalid email: {}",
                self.email
            )));
        }
        if self.message.trim().is_empty() {
            return Err(ApiError::ValidationError("message is required".to_string()));
        }
        Ok(())
    }
}

/// Inquiry endpoints
pub struct InquiriesApi<'a> {
    http: &'a ApiHttpClient,
}

impl<'a> InquiriesApi<'a> {
    pub fn new(http: &'a ApiHttpClient) -> Self {
        Self { http }
    }

    pub async fn submit(&self, inquiry: &NewInquiry) -> Result<Inquiry> {
        inquiry.validate()?;
        let envelope: Envelope<Inquiry> = self
            .http
            .send_json(Method::POST, "/inquiries", inquiry)
            .await?;
        Ok(envelope.data)
    }

    /// Admin listing, optionally filtered by status
    pub async fn list(&self, status: Option<InquiryStatus>, page: u32) -> Result<Page<Inquiry>> {
        let mut query = vec![("page", page.to_string())];
        if let Some(status) = status {
            let status = serde_json::to_value(status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            query.push(("status", status));
        }

        let envelope: Envelope<Page<Inquiry>> =
            self.http.get_json_with_query("/inquiries", &query).await?;
        Ok(envelope.data)
    }

    pub async fn set_status(&self, id: i64, status: InquiryStatus) -> Result<Inquiry> {
        let envelope: Envelope<Inquiry> = self
            .http
            .send_json(
                Method::PATCH,
                &format!("/inquiries/{}", id),
                &json!({ "status": status }),
            )
            .await?;
        Ok(envelope.data)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.http.delete(&format!("/inquiries/{}", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryCookieJar, SessionManager};
    use mockito::Matcher;
    use std::sync::Arc;

    fn client_for(base_url: &str) -> ApiHttpClient {
        let session = SessionManager::new(base_url, Arc::new(MemoryCookieJar::new())).unwrap();
        ApiHttpClient::new(Arc::new(session), 5, 10).unwrap()
    }

    fn inquiry() -> NewInquiry {
        NewInquiry {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone: None,
            message: "¿Sigue disponible?".to_string(),
            property_id: Some(7),
        }
    }

    #[test]
    fn test_validation() {
        assert!(inquiry().validate().is_ok());

        let mut bad = inquiry();
        bad.email = "not-an-email".to_string();
        assert!(bad.validate().is_err());

        let mut bad = inquiry();
        bad.message = "   ".to_string();
        assert!(bad.validate().is_err());
    }

    #[tokio::test]
    async fn test_submit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/inquiries")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "Ana",
                "email": "ana@example.com",
                "message": "¿Sigue disponible?",
                "propertyId": 7
            })))
            .with_status(201)
            .with_body(r#"{"data":{"id":3,"name":"Ana","email":"ana@example.com","message":"¿Sigue disponible?","propertyId":7,"status":"new"}}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let created = InquiriesApi::new(&client).submit(&inquiry()).await.unwrap();
        assert_eq!(created.id, 3);
        assert_eq!(created.status, InquiryStatus::New);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_with_status_filter() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/inquiries")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("status".into(), "answered".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":{"items":[],"total":0}}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let page = InquiriesApi::new(&client)
            .list(Some(InquiryStatus::Answered), 1)
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.page, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_set_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/inquiries/3")
            .match_body(Matcher::Json(serde_json::json!({ "status": "read" })))
            .with_status(200)
            .with_body(r#"{"data":{"id":3,"name":"Ana","email":"ana@example.com","message":"hola","status":"read"}}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let updated = InquiriesApi::new(&client)
            .set_status(3, InquiryStatus::Read)
            .await
            .unwrap();
        assert_eq!(updated.status, InquiryStatus::Read);
    }
}
