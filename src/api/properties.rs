// Property listings

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{Envelope, Page};
use crate::error::{ApiError, Result};
use crate::http_client::ApiHttpClient;

/// Listing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Sale,
    Rent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub operation: Operation,
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    /// Source item when imported from MercadoLibre
    #[serde(default)]
    pub mercadolibre_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Body for creating or updating a property (admin)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInput {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub operation: Operation,
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    pub images: Vec<String>,
    pub featured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mercadolibre_id: Option<String>,
}

/// Search filters for `GET /properties`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl PropertyQuery {
    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(ApiError::ValidationError(format!(
                    "minPrice ({}) exceeds maxPrice ({})",
                    min, max
                )));
            }
        }
        if self.page == Some(0) {
            return Err(ApiError::ValidationError(
                "page starts at 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Property endpoints
pub struct PropertiesApi<'a> {
    http: &'a ApiHttpClient,
}

impl<'a> PropertiesApi<'a> {
    pub fn new(http: &'a ApiHttpClient) -> Self {
        Self { http }
    }

    /// Search listings
    pub async fn list(&self, query: &PropertyQuery) -> Result<Page<Property>> {
        query.validate()?;
        let envelope: Envelope<Page<Property>> =
            self.http.get_json_with_query("/properties", query).await?;
        Ok(envelope.data)
    }

    pub async fn get(&self, id: i64) -> Result<Property> {
        let envelope: Envelope<Property> =
            self.http.get_json(&format!("/properties/{}", id)).await?;
        Ok(envelope.data)
    }

    pub async fn create(&self, input: &PropertyInput) -> Result<Property> {
        let envelope: Envelope<Property> = self
            .http
            .send_json(Method::POST, "/properties", input)
            .await?;
        tracing::info!("Created property {}", envelope.data.id);
        Ok(envelope.data)
    }

    pub async fn update(&self, id: i64, input: &PropertyInput) -> Result<Property> {
        let envelope: Envelope<Property> = self
            .http
            .send_json(Method::PUT, &format!("/properties/{}", id), input)
            .await?;
        Ok(envelope.data)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.http.delete(&format!("/properties/{}", id)).await?;
        tracing::info!("Deleted property {}", id);
        Ok(())
    }
}
