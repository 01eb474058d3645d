// Typed endpoints of the listings backend

mod blog;
mod inquiries;
mod properties;

use serde::Deserialize;

pub use blog::{BlogApi, BlogPost};
pub use inquiries::{InquiriesApi, Inquiry, InquiryStatus, NewInquiry};
pub use properties::{Operation, PropertiesApi, Property, PropertyInput, PropertyQuery};

/// Every backend response wraps its payload in `data`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Paginated list payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

fn default_page() -> u32 {
    1
}
