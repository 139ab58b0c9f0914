use chrono::{DateTime, Utc};
use serde::Serialize;

/// One product listing extracted from a results page.
///
/// The title is the only required field and is guaranteed non-blank: the
/// sole constructor, [`ListingRecord::new`], refuses an empty title. Optional
/// fields that were not found are omitted from serialized output entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRecord {
    title: String,
    /// Free-form currency text as displayed, e.g. `"₹ 499"`. Never parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Absolute listing URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Absolute image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Relative date text as displayed, e.g. `"2 days ago"` or `"Today"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
}

impl ListingRecord {
    /// Creates a record with only a title; returns `None` if the title is blank.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return None;
        }
        Some(Self {
            title,
            price: None,
            location: None,
            url: None,
            image_url: None,
            posted_date: None,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Which acquisition engine produced a page's markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Plain HTTP client with a spoofed browser identity.
    Http,
    /// Headless browser rendering, used only as a fallback.
    Browser,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Http => write!(f, "http"),
            Tier::Browser => write!(f, "browser"),
        }
    }
}

/// Per-page provenance recorded in the result envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub page: u32,
    pub url: String,
    pub tier: Tier,
    pub records: usize,
}

/// The document handed to persistence at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct ResultEnvelope {
    pub generated_at: DateTime<Utc>,
    pub search_query: String,
    pub source_url: String,
    pub pages: Vec<PageSummary>,
    pub total_results: usize,
    pub listings: Vec<ListingRecord>,
}

impl ResultEnvelope {
    /// Builds an envelope stamped with the current time. `total_results` is
    /// always derived from `listings`.
    #[must_use]
    pub fn new(
        search_query: &str,
        source_url: &str,
        pages: Vec<PageSummary>,
        listings: Vec<ListingRecord>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            search_query: search_query.to_owned(),
            source_url: source_url.to_owned(),
            pages,
            total_results: listings.len(),
            listings,
        }
    }
}
