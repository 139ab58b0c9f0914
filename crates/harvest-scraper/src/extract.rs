//! Record extraction: container discovery plus one cascade per field.

use harvest_core::{ListingRecord, SelectorProfile};
use reqwest::Url;
use scraper::{ElementRef, Html};

use crate::cascade::{Cascade, CompiledLocator};
use crate::error::ProfileError;
use crate::fetcher::resolve_against;

/// Turns a results page into [`ListingRecord`]s using a compiled
/// [`SelectorProfile`].
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    origin: Url,
    containers: Vec<CompiledLocator>,
    title: Cascade,
    price: Cascade,
    location: Cascade,
    url: Cascade,
    image_url: Cascade,
    posted_date: Cascade,
}

impl RecordExtractor {
    /// Compiles every selector in `profile`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::InvalidOrigin`] if the site origin does not
    /// parse, or [`ProfileError::InvalidSelector`] for the first rule that
    /// does not form valid CSS.
    pub fn from_profile(profile: &SelectorProfile) -> Result<Self, ProfileError> {
        let origin =
            Url::parse(profile.site_origin.trim()).map_err(|e| ProfileError::InvalidOrigin {
                origin: profile.site_origin.clone(),
                reason: e.to_string(),
            })?;

        let containers = profile
            .containers
            .iter()
            .map(|rule| CompiledLocator::compile(&rule.name, &rule.locate))
            .collect::<Result<Vec<_>, _>>()?;

        let fields = &profile.fields;
        Ok(Self {
            origin,
            containers,
            title: Cascade::compile(&fields.title)?,
            price: Cascade::compile(&fields.price)?,
            location: Cascade::compile(&fields.location)?,
            url: Cascade::compile(&fields.url)?,
            image_url: Cascade::compile(&fields.image_url)?,
            posted_date: Cascade::compile(&fields.posted_date)?,
        })
    }

    /// CSS of the highest-priority container rule. The browser tier waits
    /// for this to appear before reading the rendered DOM.
    #[must_use]
    pub fn primary_container_css(&self) -> Option<&str> {
        self.containers.first().map(|c| c.css.as_str())
    }

    /// Extracts every listing with a title from `markup`.
    ///
    /// The first container rule that matches at least one element is used for
    /// the whole page. Containers without a resolvable title are dropped. An
    /// empty result is a normal outcome (the page may have no listings, or the
    /// markup may have drifted past every known selector) and is logged as an
    /// extraction gap, never returned as an error.
    #[must_use]
    pub fn extract_records(&self, markup: &str) -> Vec<ListingRecord> {
        let document = Html::parse_document(markup);
        let root = document.root_element();

        let Some((rule, containers)) = self.discover_containers(root) else {
            tracing::warn!(
                rules = self.containers.len(),
                "extraction gap: no container rule matched; site markup may have changed"
            );
            return Vec::new();
        };

        let found = containers.len();
        let records: Vec<ListingRecord> = containers
            .into_iter()
            .filter_map(|container| self.extract_one(container))
            .collect();

        if records.len() < found {
            tracing::debug!(
                rule,
                containers = found,
                discarded = found - records.len(),
                "discarded containers without a title"
            );
        }
        if records.is_empty() {
            tracing::warn!(
                rule,
                containers = found,
                "extraction gap: containers found but none had a title"
            );
        } else {
            tracing::info!(rule, records = records.len(), "extracted listings");
        }

        records
    }

    fn discover_containers<'a>(
        &'a self,
        root: ElementRef<'a>,
    ) -> Option<(&'a str, Vec<ElementRef<'a>>)> {
        self.containers.iter().find_map(|rule| {
            let matched: Vec<ElementRef<'a>> = rule.find(root).collect();
            (!matched.is_empty()).then_some((rule.name.as_str(), matched))
        })
    }

    fn extract_one(&self, container: ElementRef<'_>) -> Option<ListingRecord> {
        let mut record = ListingRecord::new(self.title.extract_field(container)?)?;
        record.price = self.price.extract_field(container);
        record.location = self.location.extract_field(container);
        record.url = self
            .url
            .extract_field(container)
            .and_then(|href| resolve_against(&self.origin, &href));
        record.image_url = self
            .image_url
            .extract_field(container)
            .and_then(|src| resolve_against(&self.origin, &src));
        record.posted_date = self.posted_date.extract_field(container);
        Some(record)
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
