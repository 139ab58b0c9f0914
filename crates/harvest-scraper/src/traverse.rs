//! Multi-page traversal over a search listing.

use std::time::Duration;

use harvest_core::{AppConfig, ListingRecord, PageSummary};

use crate::backoff::random_jitter;
use crate::error::{AcquisitionError, PipelineFailed, TierFailure};
use crate::fetcher::page_url;
use crate::orchestrator::{Orchestrator, PageSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalOptions {
    /// `0` is treated as `1`.
    pub max_pages: u32,
    /// Pause between consecutive pages.
    pub page_delay: Duration,
    pub jitter_max: Duration,
    /// Capacity hint for the collected listings.
    pub expected_per_page: usize,
}

impl TraversalOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            page_delay: Duration::from_millis(config.request_delay_ms),
            jitter_max: Duration::from_millis(config.jitter_max_ms),
            expected_per_page: config.expected_per_page,
        }
    }
}

/// Listings from every page that produced any, in page order.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub pages: Vec<PageSummary>,
    pub listings: Vec<ListingRecord>,
}

impl<P: PageSource, S: PageSource> Orchestrator<P, S> {
    /// Runs the pipeline over page 1 to `max_pages` of `search_url`.
    ///
    /// Page 1 must succeed. A later page that fails or yields nothing ends the
    /// traversal; listings gathered so far are kept.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineFailed`] if page 1 produced no listings from either
    /// tier, or if `search_url` cannot be turned into page URLs.
    pub async fn run_pages(
        &self,
        search_url: &str,
        options: &TraversalOptions,
    ) -> Result<HarvestReport, PipelineFailed> {
        let max_pages = options.max_pages.max(1);
        let mut report = HarvestReport {
            pages: Vec::new(),
            listings: Vec::with_capacity(listing_capacity(options.expected_per_page, max_pages)),
        };

        for page in 1..=max_pages {
            let url = page_url(search_url, page).map_err(|e| invalid_search_url(search_url, e))?;

            if page > 1 {
                let pause = options.page_delay + random_jitter(options.jitter_max);
                tracing::debug!(page, delay_ms = pause.as_millis(), "pausing between pages");
                tokio::time::sleep(pause).await;
            }

            let outcome = match self.run(&url).await {
                Ok(outcome) => outcome,
                Err(failed) if page == 1 => return Err(failed),
                Err(failed) => {
                    tracing::info!(page, error = %failed, "stopping traversal at failed page");
                    break;
                }
            };

            tracing::info!(
                page,
                tier = %outcome.tier,
                records = outcome.records.len(),
                "page harvested"
            );
            report.pages.push(PageSummary {
                page,
                url: outcome.final_url,
                tier: outcome.tier,
                records: outcome.records.len(),
            });
            report.listings.extend(outcome.records);
        }

        tracing::info!(
            pages = report.pages.len(),
            listings = report.listings.len(),
            "traversal complete"
        );
        Ok(report)
    }
}

/// Upper bound on listings reserved up front; the per-page hint is never
/// trusted beyond this.
const MAX_PREALLOCATED_LISTINGS: usize = 1_024;

fn listing_capacity(expected_per_page: usize, max_pages: u32) -> usize {
    let pages = usize::try_from(max_pages).unwrap_or(usize::MAX);
    expected_per_page
        .saturating_mul(pages)
        .min(MAX_PREALLOCATED_LISTINGS)
}

fn invalid_search_url(search_url: &str, err: AcquisitionError) -> PipelineFailed {
    PipelineFailed {
        target: search_url.to_owned(),
        primary: TierFailure::Acquisition(err),
        secondary: TierFailure::Acquisition(AcquisitionError::InvalidTarget {
            url: search_url.to_owned(),
            reason: "browser tier not attempted".to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::Mutex;

    use harvest_core::{SelectorProfile, Tier};

    use super::*;
    use crate::extract::RecordExtractor;
    use crate::types::FetchResult;

    /// Serves pages by URL and records every URL it was asked for.
    struct PageMap {
        tier: Tier,
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl PageMap {
        fn new(tier: Tier, pages: &[(&str, String)]) -> Self {
            Self {
                tier,
                pages: pages
                    .iter()
                    .map(|(url, body)| ((*url).to_owned(), body.clone()))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl PageSource for &PageMap {
        fn tier(&self) -> Tier {
            self.tier
        }

        fn acquire(
            &self,
            url: &str,
        ) -> impl Future<Output = Result<FetchResult, AcquisitionError>> {
            self.requested.lock().unwrap().push(url.to_owned());
            let result = match self.pages.get(url) {
                Some(body) => Ok(FetchResult {
                    body: body.clone(),
                    status: 200,
                    final_url: url.to_owned(),
                }),
                None => Err(AcquisitionError::EngineUnavailable("no page".to_owned())),
            };
            std::future::ready(result)
        }
    }

    fn listings(titles: &[&str]) -> String {
        let items: String = titles
            .iter()
            .map(|t| {
                format!(r#"<li data-aut-id="itemBox"><span data-aut-id="itemTitle">{t}</span></li>"#)
            })
            .collect();
        format!("<html><body><ul>{items}</ul></body></html>")
    }

    fn options(max_pages: u32) -> TraversalOptions {
        TraversalOptions {
            max_pages,
            page_delay: Duration::ZERO,
            jitter_max: Duration::ZERO,
            expected_per_page: 40,
        }
    }

    const SEARCH: &str = "https://www.olx.in/items/q-car-cover";

    fn extractor() -> RecordExtractor {
        RecordExtractor::from_profile(&SelectorProfile::olx()).unwrap()
    }

    #[tokio::test]
    async fn collects_pages_in_order() {
        let http = PageMap::new(
            Tier::Http,
            &[
                (SEARCH, listings(&["A", "B"])),
                ("https://www.olx.in/items/q-car-cover?page=2", listings(&["C"])),
            ],
        );
        let browser = PageMap::new(Tier::Browser, &[]);
        let orchestrator = Orchestrator::new(&http, &browser, extractor());

        let report = orchestrator.run_pages(SEARCH, &options(2)).await.unwrap();

        let titles: Vec<&str> = report.listings.iter().map(ListingRecord::title).collect();
        assert_eq!(titles, ["A", "B", "C"]);
        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.pages[0].page, 1);
        assert_eq!(report.pages[1].records, 1);
        assert!(browser.requested().is_empty());
    }

    #[tokio::test]
    async fn stops_at_first_page_without_listings() {
        let http = PageMap::new(
            Tier::Http,
            &[
                (SEARCH, listings(&["A"])),
                ("https://www.olx.in/items/q-car-cover?page=2", listings(&[])),
                ("https://www.olx.in/items/q-car-cover?page=3", listings(&["never"])),
            ],
        );
        let browser = PageMap::new(Tier::Browser, &[]);
        let orchestrator = Orchestrator::new(&http, &browser, extractor());

        let report = orchestrator.run_pages(SEARCH, &options(3)).await.unwrap();

        assert_eq!(report.listings.len(), 1);
        assert_eq!(report.pages.len(), 1);
        assert_eq!(http.requested().len(), 2);
        assert_eq!(
            browser.requested(),
            ["https://www.olx.in/items/q-car-cover?page=2"]
        );
    }

    #[tokio::test]
    async fn first_page_failure_fails_the_run() {
        let http = PageMap::new(Tier::Http, &[(SEARCH, listings(&[]))]);
        let browser = PageMap::new(Tier::Browser, &[]);
        let orchestrator = Orchestrator::new(&http, &browser, extractor());

        let err = orchestrator
            .run_pages(SEARCH, &options(3))
            .await
            .unwrap_err();

        assert!(matches!(err.primary, TierFailure::NoRecords));
        assert_eq!(http.requested().len(), 1);
    }

    #[test]
    fn listing_capacity_is_bounded() {
        assert_eq!(listing_capacity(40, 3), 120);
        assert_eq!(listing_capacity(usize::MAX / 2, 3), MAX_PREALLOCATED_LISTINGS);
        assert_eq!(listing_capacity(0, 3), 0);
    }

    #[tokio::test]
    async fn oversized_capacity_hint_does_not_abort_traversal() {
        let http = PageMap::new(Tier::Http, &[(SEARCH, listings(&["A", "B"]))]);
        let browser = PageMap::new(Tier::Browser, &[]);
        let orchestrator = Orchestrator::new(&http, &browser, extractor());
        let options = TraversalOptions {
            expected_per_page: usize::MAX / 2,
            ..options(1)
        };

        let report = orchestrator.run_pages(SEARCH, &options).await.unwrap();

        assert_eq!(report.listings.len(), 2);
    }

    #[tokio::test]
    async fn zero_max_pages_still_fetches_first_page() {
        let http = PageMap::new(Tier::Http, &[(SEARCH, listings(&["only"]))]);
        let browser = PageMap::new(Tier::Browser, &[]);
        let orchestrator = Orchestrator::new(&http, &browser, extractor());

        let report = orchestrator.run_pages(SEARCH, &options(0)).await.unwrap();

        assert_eq!(report.listings.len(), 1);
        assert_eq!(http.requested(), [SEARCH]);
    }
}
