//! Two-tier acquisition pipeline.
//!
//! A run moves through a fixed set of stages:
//!
//! ```text
//! Init -> PrimaryFetch -> PrimaryExtract -> Done
//!              |                |
//!              v                v
//!         SecondaryFetch -> SecondaryExtract -> Done | Failed
//! ```
//!
//! The secondary tier is entered at most once per run, and only when the
//! primary tier failed to acquire the page or extracted zero records.

use std::future::Future;

use harvest_core::{ListingRecord, Tier};

use crate::browser::BrowserEngine;
use crate::error::{AcquisitionError, PipelineFailed, TierFailure};
use crate::extract::RecordExtractor;
use crate::fetcher::Fetcher;
use crate::types::FetchResult;

/// Something that can turn a URL into page markup.
pub trait PageSource {
    fn tier(&self) -> Tier;

    fn acquire(&self, url: &str) -> impl Future<Output = Result<FetchResult, AcquisitionError>>;
}

impl PageSource for Fetcher {
    fn tier(&self) -> Tier {
        Tier::Http
    }

    fn acquire(&self, url: &str) -> impl Future<Output = Result<FetchResult, AcquisitionError>> {
        self.fetch(url)
    }
}

impl PageSource for BrowserEngine {
    fn tier(&self) -> Tier {
        Tier::Browser
    }

    fn acquire(&self, url: &str) -> impl Future<Output = Result<FetchResult, AcquisitionError>> {
        self.render(url)
    }
}

/// Records from the tier that succeeded.
#[derive(Debug, Clone)]
pub struct TierOutcome {
    pub tier: Tier,
    pub final_url: String,
    /// Never empty.
    pub records: Vec<ListingRecord>,
}

enum Stage {
    Init,
    PrimaryFetch,
    PrimaryExtract(FetchResult),
    SecondaryFetch(TierFailure),
    SecondaryExtract(TierFailure, FetchResult),
    Done(TierOutcome),
    Failed {
        primary: TierFailure,
        secondary: TierFailure,
    },
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::PrimaryFetch => "primary_fetch",
            Stage::PrimaryExtract(_) => "primary_extract",
            Stage::SecondaryFetch(_) => "secondary_fetch",
            Stage::SecondaryExtract(..) => "secondary_extract",
            Stage::Done(_) => "done",
            Stage::Failed { .. } => "failed",
        }
    }
}

/// Drives one page through the primary tier and, if needed, the secondary.
pub struct Orchestrator<P, S> {
    primary: P,
    secondary: S,
    extractor: RecordExtractor,
}

impl<P: PageSource, S: PageSource> Orchestrator<P, S> {
    #[must_use]
    pub fn new(primary: P, secondary: S, extractor: RecordExtractor) -> Self {
        Self {
            primary,
            secondary,
            extractor,
        }
    }

    #[must_use]
    pub fn extractor(&self) -> &RecordExtractor {
        &self.extractor
    }

    /// Acquires `target` and extracts its listings.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineFailed`] when neither tier produced a record. Both
    /// tier failures are preserved for diagnostics.
    pub async fn run(&self, target: &str) -> Result<TierOutcome, PipelineFailed> {
        let mut stage = Stage::Init;
        loop {
            stage = match stage {
                Stage::Init => Stage::PrimaryFetch,
                Stage::PrimaryFetch => match self.primary.acquire(target).await {
                    Ok(page) => Stage::PrimaryExtract(page),
                    Err(e) => {
                        tracing::warn!(
                            tier = %self.primary.tier(),
                            error = %e,
                            "primary tier failed"
                        );
                        Stage::SecondaryFetch(TierFailure::Acquisition(e))
                    }
                },
                Stage::PrimaryExtract(page) => match self.extract(self.primary.tier(), page) {
                    Ok(outcome) => Stage::Done(outcome),
                    Err(failure) => Stage::SecondaryFetch(failure),
                },
                Stage::SecondaryFetch(primary) => {
                    tracing::info!(
                        target_url = target,
                        tier = %self.secondary.tier(),
                        reason = %primary,
                        "falling back to secondary tier"
                    );
                    match self.secondary.acquire(target).await {
                        Ok(page) => Stage::SecondaryExtract(primary, page),
                        Err(e) => {
                            tracing::warn!(
                                tier = %self.secondary.tier(),
                                error = %e,
                                "secondary tier failed"
                            );
                            Stage::Failed {
                                primary,
                                secondary: TierFailure::Acquisition(e),
                            }
                        }
                    }
                }
                Stage::SecondaryExtract(primary, page) => {
                    match self.extract(self.secondary.tier(), page) {
                        Ok(outcome) => Stage::Done(outcome),
                        Err(secondary) => Stage::Failed { primary, secondary },
                    }
                }
                Stage::Done(outcome) => {
                    tracing::info!(
                        tier = %outcome.tier,
                        records = outcome.records.len(),
                        "page acquired"
                    );
                    return Ok(outcome);
                }
                Stage::Failed { primary, secondary } => {
                    let failed = PipelineFailed {
                        target: target.to_owned(),
                        primary,
                        secondary,
                    };
                    tracing::error!(error = %failed, "all acquisition tiers exhausted");
                    return Err(failed);
                }
            };
            tracing::debug!(stage = stage.name(), "pipeline transition");
        }
    }

    fn extract(&self, tier: Tier, page: FetchResult) -> Result<TierOutcome, TierFailure> {
        let records = self.extractor.extract_records(&page.body);
        if records.is_empty() {
            tracing::warn!(
                tier = %tier,
                url = %page.final_url,
                "tier returned a page with no listings"
            );
            return Err(TierFailure::NoRecords);
        }
        Ok(TierOutcome {
            tier,
            final_url: page.final_url,
            records,
        })
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
