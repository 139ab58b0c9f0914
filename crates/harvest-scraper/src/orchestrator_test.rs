use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use harvest_core::SelectorProfile;

use super::*;
use crate::error::TransportError;

const LISTING_PAGE: &str = r#"<html><body><ul>
    <li data-aut-id="itemBox"><span data-aut-id="itemTitle">Car Cover XL</span><span data-aut-id="itemPrice">₹499</span></li>
    <li data-aut-id="itemBox"><span data-aut-id="itemTitle">Car Cover M</span></li>
</ul></body></html>"#;

const EMPTY_PAGE: &str = "<html><body><div id=\"app\"></div></body></html>";

/// A tier that replays canned responses and counts how often it was asked.
struct ScriptedTier {
    tier: Tier,
    responses: Mutex<VecDeque<Result<FetchResult, AcquisitionError>>>,
    calls: AtomicUsize,
}

impl ScriptedTier {
    fn new(tier: Tier, responses: Vec<Result<FetchResult, AcquisitionError>>) -> Self {
        Self {
            tier,
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageSource for &ScriptedTier {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn acquire(&self, url: &str) -> impl Future<Output = Result<FetchResult, AcquisitionError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected extra acquisition of {url}"));
        std::future::ready(next)
    }
}

fn page(body: &str) -> Result<FetchResult, AcquisitionError> {
    Ok(FetchResult {
        body: body.to_owned(),
        status: 200,
        final_url: "https://www.olx.in/items/q-car-cover".to_owned(),
    })
}

fn exhausted() -> Result<FetchResult, AcquisitionError> {
    Err(AcquisitionError::Exhausted {
        attempts: 3,
        last: TransportError::Status {
            status: 503,
            url: "https://www.olx.in/items/q-car-cover".to_owned(),
            retry_after_secs: None,
        },
    })
}

fn extractor() -> RecordExtractor {
    RecordExtractor::from_profile(&SelectorProfile::olx()).unwrap()
}

const TARGET: &str = "https://www.olx.in/items/q-car-cover";

#[tokio::test]
async fn primary_success_never_touches_secondary() {
    let http = ScriptedTier::new(Tier::Http, vec![page(LISTING_PAGE)]);
    let browser = ScriptedTier::new(Tier::Browser, vec![]);
    let orchestrator = Orchestrator::new(&http, &browser, extractor());

    let outcome = orchestrator.run(TARGET).await.unwrap();

    assert_eq!(outcome.tier, Tier::Http);
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].title(), "Car Cover XL");
    assert_eq!(http.calls(), 1);
    assert_eq!(browser.calls(), 0);
}

#[tokio::test]
async fn empty_primary_page_falls_back_exactly_once() {
    let http = ScriptedTier::new(Tier::Http, vec![page(EMPTY_PAGE)]);
    let browser = ScriptedTier::new(Tier::Browser, vec![page(LISTING_PAGE)]);
    let orchestrator = Orchestrator::new(&http, &browser, extractor());

    let outcome = orchestrator.run(TARGET).await.unwrap();

    assert_eq!(outcome.tier, Tier::Browser);
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(http.calls(), 1);
    assert_eq!(browser.calls(), 1);
}

#[tokio::test]
async fn primary_acquisition_failure_falls_back() {
    let http = ScriptedTier::new(Tier::Http, vec![exhausted()]);
    let browser = ScriptedTier::new(Tier::Browser, vec![page(LISTING_PAGE)]);
    let orchestrator = Orchestrator::new(&http, &browser, extractor());

    let outcome = orchestrator.run(TARGET).await.unwrap();

    assert_eq!(outcome.tier, Tier::Browser);
    assert_eq!(browser.calls(), 1);
}

#[tokio::test]
async fn both_tiers_empty_is_pipeline_failure() {
    let http = ScriptedTier::new(Tier::Http, vec![exhausted()]);
    let browser = ScriptedTier::new(Tier::Browser, vec![page(EMPTY_PAGE)]);
    let orchestrator = Orchestrator::new(&http, &browser, extractor());

    let err = orchestrator.run(TARGET).await.unwrap_err();

    assert_eq!(err.target, TARGET);
    assert!(matches!(
        err.primary,
        TierFailure::Acquisition(AcquisitionError::Exhausted { attempts: 3, .. })
    ));
    assert!(matches!(err.secondary, TierFailure::NoRecords));
    assert!(!err.secondary_unavailable());
    assert_eq!(browser.calls(), 1);
}

#[tokio::test]
async fn missing_browser_is_reported_as_unavailable() {
    let http = ScriptedTier::new(Tier::Http, vec![page(EMPTY_PAGE)]);
    let browser = ScriptedTier::new(
        Tier::Browser,
        vec![Err(AcquisitionError::EngineUnavailable(
            "no Chrome installation found".to_owned(),
        ))],
    );
    let orchestrator = Orchestrator::new(&http, &browser, extractor());

    let err = orchestrator.run(TARGET).await.unwrap_err();

    assert!(matches!(err.primary, TierFailure::NoRecords));
    assert!(err.secondary_unavailable());
    assert!(err.to_string().contains("no Chrome installation found"));
}
