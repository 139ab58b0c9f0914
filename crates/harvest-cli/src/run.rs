//! The single harvest command: wire the tiers, traverse pages, persist.

use std::process::ExitCode;

use harvest_core::{AppConfig, ResultEnvelope, SelectorProfile};
use harvest_scraper::{
    BrowserEngine, BrowserSettings, Fetcher, Orchestrator, PipelineFailed, RecordExtractor,
    TierFailure, TraversalOptions,
};

use crate::output::write_envelope;

/// Runs one harvest and writes the results file.
///
/// Returns exit code 1 (after printing a failure banner) when no listings
/// could be obtained; nothing is written in that case.
///
/// # Errors
///
/// Returns an error if the profile does not compile, the HTTP client cannot
/// be built, or the results file cannot be written.
pub(crate) async fn run_harvest(
    config: &AppConfig,
    profile: &SelectorProfile,
) -> anyhow::Result<ExitCode> {
    let extractor = RecordExtractor::from_profile(profile)?;
    let settings =
        BrowserSettings::from_config(config).wait_for(extractor.primary_container_css());
    let fetcher = Fetcher::from_config(config)?;
    let orchestrator = Orchestrator::new(fetcher, BrowserEngine::new(settings), extractor);

    tracing::info!(
        url = %config.search_url,
        max_pages = config.max_pages,
        browser_enabled = config.browser_enabled,
        "starting harvest"
    );

    let report = match orchestrator
        .run_pages(&config.search_url, &TraversalOptions::from_config(config))
        .await
    {
        Ok(report) => report,
        Err(failed) => {
            eprintln!("{}", failure_banner(&failed));
            return Ok(ExitCode::from(1));
        }
    };

    let envelope = ResultEnvelope::new(
        &config.search_query,
        &config.search_url,
        report.pages,
        report.listings,
    );
    write_envelope(&config.output_path, &envelope)?;

    println!(
        "Harvest complete: {} listings from {} page(s), saved to {}",
        envelope.total_results,
        envelope.pages.len(),
        config.output_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn troubleshooting_hints(failed: &PipelineFailed) -> Vec<&'static str> {
    let mut hints = Vec::new();
    if failed.secondary_unavailable() {
        hints.push(
            "Install Chrome or Chromium (or set HARVEST_CHROME_PATH) so the browser fallback can run",
        );
    }
    if matches!(failed.primary, TierFailure::NoRecords)
        && matches!(failed.secondary, TierFailure::NoRecords)
    {
        hints.push("The page loaded but no listings matched; the site markup may have changed. Update the selector profile (--selectors)");
    }
    hints.extend([
        "Try again from a different network or through a VPN",
        "Check that the search URL opens normally in a desktop browser",
    ]);
    hints
}

fn failure_banner(failed: &PipelineFailed) -> String {
    let mut banner = format!(
        "Harvest failed: no listings could be collected.\n  target:  {}\n  http:    {}\n  browser: {}\n\nTroubleshooting suggestions:",
        failed.target, failed.primary, failed.secondary
    );
    for (i, hint) in troubleshooting_hints(failed).iter().enumerate() {
        banner.push_str(&format!("\n  {}. {hint}", i + 1));
    }
    banner
}
