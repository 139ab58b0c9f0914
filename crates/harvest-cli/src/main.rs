mod output;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use harvest_core::{AppConfig, SelectorProfile};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "harvest")]
#[command(about = "Collect classified listings into a JSON results file")]
struct Cli {
    /// Search results URL (page 1). Overrides `HARVEST_SEARCH_URL`.
    #[arg(long)]
    url: Option<String>,

    /// Search label recorded in the output. Without `--url`, also selects the
    /// OLX search for this query.
    #[arg(long)]
    query: Option<String>,

    #[arg(long)]
    max_pages: Option<u32>,

    #[arg(long)]
    output: Option<PathBuf>,

    /// Selector profile YAML. Defaults to the built-in OLX profile.
    #[arg(long)]
    selectors: Option<PathBuf>,

    /// Never fall back to the headless browser.
    #[arg(long)]
    no_browser: bool,

    /// Print the resolved configuration and exit without network access.
    #[arg(long)]
    dry_run: bool,
}

/// OLX search URL for a free-text query, e.g. `car cover` ->
/// `https://www.olx.in/items/q-car-cover`.
fn olx_search_url(query: &str) -> String {
    let slug = query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    format!("https://www.olx.in/items/q-{slug}")
}

fn apply_overrides(mut config: AppConfig, cli: &Cli) -> anyhow::Result<AppConfig> {
    if let Some(query) = cli.query.as_deref().map(str::trim) {
        anyhow::ensure!(!query.is_empty(), "--query must not be blank");
        config.search_query = query.to_owned();
        if cli.url.is_none() {
            config.search_url = olx_search_url(query);
        }
    }
    if let Some(url) = &cli.url {
        harvest_scraper::fetcher::parse_target(url)?;
        config.search_url.clone_from(url);
    }
    if let Some(max_pages) = cli.max_pages {
        anyhow::ensure!(max_pages > 0, "--max-pages must be at least 1");
        config.max_pages = max_pages;
    }
    if let Some(output) = &cli.output {
        config.output_path.clone_from(output);
    }
    if let Some(selectors) = &cli.selectors {
        config.selectors_path = Some(selectors.clone());
    }
    if cli.no_browser {
        config.browser_enabled = false;
    }
    Ok(config)
}

fn load_profile(config: &AppConfig) -> anyhow::Result<SelectorProfile> {
    match &config.selectors_path {
        Some(path) => harvest_core::load_selector_profile(path)
            .with_context(|| format!("loading selector profile {}", path.display())),
        None => Ok(SelectorProfile::olx()),
    }
}

fn print_dry_run(config: &AppConfig, profile: &SelectorProfile) {
    println!("dry-run: no requests will be sent");
    println!("  search url:    {}", config.search_url);
    println!("  search query:  {}", config.search_query);
    println!("  max pages:     {}", config.max_pages);
    println!("  max attempts:  {}", config.max_attempts);
    println!("  output:        {}", config.output_path.display());
    println!(
        "  browser:       {}",
        if config.browser_enabled { "fallback enabled" } else { "disabled" }
    );
    println!(
        "  selectors:     {} ({} container rules)",
        config
            .selectors_path
            .as_ref()
            .map_or_else(|| "built-in OLX profile".to_owned(), |p| p.display().to_string()),
        profile.containers.len()
    );
    for (field, rules) in profile.fields.named() {
        let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        println!("    {field:<12} [{}]", names.join(", "));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = harvest_core::load_app_config().context("loading configuration")?;
    let config = apply_overrides(config, &cli)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let profile = load_profile(&config)?;

    if cli.dry_run {
        print_dry_run(&config, &profile);
        return Ok(ExitCode::SUCCESS);
    }

    run::run_harvest(&config, &profile).await
}
