use std::path::PathBuf;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Tuning values for one harvest run, read once at startup.
///
/// Constructed by [`crate::load_app_config`] and passed by reference into the
/// fetcher, browser engine, and orchestrator. Nothing re-reads the
/// environment after this is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub search_url: String,
    pub search_query: String,
    pub log_level: String,
    pub output_path: PathBuf,
    /// Optional YAML selector profile; the built-in OLX profile is used when unset.
    pub selectors_path: Option<PathBuf>,

    /// Base delay for backoff (`request_delay_ms * 2^retry`) and the pause between pages.
    pub request_delay_ms: u64,
    /// Total network attempts per fetch, first try included. Always `>= 1`.
    pub max_attempts: u32,
    pub request_timeout_secs: u64,
    pub max_backoff_ms: u64,
    /// Upper bound of the random delay slept before every attempt.
    pub jitter_max_ms: u64,
    pub user_agent: String,

    pub max_pages: u32,
    /// Sizing hint only; never enforced.
    pub expected_per_page: usize,

    pub browser_enabled: bool,
    pub chrome_path: Option<PathBuf>,
    pub browser_timeout_secs: u64,
    pub browser_settle_ms: u64,
}
