//! Secondary acquisition tier: headless Chrome rendering.
//!
//! Used only when the HTTP tier produced nothing. Every [`BrowserEngine::render`]
//! call launches its own browser process inside a blocking task and drops it
//! before the task returns, so the process is torn down on every exit path.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use harvest_core::AppConfig;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::error::AcquisitionError;
use crate::fetcher::parse_target;
use crate::types::FetchResult;

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
    pub enabled: bool,
    /// Explicit executable; when `None` the usual install locations are searched.
    pub chrome_path: Option<PathBuf>,
    pub user_agent: String,
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Bound on navigation and on waiting for listings to appear.
    pub timeout: Duration,
    /// Extra time given to client-side rendering after the page loads.
    pub settle: Duration,
    /// CSS selector that signals listings have rendered.
    pub wait_for: Option<String>,
}

impl BrowserSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            enabled: config.browser_enabled,
            chrome_path: config.chrome_path.clone(),
            user_agent: config.user_agent.clone(),
            headless: true,
            window_size: (1920, 1080),
            timeout: Duration::from_secs(config.browser_timeout_secs),
            settle: Duration::from_millis(config.browser_settle_ms),
            wait_for: None,
        }
    }

    #[must_use]
    pub fn wait_for(mut self, selector: Option<&str>) -> Self {
        self.wait_for = selector.map(str::to_owned);
        self
    }
}

pub struct BrowserEngine {
    settings: BrowserSettings,
}

impl BrowserEngine {
    #[must_use]
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    /// Finds the Chrome/Chromium executable this engine would launch.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::EngineUnavailable`] if the engine is
    /// disabled, the configured path does not exist, or no browser is
    /// installed in any known location.
    pub fn locate_executable(&self) -> Result<PathBuf, AcquisitionError> {
        if !self.settings.enabled {
            return Err(AcquisitionError::EngineUnavailable(
                "disabled by configuration".to_owned(),
            ));
        }
        match &self.settings.chrome_path {
            Some(path) if path.exists() => Ok(path.clone()),
            Some(path) => Err(AcquisitionError::EngineUnavailable(format!(
                "configured browser {} does not exist",
                path.display()
            ))),
            None => headless_chrome::browser::default_executable()
                .map_err(AcquisitionError::EngineUnavailable),
        }
    }

    /// Renders `target` in a fresh headless browser and returns the final DOM.
    ///
    /// # Errors
    ///
    /// - [`AcquisitionError::InvalidTarget`] for a malformed URL.
    /// - [`AcquisitionError::EngineUnavailable`] if no browser can be found or
    ///   launched.
    /// - [`AcquisitionError::Render`] if navigation or DOM extraction fails.
    pub async fn render(&self, target: &str) -> Result<FetchResult, AcquisitionError> {
        let url = parse_target(target)?.to_string();
        let executable = self.locate_executable()?;
        let settings = self.settings.clone();

        tracing::info!(
            url = %url,
            browser = %executable.display(),
            "rendering page in headless browser"
        );

        tokio::task::spawn_blocking(move || render_blocking(&executable, &settings, &url))
            .await
            .map_err(|e| AcquisitionError::Render(format!("render task failed: {e}")))?
    }
}

fn render_err(stage: &str, err: impl std::fmt::Display) -> AcquisitionError {
    AcquisitionError::Render(format!("{stage}: {err}"))
}

fn launch(executable: &Path, settings: &BrowserSettings) -> Result<Browser, AcquisitionError> {
    let user_agent_arg = format!("--user-agent={}", settings.user_agent);
    let args: Vec<&OsStr> = vec![
        OsStr::new("--disable-blink-features=AutomationControlled"),
        OsStr::new("--disable-dev-shm-usage"),
        OsStr::new("--no-sandbox"),
        OsStr::new(&user_agent_arg),
    ];

    let options = LaunchOptions::default_builder()
        .path(Some(executable.to_path_buf()))
        .headless(settings.headless)
        .sandbox(false)
        .window_size(Some(settings.window_size))
        .idle_browser_timeout(settings.timeout.saturating_mul(2))
        .args(args)
        .build()
        .map_err(|e| AcquisitionError::EngineUnavailable(format!("invalid launch options: {e}")))?;

    Browser::new(options)
        .map_err(|e| AcquisitionError::EngineUnavailable(format!("failed to launch browser: {e}")))
}

/// One action against the rendering tab, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RenderStep {
    /// Registers the automation-hiding overrides as on-new-document scripts.
    /// Must run before `Navigate` so page scripts never observe
    /// `navigator.webdriver`.
    Stealth,
    UserAgent,
    Navigate,
    WaitFor(String),
    Scroll,
    Settle(Duration),
}

fn render_plan(settings: &BrowserSettings) -> Vec<RenderStep> {
    let mut plan = vec![
        RenderStep::Stealth,
        RenderStep::UserAgent,
        RenderStep::Navigate,
    ];
    if let Some(selector) = &settings.wait_for {
        plan.push(RenderStep::WaitFor(selector.clone()));
    }
    plan.push(RenderStep::Scroll);
    if !settings.settle.is_zero() {
        plan.push(RenderStep::Settle(settings.settle));
    }
    plan
}

fn run_step(
    tab: &Tab,
    step: &RenderStep,
    settings: &BrowserSettings,
    url: &str,
) -> Result<(), AcquisitionError> {
    match step {
        RenderStep::Stealth => {
            if let Err(e) = tab.enable_stealth_mode() {
                tracing::debug!(error = %e, "stealth overrides not installed");
            }
        }
        RenderStep::UserAgent => {
            tab.set_user_agent(&settings.user_agent, Some("en-US,en;q=0.9"), None)
                .map_err(|e| render_err("set user agent", e))?;
        }
        RenderStep::Navigate => {
            tab.navigate_to(url)
                .map_err(|e| render_err("navigate", e))?
                .wait_until_navigated()
                .map_err(|e| render_err("wait for navigation", e))?;
        }
        RenderStep::WaitFor(selector) => {
            if let Err(e) = tab.wait_for_element_with_custom_timeout(selector, settings.timeout) {
                tracing::warn!(
                    selector = selector.as_str(),
                    error = %e,
                    "listings did not appear before timeout; reading DOM anyway"
                );
            }
        }
        RenderStep::Scroll => {
            if let Err(e) = tab.evaluate(SCROLL_SCRIPT, false) {
                tracing::debug!(error = %e, "scroll for lazy content failed");
            }
        }
        RenderStep::Settle(pause) => std::thread::sleep(*pause),
    }
    Ok(())
}

/// Runs on a blocking thread. `browser` is dropped when this returns, which
/// terminates the Chrome process whether rendering succeeded or not.
fn render_blocking(
    executable: &Path,
    settings: &BrowserSettings,
    url: &str,
) -> Result<FetchResult, AcquisitionError> {
    let browser = launch(executable, settings)?;
    let tab = browser.new_tab().map_err(|e| render_err("open tab", e))?;
    tab.set_default_timeout(settings.timeout);

    for step in render_plan(settings) {
        run_step(&tab, &step, settings, url)?;
    }

    let body = tab.get_content().map_err(|e| render_err("read DOM", e))?;
    let final_url = tab.get_url();

    Ok(FetchResult {
        body,
        status: 200,
        final_url,
    })
}
