use std::time::Duration;

/// Markup obtained by one successful acquisition.
///
/// Only ever built from a complete response; failed attempts produce an
/// error instead of a partially filled value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub body: String,
    /// HTTP status of the final response. The browser tier reports `200`.
    pub status: u16,
    /// URL after redirects (or the tab's final location).
    pub final_url: String,
}

/// Bookkeeping for one attempt inside a single fetch. Lives only for the
/// duration of the retry loop and is used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionAttempt {
    /// 1-based attempt number.
    pub number: u32,
    pub max_attempts: u32,
    /// Exponential backoff slept before this attempt (zero for the first).
    pub backoff: Duration,
    /// Random delay slept before this attempt, on top of `backoff`.
    pub jitter: Duration,
}

impl AcquisitionAttempt {
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.number >= self.max_attempts
    }
}
