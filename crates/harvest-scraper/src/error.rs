use thiserror::Error;

/// Failure of a single network attempt. Always retried by the fetcher until
/// its attempt budget runs out.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS, timeout, or body-read failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status {
        status: u16,
        url: String,
        /// Seconds from a numeric `Retry-After` header, when present.
        retry_after_secs: Option<u64>,
    },
}

impl TransportError {
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            TransportError::Status {
                retry_after_secs, ..
            } => *retry_after_secs,
            TransportError::Http(_) => None,
        }
    }
}

/// A tier could not obtain usable markup at all.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("invalid target URL \"{url}\": {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The browser engine is disabled, or no usable Chrome/Chromium was found.
    #[error("browser engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("browser rendering failed: {0}")]
    Render(String),
}

/// A selector profile could not be compiled into CSS selectors.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("rule '{rule}' produced invalid selector `{css}`: {reason}")]
    InvalidSelector {
        rule: String,
        css: String,
        reason: String,
    },

    #[error("invalid site origin \"{origin}\": {reason}")]
    InvalidOrigin { origin: String, reason: String },
}

/// Why one tier contributed nothing to a run.
#[derive(Debug, Error)]
pub enum TierFailure {
    #[error("{0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("page acquired but no listings extracted")]
    NoRecords,
}

/// Both tiers were exhausted without producing a single listing.
#[derive(Debug, Error)]
#[error("no listings from {target} (http: {primary}; browser: {secondary})")]
pub struct PipelineFailed {
    pub target: String,
    pub primary: TierFailure,
    pub secondary: TierFailure,
}

impl PipelineFailed {
    /// `true` when the browser tier never ran because it was missing or disabled.
    #[must_use]
    pub fn secondary_unavailable(&self) -> bool {
        matches!(
            self.secondary,
            TierFailure::Acquisition(AcquisitionError::EngineUnavailable(_))
        )
    }
}
