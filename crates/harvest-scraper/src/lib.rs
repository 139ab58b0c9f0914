pub mod backoff;
pub mod browser;
pub mod cascade;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod orchestrator;
pub mod traverse;
pub mod types;

pub use backoff::BackoffPolicy;
pub use browser::{BrowserEngine, BrowserSettings};
pub use cascade::{Cascade, Strategy};
pub use error::{AcquisitionError, PipelineFailed, ProfileError, TierFailure, TransportError};
pub use extract::RecordExtractor;
pub use fetcher::Fetcher;
pub use orchestrator::{Orchestrator, PageSource, TierOutcome};
pub use traverse::{HarvestReport, TraversalOptions};
pub use types::{AcquisitionAttempt, FetchResult};
