pub mod app_config;
pub mod config;
pub mod listing;
pub mod selectors;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use listing::{ListingRecord, PageSummary, ResultEnvelope, Tier};
pub use selectors::{
    load_selector_profile, ContainerRule, FieldRules, Locator, Read, SelectorProfile,
    StrategySpec,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read selector profile {path}: {source}")]
    SelectorFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse selector profile: {0}")]
    SelectorFileParse(#[source] serde_yaml::Error),

    #[error("selector profile validation failed: {0}")]
    Validation(String),
}
