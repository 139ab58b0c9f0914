//! Selector profiles: the site-specific markup knowledge, kept as data.
//!
//! Class names and attribute markers on classifieds sites change between
//! deployments. A profile lists, per field, every variant that has been
//! observed, in priority order. The scraper compiles a profile into CSS
//! selectors once at startup and walks each list until one rule yields a
//! value.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// How a rule finds candidate elements inside a subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    /// Element carrying a stable attribute marker, e.g. `span[data-aut-id="itemTitle"]`.
    Marker {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
        attr: String,
        value: String,
    },
    /// Element carrying a CSS class token, e.g. `span._89yzn`.
    ClassToken {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
        class: String,
    },
    /// Any element of the given tag.
    Tag { tag: String },
    /// Element of the given tag whose text contains one of `needles`
    /// (case-insensitive).
    TextContains { tag: String, needles: Vec<String> },
}

/// What a rule reads from the element it found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Read {
    /// Whitespace-normalized text content.
    #[default]
    Text,
    /// First non-empty attribute among the listed names, in order.
    Attr(Vec<String>),
}

/// One named extraction rule for a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySpec {
    pub name: String,
    pub locate: Locator,
    #[serde(default)]
    pub read: Read,
}

/// One named rule for finding listing containers on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRule {
    pub name: String,
    pub locate: Locator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRules {
    pub title: Vec<StrategySpec>,
    #[serde(default)]
    pub price: Vec<StrategySpec>,
    #[serde(default)]
    pub location: Vec<StrategySpec>,
    #[serde(default)]
    pub url: Vec<StrategySpec>,
    #[serde(default)]
    pub image_url: Vec<StrategySpec>,
    #[serde(default)]
    pub posted_date: Vec<StrategySpec>,
}

impl FieldRules {
    /// All field lists paired with their field name, in extraction order.
    #[must_use]
    pub fn named(&self) -> [(&'static str, &[StrategySpec]); 6] {
        [
            ("title", &self.title),
            ("price", &self.price),
            ("location", &self.location),
            ("url", &self.url),
            ("image_url", &self.image_url),
            ("posted_date", &self.posted_date),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorProfile {
    /// Origin used to resolve relative links and image paths.
    pub site_origin: String,
    pub containers: Vec<ContainerRule>,
    pub fields: FieldRules,
}

fn marker(tag: Option<&str>, attr: &str, value: &str) -> Locator {
    Locator::Marker {
        tag: tag.map(str::to_owned),
        attr: attr.to_owned(),
        value: value.to_owned(),
    }
}

fn class_token(tag: &str, class: &str) -> Locator {
    Locator::ClassToken {
        tag: Some(tag.to_owned()),
        class: class.to_owned(),
    }
}

fn rule(name: &str, locate: Locator, read: Read) -> StrategySpec {
    StrategySpec {
        name: name.to_owned(),
        locate,
        read,
    }
}

impl SelectorProfile {
    /// The selectors observed on OLX India results pages.
    ///
    /// `data-aut-id` markers are the most stable, with `data-marker` as the
    /// alternate attribute some builds emit. The obfuscated class tokens
    /// (`_1ONnP`, `_89yzn`) come from an older build and act as fallbacks.
    #[must_use]
    pub fn olx() -> Self {
        Self {
            site_origin: "https://www.olx.in".to_owned(),
            containers: vec![
                ContainerRule {
                    name: "item-box-marker".to_owned(),
                    locate: marker(None, "data-aut-id", "itemBox"),
                },
                ContainerRule {
                    name: "item-box-class".to_owned(),
                    locate: class_token("div", "_1ONnP"),
                },
            ],
            fields: FieldRules {
                title: vec![
                    rule(
                        "title-marker",
                        marker(Some("span"), "data-aut-id", "itemTitle"),
                        Read::Text,
                    ),
                    rule(
                        "title-data-marker",
                        marker(Some("span"), "data-marker", "itemTitle"),
                        Read::Text,
                    ),
                    rule(
                        "title-heading",
                        Locator::Tag {
                            tag: "h2".to_owned(),
                        },
                        Read::Text,
                    ),
                ],
                price: vec![
                    rule(
                        "price-marker",
                        marker(Some("span"), "data-aut-id", "itemPrice"),
                        Read::Text,
                    ),
                    rule(
                        "price-data-marker",
                        marker(Some("span"), "data-marker", "itemPrice"),
                        Read::Text,
                    ),
                    rule("price-class", class_token("span", "_89yzn"), Read::Text),
                ],
                location: vec![rule(
                    "location-marker",
                    marker(Some("span"), "data-aut-id", "item-location"),
                    Read::Text,
                )],
                url: vec![rule(
                    "first-link",
                    Locator::Tag {
                        tag: "a".to_owned(),
                    },
                    Read::Attr(vec!["href".to_owned()]),
                )],
                image_url: vec![rule(
                    "first-image",
                    Locator::Tag {
                        tag: "img".to_owned(),
                    },
                    Read::Attr(vec!["src".to_owned(), "data-src".to_owned()]),
                )],
                posted_date: vec![rule(
                    "relative-date-text",
                    Locator::TextContains {
                        tag: "span".to_owned(),
                        needles: vec!["day".to_owned(), "hour".to_owned(), "today".to_owned()],
                    },
                    Read::Text,
                )],
            },
        }
    }
}

/// Load and validate a selector profile from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_selector_profile(path: &Path) -> Result<SelectorProfile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SelectorFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let profile: SelectorProfile =
        serde_yaml::from_str(&content).map_err(ConfigError::SelectorFileParse)?;

    validate_profile(&profile)?;

    Ok(profile)
}

fn validate_profile(profile: &SelectorProfile) -> Result<(), ConfigError> {
    let origin = profile.site_origin.trim();
    if !(origin.starts_with("http://") || origin.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "site_origin '{}' must be an absolute http(s) URL",
            profile.site_origin
        )));
    }

    if profile.containers.is_empty() {
        return Err(ConfigError::Validation(
            "at least one container rule is required".to_string(),
        ));
    }
    for container in &profile.containers {
        validate_locator(&container.name, &container.locate)?;
    }

    if profile.fields.title.is_empty() {
        return Err(ConfigError::Validation(
            "at least one title rule is required".to_string(),
        ));
    }

    for (field, rules) in profile.fields.named() {
        for spec in rules {
            validate_locator(&spec.name, &spec.locate)?;
            if let Read::Attr(attrs) = &spec.read {
                if attrs.iter().all(|a| a.trim().is_empty()) {
                    return Err(ConfigError::Validation(format!(
                        "{field} rule '{}' reads attributes but lists none",
                        spec.name
                    )));
                }
            }
        }
    }

    Ok(())
}

fn validate_locator(name: &str, locate: &Locator) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "rule name must be non-empty".to_string(),
        ));
    }

    let blank = |s: &str| s.trim().is_empty();
    let problem = match locate {
        Locator::Marker { attr, value, .. } if blank(attr) || blank(value) => {
            Some("marker needs both attr and value")
        }
        Locator::ClassToken { class, .. } if blank(class) => Some("class_token needs a class"),
        Locator::Tag { tag } if blank(tag) => Some("tag needs a tag name"),
        Locator::TextContains { tag, needles }
            if blank(tag) || needles.iter().all(|n| blank(n)) =>
        {
            Some("text_contains needs a tag and at least one needle")
        }
        _ => None,
    };

    match problem {
        Some(reason) => Err(ConfigError::Validation(format!("rule '{name}': {reason}"))),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "selectors_test.rs"]
mod tests;
