//! Selector cascade: ordered fallback rules for one field.
//!
//! Each rule is compiled once into a CSS [`Selector`] plus an optional text
//! filter. A cascade tries its rules in order against a subtree and stops at
//! the first rule that yields a non-empty value. Values from different rules
//! are never merged.

use harvest_core::{Locator, Read, StrategySpec};
use scraper::{ElementRef, Selector};

use crate::error::ProfileError;

/// Quotes a CSS attribute value.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// CSS selector text for a locator. Class tokens use `[class~=…]` so that
/// obfuscated class names never need identifier escaping.
pub(crate) fn locator_css(locate: &Locator) -> String {
    match locate {
        Locator::Marker { tag, attr, value } => format!(
            "{}[{}={}]",
            tag.as_deref().unwrap_or_default(),
            attr.trim(),
            quote(value)
        ),
        Locator::ClassToken { tag, class } => format!(
            "{}[class~={}]",
            tag.as_deref().unwrap_or_default(),
            quote(class.trim())
        ),
        Locator::Tag { tag } | Locator::TextContains { tag, .. } => tag.trim().to_owned(),
    }
}

/// Whitespace-normalized text content of an element.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A locator compiled to a selector, shared by container and field rules.
#[derive(Debug, Clone)]
pub(crate) struct CompiledLocator {
    pub(crate) name: String,
    pub(crate) css: String,
    selector: Selector,
    /// Lowercased needles; empty means no text filter.
    needles: Vec<String>,
}

impl CompiledLocator {
    pub(crate) fn compile(name: &str, locate: &Locator) -> Result<Self, ProfileError> {
        let css = locator_css(locate);
        let selector = Selector::parse(&css).map_err(|e| ProfileError::InvalidSelector {
            rule: name.to_owned(),
            css: css.clone(),
            reason: e.to_string(),
        })?;
        let needles = match locate {
            Locator::TextContains { needles, .. } => needles
                .iter()
                .map(|n| n.trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
            _ => Vec::new(),
        };
        Ok(Self {
            name: name.to_owned(),
            css,
            selector,
            needles,
        })
    }

    fn accepts(&self, element: ElementRef<'_>) -> bool {
        if self.needles.is_empty() {
            return true;
        }
        let text = element_text(element).to_lowercase();
        self.needles.iter().any(|n| text.contains(n.as_str()))
    }

    /// Descendants of `scope` matching this locator, in document order.
    pub(crate) fn find<'a>(
        &'a self,
        scope: ElementRef<'a>,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        scope.select(&self.selector).filter(|el| self.accepts(*el))
    }
}

/// One compiled extraction rule.
#[derive(Debug, Clone)]
pub struct Strategy {
    locator: CompiledLocator,
    read: Read,
}

impl Strategy {
    /// # Errors
    ///
    /// Returns [`ProfileError::InvalidSelector`] if the rule's locator does
    /// not form a valid CSS selector.
    pub fn compile(spec: &StrategySpec) -> Result<Self, ProfileError> {
        Ok(Self {
            locator: CompiledLocator::compile(&spec.name, &spec.locate)?,
            read: spec.read.clone(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.locator.name
    }

    /// First non-empty value among the elements this rule locates.
    #[must_use]
    pub fn apply(&self, scope: ElementRef<'_>) -> Option<String> {
        self.locator
            .find(scope)
            .find_map(|element| read_value(element, &self.read))
    }
}

/// Reads one value from an element; `None` when the value is empty.
///
/// Attribute values that are inline `data:` URIs count as empty, so that a
/// lazy-loading placeholder in `src` falls through to `data-src`.
fn read_value(element: ElementRef<'_>, read: &Read) -> Option<String> {
    match read {
        Read::Text => Some(element_text(element)).filter(|t| !t.is_empty()),
        Read::Attr(names) => names.iter().find_map(|name| {
            element
                .value()
                .attr(name.trim())
                .map(str::trim)
                .filter(|v| !v.is_empty() && !v.starts_with("data:"))
                .map(str::to_owned)
        }),
    }
}

/// Ordered fallback chain of strategies for one field.
#[derive(Debug, Clone, Default)]
pub struct Cascade {
    strategies: Vec<Strategy>,
}

impl Cascade {
    /// Compiles every rule, preserving order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProfileError`] encountered.
    pub fn compile(specs: &[StrategySpec]) -> Result<Self, ProfileError> {
        let strategies = specs
            .iter()
            .map(Strategy::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { strategies })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Value of the first strategy that yields one, or `None` if all are
    /// exhausted. Absence is a normal outcome, never an error.
    #[must_use]
    pub fn extract_field(&self, node: ElementRef<'_>) -> Option<String> {
        self.extract_with_rule(node).map(|(_, value)| value)
    }

    /// Like [`Cascade::extract_field`], also naming the rule that matched.
    #[must_use]
    pub fn extract_with_rule(&self, node: ElementRef<'_>) -> Option<(&str, String)> {
        self.strategies
            .iter()
            .find_map(|s| s.apply(node).map(|value| (s.name(), value)))
    }
}

#[cfg(test)]
#[path = "cascade_test.rs"]
mod tests;
