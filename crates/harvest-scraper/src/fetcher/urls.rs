//! URL validation, resolution, and page-parameter helpers.

use reqwest::Url;

use crate::error::AcquisitionError;

/// Parses `target` and checks that it is an absolute `http`/`https` URL.
///
/// # Errors
///
/// Returns [`AcquisitionError::InvalidTarget`] for relative, malformed, or
/// non-HTTP URLs.
pub fn parse_target(target: &str) -> Result<Url, AcquisitionError> {
    let url = Url::parse(target).map_err(|e| AcquisitionError::InvalidTarget {
        url: target.to_owned(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AcquisitionError::InvalidTarget {
            url: target.to_owned(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Resolves a link or image reference found in markup against `base`.
///
/// Absolute references pass through unchanged. Returns `None` for values that
/// cannot be joined or that resolve to something other than `http`/`https`
/// (`javascript:`, `mailto:`, inline `data:` images).
#[must_use]
pub fn resolve_against(base: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with('#') {
        return None;
    }
    let resolved = base.join(reference).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// URL of page `page` (1-based) of a search.
///
/// Page 1 is the search URL itself; later pages carry a `page=N` query
/// parameter, replacing any `page` already present.
///
/// # Errors
///
/// Returns [`AcquisitionError::InvalidTarget`] if `search_url` is not a valid
/// absolute URL.
pub fn page_url(search_url: &str, page: u32) -> Result<String, AcquisitionError> {
    let mut url = parse_target(search_url)?;
    if page <= 1 {
        return Ok(url.to_string());
    }
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair("page", &page.to_string());
    }
    Ok(url.to_string())
}
