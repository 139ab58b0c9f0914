use std::path::Path;

use anyhow::Context;
use harvest_core::ResultEnvelope;

/// Writes `envelope` as pretty-printed UTF-8 JSON, creating parent
/// directories as needed. An existing file is replaced.
pub(crate) fn write_envelope(path: &Path, envelope: &ResultEnvelope) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let mut json = serde_json::to_string_pretty(envelope).context("serializing results")?;
    json.push('\n');
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        listings = envelope.total_results,
        "results written"
    );
    Ok(())
}
