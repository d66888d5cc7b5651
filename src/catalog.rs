use anyhow::{Context, Result};
use std::path::Path;

use crate::models::Era;

/// Load the previously persisted catalog. This is an explicit
/// deserialization step with schema validation; the file is data, never
/// code. The loaded eras are read-only inputs to reconciliation.
pub fn load_catalog(path: &Path) -> Result<Vec<Era>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog at {}", path.display()))?;
    let eras: Vec<Era> = serde_json::from_str(&contents)
        .with_context(|| format!("catalog at {} does not match the era schema", path.display()))?;
    validate(&eras)?;
    tracing::info!(
        "loaded existing catalog: {} era(s), {} item(s)",
        eras.len(),
        eras.iter().map(|e| e.items.len()).sum::<usize>()
    );
    Ok(eras)
}

/// Structural checks serde cannot express.
fn validate(eras: &[Era]) -> Result<()> {
    for era in eras {
        for item in &era.items {
            if item.id().trim().is_empty() {
                anyhow::bail!(
                    "catalog validation failed: item '{}' in era '{}' has an empty id",
                    item.title(),
                    era.id
                );
            }
        }
    }
    Ok(())
}

/// Persist the catalog as pretty-printed JSON. Writes to a temp file
/// and renames, so a crashed run never truncates the previous catalog.
pub fn store_catalog(path: &Path, eras: &[Era]) -> Result<()> {
    let json = serde_json::to_vec_pretty(eras).context("failed to serialize catalog")?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json)
        .with_context(|| format!("failed to write catalog to {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move catalog into place at {}", path.display()))?;

    tracing::info!("wrote catalog to {}", path.display());
    Ok(())
}
