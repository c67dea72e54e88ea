use anyhow::{Context, Result};
use danube_workload::{AssignmentView, WorkloadConfig};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Loads a stored assignment view; a missing file is an empty view
pub(crate) fn load_view(path: &Path) -> Result<AssignmentView> {
    if !path.exists() {
        info!(path = %path.display(), "no stored assignment view, starting from an empty one");
        return Ok(AssignmentView::empty());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read assignment view from {}", path.display()))?;
    let view = AssignmentView::from_json(&content)
        .with_context(|| format!("Invalid assignment view in {}", path.display()))?;

    debug!(
        path = %path.display(),
        subscriptions = view.subscriptions_count(),
        nodes = view.nodes_count(),
        assignments = view.assignments_count(),
        "loaded assignment view"
    );
    Ok(view)
}

/// Loads a stored assignment view that must exist
pub(crate) fn load_existing_view(path: &Path) -> Result<AssignmentView> {
    if !path.exists() {
        anyhow::bail!("Assignment view {} does not exist", path.display());
    }
    load_view(path)
}

pub(crate) fn save_view(path: &Path, view: &AssignmentView) -> Result<()> {
    let content = view.to_json()?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write assignment view to {}", path.display()))?;
    info!(path = %path.display(), "stored the balanced assignment view");
    Ok(())
}

/// Reads the workload limits from a YAML file, or the defaults without one
pub(crate) fn load_config(path: Option<&Path>) -> Result<WorkloadConfig> {
    let Some(path) = path else {
        return Ok(WorkloadConfig::default());
    };

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: WorkloadConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}
