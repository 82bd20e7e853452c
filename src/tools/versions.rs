//! Version history facade

use crate::services::{RegistryStore, VersionControl};
use crate::types::*;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct VersionsOutput {
    pub success: bool,
    pub versions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn get_registry_versions(config: &RegistryConfig) -> VersionsOutput {
    match RegistryStore::new(config.clone()).registry_versions() {
        Ok(versions) => VersionsOutput {
            success: true,
            versions,
            error: None,
        },
        Err(e) => VersionsOutput {
            success: false,
            versions: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}

pub fn rollback_to_version(config: &RegistryConfig, version: &str) -> RegistryResult<bool> {
    RegistryStore::new(config.clone()).rollback_to_version(version)
}

/// Typed changes between two arbitrary registry snapshots.
pub fn analyze_changes(old: &ServiceRegistry, new: &ServiceRegistry) -> Vec<VersionChange> {
    VersionControl::diff(old, new)
}

pub fn get_version_history(
    config: &RegistryConfig,
    limit: Option<usize>,
) -> RegistryResult<Vec<VersionInfo>> {
    VersionControl::new(&config.data_dir).history(limit)
}

/// Structured diff report between two stored versions.
pub fn generate_diff_report(
    config: &RegistryConfig,
    from_version: &str,
    to_version: &str,
) -> RegistryResult<DiffReport> {
    let store = RegistryStore::new(config.clone());
    let old = store.load(from_version)?;
    let new = store.load(to_version)?;
    Ok(store.version_control().diff_report(&old, &new))
}
