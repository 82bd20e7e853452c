//! detect_conflicts facade

use crate::services::{ConflictDetector, RegistryStore};
use crate::types::*;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct ConflictOutput {
    pub success: bool,
    pub conflicts: Vec<ConflictReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Detect conflicts across the currently persisted registry.
pub fn detect_conflicts(config: &RegistryConfig) -> ConflictOutput {
    let store = RegistryStore::new(config.clone());
    let registry = match store.load("latest") {
        Ok(registry) => registry,
        Err(e) => {
            return ConflictOutput {
                success: false,
                conflicts: Vec::new(),
                error: Some(e.to_string()),
            };
        }
    };
    detect_conflicts_in_services(config, &registry.services)
}

/// Detect conflicts across an arbitrary set of service definitions.
pub fn detect_conflicts_in_services(
    config: &RegistryConfig,
    services: &BTreeMap<String, ServiceDefinition>,
) -> ConflictOutput {
    ConflictOutput {
        success: true,
        conflicts: ConflictDetector::with_config(config).detect(services),
        error: None,
    }
}
