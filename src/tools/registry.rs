//! Registry mutation facade: load/save/add/update/delete/merge/split

use crate::services::RegistryStore;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct RegistryOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_services: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegistryOutput {
    fn failure(e: RegistryError) -> Self {
        RegistryOutput {
            success: false,
            version: None,
            total_services: None,
            error: Some(e.to_string()),
        }
    }
}

pub fn load_registry(config: &RegistryConfig, version: &str) -> RegistryResult<ServiceRegistry> {
    RegistryStore::new(config.clone()).load(version)
}

pub fn save_registry(
    config: &RegistryConfig,
    registry: &ServiceRegistry,
    version: Option<String>,
) -> RegistryOutput {
    let store = RegistryStore::new(config.clone());
    match store.save(registry, version) {
        Ok(version) => RegistryOutput {
            success: true,
            version: Some(version),
            total_services: Some(registry.services.len()),
            error: None,
        },
        Err(e) => RegistryOutput::failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct AddServiceInput {
    pub service: ServiceDefinition,
    /// Override high-severity conflict rejection.
    #[serde(default)]
    pub force: bool,
}

pub fn add_service(config: &RegistryConfig, input: AddServiceInput) -> RegistryOutput {
    let store = RegistryStore::new(config.clone());
    match store.add_service(input.service, input.force) {
        Ok(_) => current_state(&store),
        Err(e) => RegistryOutput::failure(e),
    }
}

pub fn update_service(config: &RegistryConfig, input: AddServiceInput) -> RegistryOutput {
    let store = RegistryStore::new(config.clone());
    match store.update_service(input.service, input.force) {
        Ok(_) => current_state(&store),
        Err(e) => RegistryOutput::failure(e),
    }
}

pub fn delete_service(config: &RegistryConfig, name: &str) -> RegistryOutput {
    let store = RegistryStore::new(config.clone());
    match store.delete_service(name) {
        Ok(_) => current_state(&store),
        Err(e) => RegistryOutput::failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct MergeInput {
    pub service_names: Vec<String>,
    pub new_name: String,
    pub strategy: MergeStrategy,
}

pub fn merge_services(config: &RegistryConfig, input: MergeInput) -> RegistryOutput {
    let store = RegistryStore::new(config.clone());
    match store.merge_services(&input.service_names, &input.new_name, input.strategy) {
        Ok(_) => current_state(&store),
        Err(e) => RegistryOutput::failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SplitInput {
    pub service_name: String,
    /// New service name -> operation ids. Must exactly partition the
    /// source service's operations.
    pub partitions: BTreeMap<String, Vec<String>>,
}

pub fn split_service(config: &RegistryConfig, input: SplitInput) -> RegistryOutput {
    let store = RegistryStore::new(config.clone());
    match store.split_service(&input.service_name, &input.partitions) {
        Ok(_) => current_state(&store),
        Err(e) => RegistryOutput::failure(e),
    }
}

fn current_state(store: &RegistryStore) -> RegistryOutput {
    match store.load("latest") {
        Ok(registry) => RegistryOutput {
            success: true,
            version: Some(registry.version),
            total_services: Some(registry.total_services),
            error: None,
        },
        Err(e) => RegistryOutput::failure(e),
    }
}
