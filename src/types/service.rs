//! Service registry aggregate types

use crate::types::spec::{CrudOperation, HttpMethod};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One classified operation inside a service. Created once by the
/// classifier; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOperation {
    pub operation_id: String,
    pub path: String,
    pub method: HttpMethod,
    /// Set for Tier 1 operations; `None` for specialized (Tier 2) ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crud_type: Option<CrudOperation>,
    pub intent_verbs: Vec<String>,
    pub intent_objects: Vec<String>,
    pub intent_indicators: Vec<String>,
    pub description: String,
    /// Confidence in the classification, in [0, 1].
    pub confidence_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub service_name: String,
    pub service_description: String,
    pub business_context: String,
    pub keywords: BTreeSet<String>,
    pub synonyms: BTreeSet<String>,
    /// CRUD operations keyed by operation id.
    pub tier1_operations: BTreeMap<String, ServiceOperation>,
    /// Specialized operations keyed by operation id.
    pub tier2_operations: BTreeMap<String, ServiceOperation>,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceDefinition {
    /// All operation ids across both tiers.
    pub fn operation_ids(&self) -> BTreeSet<String> {
        self.tier1_operations
            .keys()
            .chain(self.tier2_operations.keys())
            .cloned()
            .collect()
    }

    pub fn operation_count(&self) -> usize {
        self.tier1_operations.len() + self.tier2_operations.len()
    }

    /// Looks an operation up in either tier. An operation id appears in at
    /// most one tier within a service.
    pub fn operation(&self, op_id: &str) -> Option<(&ServiceOperation, bool)> {
        if let Some(op) = self.tier1_operations.get(op_id) {
            return Some((op, true));
        }
        self.tier2_operations.get(op_id).map(|op| (op, false))
    }
}

/// The only mutable aggregate. Every mutation produces a new persisted
/// version; `global_keywords` is rebuilt atomically with the service map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRegistry {
    pub registry_id: String,
    /// Monotonic, timestamp-derived version string.
    pub version: String,
    pub services: BTreeMap<String, ServiceDefinition>,
    /// Must equal `services.len()` after every mutation.
    pub total_services: usize,
    /// Derived index: keyword -> services carrying it.
    pub global_keywords: BTreeMap<String, BTreeSet<String>>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl ServiceRegistry {
    pub fn empty(registry_id: String, version: String) -> Self {
        let now = Utc::now();
        ServiceRegistry {
            registry_id,
            version,
            services: BTreeMap::new(),
            total_services: 0,
            global_keywords: BTreeMap::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Inserts or replaces a service, keeping counts and the keyword index
    /// in step with the service map.
    pub fn insert_service(&mut self, service: ServiceDefinition) {
        self.services.insert(service.service_name.clone(), service);
        self.refresh_derived();
    }

    pub fn remove_service(&mut self, name: &str) -> Option<ServiceDefinition> {
        let removed = self.services.remove(name);
        if removed.is_some() {
            self.refresh_derived();
        }
        removed
    }

    /// Rebuilds `total_services` and `global_keywords` from the service map.
    pub fn refresh_derived(&mut self) {
        self.total_services = self.services.len();
        let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (name, service) in &self.services {
            for keyword in &service.keywords {
                index.entry(keyword.clone()).or_default().insert(name.clone());
            }
        }
        self.global_keywords = index;
        self.last_updated = Utc::now();
    }
}

/// How `merge_services` combines metadata from the source services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Keep the first service's description/context; union everything else.
    PreferFirst,
    /// Concatenate descriptions/contexts; union everything.
    CombineAll,
}
