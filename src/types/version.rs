//! Version history and diff types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    ServiceAdded,
    ServiceDeleted,
    ServiceModified,
    OperationAdded,
    OperationDeleted,
    OperationModified,
    MetadataChanged,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeType::ServiceAdded => "service_added",
            ChangeType::ServiceDeleted => "service_deleted",
            ChangeType::ServiceModified => "service_modified",
            ChangeType::OperationAdded => "operation_added",
            ChangeType::OperationDeleted => "operation_deleted",
            ChangeType::OperationModified => "operation_modified",
            ChangeType::MetadataChanged => "metadata_changed",
        };
        write!(f, "{s}")
    }
}

/// One typed change between two registry snapshots.
///
/// `target` is `service` for service-level changes, `service/field` for
/// field changes and `service/op_id` for operation changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionChange {
    pub change_type: ChangeType,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<serde_json::Value>,
}

/// One entry in the append-only version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_version: Option<String>,
    pub author: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub changes: Vec<VersionChange>,
}

/// Structured report comparing two stored versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    pub from_version: String,
    pub to_version: String,
    pub generated_at: DateTime<Utc>,
    /// Change counts keyed by change type name.
    pub summary: BTreeMap<String, usize>,
    pub changes: Vec<VersionChange>,
}
