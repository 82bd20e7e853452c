//! Registry version history and typed diffs
//!
//! History is a single append-only `version_history.json` keyed by version
//! id. Diffs are computed from any two registry snapshots, independent of
//! how they were produced.

use crate::types::*;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

const HISTORY_FILE: &str = "version_history.json";

pub struct VersionControl {
    data_dir: PathBuf,
}

impl VersionControl {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        VersionControl {
            data_dir: data_dir.into(),
        }
    }

    /// Typed changes turning `old` into `new`.
    pub fn diff(old: &ServiceRegistry, new: &ServiceRegistry) -> Vec<VersionChange> {
        let mut changes = Vec::new();

        let old_names: BTreeSet<&String> = old.services.keys().collect();
        let new_names: BTreeSet<&String> = new.services.keys().collect();

        for name in new_names.difference(&old_names) {
            changes.push(VersionChange {
                change_type: ChangeType::ServiceAdded,
                target: (*name).clone(),
                old_value: None,
                new_value: serde_json::to_value(&new.services[*name]).ok(),
            });
        }
        for name in old_names.difference(&new_names) {
            changes.push(VersionChange {
                change_type: ChangeType::ServiceDeleted,
                target: (*name).clone(),
                old_value: serde_json::to_value(&old.services[*name]).ok(),
                new_value: None,
            });
        }
        for name in old_names.intersection(&new_names) {
            Self::diff_service(&old.services[*name], &new.services[*name], &mut changes);
        }

        if old.registry_id != new.registry_id {
            changes.push(VersionChange {
                change_type: ChangeType::MetadataChanged,
                target: "registry_id".to_string(),
                old_value: Some(serde_json::Value::String(old.registry_id.clone())),
                new_value: Some(serde_json::Value::String(new.registry_id.clone())),
            });
        }

        changes
    }

    /// Field-by-field comparison plus operation-set difference by id.
    fn diff_service(
        old: &ServiceDefinition,
        new: &ServiceDefinition,
        changes: &mut Vec<VersionChange>,
    ) {
        let name = &new.service_name;
        let mut field_change = |field: &str, old_v: serde_json::Value, new_v: serde_json::Value| {
            changes.push(VersionChange {
                change_type: ChangeType::ServiceModified,
                target: format!("{name}/{field}"),
                old_value: Some(old_v),
                new_value: Some(new_v),
            });
        };

        if old.service_description != new.service_description {
            field_change(
                "description",
                old.service_description.clone().into(),
                new.service_description.clone().into(),
            );
        }
        if old.business_context != new.business_context {
            field_change(
                "business_context",
                old.business_context.clone().into(),
                new.business_context.clone().into(),
            );
        }
        if old.keywords != new.keywords {
            field_change(
                "keywords",
                serde_json::to_value(&old.keywords).unwrap_or_default(),
                serde_json::to_value(&new.keywords).unwrap_or_default(),
            );
        }
        if old.synonyms != new.synonyms {
            field_change(
                "synonyms",
                serde_json::to_value(&old.synonyms).unwrap_or_default(),
                serde_json::to_value(&new.synonyms).unwrap_or_default(),
            );
        }

        let old_ops = old.operation_ids();
        let new_ops = new.operation_ids();
        for op_id in new_ops.difference(&old_ops) {
            changes.push(VersionChange {
                change_type: ChangeType::OperationAdded,
                target: format!("{name}/{op_id}"),
                old_value: None,
                new_value: new
                    .operation(op_id)
                    .and_then(|(op, _)| serde_json::to_value(op).ok()),
            });
        }
        for op_id in old_ops.difference(&new_ops) {
            changes.push(VersionChange {
                change_type: ChangeType::OperationDeleted,
                target: format!("{name}/{op_id}"),
                old_value: old
                    .operation(op_id)
                    .and_then(|(op, _)| serde_json::to_value(op).ok()),
                new_value: None,
            });
        }
        for op_id in old_ops.intersection(&new_ops) {
            let (old_op, old_tier1) = old.operation(op_id).expect("op in old");
            let (new_op, new_tier1) = new.operation(op_id).expect("op in new");
            if old_op != new_op || old_tier1 != new_tier1 {
                changes.push(VersionChange {
                    change_type: ChangeType::OperationModified,
                    target: format!("{name}/{op_id}"),
                    old_value: serde_json::to_value(old_op).ok(),
                    new_value: serde_json::to_value(new_op).ok(),
                });
            }
        }
    }

    /// Append one entry to the version history.
    pub fn record(&self, info: VersionInfo) -> RegistryResult<()> {
        let mut history = self.load_history()?;
        history.insert(info.version.clone(), info);
        self.save_history(&history)
    }

    /// Most recent entries first, optionally limited.
    pub fn history(&self, limit: Option<usize>) -> RegistryResult<Vec<VersionInfo>> {
        let history = self.load_history()?;
        let mut entries: Vec<VersionInfo> = history.into_values().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    pub fn entry(&self, version: &str) -> RegistryResult<Option<VersionInfo>> {
        Ok(self.load_history()?.remove(version))
    }

    /// Structured comparison of two stored snapshots.
    pub fn diff_report(
        &self,
        old: &ServiceRegistry,
        new: &ServiceRegistry,
    ) -> DiffReport {
        let changes = Self::diff(old, new);
        let mut summary: BTreeMap<String, usize> = BTreeMap::new();
        for change in &changes {
            *summary.entry(change.change_type.to_string()).or_default() += 1;
        }
        DiffReport {
            from_version: old.version.clone(),
            to_version: new.version.clone(),
            generated_at: Utc::now(),
            summary,
            changes,
        }
    }

    /// Retain only the `keep_count` most recent history entries by
    /// timestamp; returns the pruned version ids so the store can drop the
    /// matching snapshot files.
    pub fn cleanup_old_versions(&self, keep_count: usize) -> RegistryResult<Vec<String>> {
        let history = self.load_history()?;
        if history.len() <= keep_count {
            return Ok(Vec::new());
        }
        let mut entries: Vec<VersionInfo> = history.into_values().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let pruned: Vec<String> = entries
            .split_off(keep_count)
            .into_iter()
            .map(|e| e.version)
            .collect();
        let kept: BTreeMap<String, VersionInfo> = entries
            .into_iter()
            .map(|e| (e.version.clone(), e))
            .collect();
        self.save_history(&kept)?;
        tracing::info!(pruned = pruned.len(), kept = kept.len(), "pruned version history");
        Ok(pruned)
    }

    fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    fn load_history(&self) -> RegistryResult<BTreeMap<String, VersionInfo>> {
        let path = self.history_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content =
            std::fs::read_to_string(&path).map_err(|e| RegistryError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| RegistryError::Serialization(e.to_string()))
    }

    fn save_history(&self, history: &BTreeMap<String, VersionInfo>) -> RegistryResult<()> {
        let path = self.history_path();
        write_json_atomic(&path, history)
    }
}

/// Atomic write via temp file + rename; creates the parent directory.
pub(crate) fn write_json_atomic<T: serde::Serialize>(
    path: &Path,
    value: &T,
) -> RegistryResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RegistryError::io(parent, e))?;
    }
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| RegistryError::Serialization(e.to_string()))?;
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, &content).map_err(|e| RegistryError::io(&temp_path, e))?;
    std::fs::rename(&temp_path, path).map_err(|e| RegistryError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn service(name: &str, op_ids: &[&str]) -> ServiceDefinition {
        let now = Utc::now();
        let tier1: BTreeMap<String, ServiceOperation> = op_ids
            .iter()
            .map(|id| {
                (
                    id.to_string(),
                    ServiceOperation {
                        operation_id: id.to_string(),
                        path: format!("/{name}"),
                        method: HttpMethod::Get,
                        crud_type: Some(CrudOperation::List),
                        intent_verbs: vec!["list".to_string()],
                        intent_objects: vec![name.to_string()],
                        intent_indicators: vec![],
                        description: id.to_string(),
                        confidence_score: 0.8,
                    },
                )
            })
            .collect();
        ServiceDefinition {
            service_name: name.to_string(),
            service_description: format!("{name} ops"),
            business_context: format!("{name} context"),
            keywords: [name.to_string()].into_iter().collect(),
            synonyms: BTreeSet::new(),
            tier1_operations: tier1,
            tier2_operations: BTreeMap::new(),
            confidence_score: 0.5,
            created_at: now,
            updated_at: now,
        }
    }

    fn registry(version: &str, services: Vec<ServiceDefinition>) -> ServiceRegistry {
        let mut reg = ServiceRegistry::empty("reg".to_string(), version.to_string());
        for s in services {
            reg.insert_service(s);
        }
        reg
    }

    #[test]
    fn self_diff_is_empty() {
        let reg = registry("1", vec![service("users", &["listUsers"])]);
        assert!(VersionControl::diff(&reg, &reg).is_empty());
    }

    #[test]
    fn service_set_difference() {
        let old = registry("1", vec![service("users", &["listUsers"])]);
        let new = registry("2", vec![service("assets", &["listAssets"])]);
        let changes = VersionControl::diff(&old, &new);
        let types: Vec<ChangeType> = changes.iter().map(|c| c.change_type).collect();
        assert!(types.contains(&ChangeType::ServiceAdded));
        assert!(types.contains(&ChangeType::ServiceDeleted));
    }

    #[test]
    fn operation_and_field_changes_are_typed() {
        let old = registry("1", vec![service("users", &["listUsers", "oldOp"])]);
        let mut modified = service("users", &["listUsers", "newOp"]);
        modified.service_description = "changed".to_string();
        let new = registry("2", vec![modified]);

        let changes = VersionControl::diff(&old, &new);
        let by_type = |t: ChangeType| changes.iter().filter(|c| c.change_type == t).count();
        assert_eq!(by_type(ChangeType::OperationAdded), 1);
        assert_eq!(by_type(ChangeType::OperationDeleted), 1);
        assert_eq!(by_type(ChangeType::ServiceModified), 1);
        let field = changes
            .iter()
            .find(|c| c.change_type == ChangeType::ServiceModified)
            .unwrap();
        assert_eq!(field.target, "users/description");
    }

    #[test]
    fn history_is_append_only_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let vc = VersionControl::new(dir.path());

        for (i, version) in ["a", "b", "c"].iter().enumerate() {
            vc.record(VersionInfo {
                version: version.to_string(),
                parent_version: None,
                author: "system".to_string(),
                message: format!("save {i}"),
                created_at: Utc::now() + chrono::Duration::seconds(i as i64),
                changes: vec![],
            })
            .unwrap();
        }

        let all = vc.history(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].version, "c");

        let limited = vc.history(Some(2)).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn cleanup_keeps_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let vc = VersionControl::new(dir.path());
        for i in 0..5 {
            vc.record(VersionInfo {
                version: format!("v{i}"),
                parent_version: None,
                author: "system".to_string(),
                message: String::new(),
                created_at: Utc::now() + chrono::Duration::seconds(i),
                changes: vec![],
            })
            .unwrap();
        }
        let pruned = vc.cleanup_old_versions(2).unwrap();
        assert_eq!(pruned.len(), 3);
        let remaining = vc.history(None).unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].version, "v4");
        assert_eq!(remaining[1].version, "v3");
    }
}
