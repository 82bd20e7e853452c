//! Versioned registry persistence
//!
//! Layout under the data directory:
//! - `current_registry.json` - latest snapshot
//! - `versions/registry_v<version>.json` - one immutable file per version
//! - `backups/backup_<timestamp>.json` - snapshot taken before each overwrite
//! - `registry_metadata.json` - current version pointer + counters
//! - `version_history.json` - append-only change history
//!
//! Every mutation is load -> compute -> compare-and-swap on the latest
//! pointer: the backup is written before the pointer moves, so a crash
//! mid-save never loses the prior version, and a concurrent writer gets a
//! retryable error instead of clobbering state.

use crate::services::conflict::ConflictDetector;
use crate::services::version_control::{VersionControl, write_json_atomic};
use crate::types::*;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

const CURRENT_FILE: &str = "current_registry.json";
const METADATA_FILE: &str = "registry_metadata.json";
const VERSIONS_DIR: &str = "versions";
const BACKUPS_DIR: &str = "backups";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryMetadata {
    current_version: String,
    last_updated: chrono::DateTime<Utc>,
    total_services: usize,
}

pub struct RegistryStore {
    config: RegistryConfig,
    detector: ConflictDetector,
    version_control: VersionControl,
}

impl RegistryStore {
    pub fn new(config: RegistryConfig) -> Self {
        let detector = ConflictDetector::with_config(&config);
        let version_control = VersionControl::new(&config.data_dir);
        RegistryStore {
            config,
            detector,
            version_control,
        }
    }

    pub fn version_control(&self) -> &VersionControl {
        &self.version_control
    }

    /// Load a registry snapshot. `"latest"` on a never-initialized store
    /// mints a fresh empty registry; an explicit absent version is an error.
    pub fn load(&self, version: &str) -> RegistryResult<ServiceRegistry> {
        if version == "latest" {
            let path = self.config.data_dir.join(CURRENT_FILE);
            if !path.exists() {
                return Ok(self.mint_empty());
            }
            return self.read_registry(&path);
        }

        let path = self.version_path(version);
        if !path.exists() {
            return Err(RegistryError::VersionNotFound(version.to_string()));
        }
        self.read_registry(&path)
    }

    /// Persist a snapshot as the new latest version.
    ///
    /// Pipeline: CAS check -> backup -> version file -> latest pointer ->
    /// metadata -> history record. Either the whole pipeline completes or
    /// the prior latest remains authoritative.
    pub fn save(
        &self,
        registry: &ServiceRegistry,
        version: Option<String>,
    ) -> RegistryResult<String> {
        self.save_with_message(registry, version, "save registry")
    }

    fn save_with_message(
        &self,
        registry: &ServiceRegistry,
        version: Option<String>,
        message: &str,
    ) -> RegistryResult<String> {
        let previous = self.read_current()?;

        // Optimistic concurrency: the caller's snapshot must descend from
        // the on-disk latest.
        if let Some(previous) = &previous
            && previous.version != registry.version
        {
            return Err(RegistryError::ConcurrentModification {
                expected: registry.version.clone(),
                found: previous.version.clone(),
            });
        }

        let mut next = registry.clone();
        next.refresh_derived();
        // Version snapshots are immutable: an explicit id that already has
        // a snapshot file may not be written again.
        let new_version = match version {
            Some(version) => {
                if self.version_path(&version).exists() {
                    return Err(RegistryError::DuplicateVersion(version));
                }
                version
            }
            None => generate_version_id(&next),
        };
        next.version = new_version.clone();

        // Backup before the latest pointer moves.
        if let Some(previous) = &previous {
            let backup_path = self
                .config
                .data_dir
                .join(BACKUPS_DIR)
                .join(format!("backup_{}.json", Utc::now().format("%Y%m%d%H%M%S%3f")));
            write_json_atomic(&backup_path, previous)?;
        }

        write_json_atomic(&self.version_path(&new_version), &next)?;
        write_json_atomic(&self.config.data_dir.join(CURRENT_FILE), &next)?;
        write_json_atomic(
            &self.config.data_dir.join(METADATA_FILE),
            &RegistryMetadata {
                current_version: new_version.clone(),
                last_updated: next.last_updated,
                total_services: next.total_services,
            },
        )?;

        let base = previous
            .clone()
            .unwrap_or_else(|| ServiceRegistry::empty(next.registry_id.clone(), String::new()));
        self.version_control.record(VersionInfo {
            version: new_version.clone(),
            parent_version: previous.map(|p| p.version),
            author: "system".to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
            changes: VersionControl::diff(&base, &next),
        })?;

        tracing::info!(version = %new_version, services = next.total_services, "registry saved");
        Ok(new_version)
    }

    /// Add a new service. Rejects on duplicate name and on any resulting
    /// high-severity conflict unless `force` is set.
    pub fn add_service(&self, service: ServiceDefinition, force: bool) -> RegistryResult<bool> {
        let mut registry = self.load("latest")?;
        if registry.services.contains_key(&service.service_name) {
            return Err(RegistryError::DuplicateService(service.service_name));
        }
        let name = service.service_name.clone();
        registry.insert_service(service);
        self.check_conflicts(&registry, &name, force)?;
        self.save_with_message(&registry, None, &format!("add service '{name}'"))?;
        Ok(true)
    }

    /// Replace an existing service. Same conflict policy as `add_service`,
    /// with the same `force` override.
    pub fn update_service(&self, service: ServiceDefinition, force: bool) -> RegistryResult<bool> {
        let mut registry = self.load("latest")?;
        if !registry.services.contains_key(&service.service_name) {
            return Err(RegistryError::ServiceNotFound(service.service_name));
        }
        let name = service.service_name.clone();
        let mut updated = service;
        updated.updated_at = Utc::now();
        registry.insert_service(updated);
        self.check_conflicts(&registry, &name, force)?;
        self.save_with_message(&registry, None, &format!("update service '{name}'"))?;
        Ok(true)
    }

    pub fn delete_service(&self, name: &str) -> RegistryResult<bool> {
        let mut registry = self.load("latest")?;
        if registry.remove_service(name).is_none() {
            return Err(RegistryError::ServiceNotFound(name.to_string()));
        }
        self.save_with_message(&registry, None, &format!("delete service '{name}'"))?;
        Ok(true)
    }

    /// Merge two or more services into one. Removes the sources and
    /// inserts exactly one new service.
    pub fn merge_services(
        &self,
        names: &[String],
        new_name: &str,
        strategy: MergeStrategy,
    ) -> RegistryResult<bool> {
        if names.len() < 2 {
            return Err(RegistryError::InvalidMerge(names.len()));
        }
        let mut registry = self.load("latest")?;
        for name in names {
            if !registry.services.contains_key(name) {
                return Err(RegistryError::ServiceNotFound(name.clone()));
            }
        }
        if registry.services.contains_key(new_name) && !names.iter().any(|n| n == new_name) {
            return Err(RegistryError::DuplicateService(new_name.to_string()));
        }

        let sources: Vec<ServiceDefinition> = names
            .iter()
            .map(|name| registry.services[name].clone())
            .collect();

        let (description, context) = match strategy {
            MergeStrategy::PreferFirst => (
                sources[0].service_description.clone(),
                sources[0].business_context.clone(),
            ),
            MergeStrategy::CombineAll => (
                sources
                    .iter()
                    .map(|s| s.service_description.as_str())
                    .collect::<Vec<_>>()
                    .join(" | "),
                sources
                    .iter()
                    .map(|s| s.business_context.as_str())
                    .collect::<Vec<_>>()
                    .join(" | "),
            ),
        };

        let mut tier1: BTreeMap<String, ServiceOperation> = BTreeMap::new();
        let mut tier2: BTreeMap<String, ServiceOperation> = BTreeMap::new();
        let mut keywords = BTreeSet::new();
        let mut synonyms = BTreeSet::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        for source in &sources {
            keywords.extend(source.keywords.iter().cloned());
            synonyms.extend(source.synonyms.iter().cloned());
            for (op_id, op) in &source.tier1_operations {
                merge_op(&mut tier1, &mut seen, op_id, op, &source.service_name);
            }
            for (op_id, op) in &source.tier2_operations {
                merge_op(&mut tier2, &mut seen, op_id, op, &source.service_name);
            }
        }

        let confidence = sources
            .iter()
            .map(|s| s.confidence_score)
            .fold(0.0_f64, f64::max);
        let created_at = sources
            .iter()
            .map(|s| s.created_at)
            .min()
            .unwrap_or_else(Utc::now);

        for name in names {
            registry.remove_service(name);
        }
        registry.insert_service(ServiceDefinition {
            service_name: new_name.to_string(),
            service_description: description,
            business_context: context,
            keywords,
            synonyms,
            tier1_operations: tier1,
            tier2_operations: tier2,
            confidence_score: confidence,
            created_at,
            updated_at: Utc::now(),
        });

        self.save_with_message(
            &registry,
            None,
            &format!("merge {names:?} into '{new_name}'"),
        )?;
        Ok(true)
    }

    /// Split a service into several. The provided operation-id lists must
    /// exactly partition the source's operations: no omissions, no extras.
    pub fn split_service(
        &self,
        name: &str,
        partitions: &BTreeMap<String, Vec<String>>,
    ) -> RegistryResult<bool> {
        let mut registry = self.load("latest")?;
        let Some(source) = registry.services.get(name).cloned() else {
            return Err(RegistryError::ServiceNotFound(name.to_string()));
        };

        let source_ops = source.operation_ids();
        let mut provided: BTreeSet<String> = BTreeSet::new();
        let mut extra: Vec<String> = Vec::new();
        for op_ids in partitions.values() {
            for op_id in op_ids {
                if !provided.insert(op_id.clone()) || !source_ops.contains(op_id) {
                    extra.push(op_id.clone());
                }
            }
        }
        let missing: Vec<String> = source_ops.difference(&provided).cloned().collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(RegistryError::InvalidPartition {
                service: name.to_string(),
                missing,
                extra,
            });
        }
        for new_name in partitions.keys() {
            if new_name != name && registry.services.contains_key(new_name) {
                return Err(RegistryError::DuplicateService(new_name.clone()));
            }
        }

        registry.remove_service(name);
        let now = Utc::now();
        for (new_name, op_ids) in partitions {
            let mut tier1 = BTreeMap::new();
            let mut tier2 = BTreeMap::new();
            for op_id in op_ids {
                let (op, is_tier1) = source.operation(op_id).expect("validated above");
                if is_tier1 {
                    tier1.insert(op_id.clone(), op.clone());
                } else {
                    tier2.insert(op_id.clone(), op.clone());
                }
            }
            registry.insert_service(ServiceDefinition {
                service_name: new_name.clone(),
                service_description: format!(
                    "{} (split from '{}')",
                    source.service_description, name
                ),
                business_context: source.business_context.clone(),
                keywords: source.keywords.clone(),
                synonyms: source.synonyms.clone(),
                tier1_operations: tier1,
                tier2_operations: tier2,
                confidence_score: source.confidence_score,
                created_at: source.created_at,
                updated_at: now,
            });
        }

        self.save_with_message(
            &registry,
            None,
            &format!("split service '{name}' into {:?}", partitions.keys()),
        )?;
        Ok(true)
    }

    /// Re-save version `v` as the new latest. Creates a new version record
    /// rather than rewriting history.
    pub fn rollback_to_version(&self, version: &str) -> RegistryResult<bool> {
        let mut target = self.load(version)?;
        let latest = self.load("latest")?;
        // Adopt the latest pointer so the CAS check passes.
        target.version = latest.version;
        self.save_with_message(&target, None, &format!("rollback to version '{version}'"))?;
        Ok(true)
    }

    /// Saved version ids, most recent last (lexicographic order matches
    /// chronological order for timestamp-derived ids).
    pub fn registry_versions(&self) -> RegistryResult<Vec<String>> {
        let dir = self.config.data_dir.join(VERSIONS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        let entries = std::fs::read_dir(&dir).map_err(|e| RegistryError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| RegistryError::io(&dir, e))?;
            let filename = entry.file_name().to_string_lossy().to_string();
            if let Some(version) = filename
                .strip_prefix("registry_v")
                .and_then(|s| s.strip_suffix(".json"))
            {
                versions.push(version.to_string());
            }
        }
        versions.sort();
        Ok(versions)
    }

    /// Prune history and version snapshot files down to the most recent
    /// `keep_count` versions. The current snapshot is never removed.
    pub fn cleanup_old_versions(&self, keep_count: usize) -> RegistryResult<usize> {
        let pruned = self.version_control.cleanup_old_versions(keep_count)?;
        let current_version = self.read_current()?.map(|r| r.version);
        let mut removed = 0;
        for version in &pruned {
            if Some(version) == current_version.as_ref() {
                continue;
            }
            let path = self.version_path(version);
            if path.exists() {
                std::fs::remove_file(&path).map_err(|e| RegistryError::io(&path, e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn check_conflicts(
        &self,
        candidate: &ServiceRegistry,
        service: &str,
        force: bool,
    ) -> RegistryResult<()> {
        let reports = self.detector.detect(&candidate.services);
        let high: Vec<&ConflictReport> = reports
            .iter()
            .filter(|r| {
                r.severity == ConflictSeverity::High && r.affected_services.contains(service)
            })
            .collect();
        if high.is_empty() {
            return Ok(());
        }
        let details = high
            .iter()
            .map(|r| r.description.clone())
            .collect::<Vec<_>>()
            .join("; ");
        if force {
            tracing::warn!(service, %details, "high-severity conflicts overridden by force flag");
            return Ok(());
        }
        Err(RegistryError::ConflictRejected {
            service: service.to_string(),
            details,
        })
    }

    fn mint_empty(&self) -> ServiceRegistry {
        let registry_id = format!("registry_{}", &short_hash(&Utc::now().to_rfc3339())[..8]);
        ServiceRegistry::empty(registry_id, generate_initial_version())
    }

    fn read_current(&self) -> RegistryResult<Option<ServiceRegistry>> {
        let path = self.config.data_dir.join(CURRENT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        self.read_registry(&path).map(Some)
    }

    fn read_registry(&self, path: &std::path::Path) -> RegistryResult<ServiceRegistry> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| RegistryError::Serialization(e.to_string()))
    }

    fn version_path(&self, version: &str) -> PathBuf {
        self.config
            .data_dir
            .join(VERSIONS_DIR)
            .join(format!("registry_v{version}.json"))
    }
}

/// Insert an operation from a merge source, renaming on operation-id
/// collision with an earlier source.
fn merge_op(
    target: &mut BTreeMap<String, ServiceOperation>,
    seen: &mut BTreeSet<String>,
    op_id: &str,
    op: &ServiceOperation,
    source_name: &str,
) {
    let final_id = if seen.insert(op_id.to_string()) {
        op_id.to_string()
    } else {
        let renamed = format!("{op_id}_{source_name}");
        if !seen.insert(renamed.clone()) {
            return;
        }
        renamed
    };
    let mut op = op.clone();
    op.operation_id = final_id.clone();
    target.insert(final_id, op);
}

/// Timestamp-derived, content-salted version id. Lexicographically
/// monotonic at millisecond resolution; the hash suffix disambiguates
/// same-millisecond saves.
fn generate_version_id(registry: &ServiceRegistry) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    let content = serde_json::to_string(&registry.services).unwrap_or_default();
    format!("{timestamp}_{}", &short_hash(&content)[..6])
}

fn generate_initial_version() -> String {
    format!("{}_000000", Utc::now().format("%Y%m%d%H%M%S%3f"))
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
