//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Business-context Jaccard similarity at or above which two services are
/// flagged as a merge candidate.
pub const DEFAULT_CONTEXT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Fraction of term-sharing services that must relate to a recognized
/// domain for the sharing to count as legitimate.
pub const DOMAIN_SHARING_THRESHOLD: f64 = 0.8;

/// A verb used by more than this many services triggers the intent
/// ambiguity pass.
pub const INTENT_VERB_SERVICE_LIMIT: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Root directory for registry persistence (snapshots, versions,
    /// backups, metadata, history).
    pub data_dir: PathBuf,
    pub context_similarity_threshold: f64,
    /// Cap on endpoint paths/summaries sampled for keyword extraction.
    pub keyword_sample_cap: usize,
}

impl RegistryConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        RegistryConfig {
            data_dir: data_dir.into(),
            context_similarity_threshold: DEFAULT_CONTEXT_SIMILARITY_THRESHOLD,
            keyword_sample_cap: 10,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig::new("registry_data")
    }
}
