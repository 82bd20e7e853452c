//! Conflict analysis types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    KeywordOverlap,
    SynonymOverlap,
    IntentAmbiguity,
    BusinessContextOverlap,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConflictType::KeywordOverlap => "keyword_overlap",
            ConflictType::SynonymOverlap => "synonym_overlap",
            ConflictType::IntentAmbiguity => "intent_ambiguity",
            ConflictType::BusinessContextOverlap => "business_context_overlap",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

impl ConflictSeverity {
    /// Severity from a mean similarity score.
    pub fn from_similarity(score: f64) -> Self {
        if score >= 0.9 {
            ConflictSeverity::High
        } else if score >= 0.7 {
            ConflictSeverity::Medium
        } else {
            ConflictSeverity::Low
        }
    }
}

/// One pairwise hit from a detection pass. Service names are ordered
/// lexicographically so detection is input-order independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictMatch {
    pub conflict_type: ConflictType,
    pub first_service: String,
    pub second_service: String,
    /// The overlapping keyword/synonym/verb, when the pass has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    pub similarity: f64,
}

/// Matches of one conflict type aggregated into a caller-facing report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub affected_services: BTreeSet<String>,
    pub description: String,
    pub suggested_resolutions: Vec<String>,
    pub auto_resolvable: bool,
    pub matches: Vec<ConflictMatch>,
}
