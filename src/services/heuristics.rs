//! Classification heuristic tables
//!
//! Kept behind a trait so the domain vocabulary (ITSM by default) can be
//! swapped without touching the classification pipeline.

use crate::types::CrudOperation;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet};

/// Domain vocabulary entry: description template plus synonym group.
#[derive(Debug, Clone)]
pub struct DomainEntry {
    pub description: &'static str,
    pub synonyms: &'static [&'static str],
    pub keywords: &'static [&'static str],
}

/// Heuristic tables consumed by the classifier and conflict detector.
pub trait ClassificationHeuristics: Send + Sync {
    /// Domain vocabulary keyed by canonical domain term.
    fn domain_table(&self) -> &BTreeMap<&'static str, DomainEntry>;

    /// Words ignored during keyword extraction and overlap analysis.
    fn stopwords(&self) -> &BTreeSet<&'static str>;

    /// Operation-id keyword hints per CRUD operation type.
    fn crud_hints(&self, op: CrudOperation) -> &'static [&'static str];

    /// Path segments skipped when deriving service names (version and
    /// API prefixes).
    fn generic_segments(&self) -> &BTreeSet<&'static str>;

    /// Path suffixes that disqualify a segment from the CRUD base path.
    fn non_crud_suffixes(&self) -> &'static [&'static str];

    /// The domain entry (if any) a service name or keyword relates to.
    fn domain_for(&self, term: &str) -> Option<(&'static str, &DomainEntry)> {
        let term = term.to_lowercase();
        for (domain, entry) in self.domain_table() {
            if term.contains(domain)
                || entry.synonyms.iter().any(|s| term == *s)
                || entry.keywords.iter().any(|k| term == *k)
            {
                return Some((domain, entry));
            }
        }
        None
    }
}

static DOMAIN_TABLE: Lazy<BTreeMap<&'static str, DomainEntry>> = Lazy::new(|| {
    let mut table = BTreeMap::new();
    table.insert(
        "incident",
        DomainEntry {
            description: "Manage incident records: creation, assignment, resolution and closure",
            synonyms: &["issue", "outage", "disruption"],
            keywords: &["incident", "priority", "resolution", "escalation"],
        },
    );
    table.insert(
        "ticket",
        DomainEntry {
            description: "Manage service desk tickets through their lifecycle",
            synonyms: &["request", "case", "service_request"],
            keywords: &["ticket", "queue", "assignment", "status"],
        },
    );
    table.insert(
        "problem",
        DomainEntry {
            description: "Track problem records and known errors behind recurring incidents",
            synonyms: &["known_error", "root_cause"],
            keywords: &["problem", "workaround", "rca"],
        },
    );
    table.insert(
        "change",
        DomainEntry {
            description: "Plan and approve change requests and change windows",
            synonyms: &["change_request", "cab"],
            keywords: &["change", "approval", "rollout", "window"],
        },
    );
    table.insert(
        "release",
        DomainEntry {
            description: "Coordinate release packages and deployments",
            synonyms: &["deployment", "rollout"],
            keywords: &["release", "build", "deploy"],
        },
    );
    table.insert(
        "asset",
        DomainEntry {
            description: "Track IT assets, their ownership and lifecycle state",
            synonyms: &["inventory", "hardware", "fixed_asset"],
            keywords: &["asset", "warranty", "owner", "lifecycle"],
        },
    );
    table.insert(
        "cmdb",
        DomainEntry {
            description: "Maintain configuration items and their relationships",
            synonyms: &["configuration_item", "ci"],
            keywords: &["cmdb", "ci", "relationship", "topology"],
        },
    );
    table.insert(
        "user",
        DomainEntry {
            description: "Manage user accounts, profiles and access",
            synonyms: &["account", "requester", "contact"],
            keywords: &["user", "profile", "role", "login"],
        },
    );
    table.insert(
        "knowledge",
        DomainEntry {
            description: "Author and publish knowledge base articles",
            synonyms: &["kb", "article", "faq"],
            keywords: &["knowledge", "article", "solution"],
        },
    );
    table.insert(
        "sla",
        DomainEntry {
            description: "Define service level agreements and track compliance",
            synonyms: &["service_level", "ola"],
            keywords: &["sla", "breach", "target", "compliance"],
        },
    );
    table.insert(
        "vendor",
        DomainEntry {
            description: "Manage vendors and supplier relationships",
            synonyms: &["supplier", "provider"],
            keywords: &["vendor", "contract", "purchase"],
        },
    );
    table.insert(
        "contract",
        DomainEntry {
            description: "Track contracts, renewals and entitlements",
            synonyms: &["agreement", "entitlement"],
            keywords: &["contract", "renewal", "expiry"],
        },
    );
    table.insert(
        "notification",
        DomainEntry {
            description: "Send and manage notifications and announcements",
            synonyms: &["alert", "announcement"],
            keywords: &["notification", "email", "broadcast"],
        },
    );
    table.insert(
        "report",
        DomainEntry {
            description: "Generate operational reports and dashboards",
            synonyms: &["dashboard", "analytics"],
            keywords: &["report", "metric", "export"],
        },
    );
    table
});

static STOPWORDS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "any", "all", "api", "are", "as", "at", "be", "by", "data", "for",
        "from", "get", "id", "in", "info", "into", "is", "it", "its", "list", "new", "no", "not",
        "of", "on", "or", "per", "set", "that", "the", "this", "to", "type", "use", "via", "with",
        "v1", "v2", "v3", "ux", "sd",
    ]
    .into_iter()
    .collect()
});

static GENERIC_SEGMENTS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    [
        "api", "rest", "v1", "v2", "v3", "v4", "ux", "sd", "public", "internal", "service",
        "services",
    ]
    .into_iter()
    .collect()
});

const NON_CRUD_SUFFIXES: &[&str] = &[
    "-csv", "csv", "upload", "download", "export", "import", "options", "bulk", "count", "search",
    "clone", "archive", "history",
];

const LIST_HINTS: &[&str] = &["list", "all", "fetch", "index", "search", "query"];
const GET_HINTS: &[&str] = &["get", "detail", "details", "show", "retrieve", "read", "view"];
const CREATE_HINTS: &[&str] = &["create", "add", "new", "register", "insert", "post"];
const UPDATE_HINTS: &[&str] = &["update", "edit", "modify", "patch", "put", "change"];
const DELETE_HINTS: &[&str] = &["delete", "remove", "destroy", "purge", "del"];

/// Default heuristics tuned for ITSM-style APIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ItsmHeuristics;

impl ClassificationHeuristics for ItsmHeuristics {
    fn domain_table(&self) -> &BTreeMap<&'static str, DomainEntry> {
        &DOMAIN_TABLE
    }

    fn stopwords(&self) -> &BTreeSet<&'static str> {
        &STOPWORDS
    }

    fn crud_hints(&self, op: CrudOperation) -> &'static [&'static str] {
        match op {
            CrudOperation::List => LIST_HINTS,
            CrudOperation::GetById => GET_HINTS,
            CrudOperation::Create => CREATE_HINTS,
            CrudOperation::Update => UPDATE_HINTS,
            CrudOperation::Delete => DELETE_HINTS,
        }
    }

    fn generic_segments(&self) -> &BTreeSet<&'static str> {
        &GENERIC_SEGMENTS
    }

    fn non_crud_suffixes(&self) -> &'static [&'static str] {
        NON_CRUD_SUFFIXES
    }
}

/// Lowercased word tokens minus stopwords and single characters.
pub fn tokenize(text: &str, heuristics: &dyn ClassificationHeuristics) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .map(|t| t.to_lowercase())
        .filter(|t| t.len() > 1 && !heuristics.stopwords().contains(t.as_str()))
        .collect()
}
