//! Tag-first service classification
//!
//! Groups endpoint records into named services and splits each service's
//! operations into Tier 1 (CRUD) and Tier 2 (specialized). Heuristic
//! tables are injected via [`ClassificationHeuristics`].

use crate::services::heuristics::{ClassificationHeuristics, ItsmHeuristics, tokenize};
use crate::services::parser::{classify_crud, is_id_segment};
use crate::types::*;
use chrono::Utc;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// A base-path bucket needs at least this many of the five canonical
/// operations to count as a CRUD set.
const CRUD_SET_MIN_OPS: usize = 3;

pub struct ServiceClassifier {
    heuristics: Box<dyn ClassificationHeuristics>,
    keyword_sample_cap: usize,
}

impl Default for ServiceClassifier {
    fn default() -> Self {
        ServiceClassifier::new(Box::new(ItsmHeuristics))
    }
}

impl ServiceClassifier {
    pub fn new(heuristics: Box<dyn ClassificationHeuristics>) -> Self {
        ServiceClassifier {
            heuristics,
            keyword_sample_cap: 10,
        }
    }

    pub fn with_sample_cap(mut self, cap: usize) -> Self {
        self.keyword_sample_cap = cap;
        self
    }

    /// Classify a parsed specification into service definitions.
    ///
    /// An empty spec yields an empty map. Per-tag passes are pure and run
    /// in parallel.
    pub fn classify(&self, spec: &ApiSpecification) -> BTreeMap<String, ServiceDefinition> {
        let groups = self.group_endpoints(&spec.endpoints);
        tracing::debug!(groups = groups.len(), endpoints = spec.endpoints.len(), "grouped endpoints");

        let group_list: Vec<(String, Vec<EndpointRecord>)> = groups.into_iter().collect();
        let per_group: Vec<Vec<ServiceDefinition>> = group_list
            .par_iter()
            .map(|(tag, endpoints)| self.classify_group(tag, endpoints))
            .collect();

        let mut services = BTreeMap::new();
        for (group_services, (tag, _)) in per_group.into_iter().zip(group_list.iter()) {
            for mut service in group_services {
                // Name collisions across tags get disambiguated with the
                // tag name.
                if services.contains_key(&service.service_name) {
                    service.service_name = sanitize_name(&format!(
                        "{}_{}",
                        service.service_name, tag
                    ));
                }
                services.insert(service.service_name.clone(), service);
            }
        }
        services
    }

    /// Phase 1: group by first declared tag, else by the first 1-2
    /// non-generic path segments.
    fn group_endpoints(
        &self,
        endpoints: &[EndpointRecord],
    ) -> BTreeMap<String, Vec<EndpointRecord>> {
        let mut groups: BTreeMap<String, Vec<EndpointRecord>> = BTreeMap::new();
        for endpoint in endpoints {
            let group = match endpoint.tags.first() {
                Some(tag) if !tag.trim().is_empty() => sanitize_name(tag),
                _ => self.group_from_path(&endpoint.path),
            };
            groups.entry(group).or_default().push(endpoint.clone());
        }
        groups
    }

    fn group_from_path(&self, path: &str) -> String {
        let meaningful: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .filter(|s| !is_id_segment(s))
            .filter(|s| !self.heuristics.generic_segments().contains(&s.to_lowercase().as_str()))
            .take(2)
            .collect();
        if meaningful.is_empty() {
            "miscellaneous".to_string()
        } else {
            sanitize_name(&meaningful.join("_"))
        }
    }

    /// Phase 2: CRUD-set discovery within one group, then service assembly.
    fn classify_group(&self, tag: &str, endpoints: &[EndpointRecord]) -> Vec<ServiceDefinition> {
        let mut buckets: BTreeMap<String, Vec<ClassifiedEndpoint>> = BTreeMap::new();
        for endpoint in endpoints {
            let base = self.crud_base_path(&endpoint.path);
            let op_type = self.resolve_op_type(endpoint);
            buckets.entry(base).or_default().push(ClassifiedEndpoint {
                endpoint: endpoint.clone(),
                op_type,
            });
        }

        let crud_sets: BTreeMap<String, &Vec<ClassifiedEndpoint>> = buckets
            .iter()
            .filter(|(_, members)| {
                let distinct: BTreeSet<CrudOperation> =
                    members.iter().filter_map(|m| m.op_type).collect();
                distinct.len() >= CRUD_SET_MIN_OPS
            })
            .map(|(base, members)| (base.clone(), members))
            .collect();

        match crud_sets.len() {
            // No CRUD structure: the whole tag is one Tier-2 service.
            0 => vec![self.build_service(tag, tag, &[], endpoints)],
            1 => {
                let (_, set_members) = crud_sets.into_iter().next().expect("one crud set");
                let tier1: Vec<ClassifiedEndpoint> = set_members
                    .iter()
                    .filter(|m| m.op_type.is_some())
                    .cloned()
                    .collect();
                let tier1_keys: BTreeSet<String> =
                    tier1.iter().map(|m| m.endpoint.key()).collect();
                let tier2: Vec<EndpointRecord> = endpoints
                    .iter()
                    .filter(|e| !tier1_keys.contains(&e.key()))
                    .cloned()
                    .collect();
                vec![self.build_service(tag, tag, &tier1, &tier2)]
            }
            _ => self.split_group(tag, endpoints, &crud_sets),
        }
    }

    /// Multiple CRUD sets: one service per set, leftovers assigned by
    /// greedy longest-prefix match on the base path.
    fn split_group(
        &self,
        tag: &str,
        endpoints: &[EndpointRecord],
        crud_sets: &BTreeMap<String, &Vec<ClassifiedEndpoint>>,
    ) -> Vec<ServiceDefinition> {
        let mut set_members: BTreeMap<String, (Vec<ClassifiedEndpoint>, Vec<EndpointRecord>)> =
            crud_sets
                .iter()
                .map(|(base, members)| {
                    let tier1: Vec<ClassifiedEndpoint> = members
                        .iter()
                        .filter(|m| m.op_type.is_some())
                        .cloned()
                        .collect();
                    let tier2: Vec<EndpointRecord> = members
                        .iter()
                        .filter(|m| m.op_type.is_none())
                        .map(|m| m.endpoint.clone())
                        .collect();
                    (base.clone(), (tier1, tier2))
                })
                .collect();

        // Leftovers: endpoints not in any CRUD-set bucket.
        let claimed: BTreeSet<String> = crud_sets
            .values()
            .flat_map(|members| members.iter().map(|m| m.endpoint.key()))
            .collect();
        for endpoint in endpoints {
            if claimed.contains(&endpoint.key()) {
                continue;
            }
            let best = crud_sets
                .keys()
                .filter(|base| endpoint.path.starts_with(base.as_str()))
                .max_by_key(|base| base.len());
            if let Some(base) = best {
                set_members
                    .get_mut(base)
                    .expect("base exists")
                    .1
                    .push(endpoint.clone());
            }
            // Unmatched leftovers are dropped for this tag.
        }

        let mut used_names: BTreeSet<String> = BTreeSet::new();
        let mut services = Vec::new();
        for (base, (tier1, tier2)) in set_members {
            let name = self.name_from_base(&base, tag, &used_names);
            used_names.insert(name.clone());
            services.push(self.build_service(&name, tag, &tier1, &tier2));
        }
        services
    }

    /// Path with id-like segments removed and known non-CRUD suffix
    /// segments stripped from the tail.
    fn crud_base_path(&self, path: &str) -> String {
        let mut segments: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .filter(|s| !is_id_segment(s))
            .collect();
        while let Some(last) = segments.last() {
            let lower = last.to_lowercase();
            let is_suffix = self
                .heuristics
                .non_crud_suffixes()
                .iter()
                .any(|suffix| lower == *suffix || lower.ends_with(suffix));
            if is_suffix {
                segments.pop();
            } else {
                break;
            }
        }
        format!("/{}", segments.join("/"))
    }

    /// Operation type from method + path shape, overridden by operation-id
    /// keyword hints where they disambiguate GET list vs get-by-id. Paths
    /// ending in a non-CRUD suffix (export, upload, -csv, ...) are always
    /// specialized.
    fn resolve_op_type(&self, endpoint: &EndpointRecord) -> Option<CrudOperation> {
        let trailing = endpoint
            .path
            .trim_end_matches('/')
            .rsplit('/')
            .find(|s| !s.is_empty() && !is_id_segment(s))
            .map(|s| s.to_lowercase());
        if let Some(trailing) = trailing
            && self
                .heuristics
                .non_crud_suffixes()
                .iter()
                .any(|suffix| trailing == *suffix || trailing.ends_with(suffix))
        {
            return None;
        }

        let shape = classify_crud(endpoint.method, &endpoint.path);
        let tokens = id_tokens(&endpoint.operation_id);
        let hint = CrudOperation::ALL.into_iter().find(|op| {
            self.heuristics
                .crud_hints(*op)
                .iter()
                .any(|h| tokens.iter().any(|t| t == h))
        });

        match (shape, hint) {
            // Hints only override within the GET pair; method shape wins
            // elsewhere (a POST named "search_tickets" is still a create
            // candidate only if the path says so).
            (Some(CrudOperation::List), Some(CrudOperation::GetById)) => {
                Some(CrudOperation::GetById)
            }
            (Some(CrudOperation::GetById), Some(CrudOperation::List)) => Some(CrudOperation::List),
            (Some(shape), _) => Some(shape),
            // No keyword evidence and no shape: per-method default.
            (None, hint) => hint,
        }
    }

    fn name_from_base(&self, base: &str, tag: &str, used: &BTreeSet<String>) -> String {
        let meaningful: Vec<&str> = base
            .split('/')
            .filter(|s| !s.is_empty())
            .filter(|s| !self.heuristics.generic_segments().contains(&s.to_lowercase().as_str()))
            .collect();
        let candidate = match meaningful.as_slice() {
            [] => sanitize_name(tag),
            [single] => sanitize_name(single),
            [.., prev, last] => {
                let short = sanitize_name(last);
                if used.contains(&short) {
                    sanitize_name(&format!("{prev}_{last}"))
                } else {
                    short
                }
            }
        };
        if used.contains(&candidate) {
            sanitize_name(&format!("{tag}_{candidate}"))
        } else {
            candidate
        }
    }

    /// Phase 3 + 4: metadata synthesis and confidence scoring.
    fn build_service(
        &self,
        name: &str,
        tag: &str,
        tier1: &[ClassifiedEndpoint],
        tier2: &[EndpointRecord],
    ) -> ServiceDefinition {
        let name = sanitize_name(name);
        let total = tier1.len() + tier2.len();

        let tier1_ops: BTreeMap<String, ServiceOperation> = tier1
            .iter()
            .map(|m| {
                let op = self.service_operation(&m.endpoint, m.op_type);
                (op.operation_id.clone(), op)
            })
            .collect();
        let tier2_ops: BTreeMap<String, ServiceOperation> = tier2
            .iter()
            .filter(|e| !tier1_ops.contains_key(&e.operation_id))
            .map(|e| {
                let op = self.service_operation(e, None);
                (op.operation_id.clone(), op)
            })
            .collect();

        let domain = self.heuristics.domain_for(&name);
        let (description, synonyms, business_context) = match domain {
            Some((domain_name, entry)) => (
                entry.description.to_string(),
                entry.synonyms.iter().map(|s| s.to_string()).collect(),
                format!("{domain_name} management within the service desk"),
            ),
            None => {
                let summaries: Vec<&str> = tier1
                    .iter()
                    .map(|m| &m.endpoint)
                    .chain(tier2.iter())
                    .filter_map(|e| e.summary.as_deref())
                    .take(3)
                    .collect();
                let description = if summaries.is_empty() {
                    format!("Operations for {}", name.replace('_', " "))
                } else {
                    summaries.join("; ")
                };
                (
                    description,
                    BTreeSet::new(),
                    format!("API operations grouped under '{}'", tag),
                )
            }
        };

        let keywords = self.extract_keywords(&name, tag, tier1, tier2, domain);

        let confidence = confidence_score(tier1_ops.len(), tier2_ops.len(), total);
        let now = Utc::now();
        ServiceDefinition {
            service_name: name,
            service_description: description,
            business_context,
            keywords,
            synonyms,
            tier1_operations: tier1_ops,
            tier2_operations: tier2_ops,
            confidence_score: confidence,
            created_at: now,
            updated_at: now,
        }
    }

    fn extract_keywords(
        &self,
        name: &str,
        tag: &str,
        tier1: &[ClassifiedEndpoint],
        tier2: &[EndpointRecord],
        domain: Option<(&'static str, &crate::services::heuristics::DomainEntry)>,
    ) -> BTreeSet<String> {
        let mut keywords: BTreeSet<String> = BTreeSet::new();
        keywords.extend(tokenize(name, self.heuristics.as_ref()));
        keywords.extend(tokenize(tag, self.heuristics.as_ref()));

        // Capped sample of endpoint paths and summaries.
        let sample = tier1
            .iter()
            .map(|m| &m.endpoint)
            .chain(tier2.iter())
            .take(self.keyword_sample_cap);
        for endpoint in sample {
            for segment in endpoint.path.split('/') {
                if !segment.is_empty() && !is_id_segment(segment) {
                    keywords.extend(tokenize(segment, self.heuristics.as_ref()));
                }
            }
            if let Some(summary) = &endpoint.summary {
                keywords.extend(tokenize(summary, self.heuristics.as_ref()));
            }
        }

        if let Some((_, entry)) = domain {
            keywords.extend(entry.keywords.iter().map(|k| k.to_string()));
        }
        keywords
    }

    fn service_operation(
        &self,
        endpoint: &EndpointRecord,
        crud_type: Option<CrudOperation>,
    ) -> ServiceOperation {
        let tokens = id_tokens(&endpoint.operation_id);

        let mut verbs: Vec<String> = Vec::new();
        if let Some(op) = crud_type {
            verbs.push(op.intent_verb().to_string());
        }
        for op in CrudOperation::ALL {
            for hint in self.heuristics.crud_hints(op) {
                if tokens.iter().any(|t| t == hint) && !verbs.iter().any(|v| v == hint) {
                    verbs.push(hint.to_string());
                }
            }
        }

        let objects: Vec<String> = endpoint
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .filter(|s| !is_id_segment(s))
            .filter(|s| !self.heuristics.generic_segments().contains(&s.to_lowercase().as_str()))
            .map(|s| sanitize_name(s))
            .collect();

        let indicators: Vec<String> = endpoint
            .summary
            .as_deref()
            .map(|s| tokenize(s, self.heuristics.as_ref()))
            .unwrap_or_default()
            .into_iter()
            .take(5)
            .collect();

        let confidence = match crud_type {
            Some(_) if !verbs.is_empty() && verbs.len() > 1 => 0.9,
            Some(_) => 0.8,
            None => 0.6,
        };

        ServiceOperation {
            operation_id: endpoint.operation_id.clone(),
            path: endpoint.path.clone(),
            method: endpoint.method,
            crud_type,
            intent_verbs: verbs,
            intent_objects: objects,
            intent_indicators: indicators,
            description: endpoint
                .summary
                .clone()
                .or_else(|| endpoint.description.clone())
                .unwrap_or_else(|| endpoint.key()),
            confidence_score: confidence,
        }
    }
}

#[derive(Debug, Clone)]
struct ClassifiedEndpoint {
    endpoint: EndpointRecord,
    op_type: Option<CrudOperation>,
}

/// Additive confidence formula, clamped to [0.1, 1.0].
fn confidence_score(tier1: usize, tier2: usize, total: usize) -> f64 {
    let mut score: f64 = 0.5;
    if tier1 >= 5 {
        score += 0.2;
    } else if tier1 >= 3 {
        score += 0.1;
    }
    if tier2 > 0 {
        score += 0.1;
    }
    if (5..=50).contains(&total) {
        score += 0.1;
    }
    if total < 3 {
        score -= 0.2;
    }
    if total > 100 {
        score -= 0.1;
    }
    score.clamp(0.1, 1.0)
}

fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_underscore = false;
    for c in raw.chars() {
        // Insert a separator at camelCase boundaries.
        if c.is_ascii_uppercase() && !out.is_empty() && !prev_underscore {
            out.push('_');
        }
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            prev_underscore = false;
        } else if !prev_underscore && !out.is_empty() {
            out.push('_');
            prev_underscore = true;
        }
    }
    out.trim_matches('_').to_string()
}

/// Split an operation id on case boundaries and separators.
fn id_tokens(operation_id: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(operation_id.len() + 4);
    let mut prev_lower = false;
    for c in operation_id.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            spaced.push(' ');
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        spaced.push(c);
    }
    spaced
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
