//! Cross-service conflict analysis
//!
//! Four independent passes over a set of service definitions: keyword
//! overlap, synonym overlap, intent-verb ambiguity and business-context
//! similarity. Zero conflicts is a valid, non-error outcome.

use crate::services::heuristics::{ClassificationHeuristics, ItsmHeuristics, tokenize};
use crate::types::*;
use std::collections::{BTreeMap, BTreeSet};

pub struct ConflictDetector {
    heuristics: Box<dyn ClassificationHeuristics>,
    context_similarity_threshold: f64,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        ConflictDetector::new(Box::new(ItsmHeuristics), DEFAULT_CONTEXT_SIMILARITY_THRESHOLD)
    }
}

impl ConflictDetector {
    pub fn new(
        heuristics: Box<dyn ClassificationHeuristics>,
        context_similarity_threshold: f64,
    ) -> Self {
        ConflictDetector {
            heuristics,
            context_similarity_threshold,
        }
    }

    pub fn with_config(config: &RegistryConfig) -> Self {
        ConflictDetector::new(Box::new(ItsmHeuristics), config.context_similarity_threshold)
    }

    /// Run all passes and aggregate matches into per-type reports. Zero
    /// reports is the normal outcome for a clean registry.
    ///
    /// Detection is symmetric in the input: all indices are BTree-based
    /// and pairs are ordered lexicographically.
    pub fn detect(&self, services: &BTreeMap<String, ServiceDefinition>) -> Vec<ConflictReport> {
        if services.len() < 2 {
            return Vec::new();
        }

        let mut matches = Vec::new();
        matches.extend(self.detect_term_overlap(services, ConflictType::KeywordOverlap));
        matches.extend(self.detect_term_overlap(services, ConflictType::SynonymOverlap));
        matches.extend(self.detect_intent_ambiguity(services));
        matches.extend(self.detect_context_overlap(services));

        let reports = self.aggregate(services, matches);
        tracing::debug!(reports = reports.len(), services = services.len(), "conflict detection done");
        reports
    }

    /// Pass 1 / 2: a non-stopword term shared by >= 2 services, unless the
    /// sharing is legitimate domain vocabulary.
    fn detect_term_overlap(
        &self,
        services: &BTreeMap<String, ServiceDefinition>,
        conflict_type: ConflictType,
    ) -> Vec<ConflictMatch> {
        let term_sets = |service: &ServiceDefinition| -> BTreeSet<String> {
            match conflict_type {
                ConflictType::SynonymOverlap => service.synonyms.clone(),
                _ => service.keywords.clone(),
            }
        };

        let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (name, service) in services {
            for term in term_sets(service) {
                if self.heuristics.stopwords().contains(term.as_str()) {
                    continue;
                }
                index.entry(term).or_default().insert(name.clone());
            }
        }

        let mut matches = Vec::new();
        for (term, sharing) in &index {
            if sharing.len() < 2 {
                continue;
            }
            if self.is_legitimate_domain_sharing(term, sharing, services) {
                continue;
            }
            for (first, second) in ordered_pairs(sharing) {
                let a = &services[&first];
                let b = &services[&second];
                let similarity = jaccard(&term_sets(a), &term_sets(b));
                matches.push(ConflictMatch {
                    conflict_type,
                    first_service: first,
                    second_service: second,
                    term: Some(term.clone()),
                    similarity,
                });
            }
        }
        matches
    }

    /// A term in a recognized domain-synonym group is legitimate when at
    /// least 80% of the sharing services already relate to that domain.
    fn is_legitimate_domain_sharing(
        &self,
        term: &str,
        sharing: &BTreeSet<String>,
        services: &BTreeMap<String, ServiceDefinition>,
    ) -> bool {
        let Some((domain, entry)) = self.heuristics.domain_for(term) else {
            return false;
        };
        // The shared term itself is not evidence of domain membership;
        // relatedness must come from the name or from other vocabulary.
        let related = sharing
            .iter()
            .filter(|name| {
                let service = &services[name.as_str()];
                let in_name = service.service_name.contains(domain);
                let in_keywords = service
                    .keywords
                    .iter()
                    .filter(|k| k.as_str() != term)
                    .any(|k| k == domain || entry.keywords.contains(&k.as_str()));
                let in_synonyms = service
                    .synonyms
                    .iter()
                    .filter(|s| s.as_str() != term)
                    .any(|s| entry.synonyms.contains(&s.as_str()));
                in_name || in_keywords || in_synonyms
            })
            .count();
        related as f64 / sharing.len() as f64 >= DOMAIN_SHARING_THRESHOLD
    }

    /// Pass 3: a verb used by more than `INTENT_VERB_SERVICE_LIMIT`
    /// services; pairs sharing fewer than 2 other keywords/synonyms are
    /// likely unrelated and get flagged.
    fn detect_intent_ambiguity(
        &self,
        services: &BTreeMap<String, ServiceDefinition>,
    ) -> Vec<ConflictMatch> {
        let mut verb_index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (name, service) in services {
            for op in service
                .tier1_operations
                .values()
                .chain(service.tier2_operations.values())
            {
                for verb in &op.intent_verbs {
                    verb_index
                        .entry(verb.clone())
                        .or_default()
                        .insert(name.clone());
                }
            }
        }

        let mut matches = Vec::new();
        for (verb, users) in &verb_index {
            if users.len() <= INTENT_VERB_SERVICE_LIMIT {
                continue;
            }
            for (first, second) in ordered_pairs(users) {
                let a = &services[&first];
                let b = &services[&second];
                let shared_terms = a
                    .keywords
                    .union(&a.synonyms.clone())
                    .filter(|t| b.keywords.contains(*t) || b.synonyms.contains(*t))
                    .count();
                if shared_terms >= 2 {
                    continue;
                }
                let verbs_a: BTreeSet<String> = intent_verbs(a);
                let verbs_b: BTreeSet<String> = intent_verbs(b);
                let similarity = jaccard(&verbs_a, &verbs_b).max(0.3);
                matches.push(ConflictMatch {
                    conflict_type: ConflictType::IntentAmbiguity,
                    first_service: first,
                    second_service: second,
                    term: Some(verb.clone()),
                    similarity,
                });
            }
        }
        matches
    }

    /// Pass 4: pairwise Jaccard similarity of business-context words at or
    /// above the configured threshold flags a merge candidate.
    fn detect_context_overlap(
        &self,
        services: &BTreeMap<String, ServiceDefinition>,
    ) -> Vec<ConflictMatch> {
        let contexts: BTreeMap<&String, BTreeSet<String>> = services
            .iter()
            .map(|(name, service)| {
                (
                    name,
                    tokenize(&service.business_context, self.heuristics.as_ref())
                        .into_iter()
                        .collect(),
                )
            })
            .collect();

        let names: Vec<&String> = services.keys().collect();
        let mut matches = Vec::new();
        for (i, first) in names.iter().enumerate() {
            for second in &names[i + 1..] {
                let a = &contexts[*first];
                let b = &contexts[*second];
                if a.is_empty() || b.is_empty() {
                    continue;
                }
                let similarity = jaccard(a, b);
                if similarity >= self.context_similarity_threshold {
                    matches.push(ConflictMatch {
                        conflict_type: ConflictType::BusinessContextOverlap,
                        first_service: (*first).clone(),
                        second_service: (*second).clone(),
                        term: None,
                        similarity,
                    });
                }
            }
        }
        matches
    }

    /// Group matches per conflict type; severity is the mean similarity
    /// across the type's matches.
    fn aggregate(
        &self,
        services: &BTreeMap<String, ServiceDefinition>,
        matches: Vec<ConflictMatch>,
    ) -> Vec<ConflictReport> {
        let mut by_type: BTreeMap<ConflictType, Vec<ConflictMatch>> = BTreeMap::new();
        for m in matches {
            by_type.entry(m.conflict_type).or_default().push(m);
        }

        let mut reports = Vec::new();
        for (conflict_type, matches) in by_type {
            let mean = matches.iter().map(|m| m.similarity).sum::<f64>() / matches.len() as f64;
            let severity = ConflictSeverity::from_similarity(mean);

            let affected: BTreeSet<String> = matches
                .iter()
                .flat_map(|m| [m.first_service.clone(), m.second_service.clone()])
                .collect();

            let suggested_resolutions = match conflict_type {
                ConflictType::KeywordOverlap | ConflictType::SynonymOverlap => {
                    self.term_resolutions(services, &matches)
                }
                ConflictType::IntentAmbiguity => matches
                    .iter()
                    .filter_map(|m| m.term.as_ref().map(|t| (t, m)))
                    .map(|(verb, m)| {
                        format!(
                            "Qualify verb '{verb}' with service-specific objects in '{}' and '{}'",
                            m.first_service, m.second_service
                        )
                    })
                    .collect(),
                ConflictType::BusinessContextOverlap => matches
                    .iter()
                    .map(|m| {
                        format!(
                            "Consider merging '{}' and '{}' (context similarity {:.2})",
                            m.first_service, m.second_service, m.similarity
                        )
                    })
                    .collect(),
            };

            let auto_resolvable = severity == ConflictSeverity::Low
                && matches!(
                    conflict_type,
                    ConflictType::KeywordOverlap | ConflictType::SynonymOverlap
                );

            reports.push(ConflictReport {
                conflict_type,
                severity,
                description: format!(
                    "{} {} match(es) across {} service(s)",
                    matches.len(),
                    conflict_type,
                    affected.len()
                ),
                affected_services: affected,
                suggested_resolutions,
                auto_resolvable,
                matches,
            });
        }
        reports
    }

    /// Rank the two services of each term match by centrality and recommend
    /// removing the term from the less central one.
    fn term_resolutions(
        &self,
        services: &BTreeMap<String, ServiceDefinition>,
        matches: &[ConflictMatch],
    ) -> Vec<String> {
        let mut seen: BTreeSet<(String, String, String)> = BTreeSet::new();
        let mut resolutions = Vec::new();
        for m in matches {
            let Some(term) = &m.term else { continue };
            let key = (term.clone(), m.first_service.clone(), m.second_service.clone());
            if !seen.insert(key) {
                continue;
            }
            let first_score = centrality(&services[&m.first_service], term);
            let second_score = centrality(&services[&m.second_service], term);
            let (keep, drop) = if first_score >= second_score {
                (&m.first_service, &m.second_service)
            } else {
                (&m.second_service, &m.first_service)
            };
            resolutions.push(format!(
                "Remove '{term}' from '{drop}' (more central to '{keep}')"
            ));
        }
        resolutions
    }
}

/// Weighted presence of a term: name > description > business context >
/// keyword-list frequency.
fn centrality(service: &ServiceDefinition, term: &str) -> f64 {
    let mut score = 0.0;
    if service.service_name.to_lowercase().contains(term) {
        score += 4.0;
    }
    if service.service_description.to_lowercase().contains(term) {
        score += 2.0;
    }
    if service.business_context.to_lowercase().contains(term) {
        score += 1.0;
    }
    let frequency = service
        .keywords
        .iter()
        .chain(service.synonyms.iter())
        .filter(|k| k.contains(term))
        .count();
    score + frequency as f64 * 0.5
}

fn intent_verbs(service: &ServiceDefinition) -> BTreeSet<String> {
    service
        .tier1_operations
        .values()
        .chain(service.tier2_operations.values())
        .flat_map(|op| op.intent_verbs.iter().cloned())
        .collect()
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// All unordered pairs, each ordered lexicographically.
fn ordered_pairs(names: &BTreeSet<String>) -> Vec<(String, String)> {
    let list: Vec<&String> = names.iter().collect();
    let mut pairs = Vec::new();
    for (i, first) in list.iter().enumerate() {
        for second in &list[i + 1..] {
            pairs.push(((*first).clone(), (*second).clone()));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn service(
        name: &str,
        keywords: &[&str],
        synonyms: &[&str],
        context: &str,
    ) -> ServiceDefinition {
        let now = Utc::now();
        ServiceDefinition {
            service_name: name.to_string(),
            service_description: format!("Operations for {name}"),
            business_context: context.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            tier1_operations: BTreeMap::new(),
            tier2_operations: BTreeMap::new(),
            confidence_score: 0.5,
            created_at: now,
            updated_at: now,
        }
    }

    fn registry_of(services: Vec<ServiceDefinition>) -> BTreeMap<String, ServiceDefinition> {
        services
            .into_iter()
            .map(|s| (s.service_name.clone(), s))
            .collect()
    }

    fn with_verbs(
        mut service: ServiceDefinition,
        op_id: &str,
        verbs: &[&str],
    ) -> ServiceDefinition {
        service.tier2_operations.insert(
            op_id.to_string(),
            ServiceOperation {
                operation_id: op_id.to_string(),
                path: format!("/{}", service.service_name),
                method: HttpMethod::Post,
                crud_type: None,
                intent_verbs: verbs.iter().map(|v| v.to_string()).collect(),
                intent_objects: vec![],
                intent_indicators: vec![],
                description: String::new(),
                confidence_score: 0.6,
            },
        );
        service
    }

    #[test]
    fn shared_keyword_without_domain_membership_conflicts() {
        let services = registry_of(vec![
            service("billing", &["ticket", "invoice"], &[], "billing and payments"),
            service("parking", &["ticket", "garage"], &[], "parking lot access"),
        ]);
        let reports = ConflictDetector::default().detect(&services);
        let keyword_report = reports
            .iter()
            .find(|r| r.conflict_type == ConflictType::KeywordOverlap)
            .expect("keyword overlap report");
        assert!(keyword_report.affected_services.contains("billing"));
        assert!(keyword_report.affected_services.contains("parking"));
        assert!(!keyword_report.suggested_resolutions.is_empty());
    }

    #[test]
    fn domain_vocabulary_sharing_is_legitimate() {
        let services = registry_of(vec![
            service(
                "incident",
                &["incident", "priority"],
                &["outage"],
                "incident management",
            ),
            service(
                "incident_reports",
                &["incident", "report"],
                &[],
                "incident reporting",
            ),
        ]);
        let reports = ConflictDetector::default().detect(&services);
        let keyword_conflict_on_incident = reports
            .iter()
            .filter(|r| r.conflict_type == ConflictType::KeywordOverlap)
            .flat_map(|r| r.matches.iter())
            .any(|m| m.term.as_deref() == Some("incident"));
        assert!(!keyword_conflict_on_incident);
    }

    #[test]
    fn detection_is_symmetric() {
        let a = service("alpha", &["shared", "one"], &[], "context alpha words");
        let b = service("beta", &["shared", "two"], &[], "context beta words");
        let forward = registry_of(vec![a.clone(), b.clone()]);
        let backward: BTreeMap<String, ServiceDefinition> = registry_of(vec![b, a]);

        let detector = ConflictDetector::default();
        let first = detector.detect(&forward);
        let second = detector.detect(&backward);
        assert_eq!(first, second);
    }

    #[test]
    fn widely_shared_verb_across_unrelated_services_is_ambiguous() {
        // Four services share the verb "process" (above the per-verb
        // service limit) with disjoint keywords and contexts; each pair's
        // verb-set similarity is 1/7 and gets floored at 0.3.
        let services = registry_of(vec![
            with_verbs(
                service("alpha", &["apple"], &[], "fruit orchard inventory"),
                "a1",
                &["process", "peel", "core", "juice"],
            ),
            with_verbs(
                service("beta", &["bolt"], &[], "hardware fastener catalog"),
                "b1",
                &["process", "thread", "torque", "galvanize"],
            ),
            with_verbs(
                service("gamma", &["grain"], &[], "cereal silo logistics"),
                "g1",
                &["process", "mill", "sift", "bag"],
            ),
            with_verbs(
                service("delta", &["dye"], &[], "textile color treatment"),
                "d1",
                &["process", "soak", "rinse", "fix"],
            ),
        ]);
        let reports = ConflictDetector::default().detect(&services);
        let report = reports
            .iter()
            .find(|r| r.conflict_type == ConflictType::IntentAmbiguity)
            .expect("intent ambiguity report");

        assert_eq!(report.matches.len(), 6);
        assert_eq!(report.affected_services.len(), 4);
        assert!(
            report
                .matches
                .iter()
                .all(|m| m.term.as_deref() == Some("process"))
        );
        assert!(report.matches.iter().all(|m| m.similarity == 0.3));
        assert_eq!(report.severity, ConflictSeverity::Low);
        assert!(!report.suggested_resolutions.is_empty());
    }

    #[test]
    fn verb_shared_by_few_services_is_not_ambiguous() {
        let services = registry_of(vec![
            with_verbs(
                service("alpha", &["apple"], &[], "fruit orchard inventory"),
                "a1",
                &["process"],
            ),
            with_verbs(
                service("beta", &["bolt"], &[], "hardware fastener catalog"),
                "b1",
                &["process"],
            ),
        ]);
        let reports = ConflictDetector::default().detect(&services);
        assert!(
            !reports
                .iter()
                .any(|r| r.conflict_type == ConflictType::IntentAmbiguity),
            "reports: {reports:?}"
        );
    }

    #[test]
    fn near_identical_contexts_flag_merge_candidates() {
        let services = registry_of(vec![
            service("alpha", &["alpha"], &[], "manage customer orders warehouse"),
            service("beta", &["beta"], &[], "manage customer orders warehouse"),
        ]);
        let reports = ConflictDetector::default().detect(&services);
        let context_report = reports
            .iter()
            .find(|r| r.conflict_type == ConflictType::BusinessContextOverlap)
            .expect("context report");
        assert_eq!(context_report.severity, ConflictSeverity::High);
        assert!(context_report.suggested_resolutions[0].contains("merging"));
    }

    #[test]
    fn fully_duplicated_keywords_are_high_severity() {
        let services = registry_of(vec![
            service("first", &["gadget", "widget", "sprocket"], &[], "ctx one"),
            service("second", &["gadget", "widget", "sprocket"], &[], "ctx two"),
        ]);
        let reports = ConflictDetector::default().detect(&services);
        let keyword_report = reports
            .iter()
            .find(|r| r.conflict_type == ConflictType::KeywordOverlap)
            .expect("keyword report");
        assert_eq!(keyword_report.severity, ConflictSeverity::High);
        assert!(!keyword_report.auto_resolvable);
    }

    #[test]
    fn no_conflicts_is_empty_not_error() {
        let services = registry_of(vec![
            service("alpha", &["apple"], &[], "fruit orchard inventory"),
            service("beta", &["bolt"], &[], "hardware fastener catalog"),
        ]);
        let reports = ConflictDetector::default().detect(&services);
        assert!(reports.is_empty(), "unexpected reports: {reports:?}");
    }

    #[test]
    fn centrality_prefers_name_presence() {
        let in_name = service("ticket_desk", &["ticket"], &[], "desk ops");
        let in_keywords = service("support", &["ticket"], &[], "support ops");
        assert!(centrality(&in_name, "ticket") > centrality(&in_keywords, "ticket"));
    }
}
