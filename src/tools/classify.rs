//! classify_services facade

use crate::services::{ServiceClassifier, SpecParser};
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ClassifyInput {
    pub content: String,
    pub filename: String,
    pub format_hint: Option<SpecificationFormat>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyOutput {
    pub success: bool,
    pub services: Vec<ServiceSummary>,
    pub parsing_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ServiceSummary {
    pub service_name: String,
    pub service_description: String,
    pub tier1_count: usize,
    pub tier2_count: usize,
    pub keywords: Vec<String>,
    pub synonyms: Vec<String>,
    pub confidence_score: f64,
}

impl From<&ServiceDefinition> for ServiceSummary {
    fn from(service: &ServiceDefinition) -> Self {
        ServiceSummary {
            service_name: service.service_name.clone(),
            service_description: service.service_description.clone(),
            tier1_count: service.tier1_operations.len(),
            tier2_count: service.tier2_operations.len(),
            keywords: service.keywords.iter().cloned().collect(),
            synonyms: service.synonyms.iter().cloned().collect(),
            confidence_score: service.confidence_score,
        }
    }
}

/// Parse a specification and classify it into service definitions.
pub fn classify_services(config: &RegistryConfig, input: ClassifyInput) -> ClassifyOutput {
    let (spec, parsing_errors) =
        match SpecParser::parse(&input.content, &input.filename, input.format_hint) {
            Ok(result) => result,
            Err(e) => {
                return ClassifyOutput {
                    success: false,
                    services: Vec::new(),
                    parsing_errors: Vec::new(),
                    error: Some(e.to_string()),
                };
            }
        };

    let services = classifier_for(config).classify(&spec);
    ClassifyOutput {
        success: true,
        services: services.values().map(ServiceSummary::from).collect(),
        parsing_errors,
        error: None,
    }
}

/// Full classification for callers that persist the result.
pub fn classify_to_definitions(
    config: &RegistryConfig,
    input: ClassifyInput,
) -> RegistryResult<std::collections::BTreeMap<String, ServiceDefinition>> {
    let (spec, _) = SpecParser::parse(&input.content, &input.filename, input.format_hint)?;
    Ok(classifier_for(config).classify(&spec))
}

fn classifier_for(config: &RegistryConfig) -> ServiceClassifier {
    ServiceClassifier::default().with_sample_cap(config.keyword_sample_cap)
}
