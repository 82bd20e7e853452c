//! parse_specification facade

use crate::services::SpecParser;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ParseInput {
    /// Raw specification text (JSON or YAML).
    pub content: String,
    /// Original filename, kept for diagnostics.
    pub filename: String,
    /// Skips format detection when supplied.
    pub format_hint: Option<SpecificationFormat>,
}

#[derive(Debug, Serialize)]
pub struct ParseOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SpecMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<EndpointSummary>>,
    /// Contained, non-fatal parsing failures.
    pub parsing_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EndpointSummary {
    pub key: String,
    pub path: String,
    pub method: String,
    pub operation_id: String,
    pub tags: Vec<String>,
    pub deprecated: bool,
}

/// Parse an uploaded specification into endpoint summaries.
pub fn parse_specification(input: ParseInput) -> ParseOutput {
    match SpecParser::parse(&input.content, &input.filename, input.format_hint) {
        Ok((spec, parsing_errors)) => {
            let endpoints = spec
                .endpoints
                .iter()
                .map(|e| EndpointSummary {
                    key: e.key(),
                    path: e.path.clone(),
                    method: e.method.to_string(),
                    operation_id: e.operation_id.clone(),
                    tags: e.tags.clone(),
                    deprecated: e.deprecated,
                })
                .collect();
            ParseOutput {
                success: true,
                metadata: Some(spec.metadata),
                endpoints: Some(endpoints),
                parsing_errors,
                error: None,
            }
        }
        Err(e) => ParseOutput {
            success: false,
            metadata: None,
            endpoints: None,
            parsing_errors: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}
