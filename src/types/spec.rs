//! Parsed specification types: formats, endpoints, CRUD classification

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Detected input format. Selected once at detection time; each variant has
/// exactly one extraction path in the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecificationFormat {
    OpenApi3,
    Swagger2,
    Infraon,
    Unknown,
}

impl std::fmt::Display for SpecificationFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecificationFormat::OpenApi3 => write!(f, "openapi3"),
            SpecificationFormat::Swagger2 => write!(f, "swagger2"),
            SpecificationFormat::Infraon => write!(f, "infraon"),
            SpecificationFormat::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn parse(method: &str) -> Option<HttpMethod> {
        match method.to_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "patch" => Some(HttpMethod::Patch),
            "delete" => Some(HttpMethod::Delete),
            "head" => Some(HttpMethod::Head),
            "options" => Some(HttpMethod::Options),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        };
        write!(f, "{s}")
    }
}

/// Canonical CRUD operation types (Tier 1 candidates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrudOperation {
    List,
    GetById,
    Create,
    Update,
    Delete,
}

impl CrudOperation {
    pub const ALL: [CrudOperation; 5] = [
        CrudOperation::List,
        CrudOperation::GetById,
        CrudOperation::Create,
        CrudOperation::Update,
        CrudOperation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrudOperation::List => "list",
            CrudOperation::GetById => "get_by_id",
            CrudOperation::Create => "create",
            CrudOperation::Update => "update",
            CrudOperation::Delete => "delete",
        }
    }

    /// The verb downstream intent matching associates with this operation.
    pub fn intent_verb(&self) -> &'static str {
        match self {
            CrudOperation::List => "list",
            CrudOperation::GetById => "get",
            CrudOperation::Create => "create",
            CrudOperation::Update => "update",
            CrudOperation::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content_types: Vec<String>,
    /// Inline or resolved request schema, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    pub status_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

/// One endpoint extracted from a specification. Immutable once parsed;
/// updates create new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub path: String,
    pub method: HttpMethod,
    /// Unique within a spec; synthesized from method + path when the
    /// document omits it.
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, ResponseSpec>,
    pub deprecated: bool,
}

impl EndpointRecord {
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecMetadata {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub format: SpecificationFormat,
    pub endpoint_count: usize,
    pub tag_count: usize,
}

/// A fully parsed specification: flat endpoint list plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSpecification {
    pub metadata: SpecMetadata,
    pub endpoints: Vec<EndpointRecord>,
    pub tags: Vec<String>,
    /// Deterministic content hash of the source document.
    pub spec_hash: String,
    pub source: String,
}
