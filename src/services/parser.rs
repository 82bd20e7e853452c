//! Format-agnostic specification parser
//!
//! Normalizes OpenAPI 3 / Swagger 2 / Infraon custom documents into a flat
//! list of endpoint records. Best-effort extraction: a malformed operation
//! or parameter is recorded in the error list and parsing continues.

use crate::types::*;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

/// `{param}`, `:param`, purely numeric, or uuid-shaped path segments.
static ID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(\{[^}]+\}|:[A-Za-z_][A-Za-z0-9_]*|\d+|[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})$",
    )
    .expect("invalid id-segment regex")
});

/// Refuses to chase `$ref` chains longer than this (cycle guard).
/// Structural nesting is unbounded; only ref hops count.
const MAX_REF_DEPTH: usize = 32;

/// Classify an endpoint by method + path shape. Pure; reused by the
/// service classifier.
pub fn classify_crud(method: HttpMethod, path: &str) -> Option<CrudOperation> {
    let ends_with_id = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|seg| ID_SEGMENT.is_match(seg))
        .unwrap_or(false);

    match method {
        HttpMethod::Get if ends_with_id => Some(CrudOperation::GetById),
        HttpMethod::Get => Some(CrudOperation::List),
        HttpMethod::Post => Some(CrudOperation::Create),
        HttpMethod::Put | HttpMethod::Patch => Some(CrudOperation::Update),
        HttpMethod::Delete => Some(CrudOperation::Delete),
        HttpMethod::Head | HttpMethod::Options => None,
    }
}

/// Whether a path segment is an `{id}`-style placeholder.
pub fn is_id_segment(segment: &str) -> bool {
    ID_SEGMENT.is_match(segment)
}

pub struct SpecParser;

impl SpecParser {
    /// Parse raw spec text into an [`ApiSpecification`] plus the list of
    /// contained (non-fatal) parsing errors.
    pub fn parse(
        content: &str,
        filename: &str,
        format_hint: Option<SpecificationFormat>,
    ) -> RegistryResult<(ApiSpecification, Vec<String>)> {
        let value = Self::parse_document(content)?;
        let mut errors = Vec::new();

        let format = match format_hint {
            Some(hint) => hint,
            None => Self::detect_format(&value),
        };
        tracing::debug!(%format, filename, "parsing specification");

        // Eager reference resolution; on failure keep the unresolved
        // document and record the error.
        let resolved = match Self::resolve_refs(&value) {
            Ok(resolved) => resolved,
            Err(msg) => {
                errors.push(format!("reference resolution failed: {msg}"));
                value.clone()
            }
        };

        let mut endpoints = match format {
            SpecificationFormat::OpenApi3 => {
                Self::extract_paths(&resolved, PathDialect::OpenApi3, &mut errors)
            }
            SpecificationFormat::Swagger2 => {
                Self::extract_paths(&resolved, PathDialect::Swagger2, &mut errors)
            }
            SpecificationFormat::Infraon => Self::extract_infraon(&resolved, &mut errors),
            SpecificationFormat::Unknown => {
                // A declared but unsupported openapi/swagger version is a
                // hard error; detection did not merely miss it.
                if let Some(declared) = resolved
                    .get("openapi")
                    .or_else(|| resolved.get("swagger"))
                    .and_then(|v| v.as_str())
                {
                    return Err(RegistryError::UnsupportedVersion(declared.to_string()));
                }
                // Best effort: an unknown document with a `paths` object
                // still gets the OpenAPI-style treatment.
                if resolved.get("paths").is_some() {
                    errors.push("unknown format, extracted via paths object".to_string());
                    Self::extract_paths(&resolved, PathDialect::OpenApi3, &mut errors)
                } else {
                    return Err(RegistryError::UnknownFormat {
                        filename: filename.to_string(),
                    });
                }
            }
        };

        Self::dedupe_operation_ids(&mut endpoints);

        let tags: Vec<String> = endpoints
            .iter()
            .flat_map(|e| e.tags.iter().cloned())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        let info = resolved.get("info");
        let metadata = SpecMetadata {
            title: Self::str_field(info, "title").unwrap_or_else(|| "Unknown API".to_string()),
            version: Self::str_field(info, "version").unwrap_or_else(|| "0.0.0".to_string()),
            description: Self::str_field(info, "description"),
            format,
            endpoint_count: endpoints.len(),
            tag_count: tags.len(),
        };

        Ok((
            ApiSpecification {
                metadata,
                endpoints,
                tags,
                spec_hash: Self::compute_hash(&value),
                source: filename.to_string(),
            },
            errors,
        ))
    }

    /// YAML first (superset of JSON), strict JSON fallback.
    fn parse_document(content: &str) -> RegistryResult<serde_json::Value> {
        match serde_yaml::from_str::<serde_json::Value>(content) {
            Ok(value) if value.is_object() => Ok(value),
            Ok(_) => Err(RegistryError::InvalidDocument(
                "document root is not a mapping".to_string(),
            )),
            Err(yaml_err) => serde_json::from_str(content).map_err(|json_err| {
                RegistryError::InvalidDocument(format!(
                    "not valid YAML ({yaml_err}) or JSON ({json_err})"
                ))
            }),
        }
    }

    /// Inspect reserved top-level keys to pick a format variant.
    pub fn detect_format(value: &serde_json::Value) -> SpecificationFormat {
        if let Some(openapi) = value.get("openapi").and_then(|v| v.as_str())
            && openapi.starts_with("3.")
        {
            return SpecificationFormat::OpenApi3;
        }
        if let Some(swagger) = value.get("swagger").and_then(|v| v.as_str())
            && swagger.starts_with("2.")
        {
            return SpecificationFormat::Swagger2;
        }
        if value.get("infraon_version").is_some()
            || value.get("x-infraon").is_some()
            || (value.get("endpoints").is_some() && value.get("services").is_some())
        {
            return SpecificationFormat::Infraon;
        }
        SpecificationFormat::Unknown
    }

    /// Eagerly resolve internal `$ref` pointers against the whole document.
    fn resolve_refs(root: &serde_json::Value) -> Result<serde_json::Value, String> {
        Self::resolve_node(root, root, 0)
    }

    fn resolve_node(
        node: &serde_json::Value,
        root: &serde_json::Value,
        ref_depth: usize,
    ) -> Result<serde_json::Value, String> {
        match node {
            serde_json::Value::Object(obj) => {
                if let Some(reference) = obj.get("$ref").and_then(|v| v.as_str()) {
                    if ref_depth >= MAX_REF_DEPTH {
                        return Err("reference chain limit exceeded (cyclic $ref?)".to_string());
                    }
                    let target = Self::lookup_pointer(root, reference)
                        .ok_or_else(|| format!("unresolvable reference '{reference}'"))?;
                    return Self::resolve_node(target, root, ref_depth + 1);
                }
                let mut resolved = serde_json::Map::with_capacity(obj.len());
                for (key, val) in obj {
                    resolved.insert(key.clone(), Self::resolve_node(val, root, ref_depth)?);
                }
                Ok(serde_json::Value::Object(resolved))
            }
            serde_json::Value::Array(arr) => {
                let resolved: Result<Vec<_>, _> = arr
                    .iter()
                    .map(|v| Self::resolve_node(v, root, ref_depth))
                    .collect();
                Ok(serde_json::Value::Array(resolved?))
            }
            other => Ok(other.clone()),
        }
    }

    /// `#/components/schemas/User` style JSON pointer lookup.
    fn lookup_pointer<'a>(
        root: &'a serde_json::Value,
        reference: &str,
    ) -> Option<&'a serde_json::Value> {
        let pointer = reference.strip_prefix('#')?;
        let mut current = root;
        for segment in pointer.split('/').filter(|s| !s.is_empty()) {
            let segment = segment.replace("~1", "/").replace("~0", "~");
            current = current.get(&segment)?;
        }
        Some(current)
    }

    /// Extract endpoints per (path, method) pair from a `paths` object.
    fn extract_paths(
        value: &serde_json::Value,
        dialect: PathDialect,
        errors: &mut Vec<String>,
    ) -> Vec<EndpointRecord> {
        let Some(paths) = value.get("paths").and_then(|v| v.as_object()) else {
            errors.push("missing 'paths' object".to_string());
            return Vec::new();
        };

        let mut endpoints = Vec::new();
        for (path, path_item) in paths {
            let Some(item) = path_item.as_object() else {
                errors.push(format!("path item '{path}' is not an object"));
                continue;
            };
            for (method_str, operation) in item {
                let Some(method) = HttpMethod::parse(method_str) else {
                    continue; // parameters / summary / vendor extensions
                };
                if !operation.is_object() {
                    errors.push(format!("operation {method_str} {path} is not an object"));
                    continue;
                }
                endpoints.push(Self::extract_operation(
                    path, method, operation, dialect, errors,
                ));
            }
        }
        endpoints
    }

    /// Parse one operation. Parameters, request body and responses each have
    /// their own error containment so one malformed part does not drop the
    /// whole operation.
    fn extract_operation(
        path: &str,
        method: HttpMethod,
        operation: &serde_json::Value,
        dialect: PathDialect,
        errors: &mut Vec<String>,
    ) -> EndpointRecord {
        let operation_id = operation
            .get("operationId")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| Self::synthesize_operation_id(method, path));

        let tags: Vec<String> = operation
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let parameters = match Self::extract_parameters(operation, dialect) {
            Ok(params) => params,
            Err(msg) => {
                errors.push(format!("{method} {path}: parameters: {msg}"));
                Vec::new()
            }
        };

        let request_body = match Self::extract_request_body(operation, dialect) {
            Ok(body) => body,
            Err(msg) => {
                errors.push(format!("{method} {path}: request body: {msg}"));
                None
            }
        };

        let responses = match Self::extract_responses(operation, dialect) {
            Ok(responses) => responses,
            Err(msg) => {
                errors.push(format!("{method} {path}: responses: {msg}"));
                BTreeMap::new()
            }
        };

        EndpointRecord {
            path: path.to_string(),
            method,
            operation_id,
            summary: operation
                .get("summary")
                .and_then(|v| v.as_str())
                .map(String::from),
            description: operation
                .get("description")
                .and_then(|v| v.as_str())
                .map(String::from),
            tags,
            parameters,
            request_body,
            responses,
            deprecated: operation
                .get("deprecated")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }
    }

    fn extract_parameters(
        operation: &serde_json::Value,
        dialect: PathDialect,
    ) -> Result<Vec<Parameter>, String> {
        let Some(parameters) = operation.get("parameters") else {
            return Ok(Vec::new());
        };
        let parameters = parameters
            .as_array()
            .ok_or_else(|| "'parameters' is not an array".to_string())?;

        let mut params = Vec::new();
        for param in parameters {
            let in_value = param.get("in").and_then(|v| v.as_str()).unwrap_or("");

            // Swagger 2 body parameters surface as the request body instead.
            if dialect == PathDialect::Swagger2 && in_value == "body" {
                continue;
            }

            let location = match in_value {
                "path" => ParameterLocation::Path,
                "query" => ParameterLocation::Query,
                "header" => ParameterLocation::Header,
                "cookie" => ParameterLocation::Cookie,
                _ => continue,
            };

            let schema_type = match dialect {
                PathDialect::Swagger2 => {
                    param.get("type").and_then(|v| v.as_str()).map(String::from)
                }
                PathDialect::OpenApi3 => param
                    .get("schema")
                    .and_then(|s| s.get("type"))
                    .and_then(|v| v.as_str())
                    .map(String::from),
            };

            params.push(Parameter {
                name: param
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                location,
                required: param
                    .get("required")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(location == ParameterLocation::Path),
                description: param
                    .get("description")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                schema_type,
            });
        }
        Ok(params)
    }

    fn extract_request_body(
        operation: &serde_json::Value,
        dialect: PathDialect,
    ) -> Result<Option<RequestBody>, String> {
        match dialect {
            PathDialect::OpenApi3 => {
                let Some(body) = operation.get("requestBody") else {
                    return Ok(None);
                };
                let content = body
                    .get("content")
                    .and_then(|v| v.as_object())
                    .ok_or_else(|| "requestBody has no content object".to_string())?;
                Ok(Some(RequestBody {
                    required: body
                        .get("required")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false),
                    description: body
                        .get("description")
                        .and_then(|v| v.as_str())
                        .map(String::from),
                    content_types: content.keys().cloned().collect(),
                    schema: content.values().next().and_then(|c| c.get("schema")).cloned(),
                }))
            }
            PathDialect::Swagger2 => {
                let Some(parameters) = operation.get("parameters").and_then(|v| v.as_array())
                else {
                    return Ok(None);
                };
                for param in parameters {
                    if param.get("in").and_then(|v| v.as_str()) == Some("body") {
                        return Ok(Some(RequestBody {
                            required: param
                                .get("required")
                                .and_then(|v| v.as_bool())
                                .unwrap_or(false),
                            description: param
                                .get("description")
                                .and_then(|v| v.as_str())
                                .map(String::from),
                            content_types: operation
                                .get("consumes")
                                .and_then(|v| v.as_array())
                                .map(|arr| {
                                    arr.iter()
                                        .filter_map(|v| v.as_str().map(String::from))
                                        .collect()
                                })
                                .unwrap_or_else(|| vec!["application/json".to_string()]),
                            schema: param.get("schema").cloned(),
                        }));
                    }
                }
                Ok(None)
            }
        }
    }

    fn extract_responses(
        operation: &serde_json::Value,
        dialect: PathDialect,
    ) -> Result<BTreeMap<String, ResponseSpec>, String> {
        let Some(resp_value) = operation.get("responses") else {
            return Ok(BTreeMap::new());
        };
        let resp_obj = resp_value
            .as_object()
            .ok_or_else(|| "'responses' is not an object".to_string())?;

        let mut responses = BTreeMap::new();
        for (status, resp) in resp_obj {
            let (content_types, schema) = match dialect {
                PathDialect::OpenApi3 => {
                    if let Some(content) = resp.get("content").and_then(|v| v.as_object()) {
                        (
                            content.keys().cloned().collect(),
                            content
                                .values()
                                .next()
                                .and_then(|c| c.get("schema"))
                                .cloned(),
                        )
                    } else {
                        (Vec::new(), None)
                    }
                }
                PathDialect::Swagger2 => (
                    operation
                        .get("produces")
                        .and_then(|v| v.as_array())
                        .map(|arr| {
                            arr.iter()
                                .filter_map(|v| v.as_str().map(String::from))
                                .collect()
                        })
                        .unwrap_or_else(|| vec!["application/json".to_string()]),
                    resp.get("schema").cloned(),
                ),
            };

            responses.insert(
                status.clone(),
                ResponseSpec {
                    status_code: status.clone(),
                    description: resp
                        .get("description")
                        .and_then(|v| v.as_str())
                        .map(String::from),
                    content_types,
                    schema,
                },
            );
        }
        Ok(responses)
    }

    /// Infraon custom format: a top-level `endpoints` array with per-entry
    /// `path`/`url`, `method`, optional `name`/`operation_id` and `service`.
    fn extract_infraon(
        value: &serde_json::Value,
        errors: &mut Vec<String>,
    ) -> Vec<EndpointRecord> {
        let Some(entries) = value.get("endpoints").and_then(|v| v.as_array()) else {
            errors.push("infraon document missing 'endpoints' array".to_string());
            return Vec::new();
        };

        let mut endpoints = Vec::new();
        for (idx, entry) in entries.iter().enumerate() {
            let Some(path) = entry
                .get("path")
                .or_else(|| entry.get("url"))
                .and_then(|v| v.as_str())
            else {
                errors.push(format!("infraon endpoint #{idx} has no path/url"));
                continue;
            };
            let method_str = entry.get("method").and_then(|v| v.as_str()).unwrap_or("get");
            let Some(method) = HttpMethod::parse(method_str) else {
                errors.push(format!(
                    "infraon endpoint #{idx} has invalid method '{method_str}'"
                ));
                continue;
            };

            let operation_id = entry
                .get("operation_id")
                .or_else(|| entry.get("name"))
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_else(|| Self::synthesize_operation_id(method, path));

            let tags = entry
                .get("service")
                .or_else(|| entry.get("module"))
                .and_then(|v| v.as_str())
                .map(|s| vec![s.to_string()])
                .unwrap_or_default();

            endpoints.push(EndpointRecord {
                path: path.to_string(),
                method,
                operation_id,
                summary: entry
                    .get("summary")
                    .or_else(|| entry.get("name"))
                    .and_then(|v| v.as_str())
                    .map(String::from),
                description: entry
                    .get("description")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                tags,
                parameters: Vec::new(),
                request_body: None,
                responses: BTreeMap::new(),
                deprecated: entry
                    .get("deprecated")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            });
        }
        endpoints
    }

    fn synthesize_operation_id(method: HttpMethod, path: &str) -> String {
        let slug: String = path
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "{}_{}",
            method.to_string().to_lowercase(),
            slug.trim_matches('_')
        )
    }

    /// Operation ids must be unique within a spec; collisions get a
    /// numeric suffix in extraction order.
    fn dedupe_operation_ids(endpoints: &mut [EndpointRecord]) {
        let mut seen: HashSet<String> = HashSet::new();
        for endpoint in endpoints.iter_mut() {
            if !seen.insert(endpoint.operation_id.clone()) {
                let mut counter = 2;
                loop {
                    let candidate = format!("{}_{}", endpoint.operation_id, counter);
                    if seen.insert(candidate.clone()) {
                        endpoint.operation_id = candidate;
                        break;
                    }
                    counter += 1;
                }
            }
        }
    }

    fn str_field(value: Option<&serde_json::Value>, key: &str) -> Option<String> {
        value?.get(key)?.as_str().map(String::from)
    }

    /// Deterministic content hash of the source document.
    pub fn compute_hash(value: &serde_json::Value) -> String {
        let normalized = serde_json::to_string(value).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathDialect {
    OpenApi3,
    Swagger2,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openapi_doc() -> String {
        serde_json::json!({
            "openapi": "3.0.0",
            "info": {"title": "Users API", "version": "1.0.0"},
            "paths": {
                "/users": {
                    "get": {"operationId": "listUsers", "tags": ["users"], "responses": {}},
                    "post": {"operationId": "createUser", "tags": ["users"], "responses": {}}
                },
                "/users/{id}": {
                    "get": {"operationId": "getUser", "tags": ["users"], "responses": {}}
                }
            }
        })
        .to_string()
    }

    #[test]
    fn detects_openapi3_and_extracts_endpoints() {
        let (spec, errors) = SpecParser::parse(&openapi_doc(), "users.json", None).unwrap();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(spec.metadata.format, SpecificationFormat::OpenApi3);
        assert_eq!(spec.endpoints.len(), 3);
        assert_eq!(spec.tags, vec!["users".to_string()]);
    }

    #[test]
    fn parsing_is_deterministic() {
        let doc = openapi_doc();
        let (first, _) = SpecParser::parse(&doc, "users.json", None).unwrap();
        let (second, _) = SpecParser::parse(&doc, "users.json", None).unwrap();
        assert_eq!(first.endpoints, second.endpoints);
        assert_eq!(first.spec_hash, second.spec_hash);
    }

    #[test]
    fn yaml_input_is_accepted() {
        let yaml = "openapi: '3.0.0'\ninfo:\n  title: Y\n  version: '1'\npaths:\n  /items:\n    get:\n      operationId: listItems\n";
        let (spec, _) = SpecParser::parse(yaml, "items.yaml", None).unwrap();
        assert_eq!(spec.endpoints.len(), 1);
        assert_eq!(spec.endpoints[0].operation_id, "listItems");
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let err = SpecParser::parse("{ definitely not valid ]", "bad.txt", None).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDocument(_)));
    }

    #[test]
    fn single_bad_operation_is_contained() {
        let doc = serde_json::json!({
            "openapi": "3.0.1",
            "info": {"title": "T", "version": "1"},
            "paths": {
                "/good": {"get": {"operationId": "listGood"}},
                "/bad": {"post": "not-an-object"}
            }
        })
        .to_string();
        let (spec, errors) = SpecParser::parse(&doc, "mixed.json", None).unwrap();
        assert_eq!(spec.endpoints.len(), 1);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn refs_are_resolved_before_extraction() {
        let doc = serde_json::json!({
            "openapi": "3.0.0",
            "info": {"title": "T", "version": "1"},
            "components": {
                "schemas": {"User": {"type": "object"}}
            },
            "paths": {
                "/users": {
                    "post": {
                        "operationId": "createUser",
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/User"}
                                }
                            }
                        }
                    }
                }
            }
        })
        .to_string();
        let (spec, errors) = SpecParser::parse(&doc, "refs.json", None).unwrap();
        assert!(errors.is_empty());
        let body = spec.endpoints[0].request_body.as_ref().unwrap();
        assert_eq!(body.schema.as_ref().unwrap()["type"], "object");
    }

    #[test]
    fn unresolvable_ref_is_recorded_not_fatal() {
        let doc = serde_json::json!({
            "openapi": "3.0.0",
            "info": {"title": "T", "version": "1"},
            "paths": {
                "/users": {
                    "get": {
                        "operationId": "listUsers",
                        "responses": {
                            "200": {
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/Missing"}
                                    }
                                }
                            }
                        }
                    }
                }
            }
        })
        .to_string();
        let (spec, errors) = SpecParser::parse(&doc, "dangling.json", None).unwrap();
        assert_eq!(spec.endpoints.len(), 1);
        assert!(errors.iter().any(|e| e.contains("reference resolution")));
    }

    #[test]
    fn missing_operation_ids_are_synthesized_uniquely() {
        let doc = serde_json::json!({
            "swagger": "2.0",
            "info": {"title": "T", "version": "1"},
            "paths": {
                "/a b": {"get": {}},
                "/a-b": {"get": {}}
            }
        })
        .to_string();
        let (spec, _) = SpecParser::parse(&doc, "swagger.json", None).unwrap();
        let ids: HashSet<_> = spec
            .endpoints
            .iter()
            .map(|e| e.operation_id.clone())
            .collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn crud_classification_by_shape() {
        assert_eq!(
            classify_crud(HttpMethod::Get, "/users"),
            Some(CrudOperation::List)
        );
        assert_eq!(
            classify_crud(HttpMethod::Get, "/users/{id}"),
            Some(CrudOperation::GetById)
        );
        assert_eq!(
            classify_crud(HttpMethod::Get, "/users/42"),
            Some(CrudOperation::GetById)
        );
        assert_eq!(
            classify_crud(HttpMethod::Post, "/users"),
            Some(CrudOperation::Create)
        );
        assert_eq!(
            classify_crud(HttpMethod::Patch, "/users/{id}"),
            Some(CrudOperation::Update)
        );
        assert_eq!(
            classify_crud(HttpMethod::Delete, "/users/{id}"),
            Some(CrudOperation::Delete)
        );
        assert_eq!(classify_crud(HttpMethod::Options, "/users"), None);
    }

    #[test]
    fn empty_spec_yields_no_endpoints() {
        let doc = serde_json::json!({
            "openapi": "3.0.0",
            "info": {"title": "Empty", "version": "1"},
            "paths": {}
        })
        .to_string();
        let (spec, errors) = SpecParser::parse(&doc, "empty.json", None).unwrap();
        assert!(spec.endpoints.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn infraon_custom_format() {
        let doc = serde_json::json!({
            "services": ["tickets"],
            "endpoints": [
                {"url": "/ux/sd/tickets", "method": "get", "name": "list_tickets", "service": "tickets"},
                {"url": "/ux/sd/tickets", "method": "post", "name": "create_ticket", "service": "tickets"},
                {"method": "get"}
            ]
        })
        .to_string();
        let (spec, errors) = SpecParser::parse(&doc, "infraon.json", None).unwrap();
        assert_eq!(spec.metadata.format, SpecificationFormat::Infraon);
        assert_eq!(spec.endpoints.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(spec.endpoints[0].tags, vec!["tickets".to_string()]);
    }

    #[test]
    fn pathless_unknown_document_is_rejected() {
        let doc = serde_json::json!({"hello": "world"}).to_string();
        let err = SpecParser::parse(&doc, "mystery.json", None).unwrap_err();
        match err {
            RegistryError::UnknownFormat { filename } => assert_eq!(filename, "mystery.json"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn declared_unsupported_version_is_rejected() {
        let doc = serde_json::json!({
            "openapi": "4.0.0",
            "info": {"title": "Future", "version": "1"},
            "paths": {}
        })
        .to_string();
        let err = SpecParser::parse(&doc, "future.json", None).unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedVersion(v) if v == "4.0.0"));
    }

    #[test]
    fn deep_structural_nesting_resolves_without_error() {
        let mut schema = serde_json::json!({"type": "string"});
        for _ in 0..40 {
            schema = serde_json::json!({"type": "object", "properties": {"inner": schema}});
        }
        let doc = serde_json::json!({
            "openapi": "3.0.0",
            "info": {"title": "Deep", "version": "1"},
            "paths": {
                "/deep": {
                    "post": {
                        "operationId": "createDeep",
                        "requestBody": {
                            "content": {"application/json": {"schema": schema}}
                        }
                    }
                }
            }
        })
        .to_string();
        let (spec, errors) = SpecParser::parse(&doc, "deep.json", None).unwrap();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(spec.endpoints.len(), 1);
        assert!(spec.endpoints[0].request_body.is_some());
    }

    #[test]
    fn cyclic_refs_are_recorded_not_fatal() {
        let doc = serde_json::json!({
            "openapi": "3.0.0",
            "info": {"title": "Cyclic", "version": "1"},
            "components": {
                "schemas": {
                    "A": {"$ref": "#/components/schemas/B"},
                    "B": {"$ref": "#/components/schemas/A"}
                }
            },
            "paths": {
                "/a": {"get": {"operationId": "getA"}}
            }
        })
        .to_string();
        let (spec, errors) = SpecParser::parse(&doc, "cyclic.json", None).unwrap();
        assert_eq!(spec.endpoints.len(), 1);
        assert!(errors.iter().any(|e| e.contains("reference resolution")));
    }

    #[test]
    fn format_hint_skips_detection() {
        let doc = serde_json::json!({
            "info": {"title": "Hinted", "version": "1"},
            "paths": {
                "/things": {"get": {"operationId": "listThings"}}
            }
        })
        .to_string();
        let (spec, errors) =
            SpecParser::parse(&doc, "hinted.json", Some(SpecificationFormat::OpenApi3)).unwrap();
        assert_eq!(spec.metadata.format, SpecificationFormat::OpenApi3);
        assert_eq!(spec.endpoints.len(), 1);
        assert!(errors.is_empty());
    }
}
