//! Service Registry Engine
//!
//! Ingests machine-readable API specifications (OpenAPI 3, Swagger 2,
//! Infraon custom JSON/YAML) and produces a curated, versioned service
//! registry: human-meaningful service names mapped to CRUD-classified
//! operations, annotated with keywords and synonyms for downstream intent
//! matching.

pub mod services;
pub mod tools;
pub mod types;

pub use services::{
    ConflictDetector, RegistryStore, ServiceClassifier, SpecParser, VersionControl, classify_crud,
};
pub use tools::{ClassifyInput, ClassifyOutput, ServiceSummary, classify_services};
pub use tools::{ConflictOutput, detect_conflicts, detect_conflicts_in_services};
pub use tools::{EndpointSummary, ParseInput, ParseOutput, parse_specification};
pub use tools::{
    AddServiceInput, MergeInput, RegistryOutput, SplitInput, add_service, delete_service,
    load_registry, merge_services, save_registry, split_service, update_service,
};
pub use tools::{
    VersionsOutput, analyze_changes, generate_diff_report, get_registry_versions,
    get_version_history, rollback_to_version,
};
