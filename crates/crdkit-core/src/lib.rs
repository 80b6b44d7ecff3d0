//! crdkit core - CustomResourceDefinition completion
//!
//! This crate provides:
//! - **Completion**: attach per-version `spec` schemas and the status schema to a CRD skeleton
//! - **Field paths**: mark schema nodes with `x-kubernetes-preserve-unknown-fields`
//! - **Structural validation**: the API server's structural schema rules
//! - **Manifests**: load skeletons and schema documents, render completed CRDs
//! - **Configuration**: the `crdkit.yaml` generation config

pub mod complete;
pub mod config;
pub mod error;
pub mod manifest;
pub mod schema;
pub mod structural;
pub mod visitor;

pub use complete::{CompletionReport, CrdCompleter, StatusSource, VersionReport};
pub use config::{CONFIG_API_VERSION, CrdEntry, DEFAULT_CONFIG_FILE, GenerationConfig, OutputConfig};
pub use error::{CrdError, Result, SchemaSubject};
pub use manifest::{
    CREATION_TIMESTAMP_OUTPUT, RenderOptions, STATUS_OUTPUT, load_crd, load_crds,
    load_schema_document, parse_crd, parse_crds, render_all, render_crd,
};
pub use schema::{PropertyType, SchemaExt};
pub use structural::{ErrorKind, FieldError, SchemaPath, StructuralErrors, validate_structural};
pub use visitor::{FieldPath, Segment, mark_preserve_unknown_fields};

// Re-export the Kubernetes types the public API is built on
pub use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceDefinition, JSONSchemaProps,
};
