//! Error types for crdkit-core

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::structural::StructuralErrors;

/// Result type for crdkit-core operations
pub type Result<T> = std::result::Result<T, CrdError>;

/// Which schema of a CRD version an encode/decode failure refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSubject {
    /// The `spec` schema of the named version
    Spec(String),
    /// The shared status subresource schema
    Status,
    /// A schema document used on its own, outside a CRD
    Document,
}

impl std::fmt::Display for SchemaSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spec(version) => write!(f, "version '{}'", version),
            Self::Status => write!(f, "the status field"),
            Self::Document => write!(f, "the schema document"),
        }
    }
}

/// Errors that can occur while completing or validating a CRD
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CrdError {
    /// No schema document was supplied for a version declared by the CRD
    #[error("no OpenAPI schema supplied for version '{version}' of {crd}")]
    MissingSchema { crd: String, version: String },

    /// The schema document could not be encoded to JSON
    #[error("cannot marshal OpenAPI schema for {subject} of {crd}: {source}")]
    SchemaEncode {
        crd: String,
        subject: SchemaSubject,
        #[source]
        source: serde_json::Error,
    },

    /// The encoded schema does not fit the JSONSchemaProps shape
    #[error("cannot unmarshal raw OpenAPI schema to JSONSchemaProps for {subject} of {crd}: {source}")]
    SchemaDecode {
        crd: String,
        subject: SchemaSubject,
        #[source]
        source: serde_json::Error,
    },

    /// The composed version schema violates the structural schema rules
    #[error("schema of version '{version}' of {crd} is not structural: {errors}")]
    NonStructural {
        crd: String,
        version: String,
        errors: StructuralErrors,
    },

    /// Invalid CRD manifest
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Invalid generation config
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A file could not be read
    #[error("cannot read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for CrdError {
    fn from(e: serde_json::Error) -> Self {
        CrdError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for CrdError {
    fn from(e: serde_yaml::Error) -> Self {
        CrdError::Serialization(e.to_string())
    }
}

/// Read a file to a string, keeping its path in the error
pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| CrdError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}
